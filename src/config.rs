//! Store configuration.

use serde::{Deserialize, Serialize};

use crate::storage::ContainerId;
use crate::time::TimeSpan;

/// Configuration for a [`crate::TemporalStore`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Prefix for generated resource URIs.
    pub data_namespace: String,
    /// Prefix for partition container ids.
    pub graph_namespace: String,
    /// Id of the container holding time-invariant statements.
    pub global_graph: String,
    /// Id of the container holding one metadata record per partition.
    pub metadata_graph: String,
    /// Build the time dimension index when the store opens.
    pub index_time_dimension: bool,
    /// Buffer size of each channel subscriber created by `subscribe`.
    pub update_stream_capacity: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_namespace: "http://tempora.dev/data/".to_string(),
            graph_namespace: "http://tempora.dev/graph/".to_string(),
            global_graph: "http://tempora.dev/graph/global".to_string(),
            metadata_graph: "http://tempora.dev/graph/meta".to_string(),
            index_time_dimension: true,
            update_stream_capacity: 1024,
        }
    }
}

impl StoreConfig {
    /// Load config from a TOML string, falling back to defaults for missing fields.
    ///
    /// # Errors
    ///
    /// Returns the TOML parse error for malformed input or mistyped fields.
    pub fn from_toml(toml_str: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(toml_str)
    }

    /// Container id of the partition holding statements valid during `span`.
    #[must_use]
    pub fn partition_id(&self, span: &TimeSpan) -> ContainerId {
        ContainerId::new(format!("{}tg-{}", self.graph_namespace, span.canonical_key()))
    }

    #[must_use]
    pub fn global_container(&self) -> ContainerId {
        ContainerId::new(self.global_graph.clone())
    }

    #[must_use]
    pub fn metadata_container(&self) -> ContainerId {
        ContainerId::new(self.metadata_graph.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::time::TimeInstant;

    #[test]
    fn partial_toml_keeps_defaults() {
        let cfg = StoreConfig::from_toml(
            r#"
            graph_namespace = "urn:g:"
            index_time_dimension = false
            "#,
        )
        .unwrap();
        assert_eq!(cfg.graph_namespace, "urn:g:");
        assert!(!cfg.index_time_dimension);
        assert_eq!(cfg.update_stream_capacity, StoreConfig::default().update_stream_capacity);
        assert_eq!(cfg.global_graph, StoreConfig::default().global_graph);
    }

    #[test]
    fn mistyped_field_is_rejected() {
        assert!(StoreConfig::from_toml("update_stream_capacity = \"lots\"").is_err());
    }

    #[test]
    fn partition_ids_use_canonical_key() {
        let cfg = StoreConfig {
            graph_namespace: "urn:g:".to_string(),
            ..StoreConfig::default()
        };
        let span = TimeSpan::between(TimeInstant::year(1950).unwrap(), TimeInstant::year(1960).unwrap()).unwrap();
        assert_eq!(cfg.partition_id(&span).as_str(), "urn:g:tg-1950_P10Y");
    }
}
