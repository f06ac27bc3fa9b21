//! Decoded literal values held by entities.
//!
//! Statements carry literals as lexical forms plus an optional datatype.
//! Entity schemas name a [`LiteralKind`] per property so the pool can decode
//! each literal into a typed [`Value`] and encode it back.

use serde::{Deserialize, Serialize};

use crate::statement::{Literal, Term};
use crate::time::{Precision, TimeInstant};
use crate::vocab::xsd;

/// A decoded literal.
///
/// # Examples
///
/// ```
/// use tempora::{LiteralKind, Term, Value};
///
/// let term = Term::integer(42);
/// let value = Value::decode(LiteralKind::Int, term.as_literal().unwrap()).unwrap();
/// assert_eq!(value.as_int(), Some(42));
/// assert_eq!(value.to_term(), Some(term));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Value {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    /// A string with a language tag.
    Text { text: String, language: String },
    Instant(TimeInstant),
    Null,
}

/// How a property's literal should be decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LiteralKind {
    Bool,
    Int,
    Float,
    /// Plain string; a language tag, if present, is kept as [`Value::Text`].
    String,
    Instant,
    /// Pick the kind from the literal's datatype.
    Auto,
}

impl Value {
    pub const fn is_bool(&self) -> bool {
        matches!(self, Self::Bool(_))
    }

    pub const fn is_int(&self) -> bool {
        matches!(self, Self::Int(_))
    }

    pub const fn is_float(&self) -> bool {
        matches!(self, Self::Float(_))
    }

    pub const fn is_string(&self) -> bool {
        matches!(self, Self::String(_) | Self::Text { .. })
    }

    pub const fn is_instant(&self) -> bool {
        matches!(self, Self::Instant(_))
    }

    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub const fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    #[allow(clippy::cast_precision_loss)]
    pub const fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(v) => Some(*v),
            Self::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    /// The string content, with or without a language tag.
    pub fn as_string(&self) -> Option<&str> {
        match self {
            Self::String(v) | Self::Text { text: v, .. } => Some(v),
            _ => None,
        }
    }

    pub const fn as_instant(&self) -> Option<TimeInstant> {
        match self {
            Self::Instant(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns a human-readable type name.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::String(_) => "string",
            Self::Text { .. } => "text",
            Self::Instant(_) => "instant",
            Self::Null => "null",
        }
    }

    /// Decodes a literal as `kind`.
    ///
    /// Returns `None` when the lexical form does not parse as that kind.
    #[must_use]
    pub fn decode(kind: LiteralKind, literal: &Literal) -> Option<Self> {
        let lexical = literal.lexical.trim();
        match kind {
            LiteralKind::Bool => match lexical {
                "true" | "1" => Some(Self::Bool(true)),
                "false" | "0" => Some(Self::Bool(false)),
                _ => None,
            },
            LiteralKind::Int => lexical.parse().ok().map(Self::Int),
            LiteralKind::Float => lexical.parse().ok().map(Self::Float),
            LiteralKind::String => Some(match &literal.language {
                Some(language) => Self::Text {
                    text: literal.lexical.clone(),
                    language: language.clone(),
                },
                None => Self::String(literal.lexical.clone()),
            }),
            LiteralKind::Instant => lexical.parse().ok().map(Self::Instant),
            LiteralKind::Auto => Self::decode(kind_for_datatype(literal.datatype.as_deref()), literal),
        }
    }

    /// Encodes the value as a literal term. `Null` has no encoding.
    #[must_use]
    pub fn to_term(&self) -> Option<Term> {
        match self {
            Self::Bool(v) => Some(Term::boolean(*v)),
            Self::Int(v) => Some(Term::integer(*v)),
            Self::Float(v) => Some(Term::double(*v)),
            Self::String(v) => Some(Term::literal(v.clone())),
            Self::Text { text, language } => Some(Term::lang(text.clone(), language.clone())),
            Self::Instant(instant) => {
                let datatype = match instant.precision()? {
                    Precision::Year => xsd::G_YEAR,
                    Precision::Month => xsd::G_YEAR_MONTH,
                    Precision::Day => xsd::DATE,
                };
                Some(Term::typed(instant.canonical_key(), datatype))
            }
            Self::Null => None,
        }
    }
}

fn kind_for_datatype(datatype: Option<&str>) -> LiteralKind {
    match datatype {
        Some(xsd::BOOLEAN) => LiteralKind::Bool,
        Some(xsd::INTEGER | xsd::INT | xsd::LONG) => LiteralKind::Int,
        Some(xsd::DOUBLE | xsd::FLOAT | xsd::DECIMAL) => LiteralKind::Float,
        Some(xsd::DATE | xsd::G_YEAR | xsd::G_YEAR_MONTH) => LiteralKind::Instant,
        _ => LiteralKind::String,
    }
}

impl Default for Value {
    fn default() -> Self {
        Self::Null
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bool(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::String(v) => write!(f, "{v:?}"),
            Self::Text { text, language } => write!(f, "{text:?}@{language}"),
            Self::Instant(v) => write!(f, "{v}"),
            Self::Null => write!(f, "null"),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<TimeInstant> for Value {
    fn from(v: TimeInstant) -> Self {
        Self::Instant(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lit(term: &Term) -> &Literal {
        term.as_literal().unwrap()
    }

    #[test]
    fn test_value_int_reads_as_float() {
        let val = Value::Int(42);
        assert!(val.is_int());
        assert_eq!(val.as_float(), Some(42.0));
        assert_eq!(val.type_name(), "int");
    }

    #[test]
    fn test_auto_decode_follows_datatype() {
        assert_eq!(Value::decode(LiteralKind::Auto, lit(&Term::integer(7))), Some(Value::Int(7)));
        assert_eq!(Value::decode(LiteralKind::Auto, lit(&Term::boolean(true))), Some(Value::Bool(true)));
        assert_eq!(
            Value::decode(LiteralKind::Auto, lit(&Term::typed("1950-03", xsd::G_YEAR_MONTH))),
            Some(Value::Instant(TimeInstant::year_month(1950, 3).unwrap()))
        );
        assert_eq!(
            Value::decode(LiteralKind::Auto, lit(&Term::literal("Old Hall"))),
            Some(Value::String("Old Hall".into()))
        );
    }

    #[test]
    fn test_language_tag_survives_round_trip() {
        let term = Term::lang("Vieille Halle", "fr");
        let val = Value::decode(LiteralKind::String, lit(&term)).unwrap();
        assert_eq!(val.as_string(), Some("Vieille Halle"));
        assert_eq!(val.to_term(), Some(term));
    }

    #[test]
    fn test_decode_mismatch_is_none() {
        assert!(Value::decode(LiteralKind::Int, lit(&Term::literal("many"))).is_none());
        assert!(Value::decode(LiteralKind::Instant, lit(&Term::literal("1950-13"))).is_none());
        assert!(Value::decode(LiteralKind::Bool, lit(&Term::literal("yes"))).is_none());
    }

    #[test]
    fn test_instant_encodes_with_precision_datatype() {
        let day = Value::Instant(TimeInstant::ymd(1950, 3, 7).unwrap());
        assert_eq!(day.to_term(), Some(Term::typed("1950-03-07", xsd::DATE)));
        assert_eq!(Value::Instant(TimeInstant::origin()).to_term(), None);
        assert_eq!(Value::Null.to_term(), None);
    }

    #[test]
    fn test_value_display() {
        assert_eq!(format!("{}", Value::Bool(true)), "true");
        assert_eq!(format!("{}", Value::String("hi".into())), "\"hi\"");
        assert_eq!(format!("{}", Value::Null), "null");
    }

    #[test]
    fn test_value_serialization() {
        let val = Value::Instant(TimeInstant::year(1950).unwrap());
        let json = serde_json::to_string(&val).unwrap();
        let deserialized: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(val, deserialized);
    }
}
