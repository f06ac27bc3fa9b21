//! IRIs the core itself reads and writes.

/// RDF core vocabulary.
pub mod rdf {
    /// `rdf:type`, the predicate of type assertions.
    pub const TYPE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";
}

/// XML Schema datatypes used for literals.
#[allow(missing_docs)]
pub mod xsd {
    pub const INTEGER: &str = "http://www.w3.org/2001/XMLSchema#integer";
    pub const INT: &str = "http://www.w3.org/2001/XMLSchema#int";
    pub const LONG: &str = "http://www.w3.org/2001/XMLSchema#long";
    pub const DOUBLE: &str = "http://www.w3.org/2001/XMLSchema#double";
    pub const FLOAT: &str = "http://www.w3.org/2001/XMLSchema#float";
    pub const DECIMAL: &str = "http://www.w3.org/2001/XMLSchema#decimal";
    pub const BOOLEAN: &str = "http://www.w3.org/2001/XMLSchema#boolean";
    pub const STRING: &str = "http://www.w3.org/2001/XMLSchema#string";
    pub const DATE: &str = "http://www.w3.org/2001/XMLSchema#date";
    pub const G_YEAR: &str = "http://www.w3.org/2001/XMLSchema#gYear";
    pub const G_YEAR_MONTH: &str = "http://www.w3.org/2001/XMLSchema#gYearMonth";
}

/// Shape of the per-partition metadata records.
///
/// Each partition id is the subject of one record: a type assertion, the
/// start's unit and numeric fields, then either duration components or, for
/// spans starting at the origin, the end's numeric fields.
#[allow(missing_docs)]
pub mod meta {
    pub const PARTITION: &str = "http://tempora.dev/ns/meta#Partition";
    pub const UNIT_TYPE: &str = "http://tempora.dev/ns/meta#unitType";
    pub const UNIT_YEAR: &str = "http://tempora.dev/ns/meta#unitYear";
    pub const UNIT_MONTH: &str = "http://tempora.dev/ns/meta#unitMonth";
    pub const UNIT_DAY: &str = "http://tempora.dev/ns/meta#unitDay";
    pub const UNIT_ORIGIN: &str = "http://tempora.dev/ns/meta#unitOrigin";
    pub const YEAR: &str = "http://tempora.dev/ns/meta#year";
    pub const MONTH: &str = "http://tempora.dev/ns/meta#month";
    pub const DAY: &str = "http://tempora.dev/ns/meta#day";
    pub const DURATION_YEARS: &str = "http://tempora.dev/ns/meta#years";
    pub const DURATION_MONTHS: &str = "http://tempora.dev/ns/meta#months";
    pub const DURATION_DAYS: &str = "http://tempora.dev/ns/meta#days";
    pub const END_YEAR: &str = "http://tempora.dev/ns/meta#endYear";
    pub const END_MONTH: &str = "http://tempora.dev/ns/meta#endMonth";
    pub const END_DAY: &str = "http://tempora.dev/ns/meta#endDay";
}
