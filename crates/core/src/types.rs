//! QTI base types and cardinalities.
//!
//! Every variable and every intermediate processing value is described by
//! a `(Cardinality, BaseType)` pair. Records are the one exception: a record
//! has no base type of its own, each field carries its own.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

/// The shape of a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Cardinality {
    Single,
    Multiple,
    Ordered,
    Record,
}

impl Cardinality {
    pub const ALL: &'static [Cardinality] = &[
        Cardinality::Single,
        Cardinality::Multiple,
        Cardinality::Ordered,
        Cardinality::Record,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Cardinality::Single => "single",
            Cardinality::Multiple => "multiple",
            Cardinality::Ordered => "ordered",
            Cardinality::Record => "record",
        }
    }

    /// True for `multiple` and `ordered`.
    pub fn is_container(&self) -> bool {
        matches!(self, Cardinality::Multiple | Cardinality::Ordered)
    }
}

impl fmt::Display for Cardinality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Cardinality {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "single" => Ok(Cardinality::Single),
            "multiple" => Ok(Cardinality::Multiple),
            "ordered" => Ok(Cardinality::Ordered),
            "record" => Ok(Cardinality::Record),
            other => Err(CoreError::Deserialize {
                message: format!("unknown cardinality '{}'", other),
            }),
        }
    }
}

/// QTI primitive value kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BaseType {
    Identifier,
    Boolean,
    Integer,
    Float,
    String,
    Point,
    Pair,
    DirectedPair,
    Duration,
    File,
    Uri,
    IntOrIdentifier,
}

impl BaseType {
    pub const ALL: &'static [BaseType] = &[
        BaseType::Identifier,
        BaseType::Boolean,
        BaseType::Integer,
        BaseType::Float,
        BaseType::String,
        BaseType::Point,
        BaseType::Pair,
        BaseType::DirectedPair,
        BaseType::Duration,
        BaseType::File,
        BaseType::Uri,
        BaseType::IntOrIdentifier,
    ];

    pub const NUMERIC: &'static [BaseType] = &[BaseType::Integer, BaseType::Float];

    pub fn as_str(&self) -> &'static str {
        match self {
            BaseType::Identifier => "identifier",
            BaseType::Boolean => "boolean",
            BaseType::Integer => "integer",
            BaseType::Float => "float",
            BaseType::String => "string",
            BaseType::Point => "point",
            BaseType::Pair => "pair",
            BaseType::DirectedPair => "directedPair",
            BaseType::Duration => "duration",
            BaseType::File => "file",
            BaseType::Uri => "uri",
            BaseType::IntOrIdentifier => "intOrIdentifier",
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, BaseType::Integer | BaseType::Float)
    }
}

impl fmt::Display for BaseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BaseType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BaseType::ALL
            .iter()
            .copied()
            .find(|bt| bt.as_str() == s)
            .ok_or_else(|| CoreError::Deserialize {
                message: format!("unknown baseType '{}'", s),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_type_round_trips_through_str() {
        for bt in BaseType::ALL {
            assert_eq!(bt.as_str().parse::<BaseType>().unwrap(), *bt);
        }
    }

    #[test]
    fn unknown_base_type_is_rejected() {
        assert!("decimal".parse::<BaseType>().is_err());
    }

    #[test]
    fn serde_uses_qti_spelling() {
        let json = serde_json::to_value(BaseType::DirectedPair).unwrap();
        assert_eq!(json, serde_json::json!("directedPair"));
        let card: Cardinality = serde_json::from_value(serde_json::json!("ordered")).unwrap();
        assert_eq!(card, Cardinality::Ordered);
    }

    #[test]
    fn containers() {
        assert!(Cardinality::Multiple.is_container());
        assert!(Cardinality::Ordered.is_container());
        assert!(!Cardinality::Single.is_container());
        assert!(!Cardinality::Record.is_container());
    }
}
