//! Variable declarations and session state.
//!
//! A `Variable` is declared once by the host with a fixed cardinality and
//! base type. Response processing only ever mutates `value`.

use std::collections::BTreeMap;

use crate::cast;
use crate::error::CoreError;
use crate::shape::Shape;
use crate::types::{BaseType, Cardinality};
use crate::value::{data_to_json, parse_data, Data, ProcessingValue, Value};

// ──────────────────────────────────────────────
// Mappings and lookup tables
// ──────────────────────────────────────────────

/// One `mapEntry` of a response mapping.
#[derive(Debug, Clone, PartialEq)]
pub struct MapEntry {
    pub map_key: Value,
    pub mapped_value: f64,
    pub case_sensitive: bool,
}

/// Response mapping consumed by `mapResponse`.
#[derive(Debug, Clone, PartialEq)]
pub struct Mapping {
    pub lower_bound: Option<f64>,
    pub upper_bound: Option<f64>,
    pub default_value: f64,
    pub entries: Vec<MapEntry>,
}

/// One `areaMapEntry` of an area mapping.
#[derive(Debug, Clone, PartialEq)]
pub struct AreaMapEntry {
    pub shape: Shape,
    pub mapped_value: f64,
}

/// Area mapping consumed by `mapResponsePoint`.
#[derive(Debug, Clone, PartialEq)]
pub struct AreaMapping {
    pub lower_bound: Option<f64>,
    pub upper_bound: Option<f64>,
    pub default_value: f64,
    pub entries: Vec<AreaMapEntry>,
}

/// Outcome lookup table consumed by `lookupOutcomeValue`.
#[derive(Debug, Clone, PartialEq)]
pub enum LookupTable {
    Match {
        default_value: Option<Value>,
        entries: Vec<MatchTableEntry>,
    },
    Interpolation {
        default_value: Option<Value>,
        entries: Vec<InterpolationTableEntry>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct MatchTableEntry {
    pub source_value: i64,
    pub target_value: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InterpolationTableEntry {
    pub source_value: f64,
    pub include_boundary: bool,
    pub target_value: Value,
}

// ──────────────────────────────────────────────
// Variables
// ──────────────────────────────────────────────

/// A named, typed slot of session state.
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    pub identifier: String,
    pub cardinality: Cardinality,
    /// `None` only for record variables.
    pub base_type: Option<BaseType>,
    /// Current value; `None` is the QTI NULL value.
    pub value: Option<Data>,
    pub default_value: Option<Data>,
    pub correct_response: Option<Data>,
    pub mapping: Option<Mapping>,
    pub area_mapping: Option<AreaMapping>,
    pub lookup_table: Option<LookupTable>,
}

impl Variable {
    pub fn new(
        identifier: impl Into<String>,
        cardinality: Cardinality,
        base_type: Option<BaseType>,
    ) -> Self {
        Variable {
            identifier: identifier.into(),
            cardinality,
            base_type,
            value: None,
            default_value: None,
            correct_response: None,
            mapping: None,
            area_mapping: None,
            lookup_table: None,
        }
    }

    /// Shorthand for a `single` variable of the given base type.
    pub fn single(identifier: impl Into<String>, base_type: BaseType) -> Self {
        Self::new(identifier, Cardinality::Single, Some(base_type))
    }

    pub fn with_value(mut self, value: Option<Data>) -> Self {
        self.value = value;
        self
    }

    pub fn with_default(mut self, value: Option<Data>) -> Self {
        self.default_value = value;
        self
    }

    pub fn with_correct_response(mut self, value: Option<Data>) -> Self {
        self.correct_response = value;
        self
    }

    pub fn with_mapping(mut self, mapping: Mapping) -> Self {
        self.mapping = Some(mapping);
        self
    }

    pub fn with_area_mapping(mut self, mapping: AreaMapping) -> Self {
        self.area_mapping = Some(mapping);
        self
    }

    pub fn with_lookup_table(mut self, table: LookupTable) -> Self {
        self.lookup_table = Some(table);
        self
    }

    /// The current value with this variable's declared shape.
    pub fn to_processing_value(&self) -> ProcessingValue {
        self.shaped(self.value.clone())
    }

    pub fn default_processing_value(&self) -> ProcessingValue {
        self.shaped(self.default_value.clone())
    }

    pub fn correct_processing_value(&self) -> ProcessingValue {
        self.shaped(self.correct_response.clone())
    }

    fn shaped(&self, data: Option<Data>) -> ProcessingValue {
        ProcessingValue::from_data(self.cardinality, self.base_type, data)
    }

    /// Parse a declaration from host JSON:
    ///
    /// ```json
    /// { "identifier": "SCORE", "cardinality": "single", "baseType": "float",
    ///   "value": 0, "defaultValue": 0, "correctResponse": null,
    ///   "mapping": {...}, "areaMapping": {...}, "lookupTable": {...} }
    /// ```
    pub fn from_json(v: &serde_json::Value) -> Result<Variable, CoreError> {
        let identifier = get_str(v, "identifier")?;
        let cardinality: Cardinality = match v.get("cardinality").and_then(|c| c.as_str()) {
            Some(c) => c.parse()?,
            None => Cardinality::Single,
        };
        let base_type: Option<BaseType> = match v.get("baseType").and_then(|b| b.as_str()) {
            Some(b) => Some(b.parse()?),
            None => None,
        };
        if base_type.is_none() && cardinality != Cardinality::Record {
            return Err(CoreError::Deserialize {
                message: format!("variable '{}' missing 'baseType'", identifier),
            });
        }

        let data_field = |field: &str| -> Result<Option<Data>, CoreError> {
            match v.get(field) {
                Some(raw) => parse_data(cardinality, base_type, raw),
                None => Ok(None),
            }
        };
        let default_value = data_field("defaultValue")?;
        let value = match v.get("value") {
            Some(raw) => parse_data(cardinality, base_type, raw)?,
            None => default_value.clone(),
        };
        let correct_response = data_field("correctResponse")?;

        let mapping = match v.get("mapping") {
            Some(m) => Some(parse_mapping(m, base_type)?),
            None => None,
        };
        let area_mapping = match v.get("areaMapping") {
            Some(m) => Some(parse_area_mapping(m)?),
            None => None,
        };
        let lookup_table = match v.get("lookupTable") {
            Some(t) => Some(parse_lookup_table(t, base_type)?),
            None => None,
        };

        Ok(Variable {
            identifier,
            cardinality,
            base_type,
            value,
            default_value,
            correct_response,
            mapping,
            area_mapping,
            lookup_table,
        })
    }
}

// ──────────────────────────────────────────────
// Session state
// ──────────────────────────────────────────────

/// Variables of one response-processing pass, keyed by identifier.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionState(pub BTreeMap<String, Variable>);

impl SessionState {
    pub fn new() -> Self {
        SessionState(BTreeMap::new())
    }

    pub fn get(&self, identifier: &str) -> Option<&Variable> {
        self.0.get(identifier)
    }

    pub fn get_mut(&mut self, identifier: &str) -> Option<&mut Variable> {
        self.0.get_mut(identifier)
    }

    pub fn contains(&self, identifier: &str) -> bool {
        self.0.contains_key(identifier)
    }

    /// Declare a variable. Replaces any previous declaration with the same identifier.
    pub fn declare(&mut self, variable: Variable) {
        self.0.insert(variable.identifier.clone(), variable);
    }

    /// Builder form of `declare`.
    pub fn with(mut self, variable: Variable) -> Self {
        self.declare(variable);
        self
    }

    /// Parse an array of variable declarations.
    pub fn from_json(v: &serde_json::Value) -> Result<SessionState, CoreError> {
        let decls = v.as_array().ok_or_else(|| CoreError::Deserialize {
            message: "session state must be an array of variable declarations".to_string(),
        })?;
        let mut state = SessionState::new();
        for decl in decls {
            state.declare(Variable::from_json(decl)?);
        }
        Ok(state)
    }

    /// Current values keyed by identifier, NULL rendered as JSON `null`.
    pub fn values_json(&self) -> serde_json::Value {
        let mut obj = serde_json::Map::new();
        for (id, var) in &self.0 {
            obj.insert(id.clone(), data_to_json(var.value.as_ref()));
        }
        serde_json::Value::Object(obj)
    }
}

// ──────────────────────────────────────────────
// Declaration JSON helpers
// ──────────────────────────────────────────────

fn get_str(obj: &serde_json::Value, field: &str) -> Result<String, CoreError> {
    obj.get(field)
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| CoreError::Deserialize {
            message: format!("missing string field '{}'", field),
        })
}

fn get_f64(obj: &serde_json::Value, field: &str) -> Result<Option<f64>, CoreError> {
    match obj.get(field) {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::Number(n)) => Ok(n.as_f64()),
        Some(serde_json::Value::String(s)) => cast::parse_float(s)
            .map(Some)
            .ok_or_else(|| CoreError::Deserialize {
                message: format!("field '{}' is not a number: '{}'", field, s),
            }),
        Some(other) => Err(CoreError::Deserialize {
            message: format!("field '{}' is not a number: {}", field, other),
        }),
    }
}

fn get_array<'a>(
    obj: &'a serde_json::Value,
    field: &str,
) -> Result<&'a Vec<serde_json::Value>, CoreError> {
    obj.get(field)
        .and_then(|v| v.as_array())
        .ok_or_else(|| CoreError::Deserialize {
            message: format!("missing array field '{}'", field),
        })
}

fn parse_mapping(v: &serde_json::Value, base_type: Option<BaseType>) -> Result<Mapping, CoreError> {
    let base_type = base_type.ok_or_else(|| CoreError::Deserialize {
        message: "mapping requires a variable baseType".to_string(),
    })?;
    let mut entries = Vec::new();
    for entry in get_array(v, "entries")? {
        let key = entry.get("mapKey").ok_or_else(|| CoreError::Deserialize {
            message: "mapEntry missing 'mapKey'".to_string(),
        })?;
        let mapped_value = get_f64(entry, "mappedValue")?.ok_or_else(|| CoreError::Deserialize {
            message: "mapEntry missing 'mappedValue'".to_string(),
        })?;
        entries.push(MapEntry {
            map_key: cast::cast(base_type, key)?,
            mapped_value,
            case_sensitive: entry
                .get("caseSensitive")
                .and_then(|c| c.as_bool())
                .unwrap_or(true),
        });
    }
    Ok(Mapping {
        lower_bound: get_f64(v, "lowerBound")?,
        upper_bound: get_f64(v, "upperBound")?,
        default_value: get_f64(v, "defaultValue")?.unwrap_or(0.0),
        entries,
    })
}

fn parse_area_mapping(v: &serde_json::Value) -> Result<AreaMapping, CoreError> {
    let mut entries = Vec::new();
    for entry in get_array(v, "entries")? {
        let shape = get_str(entry, "shape")?;
        let coords = entry.get("coords").and_then(|c| c.as_str()).unwrap_or("");
        let mapped_value = get_f64(entry, "mappedValue")?.ok_or_else(|| CoreError::Deserialize {
            message: "areaMapEntry missing 'mappedValue'".to_string(),
        })?;
        entries.push(AreaMapEntry {
            shape: Shape::parse(&shape, coords)?,
            mapped_value,
        });
    }
    Ok(AreaMapping {
        lower_bound: get_f64(v, "lowerBound")?,
        upper_bound: get_f64(v, "upperBound")?,
        default_value: get_f64(v, "defaultValue")?.unwrap_or(0.0),
        entries,
    })
}

fn parse_lookup_table(
    v: &serde_json::Value,
    base_type: Option<BaseType>,
) -> Result<LookupTable, CoreError> {
    let base_type = base_type.ok_or_else(|| CoreError::Deserialize {
        message: "lookupTable requires a variable baseType".to_string(),
    })?;
    let target = |entry: &serde_json::Value| -> Result<Value, CoreError> {
        let raw = entry.get("targetValue").ok_or_else(|| CoreError::Deserialize {
            message: "lookup table entry missing 'targetValue'".to_string(),
        })?;
        cast::cast(base_type, raw)
    };
    let default_value = match v.get("defaultValue") {
        None | Some(serde_json::Value::Null) => None,
        Some(raw) => Some(cast::cast(base_type, raw)?),
    };
    match get_str(v, "kind")?.as_str() {
        "matchTable" => {
            let mut entries = Vec::new();
            for entry in get_array(v, "entries")? {
                let source_value = entry
                    .get("sourceValue")
                    .and_then(|s| s.as_i64())
                    .ok_or_else(|| CoreError::Deserialize {
                        message: "matchTableEntry 'sourceValue' must be an integer".to_string(),
                    })?;
                entries.push(MatchTableEntry {
                    source_value,
                    target_value: target(entry)?,
                });
            }
            Ok(LookupTable::Match {
                default_value,
                entries,
            })
        }
        "interpolationTable" => {
            let mut entries = Vec::new();
            for entry in get_array(v, "entries")? {
                let source_value =
                    get_f64(entry, "sourceValue")?.ok_or_else(|| CoreError::Deserialize {
                        message: "interpolationTableEntry missing 'sourceValue'".to_string(),
                    })?;
                entries.push(InterpolationTableEntry {
                    source_value,
                    include_boundary: entry
                        .get("includeBoundary")
                        .and_then(|b| b.as_bool())
                        .unwrap_or(true),
                    target_value: target(entry)?,
                });
            }
            Ok(LookupTable::Interpolation {
                default_value,
                entries,
            })
        }
        other => Err(CoreError::Deserialize {
            message: format!("unknown lookup table kind '{}'", other),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parse_outcome_with_default() {
        let var = Variable::from_json(&json!({
            "identifier": "SCORE",
            "cardinality": "single",
            "baseType": "float",
            "defaultValue": 0
        }))
        .unwrap();
        assert_eq!(var.value, Some(Data::Single(Value::Float(0.0))));
        assert_eq!(var.default_value, var.value);
    }

    #[test]
    fn explicit_null_value_overrides_default() {
        let var = Variable::from_json(&json!({
            "identifier": "SCORE",
            "baseType": "integer",
            "defaultValue": 1,
            "value": null
        }))
        .unwrap();
        assert_eq!(var.value, None);
    }

    #[test]
    fn missing_base_type_rejected() {
        let err = Variable::from_json(&json!({ "identifier": "X" })).unwrap_err();
        assert!(matches!(err, CoreError::Deserialize { .. }));
    }

    #[test]
    fn parse_response_with_mapping() {
        let var = Variable::from_json(&json!({
            "identifier": "RESPONSE",
            "cardinality": "multiple",
            "baseType": "identifier",
            "value": ["A", "C"],
            "correctResponse": ["A", "B"],
            "mapping": {
                "lowerBound": 0,
                "defaultValue": -1,
                "entries": [
                    { "mapKey": "A", "mappedValue": 1 },
                    { "mapKey": "B", "mappedValue": "0.5" }
                ]
            }
        }))
        .unwrap();
        let mapping = var.mapping.unwrap();
        assert_eq!(mapping.lower_bound, Some(0.0));
        assert_eq!(mapping.upper_bound, None);
        assert_eq!(mapping.default_value, -1.0);
        assert_eq!(mapping.entries[1].mapped_value, 0.5);
        assert!(mapping.entries[0].case_sensitive);
        assert_eq!(
            var.correct_response,
            Some(Data::List(vec![
                Value::Identifier("A".into()),
                Value::Identifier("B".into())
            ]))
        );
    }

    #[test]
    fn parse_area_mapping() {
        let var = Variable::from_json(&json!({
            "identifier": "POINT",
            "baseType": "point",
            "areaMapping": {
                "defaultValue": 0,
                "entries": [
                    { "shape": "circle", "coords": "10,10,5", "mappedValue": 2 }
                ]
            }
        }))
        .unwrap();
        let area = var.area_mapping.unwrap();
        assert_eq!(area.entries.len(), 1);
        assert!(area.entries[0].shape.contains(12.0, 12.0));
    }

    #[test]
    fn parse_lookup_tables() {
        let var = Variable::from_json(&json!({
            "identifier": "GRADE",
            "baseType": "identifier",
            "lookupTable": {
                "kind": "interpolationTable",
                "defaultValue": "F",
                "entries": [
                    { "sourceValue": 90, "targetValue": "A" },
                    { "sourceValue": 80, "includeBoundary": false, "targetValue": "B" }
                ]
            }
        }))
        .unwrap();
        match var.lookup_table.unwrap() {
            LookupTable::Interpolation {
                default_value,
                entries,
            } => {
                assert_eq!(default_value, Some(Value::Identifier("F".into())));
                assert!(!entries[1].include_boundary);
            }
            other => panic!("expected interpolation table, got {:?}", other),
        }
    }

    #[test]
    fn session_state_round_trip() {
        let state = SessionState::from_json(&json!([
            { "identifier": "SCORE", "baseType": "integer", "value": 3 },
            { "identifier": "RESPONSE", "baseType": "identifier", "value": null }
        ]))
        .unwrap();
        assert!(state.contains("SCORE"));
        assert_eq!(
            state.values_json(),
            json!({ "RESPONSE": null, "SCORE": 3 })
        );
    }
}
