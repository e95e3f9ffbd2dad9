//! Typed processing values.
//!
//! A `ProcessingValue` is the result of evaluating one expression node.
//! Its `value` is `None` for the QTI NULL value. Containers never hold
//! null elements and are never empty: an empty container is NULL.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

use crate::cast;
use crate::error::CoreError;
use crate::types::{BaseType, Cardinality};

// ──────────────────────────────────────────────
// Scalar values
// ──────────────────────────────────────────────

/// A single QTI scalar.
///
/// `intOrIdentifier` values are stored as either `Integer` or `Identifier`.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Identifier(String),
    Boolean(bool),
    Integer(i64),
    Float(f64),
    String(String),
    Point(i64, i64),
    /// Unordered pair: `(A, B)` equals `(B, A)`.
    Pair(String, String),
    DirectedPair(String, String),
    Duration(time::Duration),
    File(String),
    Uri(String),
}

impl Value {
    /// Returns a human-readable type name for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Identifier(_) => "identifier",
            Value::Boolean(_) => "boolean",
            Value::Integer(_) => "integer",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::Point(..) => "point",
            Value::Pair(..) => "pair",
            Value::DirectedPair(..) => "directedPair",
            Value::Duration(_) => "duration",
            Value::File(_) => "file",
            Value::Uri(_) => "uri",
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Numeric view of integers and floats. NaN and infinities are returned as-is.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Text of string-like values.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Identifier(s) | Value::String(s) | Value::File(s) | Value::Uri(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_duration(&self) -> Option<time::Duration> {
        match self {
            Value::Duration(d) => Some(*d),
            _ => None,
        }
    }

    /// QTI value equality: pairs compare unordered, everything else structurally.
    pub fn matches(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Pair(a1, b1), Value::Pair(a2, b2)) => {
                (a1 == a2 && b1 == b2) || (a1 == b2 && b1 == a2)
            }
            _ => self == other,
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Value::Identifier(_) => 0,
            Value::Boolean(_) => 1,
            Value::Integer(_) => 2,
            Value::Float(_) => 3,
            Value::String(_) => 4,
            Value::Point(..) => 5,
            Value::Pair(..) => 6,
            Value::DirectedPair(..) => 7,
            Value::Duration(_) => 8,
            Value::File(_) => 9,
            Value::Uri(_) => 10,
        }
    }

    /// Total order used to canonicalise `multiple` containers.
    ///
    /// Values that `matches` each other compare `Equal`.
    pub fn total_cmp(&self, other: &Value) -> Ordering {
        match (self, other) {
            (Value::Identifier(a), Value::Identifier(b))
            | (Value::String(a), Value::String(b))
            | (Value::File(a), Value::File(b))
            | (Value::Uri(a), Value::Uri(b)) => a.cmp(b),
            (Value::Boolean(a), Value::Boolean(b)) => a.cmp(b),
            (Value::Integer(a), Value::Integer(b)) => a.cmp(b),
            (Value::Float(a), Value::Float(b)) => a.total_cmp(b),
            (Value::Point(x1, y1), Value::Point(x2, y2)) => (x1, y1).cmp(&(x2, y2)),
            (Value::Pair(a1, b1), Value::Pair(a2, b2)) => {
                let left = if a1 <= b1 { (a1, b1) } else { (b1, a1) };
                let right = if a2 <= b2 { (a2, b2) } else { (b2, a2) };
                left.cmp(&right)
            }
            (Value::DirectedPair(a1, b1), Value::DirectedPair(a2, b2)) => {
                (a1, b1).cmp(&(a2, b2))
            }
            (Value::Duration(a), Value::Duration(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }

    /// JSON rendering used for outcome reporting.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Identifier(s) | Value::String(s) | Value::File(s) | Value::Uri(s) => {
                serde_json::Value::String(s.clone())
            }
            Value::Boolean(b) => serde_json::Value::Bool(*b),
            Value::Integer(i) => serde_json::Value::from(*i),
            Value::Float(f) => float_to_json(*f),
            Value::Point(..) | Value::Pair(..) | Value::DirectedPair(..) => {
                serde_json::Value::String(self.to_string())
            }
            Value::Duration(d) => float_to_json(d.as_seconds_f64()),
        }
    }
}

fn float_to_json(f: f64) -> serde_json::Value {
    match serde_json::Number::from_f64(f) {
        Some(n) => serde_json::Value::Number(n),
        None if f.is_nan() => serde_json::Value::String("NaN".to_string()),
        None if f > 0.0 => serde_json::Value::String("INF".to_string()),
        None => serde_json::Value::String("-INF".to_string()),
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Identifier(s) | Value::String(s) | Value::File(s) | Value::Uri(s) => {
                f.write_str(s)
            }
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Float(x) if x.is_infinite() => {
                f.write_str(if *x > 0.0 { "INF" } else { "-INF" })
            }
            Value::Float(x) => write!(f, "{}", x),
            Value::Point(x, y) => write!(f, "{} {}", x, y),
            Value::Pair(a, b) | Value::DirectedPair(a, b) => write!(f, "{} {}", a, b),
            Value::Duration(d) => write!(f, "{}", d.as_seconds_f64()),
        }
    }
}

// ──────────────────────────────────────────────
// Processing values
// ──────────────────────────────────────────────

/// Non-null payload of a processing value, shaped by its cardinality.
#[derive(Debug, Clone, PartialEq)]
pub enum Data {
    Single(Value),
    /// `multiple` or `ordered`; never empty.
    List(Vec<Value>),
    Record(BTreeMap<String, ProcessingValue>),
}

impl Data {
    /// Scalars held by this payload; records contribute none.
    pub fn values(&self) -> &[Value] {
        match self {
            Data::Single(v) => std::slice::from_ref(v),
            Data::List(vs) => vs,
            Data::Record(_) => &[],
        }
    }
}

/// A typed value produced by one evaluation step.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessingValue {
    pub cardinality: Cardinality,
    /// `None` only for `record` cardinality.
    pub base_type: Option<BaseType>,
    /// `None` is the QTI NULL value.
    pub value: Option<Data>,
}

impl ProcessingValue {
    pub fn single(base_type: BaseType, value: Value) -> Self {
        ProcessingValue {
            cardinality: Cardinality::Single,
            base_type: Some(base_type),
            value: Some(Data::Single(value)),
        }
    }

    pub fn boolean(b: bool) -> Self {
        Self::single(BaseType::Boolean, Value::Boolean(b))
    }

    pub fn integer(i: i64) -> Self {
        Self::single(BaseType::Integer, Value::Integer(i))
    }

    pub fn float(f: f64) -> Self {
        Self::single(BaseType::Float, Value::Float(f))
    }

    /// A well-formed NULL of the given shape.
    pub fn null(cardinality: Cardinality, base_type: Option<BaseType>) -> Self {
        ProcessingValue {
            cardinality,
            base_type,
            value: None,
        }
    }

    /// Build a `multiple` or `ordered` container. An empty list yields NULL.
    pub fn container(cardinality: Cardinality, base_type: BaseType, values: Vec<Value>) -> Self {
        ProcessingValue {
            cardinality,
            base_type: Some(base_type),
            value: if values.is_empty() {
                None
            } else {
                Some(Data::List(values))
            },
        }
    }

    pub fn record(fields: BTreeMap<String, ProcessingValue>) -> Self {
        ProcessingValue {
            cardinality: Cardinality::Record,
            base_type: None,
            value: if fields.is_empty() {
                None
            } else {
                Some(Data::Record(fields))
            },
        }
    }

    /// Wrap a stored payload with its declared shape.
    pub fn from_data(
        cardinality: Cardinality,
        base_type: Option<BaseType>,
        value: Option<Data>,
    ) -> Self {
        ProcessingValue {
            cardinality,
            base_type,
            value,
        }
    }

    pub fn is_null(&self) -> bool {
        self.value.is_none()
    }

    /// Scalars held by this value; empty for NULL and records.
    pub fn values(&self) -> &[Value] {
        self.value.as_ref().map(Data::values).unwrap_or(&[])
    }

    /// The scalar of a non-null `single` value.
    pub fn as_single(&self) -> Option<&Value> {
        match &self.value {
            Some(Data::Single(v)) => Some(v),
            _ => None,
        }
    }

    pub fn fields(&self) -> Option<&BTreeMap<String, ProcessingValue>> {
        match &self.value {
            Some(Data::Record(fields)) => Some(fields),
            _ => None,
        }
    }

    /// Build a processing value from raw host JSON, casting through the
    /// type caster. `null` (or an empty array) yields NULL.
    pub fn from_json(
        cardinality: Cardinality,
        base_type: Option<BaseType>,
        raw: &serde_json::Value,
    ) -> Result<Self, CoreError> {
        let data = parse_data(cardinality, base_type, raw)?;
        Ok(ProcessingValue {
            cardinality,
            base_type,
            value: data,
        })
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "cardinality": self.cardinality,
            "baseType": self.base_type,
            "value": data_to_json(self.value.as_ref()),
        })
    }
}

/// Parse a raw JSON payload for the given shape.
pub fn parse_data(
    cardinality: Cardinality,
    base_type: Option<BaseType>,
    raw: &serde_json::Value,
) -> Result<Option<Data>, CoreError> {
    if raw.is_null() {
        return Ok(None);
    }
    match cardinality {
        Cardinality::Record => {
            let obj = raw.as_object().ok_or_else(|| CoreError::Deserialize {
                message: "record value must be a JSON object".to_string(),
            })?;
            let mut fields = BTreeMap::new();
            for (name, field) in obj {
                fields.insert(name.clone(), parse_record_field(field)?);
            }
            if fields.is_empty() {
                Ok(None)
            } else {
                Ok(Some(Data::Record(fields)))
            }
        }
        _ => {
            let base_type = base_type.ok_or_else(|| CoreError::Deserialize {
                message: format!("{} value requires a baseType", cardinality),
            })?;
            if cardinality == Cardinality::Single {
                return Ok(Some(Data::Single(cast::cast(base_type, raw)?)));
            }
            let items = match raw.as_array() {
                Some(items) => items.as_slice(),
                None => std::slice::from_ref(raw),
            };
            let mut values = Vec::with_capacity(items.len());
            for item in items.iter().filter(|i| !i.is_null()) {
                values.push(cast::cast(base_type, item)?);
            }
            if values.is_empty() {
                Ok(None)
            } else {
                Ok(Some(Data::List(values)))
            }
        }
    }
}

/// Record fields are either a full `{cardinality, baseType, value}` object
/// or a bare scalar whose base type is inferred from the JSON kind.
fn parse_record_field(field: &serde_json::Value) -> Result<ProcessingValue, CoreError> {
    if let Some(obj) = field.as_object() {
        if obj.contains_key("baseType") || obj.contains_key("cardinality") {
            let cardinality = match obj.get("cardinality").and_then(|c| c.as_str()) {
                Some(c) => c.parse()?,
                None => Cardinality::Single,
            };
            let base_type = match obj.get("baseType").and_then(|b| b.as_str()) {
                Some(b) => Some(b.parse()?),
                None => None,
            };
            let raw = obj.get("value").unwrap_or(&serde_json::Value::Null);
            return ProcessingValue::from_json(cardinality, base_type, raw);
        }
    }
    let base_type = match field {
        serde_json::Value::Bool(_) => BaseType::Boolean,
        serde_json::Value::Number(n) if n.is_i64() => BaseType::Integer,
        serde_json::Value::Number(_) => BaseType::Float,
        serde_json::Value::String(_) => BaseType::String,
        serde_json::Value::Null => {
            return Ok(ProcessingValue::null(Cardinality::Single, None));
        }
        _ => {
            return Err(CoreError::Deserialize {
                message: "record field must be a scalar or a typed value object".to_string(),
            })
        }
    };
    ProcessingValue::from_json(Cardinality::Single, Some(base_type), field)
}

/// JSON rendering of a payload; NULL renders as JSON `null`.
pub fn data_to_json(data: Option<&Data>) -> serde_json::Value {
    match data {
        None => serde_json::Value::Null,
        Some(Data::Single(v)) => v.to_json(),
        Some(Data::List(vs)) => serde_json::Value::Array(vs.iter().map(Value::to_json).collect()),
        Some(Data::Record(fields)) => {
            let mut obj = serde_json::Map::new();
            for (name, field) in fields {
                obj.insert(name.clone(), field.to_json());
            }
            serde_json::Value::Object(obj)
        }
    }
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────
