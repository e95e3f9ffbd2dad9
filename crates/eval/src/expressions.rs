//! Leaf expressions: nodes evaluated without evaluating children first.
//!
//! `variable`, `correct` and `default` return `None` for an undeclared
//! identifier and a typed NULL for a declared variable without a value.
//! The two are different facts and callers can tell them apart.

use qti_core::{cast, BaseType, ExpressionNode, ProcessingValue, SessionState, Value, Variable};

use crate::attributes;
use crate::error::EvalError;
use crate::preprocess::{parse_variable, Operand};

/// Signature shared by leaf expression processors.
pub type ExpressionFn = fn(&ExpressionNode, &SessionState) -> Result<Operand, EvalError>;

fn identifier(expr: &ExpressionNode) -> Result<&str, EvalError> {
    attributes::required(expr, "identifier")
}

fn declared<'a>(expr: &ExpressionNode, state: &'a SessionState) -> Result<&'a Variable, EvalError> {
    let id = identifier(expr)?;
    state.get(id).ok_or_else(|| EvalError::MissingVariable {
        identifier: id.to_string(),
    })
}

pub fn base_value(expr: &ExpressionNode, _state: &SessionState) -> Result<Operand, EvalError> {
    let base_type: BaseType = attributes::required(expr, "baseType")?.parse()?;
    let literal = expr.literal.as_deref().unwrap_or("");
    let value = cast::cast_str(base_type, literal)?;
    Ok(Some(ProcessingValue::single(base_type, value)))
}

pub fn variable(expr: &ExpressionNode, state: &SessionState) -> Result<Operand, EvalError> {
    Ok(state.get(identifier(expr)?).map(Variable::to_processing_value))
}

pub fn correct(expr: &ExpressionNode, state: &SessionState) -> Result<Operand, EvalError> {
    Ok(state
        .get(identifier(expr)?)
        .map(Variable::correct_processing_value))
}

pub fn default(expr: &ExpressionNode, state: &SessionState) -> Result<Operand, EvalError> {
    Ok(state
        .get(identifier(expr)?)
        .map(Variable::default_processing_value))
}

pub fn null(_expr: &ExpressionNode, _state: &SessionState) -> Result<Operand, EvalError> {
    Ok(None)
}

pub fn math_constant(expr: &ExpressionNode, _state: &SessionState) -> Result<Operand, EvalError> {
    let value = match attributes::required(expr, "name")? {
        "pi" => std::f64::consts::PI,
        "e" => std::f64::consts::E,
        other => {
            return Err(EvalError::InvalidAttribute {
                tag: expr.tag.clone(),
                attribute: "name".to_string(),
                message: format!("unknown constant '{}'", other),
            })
        }
    };
    Ok(Some(ProcessingValue::float(value)))
}

// ──────────────────────────────────────────────
// Mappings
// ──────────────────────────────────────────────

fn clamp(value: f64, lower: Option<f64>, upper: Option<f64>) -> f64 {
    let value = lower.map_or(value, |l| value.max(l));
    upper.map_or(value, |u| value.min(u))
}

fn key_matches(key: &Value, case_sensitive: bool, candidate: &Value) -> bool {
    if !case_sensitive {
        if let (Some(a), Some(b)) = (key.as_text(), candidate.as_text()) {
            return a.to_lowercase() == b.to_lowercase();
        }
    }
    key.matches(candidate)
}

/// Sum of mapped values over the distinct response values.
///
/// Each map entry contributes at most once; a value no entry covers
/// contributes the default. The total is clamped to the mapping's bounds.
pub fn map_response(expr: &ExpressionNode, state: &SessionState) -> Result<Operand, EvalError> {
    let var = declared(expr, state)?;
    let mapping = var.mapping.as_ref().ok_or_else(|| {
        EvalError::type_error(format!("variable '{}' has no mapping", var.identifier))
    })?;
    if var.value.is_none() {
        return Ok(Some(ProcessingValue::float(clamp(
            mapping.default_value,
            mapping.lower_bound,
            mapping.upper_bound,
        ))));
    }

    let mut distinct: Vec<Value> = Vec::new();
    for v in parse_variable(var) {
        if !distinct.iter().any(|d| d.matches(&v)) {
            distinct.push(v);
        }
    }
    let mut used = vec![false; mapping.entries.len()];
    let mut total = 0.0;
    for v in &distinct {
        let hit = mapping
            .entries
            .iter()
            .position(|e| key_matches(&e.map_key, e.case_sensitive, v));
        match hit {
            Some(i) if !used[i] => {
                used[i] = true;
                total += mapping.entries[i].mapped_value;
            }
            Some(_) => {}
            None => total += mapping.default_value,
        }
    }
    Ok(Some(ProcessingValue::float(clamp(
        total,
        mapping.lower_bound,
        mapping.upper_bound,
    ))))
}

/// Sum of the mapped values of every area hit by at least one point.
///
/// A point outside every area contributes the default once per point.
pub fn map_response_point(
    expr: &ExpressionNode,
    state: &SessionState,
) -> Result<Operand, EvalError> {
    let var = declared(expr, state)?;
    let mapping = var.area_mapping.as_ref().ok_or_else(|| {
        EvalError::type_error(format!("variable '{}' has no area mapping", var.identifier))
    })?;
    if var.base_type != Some(BaseType::Point) {
        return Err(EvalError::type_error(format!(
            "mapResponsePoint needs a point variable, '{}' is not",
            var.identifier
        )));
    }
    let Some(data) = &var.value else {
        return Ok(Some(ProcessingValue::float(clamp(
            mapping.default_value,
            mapping.lower_bound,
            mapping.upper_bound,
        ))));
    };

    let mut used = vec![false; mapping.entries.len()];
    let mut total = 0.0;
    for value in data.values() {
        let Value::Point(x, y) = value else { continue };
        let hit = mapping
            .entries
            .iter()
            .position(|e| e.shape.contains(*x as f64, *y as f64));
        match hit {
            Some(i) if !used[i] => {
                used[i] = true;
                total += mapping.entries[i].mapped_value;
            }
            Some(_) => {}
            None => total += mapping.default_value,
        }
    }
    Ok(Some(ProcessingValue::float(clamp(
        total,
        mapping.lower_bound,
        mapping.upper_bound,
    ))))
}

// ──────────────────────────────────────────────
// Random values
// ──────────────────────────────────────────────

#[cfg(feature = "random")]
fn invalid_range(expr: &ExpressionNode, message: String) -> EvalError {
    EvalError::InvalidAttribute {
        tag: expr.tag.clone(),
        attribute: "max".to_string(),
        message,
    }
}

/// Uniform pick from `min, min + step, ..., <= max`.
#[cfg(feature = "random")]
pub fn random_integer(expr: &ExpressionNode, state: &SessionState) -> Result<Operand, EvalError> {
    use rand::Rng;

    let min = attributes::integer(expr, state, "min")?.unwrap_or(0);
    let max = attributes::require(expr, "max", attributes::integer(expr, state, "max")?)?;
    let step = attributes::integer(expr, state, "step")?.unwrap_or(1);
    if max < min || step < 1 {
        return Err(invalid_range(
            expr,
            format!("empty range min={} max={} step={}", min, max, step),
        ));
    }
    let slots = max
        .checked_sub(min)
        .ok_or_else(|| invalid_range(expr, format!("range {}..={} is too wide", min, max)))?
        / step;
    let pick = rand::thread_rng().gen_range(0..=slots);
    Ok(Some(ProcessingValue::integer(min + pick * step)))
}

#[cfg(feature = "random")]
pub fn random_float(expr: &ExpressionNode, state: &SessionState) -> Result<Operand, EvalError> {
    use rand::Rng;

    let min = attributes::float(expr, state, "min")?.unwrap_or(0.0);
    let max = attributes::require(expr, "max", attributes::float(expr, state, "max")?)?;
    if !min.is_finite() || !max.is_finite() || min > max {
        return Err(invalid_range(expr, format!("empty range min={} max={}", min, max)));
    }
    if !(max - min).is_finite() {
        return Err(invalid_range(expr, format!("range {}..{} is too wide", min, max)));
    }
    let value = if min == max {
        min
    } else {
        rand::thread_rng().gen_range(min..max)
    };
    Ok(Some(ProcessingValue::float(value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use qti_core::{AreaMapEntry, AreaMapping, Cardinality, Data, MapEntry, Mapping, Shape};

    fn node(tag: &str) -> ExpressionNode {
        ExpressionNode::new(tag)
    }

    #[test]
    fn base_value_casts_literal() {
        let n = ExpressionNode::base_value(BaseType::Integer, "42");
        let r = base_value(&n, &SessionState::new()).unwrap().unwrap();
        assert_eq!(r, ProcessingValue::integer(42));
    }

    #[test]
    fn base_value_requires_known_type() {
        let n = node("baseValue").with_attr("baseType", "complex").with_literal("1");
        assert!(matches!(
            base_value(&n, &SessionState::new()),
            Err(EvalError::Core(_))
        ));
    }

    #[test]
    fn variable_absent_versus_null() {
        let state = SessionState::new().with(Variable::single("X", BaseType::Integer));
        let absent = variable(&ExpressionNode::variable("Y"), &state).unwrap();
        assert!(absent.is_none());
        let null = variable(&ExpressionNode::variable("X"), &state).unwrap();
        let null = null.expect("declared variable yields a value");
        assert!(null.is_null());
        assert_eq!(null.base_type, Some(BaseType::Integer));
    }

    #[test]
    fn correct_and_default_read_declaration() {
        let state = SessionState::new().with(
            Variable::single("R", BaseType::Identifier)
                .with_correct_response(Some(Data::Single(Value::Identifier("A".into()))))
                .with_default(Some(Data::Single(Value::Identifier("Z".into())))),
        );
        let n = node("correct").with_attr("identifier", "R");
        assert_eq!(
            correct(&n, &state).unwrap().unwrap().as_single(),
            Some(&Value::Identifier("A".into()))
        );
        let n = node("default").with_attr("identifier", "R");
        assert_eq!(
            default(&n, &state).unwrap().unwrap().as_single(),
            Some(&Value::Identifier("Z".into()))
        );
    }

    #[test]
    fn math_constants() {
        let n = node("mathConstant").with_attr("name", "pi");
        assert_eq!(
            math_constant(&n, &SessionState::new()).unwrap(),
            Some(ProcessingValue::float(std::f64::consts::PI))
        );
    }

    fn mapped_state(value: Option<Data>) -> SessionState {
        let mapping = Mapping {
            lower_bound: Some(0.0),
            upper_bound: Some(2.0),
            default_value: -0.5,
            entries: vec![
                MapEntry {
                    map_key: Value::Identifier("A".into()),
                    mapped_value: 1.0,
                    case_sensitive: true,
                },
                MapEntry {
                    map_key: Value::Identifier("B".into()),
                    mapped_value: 1.5,
                    case_sensitive: true,
                },
            ],
        };
        SessionState::new().with(
            Variable::new("R", Cardinality::Multiple, Some(BaseType::Identifier))
                .with_value(value)
                .with_mapping(mapping),
        )
    }

    fn ids(ids: &[&str]) -> Option<Data> {
        Some(Data::List(ids.iter().map(|s| Value::Identifier(s.to_string())).collect()))
    }

    #[test]
    fn map_response_sums_and_clamps() {
        let n = node("mapResponse").with_attr("identifier", "R");
        let r = map_response(&n, &mapped_state(ids(&["A"]))).unwrap();
        assert_eq!(r, Some(ProcessingValue::float(1.0)));
        let r = map_response(&n, &mapped_state(ids(&["A", "B"]))).unwrap();
        assert_eq!(r, Some(ProcessingValue::float(2.0)));
    }

    #[test]
    fn map_response_counts_each_value_once() {
        let n = node("mapResponse").with_attr("identifier", "R");
        let r = map_response(&n, &mapped_state(ids(&["A", "A"]))).unwrap();
        assert_eq!(r, Some(ProcessingValue::float(1.0)));
    }

    #[test]
    fn map_response_unmapped_uses_default_and_lower_bound() {
        let n = node("mapResponse").with_attr("identifier", "R");
        let r = map_response(&n, &mapped_state(ids(&["Q"]))).unwrap();
        assert_eq!(r, Some(ProcessingValue::float(0.0)));
        let r = map_response(&n, &mapped_state(ids(&["A", "Q"]))).unwrap();
        assert_eq!(r, Some(ProcessingValue::float(0.5)));
    }

    #[test]
    fn map_response_needs_declared_mapping() {
        let n = node("mapResponse").with_attr("identifier", "NOPE");
        assert!(matches!(
            map_response(&n, &mapped_state(None)),
            Err(EvalError::MissingVariable { .. })
        ));
        let state = SessionState::new().with(Variable::single("R", BaseType::Identifier));
        let n = node("mapResponse").with_attr("identifier", "R");
        assert!(matches!(map_response(&n, &state), Err(EvalError::TypeError { .. })));
    }

    #[test]
    fn map_response_point_counts_areas_once() {
        let mapping = AreaMapping {
            lower_bound: None,
            upper_bound: None,
            default_value: 0.0,
            entries: vec![
                AreaMapEntry {
                    shape: Shape::parse("rect", "0,0,10,10").unwrap(),
                    mapped_value: 2.0,
                },
                AreaMapEntry {
                    shape: Shape::parse("circle", "50,50,5").unwrap(),
                    mapped_value: 3.0,
                },
            ],
        };
        let state = SessionState::new().with(
            Variable::new("P", Cardinality::Multiple, Some(BaseType::Point))
                .with_value(Some(Data::List(vec![
                    Value::Point(1, 1),
                    Value::Point(2, 2),
                    Value::Point(50, 52),
                ])))
                .with_area_mapping(mapping),
        );
        let n = node("mapResponsePoint").with_attr("identifier", "P");
        assert_eq!(
            map_response_point(&n, &state).unwrap(),
            Some(ProcessingValue::float(5.0))
        );
    }

    #[cfg(feature = "random")]
    #[test]
    fn random_integer_respects_step() {
        let n = node("randomInteger")
            .with_attr("min", "2")
            .with_attr("max", "10")
            .with_attr("step", "4");
        for _ in 0..50 {
            let v = random_integer(&n, &SessionState::new()).unwrap().unwrap();
            assert!(matches!(v.as_single(), Some(Value::Integer(2 | 6 | 10))));
        }
    }

    #[cfg(feature = "random")]
    #[test]
    fn random_float_in_range() {
        let n = node("randomFloat").with_attr("min", "1.5").with_attr("max", "2.5");
        let v = random_float(&n, &SessionState::new()).unwrap().unwrap();
        let f = v.as_single().and_then(Value::as_f64).unwrap();
        assert!((1.5..2.5).contains(&f));
    }

    #[cfg(feature = "random")]
    #[test]
    fn random_float_rejects_unrepresentable_width() {
        let n = node("randomFloat").with_attr("min", "-1e308").with_attr("max", "1e308");
        assert!(matches!(
            random_float(&n, &SessionState::new()),
            Err(EvalError::InvalidAttribute { .. })
        ));
    }

    #[cfg(feature = "random")]
    #[test]
    fn random_integer_rejects_empty_range() {
        let n = node("randomInteger").with_attr("min", "5").with_attr("max", "1");
        assert!(random_integer(&n, &SessionState::new()).is_err());
    }
}
