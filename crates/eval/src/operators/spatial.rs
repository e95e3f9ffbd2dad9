//! `inside`: hit-test points against a shape.

use qti_core::{BaseType, Shape, Value};

use super::{boolean, null_single, OperatorContext};
use crate::attributes;
use crate::error::EvalError;
use crate::preprocess::Operand;

/// True when any point of the operand lies inside the `shape`/`coords`
/// region, edges included.
pub fn inside(ctx: &OperatorContext<'_>) -> Result<Operand, EvalError> {
    let expr = ctx.expression;
    let shape_name = attributes::required(expr, "shape")?;
    let coords = expr.attribute("coords").unwrap_or("");
    let shape = Shape::parse(shape_name, coords).map_err(|e| EvalError::InvalidAttribute {
        tag: expr.tag.clone(),
        attribute: "coords".to_string(),
        message: e.to_string(),
    })?;

    let Some(points) = ctx.operand(0) else {
        return Ok(null_single(BaseType::Boolean));
    };
    let hit = points.values().iter().any(|v| match v {
        Value::Point(x, y) => shape.contains(*x as f64, *y as f64),
        _ => false,
    });
    Ok(boolean(hit))
}
