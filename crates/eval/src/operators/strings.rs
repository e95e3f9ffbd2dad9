//! String operators: `stringMatch`, `patternMatch`, `substring`.

use qti_core::BaseType;
use regex::Regex;

use super::{boolean, null_single, OperatorContext};
use crate::attributes;
use crate::error::EvalError;
use crate::preprocess::Operand;

fn text<'a>(ctx: &OperatorContext<'a>, index: usize) -> Option<&'a str> {
    ctx.operand(index)?.as_single()?.as_text()
}

fn text_pair<'a>(ctx: &OperatorContext<'a>) -> Option<(&'a str, &'a str)> {
    Some((text(ctx, 0)?, text(ctx, 1)?))
}

/// Compare two strings; with `substring="true"` the first need only occur
/// inside the second.
pub fn string_match(ctx: &OperatorContext<'_>) -> Result<Operand, EvalError> {
    let expr = ctx.expression;
    attributes::required(expr, "caseSensitive")?;
    let case_sensitive = attributes::boolean(expr, "caseSensitive", true)?;
    let substring = attributes::boolean(expr, "substring", false)?;

    let Some((a, b)) = text_pair(ctx) else {
        return Ok(null_single(BaseType::Boolean));
    };
    let (a, b) = if case_sensitive {
        (a.to_string(), b.to_string())
    } else {
        (a.to_lowercase(), b.to_lowercase())
    };
    Ok(boolean(if substring { b.contains(&a) } else { a == b }))
}

/// True when the whole operand matches the `pattern` attribute.
pub fn pattern_match(ctx: &OperatorContext<'_>) -> Result<Operand, EvalError> {
    let expr = ctx.expression;
    let pattern = attributes::require(
        expr,
        "pattern",
        attributes::string(expr, ctx.state, "pattern")?,
    )?;
    let regex = Regex::new(&format!("^(?:{})$", pattern)).map_err(|e| {
        EvalError::InvalidAttribute {
            tag: expr.tag.clone(),
            attribute: "pattern".to_string(),
            message: e.to_string(),
        }
    })?;
    match text(ctx, 0) {
        Some(s) => Ok(boolean(regex.is_match(s))),
        None => Ok(null_single(BaseType::Boolean)),
    }
}

/// True when the first operand occurs inside the second.
pub fn substring(ctx: &OperatorContext<'_>) -> Result<Operand, EvalError> {
    let case_sensitive = attributes::boolean(ctx.expression, "caseSensitive", true)?;
    let Some((needle, haystack)) = text_pair(ctx) else {
        return Ok(null_single(BaseType::Boolean));
    };
    let found = if case_sensitive {
        haystack.contains(needle)
    } else {
        haystack.to_lowercase().contains(&needle.to_lowercase())
    };
    Ok(boolean(found))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operators::test_support::*;
    use qti_core::{Data, SessionState, Value, Variable};

    fn value(r: Result<Operand, EvalError>) -> Option<Value> {
        single_value(&r.unwrap())
    }

    #[test]
    fn string_match_case_handling() {
        let insensitive = node("stringMatch").with_attr("caseSensitive", "false");
        assert_eq!(
            value(call(string_match, &insensitive, vec![string("Paris"), string("PARIS")])),
            Some(Value::Boolean(true))
        );
        let sensitive = node("stringMatch").with_attr("caseSensitive", "true");
        assert_eq!(
            value(call(string_match, &sensitive, vec![string("Paris"), string("PARIS")])),
            Some(Value::Boolean(false))
        );
    }

    #[test]
    fn string_match_requires_case_attribute() {
        assert!(matches!(
            call(string_match, &node("stringMatch"), vec![string("a"), string("a")]),
            Err(EvalError::InvalidAttribute { .. })
        ));
    }

    #[test]
    fn string_match_substring_mode() {
        let n = node("stringMatch")
            .with_attr("caseSensitive", "true")
            .with_attr("substring", "true");
        assert_eq!(
            value(call(string_match, &n, vec![string("ar"), string("Paris")])),
            Some(Value::Boolean(true))
        );
    }

    #[test]
    fn pattern_match_is_anchored() {
        let n = node("patternMatch").with_attr("pattern", "[0-9]+");
        assert_eq!(value(call(pattern_match, &n, vec![string("123")])), Some(Value::Boolean(true)));
        assert_eq!(value(call(pattern_match, &n, vec![string("12a")])), Some(Value::Boolean(false)));
        assert!(is_null_result(&call(pattern_match, &n, vec![None]).unwrap()));
    }

    #[test]
    fn pattern_from_variable() {
        let state = SessionState::new().with(
            Variable::single("PAT", BaseType::String)
                .with_value(Some(Data::Single(Value::String("a|b".into())))),
        );
        let n = node("patternMatch").with_attr("pattern", "{PAT}");
        assert_eq!(
            value(call_with_state(pattern_match, &n, vec![string("b")], &state)),
            Some(Value::Boolean(true))
        );
    }

    #[test]
    fn invalid_pattern_is_an_attribute_error() {
        let n = node("patternMatch").with_attr("pattern", "(unclosed");
        assert!(matches!(
            call(pattern_match, &n, vec![string("x")]),
            Err(EvalError::InvalidAttribute { .. })
        ));
    }

    #[test]
    fn substring_defaults_case_sensitive() {
        let n = node("substring");
        assert_eq!(value(call(substring, &n, vec![string("ell"), string("Hello")])), Some(Value::Boolean(true)));
        assert_eq!(value(call(substring, &n, vec![string("ELL"), string("Hello")])), Some(Value::Boolean(false)));
        let n = node("substring").with_attr("caseSensitive", "false");
        assert_eq!(value(call(substring, &n, vec![string("ELL"), string("Hello")])), Some(Value::Boolean(true)));
    }
}
