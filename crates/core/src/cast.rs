//! Type caster: raw host values into typed `Value`s, one coercion per base type.
//!
//! Numeric casts never fail. An unparseable integer or float becomes a
//! `Value::Float(NaN)` sentinel that numeric operators filter out later.
//! Structural casts (points, pairs, durations, booleans) report
//! `CoreError::Cast` because there is no meaningful sentinel for them.

use crate::error::CoreError;
use crate::types::BaseType;
use crate::value::Value;

const NAN_SENTINEL: Value = Value::Float(f64::NAN);

/// Seconds per ISO-8601 designator. Years and months use fixed lengths.
const SECONDS_PER_MINUTE: f64 = 60.0;
const SECONDS_PER_HOUR: f64 = 3_600.0;
const SECONDS_PER_DAY: f64 = 86_400.0;
const SECONDS_PER_WEEK: f64 = 7.0 * SECONDS_PER_DAY;
const SECONDS_PER_MONTH: f64 = 30.0 * SECONDS_PER_DAY;
const SECONDS_PER_YEAR: f64 = 365.0 * SECONDS_PER_DAY;

/// Cast a raw JSON value to the given base type.
pub fn cast(base_type: BaseType, raw: &serde_json::Value) -> Result<Value, CoreError> {
    match raw {
        serde_json::Value::String(s) => cast_str(base_type, s),
        serde_json::Value::Number(n) => cast_number(base_type, n),
        serde_json::Value::Bool(b) => match base_type {
            BaseType::Boolean => Ok(Value::Boolean(*b)),
            BaseType::Integer => Ok(Value::Integer(i64::from(*b))),
            BaseType::Float => Ok(Value::Float(if *b { 1.0 } else { 0.0 })),
            _ => cast_str(base_type, &b.to_string()),
        },
        serde_json::Value::Array(items) if items.len() == 2 => {
            let first = json_text(&items[0]);
            let second = json_text(&items[1]);
            cast_str(base_type, &format!("{} {}", first, second))
        }
        serde_json::Value::Null => Err(cast_error(base_type, "null", "NULL has no scalar form")),
        other => match base_type {
            BaseType::File => Ok(Value::File(other.to_string())),
            _ => Err(cast_error(
                base_type,
                &other.to_string(),
                "unsupported JSON kind",
            )),
        },
    }
}

/// Cast a literal string (e.g. the text of a `baseValue`) to the given base type.
pub fn cast_str(base_type: BaseType, raw: &str) -> Result<Value, CoreError> {
    match base_type {
        BaseType::Integer => Ok(parse_integer(raw).map_or(NAN_SENTINEL, Value::Integer)),
        BaseType::Float => Ok(parse_float(raw).map_or(NAN_SENTINEL, Value::Float)),
        BaseType::Boolean => match raw.trim() {
            "true" | "1" => Ok(Value::Boolean(true)),
            "false" | "0" => Ok(Value::Boolean(false)),
            _ => Err(cast_error(base_type, raw, "expected 'true' or 'false'")),
        },
        BaseType::Identifier => Ok(Value::Identifier(raw.trim().to_string())),
        BaseType::String => Ok(Value::String(raw.to_string())),
        BaseType::Uri => Ok(Value::Uri(raw.trim().to_string())),
        BaseType::File => Ok(Value::File(raw.to_string())),
        BaseType::Point => {
            let (x, y) = split_two(base_type, raw)?;
            let x = x
                .parse::<i64>()
                .map_err(|e| cast_error(base_type, raw, &e.to_string()))?;
            let y = y
                .parse::<i64>()
                .map_err(|e| cast_error(base_type, raw, &e.to_string()))?;
            Ok(Value::Point(x, y))
        }
        BaseType::Pair => {
            let (a, b) = split_two(base_type, raw)?;
            Ok(Value::Pair(a.to_string(), b.to_string()))
        }
        BaseType::DirectedPair => {
            let (a, b) = split_two(base_type, raw)?;
            Ok(Value::DirectedPair(a.to_string(), b.to_string()))
        }
        BaseType::Duration => parse_duration(raw).map(Value::Duration),
        BaseType::IntOrIdentifier => {
            let trimmed = raw.trim();
            match trimmed.parse::<i64>() {
                Ok(i) => Ok(Value::Integer(i)),
                Err(_) => Ok(Value::Identifier(trimmed.to_string())),
            }
        }
    }
}

fn cast_number(base_type: BaseType, n: &serde_json::Number) -> Result<Value, CoreError> {
    match base_type {
        BaseType::Integer | BaseType::IntOrIdentifier => {
            if let Some(i) = n.as_i64() {
                return Ok(Value::Integer(i));
            }
            // Fractional input truncates toward zero like a leading-digits parse.
            match n.as_f64() {
                Some(f) if f.is_finite() && f.abs() < i64::MAX as f64 => {
                    Ok(Value::Integer(f.trunc() as i64))
                }
                _ => Ok(NAN_SENTINEL),
            }
        }
        BaseType::Float => Ok(Value::Float(n.as_f64().unwrap_or(f64::NAN))),
        BaseType::Boolean => match n.as_f64() {
            Some(f) if f == 0.0 => Ok(Value::Boolean(false)),
            Some(f) if f == 1.0 => Ok(Value::Boolean(true)),
            _ => Err(cast_error(base_type, &n.to_string(), "expected 0 or 1")),
        },
        BaseType::Duration => {
            let secs = n.as_f64().unwrap_or(f64::NAN);
            seconds_to_duration(secs)
                .map(Value::Duration)
                .ok_or_else(|| cast_error(base_type, &n.to_string(), "duration out of range"))
        }
        _ => cast_str(base_type, &n.to_string()),
    }
}

/// Leading-digits integer parse: optional sign, then decimal digits up to
/// the first non-digit. `None` when no digit is present or on overflow.
pub fn parse_integer(raw: &str) -> Option<i64> {
    let s = raw.trim_start();
    let (sign, rest) = match s.as_bytes().first() {
        Some(b'-') => ("-", &s[1..]),
        Some(b'+') => ("", &s[1..]),
        _ => ("", s),
    };
    let digits: &str = {
        let end = rest
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(rest.len());
        &rest[..end]
    };
    if digits.is_empty() {
        return None;
    }
    format!("{}{}", sign, digits).parse::<i64>().ok()
}

/// Float parse accepting the XML Schema spellings `INF`, `-INF` and `NaN`.
pub fn parse_float(raw: &str) -> Option<f64> {
    let s = raw.trim();
    match s {
        "INF" | "+INF" => Some(f64::INFINITY),
        "-INF" => Some(f64::NEG_INFINITY),
        _ => s.parse::<f64>().ok(),
    }
}

/// Parse an ISO-8601 duration (`P1DT2H30M`, `PT1.5S`, `-P2W`) or plain seconds.
pub fn parse_duration(raw: &str) -> Result<time::Duration, CoreError> {
    let s = raw.trim();
    let invalid = |reason: &str| cast_error(BaseType::Duration, raw, reason);

    let (negative, body) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s),
    };
    let Some(body) = body.strip_prefix('P') else {
        let secs = s.parse::<f64>().map_err(|_| invalid("not ISO-8601 or seconds"))?;
        return seconds_to_duration(secs).ok_or_else(|| invalid("duration out of range"));
    };
    if body.is_empty() {
        return Err(invalid("empty duration"));
    }

    let mut total = 0.0_f64;
    let mut in_time = false;
    let mut number = String::new();
    let mut saw_component = false;
    let mut saw_time_component = false;
    for c in body.chars() {
        match c {
            'T' if !in_time && number.is_empty() => in_time = true,
            '0'..='9' | '.' | ',' => number.push(if c == ',' { '.' } else { c }),
            designator => {
                let amount = number
                    .parse::<f64>()
                    .map_err(|_| invalid("missing number before designator"))?;
                let unit = match (in_time, designator) {
                    (false, 'Y') => SECONDS_PER_YEAR,
                    (false, 'M') => SECONDS_PER_MONTH,
                    (false, 'W') => SECONDS_PER_WEEK,
                    (false, 'D') => SECONDS_PER_DAY,
                    (true, 'H') => SECONDS_PER_HOUR,
                    (true, 'M') => SECONDS_PER_MINUTE,
                    (true, 'S') => 1.0,
                    _ => return Err(invalid("unexpected designator")),
                };
                total += amount * unit;
                number.clear();
                saw_component = true;
                saw_time_component = in_time;
            }
        }
    }
    if !number.is_empty() || !saw_component {
        return Err(invalid("incomplete duration"));
    }
    if in_time && !saw_time_component {
        return Err(invalid("time designator without a time component"));
    }
    let secs = if negative { -total } else { total };
    seconds_to_duration(secs).ok_or_else(|| invalid("duration out of range"))
}

fn seconds_to_duration(secs: f64) -> Option<time::Duration> {
    if secs.is_finite() && secs.abs() < i64::MAX as f64 {
        Some(time::Duration::seconds_f64(secs))
    } else {
        None
    }
}

fn split_two(base_type: BaseType, raw: &str) -> Result<(&str, &str), CoreError> {
    let mut parts = raw.split_whitespace();
    match (parts.next(), parts.next(), parts.next()) {
        (Some(a), Some(b), None) => Ok((a, b)),
        _ => Err(cast_error(base_type, raw, "expected two space-separated components")),
    }
}

fn json_text(v: &serde_json::Value) -> String {
    match v {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn cast_error(base_type: BaseType, raw: &str, reason: &str) -> CoreError {
    CoreError::Cast {
        base_type,
        raw: raw.to_string(),
        reason: reason.to_string(),
    }
}
