//! Transform Executor
//!
//! Applies a transform and its parameters to one raw value. Pure: no state, no
//! logging. Failures come back as [`TransformError`] so callers can report
//! them per row.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Number, Value};

use super::kinds::{integer_param, number_param, validate_params, TransformKind, MAX_DECIMALS};
use crate::error::{TransformError, TransformResult};
use crate::models::TransformParams;

/// Date tokens understood by `date_format` / `date_parse`.
static DATE_TOKENS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"yyyy|MM|dd|HH|mm|ss").expect("static date token pattern"));

/// Input layouts accepted by `date_format` besides RFC 3339.
const DATE_INPUT_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

const DATE_ONLY_INPUT_FORMATS: [&str; 2] = ["%Y-%m-%d", "%m/%d/%Y"];

/// Apply a transform to a value.
///
/// Parameters are read leniently (absent optional parameters take their
/// defaults). Use [`apply_checked`] to validate the payload first.
pub fn apply(kind: TransformKind, params: Option<&TransformParams>, value: &Value) -> TransformResult<Value> {
    match kind {
        TransformKind::Direct => Ok(value.clone()),
        TransformKind::Uppercase => Ok(Value::String(stringify(value).to_uppercase())),
        TransformKind::Lowercase => Ok(Value::String(stringify(value).to_lowercase())),
        TransformKind::Trim => Ok(Value::String(stringify(value).trim().to_string())),
        TransformKind::EqualsY => Ok(Value::Bool(stringify(value).eq_ignore_ascii_case("y"))),
        TransformKind::Multiply => {
            let factor = required_number(kind, params, "factor")?;
            number_value(kind, numeric_input(kind, value)? * factor)
        }
        TransformKind::Divide => {
            let divisor = required_number(kind, params, "divisor")?;
            if divisor == 0.0 {
                return Err(invalid(kind, "divisor must not be zero"));
            }
            number_value(kind, numeric_input(kind, value)? / divisor)
        }
        TransformKind::Round => {
            let decimals = optional_integer(kind, params, "decimals")?.unwrap_or(2);
            if !(0..=MAX_DECIMALS).contains(&decimals) {
                return Err(invalid(kind, format!("decimals must be between 0 and {}", MAX_DECIMALS)));
            }
            let factor = 10f64.powi(decimals as i32);
            let input = numeric_input(kind, value)?;
            let scaled = input * factor;
            if !scaled.is_finite() {
                // Already past the precision that rounding could change.
                return number_value(kind, input);
            }
            number_value(kind, scaled.round() / factor)
        }
        TransformKind::Substring => {
            let start = optional_integer(kind, params, "start")?.unwrap_or(0);
            let length = optional_integer(kind, params, "length")?;
            Ok(Value::String(substring(&stringify(value), start, length)))
        }
        TransformKind::Replace => {
            let search = required_string(kind, params, "search")?;
            let replacement = optional_string(params, "replace").unwrap_or_default();
            Ok(Value::String(stringify(value).replacen(&search, &replacement, 1)))
        }
        TransformKind::Default => {
            let default = required_string(kind, params, "defaultValue")?;
            let missing = match value {
                Value::Null => true,
                Value::String(s) => s.is_empty(),
                _ => false,
            };
            Ok(if missing { Value::String(default) } else { value.clone() })
        }
        TransformKind::DateParse => {
            let format = required_string(kind, params, "format")?;
            parse_date(&stringify(value), &format)
        }
        TransformKind::DateFormat => {
            let format = required_string(kind, params, "format")?;
            format_date(value, &format)
        }
    }
}

/// Validate parameters against the catalog schema, then apply.
pub fn apply_checked(
    kind: TransformKind,
    params: Option<&TransformParams>,
    value: &Value,
) -> TransformResult<Value> {
    validate_params(kind, params)?;
    apply(kind, params, value)
}

/// String representation used by text transforms.
pub fn stringify(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}

fn invalid(kind: TransformKind, message: impl Into<String>) -> TransformError {
    TransformError::InvalidParams {
        kind: kind.as_str().to_string(),
        message: message.into(),
    }
}

fn param<'a>(params: Option<&'a TransformParams>, name: &str) -> Option<&'a Value> {
    params.and_then(|p| p.get(name)).filter(|v| !v.is_null())
}

fn required_number(kind: TransformKind, params: Option<&TransformParams>, name: &str) -> TransformResult<f64> {
    let value = param(params, name).ok_or_else(|| invalid(kind, format!("'{}' is required", name)))?;
    number_param(value).ok_or_else(|| invalid(kind, format!("'{}' must be a number", name)))
}

fn optional_integer(
    kind: TransformKind,
    params: Option<&TransformParams>,
    name: &str,
) -> TransformResult<Option<i64>> {
    match param(params, name) {
        None => Ok(None),
        Some(v) => integer_param(v)
            .map(Some)
            .ok_or_else(|| invalid(kind, format!("'{}' must be an integer", name))),
    }
}

fn required_string(kind: TransformKind, params: Option<&TransformParams>, name: &str) -> TransformResult<String> {
    param(params, name)
        .map(stringify)
        .ok_or_else(|| invalid(kind, format!("'{}' is required", name)))
}

fn optional_string(params: Option<&TransformParams>, name: &str) -> Option<String> {
    param(params, name).map(stringify)
}

fn numeric_input(kind: TransformKind, value: &Value) -> TransformResult<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed
        .filter(|f| f.is_finite())
        .ok_or_else(|| invalid(kind, format!("value '{}' is not numeric", stringify(value))))
}

/// Integral results become JSON integers so `10 * 2` reads back as `20`.
fn number_value(kind: TransformKind, n: f64) -> TransformResult<Value> {
    const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

    if !n.is_finite() {
        return Err(invalid(kind, "result is not a finite number"));
    }
    if n.fract() == 0.0 && n.abs() <= MAX_SAFE_INTEGER {
        return Ok(Value::from(n as i64));
    }
    Number::from_f64(n)
        .map(Value::Number)
        .ok_or_else(|| invalid(kind, "result is not a finite number"))
}

/// Character-based substring with clamped, order-insensitive bounds.
fn substring(s: &str, start: i64, length: Option<i64>) -> String {
    let chars: Vec<char> = s.chars().collect();
    let len = chars.len() as i64;

    let from = start.clamp(0, len);
    let to = match length {
        Some(l) => start.saturating_add(l).clamp(0, len),
        None => len,
    };
    let (from, to) = if to < from { (to, from) } else { (from, to) };

    chars[from as usize..to as usize].iter().collect()
}

/// Translate a `yyyy-MM-dd HH:mm:ss` style pattern to a chrono format string.
fn chrono_format(format: &str) -> String {
    let escaped = format.replace('%', "%%");
    DATE_TOKENS
        .replace_all(&escaped, |caps: &regex::Captures| match &caps[0] {
            "yyyy" => "%Y",
            "MM" => "%m",
            "dd" => "%d",
            "HH" => "%H",
            "mm" => "%M",
            _ => "%S",
        })
        .into_owned()
}

fn has_time_tokens(format: &str) -> bool {
    format.contains("HH") || format.contains("mm") || format.contains("ss")
}

fn parse_date(input: &str, format: &str) -> TransformResult<Value> {
    let pattern = chrono_format(format);
    let text = input.trim();
    let err = || TransformError::InvalidDate {
        value: input.to_string(),
        format: format.to_string(),
    };

    if has_time_tokens(format) {
        let dt = NaiveDateTime::parse_from_str(text, &pattern).map_err(|_| err())?;
        Ok(Value::String(dt.format("%Y-%m-%dT%H:%M:%S").to_string()))
    } else {
        let date = NaiveDate::parse_from_str(text, &pattern).map_err(|_| err())?;
        Ok(Value::String(date.format("%Y-%m-%d").to_string()))
    }
}

fn format_date(value: &Value, format: &str) -> TransformResult<Value> {
    let input = stringify(value);
    let dt = read_date(value).ok_or_else(|| TransformError::InvalidDate {
        value: input,
        format: format.to_string(),
    })?;
    Ok(Value::String(dt.format(&chrono_format(format)).to_string()))
}

/// Read a date from an ISO-ish string or epoch milliseconds.
fn read_date(value: &Value) -> Option<NaiveDateTime> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .and_then(|ms| DateTime::from_timestamp_millis(ms))
            .map(|dt| dt.naive_utc()),
        Value::String(s) => {
            let text = s.trim();
            if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
                return Some(dt.naive_utc());
            }
            if let Some(dt) = DATE_INPUT_FORMATS
                .iter()
                .find_map(|f| NaiveDateTime::parse_from_str(text, f).ok())
            {
                return Some(dt);
            }
            DATE_ONLY_INPUT_FORMATS
                .iter()
                .find_map(|f| NaiveDate::parse_from_str(text, f).ok())
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        }
        _ => None,
    }
}
