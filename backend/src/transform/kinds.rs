//! Transform Catalog
//!
//! The fixed set of value transforms a mapping can carry, their labels, and the
//! parameter schema each one accepts. Parameter editors render from
//! [`ParamSchema`]; [`validate_params`] checks payloads before execution.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use crate::error::{TransformError, TransformResult};
use crate::models::TransformParams;

/// All available transforms
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransformKind {
    /// Pass the value through unchanged
    #[default]
    Direct,
    Uppercase,
    Lowercase,
    Trim,
    /// `true` iff the value is "Y" (any case)
    EqualsY,
    DateFormat,
    DateParse,
    Multiply,
    Divide,
    Round,
    Substring,
    Replace,
    Default,
}

/// Catalog entry for listings.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransformKindInfo {
    pub kind: TransformKind,
    pub label: &'static str,
    pub has_params: bool,
}

/// Type of a single parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    Number,
    Integer,
    String,
}

/// One parameter accepted by a transform.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParamSpec {
    pub name: &'static str,
    pub label: &'static str,
    pub param_type: ParamType,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

impl ParamSpec {
    fn required(name: &'static str, label: &'static str, param_type: ParamType) -> Self {
        Self { name, label, param_type, required: true, default: None }
    }

    fn optional(name: &'static str, label: &'static str, param_type: ParamType) -> Self {
        Self { name, label, param_type, required: false, default: None }
    }

    fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }
}

/// Parameter schema of a transform.
#[derive(Debug, Clone, Serialize)]
pub struct ParamSchema {
    pub kind: TransformKind,
    pub params: Vec<ParamSpec>,
}

const ALL_KINDS: [TransformKind; 13] = [
    TransformKind::Direct,
    TransformKind::Uppercase,
    TransformKind::Lowercase,
    TransformKind::Trim,
    TransformKind::EqualsY,
    TransformKind::DateFormat,
    TransformKind::DateParse,
    TransformKind::Multiply,
    TransformKind::Divide,
    TransformKind::Round,
    TransformKind::Substring,
    TransformKind::Replace,
    TransformKind::Default,
];

impl TransformKind {
    /// Every kind, in catalog order.
    pub fn all() -> &'static [TransformKind] {
        &ALL_KINDS
    }

    /// Wire name, e.g. `equals_y`.
    pub fn as_str(&self) -> &'static str {
        match self {
            TransformKind::Direct => "direct",
            TransformKind::Uppercase => "uppercase",
            TransformKind::Lowercase => "lowercase",
            TransformKind::Trim => "trim",
            TransformKind::EqualsY => "equals_y",
            TransformKind::DateFormat => "date_format",
            TransformKind::DateParse => "date_parse",
            TransformKind::Multiply => "multiply",
            TransformKind::Divide => "divide",
            TransformKind::Round => "round",
            TransformKind::Substring => "substring",
            TransformKind::Replace => "replace",
            TransformKind::Default => "default",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TransformKind::Direct => "Direct (no transform)",
            TransformKind::Uppercase => "Uppercase",
            TransformKind::Lowercase => "Lowercase",
            TransformKind::Trim => "Trim whitespace",
            TransformKind::EqualsY => "Equals 'Y' (boolean)",
            TransformKind::DateFormat => "Format date",
            TransformKind::DateParse => "Parse date",
            TransformKind::Multiply => "Multiply",
            TransformKind::Divide => "Divide",
            TransformKind::Round => "Round",
            TransformKind::Substring => "Substring",
            TransformKind::Replace => "Replace",
            TransformKind::Default => "Default value",
        }
    }

    pub fn has_params(&self) -> bool {
        !matches!(
            self,
            TransformKind::Direct
                | TransformKind::Uppercase
                | TransformKind::Lowercase
                | TransformKind::Trim
                | TransformKind::EqualsY
        )
    }

    /// Parameter schema, or `None` for transforms without parameters.
    pub fn param_schema(&self) -> Option<ParamSchema> {
        use ParamType::*;

        let params = match self {
            TransformKind::DateFormat | TransformKind::DateParse => {
                vec![ParamSpec::required("format", "Format (yyyy, MM, dd, HH, mm, ss)", String)]
            }
            TransformKind::Multiply => vec![ParamSpec::required("factor", "Factor", Number)],
            TransformKind::Divide => vec![ParamSpec::required("divisor", "Divisor", Number)],
            TransformKind::Round => vec![
                ParamSpec::optional("decimals", "Decimal places", Integer).with_default(Value::from(2)),
            ],
            TransformKind::Substring => vec![
                ParamSpec::optional("start", "Start index", Integer).with_default(Value::from(0)),
                ParamSpec::optional("length", "Length", Integer),
            ],
            TransformKind::Replace => vec![
                ParamSpec::required("search", "Search", String),
                ParamSpec::optional("replace", "Replace with", String)
                    .with_default(Value::String(std::string::String::new())),
            ],
            TransformKind::Default => {
                vec![ParamSpec::required("defaultValue", "Default value", String)]
            }
            _ => return None,
        };

        Some(ParamSchema { kind: *self, params })
    }

    fn invalid(&self, message: impl Into<String>) -> TransformError {
        TransformError::InvalidParams {
            kind: self.as_str().to_string(),
            message: message.into(),
        }
    }
}

impl fmt::Display for TransformKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransformKind {
    type Err = TransformError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        ALL_KINDS
            .iter()
            .copied()
            .find(|k| k.as_str().eq_ignore_ascii_case(name))
            .ok_or_else(|| TransformError::UnknownTransform(name.to_string()))
    }
}

/// Ordered catalog listing.
pub fn transform_kinds() -> Vec<TransformKindInfo> {
    ALL_KINDS
        .iter()
        .map(|k| TransformKindInfo {
            kind: *k,
            label: k.label(),
            has_params: k.has_params(),
        })
        .collect()
}

/// Parameter schema of a transform (`None` when it takes none).
pub fn param_schema(kind: TransformKind) -> Option<ParamSchema> {
    kind.param_schema()
}

/// Check a parameter payload against the transform's schema.
///
/// Numbers may arrive as numeric strings. Unknown keys are ignored.
pub fn validate_params(kind: TransformKind, params: Option<&TransformParams>) -> TransformResult<()> {
    let Some(schema) = kind.param_schema() else {
        return Ok(());
    };

    for spec in &schema.params {
        let value = params.and_then(|p| p.get(spec.name)).filter(|v| !v.is_null());

        let Some(value) = value else {
            if spec.required {
                return Err(kind.invalid(format!("'{}' is required", spec.name)));
            }
            continue;
        };

        match spec.param_type {
            ParamType::Number => {
                number_param(value).ok_or_else(|| kind.invalid(format!("'{}' must be a number", spec.name)))?;
            }
            ParamType::Integer => {
                integer_param(value)
                    .ok_or_else(|| kind.invalid(format!("'{}' must be an integer", spec.name)))?;
            }
            ParamType::String => {
                if value.is_array() || value.is_object() {
                    return Err(kind.invalid(format!("'{}' must be text", spec.name)));
                }
            }
        }
    }

    if kind == TransformKind::Divide {
        let divisor = params.and_then(|p| p.get("divisor")).and_then(number_param);
        if divisor == Some(0.0) {
            return Err(kind.invalid("divisor must not be zero"));
        }
    }

    if kind == TransformKind::Round {
        let decimals = params.and_then(|p| p.get("decimals")).and_then(integer_param);
        if let Some(d) = decimals {
            if !(0..=MAX_DECIMALS).contains(&d) {
                return Err(kind.invalid(format!("decimals must be between 0 and {}", MAX_DECIMALS)));
            }
        }
    }

    Ok(())
}

/// Upper bound for `round.decimals`.
pub const MAX_DECIMALS: i64 = 15;

/// Read a number parameter (JSON number or numeric string).
pub(crate) fn number_param(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
        _ => None,
    }
}

/// Read an integer parameter (JSON integer, integral float, or integer string).
pub(crate) fn integer_param(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

/// Description of all transforms, for CLI output and automap prompts.
pub fn transforms_description() -> String {
    let mut out = String::from(
        "Available transforms:\n\n| Transform | Description | Parameters |\n|-----------|-------------|------------|\n",
    );

    for kind in TransformKind::all() {
        let params = match kind.param_schema() {
            Some(schema) => schema
                .params
                .iter()
                .map(|p| {
                    let mut s = format!("{}: {}", p.name, type_name(p.param_type));
                    if !p.required {
                        s.push('?');
                    }
                    if let Some(ref d) = p.default {
                        s.push_str(&format!(" = {}", d));
                    }
                    s
                })
                .collect::<Vec<_>>()
                .join(", "),
            None => "-".to_string(),
        };
        out.push_str(&format!("| {} | {} | {} |\n", kind.as_str(), kind.label(), params));
    }

    out
}

fn type_name(t: ParamType) -> &'static str {
    match t {
        ParamType::Number => "number",
        ParamType::Integer => "integer",
        ParamType::String => "string",
    }
}
