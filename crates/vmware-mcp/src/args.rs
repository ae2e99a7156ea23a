//! Argument Decoding
//!
//! Turns the untyped argument map of a `tools/call` into typed values,
//! driven by the operation's declared parameters.

use serde_json::{Map, Value};
use std::collections::HashMap;

use crate::error::DispatchError;
use crate::registry::{Operation, ParamKind};

/// A decoded argument value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgValue {
    Str(String),
    Int(i64),
    Bool(bool),
}

impl ArgValue {
    pub fn to_json(&self) -> Value {
        match self {
            Self::Str(s) => Value::String(s.clone()),
            Self::Int(n) => Value::from(*n),
            Self::Bool(b) => Value::Bool(*b),
        }
    }
}

/// Validated arguments for one invocation
#[derive(Debug, Clone, Default)]
pub struct Args {
    values: HashMap<String, ArgValue>,
    locator: Option<String>,
}

impl Args {
    /// Validate `raw` against the operation schema and decode every field
    ///
    /// Presence of required fields is checked first, in declaration order,
    /// so a missing field is always reported before a badly typed one.
    /// Omitted optional fields take their declared default. Keys the
    /// schema does not declare are ignored.
    pub fn decode(operation: &Operation, raw: &Map<String, Value>) -> Result<Self, DispatchError> {
        for param in operation.params.iter().filter(|p| p.required) {
            if is_absent(raw.get(param.name)) {
                return Err(DispatchError::MissingArgument(param.name.to_string()));
            }
        }

        let mut values = HashMap::new();
        for param in &operation.params {
            match raw.get(param.name) {
                Some(value) if !value.is_null() => {
                    values.insert(param.name.to_string(), coerce(param.name, param.kind, value)?);
                }
                _ => {
                    if let Some(default) = &param.default {
                        values.insert(param.name.to_string(), default.clone());
                    }
                }
            }
        }

        Ok(Self { values, locator: None })
    }

    pub fn get(&self, name: &str) -> Option<&ArgValue> {
        self.values.get(name)
    }

    /// A string argument that must be present
    pub fn str(&self, name: &str) -> Result<&str, DispatchError> {
        match self.values.get(name) {
            Some(ArgValue::Str(s)) => Ok(s),
            Some(_) => Err(DispatchError::invalid_argument(name, "string")),
            None => Err(DispatchError::MissingArgument(name.to_string())),
        }
    }

    /// A string argument, or "" when omitted
    pub fn text(&self, name: &str) -> &str {
        match self.values.get(name) {
            Some(ArgValue::Str(s)) => s,
            _ => "",
        }
    }

    /// An integer argument that must be present
    pub fn int(&self, name: &str) -> Result<i64, DispatchError> {
        match self.values.get(name) {
            Some(ArgValue::Int(n)) => Ok(*n),
            Some(_) => Err(DispatchError::invalid_argument(name, "integer")),
            None => Err(DispatchError::MissingArgument(name.to_string())),
        }
    }

    pub fn opt_int(&self, name: &str) -> Option<i64> {
        match self.values.get(name) {
            Some(ArgValue::Int(n)) => Some(*n),
            _ => None,
        }
    }

    /// A boolean argument, false when omitted
    pub fn flag(&self, name: &str) -> bool {
        matches!(self.values.get(name), Some(ArgValue::Bool(true)))
    }

    /// A boolean argument that must be present
    pub fn bool(&self, name: &str) -> Result<bool, DispatchError> {
        match self.values.get(name) {
            Some(ArgValue::Bool(b)) => Ok(*b),
            Some(_) => Err(DispatchError::invalid_argument(name, "boolean")),
            None => Err(DispatchError::MissingArgument(name.to_string())),
        }
    }

    pub fn vm_id(&self) -> Option<&str> {
        match self.values.get("vm_id") {
            Some(ArgValue::Str(s)) => Some(s),
            _ => None,
        }
    }

    /// The resolved .vmx path, or "" when unresolved
    pub fn locator(&self) -> &str {
        self.locator.as_deref().unwrap_or("")
    }

    pub fn set_locator(&mut self, locator: impl Into<String>) {
        self.locator = Some(locator.into());
    }
}

fn is_absent(value: Option<&Value>) -> bool {
    value.map(Value::is_null).unwrap_or(true)
}

/// Whole and inside the i64 range; `f as i64` would saturate otherwise
fn is_whole_i64(f: f64) -> bool {
    f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64
}

fn coerce(name: &str, kind: ParamKind, value: &Value) -> Result<ArgValue, DispatchError> {
    let invalid = || DispatchError::invalid_argument(name, kind.expected());

    match kind {
        ParamKind::String => match value {
            Value::String(s) => Ok(ArgValue::Str(s.clone())),
            Value::Number(n) => Ok(ArgValue::Str(n.to_string())),
            Value::Bool(b) => Ok(ArgValue::Str(b.to_string())),
            _ => Err(invalid()),
        },
        ParamKind::Integer => match value {
            Value::Number(n) => n
                .as_i64()
                .or_else(|| n.as_f64().filter(|f| is_whole_i64(*f)).map(|f| f as i64))
                .map(ArgValue::Int)
                .ok_or_else(invalid),
            Value::String(s) => s.trim().parse().map(ArgValue::Int).map_err(|_| invalid()),
            _ => Err(invalid()),
        },
        ParamKind::Boolean => match value {
            Value::Bool(b) => Ok(ArgValue::Bool(*b)),
            Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" => Ok(ArgValue::Bool(true)),
                "false" => Ok(ArgValue::Bool(false)),
                _ => Err(invalid()),
            },
            _ => Err(invalid()),
        },
        ParamKind::Enum(choices) => match value {
            Value::String(s) if choices.contains(&s.as_str()) => Ok(ArgValue::Str(s.clone())),
            _ => Err(invalid()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::cli::CliCommand;
    use serde_json::json;

    fn operation() -> Operation {
        Operation::vmrun("demo", "Demo operation", |_| Ok(CliCommand::new("list")))
            .vm_id()
            .required_str("path")
            .required_int("pid")
            .optional_bool("gui", true)
            .optional_choice("clone_type", &["full", "linked"], "linked")
            .optional_str("user")
    }

    fn raw(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn test_first_missing_field_in_declaration_order() {
        let err = Args::decode(&operation(), &raw(json!({"pid": 1}))).unwrap_err();
        assert!(matches!(err, DispatchError::MissingArgument(ref f) if f == "vm_id"));

        let err = Args::decode(&operation(), &raw(json!({"vm_id": "a"}))).unwrap_err();
        assert!(matches!(err, DispatchError::MissingArgument(ref f) if f == "path"));
    }

    #[test]
    fn test_null_counts_as_missing() {
        let err = Args::decode(
            &operation(),
            &raw(json!({"vm_id": "a", "path": null, "pid": 1})),
        )
        .unwrap_err();
        assert!(matches!(err, DispatchError::MissingArgument(ref f) if f == "path"));
    }

    #[test]
    fn test_missing_reported_before_bad_type() {
        let err = Args::decode(&operation(), &raw(json!({"vm_id": "a", "pid": "x"}))).unwrap_err();
        assert_eq!(err.kind(), "missing_argument");
    }

    #[test]
    fn test_defaults_fill_omitted_optionals() {
        let args = Args::decode(
            &operation(),
            &raw(json!({"vm_id": "a", "path": "/tmp", "pid": 7})),
        )
        .unwrap();
        assert!(args.flag("gui"));
        assert_eq!(args.text("clone_type"), "linked");
        assert_eq!(args.text("user"), "");
        assert_eq!(args.get("user"), None);
    }

    #[test]
    fn test_lenient_scalars() {
        let args = Args::decode(
            &operation(),
            &raw(json!({"vm_id": 42, "path": "/tmp", "pid": "7", "gui": "false"})),
        )
        .unwrap();
        assert_eq!(args.str("vm_id").unwrap(), "42");
        assert_eq!(args.int("pid").unwrap(), 7);
        assert!(!args.flag("gui"));
    }

    #[test]
    fn test_whole_float_is_an_integer() {
        let args = Args::decode(
            &operation(),
            &raw(json!({"vm_id": "a", "path": "/tmp", "pid": 9.0})),
        )
        .unwrap();
        assert_eq!(args.int("pid").unwrap(), 9);
    }

    #[test]
    fn test_out_of_range_number_is_rejected() {
        for pid in [json!(1e300), json!(u64::MAX), json!(-1e19)] {
            let err = Args::decode(
                &operation(),
                &raw(json!({"vm_id": "a", "path": "/tmp", "pid": pid})),
            )
            .unwrap_err();
            assert!(matches!(err, DispatchError::InvalidArgument { ref field, .. } if field == "pid"));
        }
    }

    #[test]
    fn test_bad_types_are_rejected() {
        let err = Args::decode(
            &operation(),
            &raw(json!({"vm_id": "a", "path": "/tmp", "pid": "seven"})),
        )
        .unwrap_err();
        assert!(matches!(err, DispatchError::InvalidArgument { ref field, .. } if field == "pid"));

        let err = Args::decode(
            &operation(),
            &raw(json!({"vm_id": "a", "path": ["/tmp"], "pid": 1})),
        )
        .unwrap_err();
        assert_eq!(err.kind(), "invalid_argument");
    }

    #[test]
    fn test_enum_membership() {
        let err = Args::decode(
            &operation(),
            &raw(json!({"vm_id": "a", "path": "/", "pid": 1, "clone_type": "shallow"})),
        )
        .unwrap_err();
        assert!(err.to_string().contains("full, linked"));
    }

    #[test]
    fn test_locator_defaults_to_empty() {
        let mut args = Args::default();
        assert_eq!(args.locator(), "");
        args.set_locator("/vms/a.vmx");
        assert_eq!(args.locator(), "/vms/a.vmx");
    }
}
