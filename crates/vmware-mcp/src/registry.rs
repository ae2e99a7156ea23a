//! Tool Registry
//!
//! The static catalog of operations. Each entry carries its argument
//! schema and the handler that turns decoded arguments into a backend
//! request, so validation and routing read from the same table.

use serde_json::{json, Map, Value};
use std::collections::HashMap;
use tracing::warn;

use crate::args::{ArgValue, Args};
use crate::backend::cli::CliCommand;
use crate::backend::rest::RestRequest;
use crate::error::DispatchError;
use crate::protocol::{InputSchema, Tool};

/// Primitive type of a parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    String,
    Integer,
    Boolean,
    Enum(&'static [&'static str]),
}

impl ParamKind {
    /// Human-readable description used in validation errors
    pub fn expected(&self) -> String {
        match self {
            Self::String => "string".to_string(),
            Self::Integer => "integer".to_string(),
            Self::Boolean => "boolean".to_string(),
            Self::Enum(choices) => format!("one of {}", choices.join(", ")),
        }
    }

    fn json_schema(&self) -> Map<String, Value> {
        let mut schema = Map::new();
        match self {
            Self::String => {
                schema.insert("type".into(), json!("string"));
            }
            Self::Integer => {
                schema.insert("type".into(), json!("integer"));
            }
            Self::Boolean => {
                schema.insert("type".into(), json!("boolean"));
            }
            Self::Enum(choices) => {
                schema.insert("type".into(), json!("string"));
                schema.insert("enum".into(), json!(choices));
            }
        }
        schema
    }
}

/// One declared parameter of an operation
#[derive(Debug, Clone)]
pub struct Param {
    pub name: &'static str,
    pub kind: ParamKind,
    pub required: bool,
    pub default: Option<ArgValue>,
}

/// Which backend executes an operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Backend {
    Rest,
    VmRun,
    VmCli,
}

impl Backend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Rest => "rest",
            Self::VmRun => "vmrun",
            Self::VmCli => "vmcli",
        }
    }

    /// The CLI tools address VMs by .vmx path; REST uses the id directly
    pub fn needs_locator(&self) -> bool {
        matches!(self, Self::VmRun | Self::VmCli)
    }
}

pub type RestHandler = fn(&Args) -> Result<RestRequest, DispatchError>;
pub type CliHandler = fn(&Args) -> Result<CliCommand, DispatchError>;

/// Builds the backend request for an operation from its decoded arguments
#[derive(Clone, Copy)]
pub enum Handler {
    Rest(RestHandler),
    VmRun(CliHandler),
    VmCli(CliHandler),
}

impl Handler {
    pub fn backend(&self) -> Backend {
        match self {
            Self::Rest(_) => Backend::Rest,
            Self::VmRun(_) => Backend::VmRun,
            Self::VmCli(_) => Backend::VmCli,
        }
    }
}

/// A named, schema-described unit of invokable functionality
#[derive(Clone)]
pub struct Operation {
    pub name: &'static str,
    pub description: &'static str,
    pub params: Vec<Param>,
    pub handler: Handler,
    /// Successful results are a VM listing used to refresh the locator cache
    pub refreshes_locators: bool,
}

impl std::fmt::Debug for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Operation")
            .field("name", &self.name)
            .field("backend", &self.backend())
            .field("params", &self.params)
            .finish()
    }
}

impl Operation {
    fn new(name: &'static str, description: &'static str, handler: Handler) -> Self {
        Self {
            name,
            description,
            params: Vec::new(),
            handler,
            refreshes_locators: false,
        }
    }

    pub fn rest(name: &'static str, description: &'static str, handler: RestHandler) -> Self {
        Self::new(name, description, Handler::Rest(handler))
    }

    pub fn vmrun(name: &'static str, description: &'static str, handler: CliHandler) -> Self {
        Self::new(name, description, Handler::VmRun(handler))
    }

    pub fn vmcli(name: &'static str, description: &'static str, handler: CliHandler) -> Self {
        Self::new(name, description, Handler::VmCli(handler))
    }

    pub fn backend(&self) -> Backend {
        self.handler.backend()
    }

    /// True when the vm_id must be resolved to a .vmx path before routing
    pub fn needs_locator(&self) -> bool {
        self.backend().needs_locator() && self.param("vm_id").is_some()
    }

    pub fn param(&self, name: &str) -> Option<&Param> {
        self.params.iter().find(|p| p.name == name)
    }

    pub fn required_fields(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.params.iter().filter(|p| p.required).map(|p| p.name)
    }

    /// Advertised MCP tool definition
    pub fn to_tool(&self) -> Tool {
        let properties = self
            .params
            .iter()
            .map(|p| {
                let mut schema = p.kind.json_schema();
                if let Some(default) = &p.default {
                    schema.insert("default".into(), default.to_json());
                }
                (p.name.to_string(), Value::Object(schema))
            })
            .collect();

        Tool {
            name: self.name.to_string(),
            description: self.description.to_string(),
            input_schema: InputSchema {
                schema_type: "object".to_string(),
                properties,
                required: self.required_fields().map(str::to_string).collect(),
            },
        }
    }

    fn push(mut self, name: &'static str, kind: ParamKind, required: bool, default: Option<ArgValue>) -> Self {
        self.params.push(Param {
            name,
            kind,
            required,
            default,
        });
        self
    }

    // Schema builders

    pub fn vm_id(self) -> Self {
        self.required_str("vm_id")
    }

    pub fn required_str(self, name: &'static str) -> Self {
        self.push(name, ParamKind::String, true, None)
    }

    pub fn optional_str(self, name: &'static str) -> Self {
        self.push(name, ParamKind::String, false, None)
    }

    pub fn optional_str_or(self, name: &'static str, default: &'static str) -> Self {
        self.push(name, ParamKind::String, false, Some(ArgValue::Str(default.to_string())))
    }

    pub fn required_int(self, name: &'static str) -> Self {
        self.push(name, ParamKind::Integer, true, None)
    }

    pub fn optional_int(self, name: &'static str) -> Self {
        self.push(name, ParamKind::Integer, false, None)
    }

    pub fn optional_int_or(self, name: &'static str, default: i64) -> Self {
        self.push(name, ParamKind::Integer, false, Some(ArgValue::Int(default)))
    }

    pub fn required_bool(self, name: &'static str) -> Self {
        self.push(name, ParamKind::Boolean, true, None)
    }

    pub fn optional_bool(self, name: &'static str, default: bool) -> Self {
        self.push(name, ParamKind::Boolean, false, Some(ArgValue::Bool(default)))
    }

    pub fn required_choice(self, name: &'static str, choices: &'static [&'static str]) -> Self {
        self.push(name, ParamKind::Enum(choices), true, None)
    }

    pub fn optional_choice(
        self,
        name: &'static str,
        choices: &'static [&'static str],
        default: &'static str,
    ) -> Self {
        self.push(name, ParamKind::Enum(choices), false, Some(ArgValue::Str(default.to_string())))
    }

    /// Optional guest `user` and `password`
    pub fn guest_login(self) -> Self {
        self.optional_str("user").optional_str("password")
    }

    pub fn refreshes_locators(mut self) -> Self {
        self.refreshes_locators = true;
        self
    }
}

/// Read-only catalog of operations, in advertisement order
#[derive(Debug, Clone)]
pub struct Registry {
    operations: Vec<Operation>,
    index: HashMap<&'static str, usize>,
}

impl Registry {
    /// Build a registry; a repeated name keeps its first definition
    pub fn new(operations: impl IntoIterator<Item = Operation>) -> Self {
        let mut kept = Vec::new();
        let mut index = HashMap::new();

        for operation in operations {
            if index.contains_key(operation.name) {
                warn!("Duplicate tool definition ignored: {}", operation.name);
                continue;
            }
            index.insert(operation.name, kept.len());
            kept.push(operation);
        }

        Self {
            operations: kept,
            index,
        }
    }

    /// Registry holding every REST, vmrun and vmcli operation
    pub fn with_catalog() -> Self {
        Self::new(crate::tools::catalog())
    }

    pub fn list_operations(&self) -> &[Operation] {
        &self.operations
    }

    pub fn get_schema(&self, name: &str) -> Result<&Operation, DispatchError> {
        self.index
            .get(name)
            .map(|&i| &self.operations[i])
            .ok_or_else(|| DispatchError::UnknownOperation(name.to_string()))
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// MCP tool definitions for `tools/list`
    pub fn tools(&self) -> Vec<Tool> {
        self.operations.iter().map(Operation::to_tool).collect()
    }
}
