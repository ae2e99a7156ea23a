//! Backend adapters
//!
//! One REST adapter and two command-line adapters. Each turns an already
//! validated request into an HTTP call or a subprocess and reports a
//! [`Payload`] or a [`DispatchError`].

pub mod cli;
pub mod rest;
pub mod vmcli;
pub mod vmrun;

use serde_json::Value;
use vmware_core::Config;

use crate::error::DispatchError;
pub use cli::{CliBackend, CliCommand};
pub use rest::{RestBackend, RestRequest};
pub use vmcli::VmCli;
pub use vmrun::VmRun;

/// Successful outcome of a backend call
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// Parsed REST body
    Json(Value),
    /// Trimmed stdout of a command-line tool
    Text(String),
    /// 2xx with no body
    Empty,
}

impl Payload {
    /// Text shown to the caller
    pub fn render(&self) -> String {
        match self {
            Self::Json(Value::Null) | Self::Empty => "OK".to_string(),
            Self::Json(value) => serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string()),
            Self::Text(text) if text.is_empty() => "OK".to_string(),
            Self::Text(text) => text.clone(),
        }
    }

    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Self::Json(value) => Some(value),
            _ => None,
        }
    }
}

/// Normalized outcome of one invocation
pub type BackendResult = Result<Payload, DispatchError>;

/// The three adapters, built once from configuration
pub struct Backends {
    pub rest: RestBackend,
    pub vmrun: VmRun,
    pub vmcli: VmCli,
}

impl Backends {
    pub fn from_config(config: &Config) -> Result<Self, DispatchError> {
        Ok(Self {
            rest: RestBackend::from_config(&config.rest)?,
            vmrun: VmRun::new(&config.vmrun_path),
            vmcli: VmCli::new(&config.vmcli_path),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_render() {
        assert_eq!(Payload::Empty.render(), "OK");
        assert_eq!(Payload::Text(String::new()).render(), "OK");
        assert_eq!(Payload::Text("Total running VMs: 0".into()).render(), "Total running VMs: 0");
        assert_eq!(
            Payload::Json(json!({"status": "deleted"})).render(),
            "{\n  \"status\": \"deleted\"\n}"
        );
    }

    #[test]
    fn test_backends_from_default_config() {
        let backends = Backends::from_config(&Config::default()).unwrap();
        assert_eq!(backends.vmrun.name(), "vmrun");
        assert_eq!(backends.vmcli.name(), "vmcli");
    }
}
