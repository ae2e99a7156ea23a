//! Dispatch Errors
//!
//! Every failure an invocation can end in, normalized across the REST API
//! (HTTP status codes), the CLI tools (exit codes) and malformed output.

use thiserror::Error;

/// Errors produced while validating, routing or executing a tool call
#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("Unknown tool: {0}")]
    UnknownOperation(String),

    #[error("Missing required argument: {0}")]
    MissingArgument(String),

    #[error("Invalid argument {field}: expected {expected}")]
    InvalidArgument { field: String, expected: String },

    #[error("HTTP {status}: {body}")]
    HttpError { status: u16, body: String },

    #[error("{tool} failed: {message}")]
    CliError { tool: String, message: String },

    #[error("Unknown vm_id {0}: no VM with that id in the REST listing")]
    UnresolvedIdentifier(String),

    #[error("REST request failed: {0}")]
    Transport(String),

    #[error("REST API returned invalid JSON: {0}")]
    InvalidResponse(String),

    #[error("Failed to launch {tool} at {path}: {message}")]
    Spawn {
        tool: String,
        path: String,
        message: String,
    },
}

impl DispatchError {
    /// Stable machine-readable name of the failure kind
    pub fn kind(&self) -> &'static str {
        match self {
            Self::UnknownOperation(_) => "unknown_operation",
            Self::MissingArgument(_) => "missing_argument",
            Self::InvalidArgument { .. } => "invalid_argument",
            Self::HttpError { .. } => "http_error",
            Self::CliError { .. } => "cli_error",
            Self::UnresolvedIdentifier(_) => "unresolved_identifier",
            Self::Transport(_) => "transport_error",
            Self::InvalidResponse(_) => "invalid_response",
            Self::Spawn { .. } => "spawn_error",
        }
    }

    pub fn invalid_argument(field: impl Into<String>, expected: impl Into<String>) -> Self {
        Self::InvalidArgument {
            field: field.into(),
            expected: expected.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_error_keeps_body() {
        let err = DispatchError::HttpError {
            status: 404,
            body: r#"{"error":"not found"}"#.to_string(),
        };
        let text = err.to_string();
        assert!(text.contains("404"));
        assert!(text.contains(r#"{"error":"not found"}"#));
        assert_eq!(err.kind(), "http_error");
    }

    #[test]
    fn test_messages_are_never_empty() {
        let errors = [
            DispatchError::UnknownOperation(String::new()),
            DispatchError::MissingArgument(String::new()),
            DispatchError::invalid_argument("", ""),
            DispatchError::HttpError { status: 500, body: String::new() },
            DispatchError::CliError { tool: "vmrun".into(), message: String::new() },
            DispatchError::UnresolvedIdentifier(String::new()),
            DispatchError::Transport(String::new()),
            DispatchError::InvalidResponse(String::new()),
            DispatchError::Spawn { tool: "vmcli".into(), path: String::new(), message: String::new() },
        ];
        for err in errors {
            assert!(!err.to_string().trim().is_empty(), "{}", err.kind());
        }
    }
}
