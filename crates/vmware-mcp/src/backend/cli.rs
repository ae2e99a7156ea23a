//! Shared shape of the two command-line backends
//!
//! Both tools take a command, an optional VM locator and positional or
//! flag arguments, but order them differently. A [`CliCommand`] holds the
//! pieces; each [`CliBackend`] lays them out in its own argument vector.

use async_trait::async_trait;
use std::io;
use std::path::Path;
use tracing::{debug, warn};
use vmware_core::process::{self, CapturedOutput};

use crate::error::DispatchError;

/// Flags whose following value is a password
const SECRET_FLAGS: &[&str] = &["-gp", "-P"];

/// Guest login passed alongside a command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GuestCredentials {
    pub user: String,
    pub password: String,
}

/// One subprocess invocation before it is laid out for a specific tool
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliCommand {
    /// Module segment; vmcli only
    pub module: Option<&'static str>,
    pub command: &'static str,
    /// VM address; `Some("")` when the vm_id could not be resolved
    pub locator: Option<String>,
    pub args: Vec<String>,
    pub credentials: GuestCredentials,
}

impl CliCommand {
    pub fn new(command: &'static str) -> Self {
        Self {
            module: None,
            command,
            locator: None,
            args: Vec::new(),
            credentials: GuestCredentials::default(),
        }
    }

    pub fn module(module: &'static str, command: &'static str) -> Self {
        Self {
            module: Some(module),
            ..Self::new(command)
        }
    }

    pub fn on(mut self, locator: impl Into<String>) -> Self {
        self.locator = Some(locator.into());
        self
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn arg_if(self, cond: bool, arg: impl Into<String>) -> Self {
        if cond {
            self.arg(arg)
        } else {
            self
        }
    }

    /// Append `flag value`
    pub fn flag_value(self, flag: &str, value: impl Into<String>) -> Self {
        self.arg(flag).arg(value)
    }

    /// Append `flag value` only when the value is non-empty
    pub fn flag_value_if_set(self, flag: &str, value: &str) -> Self {
        if value.is_empty() {
            self
        } else {
            self.flag_value(flag, value)
        }
    }

    pub fn as_guest(mut self, user: &str, password: &str) -> Self {
        self.credentials = GuestCredentials {
            user: user.to_string(),
            password: password.to_string(),
        };
        self
    }
}

/// Spawns a process and captures its output
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, argv: &[String]) -> io::Result<CapturedOutput>;
}

/// Runs real subprocesses
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(&self, argv: &[String]) -> io::Result<CapturedOutput> {
        process::run_captured(argv).await
    }
}

/// A command-line tool with its own argument ordering rules
#[async_trait]
pub trait CliBackend: Send + Sync {
    fn name(&self) -> &'static str;

    fn executable(&self) -> &Path;

    fn runner(&self) -> &dyn CommandRunner;

    /// Full argument vector, executable first
    fn argv(&self, command: &CliCommand) -> Vec<String>;

    /// Run the command and normalize its outcome
    async fn run(&self, command: &CliCommand) -> Result<String, DispatchError> {
        let argv = self.argv(command);
        debug!("{}: {}", self.name(), redact(&argv).join(" "));

        let output = self.runner().run(&argv).await.map_err(|e| {
            warn!("Failed to launch {}: {}", self.name(), e);
            DispatchError::Spawn {
                tool: self.name().to_string(),
                path: self.executable().display().to_string(),
                message: e.to_string(),
            }
        })?;

        normalize_output(self.name(), output)
    }
}

/// Exit code zero yields trimmed stdout; anything else is a `CliError`
///
/// Some tools report failures on stdout, so an empty stderr falls back to
/// stdout before settling on the bare exit status.
pub fn normalize_output(tool: &str, output: CapturedOutput) -> Result<String, DispatchError> {
    if output.success() {
        return Ok(output.stdout_text());
    }

    let mut message = output.stderr_text();
    if message.is_empty() {
        message = output.stdout_text();
    }
    if message.is_empty() {
        message = match output.status {
            Some(code) => format!("exited with status {}", code),
            None => "terminated by signal".to_string(),
        };
    }

    warn!("{} failed: {}", tool, message);
    Err(DispatchError::CliError {
        tool: tool.to_string(),
        message,
    })
}

/// Copy of `argv` with password values masked, for logging
pub fn redact(argv: &[String]) -> Vec<String> {
    let mut out = Vec::with_capacity(argv.len());
    let mut mask_next = false;
    for arg in argv {
        if mask_next {
            out.push("***".to_string());
            mask_next = false;
        } else {
            mask_next = SECRET_FLAGS.contains(&arg.as_str());
            out.push(arg.clone());
        }
    }
    out
}


#[cfg(test)]
mod tests {
    use super::*;

    fn failed(status: i32, stdout: &str, stderr: &str) -> CapturedOutput {
        CapturedOutput {
            status: Some(status),
            stdout: stdout.as_bytes().to_vec(),
            stderr: stderr.as_bytes().to_vec(),
        }
    }

    #[test]
    fn test_success_returns_trimmed_stdout() {
        let out = normalize_output("vmrun", failed(0, "Total running VMs: 0\n", "")).unwrap();
        assert_eq!(out, "Total running VMs: 0");
    }

    #[test]
    fn test_error_prefers_stderr() {
        let err = normalize_output("vmcli", failed(1, "ignored", " bad vmx \n")).unwrap_err();
        match err {
            DispatchError::CliError { tool, message } => {
                assert_eq!(tool, "vmcli");
                assert_eq!(message, "bad vmx");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_error_falls_back_to_stdout() {
        let err = normalize_output("vmrun", failed(255, "Error: The file was not found\n", "")).unwrap_err();
        assert!(matches!(
            err,
            DispatchError::CliError { ref message, .. } if message == "Error: The file was not found"
        ));
    }

    #[test]
    fn test_silent_failure_reports_status() {
        let err = normalize_output("vmrun", failed(3, "", "")).unwrap_err();
        assert!(err.to_string().contains("exited with status 3"));

        let killed = CapturedOutput { status: None, ..Default::default() };
        let err = normalize_output("vmrun", killed).unwrap_err();
        assert!(err.to_string().contains("signal"));
    }

    #[test]
    fn test_invalid_utf8_does_not_fail() {
        let output = CapturedOutput {
            status: Some(1),
            stdout: Vec::new(),
            stderr: vec![b'e', b'r', b'r', 0xff],
        };
        let err = normalize_output("vmcli", output).unwrap_err();
        assert!(err.to_string().contains('\u{FFFD}'));
    }

    #[test]
    fn test_redact_masks_passwords() {
        let argv: Vec<String> = ["vmrun", "-T", "ws", "-gu", "alice", "-gp", "hunter2", "list"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let shown = redact(&argv).join(" ");
        assert!(!shown.contains("hunter2"));
        assert!(shown.contains("-gp ***"));
        assert!(shown.contains("alice"));
    }

    #[test]
    fn test_command_builder() {
        let cmd = CliCommand::module("Guest", "ls")
            .on("/vms/a.vmx")
            .flag_value("-d", "/tmp")
            .arg_if(false, "--never")
            .flag_value_if_set("-a", "")
            .as_guest("alice", "");
        assert_eq!(cmd.module, Some("Guest"));
        assert_eq!(cmd.args, vec!["-d", "/tmp"]);
        assert_eq!(cmd.credentials.user, "alice");
    }
}
