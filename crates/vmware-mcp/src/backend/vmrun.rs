//! vmrun backend
//!
//! `vmrun -T ws [-gu user] [-gp password] <command> [vmx] [args...]`.
//! Guest credentials are global flags ahead of the command and the VM
//! path is always the first positional argument.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::cli::{CliBackend, CliCommand, CommandRunner, ProcessRunner};

/// Host type passed to `-T`
const HOST_TYPE: &str = "ws";

pub struct VmRun {
    executable: PathBuf,
    runner: Arc<dyn CommandRunner>,
}

impl VmRun {
    pub fn new(executable: impl Into<PathBuf>) -> Self {
        Self::with_runner(executable, Arc::new(ProcessRunner))
    }

    pub fn with_runner(executable: impl Into<PathBuf>, runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            executable: executable.into(),
            runner,
        }
    }
}

impl CliBackend for VmRun {
    fn name(&self) -> &'static str {
        "vmrun"
    }

    fn executable(&self) -> &Path {
        &self.executable
    }

    fn runner(&self) -> &dyn CommandRunner {
        self.runner.as_ref()
    }

    fn argv(&self, command: &CliCommand) -> Vec<String> {
        let mut argv = vec![
            self.executable.display().to_string(),
            "-T".to_string(),
            HOST_TYPE.to_string(),
        ];

        let creds = &command.credentials;
        if !creds.user.is_empty() {
            argv.push("-gu".to_string());
            argv.push(creds.user.clone());
        }
        if !creds.password.is_empty() {
            argv.push("-gp".to_string());
            argv.push(creds.password.clone());
        }

        argv.push(command.command.to_string());
        // An unresolved locator is still passed so vmrun reports the bad path
        if let Some(locator) = &command.locator {
            argv.push(locator.clone());
        }
        argv.extend(command.args.iter().cloned());
        argv
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::cli::testing::SpyRunner;
    use crate::error::DispatchError;

    fn vmrun() -> VmRun {
        VmRun::new("vmrun")
    }

    #[test]
    fn test_guest_run_argv() {
        let cmd = CliCommand::new("runProgramInGuest")
            .on("/vms/dev.vmx")
            .arg("echo")
            .arg("hello")
            .as_guest("alice", "");
        assert_eq!(
            vmrun().argv(&cmd),
            vec!["vmrun", "-T", "ws", "-gu", "alice", "runProgramInGuest", "/vms/dev.vmx", "echo", "hello"]
        );
    }

    #[test]
    fn test_credentials_precede_command() {
        let cmd = CliCommand::new("listProcessesInGuest")
            .on("/vms/dev.vmx")
            .as_guest("root", "secret");
        assert_eq!(
            vmrun().argv(&cmd),
            vec!["vmrun", "-T", "ws", "-gu", "root", "-gp", "secret", "listProcessesInGuest", "/vms/dev.vmx"]
        );
    }

    #[test]
    fn test_host_command_has_no_locator() {
        assert_eq!(vmrun().argv(&CliCommand::new("list")), vec!["vmrun", "-T", "ws", "list"]);
    }

    #[test]
    fn test_unresolved_locator_is_kept() {
        let cmd = CliCommand::new("start").on("").arg("gui");
        assert_eq!(vmrun().argv(&cmd), vec!["vmrun", "-T", "ws", "start", "", "gui"]);
    }

    #[tokio::test]
    async fn test_run_through_runner() {
        let spy = Arc::new(SpyRunner::ok("Total running VMs: 0\n"));
        let backend = VmRun::with_runner("/opt/vmrun", spy.clone());

        let out = backend.run(&CliCommand::new("list")).await.unwrap();
        assert_eq!(out, "Total running VMs: 0");
        assert_eq!(spy.last().unwrap(), vec!["/opt/vmrun", "-T", "ws", "list"]);
    }

    #[tokio::test]
    async fn test_missing_binary_is_spawn_error() {
        let backend = VmRun::with_runner("/opt/vmrun", Arc::new(SpyRunner::missing_binary()));
        let err = backend.run(&CliCommand::new("list")).await.unwrap_err();
        assert!(matches!(err, DispatchError::Spawn { ref path, .. } if path == "/opt/vmrun"));
    }
}
