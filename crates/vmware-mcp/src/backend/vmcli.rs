//! vmcli backend
//!
//! `vmcli [vmx] <Module> <command> [args...] [-u user] [-P password]`.
//! The VM path leads, the module segment names the subsystem, and guest
//! credentials trail the command's own flags.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::cli::{CliBackend, CliCommand, CommandRunner, ProcessRunner};

pub struct VmCli {
    executable: PathBuf,
    runner: Arc<dyn CommandRunner>,
}

impl VmCli {
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

impl CliBackend for VmCli {
    fn name(&self) -> &'static str {
        "vmcli"
    }

    fn executable(&self) -> &Path {
        &self.executable
    }

    fn runner(&self) -> &dyn CommandRunner {
        self.runner.as_ref()
    }

    fn argv(&self, command: &CliCommand) -> Vec<String> {
        let mut argv = vec![self.executable.display().to_string()];

        if let Some(locator) = command.locator.as_deref().filter(|l| !l.is_empty()) {
            argv.push(locator.to_string());
        }
        if let Some(module) = command.module {
            argv.push(module.to_string());
        }
        argv.push(command.command.to_string());
        argv.extend(command.args.iter().cloned());

        let creds = &command.credentials;
        if !creds.user.is_empty() {
            argv.push("-u".to_string());
            argv.push(creds.user.clone());
        }
        if !creds.password.is_empty() {
            argv.push("-P".to_string());
            argv.push(creds.password.clone());
        }
        argv
    }
}
