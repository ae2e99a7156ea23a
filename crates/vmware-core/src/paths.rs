//! Standard paths used by vmware-mcp

use std::path::PathBuf;

/// Standard vmware-mcp paths
pub struct Paths {
    /// Config directory (~/.config/vmware-mcp)
    pub config: PathBuf,
    /// Directory holding the vmrun and vmcli executables
    pub install: PathBuf,
}

impl Default for Paths {
    fn default() -> Self {
        Self::new()
    }
}

impl Paths {
    pub fn new() -> Self {
        let config = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("vmware-mcp");

        Self {
            config,
            install: default_install_dir(),
        }
    }

    /// Get the JSON config file path
    pub fn config_file(&self) -> PathBuf {
        self.config.join("config.json")
    }

    /// Get the full path of a VMware command-line tool
    pub fn executable(&self, tool: &str) -> PathBuf {
        self.install.join(executable_name(tool))
    }
}

#[cfg(windows)]
fn default_install_dir() -> PathBuf {
    PathBuf::from(r"C:\Program Files (x86)\VMware\VMware Workstation")
}

#[cfg(target_os = "macos")]
fn default_install_dir() -> PathBuf {
    PathBuf::from("/Applications/VMware Fusion.app/Contents/Public")
}

#[cfg(all(unix, not(target_os = "macos")))]
fn default_install_dir() -> PathBuf {
    PathBuf::from("/usr/bin")
}

fn executable_name(tool: &str) -> String {
    if cfg!(windows) {
        format!("{}.exe", tool)
    } else {
        tool.to_string()
    }
}
