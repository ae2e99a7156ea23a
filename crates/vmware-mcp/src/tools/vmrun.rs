//! vmrun tools
//!
//! Each handler names the vmrun command and lays out its positional
//! arguments after the .vmx path. Guest credentials ride on the command
//! and become the global `-gu`/`-gp` flags.

use crate::args::Args;
use crate::backend::cli::CliCommand;
use crate::error::DispatchError;
use crate::registry::{CliHandler, Operation};

const CLONE_TYPES: &[&str] = &["full", "linked"];
const VARIABLE_TYPES: &[&str] = &["runtimeConfig", "guestEnv", "guestVar"];

/// `command` addressed at the caller's VM
fn on_vm(command: &'static str, a: &Args) -> CliCommand {
    CliCommand::new(command).on(a.locator())
}

/// `command` run inside the guest with the caller's login
fn in_guest(command: &'static str, a: &Args) -> CliCommand {
    on_vm(command, a).as_guest(a.text("user"), a.text("password"))
}

fn hard_or_soft(a: &Args) -> &'static str {
    if a.flag("hard") {
        "hard"
    } else {
        "soft"
    }
}

/// A guest operation taking one guest path
fn guest_path_op(name: &'static str, description: &'static str, handler: CliHandler) -> Operation {
    Operation::vmrun(name, description, handler)
        .vm_id()
        .required_str("path")
        .guest_login()
}

pub fn operations() -> Vec<Operation> {
    vec![
        // General
        Operation::vmrun("vmrun_list", "List all running VMs", |_| Ok(CliCommand::new("list"))),
        Operation::vmrun("vmrun_clone", "Clone VM (full/linked)", clone)
            .vm_id()
            .required_str("dest_path")
            .optional_choice("clone_type", CLONE_TYPES, "linked")
            .optional_str("snapshot")
            .optional_str("clone_name"),
        Operation::vmrun("vmrun_upgrade", "Upgrade VM format", |a| Ok(on_vm("upgradevm", a))).vm_id(),
        Operation::vmrun("vmrun_delete", "Delete VM (vmrun)", |a| Ok(on_vm("deleteVM", a))).vm_id(),
        // Power
        Operation::vmrun("vmrun_start", "Start VM", |a| {
            Ok(on_vm("start", a).arg(if a.flag("gui") { "gui" } else { "nogui" }))
        })
        .vm_id()
        .optional_bool("gui", true),
        Operation::vmrun("vmrun_stop", "Stop VM", |a| Ok(on_vm("stop", a).arg(hard_or_soft(a))))
            .vm_id()
            .optional_bool("hard", false),
        Operation::vmrun("vmrun_reset", "Reset VM", |a| Ok(on_vm("reset", a).arg(hard_or_soft(a))))
            .vm_id()
            .optional_bool("hard", false),
        Operation::vmrun("vmrun_suspend", "Suspend VM", |a| Ok(on_vm("suspend", a).arg(hard_or_soft(a))))
            .vm_id()
            .optional_bool("hard", false),
        Operation::vmrun("vmrun_pause", "Pause VM", |a| Ok(on_vm("pause", a))).vm_id(),
        Operation::vmrun("vmrun_unpause", "Unpause VM", |a| Ok(on_vm("unpause", a))).vm_id(),
        // Snapshots
        Operation::vmrun("vmrun_snapshot_list", "List snapshots (tree)", |a| {
            Ok(on_vm("listSnapshots", a).arg_if(a.flag("show_tree"), "showTree"))
        })
        .vm_id()
        .optional_bool("show_tree", false),
        Operation::vmrun("vmrun_snapshot_take", "Take snapshot", |a| {
            Ok(on_vm("snapshot", a).arg(a.str("name")?))
        })
        .vm_id()
        .required_str("name"),
        Operation::vmrun("vmrun_snapshot_delete", "Delete snapshot", |a| {
            Ok(on_vm("deleteSnapshot", a)
                .arg(a.str("name")?)
                .arg_if(a.flag("delete_children"), "andDeleteChildren"))
        })
        .vm_id()
        .required_str("name")
        .optional_bool("delete_children", false),
        Operation::vmrun("vmrun_snapshot_revert", "Revert to snapshot", |a| {
            Ok(on_vm("revertToSnapshot", a).arg(a.str("name")?))
        })
        .vm_id()
        .required_str("name"),
        // Guest files
        guest_path_op("vmrun_file_exists", "Check if file exists in guest", |a| {
            Ok(in_guest("fileExistsInGuest", a).arg(a.str("path")?))
        }),
        guest_path_op("vmrun_dir_exists", "Check if directory exists in guest", |a| {
            Ok(in_guest("directoryExistsInGuest", a).arg(a.str("path")?))
        }),
        guest_path_op("vmrun_ls", "List directory in guest", |a| {
            Ok(in_guest("listDirectoryInGuest", a).arg(a.str("path")?))
        }),
        guest_path_op("vmrun_mkdir", "Create directory in guest", |a| {
            Ok(in_guest("createDirectoryInGuest", a).arg(a.str("path")?))
        }),
        guest_path_op("vmrun_rmdir", "Delete directory in guest", |a| {
            Ok(in_guest("deleteDirectoryInGuest", a).arg(a.str("path")?))
        }),
        guest_path_op("vmrun_rm", "Delete file in guest", |a| {
            Ok(in_guest("deleteFileInGuest", a).arg(a.str("path")?))
        }),
        Operation::vmrun("vmrun_rename", "Rename file in guest", |a| {
            Ok(in_guest("renameFileInGuest", a).arg(a.str("old_path")?).arg(a.str("new_path")?))
        })
        .vm_id()
        .required_str("old_path")
        .required_str("new_path")
        .guest_login(),
        Operation::vmrun("vmrun_copy_to", "Copy file from host to guest", |a| {
            Ok(in_guest("CopyFileFromHostToGuest", a).arg(a.str("host_path")?).arg(a.str("guest_path")?))
        })
        .vm_id()
        .required_str("host_path")
        .required_str("guest_path")
        .guest_login(),
        Operation::vmrun("vmrun_copy_from", "Copy file from guest to host", |a| {
            Ok(in_guest("CopyFileFromGuestToHost", a).arg(a.str("guest_path")?).arg(a.str("host_path")?))
        })
        .vm_id()
        .required_str("guest_path")
        .required_str("host_path")
        .guest_login(),
        Operation::vmrun("vmrun_temp_file", "Create temp file in guest", |a| {
            Ok(in_guest("CreateTempfileInGuest", a))
        })
        .vm_id()
        .guest_login(),
        // Guest processes
        Operation::vmrun("vmrun_run", "Run program in guest", run_program)
            .vm_id()
            .required_str("program")
            .optional_str("args")
            .optional_bool("no_wait", false)
            .optional_bool("active_window", false)
            .optional_bool("interactive", false)
            .guest_login(),
        Operation::vmrun("vmrun_script", "Run script in guest", run_script)
            .vm_id()
            .required_str("interpreter")
            .required_str("script")
            .optional_bool("no_wait", false)
            .optional_bool("active_window", false)
            .optional_bool("interactive", false)
            .guest_login(),
        Operation::vmrun("vmrun_ps", "List processes in guest", |a| Ok(in_guest("listProcessesInGuest", a)))
            .vm_id()
            .guest_login(),
        Operation::vmrun("vmrun_kill", "Kill process in guest", |a| {
            Ok(in_guest("killProcessInGuest", a).arg(a.int("pid")?.to_string()))
        })
        .vm_id()
        .required_int("pid")
        .guest_login(),
        // Shared folders
        Operation::vmrun("vmrun_shared_enable", "Enable shared folders", |a| Ok(on_vm("enableSharedFolders", a))).vm_id(),
        Operation::vmrun("vmrun_shared_disable", "Disable shared folders", |a| Ok(on_vm("disableSharedFolders", a))).vm_id(),
        Operation::vmrun("vmrun_shared_add", "Add shared folder", |a| {
            Ok(on_vm("addSharedFolder", a).arg(a.str("name")?).arg(a.str("host_path")?))
        })
        .vm_id()
        .required_str("name")
        .required_str("host_path"),
        Operation::vmrun("vmrun_shared_remove", "Remove shared folder", |a| {
            Ok(on_vm("removeSharedFolder", a).arg(a.str("name")?))
        })
        .vm_id()
        .required_str("name"),
        Operation::vmrun("vmrun_shared_set", "Set shared folder state", |a| {
            Ok(on_vm("setSharedFolderState", a)
                .arg(a.str("name")?)
                .arg(a.str("host_path")?)
                .arg(if a.flag("writable") { "writable" } else { "readonly" }))
        })
        .vm_id()
        .required_str("name")
        .required_str("host_path")
        .optional_bool("writable", true),
        // Devices
        Operation::vmrun("vmrun_device_connect", "Connect device", |a| {
            Ok(on_vm("connectNamedDevice", a).arg(a.str("device")?))
        })
        .vm_id()
        .required_str("device"),
        Operation::vmrun("vmrun_device_disconnect", "Disconnect device", |a| {
            Ok(on_vm("disconnectNamedDevice", a).arg(a.str("device")?))
        })
        .vm_id()
        .required_str("device"),
        // Variables
        Operation::vmrun("vmrun_var_read", "Read VM variable", |a| {
            Ok(in_guest("readVariable", a).arg(a.str("var_type")?).arg(a.str("name")?))
        })
        .vm_id()
        .required_choice("var_type", VARIABLE_TYPES)
        .required_str("name")
        .guest_login(),
        Operation::vmrun("vmrun_var_write", "Write VM variable", |a| {
            Ok(in_guest("writeVariable", a)
                .arg(a.str("var_type")?)
                .arg(a.str("name")?)
                .arg(a.str("value")?))
        })
        .vm_id()
        .required_choice("var_type", VARIABLE_TYPES)
        .required_str("name")
        .required_str("value")
        .guest_login(),
        // Screen and input
        Operation::vmrun("vmrun_screenshot", "Capture VM screenshot", |a| {
            Ok(on_vm("captureScreen", a).arg(a.str("output_path")?))
        })
        .vm_id()
        .required_str("output_path"),
        Operation::vmrun("vmrun_keystrokes", "Type keystrokes in guest", |a| {
            Ok(on_vm("typeKeystrokesInGuest", a).arg(a.str("keystrokes")?))
        })
        .vm_id()
        .required_str("keystrokes"),
        // Tools and network
        Operation::vmrun("vmrun_tools_install", "Install VMware Tools", |a| Ok(on_vm("installTools", a))).vm_id(),
        Operation::vmrun("vmrun_tools_state", "Check VMware Tools state", |a| Ok(on_vm("checkToolsState", a))).vm_id(),
        Operation::vmrun("vmrun_guest_ip", "Get guest IP address", |a| {
            Ok(on_vm("getGuestIPAddress", a).arg_if(a.flag("wait"), "-wait"))
        })
        .vm_id()
        .optional_bool("wait", false),
        Operation::vmrun("vmrun_host_networks", "List host networks", |_| Ok(CliCommand::new("listHostNetworks"))),
        Operation::vmrun("vmrun_portforward_list", "List port forwardings", |a| {
            Ok(CliCommand::new("listPortForwardings").arg(a.str("network")?))
        })
        .required_str("network"),
        Operation::vmrun("vmrun_portforward_set", "Set port forwarding", set_port_forwarding)
            .required_str("network")
            .required_str("protocol")
            .required_int("host_port")
            .required_str("guest_ip")
            .required_int("guest_port")
            .optional_str("description"),
        Operation::vmrun("vmrun_portforward_delete", "Delete port forwarding", |a| {
            Ok(CliCommand::new("deletePortForwarding")
                .arg(a.str("network")?)
                .arg(a.str("protocol")?)
                .arg(a.int("host_port")?.to_string()))
        })
        .required_str("network")
        .required_str("protocol")
        .required_int("host_port"),
    ]
}

fn clone(a: &Args) -> Result<CliCommand, DispatchError> {
    let snapshot = a.text("snapshot");
    let clone_name = a.text("clone_name");
    Ok(on_vm("clone", a)
        .arg(a.str("dest_path")?)
        .arg(a.str("clone_type")?)
        .arg_if(!snapshot.is_empty(), format!("-snapshot={}", snapshot))
        .arg_if(!clone_name.is_empty(), format!("-cloneName={}", clone_name)))
}

/// `-noWait`, `-activeWindow` and `-interactive` precede the program
fn launch_flags(command: CliCommand, a: &Args) -> CliCommand {
    command
        .arg_if(a.flag("no_wait"), "-noWait")
        .arg_if(a.flag("active_window"), "-activeWindow")
        .arg_if(a.flag("interactive"), "-interactive")
}

/// Program arguments are split on whitespace
fn run_program(a: &Args) -> Result<CliCommand, DispatchError> {
    let mut command = launch_flags(in_guest("runProgramInGuest", a), a).arg(a.str("program")?);
    for arg in a.text("args").split_whitespace() {
        command = command.arg(arg);
    }
    Ok(command)
}

fn run_script(a: &Args) -> Result<CliCommand, DispatchError> {
    Ok(launch_flags(in_guest("runScriptInGuest", a), a)
        .arg(a.str("interpreter")?)
        .arg(a.str("script")?))
}

fn set_port_forwarding(a: &Args) -> Result<CliCommand, DispatchError> {
    let description = a.text("description");
    Ok(CliCommand::new("setPortForwarding")
        .arg(a.str("network")?)
        .arg(a.str("protocol")?)
        .arg(a.int("host_port")?.to_string())
        .arg(a.str("guest_ip")?)
        .arg(a.int("guest_port")?.to_string())
        .arg_if(!description.is_empty(), description))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::cli::CliBackend;
    use crate::backend::VmRun;
    use crate::registry::{Handler, Registry};
    use serde_json::{json, Value};

    const VMX: &str = "/vms/dev/dev.vmx";

    fn argv(name: &str, raw: Value) -> Vec<String> {
        let registry = Registry::new(operations());
        let op = registry.get_schema(name).unwrap();
        let mut args = Args::decode(op, raw.as_object().unwrap()).unwrap();
        if op.needs_locator() {
            args.set_locator(VMX);
        }
        let command = match op.handler {
            Handler::VmRun(build) => build(&args).unwrap(),
            _ => panic!("{} is not a vmrun tool", name),
        };
        VmRun::new("vmrun").argv(&command)
    }

    #[test]
    fn test_run_program() {
        assert_eq!(
            argv("vmrun_run", json!({"vm_id": "a", "program": "echo", "args": "hello", "user": "alice"})),
            vec!["vmrun", "-T", "ws", "-gu", "alice", "runProgramInGuest", VMX, "echo", "hello"]
        );
    }

    #[test]
    fn test_run_program_flags_and_split_args() {
        assert_eq!(
            argv(
                "vmrun_run",
                json!({"vm_id": "a", "program": "/bin/ls", "args": "-l  /tmp", "no_wait": true, "interactive": true})
            ),
            vec!["vmrun", "-T", "ws", "runProgramInGuest", VMX, "-noWait", "-interactive", "/bin/ls", "-l", "/tmp"]
        );
    }

    #[test]
    fn test_script_keeps_script_whole() {
        assert_eq!(
            argv(
                "vmrun_script",
                json!({"vm_id": "a", "interpreter": "/bin/sh", "script": "echo a b", "active_window": true, "user": "u", "password": "p"})
            ),
            vec!["vmrun", "-T", "ws", "-gu", "u", "-gp", "p", "runScriptInGuest", VMX, "-activeWindow", "/bin/sh", "echo a b"]
        );
    }

    #[test]
    fn test_power_defaults() {
        assert_eq!(argv("vmrun_start", json!({"vm_id": "a"})), vec!["vmrun", "-T", "ws", "start", VMX, "gui"]);
        assert_eq!(
            argv("vmrun_start", json!({"vm_id": "a", "gui": false})),
            vec!["vmrun", "-T", "ws", "start", VMX, "nogui"]
        );
        assert_eq!(argv("vmrun_stop", json!({"vm_id": "a"})), vec!["vmrun", "-T", "ws", "stop", VMX, "soft"]);
        assert_eq!(
            argv("vmrun_suspend", json!({"vm_id": "a", "hard": true})),
            vec!["vmrun", "-T", "ws", "suspend", VMX, "hard"]
        );
    }

    #[test]
    fn test_clone_options() {
        assert_eq!(
            argv("vmrun_clone", json!({"vm_id": "a", "dest_path": "/vms/b.vmx"})),
            vec!["vmrun", "-T", "ws", "clone", VMX, "/vms/b.vmx", "linked"]
        );
        assert_eq!(
            argv(
                "vmrun_clone",
                json!({"vm_id": "a", "dest_path": "/vms/b.vmx", "clone_type": "full", "snapshot": "base", "clone_name": "b"})
            ),
            vec!["vmrun", "-T", "ws", "clone", VMX, "/vms/b.vmx", "full", "-snapshot=base", "-cloneName=b"]
        );
    }

    #[test]
    fn test_snapshot_options() {
        assert_eq!(
            argv("vmrun_snapshot_delete", json!({"vm_id": "a", "name": "s1", "delete_children": true})),
            vec!["vmrun", "-T", "ws", "deleteSnapshot", VMX, "s1", "andDeleteChildren"]
        );
        assert_eq!(
            argv("vmrun_snapshot_list", json!({"vm_id": "a", "show_tree": true})),
            vec!["vmrun", "-T", "ws", "listSnapshots", VMX, "showTree"]
        );
    }

    #[test]
    fn test_shared_folder_state() {
        assert_eq!(
            argv("vmrun_shared_set", json!({"vm_id": "a", "name": "src", "host_path": "/src", "writable": false})),
            vec!["vmrun", "-T", "ws", "setSharedFolderState", VMX, "src", "/src", "readonly"]
        );
    }

    #[test]
    fn test_kill_and_guest_ip() {
        assert_eq!(
            argv("vmrun_kill", json!({"vm_id": "a", "pid": 4242})),
            vec!["vmrun", "-T", "ws", "killProcessInGuest", VMX, "4242"]
        );
        assert_eq!(
            argv("vmrun_guest_ip", json!({"vm_id": "a", "wait": true})),
            vec!["vmrun", "-T", "ws", "getGuestIPAddress", VMX, "-wait"]
        );
    }

    #[test]
    fn test_host_level_port_forwarding() {
        assert_eq!(
            argv(
                "vmrun_portforward_set",
                json!({"network": "vmnet8", "protocol": "tcp", "host_port": 8080, "guest_ip": "10.0.0.2", "guest_port": 80})
            ),
            vec!["vmrun", "-T", "ws", "setPortForwarding", "vmnet8", "tcp", "8080", "10.0.0.2", "80"]
        );
        assert_eq!(
            argv("vmrun_portforward_delete", json!({"network": "vmnet8", "protocol": "tcp", "host_port": 8080})),
            vec!["vmrun", "-T", "ws", "deletePortForwarding", "vmnet8", "tcp", "8080"]
        );
        assert_eq!(argv("vmrun_list", json!({})), vec!["vmrun", "-T", "ws", "list"]);
    }

    #[test]
    fn test_argv_is_deterministic() {
        let raw = json!({"vm_id": "a", "program": "echo", "args": "hello", "user": "alice"});
        assert_eq!(argv("vmrun_run", raw.clone()), argv("vmrun_run", raw));
    }
}
