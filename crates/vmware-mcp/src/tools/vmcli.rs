//! vmcli tools
//!
//! vmcli groups its commands into modules (Snapshot, Guest, Chipset...).
//! Handlers emit the module, the command and its flags; guest logins are
//! appended by the backend as `-u`/`-P`.

use crate::args::Args;
use crate::backend::cli::CliCommand;
use crate::error::DispatchError;
use crate::registry::{CliHandler, Operation};

const CLONE_TYPES: &[&str] = &["linked", "full"];
const CONNECTION_TYPES: &[&str] = &["bridged", "nat", "hostonly", "custom"];

/// `module command` addressed at the caller's VM
fn on_vm(module: &'static str, command: &'static str, a: &Args) -> CliCommand {
    CliCommand::module(module, command).on(a.locator())
}

fn in_guest(command: &'static str, a: &Args) -> CliCommand {
    on_vm("Guest", command, a).as_guest(a.text("user"), a.text("password"))
}

fn bool_arg(value: bool) -> &'static str {
    if value {
        "true"
    } else {
        "false"
    }
}

/// Operation taking only the vm_id
fn vm_op(name: &'static str, description: &'static str, handler: CliHandler) -> Operation {
    Operation::vmcli(name, description, handler).vm_id()
}

/// Operation taking the vm_id plus guest login
fn guest_op(name: &'static str, description: &'static str, handler: CliHandler) -> Operation {
    vm_op(name, description, handler).guest_login()
}

pub fn operations() -> Vec<Operation> {
    let mut ops = Vec::new();
    ops.extend(snapshot_ops());
    ops.extend(guest_ops());
    ops.extend(machine_ops());
    ops.extend(device_ops());
    ops
}

fn snapshot_ops() -> Vec<Operation> {
    vec![
        vm_op("snapshot_list", "List snapshots (vmcli)", |a| Ok(on_vm("Snapshot", "query", a))),
        vm_op("snapshot_take", "Take snapshot (vmcli)", |a| {
            Ok(on_vm("Snapshot", "Take", a).flag_value("-n", a.str("name")?))
        })
        .required_str("name"),
        vm_op("snapshot_revert", "Revert to snapshot (vmcli)", |a| {
            Ok(on_vm("Snapshot", "Revert", a).flag_value("-n", a.str("name")?))
        })
        .required_str("name"),
        vm_op("snapshot_delete", "Delete snapshot (vmcli)", |a| {
            Ok(on_vm("Snapshot", "Delete", a)
                .flag_value("-n", a.str("name")?)
                .arg_if(a.flag("delete_children"), "--andDeleteChildren"))
        })
        .required_str("name")
        .optional_bool("delete_children", false),
        vm_op("snapshot_clone", "Clone from snapshot", |a| {
            Ok(on_vm("Snapshot", "Clone", a)
                .flag_value("-n", a.str("snapshot_name")?)
                .flag_value("-p", a.str("dest_path")?)
                .flag_value("-t", a.str("clone_type")?))
        })
        .required_str("snapshot_name")
        .required_str("dest_path")
        .optional_choice("clone_type", CLONE_TYPES, "linked"),
    ]
}

fn guest_ops() -> Vec<Operation> {
    vec![
        guest_op("guest_run", "Run program in guest", |a| {
            Ok(in_guest("run", a)
                .flag_value("-p", a.str("program")?)
                .flag_value_if_set("-a", a.text("args")))
        })
        .required_str("program")
        .optional_str("args"),
        guest_op("guest_ps", "List processes", |a| Ok(in_guest("ps", a))),
        guest_op("guest_kill", "Kill process", |a| {
            Ok(in_guest("kill", a).flag_value("--pid", a.int("pid")?.to_string()))
        })
        .required_int("pid"),
        guest_op("guest_ls", "List files", |a| Ok(in_guest("ls", a).flag_value("-d", a.str("path")?)))
            .required_str("path"),
        guest_op("guest_mkdir", "Create directory", |a| {
            Ok(in_guest("mkdir", a).flag_value("-d", a.str("path")?))
        })
        .required_str("path"),
        guest_op("guest_rm", "Delete file", |a| Ok(in_guest("rm", a).flag_value("-f", a.str("path")?)))
            .required_str("path"),
        guest_op("guest_rmdir", "Delete directory", |a| {
            Ok(in_guest("rmdir", a).flag_value("-d", a.str("path")?))
        })
        .required_str("path"),
        guest_op("guest_copy_to", "Copy to guest", |a| {
            Ok(in_guest("copyTo", a)
                .flag_value("-l", a.str("host_path")?)
                .flag_value("-r", a.str("guest_path")?))
        })
        .required_str("host_path")
        .required_str("guest_path"),
        guest_op("guest_copy_from", "Copy from guest", |a| {
            Ok(in_guest("copyFrom", a)
                .flag_value("-r", a.str("guest_path")?)
                .flag_value("-l", a.str("host_path")?))
        })
        .required_str("guest_path")
        .required_str("host_path"),
        guest_op("guest_env", "Get environment", |a| Ok(in_guest("env", a))),
        // Mouse, keyboard and screen
        vm_op("mks_screenshot", "Capture screenshot", |a| {
            Ok(on_vm("MKS", "captureScreenshot", a).flag_value("-o", a.str("output_path")?))
        })
        .required_str("output_path"),
        vm_op("mks_send_key", "Send key sequence", |a| {
            Ok(on_vm("MKS", "sendKeySequence", a).flag_value("-s", a.str("key_sequence")?))
        })
        .required_str("key_sequence"),
        vm_op("mks_query", "Query MKS state", |a| Ok(on_vm("MKS", "query", a))),
    ]
}

fn machine_ops() -> Vec<Operation> {
    vec![
        // Chipset
        vm_op("chipset_query", "Query chipset config", |a| Ok(on_vm("Chipset", "query", a))),
        vm_op("chipset_set_cpu", "Set CPU count", |a| {
            Ok(on_vm("Chipset", "SetVCpuCount", a).flag_value("-c", a.int("count")?.to_string()))
        })
        .required_int("count"),
        vm_op("chipset_set_memory", "Set memory (MB)", |a| {
            Ok(on_vm("Chipset", "SetMemSize", a).flag_value("-s", a.int("size_mb")?.to_string()))
        })
        .required_int("size_mb"),
        vm_op("chipset_set_cores", "Set cores per socket", |a| {
            Ok(on_vm("Chipset", "SetCoresPerSocket", a).flag_value("-c", a.int("cores")?.to_string()))
        })
        .required_int("cores"),
        // Tools
        vm_op("tools_query", "Query Tools status", |a| Ok(on_vm("Tools", "Query", a))),
        vm_op("tools_install", "Install Tools", |a| Ok(on_vm("Tools", "Install", a))),
        vm_op("tools_upgrade", "Upgrade Tools", |a| Ok(on_vm("Tools", "Upgrade", a))),
        // Templates
        vm_op("template_create", "Create template", |a| {
            Ok(on_vm("VMTemplate", "Create", a)
                .flag_value("-p", a.str("template_path")?)
                .flag_value("-n", a.str("name")?))
        })
        .required_str("template_path")
        .required_str("name"),
        Operation::vmcli("template_deploy", "Deploy template", |a| {
            Ok(CliCommand::module("VMTemplate", "Deploy")
                .flag_value("-p", a.str("template_path")?)
                .flag_value("-d", a.str("dest_path")?)
                .flag_value("-n", a.str("name")?))
        })
        .required_str("template_path")
        .required_str("dest_path")
        .required_str("name"),
        Operation::vmcli("vmcli_vm_create", "Create a new VM", |a| {
            Ok(CliCommand::module("VM", "Create")
                .flag_value("-n", a.str("name")?)
                .flag_value("-d", a.str("dest_dir")?)
                .flag_value("-g", a.str("guest_os")?))
        })
        .required_str("name")
        .required_str("dest_dir")
        .required_str("guest_os"),
        // Disks
        vm_op("disk_query", "Query disk config", |a| Ok(on_vm("Disk", "query", a))),
        vm_op("disk_create", "Create disk", |a| {
            Ok(on_vm("Disk", "Create", a)
                .flag_value("-s", a.int("size_gb")?.to_string())
                .flag_value("-t", a.str("disk_type")?)
                .flag_value("-a", a.int("adapter")?.to_string())
                .flag_value("-d", a.int("device")?.to_string()))
        })
        .required_int("size_gb")
        .optional_str_or("disk_type", "scsi")
        .optional_int_or("adapter", 0)
        .optional_int_or("device", 0),
        vm_op("disk_extend", "Extend disk", |a| {
            Ok(on_vm("Disk", "Extend", a)
                .flag_value("-s", a.int("new_size_gb")?.to_string())
                .flag_value("-a", a.int("adapter")?.to_string())
                .flag_value("-d", a.int("device")?.to_string()))
        })
        .required_int("new_size_gb")
        .optional_int_or("adapter", 0)
        .optional_int_or("device", 0),
        // Config params
        vm_op("config_query", "Query config params", |a| Ok(on_vm("ConfigParams", "query", a))),
        vm_op("config_set", "Set config param", |a| {
            Ok(on_vm("ConfigParams", "SetEntry", a)
                .flag_value("-k", a.str("key")?)
                .flag_value("-v", a.str("value")?))
        })
        .required_str("key")
        .required_str("value"),
        // Power
        vm_op("power_query", "Query power state", |a| Ok(on_vm("Power", "query", a))),
        vm_op("power_start", "Start VM", |a| Ok(on_vm("Power", "Start", a))),
        vm_op("power_stop", "Stop VM", |a| Ok(on_vm("Power", "Stop", a))),
        vm_op("power_pause", "Pause VM", |a| Ok(on_vm("Power", "Pause", a))),
        vm_op("power_unpause", "Unpause VM", |a| Ok(on_vm("Power", "Unpause", a))),
        vm_op("power_reset", "Reset VM", |a| Ok(on_vm("Power", "Reset", a))),
        vm_op("power_suspend", "Suspend VM", |a| Ok(on_vm("Power", "Suspend", a))),
    ]
}

fn indexed(module: &'static str, command: &'static str, a: &Args) -> Result<CliCommand, DispatchError> {
    Ok(on_vm(module, command, a).flag_value("-i", a.int("index")?.to_string()))
}

fn by_adapter(module: &'static str, command: &'static str, a: &Args) -> Result<CliCommand, DispatchError> {
    Ok(on_vm(module, command, a).flag_value("-a", a.int("adapter")?.to_string()))
}

fn device_ops() -> Vec<Operation> {
    vec![
        // Ethernet
        vm_op("ethernet_query", "Query ethernet config", |a| Ok(on_vm("Ethernet", "query", a))),
        vm_op("ethernet_set_type", "Set connection type", |a| {
            Ok(indexed("Ethernet", "SetConnectionType", a)?.flag_value("-t", a.str("type")?))
        })
        .required_int("index")
        .required_choice("type", CONNECTION_TYPES),
        vm_op("ethernet_set_present", "Set ethernet present", |a| {
            Ok(indexed("Ethernet", "SetPresent", a)?.flag_value("-e", bool_arg(a.bool("present")?)))
        })
        .required_int("index")
        .required_bool("present"),
        vm_op("ethernet_set_connected", "Set start connected", |a| {
            Ok(indexed("Ethernet", "SetStartConnected", a)?.flag_value("-e", bool_arg(a.bool("connected")?)))
        })
        .required_int("index")
        .required_bool("connected"),
        vm_op("ethernet_set_device", "Set virtual device", |a| {
            Ok(indexed("Ethernet", "SetVirtualDevice", a)?.flag_value("-d", a.str("device")?))
        })
        .required_int("index")
        .required_str("device"),
        vm_op("ethernet_set_network", "Set network name", |a| {
            Ok(indexed("Ethernet", "SetNetworkName", a)?.flag_value("-n", a.str("name")?))
        })
        .required_int("index")
        .required_str("name"),
        vm_op("ethernet_purge", "Remove ethernet adapter", |a| indexed("Ethernet", "Purge", a))
            .required_int("index"),
        // Shared folders
        vm_op("hgfs_query", "Query shared folders", |a| Ok(on_vm("HGFS", "query", a))),
        vm_op("hgfs_set_enabled", "Enable/disable share", |a| {
            Ok(indexed("HGFS", "SetEnabled", a)?.flag_value("-e", bool_arg(a.bool("enabled")?)))
        })
        .required_int("index")
        .required_bool("enabled"),
        vm_op("hgfs_set_path", "Set host path", |a| {
            Ok(indexed("HGFS", "SetHostPath", a)?.flag_value("-p", a.str("path")?))
        })
        .required_int("index")
        .required_str("path"),
        vm_op("hgfs_set_name", "Set guest name", |a| {
            Ok(indexed("HGFS", "SetGuestName", a)?.flag_value("-n", a.str("name")?))
        })
        .required_int("index")
        .required_str("name"),
        vm_op("hgfs_set_present", "Set share present", |a| {
            Ok(indexed("HGFS", "SetPresent", a)?.flag_value("-e", bool_arg(a.bool("present")?)))
        })
        .required_int("index")
        .required_bool("present"),
        vm_op("hgfs_set_read", "Set read access", |a| {
            Ok(indexed("HGFS", "SetReadAccess", a)?.flag_value("-e", bool_arg(a.bool("read")?)))
        })
        .required_int("index")
        .required_bool("read"),
        vm_op("hgfs_set_write", "Set write access", |a| {
            Ok(indexed("HGFS", "SetWriteAccess", a)?.flag_value("-e", bool_arg(a.bool("write")?)))
        })
        .required_int("index")
        .required_bool("write"),
        // Serial ports
        vm_op("serial_query", "Query serial ports", |a| Ok(on_vm("Serial", "Query", a))),
        vm_op("serial_set_present", "Set serial present", |a| {
            Ok(indexed("Serial", "SetPresent", a)?.flag_value("-e", bool_arg(a.bool("present")?)))
        })
        .required_int("index")
        .required_bool("present"),
        vm_op("serial_purge", "Remove serial port", |a| indexed("Serial", "Purge", a)).required_int("index"),
        // SATA
        vm_op("sata_query", "Query SATA config", |a| Ok(on_vm("Sata", "query", a))),
        vm_op("sata_set_present", "Set SATA present", |a| {
            Ok(by_adapter("Sata", "SetPresent", a)?.flag_value("-e", bool_arg(a.bool("present")?)))
        })
        .required_int("adapter")
        .required_bool("present"),
        vm_op("sata_purge", "Remove SATA adapter", |a| by_adapter("Sata", "Purge", a)).required_int("adapter"),
        // NVMe
        vm_op("nvme_query", "Query NVMe config", |a| Ok(on_vm("Nvme", "query", a))),
        vm_op("nvme_set_present", "Set NVMe present", |a| {
            Ok(by_adapter("Nvme", "SetPresent", a)?.flag_value("-e", bool_arg(a.bool("present")?)))
        })
        .required_int("adapter")
        .required_bool("present"),
        vm_op("nvme_purge", "Remove NVMe adapter", |a| by_adapter("Nvme", "Purge", a)).required_int("adapter"),
        // VProbes
        vm_op("vprobes_query", "Query VProbes", |a| Ok(on_vm("VProbes", "Query", a))),
        vm_op("vprobes_enable", "Enable VProbes", |a| {
            Ok(on_vm("VProbes", "SetEnabled", a).flag_value("-e", bool_arg(a.bool("enabled")?)))
        })
        .required_bool("enabled"),
        vm_op("vprobes_load", "Load VProbes script", |a| {
            Ok(on_vm("VProbes", "Load", a).flag_value("-s", a.str("script_path")?))
        })
        .required_str("script_path"),
        vm_op("vprobes_reset", "Reset VProbes", |a| Ok(on_vm("VProbes", "Reset", a))),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::cli::CliBackend;
    use crate::backend::VmCli;
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
            Handler::VmCli(build) => build(&args).unwrap(),
            _ => panic!("{} is not a vmcli tool", name),
        };
        VmCli::new("vmcli").argv(&command)
    }

    #[test]
    fn test_guest_run() {
        assert_eq!(
            argv("guest_run", json!({"vm_id": "a", "program": "echo", "args": "hello", "user": "alice"})),
            vec!["vmcli", VMX, "Guest", "run", "-p", "echo", "-a", "hello", "-u", "alice"]
        );
    }

    #[test]
    fn test_guest_run_keeps_args_as_one_value() {
        assert_eq!(
            argv("guest_run", json!({"vm_id": "a", "program": "ls", "args": "-l /tmp", "password": "pw"})),
            vec!["vmcli", VMX, "Guest", "run", "-p", "ls", "-a", "-l /tmp", "-P", "pw"]
        );
        assert_eq!(
            argv("guest_run", json!({"vm_id": "a", "program": "ls"})),
            vec!["vmcli", VMX, "Guest", "run", "-p", "ls"]
        );
    }

    #[test]
    fn test_guest_kill_and_copy() {
        assert_eq!(
            argv("guest_kill", json!({"vm_id": "a", "pid": 77, "user": "u", "password": "p"})),
            vec!["vmcli", VMX, "Guest", "kill", "--pid", "77", "-u", "u", "-P", "p"]
        );
        assert_eq!(
            argv("guest_copy_from", json!({"vm_id": "a", "guest_path": "/g", "host_path": "/h"})),
            vec!["vmcli", VMX, "Guest", "copyFrom", "-r", "/g", "-l", "/h"]
        );
    }

    #[test]
    fn test_snapshot_commands() {
        assert_eq!(argv("snapshot_list", json!({"vm_id": "a"})), vec!["vmcli", VMX, "Snapshot", "query"]);
        assert_eq!(
            argv("snapshot_delete", json!({"vm_id": "a", "name": "s1", "delete_children": true})),
            vec!["vmcli", VMX, "Snapshot", "Delete", "-n", "s1", "--andDeleteChildren"]
        );
        assert_eq!(
            argv("snapshot_clone", json!({"vm_id": "a", "snapshot_name": "s1", "dest_path": "/c"})),
            vec!["vmcli", VMX, "Snapshot", "Clone", "-n", "s1", "-p", "/c", "-t", "linked"]
        );
    }

    #[test]
    fn test_disk_defaults() {
        assert_eq!(
            argv("disk_create", json!({"vm_id": "a", "size_gb": 20})),
            vec!["vmcli", VMX, "Disk", "Create", "-s", "20", "-t", "scsi", "-a", "0", "-d", "0"]
        );
        assert_eq!(
            argv("disk_extend", json!({"vm_id": "a", "new_size_gb": 40, "adapter": 1})),
            vec!["vmcli", VMX, "Disk", "Extend", "-s", "40", "-a", "1", "-d", "0"]
        );
    }

    #[test]
    fn test_booleans_render_as_words() {
        assert_eq!(
            argv("ethernet_set_present", json!({"vm_id": "a", "index": 0, "present": false})),
            vec!["vmcli", VMX, "Ethernet", "SetPresent", "-i", "0", "-e", "false"]
        );
        assert_eq!(
            argv("nvme_set_present", json!({"vm_id": "a", "adapter": 1, "present": "true"})),
            vec!["vmcli", VMX, "Nvme", "SetPresent", "-a", "1", "-e", "true"]
        );
        assert_eq!(
            argv("vprobes_enable", json!({"vm_id": "a", "enabled": true})),
            vec!["vmcli", VMX, "VProbes", "SetEnabled", "-e", "true"]
        );
    }

    #[test]
    fn test_host_level_commands() {
        assert_eq!(
            argv("vmcli_vm_create", json!({"name": "web", "dest_dir": "/vms", "guest_os": "ubuntu-64"})),
            vec!["vmcli", "VM", "Create", "-n", "web", "-d", "/vms", "-g", "ubuntu-64"]
        );
        assert_eq!(
            argv("template_deploy", json!({"template_path": "/t.vmtx", "dest_path": "/vms", "name": "web"})),
            vec!["vmcli", "VMTemplate", "Deploy", "-p", "/t.vmtx", "-d", "/vms", "-n", "web"]
        );
    }

    #[test]
    fn test_chipset_and_config() {
        assert_eq!(
            argv("chipset_set_memory", json!({"vm_id": "a", "size_mb": 8192})),
            vec!["vmcli", VMX, "Chipset", "SetMemSize", "-s", "8192"]
        );
        assert_eq!(
            argv("config_set", json!({"vm_id": "a", "key": "svga.autodetect", "value": "TRUE"})),
            vec!["vmcli", VMX, "ConfigParams", "SetEntry", "-k", "svga.autodetect", "-v", "TRUE"]
        );
    }
}
