//! REST API tools

use serde_json::{json, Map, Value};

use crate::args::Args;
use crate::backend::rest::{self, RestRequest};
use crate::error::DispatchError;
use crate::registry::Operation;

const POWER_STATES: &[&str] = &["on", "off", "shutdown", "suspend", "pause", "unpause"];
const NIC_TYPES: &[&str] = &["bridged", "nat", "hostonly", "custom"];
const NETWORK_TYPES: &[&str] = &["bridged", "nat", "hostonly"];
const PROTOCOLS: &[&str] = &["tcp", "udp"];

pub fn operations() -> Vec<Operation> {
    vec![
        // VM management
        Operation::rest("vm_list", "List all VMs", |_| Ok(rest::list_vms())).refreshes_locators(),
        Operation::rest("vm_get", "Get VM settings", |a| Ok(rest::get_vm(a.str("vm_id")?))).vm_id(),
        Operation::rest("vm_create", "Clone a VM (REST)", |a| {
            Ok(rest::create_vm(a.str("vm_id")?, a.str("name")?))
        })
        .vm_id()
        .required_str("name"),
        Operation::rest("vm_delete", "Delete a VM", |a| Ok(rest::delete_vm(a.str("vm_id")?))).vm_id(),
        Operation::rest("vm_update", "Update VM settings", update_vm)
            .vm_id()
            .optional_int("cpu")
            .optional_int("memory"),
        // Power
        Operation::rest("vm_power_get", "Get VM power state", |a| {
            Ok(rest::get_power_state(a.str("vm_id")?))
        })
        .vm_id(),
        Operation::rest("vm_power_set", "Change VM power state", |a| {
            Ok(rest::change_power_state(a.str("vm_id")?, a.str("state")?))
        })
        .vm_id()
        .required_choice("state", POWER_STATES),
        // Network adapters
        Operation::rest("vm_nic_list", "List VM network adapters", |a| Ok(rest::list_nics(a.str("vm_id")?))).vm_id(),
        Operation::rest("vm_nic_create", "Create VM network adapter", |a| {
            Ok(rest::create_nic(a.str("vm_id")?, json!({ "type": a.str("type")? })))
        })
        .vm_id()
        .required_choice("type", NIC_TYPES),
        Operation::rest("vm_nic_update", "Update VM network adapter", |a| {
            Ok(rest::update_nic(a.str("vm_id")?, a.int("index")?, json!({ "type": a.str("type")? })))
        })
        .vm_id()
        .required_int("index")
        .required_choice("type", NIC_TYPES),
        Operation::rest("vm_nic_delete", "Delete VM network adapter", |a| {
            Ok(rest::delete_nic(a.str("vm_id")?, a.int("index")?))
        })
        .vm_id()
        .required_int("index"),
        Operation::rest("vm_ip_get", "Get VM IP address (REST)", |a| Ok(rest::get_vm_ip(a.str("vm_id")?))).vm_id(),
        // Shared folders
        Operation::rest("vm_folder_list", "List VM shared folders", |a| {
            Ok(rest::list_shared_folders(a.str("vm_id")?))
        })
        .vm_id(),
        Operation::rest("vm_folder_create", "Create VM shared folder", |a| {
            Ok(rest::create_shared_folder(a.str("vm_id")?, folder_config(a)?))
        })
        .vm_id()
        .required_str("folder_id")
        .required_str("host_path")
        .optional_int_or("flags", 0),
        Operation::rest("vm_folder_update", "Update VM shared folder", |a| {
            Ok(rest::update_shared_folder(a.str("vm_id")?, a.str("folder_id")?, folder_config(a)?))
        })
        .vm_id()
        .required_str("folder_id")
        .required_str("host_path")
        .optional_int_or("flags", 0),
        Operation::rest("vm_folder_delete", "Delete VM shared folder", |a| {
            Ok(rest::delete_shared_folder(a.str("vm_id")?, a.str("folder_id")?))
        })
        .vm_id()
        .required_str("folder_id"),
        // Host networks
        Operation::rest("network_list", "List host virtual networks", |_| Ok(rest::list_networks())),
        Operation::rest("network_create", "Create host virtual network", |a| {
            Ok(rest::create_network(json!({ "name": a.str("name")?, "type": a.str("type")? })))
        })
        .required_str("name")
        .required_choice("type", NETWORK_TYPES),
        Operation::rest("network_mactoip_list", "List MAC-to-IP bindings", |a| {
            Ok(rest::get_mac_to_ips(a.str("vmnet")?))
        })
        .required_str("vmnet"),
        Operation::rest("network_mactoip_set", "Bind a MAC address to an IP", |a| {
            Ok(rest::update_mac_to_ip(a.str("vmnet")?, a.str("mac")?, a.str("ip")?))
        })
        .required_str("vmnet")
        .required_str("mac")
        .required_str("ip"),
        Operation::rest("network_portforward_list", "List port forwards", |a| {
            Ok(rest::get_portforwards(a.str("vmnet")?))
        })
        .required_str("vmnet"),
        Operation::rest("network_portforward_set", "Set port forward", |a| {
            Ok(rest::update_portforward(
                a.str("vmnet")?,
                a.str("protocol")?,
                a.int("port")?,
                json!({ "guestIp": a.str("guest_ip")?, "guestPort": a.int("guest_port")? }),
            ))
        })
        .required_str("vmnet")
        .required_choice("protocol", PROTOCOLS)
        .required_int("port")
        .required_str("guest_ip")
        .required_int("guest_port"),
        Operation::rest("network_portforward_delete", "Delete port forward", |a| {
            Ok(rest::delete_portforward(a.str("vmnet")?, a.str("protocol")?, a.int("port")?))
        })
        .required_str("vmnet")
        .required_str("protocol")
        .required_int("port"),
    ]
}

/// Only the settings the caller supplied are sent
fn update_vm(a: &Args) -> Result<RestRequest, DispatchError> {
    let mut settings = Map::new();
    for key in ["cpu", "memory"] {
        if let Some(value) = a.opt_int(key) {
            settings.insert(key.to_string(), json!(value));
        }
    }
    Ok(rest::update_vm(a.str("vm_id")?, Value::Object(settings)))
}

fn folder_config(a: &Args) -> Result<Value, DispatchError> {
    Ok(json!({
        "folder_id": a.str("folder_id")?,
        "host_path": a.str("host_path")?,
        "flags": a.opt_int("flags").unwrap_or(0),
    }))
}
