//! Tool catalog
//!
//! Operation definitions grouped by backend. The registry advertises them
//! in this order: REST first, then vmrun, then vmcli.

pub mod rest;
pub mod vmcli;
pub mod vmrun;

use crate::registry::Operation;

/// Every operation the server exposes
pub fn catalog() -> Vec<Operation> {
    let mut operations = rest::operations();
    operations.extend(vmrun::operations());
    operations.extend(vmcli::operations());
    operations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Backend;

    #[test]
    fn test_catalog_groups_by_backend() {
        let backends: Vec<Backend> = catalog().iter().map(Operation::backend).collect();
        let first_vmrun = backends.iter().position(|b| *b == Backend::VmRun).unwrap();
        let first_vmcli = backends.iter().position(|b| *b == Backend::VmCli).unwrap();
        assert!(backends[..first_vmrun].iter().all(|b| *b == Backend::Rest));
        assert!(backends[first_vmrun..first_vmcli].iter().all(|b| *b == Backend::VmRun));
        assert!(backends[first_vmcli..].iter().all(|b| *b == Backend::VmCli));
    }

    #[test]
    fn test_vmrun_tools_are_prefixed() {
        for op in vmrun::operations() {
            assert!(op.name.starts_with("vmrun_"), "{}", op.name);
        }
    }

    #[test]
    fn test_guest_tools_accept_login() {
        for op in catalog() {
            if op.param("user").is_some() {
                assert!(op.param("password").is_some(), "{}", op.name);
            }
        }
    }
}
