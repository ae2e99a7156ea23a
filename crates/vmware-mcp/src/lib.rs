//! VMware MCP Server
//!
//! Exposes VMware Workstation management to AI assistants via the Model
//! Context Protocol (MCP). Tools are backed by the Workstation REST API
//! (vmrest) and the `vmrun` and `vmcli` command-line tools.

pub mod args;
pub mod backend;
pub mod cache;
pub mod dispatcher;
pub mod error;
pub mod protocol;
pub mod registry;
pub mod server;
pub mod tools;

pub use dispatcher::Dispatcher;
pub use error::DispatchError;
pub use registry::Registry;
pub use server::McpServer;
