//! vmware-core - Shared functionality for the vmware-mcp server
//!
//! Configuration loading, well-known install paths and subprocess capture.
//! Nothing in here knows about tools or the MCP protocol.

pub mod config;
pub mod paths;
pub mod process;

pub use config::{Config, RestConfig};
pub use paths::Paths;
pub use process::CapturedOutput;
