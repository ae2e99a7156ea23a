//! vmware-mcp - VMware Workstation tools over the Model Context Protocol
//!
//! Usage:
//!   vmware-mcp              # serve MCP over stdio
//!   vmware-mcp tools        # print the tool catalog
//!   vmware-mcp call <tool>  # run one tool and print the result
//!
//! Logs go to stderr; stdout carries protocol frames only.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use vmware_core::Config;
use vmware_mcp::registry::{Operation, ParamKind};
use vmware_mcp::{Dispatcher, McpServer, Registry};

#[derive(Parser)]
#[command(name = "vmware-mcp")]
#[command(about = "MCP server for VMware Workstation (REST API, vmrun, vmcli)")]
#[command(version)]
#[command(after_help = "\
CONFIGURATION:
    VMWARE_HOST, VMWARE_PORT          REST API address (default localhost:8697)
    VMWARE_USERNAME, VMWARE_PASSWORD  REST API basic auth
    VMRUN_PATH, VMCLI_PATH            Command-line tool locations
    VMWARE_STRICT_IDS                 Fail on unknown vm_id instead of passing an empty path
    VMWARE_MCP_CONFIG                 JSON config file

EXAMPLES:
    vmware-mcp                                   # Serve over stdio
    vmware-mcp tools --backend vmcli             # List vmcli tools
    vmware-mcp call vm_power_set --vm_id ABC --state on
    vmware-mcp call vmrun_list")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve MCP over stdio (default)
    Serve,

    /// List the available tools
    Tools {
        /// Only tools of this backend
        #[arg(long, value_parser = ["rest", "vmrun", "vmcli"])]
        backend: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Call a tool directly
    Call {
        /// Tool name to call
        tool: String,

        /// Arguments as a JSON object
        #[arg(long)]
        json_args: Option<String>,

        /// Tool arguments in --key value format
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging to stderr (stdout is for MCP protocol)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => cmd_serve().await,
        Commands::Tools { backend, json } => cmd_tools(backend.as_deref(), json),
        Commands::Call { tool, json_args, args } => cmd_call(&tool, json_args.as_deref(), &args).await,
    }
}

fn load_dispatcher() -> Result<Dispatcher> {
    let config = Config::load().context("Failed to load configuration")?;
    info!(
        rest = %config.rest.base_url(),
        vmrun = %config.vmrun_path.display(),
        vmcli = %config.vmcli_path.display(),
        strict_ids = config.strict_ids,
        "Loaded configuration"
    );
    Dispatcher::from_config(&config).context("Failed to initialize backends")
}

async fn cmd_serve() -> Result<()> {
    info!("Starting VMware MCP server");
    let mut server = McpServer::new(Arc::new(load_dispatcher()?));
    server.run().await
}

fn cmd_tools(backend: Option<&str>, json: bool) -> Result<()> {
    let registry = Registry::with_catalog();
    let operations: Vec<_> = registry
        .list_operations()
        .iter()
        .filter(|op| backend.map_or(true, |b| op.backend().as_str() == b))
        .collect();

    if json {
        let tools: Vec<_> = operations.iter().map(|op| op.to_tool()).collect();
        println!("{}", serde_json::to_string_pretty(&tools)?);
        return Ok(());
    }

    for op in &operations {
        println!("  {:28} {:6} {}", op.name, op.backend().as_str(), op.description);
    }
    println!();
    println!("{} tools", operations.len());
    Ok(())
}

async fn cmd_call(tool: &str, json_args: Option<&str>, args: &[String]) -> Result<()> {
    let mut arguments = match json_args {
        Some(text) => match serde_json::from_str(text).context("Invalid --json-args")? {
            Value::Object(map) => map,
            _ => bail!("--json-args must be a JSON object"),
        },
        None => Map::new(),
    };

    let dispatcher = load_dispatcher()?;
    let operation = dispatcher.registry().get_schema(tool).ok();
    arguments.extend(parse_arguments(operation, args));

    match dispatcher.invoke(tool, &arguments).await {
        Ok(payload) => {
            println!("{}", payload.render());
            Ok(())
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

/// Parse `--key value`, `--key=value` and bare `--flag` arguments
///
/// Values are typed by the operation's declared params when it is known.
fn parse_arguments(operation: Option<&Operation>, args: &[String]) -> Map<String, Value> {
    let kind = |key: &str| operation.and_then(|op| op.param(key)).map(|p| p.kind);
    let mut result = Map::new();
    let mut i = 0;

    while i < args.len() {
        if let Some(key) = args[i].strip_prefix("--") {
            if let Some((k, v)) = key.split_once('=') {
                result.insert(k.to_string(), parse_value(v, kind(k)));
            } else if i + 1 < args.len() && !args[i + 1].starts_with("--") {
                i += 1;
                result.insert(key.to_string(), parse_value(&args[i], kind(key)));
            } else {
                result.insert(key.to_string(), Value::Bool(true));
            }
        }
        i += 1;
    }

    result
}

/// Parse a string value, trying JSON first
///
/// String params keep the text exactly as typed so `007` or `1.50` are
/// not reformatted as numbers.
fn parse_value(s: &str, kind: Option<ParamKind>) -> Value {
    match kind {
        Some(ParamKind::String | ParamKind::Enum(_)) => Value::String(s.to_string()),
        _ => serde_json::from_str(s).unwrap_or_else(|_| Value::String(s.to_string())),
    }
}
