//! Clap derive structures for the `mcpdesk` CLI.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use mcpdesk_api::models::{McpTransport, Status, ToolType};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// mcpdesk -- manage MCP tools and markets, and chat with the console's assistant
#[derive(Debug, Parser)]
#[command(
    name = "mcpdesk",
    version,
    about = "Manage MCP tools, tool markets, and chat sessions from the command line",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// API base URL (e.g. http://localhost:9898/api)
    #[arg(long, short = 'u', env = "MCPDESK_API_BASE_URL", global = true)]
    pub base_url: Option<String>,

    /// API bearer token
    #[arg(long, env = "MCPDESK_API_TOKEN", global = true, hide_env_values = true)]
    pub api_token: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "MCPDESK_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Skip confirmation prompts
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,

    /// Accept invalid TLS certificates
    #[arg(long, short = 'k', global = true)]
    pub insecure: bool,

    /// Request timeout in seconds (chat streams are never timed out)
    #[arg(long, env = "MCPDESK_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Chat with the assistant
    #[command(alias = "c")]
    Chat(ChatArgs),

    /// Manage tool markets
    #[command(alias = "m")]
    Markets(MarketsArgs),

    /// Manage registered tools
    #[command(alias = "t")]
    Tools(ToolsArgs),

    /// Probe an MCP server directly
    Probe(ProbeArgs),

    /// Manage CLI configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Chat ─────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ChatArgs {
    #[command(subcommand)]
    pub command: ChatCommand,
}

#[derive(Debug, Subcommand)]
pub enum ChatCommand {
    /// Ask a question and wait for the full answer
    Send {
        message: String,

        /// Session key to continue a conversation
        #[arg(long, short = 's')]
        session: Option<String>,
    },

    /// Ask a question and print the answer as it is generated (Ctrl-C cancels)
    Stream {
        message: String,

        /// Session key to continue a conversation (a new one is generated if absent)
        #[arg(long, short = 's')]
        session: Option<String>,

        /// Send without any session key
        #[arg(long, conflicts_with = "session")]
        no_session: bool,
    },

    /// Show the stored exchanges of a session
    History { session: String },

    /// Delete the stored exchanges of a session
    Clear { session: String },
}

// ── Markets ──────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct MarketsArgs {
    #[command(subcommand)]
    pub command: MarketsCommand,
}

#[derive(Debug, Subcommand)]
pub enum MarketsCommand {
    /// List markets
    #[command(alias = "ls")]
    List {
        #[arg(long, value_parser = parse_status)]
        status: Option<Status>,

        #[arg(long, short = 'f')]
        keyword: Option<String>,
    },

    /// Show one market
    Get { id: i64 },

    /// List the tools a market offers
    Tools {
        id: i64,

        #[arg(long)]
        page: Option<u32>,

        #[arg(long)]
        size: Option<u32>,
    },

    /// Register a market
    Create(MarketFields),

    /// Change a market's fields
    Update {
        id: i64,

        #[command(flatten)]
        fields: MarketUpdate,
    },

    /// Delete a market
    #[command(alias = "rm")]
    Delete { id: i64 },

    /// Enable or disable a market
    Status {
        id: i64,
        #[arg(value_parser = parse_status)]
        status: Status,
    },

    /// Re-fetch a market's tool catalogue
    Refresh { id: i64 },

    /// Register one market tool as a local tool
    Load { tool_id: i64 },

    /// Register several market tools at once
    BatchLoad {
        #[arg(required = true, num_args = 1..)]
        tool_ids: Vec<i64>,
    },
}

#[derive(Debug, Args)]
pub struct MarketFields {
    #[arg(long)]
    pub name: String,

    #[arg(long)]
    pub url: String,

    #[arg(long)]
    pub description: Option<String>,

    /// Authentication settings passed to the market (JSON string)
    #[arg(long)]
    pub auth_config: Option<String>,

    /// Create the market disabled
    #[arg(long)]
    pub disabled: bool,
}

#[derive(Debug, Args)]
pub struct MarketUpdate {
    #[arg(long)]
    pub name: Option<String>,

    #[arg(long)]
    pub url: Option<String>,

    #[arg(long)]
    pub description: Option<String>,

    #[arg(long)]
    pub auth_config: Option<String>,
}

// ── Tools ────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ToolsArgs {
    #[command(subcommand)]
    pub command: ToolsCommand,
}

#[derive(Debug, Subcommand)]
pub enum ToolsCommand {
    /// List registered tools
    #[command(alias = "ls")]
    List {
        #[arg(long = "type", value_parser = parse_tool_type)]
        tool_type: Option<ToolType>,

        #[arg(long, value_parser = parse_status)]
        status: Option<Status>,

        #[arg(long, short = 'f')]
        keyword: Option<String>,
    },

    /// Show one tool
    Get { id: i64 },

    /// Show the runtime description of a tool
    Info { id: i64 },

    /// Register a tool
    Create(ToolFields),

    /// Change a tool's fields
    Update {
        id: i64,

        #[command(flatten)]
        fields: ToolUpdate,
    },

    /// Run a tool with optional JSON arguments
    Test {
        id: i64,

        /// Arguments as a JSON object, or @path to read them from a file
        #[arg(long, short = 'a')]
        args: Option<String>,
    },

    /// Enable or disable a tool
    Status {
        id: i64,
        #[arg(value_parser = parse_status)]
        status: Status,
    },

    /// Delete one or more tools
    #[command(alias = "rm")]
    Delete {
        #[arg(required = true, num_args = 1..)]
        ids: Vec<i64>,
    },
}

#[derive(Debug, Args)]
pub struct ToolFields {
    #[arg(long)]
    pub name: String,

    #[arg(long = "type", value_parser = parse_tool_type)]
    pub tool_type: ToolType,

    #[arg(long)]
    pub description: Option<String>,

    /// Tool configuration (JSON string, or @path)
    #[arg(long)]
    pub config: Option<String>,

    /// Create the tool disabled
    #[arg(long)]
    pub disabled: bool,
}

#[derive(Debug, Args)]
pub struct ToolUpdate {
    #[arg(long)]
    pub name: Option<String>,

    #[arg(long)]
    pub description: Option<String>,

    /// Tool configuration (JSON string, or @path)
    #[arg(long)]
    pub config: Option<String>,
}

// ── Probe ────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ProbeArgs {
    #[command(subcommand)]
    pub command: ProbeCommand,
}

#[derive(Debug, Subcommand)]
pub enum ProbeCommand {
    /// Check that an MCP server accepts connections
    Connection(ProbeTarget),

    /// List the tools an MCP server exposes
    ListTools(ProbeTarget),

    /// Call a tool on an MCP server
    Invoke {
        #[command(flatten)]
        target: ProbeTarget,

        /// Tool name
        #[arg(long)]
        tool: String,

        /// Arguments as a JSON object, or @path
        #[arg(long, short = 'a')]
        args: Option<String>,
    },
}

#[derive(Debug, Args)]
pub struct ProbeTarget {
    /// MCP server URL
    pub url: String,

    /// MCP transport
    #[arg(long, short = 't', value_parser = parse_transport)]
    pub transport: Option<McpTransport>,

    /// Extra header sent to the MCP server (NAME=VALUE, repeatable)
    #[arg(long = "header", short = 'H', value_parser = parse_header)]
    pub headers: Vec<(String, String)>,
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Display current resolved configuration
    Show,

    /// Print the config file path
    Path,

    /// Set a configuration value in the config file
    Set {
        /// One of: base_url, timeout_secs, insecure, ca_cert, api_token_env, user_agent
        key: String,

        value: String,
    },

    /// Store the API token in the system keyring
    SetToken {
        /// Read the token from stdin instead of prompting
        #[arg(long)]
        stdin: bool,
    },

    /// Remove the API token from the system keyring
    ClearToken,
}

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}

// ── Value parsers ────────────────────────────────────────────────────

fn parse_status(raw: &str) -> Result<Status, String> {
    raw.parse()
        .map_err(|_| format!("expected 'enabled' or 'disabled', got '{raw}'"))
}

fn parse_tool_type(raw: &str) -> Result<ToolType, String> {
    raw.parse()
        .map_err(|_| format!("expected 'local' or 'remote', got '{raw}'"))
}

fn parse_transport(raw: &str) -> Result<McpTransport, String> {
    raw.parse()
        .map_err(|_| format!("expected 'sse' or 'streamable-http', got '{raw}'"))
}

fn parse_header(raw: &str) -> Result<(String, String), String> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got '{raw}'"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("empty header name in '{raw}'"));
    }
    Ok((name.to_owned(), value.trim().to_owned()))
}

/// Accept either inline text or `@path` to read from a file.
pub fn inline_or_file(raw: &str) -> std::io::Result<String> {
    match raw.strip_prefix('@') {
        Some(path) => std::fs::read_to_string(PathBuf::from(path)),
        None => Ok(raw.to_owned()),
    }
}
