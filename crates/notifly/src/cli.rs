//! Clap derive structures for the `notifly` CLI.

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// notifly -- console notifications from the command line
#[derive(Debug, Parser)]
#[command(
    name = "notifly",
    version,
    about = "Watch and manage console notifications from the command line",
    long_about = "Streams real-time notifications over the console push channel and\n\
        manages the notification history: list, inspect, mark read, clear.",
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
    /// Console profile to use
    #[arg(long, short = 'p', env = "NOTIFLY_PROFILE", global = true)]
    pub profile: Option<String>,

    /// History API root, e.g. https://console.example.com/api/ (overrides profile)
    #[arg(long, env = "NOTIFLY_API_URL", global = true)]
    pub api_url: Option<String>,

    /// Push channel host, e.g. wss://console.example.com (overrides profile)
    #[arg(long, env = "NOTIFLY_WS_URL", global = true)]
    pub ws_url: Option<String>,

    /// Bearer token
    #[arg(long, env = "NOTIFLY_TOKEN", global = true, hide_env_values = true)]
    pub token: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "NOTIFLY_OUTPUT",
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

    /// Request timeout in seconds (overrides profile)
    #[arg(long, global = true)]
    pub timeout: Option<u64>,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, ValueEnum)]
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
    /// Stream live notifications until interrupted
    #[command(alias = "w")]
    Watch(WatchArgs),

    /// List notification history
    #[command(alias = "ls")]
    List(ListArgs),

    /// Show one notification
    Get {
        /// Notification ID
        id: u64,
    },

    /// Mark notifications read
    MarkRead {
        /// Notification IDs
        #[arg(required = true)]
        ids: Vec<u64>,
    },

    /// Mark every notification read
    MarkAllRead,

    /// Delete every notification
    ClearAll,

    /// Show the unread notification count
    UnreadCount,

    /// Manage CLI configuration
    Config(ConfigArgs),
}

// ── Command Arguments ────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Exit after this many notifications
    #[arg(long, short = 'n')]
    pub count: Option<usize>,
}

#[derive(Debug, Args)]
pub struct ListArgs {
    /// Only read notifications
    #[arg(long, conflicts_with = "unread")]
    pub read: bool,

    /// Only unread notifications
    #[arg(long)]
    pub unread: bool,

    /// Filter by notification type (e.g. critical_finding)
    #[arg(long)]
    pub kind: Option<String>,

    /// Page number (1-based)
    #[arg(long, default_value = "1")]
    pub page: u32,

    /// Mark the listed unread notifications read, as if the page was viewed
    #[arg(long)]
    pub mark_viewed: bool,
}

impl ListArgs {
    pub fn is_read(&self) -> Option<bool> {
        match (self.read, self.unread) {
            (true, _) => Some(true),
            (_, true) => Some(false),
            _ => None,
        }
    }
}

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the config file location
    Path,

    /// Show the effective configuration
    Show,

    /// Store a profile's token in the system keyring
    SetToken {
        /// Token value
        token: String,
    },
}
