//! Clap derive structures for the `unifw` CLI.
//!
//! Only depends on clap + clap_complete so `build.rs` can include it for
//! man page generation.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// unifw -- manage UniFi controller firewall rules and groups
#[derive(Debug, Parser)]
#[command(
    name = "unifw",
    version,
    about = "Manage UniFi firewall rules and groups from the command line",
    long_about = "Manage firewall rules and firewall groups on a UniFi Network controller.\n\n\
        Logs in with a username and password (session cookie + CSRF token),\n\
        works against UniFi OS consoles and classic Network Applications.",
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
    /// Controller profile to use
    #[arg(long, short = 'p', env = "UNIFW_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Controller URL (overrides profile)
    #[arg(long, short = 'c', env = "UNIFW_CONTROLLER", global = true)]
    pub controller: Option<String>,

    /// Site short name
    #[arg(long, short = 's', env = "UNIFW_SITE", global = true)]
    pub site: Option<String>,

    /// Controller platform (overrides profile)
    #[arg(long, env = "UNIFW_PLATFORM", global = true)]
    pub platform: Option<PlatformArg>,

    /// Login username (overrides profile)
    #[arg(long, short = 'u', env = "UNIFW_USERNAME", global = true)]
    pub username: Option<String>,

    /// Output format [default: from config, else table]
    #[arg(long, short = 'o', env = "UNIFW_OUTPUT", global = true)]
    pub output: Option<OutputFormat>,

    /// When to use color output [default: from config, else auto]
    #[arg(long, env = "UNIFW_COLOR", global = true)]
    pub color: Option<ColorMode>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Skip confirmation prompts
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,

    /// Accept self-signed TLS certificates
    #[arg(long, short = 'k', env = "UNIFW_INSECURE", global = true)]
    pub insecure: bool,

    /// Request timeout in seconds (0 disables)
    #[arg(
        long,
        env = "UNIFW_TIMEOUT",
        global = true,
        allow_negative_numbers = true
    )]
    pub timeout: Option<i64>,
}

// ── Value Enums ──────────────────────────────────────────────────────

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
    /// Plain text, one id per line (scripting)
    Plain,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PlatformArg {
    /// Probe the controller
    Auto,
    /// UniFi OS console (UDM, UCG, Cloud Key Gen2+)
    #[value(alias = "udm")]
    UnifiOs,
    /// Self-hosted Network Application
    #[value(alias = "standalone")]
    Classic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RulesetArg {
    WanIn,
    WanOut,
    WanLocal,
    LanIn,
    LanOut,
    LanLocal,
    GuestIn,
    GuestOut,
    GuestLocal,
    Wanv6In,
    Wanv6Out,
    Wanv6Local,
    Lanv6In,
    Lanv6Out,
    Lanv6Local,
    Guestv6In,
    Guestv6Out,
    Guestv6Local,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ActionArg {
    Accept,
    Reject,
    Drop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum GroupTypeArg {
    /// IPv4 addresses and subnets
    AddressGroup,
    /// IPv6 addresses and subnets
    Ipv6AddressGroup,
    /// Ports and port ranges
    PortGroup,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Manage firewall rules
    #[command(alias = "rule", alias = "r")]
    Rules(RulesArgs),

    /// Manage firewall groups
    #[command(alias = "group", alias = "g")]
    Groups(GroupsArgs),

    /// Inspect the controller session
    Session(SessionArgs),

    /// Manage CLI configuration and profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  RULES
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct RulesArgs {
    #[command(subcommand)]
    pub command: RulesCommand,
}

#[derive(Debug, Subcommand)]
pub enum RulesCommand {
    /// List firewall rules
    #[command(alias = "ls")]
    List {
        /// Only rules in this ruleset
        #[arg(long)]
        ruleset: Option<RulesetArg>,
    },

    /// Show one firewall rule
    Get {
        /// Rule ID
        id: String,
    },

    /// Create a firewall rule
    Create {
        /// Read the full rule from a JSON file
        #[arg(long, short = 'F', conflicts_with_all = ["name", "ruleset", "action"])]
        from_file: Option<PathBuf>,

        /// Rule name
        #[arg(long, required_unless_present = "from_file")]
        name: Option<String>,

        /// Ruleset the rule belongs to
        #[arg(long, required_unless_present = "from_file")]
        ruleset: Option<RulesetArg>,

        /// Action on match
        #[arg(long, required_unless_present = "from_file")]
        action: Option<ActionArg>,

        /// Rule index (lower matches first)
        #[arg(long)]
        index: Option<i64>,

        /// Protocol (all, tcp, udp, tcp_udp, icmp, or a number)
        #[arg(long, default_value = "all")]
        protocol: String,

        /// Source address or subnet
        #[arg(long)]
        src_address: Option<String>,

        /// Source firewall group IDs
        #[arg(long, value_delimiter = ',')]
        src_group: Vec<String>,

        /// Destination address or subnet
        #[arg(long)]
        dst_address: Option<String>,

        /// Destination port(s), e.g. 443 or 8000-9000
        #[arg(long)]
        dst_port: Option<String>,

        /// Destination firewall group IDs
        #[arg(long, value_delimiter = ',')]
        dst_group: Vec<String>,

        /// Log matching packets
        #[arg(long)]
        logging: bool,

        /// Create the rule disabled
        #[arg(long)]
        disabled: bool,
    },

    /// Replace a firewall rule from a JSON file
    Update {
        /// Rule ID
        id: String,

        /// JSON file with the rule fields to send
        #[arg(long, short = 'F')]
        from_file: PathBuf,
    },

    /// Enable a firewall rule
    Enable {
        /// Rule ID
        id: String,
    },

    /// Disable a firewall rule
    Disable {
        /// Rule ID
        id: String,
    },

    /// Delete a firewall rule
    #[command(alias = "rm")]
    Delete {
        /// Rule ID
        id: String,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  GROUPS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct GroupsArgs {
    #[command(subcommand)]
    pub command: GroupsCommand,
}

#[derive(Debug, Subcommand)]
pub enum GroupsCommand {
    /// List firewall groups
    #[command(alias = "ls")]
    List,

    /// Show one firewall group
    Get {
        /// Group ID
        id: String,
    },

    /// Create a firewall group
    Create {
        /// Group name
        #[arg(long)]
        name: String,

        /// Group type
        #[arg(long = "type", short = 't')]
        group_type: GroupTypeArg,

        /// Members (addresses, subnets, or ports), comma-separated
        #[arg(long, short = 'm', value_delimiter = ',', required = true)]
        members: Vec<String>,
    },

    /// Update a firewall group's name or members
    Update {
        /// Group ID
        id: String,

        /// New name
        #[arg(long)]
        name: Option<String>,

        /// Replace the member list, comma-separated
        #[arg(long, short = 'm', value_delimiter = ',')]
        members: Option<Vec<String>>,

        /// Add members, comma-separated
        #[arg(long, value_delimiter = ',', conflicts_with = "members")]
        add: Vec<String>,

        /// Remove members, comma-separated
        #[arg(long, value_delimiter = ',', conflicts_with = "members")]
        remove: Vec<String>,
    },

    /// Delete a firewall group
    #[command(alias = "rm")]
    Delete {
        /// Group ID
        id: String,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  SESSION
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct SessionArgs {
    #[command(subcommand)]
    pub command: SessionCommand,
}

#[derive(Debug, Subcommand)]
pub enum SessionCommand {
    /// Log in, report the session, and log out again
    Check,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  CONFIG
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Create initial config file with guided setup
    Init,

    /// Display current resolved configuration
    Show,

    /// Print the config file path
    Path,

    /// Store the active profile's password in the system keyring
    SetPassword,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  COMPLETIONS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
