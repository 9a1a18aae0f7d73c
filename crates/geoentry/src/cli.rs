//! Clap derive structures for the `geoentry` CLI.
//!
//! Defines the complete command tree, global flags, and shared types.

use clap::{Args, Parser, Subcommand, ValueEnum};
use geoentry_core::{ProximityEventType, ResourceId};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// geoentry -- manage devices, locations and proximity events
#[derive(Debug, Parser)]
#[command(
    name = "geoentry",
    version,
    about = "Manage GeoEntry geofencing from the command line",
    long_about = "A CLI for the GeoEntry dashboard API.\n\n\
        Sign in once with `geoentry login`; the session is kept between runs\n\
        until `geoentry logout`.",
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
    /// Configuration profile to use
    #[arg(long, short = 'p', env = "GEOENTRY_PROFILE", global = true)]
    pub profile: Option<String>,

    /// API base URL (overrides profile)
    #[arg(long, short = 'u', env = "GEOENTRY_API_URL", global = true)]
    pub api_url: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "GEOENTRY_OUTPUT",
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
    #[arg(long, short = 'k', env = "GEOENTRY_INSECURE", global = true)]
    pub insecure: bool,

    /// Request timeout in seconds (overrides profile)
    #[arg(long, env = "GEOENTRY_TIMEOUT", global = true)]
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
    /// YAML
    Yaml,
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
    /// Sign in and keep the session for later commands
    Login(LoginArgs),

    /// Sign out and forget the stored session
    Logout,

    /// Show the signed-in user and a dashboard summary
    Status,

    /// Manage tracked devices
    #[command(alias = "dev", alias = "d")]
    Devices(DevicesArgs),

    /// Manage geofenced locations
    #[command(alias = "loc", alias = "l")]
    Locations(LocationsArgs),

    /// Manage proximity events
    #[command(alias = "ev", alias = "e")]
    Events(EventsArgs),

    /// Show server-side dashboard statistics
    Stats,

    /// Check API health (no sign-in required)
    Health,

    /// Manage CLI configuration and profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  AUTH
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct LoginArgs {
    /// Account email (defaults to the profile's email)
    #[arg(long, short = 'e', env = "GEOENTRY_EMAIL")]
    pub email: Option<String>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  DEVICES
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct DevicesArgs {
    #[command(subcommand)]
    pub command: DevicesCommand,
}

#[derive(Debug, Subcommand)]
pub enum DevicesCommand {
    /// List your devices
    #[command(alias = "ls")]
    List {
        /// Only devices assigned to this location
        #[arg(long)]
        location: Option<ResourceId>,
    },

    /// Get device details
    Get {
        /// Device ID
        id: ResourceId,
    },

    /// Register a device
    Create {
        #[arg(long)]
        name: String,

        /// Device type (e.g. "tracker", "phone")
        #[arg(long = "type", default_value = "tracker")]
        device_type: String,

        /// Assign to a location
        #[arg(long)]
        location: Option<ResourceId>,

        /// Register as inactive
        #[arg(long)]
        inactive: bool,
    },

    /// Update a device
    Update {
        /// Device ID
        id: ResourceId,

        #[arg(long)]
        name: Option<String>,

        #[arg(long = "type")]
        device_type: Option<String>,

        /// Assign to a location
        #[arg(long)]
        location: Option<ResourceId>,

        /// Activate or deactivate
        #[arg(long)]
        active: Option<bool>,
    },

    /// Delete a device
    #[command(alias = "rm")]
    Delete {
        /// Device ID
        id: ResourceId,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  LOCATIONS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct LocationsArgs {
    #[command(subcommand)]
    pub command: LocationsCommand,
}

#[derive(Debug, Subcommand)]
pub enum LocationsCommand {
    /// List your locations
    #[command(alias = "ls")]
    List,

    /// Get location details
    Get {
        /// Location ID
        id: ResourceId,
    },

    /// Create a geofenced location
    Create {
        #[arg(long)]
        name: String,

        #[arg(long)]
        address: Option<String>,

        #[arg(long, allow_negative_numbers = true)]
        latitude: f64,

        #[arg(long, allow_negative_numbers = true)]
        longitude: f64,

        /// Geofence radius in meters
        #[arg(long, default_value = "100")]
        radius: f64,

        /// Make this the default location
        #[arg(long)]
        default: bool,
    },

    /// Update a location
    Update {
        /// Location ID
        id: ResourceId,

        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        address: Option<String>,

        #[arg(long, allow_negative_numbers = true)]
        latitude: Option<f64>,

        #[arg(long, allow_negative_numbers = true)]
        longitude: Option<f64>,

        /// Geofence radius in meters
        #[arg(long)]
        radius: Option<f64>,

        /// Make this the default location
        #[arg(long)]
        default: Option<bool>,
    },

    /// Delete a location (devices there become unassigned)
    #[command(alias = "rm")]
    Delete {
        /// Location ID
        id: ResourceId,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  EVENTS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct EventsArgs {
    #[command(subcommand)]
    pub command: EventsCommand,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum EventKind {
    Enter,
    Exit,
    Dwell,
}

impl From<EventKind> for ProximityEventType {
    fn from(kind: EventKind) -> Self {
        match kind {
            EventKind::Enter => Self::Enter,
            EventKind::Exit => Self::Exit,
            EventKind::Dwell => Self::Dwell,
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum EventsCommand {
    /// List proximity events
    #[command(alias = "ls")]
    List {
        /// Only events of this device
        #[arg(long, conflicts_with = "location")]
        device: Option<ResourceId>,

        /// Only events at this location
        #[arg(long)]
        location: Option<ResourceId>,

        /// Max events to return
        #[arg(long, short = 'l')]
        limit: Option<u32>,
    },

    /// Get event details
    Get {
        /// Event ID
        id: ResourceId,
    },

    /// Record a proximity event
    Create {
        #[arg(long)]
        device: ResourceId,

        #[arg(long)]
        location: Option<ResourceId>,

        #[arg(long = "type", value_enum)]
        event_type: EventKind,

        /// Distance from the geofence center in meters
        #[arg(long)]
        distance: Option<f64>,
    },

    /// Update a proximity event
    Update {
        /// Event ID
        id: ResourceId,

        #[arg(long)]
        location: Option<ResourceId>,

        #[arg(long = "type", value_enum)]
        event_type: Option<EventKind>,

        #[arg(long)]
        distance: Option<f64>,
    },

    /// Delete a proximity event
    #[command(alias = "rm")]
    Delete {
        /// Event ID
        id: ResourceId,
    },
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

    /// Display current configuration
    Show,

    /// List configured profiles
    Profiles,

    /// Set the default profile
    Use {
        /// Profile name to set as default
        name: String,
    },

    /// Store a password in the system keyring
    SetPassword {
        /// Profile name
        #[arg(long)]
        profile: Option<String>,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  COMPLETIONS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
