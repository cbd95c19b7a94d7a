use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use reshare_core::allocation::MAX_WINDOW_SECS;
use reshare_core::AllocationConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Command line arguments
#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Resource-share tracker: quota-aware wake intervals for autonomous agents"
)]
pub struct Config {
    /// Enable debug mode
    #[arg(short, long, global = true)]
    pub debug: bool,

    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Path to the SQLite database
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Web server port
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Enable decision audit log
    #[arg(long, global = true)]
    pub audit: bool,

    /// Subcommand (defaults to `serve`)
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Subcommands
#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Run the HTTP server
    Serve,
    /// Print the recommended interval for an agent
    Recommend {
        /// Agent name
        name: String,
        /// The agent's current interval in seconds
        #[arg(long)]
        current_interval: Option<u32>,
    },
    /// Rebuild daily totals from the increment log
    Aggregate {
        /// Day to roll up (YYYY-MM-DD, UTC); defaults to yesterday
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Manage registered agents
    Identity {
        #[command(subcommand)]
        action: IdentityCommand,
    },
    /// Record or inspect quota readings
    Quota {
        #[command(subcommand)]
        action: QuotaCommand,
    },
}

/// `identity` subcommands
#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum IdentityCommand {
    /// Register an agent or update its settings
    Set {
        /// Agent name
        name: String,
        /// Model name (informational)
        #[arg(long)]
        model: Option<String>,
        /// Relative cost of the agent's model
        #[arg(long, default_value_t = reshare_core::identity::DEFAULT_COST_MULTIPLIER)]
        cost_multiplier: f64,
        /// Percent of activity reserved for collaboration (0-100)
        #[arg(long, default_value_t = 0, value_parser = clap::value_parser!(u8).range(0..=100))]
        collab_pref: u8,
        /// Keep the agent registered but leave it out of fairness comparisons
        #[arg(long)]
        inactive: bool,
    },
    /// List registered agents
    List,
}

/// `quota` subcommands
#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum QuotaCommand {
    /// Store a quota reading taken now
    Record {
        /// Session (5h) percent used
        #[arg(long, value_parser = clap::value_parser!(u8).range(0..=100))]
        session: u8,
        /// Weekly percent used, all models
        #[arg(long, value_parser = clap::value_parser!(u8).range(0..=100))]
        week: u8,
        /// Weekly percent used, Sonnet only
        #[arg(long, value_parser = clap::value_parser!(u8).range(0..=100))]
        week_sonnet: Option<u8>,
        /// Session reset time (RFC 3339)
        #[arg(long)]
        session_reset: Option<String>,
        /// Weekly reset time (RFC 3339)
        #[arg(long)]
        week_reset: Option<String>,
    },
    /// Print the most recent reading
    Latest,
}

impl Config {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// The subcommand to run, `serve` when none was given
    pub fn command(&self) -> Command {
        self.command.clone().unwrap_or(Command::Serve)
    }
}

/// Application settings (from config file)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// SQLite database location
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,

    /// Trailing window for fairness comparisons, in hours
    #[serde(default = "default_usage_window_hours")]
    pub usage_window_hours: u32,

    /// Allocation engine tuning
    #[serde(default)]
    pub allocation: AllocationSettings,

    /// Web server settings
    #[serde(default)]
    pub web: WebSettings,

    /// Audit log settings
    #[serde(default)]
    pub audit: AuditSettings,
}

fn default_database_path() -> PathBuf {
    dirs::data_dir()
        .map(|p| p.join("reshare").join("resource_tracking.db"))
        .unwrap_or_else(|| PathBuf::from("resource_tracking.db"))
}

/// Longest fairness look-back accepted, one leap year
const MAX_USAGE_WINDOW_HOURS: u32 = 366 * 24;

fn default_usage_window_hours() -> u32 {
    reshare_core::allocation::DEFAULT_USAGE_WINDOW_HOURS
}

/// Allocation engine tuning, in human units
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllocationSettings {
    /// Shortest interval ever recommended (seconds)
    #[serde(default = "default_min_interval")]
    pub min_interval_secs: u32,

    /// Longest interval ever recommended (seconds)
    #[serde(default = "default_max_interval")]
    pub max_interval_secs: u32,

    /// Interval assumed when an agent does not report one (seconds)
    #[serde(default = "default_interval")]
    pub default_interval_secs: u32,

    /// Session window length in hours
    #[serde(default = "default_session_window_hours")]
    pub session_window_hours: u32,

    /// Weekly window length in days
    #[serde(default = "default_week_window_days")]
    pub week_window_days: u32,

    /// Lowest fairness multiplier
    #[serde(default = "default_fairness_floor")]
    pub fairness_floor: f64,

    /// Highest fairness multiplier
    #[serde(default = "default_fairness_ceiling")]
    pub fairness_ceiling: f64,

    /// Multiplier for an idle agent while others are active
    #[serde(default = "default_idle_encouragement")]
    pub idle_encouragement: f64,
}

fn default_min_interval() -> u32 {
    900
}

fn default_max_interval() -> u32 {
    7200
}

fn default_interval() -> u32 {
    1800
}

fn default_session_window_hours() -> u32 {
    5
}

fn default_week_window_days() -> u32 {
    7
}

fn default_fairness_floor() -> f64 {
    0.5
}

fn default_fairness_ceiling() -> f64 {
    2.0
}

fn default_idle_encouragement() -> f64 {
    0.5
}

impl Default for AllocationSettings {
    fn default() -> Self {
        Self {
            min_interval_secs: default_min_interval(),
            max_interval_secs: default_max_interval(),
            default_interval_secs: default_interval(),
            session_window_hours: default_session_window_hours(),
            week_window_days: default_week_window_days(),
            fairness_floor: default_fairness_floor(),
            fairness_ceiling: default_fairness_ceiling(),
            idle_encouragement: default_idle_encouragement(),
        }
    }
}

impl AllocationSettings {
    /// Build the engine configuration
    pub fn to_config(&self) -> AllocationConfig {
        AllocationConfig {
            min_interval_secs: self.min_interval_secs,
            max_interval_secs: self.max_interval_secs,
            default_interval_secs: self.default_interval_secs,
            session_window_secs: i64::from(self.session_window_hours) * 3600,
            week_window_secs: i64::from(self.week_window_days) * 86_400,
            fairness_floor: self.fairness_floor,
            fairness_ceiling: self.fairness_ceiling,
            idle_encouragement: self.idle_encouragement,
        }
    }
}

/// Web server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebSettings {
    /// Bind address
    #[serde(default = "default_web_host")]
    pub host: String,

    /// Web server port
    #[serde(default = "default_web_port")]
    pub port: u16,
}

fn default_web_host() -> String {
    "0.0.0.0".to_string()
}

fn default_web_port() -> u16 {
    8765
}

impl Default for WebSettings {
    fn default() -> Self {
        Self {
            host: default_web_host(),
            port: default_web_port(),
        }
    }
}

/// Audit log settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditSettings {
    /// Enable audit logging
    #[serde(default = "default_audit_enabled")]
    pub enabled: bool,

    /// Maximum log file size in bytes before rotation
    #[serde(default = "default_audit_max_size")]
    pub max_size_bytes: u64,

    /// Log file location
    #[serde(default = "default_audit_path")]
    pub path: PathBuf,
}

/// Default for audit enabled
fn default_audit_enabled() -> bool {
    false
}

/// Default audit max size (10MB)
fn default_audit_max_size() -> u64 {
    10_485_760
}

fn default_audit_path() -> PathBuf {
    dirs::state_dir()
        .or_else(dirs::data_local_dir)
        .map(|p| p.join("reshare").join("audit").join("decisions.ndjson"))
        .unwrap_or_else(|| std::env::temp_dir().join("reshare").join("decisions.ndjson"))
}

impl Default for AuditSettings {
    fn default() -> Self {
        Self {
            enabled: default_audit_enabled(),
            max_size_bytes: default_audit_max_size(),
            path: default_audit_path(),
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            usage_window_hours: default_usage_window_hours(),
            allocation: AllocationSettings::default(),
            web: WebSettings::default(),
            audit: AuditSettings::default(),
        }
    }
}

impl Settings {
    /// Load settings from config file or use defaults
    pub fn load(path: Option<&PathBuf>) -> Result<Self> {
        // Try custom path first
        if let Some(p) = path {
            if p.exists() {
                return Self::read(p);
            }
        }

        // Try default config locations
        let default_paths = [
            dirs::config_dir().map(|p| p.join("reshare/config.toml")),
            dirs::home_dir().map(|p| p.join(".config/reshare/config.toml")),
            dirs::home_dir().map(|p| p.join(".reshare.toml")),
        ];

        for path in default_paths.iter().flatten() {
            if path.exists() {
                return Self::read(path);
            }
        }

        // Return defaults if no config file found
        Ok(Self::default())
    }

    fn read(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }

    /// Merge CLI config into settings (CLI takes precedence)
    pub fn merge_cli(&mut self, cli: &Config) {
        if let Some(db) = &cli.db {
            self.database_path = db.clone();
        }
        if let Some(port) = cli.port {
            self.web.port = port;
        }
        if cli.audit {
            self.audit.enabled = true;
        }
    }

    /// Validate and normalize settings values.
    ///
    /// Out-of-range values are repaired rather than rejected so a bad config
    /// file never keeps agents from getting an interval.
    pub fn validate(&mut self) {
        let alloc = &mut self.allocation;
        let defaults = AllocationSettings::default();

        if self.usage_window_hours == 0 {
            tracing::warn!("usage_window_hours must be at least 1, using 1");
            self.usage_window_hours = 1;
        }
        if self.usage_window_hours > MAX_USAGE_WINDOW_HOURS {
            tracing::warn!(
                "usage_window_hours ({}) exceeds {}, capping",
                self.usage_window_hours,
                MAX_USAGE_WINDOW_HOURS
            );
            self.usage_window_hours = MAX_USAGE_WINDOW_HOURS;
        }
        if alloc.min_interval_secs == 0 {
            tracing::warn!("min_interval_secs must be positive, using {}", defaults.min_interval_secs);
            alloc.min_interval_secs = defaults.min_interval_secs;
        }
        if alloc.min_interval_secs > alloc.max_interval_secs {
            tracing::warn!(
                "min_interval_secs ({}) exceeds max_interval_secs ({}), swapping",
                alloc.min_interval_secs,
                alloc.max_interval_secs
            );
            std::mem::swap(&mut alloc.min_interval_secs, &mut alloc.max_interval_secs);
        }
        alloc.default_interval_secs = alloc
            .default_interval_secs
            .clamp(alloc.min_interval_secs, alloc.max_interval_secs);
        if alloc.session_window_hours == 0 {
            alloc.session_window_hours = defaults.session_window_hours;
        }
        if i64::from(alloc.session_window_hours) * 3600 > MAX_WINDOW_SECS {
            tracing::warn!(
                "session_window_hours ({}) is too long, using {}",
                alloc.session_window_hours,
                defaults.session_window_hours
            );
            alloc.session_window_hours = defaults.session_window_hours;
        }
        if alloc.week_window_days == 0 {
            alloc.week_window_days = defaults.week_window_days;
        }
        if i64::from(alloc.week_window_days) * 86_400 > MAX_WINDOW_SECS {
            tracing::warn!(
                "week_window_days ({}) is too long, using {}",
                alloc.week_window_days,
                defaults.week_window_days
            );
            alloc.week_window_days = defaults.week_window_days;
        }
        if !(alloc.fairness_floor.is_finite() && alloc.fairness_floor > 0.0) {
            alloc.fairness_floor = defaults.fairness_floor;
        }
        if !(alloc.fairness_ceiling.is_finite() && alloc.fairness_ceiling > 0.0) {
            alloc.fairness_ceiling = defaults.fairness_ceiling;
        }
        if alloc.fairness_floor > alloc.fairness_ceiling {
            std::mem::swap(&mut alloc.fairness_floor, &mut alloc.fairness_ceiling);
        }
        if !(alloc.idle_encouragement.is_finite() && alloc.idle_encouragement > 0.0) {
            alloc.idle_encouragement = defaults.idle_encouragement;
        }
    }
}
