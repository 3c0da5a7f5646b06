// SPDX-FileCopyrightText: 2026 Frontdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Frontdesk online queue.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Top-level Frontdesk configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct FrontdeskConfig {
    /// Clinic identity, logging, and local time.
    #[serde(default)]
    pub clinic: ClinicConfig,

    /// Admission window, numbering, and capacity rules.
    #[serde(default)]
    pub queue: QueueConfig,

    /// Auto-close sweep settings.
    #[serde(default)]
    pub scheduler: SchedulerConfig,

    /// Join token settings.
    #[serde(default)]
    pub tokens: TokenConfig,

    /// Push hub delivery settings.
    #[serde(default)]
    pub hub: HubConfig,

    /// HTTP/WebSocket gateway settings.
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Clinic identity and process-wide settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ClinicConfig {
    /// Display name of the clinic.
    #[serde(default = "default_clinic_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Offset of clinic local time from UTC, in minutes. Days, the start
    /// hour, and online cutoffs are all evaluated in this local time.
    #[serde(default)]
    pub utc_offset_minutes: i32,
}

impl Default for ClinicConfig {
    fn default() -> Self {
        Self {
            name: default_clinic_name(),
            log_level: default_log_level(),
            utc_offset_minutes: 0,
        }
    }
}

fn default_clinic_name() -> String {
    "frontdesk".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Admission and numbering configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct QueueConfig {
    /// Local hour (0-23) from which online joins are accepted.
    #[serde(default = "default_start_hour")]
    pub start_hour: u32,

    /// First ticket number of each day.
    #[serde(default = "default_start_number")]
    pub default_start_number: u32,

    /// Local `HH:MM` cutoff after which the scheduler closes online registration.
    #[serde(default = "default_online_end_time")]
    pub online_end_time: String,

    /// Capacity used when a resource's category has no explicit limit.
    #[serde(default = "default_max_per_day")]
    pub default_max_per_day: u32,

    /// Per-category daily capacity, e.g. `{ dentist = 20 }`.
    #[serde(default)]
    pub max_per_day: HashMap<String, u32>,

    /// Resource-to-category mapping, e.g. `{ "dr-lee" = "dentist" }`.
    #[serde(default)]
    pub resource_categories: HashMap<String, String>,

    /// Days of identity bindings to keep before the sweep purges them.
    #[serde(default = "default_binding_retention_days")]
    pub binding_retention_days: u32,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            start_hour: default_start_hour(),
            default_start_number: default_start_number(),
            online_end_time: default_online_end_time(),
            default_max_per_day: default_max_per_day(),
            max_per_day: HashMap::new(),
            resource_categories: HashMap::new(),
            binding_retention_days: default_binding_retention_days(),
        }
    }
}

fn default_start_hour() -> u32 {
    7
}

fn default_start_number() -> u32 {
    1
}

fn default_online_end_time() -> String {
    "12:00".to_string()
}

fn default_max_per_day() -> u32 {
    50
}

fn default_binding_retention_days() -> u32 {
    2
}

/// Auto-close scheduler configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SchedulerConfig {
    /// Run the periodic auto-close sweep.
    #[serde(default = "default_scheduler_enabled")]
    pub enabled: bool,

    /// Seconds between sweeps.
    #[serde(default = "default_scheduler_interval_secs")]
    pub interval_secs: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: default_scheduler_enabled(),
            interval_secs: default_scheduler_interval_secs(),
        }
    }
}

fn default_scheduler_enabled() -> bool {
    true
}

fn default_scheduler_interval_secs() -> u64 {
    60
}

/// Join token configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TokenConfig {
    /// HMAC signing secret. `None` generates an ephemeral secret at startup,
    /// which invalidates printed tokens on restart.
    #[serde(default)]
    pub secret: Option<String>,

    /// Hours a token stays valid past the end of its local day.
    #[serde(default = "default_token_grace_hours")]
    pub grace_hours: u32,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            secret: None,
            grace_hours: default_token_grace_hours(),
        }
    }
}

fn default_token_grace_hours() -> u32 {
    6
}

/// Push hub configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct HubConfig {
    /// Number of delivery workers draining the publish backlog.
    #[serde(default = "default_hub_workers")]
    pub workers: usize,

    /// Pending publish events per worker before updates are dropped.
    #[serde(default = "default_hub_backlog")]
    pub backlog: usize,

    /// Outbound messages buffered per connection.
    #[serde(default = "default_subscriber_buffer")]
    pub subscriber_buffer: usize,

    /// Milliseconds a single send may wait before the connection is dropped.
    #[serde(default = "default_send_timeout_ms")]
    pub send_timeout_ms: u64,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            workers: default_hub_workers(),
            backlog: default_hub_backlog(),
            subscriber_buffer: default_subscriber_buffer(),
            send_timeout_ms: default_send_timeout_ms(),
        }
    }
}

fn default_hub_workers() -> usize {
    2
}

fn default_hub_backlog() -> usize {
    1024
}

fn default_subscriber_buffer() -> usize {
    32
}

fn default_send_timeout_ms() -> u64 {
    500
}

/// HTTP/WebSocket gateway configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    /// Serve the HTTP/WebSocket API.
    #[serde(default = "default_gateway_enabled")]
    pub enabled: bool,

    /// Address to bind the server to.
    #[serde(default = "default_gateway_host")]
    pub host: String,

    /// Port to bind.
    #[serde(default = "default_gateway_port")]
    pub port: u16,

    /// Bearer token required on staff endpoints.
    #[serde(default)]
    pub bearer_token: Option<String>,

    /// Key required on push subscriptions (`/ws?key=...`). `None` disables the check.
    #[serde(default)]
    pub viewer_key: Option<String>,

    /// Origins allowed to open push subscriptions. Empty allows any origin.
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            enabled: default_gateway_enabled(),
            host: default_gateway_host(),
            port: default_gateway_port(),
            bearer_token: None,
            viewer_key: None,
            allowed_origins: Vec::new(),
        }
    }
}

fn default_gateway_enabled() -> bool {
    true
}

fn default_gateway_host() -> String {
    "127.0.0.1".to_string()
}

fn default_gateway_port() -> u16 {
    3030
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("frontdesk").join("frontdesk.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("frontdesk.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_wal_mode() -> bool {
    true
}
