// SPDX-FileCopyrightText: 2026 Frontdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./frontdesk.toml` > `~/.config/frontdesk/frontdesk.toml`
//! > `/etc/frontdesk/frontdesk.toml` with environment variable overrides via the
//! `FRONTDESK_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::FrontdeskConfig;

/// Config sections that environment variables may target.
const ENV_SECTIONS: &[&str] = &[
    "clinic",
    "queue",
    "scheduler",
    "tokens",
    "hub",
    "gateway",
    "storage",
];

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/frontdesk/frontdesk.toml` (system-wide)
/// 3. `~/.config/frontdesk/frontdesk.toml` (user XDG config)
/// 4. `./frontdesk.toml` (local directory)
/// 5. `FRONTDESK_*` environment variables
pub fn load_config() -> Result<FrontdeskConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
///
/// Used for testing and explicit configuration.
pub fn load_config_from_str(toml_content: &str) -> Result<FrontdeskConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(FrontdeskConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<FrontdeskConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(FrontdeskConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used internally for config loading.
///
/// Returns the Figment before extraction so callers can inspect metadata.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(FrontdeskConfig::default()))
        .merge(Toml::file("/etc/frontdesk/frontdesk.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("frontdesk/frontdesk.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("frontdesk.toml"))
        .merge(env_provider())
}

/// Create the environment variable provider.
///
/// Uses `Env::map()` NOT `Env::split("_")`: keys such as
/// `FRONTDESK_QUEUE_START_HOUR` must map to `queue.start_hour`, not
/// `queue.start.hour`.
pub(crate) fn env_provider() -> Env {
    Env::prefixed("FRONTDESK_").map(|key| map_env_key(key.as_str()).into())
}

/// Map a lowercased, prefix-stripped env var name to a dotted config path.
pub(crate) fn map_env_key(key: &str) -> String {
    for section in ENV_SECTIONS {
        if let Some(rest) = key
            .strip_prefix(section)
            .and_then(|rest| rest.strip_prefix('_'))
        {
            return format!("{section}.{rest}");
        }
    }
    key.to_string()
}
