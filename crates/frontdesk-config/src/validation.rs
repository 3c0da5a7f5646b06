// SPDX-FileCopyrightText: 2026 Frontdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde attributes,
//! such as valid IP addresses, clock times, and non-zero capacities.

use chrono::NaiveTime;

use crate::diagnostic::ConfigError;
use crate::model::FrontdeskConfig;

/// Largest UTC offset in use anywhere (UTC+14:00), in minutes.
const MAX_UTC_OFFSET_MINUTES: i32 = 14 * 60;

/// Parse an `HH:MM` local clock time.
pub fn parse_clock_time(value: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(value.trim(), "%H:%M").ok()
}

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &FrontdeskConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();
    let mut fail = |message: String| errors.push(ConfigError::Validation { message });

    if config.clinic.utc_offset_minutes.abs() > MAX_UTC_OFFSET_MINUTES {
        fail(format!(
            "clinic.utc_offset_minutes must be within ±{MAX_UTC_OFFSET_MINUTES}, got {}",
            config.clinic.utc_offset_minutes
        ));
    }

    let queue = &config.queue;
    if queue.start_hour > 23 {
        fail(format!(
            "queue.start_hour must be between 0 and 23, got {}",
            queue.start_hour
        ));
    }

    if queue.default_start_number == 0 {
        fail("queue.default_start_number must be at least 1".to_string());
    }

    if parse_clock_time(&queue.online_end_time).is_none() {
        fail(format!(
            "queue.online_end_time `{}` is not a valid HH:MM time",
            queue.online_end_time
        ));
    }

    if queue.default_max_per_day == 0 {
        fail("queue.default_max_per_day must be at least 1".to_string());
    }

    let mut categories: Vec<_> = queue.max_per_day.iter().collect();
    categories.sort();
    for (category, limit) in categories {
        if *limit == 0 {
            fail(format!("queue.max_per_day.{category} must be at least 1"));
        }
    }

    let mut resources: Vec<_> = queue.resource_categories.iter().collect();
    resources.sort();
    for (resource, category) in resources {
        if resource.contains("::") || resource.trim().is_empty() {
            fail(format!(
                "queue.resource_categories key `{resource}` is not a valid resource id"
            ));
        }
        if !queue.max_per_day.contains_key(category) {
            tracing::debug!(
                resource = resource.as_str(),
                category = category.as_str(),
                "category has no explicit max_per_day, default applies"
            );
        }
    }

    if config.scheduler.interval_secs == 0 {
        fail("scheduler.interval_secs must be at least 1".to_string());
    }

    if config.hub.workers == 0 {
        fail("hub.workers must be at least 1".to_string());
    }
    if config.hub.backlog == 0 {
        fail("hub.backlog must be at least 1".to_string());
    }
    if config.hub.subscriber_buffer == 0 {
        fail("hub.subscriber_buffer must be at least 1".to_string());
    }

    if let Some(secret) = &config.tokens.secret
        && secret.len() < 16
    {
        fail("tokens.secret must be at least 16 characters".to_string());
    }

    // Validate host looks like a valid IP or hostname
    let host = config.gateway.host.trim();
    if host.is_empty() {
        fail("gateway.host must not be empty".to_string());
    } else {
        let is_valid_ip = host.parse::<std::net::IpAddr>().is_ok();
        let is_valid_hostname = host
            .chars()
            .all(|c| c.is_alphanumeric() || c == '.' || c == '-' || c == ':');
        if !is_valid_ip && !is_valid_hostname {
            fail(format!(
                "gateway.host `{host}` is not a valid IP address or hostname"
            ));
        }
    }

    if config.gateway.enabled && config.gateway.bearer_token.is_none() {
        fail(
            "gateway.bearer_token is required when the gateway is enabled \
             (staff endpoints are fail-closed)"
                .to_string(),
        );
    }

    if config.storage.database_path.trim().is_empty() {
        fail("storage.database_path must not be empty".to_string());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> FrontdeskConfig {
        let mut config = FrontdeskConfig::default();
        config.gateway.bearer_token = Some("staff-token".to_string());
        config
    }

    fn has_error(errors: &[ConfigError], needle: &str) -> bool {
        errors
            .iter()
            .any(|e| matches!(e, ConfigError::Validation { message } if message.contains(needle)))
    }

    #[test]
    fn default_config_with_token_validates() {
        assert!(validate_config(&valid_config()).is_ok());
    }

    #[test]
    fn gateway_without_token_fails_closed() {
        let errors = validate_config(&FrontdeskConfig::default()).unwrap_err();
        assert!(has_error(&errors, "gateway.bearer_token"));

        let mut config = FrontdeskConfig::default();
        config.gateway.enabled = false;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn bad_online_end_time_fails_validation() {
        let mut config = valid_config();
        config.queue.online_end_time = "25:99".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(has_error(&errors, "online_end_time"));
    }

    #[test]
    fn start_hour_out_of_range_fails_validation() {
        let mut config = valid_config();
        config.queue.start_hour = 24;
        let errors = validate_config(&config).unwrap_err();
        assert!(has_error(&errors, "start_hour"));
    }

    #[test]
    fn zero_capacity_fails_validation() {
        let mut config = valid_config();
        config.queue.max_per_day.insert("dentist".to_string(), 0);
        config.queue.default_start_number = 0;
        let errors = validate_config(&config).unwrap_err();
        assert!(has_error(&errors, "max_per_day.dentist"));
        assert!(has_error(&errors, "default_start_number"));
    }

    #[test]
    fn collects_all_errors() {
        let mut config = valid_config();
        config.scheduler.interval_secs = 0;
        config.hub.workers = 0;
        config.storage.database_path = " ".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 3);
    }

    #[test]
    fn short_secret_fails_validation() {
        let mut config = valid_config();
        config.tokens.secret = Some("short".to_string());
        let errors = validate_config(&config).unwrap_err();
        assert!(has_error(&errors, "tokens.secret"));
    }

    #[test]
    fn clock_time_parses() {
        assert_eq!(
            parse_clock_time("09:30"),
            NaiveTime::from_hms_opt(9, 30, 0)
        );
        assert!(parse_clock_time("9.30").is_none());
    }
}
