// SPDX-FileCopyrightText: 2026 Frontdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `frontdesk token`: print a join token for a QR poster.

use chrono::NaiveDate;

use frontdesk_config::FrontdeskConfig;
use frontdesk_core::types::Scope;
use frontdesk_core::FrontdeskError;
use frontdesk_queue::{IssuedToken, QueueSettings, TokenService};

/// Sign a join token for `resource_id` on `day` (today in clinic time when absent).
///
/// Requires `tokens.secret`: a token signed with a throwaway secret would be
/// rejected by the running server.
pub fn issue_token(
    config: &FrontdeskConfig,
    resource_id: &str,
    day: Option<NaiveDate>,
    now: chrono::DateTime<chrono::Utc>,
) -> Result<IssuedToken, FrontdeskError> {
    if config.tokens.secret.is_none() {
        return Err(FrontdeskError::Config(
            "tokens.secret must be set to print join tokens".to_string(),
        ));
    }
    let settings = QueueSettings::from_config(config)?;
    let tokens = TokenService::from_config(&config.tokens, settings.calendar);
    let day = day.unwrap_or_else(|| settings.calendar.today(now));
    let scope = Scope::new(resource_id, day)?;
    tokens.generate(&scope, now)
}

pub fn print_token(
    config: &FrontdeskConfig,
    resource_id: &str,
    day: Option<NaiveDate>,
) -> Result<(), FrontdeskError> {
    let issued = issue_token(config, resource_id, day, chrono::Utc::now())?;
    let json = serde_json::to_string_pretty(&issued)
        .map_err(|e| FrontdeskError::Internal(format!("failed to encode token: {e}")))?;
    println!("{json}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn config(toml: &str) -> FrontdeskConfig {
        frontdesk_config::load_and_validate_str(toml).unwrap()
    }

    #[test]
    fn token_requires_configured_secret() {
        let now = chrono::Utc.with_ymd_and_hms(2026, 3, 14, 9, 0, 0).unwrap();
        let err = issue_token(&config(""), "dr-lee", None, now).unwrap_err();
        assert!(matches!(err, FrontdeskError::Config(_)));
    }

    #[test]
    fn token_defaults_to_clinic_today() {
        let config = config(
            "[clinic]\nutc_offset_minutes = 180\n[tokens]\nsecret = \"poster-secret-0123456789\"\n",
        );
        // 22:30 UTC is already the next day at UTC+3.
        let now = chrono::Utc.with_ymd_and_hms(2026, 3, 14, 22, 30, 0).unwrap();
        let issued = issue_token(&config, "dr-lee", None, now).unwrap();
        assert_eq!(issued.resource_id, "dr-lee");
        assert_eq!(issued.day, "2026-03-15");
        assert!(!issued.token.is_empty());
    }

    #[test]
    fn token_honours_explicit_day() {
        let config = config("[tokens]\nsecret = \"poster-secret-0123456789\"\n");
        let now = chrono::Utc.with_ymd_and_hms(2026, 3, 14, 9, 0, 0).unwrap();
        let day = NaiveDate::from_ymd_opt(2026, 3, 20);
        let issued = issue_token(&config, "dr-lee", day, now).unwrap();
        assert_eq!(issued.day, "2026-03-20");
    }

    #[test]
    fn token_rejects_blank_resource() {
        let config = config("[tokens]\nsecret = \"poster-secret-0123456789\"\n");
        let now = chrono::Utc.with_ymd_and_hms(2026, 3, 14, 9, 0, 0).unwrap();
        assert!(issue_token(&config, "  ", None, now).is_err());
    }
}
