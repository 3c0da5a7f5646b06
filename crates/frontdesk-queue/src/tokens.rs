// SPDX-FileCopyrightText: 2026 Frontdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Signed, scope-bound join tokens.
//!
//! A token is `<payload>.<signature>` where the payload is the URL-safe
//! base64 of `resource_id|day|expires_unix|nonce` and the signature is the
//! hex HMAC-SHA256 of the encoded payload.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use rand::RngCore;
use serde::Serialize;
use sha2::Sha256;
use tracing::warn;

use frontdesk_config::model::TokenConfig;
use frontdesk_core::types::Scope;
use frontdesk_core::FrontdeskError;

use crate::calendar::ClinicCalendar;

type HmacSha256 = Hmac<Sha256>;

const NONCE_BYTES: usize = 8;
const EPHEMERAL_SECRET_BYTES: usize = 32;

/// A freshly generated token and what it grants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IssuedToken {
    pub token: String,
    pub resource_id: String,
    pub day: String,
    pub expires_at: DateTime<Utc>,
}

/// Issues and validates join tokens.
pub struct TokenService {
    secret: Vec<u8>,
    calendar: ClinicCalendar,
    grace: Duration,
}

impl TokenService {
    pub fn new(secret: impl Into<Vec<u8>>, calendar: ClinicCalendar, grace_hours: u32) -> Self {
        Self {
            secret: secret.into(),
            calendar,
            grace: Duration::hours(i64::from(grace_hours)),
        }
    }

    /// Build from config, generating a process-local secret when none is set.
    pub fn from_config(config: &TokenConfig, calendar: ClinicCalendar) -> Self {
        let secret = match &config.secret {
            Some(secret) => secret.as_bytes().to_vec(),
            None => {
                warn!("tokens.secret is not set; join tokens will not survive a restart");
                let mut secret = vec![0u8; EPHEMERAL_SECRET_BYTES];
                rand::thread_rng().fill_bytes(&mut secret);
                secret
            }
        };
        Self::new(secret, calendar, config.grace_hours)
    }

    fn mac(&self) -> Result<HmacSha256, FrontdeskError> {
        HmacSha256::new_from_slice(&self.secret)
            .map_err(|e| FrontdeskError::Internal(format!("token key rejected: {e}")))
    }

    /// When tokens for `scope` stop being accepted: end of the local day plus grace.
    pub fn expiry_for(&self, scope: &Scope) -> Result<DateTime<Utc>, FrontdeskError> {
        Ok(self.calendar.end_of_day(scope.day)? + self.grace)
    }

    /// Generate a token for `scope`. Tokens for days already over are refused.
    pub fn generate(
        &self,
        scope: &Scope,
        now: DateTime<Utc>,
    ) -> Result<IssuedToken, FrontdeskError> {
        let expires_at = self.expiry_for(scope)?;
        if expires_at <= now {
            return Err(FrontdeskError::Validation(format!(
                "cannot issue a token for past day {}",
                scope.day_string()
            )));
        }

        let mut nonce = [0u8; NONCE_BYTES];
        rand::thread_rng().fill_bytes(&mut nonce);
        let claims = format!(
            "{}|{}|{}|{}",
            scope.resource_id,
            scope.day_string(),
            expires_at.timestamp(),
            hex::encode(nonce)
        );
        let payload = URL_SAFE_NO_PAD.encode(claims.as_bytes());

        let mut mac = self.mac()?;
        mac.update(payload.as_bytes());
        let signature = hex::encode(mac.finalize().into_bytes());

        Ok(IssuedToken {
            token: format!("{payload}.{signature}"),
            resource_id: scope.resource_id.clone(),
            day: scope.day_string(),
            expires_at,
        })
    }

    /// Verify signature and expiry and return the token's scope.
    ///
    /// Every failure maps to [`FrontdeskError::InvalidToken`]; callers learn
    /// nothing about which check failed.
    pub fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<Scope, FrontdeskError> {
        let (payload, signature) = token
            .trim()
            .split_once('.')
            .ok_or(FrontdeskError::InvalidToken)?;
        let signature = hex::decode(signature).map_err(|_| FrontdeskError::InvalidToken)?;

        let mut mac = self.mac()?;
        mac.update(payload.as_bytes());
        mac.verify_slice(&signature)
            .map_err(|_| FrontdeskError::InvalidToken)?;

        let claims = URL_SAFE_NO_PAD
            .decode(payload)
            .ok()
            .and_then(|bytes| String::from_utf8(bytes).ok())
            .ok_or(FrontdeskError::InvalidToken)?;

        // Resource ids may contain `|`, so peel fields off the right.
        let mut fields = claims.rsplitn(3, '|');
        let (_nonce, expires, rest) = match (fields.next(), fields.next(), fields.next()) {
            (Some(nonce), Some(expires), Some(rest)) => (nonce, expires, rest),
            _ => return Err(FrontdeskError::InvalidToken),
        };
        let (resource_id, day) = rest.rsplit_once('|').ok_or(FrontdeskError::InvalidToken)?;

        let expires = expires
            .parse::<i64>()
            .ok()
            .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
            .ok_or(FrontdeskError::InvalidToken)?;
        if now >= expires {
            return Err(FrontdeskError::InvalidToken);
        }

        Scope::parse(resource_id, day).map_err(|_| FrontdeskError::InvalidToken)
    }

    /// Validate and additionally require the token to belong to `scope`.
    pub fn validate_for(
        &self,
        token: &str,
        scope: &Scope,
        now: DateTime<Utc>,
    ) -> Result<(), FrontdeskError> {
        if &self.validate(token, now)? != scope {
            return Err(FrontdeskError::InvalidToken);
        }
        Ok(())
    }
}
