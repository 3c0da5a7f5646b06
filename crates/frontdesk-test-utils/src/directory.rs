// SPDX-FileCopyrightText: 2026 Frontdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Identity directories with fixed behavior.

use std::collections::HashMap;

use async_trait::async_trait;
use frontdesk_core::types::IdentityKey;
use frontdesk_core::{FrontdeskError, IdentityDirectory};

/// Resolves names from a fixed table keyed by normalized identity.
#[derive(Debug, Clone, Default)]
pub struct StaticIdentityDirectory {
    names: HashMap<IdentityKey, String>,
}

impl StaticIdentityDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a name for a raw phone number (normalized like a join would be).
    pub fn with_phone(mut self, phone: &str, name: &str) -> Self {
        if let Ok(key) = IdentityKey::phone(phone) {
            self.names.insert(key, name.to_string());
        }
        self
    }

    pub fn with_chat(mut self, chat_id: &str, name: &str) -> Self {
        if let Ok(key) = IdentityKey::chat(chat_id) {
            self.names.insert(key, name.to_string());
        }
        self
    }
}

#[async_trait]
impl IdentityDirectory for StaticIdentityDirectory {
    async fn display_name(&self, key: &IdentityKey) -> Result<Option<String>, FrontdeskError> {
        Ok(self.names.get(key).cloned())
    }
}

/// A directory whose backend is always down.
#[derive(Debug, Clone, Copy, Default)]
pub struct FailingDirectory;

#[async_trait]
impl IdentityDirectory for FailingDirectory {
    async fn display_name(&self, _key: &IdentityKey) -> Result<Option<String>, FrontdeskError> {
        Err(FrontdeskError::Internal(
            "identity directory unavailable".to_string(),
        ))
    }
}
