// SPDX-FileCopyrightText: 2026 Frontdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Identity/patient lookup consumed by the join flow.

use async_trait::async_trait;

use crate::error::FrontdeskError;
use crate::types::IdentityKey;

/// Resolves a display name for a joining identity.
#[async_trait]
pub trait IdentityDirectory: Send + Sync + 'static {
    async fn display_name(&self, key: &IdentityKey) -> Result<Option<String>, FrontdeskError>;
}

/// Directory that knows nobody.
#[derive(Debug, Default, Clone, Copy)]
pub struct EmptyDirectory;

#[async_trait]
impl IdentityDirectory for EmptyDirectory {
    async fn display_name(&self, _key: &IdentityKey) -> Result<Option<String>, FrontdeskError> {
        Ok(None)
    }
}
