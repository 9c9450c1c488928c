// SPDX-FileCopyrightText: 2026 Storybot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! User persistence.

use async_trait::async_trait;

use crate::error::StorybotError;
use crate::traits::adapter::PluginAdapter;
use crate::types::UserProfile;

/// Records every user who ever submitted a request.
#[async_trait]
pub trait UserStore: PluginAdapter {
    /// Inserts the profile unless a record with the same id already exists.
    ///
    /// Returns `true` when a new record was written.
    async fn save_if_absent(&self, user: &UserProfile) -> Result<bool, StorybotError>;
}
