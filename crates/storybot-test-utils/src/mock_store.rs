// SPDX-FileCopyrightText: 2026 Storybot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory user store.

use async_trait::async_trait;
use tokio::sync::Mutex;

use storybot_core::{
    AdapterType, HealthStatus, PluginAdapter, StorybotError, UserProfile, UserStore,
};

/// Records every `save_if_absent` call and keeps the first profile per id.
#[derive(Default)]
pub struct MockUserStore {
    saved: Mutex<Vec<UserProfile>>,
    attempts: Mutex<Vec<i64>>,
}

impl MockUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn saved(&self) -> Vec<UserProfile> {
        self.saved.lock().await.clone()
    }

    /// Ids passed to `save_if_absent`, duplicates included.
    pub async fn attempts(&self) -> Vec<i64> {
        self.attempts.lock().await.clone()
    }
}

#[async_trait]
impl PluginAdapter for MockUserStore {
    fn name(&self) -> &str {
        "mock-users"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, StorybotError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), StorybotError> {
        Ok(())
    }
}

#[async_trait]
impl UserStore for MockUserStore {
    async fn save_if_absent(&self, user: &UserProfile) -> Result<bool, StorybotError> {
        self.attempts.lock().await.push(user.id);
        let mut saved = self.saved.lock().await;
        if saved.iter().any(|u| u.id == user.id) {
            return Ok(false);
        }
        saved.push(user.clone());
        Ok(true)
    }
}
