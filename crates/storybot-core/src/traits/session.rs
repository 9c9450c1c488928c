// SPDX-FileCopyrightText: 2026 Storybot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Automated-session capability used to read stories.

use async_trait::async_trait;

use crate::error::StorybotError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{Entity, MediaRef, StoryId, StoryItem};

/// Reads stories through an automated client session.
///
/// Rate limiting surfaces as [`StorybotError::RateLimited`] carrying the
/// required wait.
#[async_trait]
pub trait StorySource: PluginAdapter {
    /// Resolves `@handle`, `handle` or `+phone` to a peer.
    async fn resolve_entity(&self, link: &str) -> Result<Entity, StorybotError>;

    async fn fetch_active_stories(&self, entity: &Entity)
    -> Result<Vec<StoryItem>, StorybotError>;

    /// Fetches one page of pinned stories older than `offset_id`
    /// (newest page when `None`).
    async fn fetch_pinned_stories(
        &self,
        entity: &Entity,
        offset_id: Option<StoryId>,
    ) -> Result<Vec<StoryItem>, StorybotError>;

    async fn fetch_stories_by_id(
        &self,
        entity: &Entity,
        ids: &[StoryId],
    ) -> Result<Vec<StoryItem>, StorybotError>;

    /// Downloads the bytes behind a media reference.
    async fn download_media(&self, media: &MediaRef) -> Result<Vec<u8>, StorybotError>;
}
