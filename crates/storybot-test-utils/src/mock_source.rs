// SPDX-FileCopyrightText: 2026 Storybot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock story source with scripted stories, failures and delays.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use storybot_core::{
    AdapterType, Entity, HealthStatus, MediaRef, PluginAdapter, StoryId, StoryItem, StorySource,
    StorybotError,
};

/// Failure a mock call should produce. Turned into a fresh error per call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockFailure {
    RateLimited(Duration),
    NotFound,
    Session,
}

impl MockFailure {
    fn to_error(&self) -> StorybotError {
        match self {
            Self::RateLimited(wait) => StorybotError::RateLimited { wait: *wait },
            Self::NotFound => StorybotError::NotFound("mock entity".into()),
            Self::Session => StorybotError::Session {
                message: "mock session failure".into(),
                source: None,
            },
        }
    }
}

/// One recorded story-source call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceCall {
    Resolve(String),
    Active,
    Pinned(Option<StoryId>),
    ById(Vec<StoryId>),
    Download(String),
}

/// A scripted [`StorySource`].
///
/// Pinned stories are served newest first in pages of `pinned_page_size`,
/// continuing below `offset_id`. Downloads return `payload_sizes[location]`
/// zero bytes (default 1 KiB).
pub struct MockStorySource {
    active: Vec<StoryItem>,
    pinned: Vec<StoryItem>,
    pinned_page_size: usize,
    /// Serve the first pinned page for every offset.
    ignore_pinned_offset: bool,
    /// Pinned ids listed without media; `by_id` still returns the media.
    stripped: HashSet<StoryId>,
    payload_sizes: HashMap<String, usize>,
    download_delays: HashMap<String, Duration>,
    download_failures: HashSet<String>,
    resolve_failure: Option<MockFailure>,
    active_failure: Option<MockFailure>,
    pinned_failure_at: Option<(Option<StoryId>, MockFailure)>,
    calls: Mutex<Vec<SourceCall>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MockStorySource {
    pub fn new() -> Self {
        Self {
            active: Vec::new(),
            pinned: Vec::new(),
            pinned_page_size: 100,
            ignore_pinned_offset: false,
            stripped: HashSet::new(),
            payload_sizes: HashMap::new(),
            download_delays: HashMap::new(),
            download_failures: HashSet::new(),
            resolve_failure: None,
            active_failure: None,
            pinned_failure_at: None,
            calls: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn with_active(mut self, stories: Vec<StoryItem>) -> Self {
        self.active = stories;
        self
    }

    pub fn with_pinned(mut self, stories: Vec<StoryItem>) -> Self {
        self.pinned = stories;
        self.pinned.sort_by(|a, b| b.id.cmp(&a.id));
        self
    }

    pub fn with_pinned_page_size(mut self, size: usize) -> Self {
        self.pinned_page_size = size;
        self
    }

    /// Makes pinned paging ignore `offset_id`, like a bridge that does not
    /// support it.
    pub fn ignoring_pinned_offset(mut self) -> Self {
        self.ignore_pinned_offset = true;
        self
    }

    /// Lists the given pinned ids without their media reference.
    pub fn with_stripped_media(mut self, ids: &[StoryId]) -> Self {
        self.stripped.extend(ids.iter().copied());
        self
    }

    pub fn with_payload_size(mut self, story: StoryId, bytes: usize) -> Self {
        self.payload_sizes.insert(crate::location(story), bytes);
        self
    }

    pub fn with_download_delay(mut self, story: StoryId, delay: Duration) -> Self {
        self.download_delays.insert(crate::location(story), delay);
        self
    }

    pub fn with_download_failure(mut self, story: StoryId) -> Self {
        self.download_failures.insert(crate::location(story));
        self
    }

    pub fn fail_resolve(mut self, failure: MockFailure) -> Self {
        self.resolve_failure = Some(failure);
        self
    }

    pub fn fail_active(mut self, failure: MockFailure) -> Self {
        self.active_failure = Some(failure);
        self
    }

    /// Fails the pinned request made with exactly this offset.
    pub fn fail_pinned_at(mut self, offset_id: Option<StoryId>, failure: MockFailure) -> Self {
        self.pinned_failure_at = Some((offset_id, failure));
        self
    }

    pub async fn calls(&self) -> Vec<SourceCall> {
        self.calls.lock().await.clone()
    }

    /// Highest number of downloads that were running at the same time.
    pub fn max_concurrent_downloads(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    async fn record(&self, call: SourceCall) {
        self.calls.lock().await.push(call);
    }

    fn all_stories(&self) -> impl Iterator<Item = &StoryItem> {
        self.active.iter().chain(self.pinned.iter())
    }
}

impl Default for MockStorySource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PluginAdapter for MockStorySource {
    fn name(&self) -> &str {
        "mock-source"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Session
    }

    async fn health_check(&self) -> Result<HealthStatus, StorybotError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), StorybotError> {
        Ok(())
    }
}

#[async_trait]
impl StorySource for MockStorySource {
    async fn resolve_entity(&self, link: &str) -> Result<Entity, StorybotError> {
        self.record(SourceCall::Resolve(link.to_string())).await;
        if let Some(failure) = &self.resolve_failure {
            return Err(failure.to_error());
        }
        Ok(Entity {
            id: 1,
            access_hash: Some(1),
            username: Some(link.trim_start_matches('@').to_string()),
        })
    }

    async fn fetch_active_stories(&self, _entity: &Entity) -> Result<Vec<StoryItem>, StorybotError> {
        self.record(SourceCall::Active).await;
        if let Some(failure) = &self.active_failure {
            return Err(failure.to_error());
        }
        Ok(self.active.clone())
    }

    async fn fetch_pinned_stories(
        &self,
        _entity: &Entity,
        offset_id: Option<StoryId>,
    ) -> Result<Vec<StoryItem>, StorybotError> {
        self.record(SourceCall::Pinned(offset_id)).await;
        if let Some((at, failure)) = &self.pinned_failure_at
            && *at == offset_id
        {
            return Err(failure.to_error());
        }
        Ok(self
            .pinned
            .iter()
            .filter(|s| {
                self.ignore_pinned_offset || offset_id.is_none_or(|offset| s.id < offset)
            })
            .take(self.pinned_page_size)
            .map(|s| {
                let mut listed = s.clone();
                if self.stripped.contains(&s.id) {
                    listed.media = None;
                }
                listed
            })
            .collect())
    }

    async fn fetch_stories_by_id(
        &self,
        _entity: &Entity,
        ids: &[StoryId],
    ) -> Result<Vec<StoryItem>, StorybotError> {
        self.record(SourceCall::ById(ids.to_vec())).await;
        Ok(ids
            .iter()
            .filter_map(|id| self.all_stories().find(|s| s.id == *id).cloned())
            .collect())
    }

    async fn download_media(&self, media: &MediaRef) -> Result<Vec<u8>, StorybotError> {
        self.record(SourceCall::Download(media.location.clone())).await;

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if let Some(delay) = self.download_delays.get(&media.location) {
            tokio::time::sleep(*delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.download_failures.contains(&media.location) {
            return Err(StorybotError::Session {
                message: format!("mock download failure for {}", media.location),
                source: None,
            });
        }
        let size = self
            .payload_sizes
            .get(&media.location)
            .copied()
            .unwrap_or(1024);
        Ok(vec![0; size])
    }
}
