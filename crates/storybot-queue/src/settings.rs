// SPDX-FileCopyrightText: 2026 Storybot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Runtime settings of the queue engine, derived from [`StorybotConfig`].

use std::time::Duration;

use storybot_config::model::StorybotConfig;
use storybot_core::ChatId;

/// Durations and limits the engine and its services operate with.
#[derive(Debug, Clone)]
pub struct QueueSettings {
    /// Chat receiving administrative notices.
    pub admin_chat: ChatId,
    /// Hosts accepted in direct story links.
    pub story_link_hosts: Vec<String>,
    /// Candidate cooldown windows for the active environment.
    pub cooldown_windows: Vec<Duration>,
    pub watchdog_interval: Duration,
    pub max_task_duration: Duration,
    /// Upper bound for downloading one pinned video.
    pub pinned_video_timeout: Duration,
    /// Pause after every download attempt.
    pub download_delay: Duration,
    /// Pause between consecutive story listing requests.
    pub fetch_delay: Duration,
    pub pinned_page_size: usize,
    /// Largest payload (in MiB) accepted for upload.
    pub item_limit_mb: u64,
    /// Ceiling (in MiB) for the cumulative size of one album.
    pub album_limit_mb: u64,
    pub album_max_items: usize,
}

impl QueueSettings {
    pub fn from_config(config: &StorybotConfig) -> Self {
        let queue = &config.queue;
        Self {
            admin_chat: ChatId(config.telegram.admin_chat_id),
            story_link_hosts: config.telegram.story_link_hosts.clone(),
            cooldown_windows: config.cooldown_windows(),
            watchdog_interval: Duration::from_secs(queue.watchdog_interval_secs),
            max_task_duration: Duration::from_secs(queue.max_task_secs),
            pinned_video_timeout: Duration::from_secs(queue.pinned_video_timeout_secs),
            download_delay: Duration::from_millis(queue.download_delay_ms),
            fetch_delay: Duration::from_millis(queue.fetch_delay_ms),
            pinned_page_size: queue.pinned_page_size,
            item_limit_mb: queue.item_limit_mb,
            album_limit_mb: queue.album_limit_mb,
            album_max_items: queue.album_max_items,
        }
    }
}

impl Default for QueueSettings {
    fn default() -> Self {
        Self::from_config(&StorybotConfig::default())
    }
}
