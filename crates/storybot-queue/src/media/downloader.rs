// SPDX-FileCopyrightText: 2026 Storybot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use std::time::Duration;

use tracing::{debug, warn};

use storybot_core::{MediaKind, StorySource, StorybotError};

use super::mapper::StoryRecord;

/// How a batch of records is downloaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DownloadPolicy {
    /// Upper bound for a single video download, if any.
    pub video_timeout: Option<Duration>,
    /// Pause after every attempt, successful or not.
    pub delay: Duration,
}

impl DownloadPolicy {
    pub fn active(delay: Duration) -> Self {
        Self {
            video_timeout: None,
            delay,
        }
    }

    pub fn pinned(video_timeout: Duration, delay: Duration) -> Self {
        Self {
            video_timeout: Some(video_timeout),
            delay,
        }
    }
}

/// Downloads every record one after another, storing payloads in place.
///
/// Failures and timeouts are logged and leave the record without a payload.
/// Records without a media reference are skipped. Returns the number of
/// successful downloads.
pub async fn download_all(
    source: &dyn StorySource,
    records: &mut [StoryRecord],
    policy: DownloadPolicy,
) -> usize {
    let mut downloaded = 0;

    for record in records.iter_mut() {
        let Some(media) = record.media.clone() else {
            warn!(story_id = record.id, "story has no media reference, skipping");
            continue;
        };

        let result = match policy.video_timeout {
            Some(limit) if record.kind == MediaKind::Video => {
                tokio::time::timeout(limit, source.download_media(&media))
                    .await
                    .unwrap_or(Err(StorybotError::Timeout { duration: limit }))
            }
            _ => source.download_media(&media).await,
        };

        match result {
            Ok(payload) => {
                debug!(story_id = record.id, bytes = payload.len(), "story downloaded");
                record.set_payload(payload);
                downloaded += 1;
            }
            Err(e) => {
                warn!(story_id = record.id, error = %e, "story download failed");
            }
        }

        tokio::time::sleep(policy.delay).await;
    }

    downloaded
}
