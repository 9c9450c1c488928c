// SPDX-FileCopyrightText: 2026 Storybot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use chrono::{DateTime, Utc};

use storybot_core::{MediaItem, MediaKind, MediaRef, StoryId, StoryItem};

use super::chunker::DeclaredSize;

const MIB: usize = 1024 * 1024;

/// Telegram rejects media captions longer than this many characters.
const MAX_CAPTION_CHARS: usize = 1024;

/// A story being prepared for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoryRecord {
    pub id: StoryId,
    pub media: Option<MediaRef>,
    pub kind: MediaKind,
    pub date: DateTime<Utc>,
    pub caption: Option<String>,
    pub payload: Option<Vec<u8>>,
    /// Payload size in whole MiB, rounded down.
    pub payload_size_mb: Option<u64>,
}

impl StoryRecord {
    pub fn from_item(item: &StoryItem) -> Self {
        Self {
            id: item.id,
            media: item.media.clone(),
            kind: item.media.as_ref().map_or(MediaKind::Video, |m| m.kind),
            date: DateTime::from_timestamp(item.date, 0).unwrap_or_default(),
            caption: item.caption.clone().filter(|c| !c.is_empty()),
            payload: None,
            payload_size_mb: None,
        }
    }

    pub fn set_payload(&mut self, payload: Vec<u8>) {
        self.payload_size_mb = Some((payload.len() / MIB) as u64);
        self.payload = Some(payload);
    }

    /// Returns `true` if the record has a payload no larger than `limit_mb`.
    pub fn is_uploadable(&self, limit_mb: u64) -> bool {
        self.payload.is_some() && self.payload_size_mb.is_some_and(|mb| mb <= limit_mb)
    }

    /// Converts into an album item, consuming the payload.
    pub fn into_media_item(self, default_caption: Option<&str>) -> Option<MediaItem> {
        let caption = self
            .caption
            .or_else(|| default_caption.map(str::to_string))
            .map(truncate_caption);
        self.payload.map(|payload| MediaItem {
            payload,
            kind: self.kind,
            caption,
        })
    }
}

impl DeclaredSize for StoryRecord {
    fn declared_size_mb(&self) -> u64 {
        self.payload_size_mb.unwrap_or(0)
    }
}

pub fn map_stories(items: &[StoryItem]) -> Vec<StoryRecord> {
    items.iter().map(StoryRecord::from_item).collect()
}

pub(crate) fn truncate_caption(caption: String) -> String {
    match caption.char_indices().nth(MAX_CAPTION_CHARS) {
        Some((cut, _)) => caption[..cut].to_string(),
        None => caption,
    }
}
