// SPDX-FileCopyrightText: 2026 Storybot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Storybot.
//!
//! Mock implementations of the collaborator traits plus small fixture
//! builders for users and stories.

pub mod mock_source;
pub mod mock_store;
pub mod mock_transport;

pub use mock_source::{MockFailure, MockStorySource, SourceCall};
pub use mock_store::MockUserStore;
pub use mock_transport::{MockTransport, RecordedMedia, TransportCall};

use storybot_core::{MediaKind, MediaRef, StoryId, StoryItem, UserProfile};

/// One mebibyte, the unit of the delivery size limits.
pub const MIB: usize = 1024 * 1024;

/// Media location used by the fixtures for story `id`.
pub fn location(id: StoryId) -> String {
    format!("loc-{id}")
}

pub fn photo(id: StoryId) -> StoryItem {
    story(id, MediaKind::Photo)
}

pub fn video(id: StoryId) -> StoryItem {
    story(id, MediaKind::Video)
}

fn story(id: StoryId, kind: MediaKind) -> StoryItem {
    StoryItem {
        id,
        date: 1_700_000_000 + i64::from(id),
        caption: None,
        media: Some(MediaRef {
            kind,
            location: location(id),
        }),
    }
}

pub fn user(id: i64) -> UserProfile {
    UserProfile {
        id,
        is_bot: false,
        first_name: format!("User{id}"),
        last_name: None,
        username: Some(format!("user{id}")),
        language_code: Some("en".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use storybot_core::{ChatId, ChatTransport, Entity, SendOptions, StorySource, UserStore};

    fn entity() -> Entity {
        Entity {
            id: 1,
            access_hash: None,
            username: None,
        }
    }

    #[tokio::test]
    async fn transport_hands_out_sequential_refs() {
        let transport = MockTransport::new();
        let a = transport
            .send_message(ChatId(1), "a", SendOptions::default())
            .await
            .unwrap();
        let b = transport
            .send_message(ChatId(1), "b", SendOptions::default())
            .await
            .unwrap();
        assert_eq!(b.0, a.0 + 1);
        assert_eq!(transport.texts_to(ChatId(1)).await, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn source_pages_pinned_below_offset() {
        let source = MockStorySource::new()
            .with_pinned((1..=7).map(photo).collect())
            .with_pinned_page_size(3)
            .with_stripped_media(&[6]);

        let first = source.fetch_pinned_stories(&entity(), None).await.unwrap();
        assert_eq!(first.iter().map(|s| s.id).collect::<Vec<_>>(), vec![7, 6, 5]);
        assert!(first[1].media.is_none());

        let second = source.fetch_pinned_stories(&entity(), Some(5)).await.unwrap();
        assert_eq!(second.iter().map(|s| s.id).collect::<Vec<_>>(), vec![4, 3, 2]);

        let by_id = source.fetch_stories_by_id(&entity(), &[6]).await.unwrap();
        assert!(by_id[0].media.is_some());
    }

    #[tokio::test]
    async fn store_keeps_first_profile() {
        let store = MockUserStore::new();
        assert!(store.save_if_absent(&user(1)).await.unwrap());
        assert!(!store.save_if_absent(&user(1)).await.unwrap());
        assert_eq!(store.saved().await.len(), 1);
        assert_eq!(store.attempts().await, vec![1, 1]);
    }
}
