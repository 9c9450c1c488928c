// SPDX-FileCopyrightText: 2026 Storybot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for Storybot.
//!
//! This crate provides the error type, the shared value types and the
//! collaborator traits (chat transport, story source, user store) that the
//! queue engine is written against.

pub mod error;
pub mod markdown;
pub mod shared;
pub mod traits;
pub mod types;

pub use error::StorybotError;
pub use shared::SharedSession;
pub use types::{
    ActionButton, AdapterType, ChatId, Entity, HealthStatus, InboundEvent, LinkKind, MediaItem,
    MediaKind, MediaRef, MessageRef, SendOptions, StoryId, StoryItem, TextMode, UserProfile,
};

pub use traits::{ChatTransport, PluginAdapter, StorySource, UserStore};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_variants_construct() {
        let _config = StorybotError::Config("test".into());
        let _storage = StorybotError::Storage {
            source: Box::new(std::io::Error::other("test")),
        };
        let _channel = StorybotError::channel("send failed", std::io::Error::other("x"));
        let _session = StorybotError::session("bridge", std::io::Error::other("x"));
        let _not_found = StorybotError::NotFound("story 4".into());
        let _invalid = StorybotError::InvalidLink("nope".into());
        let _timeout = StorybotError::Timeout {
            duration: std::time::Duration::from_secs(30),
        };
        let _stuck = StorybotError::TaskStuck {
            chat_id: 1,
            elapsed: std::time::Duration::from_secs(420),
        };
        let _internal = StorybotError::Internal("test".into());
    }

    #[test]
    fn rate_limit_wait_is_exposed() {
        let err = StorybotError::RateLimited {
            wait: std::time::Duration::from_secs(90),
        };
        assert_eq!(
            err.rate_limit_wait(),
            Some(std::time::Duration::from_secs(90))
        );
        assert_eq!(StorybotError::Internal("x".into()).rate_limit_wait(), None);
    }

    #[test]
    fn adapter_type_round_trips() {
        use std::str::FromStr;

        for variant in [AdapterType::Channel, AdapterType::Session, AdapterType::Storage] {
            let parsed = AdapterType::from_str(&variant.to_string()).expect("should parse back");
            assert_eq!(variant, parsed);
        }
    }

    #[test]
    fn user_profile_serializes_with_optional_fields() {
        let user = UserProfile {
            id: 42,
            is_bot: false,
            first_name: "Ann".into(),
            last_name: None,
            username: Some("ann".into()),
            language_code: Some("en".into()),
        };
        let json = serde_json::to_string(&user).unwrap();
        assert!(json.contains("\"id\":42"));
        let back: UserProfile = serde_json::from_str(&json).unwrap();
        assert_eq!(back, user);
    }

    #[test]
    fn media_item_debug_hides_payload() {
        let item = MediaItem {
            payload: vec![0; 1024],
            kind: MediaKind::Photo,
            caption: None,
        };
        let debug = format!("{item:?}");
        assert!(debug.contains("payload_len: 1024"));
    }

    #[test]
    fn all_traits_are_exported() {
        fn _assert_plugin_adapter<T: PluginAdapter>() {}
        fn _assert_transport<T: ChatTransport>() {}
        fn _assert_source<T: StorySource>() {}
        fn _assert_store<T: UserStore>() {}
    }
}
