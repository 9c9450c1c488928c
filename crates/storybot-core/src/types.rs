// SPDX-FileCopyrightText: 2026 Storybot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types passed across collaborator traits.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Telegram chat identifier (user, group, or the admin chat).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChatId(pub i64);

impl std::fmt::Display for ChatId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a message sent by the bot, used for later edits and deletes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageRef(pub i32);

/// Story identifier as assigned by the upstream platform.
pub type StoryId = i32;

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the kind of collaborator behind an adapter.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Channel,
    Session,
    Storage,
}

/// Profile of the Telegram user who sent a request.
///
/// Persisted once per user and echoed into admin notifications.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: i64,
    #[serde(default)]
    pub is_bot: bool,
    pub first_name: String,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub language_code: Option<String>,
}

/// How the target of a task was specified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum LinkKind {
    /// `@handle` or `+phone`; fetches all active and pinned stories.
    Identity,
    /// `<base>/<handle>/s/<id>`; fetches exactly one story.
    DirectLink,
}

/// Media type of a story.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum MediaKind {
    Photo,
    Video,
}

/// Opaque reference to a story's media, understood by the session client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaRef {
    pub kind: MediaKind,
    /// Session-specific file location token.
    pub location: String,
}

/// A resolved peer on the upstream platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    pub id: i64,
    #[serde(default)]
    pub access_hash: Option<i64>,
    #[serde(default)]
    pub username: Option<String>,
}

/// A raw story item as returned by the session client.
///
/// Listings of pinned stories may omit `media`; such items have to be
/// refetched by id before they can be downloaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoryItem {
    pub id: StoryId,
    /// Unix timestamp (seconds) of the post.
    #[serde(default)]
    pub date: i64,
    #[serde(default)]
    pub caption: Option<String>,
    #[serde(default)]
    pub media: Option<MediaRef>,
}

/// Markup mode for outgoing text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextMode {
    #[default]
    Plain,
    MarkdownV2,
    Html,
}

/// An inline action button attached to an outgoing message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionButton {
    pub text: String,
    pub action_data: String,
}

impl ActionButton {
    pub fn new(text: impl Into<String>, action_data: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            action_data: action_data.into(),
        }
    }
}

/// Options for [`ChatTransport::send_message`](crate::ChatTransport::send_message).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SendOptions {
    pub mode: TextMode,
    pub disable_link_preview: bool,
    /// Inline keyboard rows; empty means no keyboard.
    pub buttons: Vec<Vec<ActionButton>>,
}

impl SendOptions {
    /// Plain text without link previews.
    pub fn quiet() -> Self {
        Self {
            disable_link_preview: true,
            ..Self::default()
        }
    }

    pub fn markdown() -> Self {
        Self {
            mode: TextMode::MarkdownV2,
            disable_link_preview: true,
            ..Self::default()
        }
    }

    pub fn with_buttons(mut self, buttons: Vec<Vec<ActionButton>>) -> Self {
        self.buttons = buttons;
        self
    }
}

/// One element of a media-group upload.
#[derive(Clone, PartialEq, Eq)]
pub struct MediaItem {
    pub payload: Vec<u8>,
    pub kind: MediaKind,
    pub caption: Option<String>,
}

impl std::fmt::Debug for MediaItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaItem")
            .field("payload_len", &self.payload.len())
            .field("kind", &self.kind)
            .field("caption", &self.caption)
            .finish()
    }
}

/// An update received from the chat platform, already reduced to what the
/// bot reacts to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEvent {
    /// A text message from a user.
    Text {
        chat_id: ChatId,
        from: Option<UserProfile>,
        text: String,
        received_at: DateTime<Utc>,
    },
    /// An inline-button press. Already acknowledged by the transport.
    Action {
        chat_id: ChatId,
        from: UserProfile,
        data: String,
        received_at: DateTime<Utc>,
    },
}
