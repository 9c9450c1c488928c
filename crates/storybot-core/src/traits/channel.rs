// SPDX-FileCopyrightText: 2026 Storybot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Outbound chat transport used to talk to requesting users and the admin.

use async_trait::async_trait;

use crate::error::StorybotError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{ChatId, MediaItem, MessageRef, SendOptions};

/// Sends, edits and deletes messages on the chat platform.
///
/// Implementations do not retry; a failed call surfaces as
/// [`StorybotError::Channel`] or [`StorybotError::RateLimited`].
#[async_trait]
pub trait ChatTransport: PluginAdapter {
    /// Sends a text message and returns its reference.
    async fn send_message(
        &self,
        chat: ChatId,
        text: &str,
        options: SendOptions,
    ) -> Result<MessageRef, StorybotError>;

    /// Replaces the text of a previously sent message.
    async fn edit_message_text(
        &self,
        chat: ChatId,
        message: MessageRef,
        text: &str,
    ) -> Result<(), StorybotError>;

    async fn delete_message(&self, chat: ChatId, message: MessageRef)
    -> Result<(), StorybotError>;

    /// Uploads up to ten items as one album.
    async fn send_media_group(
        &self,
        chat: ChatId,
        items: Vec<MediaItem>,
    ) -> Result<(), StorybotError>;
}
