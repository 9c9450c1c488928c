// SPDX-FileCopyrightText: 2026 Storybot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock chat transport that records every outbound call.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};

use async_trait::async_trait;
use tokio::sync::{Mutex, Notify};

use storybot_core::{
    AdapterType, ChatId, ChatTransport, HealthStatus, MediaItem, MediaKind, MessageRef,
    PluginAdapter, SendOptions, StorybotError,
};

/// One recorded transport call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportCall {
    Sent {
        chat: ChatId,
        message: MessageRef,
        text: String,
        options: SendOptions,
    },
    Edited {
        chat: ChatId,
        message: MessageRef,
        text: String,
    },
    Deleted {
        chat: ChatId,
        message: MessageRef,
    },
    MediaGroup {
        chat: ChatId,
        items: Vec<RecordedMedia>,
    },
}

/// Media-group element without its payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedMedia {
    pub kind: MediaKind,
    pub size: usize,
    pub caption: Option<String>,
}

/// A mock transport for testing.
///
/// Message references are handed out sequentially starting at 1.
pub struct MockTransport {
    calls: Arc<Mutex<Vec<TransportCall>>>,
    next_id: AtomicI32,
    fail_media_groups: AtomicBool,
    notify: Arc<Notify>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            calls: Arc::new(Mutex::new(Vec::new())),
            next_id: AtomicI32::new(1),
            fail_media_groups: AtomicBool::new(false),
            notify: Arc::new(Notify::new()),
        }
    }

    /// Makes every subsequent `send_media_group` fail.
    pub fn fail_media_groups(&self, fail: bool) {
        self.fail_media_groups.store(fail, Ordering::SeqCst);
    }

    pub async fn calls(&self) -> Vec<TransportCall> {
        self.calls.lock().await.clone()
    }

    /// Texts of all sent messages to `chat`, in order.
    pub async fn texts_to(&self, chat: ChatId) -> Vec<String> {
        self.calls
            .lock()
            .await
            .iter()
            .filter_map(|c| match c {
                TransportCall::Sent { chat: to, text, .. } if *to == chat => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    /// Texts of all edits made in `chat`, in order.
    pub async fn edits_in(&self, chat: ChatId) -> Vec<String> {
        self.calls
            .lock()
            .await
            .iter()
            .filter_map(|c| match c {
                TransportCall::Edited { chat: to, text, .. } if *to == chat => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    /// Albums uploaded to `chat`, in order.
    pub async fn albums_to(&self, chat: ChatId) -> Vec<Vec<RecordedMedia>> {
        self.calls
            .lock()
            .await
            .iter()
            .filter_map(|c| match c {
                TransportCall::MediaGroup { chat: to, items } if *to == chat => {
                    Some(items.clone())
                }
                _ => None,
            })
            .collect()
    }

    pub async fn deleted_in(&self, chat: ChatId) -> Vec<MessageRef> {
        self.calls
            .lock()
            .await
            .iter()
            .filter_map(|c| match c {
                TransportCall::Deleted { chat: to, message } if *to == chat => Some(*message),
                _ => None,
            })
            .collect()
    }

    /// Waits until a sent message to `chat` contains `needle`.
    pub async fn wait_for_text(&self, chat: ChatId, needle: &str) {
        loop {
            let notified = self.notify.notified();
            if self
                .texts_to(chat)
                .await
                .iter()
                .any(|t| t.contains(needle))
            {
                return;
            }
            notified.await;
        }
    }

    async fn record(&self, call: TransportCall) {
        self.calls.lock().await.push(call);
        self.notify.notify_waiters();
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PluginAdapter for MockTransport {
    fn name(&self) -> &str {
        "mock-transport"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Channel
    }

    async fn health_check(&self) -> Result<HealthStatus, StorybotError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), StorybotError> {
        Ok(())
    }
}

#[async_trait]
impl ChatTransport for MockTransport {
    async fn send_message(
        &self,
        chat: ChatId,
        text: &str,
        options: SendOptions,
    ) -> Result<MessageRef, StorybotError> {
        let message = MessageRef(self.next_id.fetch_add(1, Ordering::SeqCst));
        self.record(TransportCall::Sent {
            chat,
            message,
            text: text.to_string(),
            options,
        })
        .await;
        Ok(message)
    }

    async fn edit_message_text(
        &self,
        chat: ChatId,
        message: MessageRef,
        text: &str,
    ) -> Result<(), StorybotError> {
        self.record(TransportCall::Edited {
            chat,
            message,
            text: text.to_string(),
        })
        .await;
        Ok(())
    }

    async fn delete_message(&self, chat: ChatId, message: MessageRef) -> Result<(), StorybotError> {
        self.record(TransportCall::Deleted { chat, message }).await;
        Ok(())
    }

    async fn send_media_group(
        &self,
        chat: ChatId,
        items: Vec<MediaItem>,
    ) -> Result<(), StorybotError> {
        if self.fail_media_groups.load(Ordering::SeqCst) {
            return Err(StorybotError::Channel {
                message: "mock media group failure".into(),
                source: None,
            });
        }
        let items = items
            .into_iter()
            .map(|i| RecordedMedia {
                kind: i.kind,
                size: i.payload.len(),
                caption: i.caption,
            })
            .collect();
        self.record(TransportCall::MediaGroup { chat, items }).await;
        Ok(())
    }
}
