// SPDX-FileCopyrightText: 2026 Storybot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! A user's request to fetch stories, as it travels through the queue.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::warn;

use storybot_core::{ChatId, ChatTransport, LinkKind, MessageRef, SendOptions, StoryId, UserProfile};

/// Engine-assigned identifier, unique for the lifetime of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct TaskId(pub u64);

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "task-{}", self.0)
    }
}

/// Transient status messages posted while a task is active.
///
/// Cloning shares the underlying list, so the fetch and delivery jobs append
/// to the same handle the engine drains on completion.
#[derive(Debug, Clone, Default)]
pub struct StatusMessages(Arc<Mutex<Vec<MessageRef>>>);

impl StatusMessages {
    /// Sends `text` to `chat` and records it for cleanup.
    pub async fn post(
        &self,
        transport: &dyn ChatTransport,
        chat: ChatId,
        text: &str,
    ) -> Option<MessageRef> {
        match transport.send_message(chat, text, SendOptions::default()).await {
            Ok(message) => {
                self.push(message).await;
                Some(message)
            }
            Err(e) => {
                warn!(chat_id = %chat, error = %e, "failed to send status message");
                None
            }
        }
    }

    pub async fn push(&self, message: MessageRef) {
        self.0.lock().await.push(message);
    }

    /// Removes and returns every recorded message.
    pub async fn drain(&self) -> Vec<MessageRef> {
        std::mem::take(&mut *self.0.lock().await)
    }

    pub async fn len(&self) -> usize {
        self.0.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.0.lock().await.is_empty()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Task {
    pub chat_id: ChatId,
    /// `@handle`, `+phone` or a story permalink, as sent by the user.
    pub link: String,
    pub kind: LinkKind,
    /// Story ids of a continuation page; `None` for a fresh request.
    pub cursor: Option<Vec<StoryId>>,
    pub user: Option<UserProfile>,
    pub locale: String,
    #[serde(skip)]
    pub status_messages: StatusMessages,
    pub created_at: DateTime<Utc>,
}

impl Task {
    pub fn new(chat_id: ChatId, link: impl Into<String>, kind: LinkKind) -> Self {
        Self {
            chat_id,
            link: link.into(),
            kind,
            cursor: None,
            user: None,
            locale: String::new(),
            status_messages: StatusMessages::default(),
            created_at: Utc::now(),
        }
    }

    pub fn with_user(mut self, user: UserProfile) -> Self {
        self.locale = user.language_code.clone().unwrap_or_default();
        self.user = Some(user);
        self
    }

    pub fn with_cursor(mut self, ids: Vec<StoryId>) -> Self {
        self.cursor = Some(ids);
        self
    }

    pub fn is_continuation(&self) -> bool {
        self.cursor.is_some()
    }
}
