// SPDX-FileCopyrightText: 2026 Storybot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Administrative notices.
//!
//! Every notice goes to the configured admin chat as MarkdownV2 with the
//! requester's profile in a fenced JSON block. Notices about tasks the admin
//! started themselves are skipped, except for the stuck-task report.

use std::sync::Arc;
use std::time::Duration;

use tracing::warn;

use storybot_core::markdown::{escape_code, escape_text};
use storybot_core::{ChatId, ChatTransport, SendOptions};

use crate::task::Task;

#[derive(Clone)]
pub struct AdminNotifier {
    transport: Arc<dyn ChatTransport>,
    admin_chat: ChatId,
}

impl AdminNotifier {
    pub fn new(transport: Arc<dyn ChatTransport>, admin_chat: ChatId) -> Self {
        Self {
            transport,
            admin_chat,
        }
    }

    pub async fn task_started(&self, task: &Task) {
        if self.is_own(task) {
            return;
        }
        let text = format!(
            "{}\n{}",
            escape_text("👤 Task started by:"),
            json_block(&author_json(task))
        );
        self.send(text).await;
    }

    /// Informational notice, e.g. upload counts.
    pub async fn info(&self, task: &Task, info: &str) {
        if self.is_own(task) {
            return;
        }
        let mut text = escape_text(info);
        if task.user.is_some() {
            text.push_str(&escape_text("\n👤 user:"));
            text.push('\n');
            text.push_str(&json_block(&author_json(task)));
        }
        self.send(text).await;
    }

    pub async fn error(&self, task: &Task, cause: &str) {
        if self.is_own(task) {
            return;
        }
        let text = format!(
            "{}\n{}\n{}\n{}",
            escape_text("🛑 ERROR 🛑"),
            escape_text(&format!("🔗 Target link: {}", task.link)),
            escape_text(&format!("reason: {cause}")),
            escape_text("author:"),
        );
        self.send(format!("{text}\n{}", json_block(&author_json(task))))
            .await;
    }

    /// Reports a task that exceeded the processing limit, with its full payload.
    pub async fn task_stuck(&self, task: &Task, elapsed: Duration) {
        let payload = serde_json::to_string_pretty(task).unwrap_or_else(|_| task.link.clone());
        let text = format!(
            "{}\n\n{}",
            escape_text(&format!(
                "❌ Bot stopped manually, it's took too long to download stories ({}s)",
                elapsed.as_secs()
            )),
            json_block(&payload)
        );
        self.send(text).await;
    }

    fn is_own(&self, task: &Task) -> bool {
        task.chat_id == self.admin_chat
    }

    async fn send(&self, text: String) {
        if let Err(e) = self
            .transport
            .send_message(self.admin_chat, &text, SendOptions::markdown())
            .await
        {
            warn!(error = %e, "failed to notify admin");
        }
    }
}

fn json_block(json: &str) -> String {
    format!("```json\n{}\n```", escape_code(json))
}

/// Requester profile with the username shown as `@handle`.
fn author_json(task: &Task) -> String {
    let Some(user) = &task.user else {
        return "null".to_string();
    };
    let mut value = serde_json::to_value(user).unwrap_or_default();
    if let Some(username) = &user.username {
        value["username"] = serde_json::Value::String(format!("@{username}"));
    }
    serde_json::to_string_pretty(&value).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use storybot_core::{LinkKind, UserProfile};
    use storybot_test_utils::{MockTransport, TransportCall};

    const ADMIN: ChatId = ChatId(1000);

    fn task(chat: i64) -> Task {
        Task::new(ChatId(chat), "@target_1", LinkKind::Identity).with_user(UserProfile {
            id: chat,
            is_bot: false,
            first_name: "Ann".into(),
            last_name: None,
            username: Some("ann".into()),
            language_code: None,
        })
    }

    fn notifier() -> (Arc<MockTransport>, AdminNotifier) {
        let transport = Arc::new(MockTransport::new());
        let notifier = AdminNotifier::new(transport.clone(), ADMIN);
        (transport, notifier)
    }

    #[tokio::test]
    async fn start_notice_contains_author() {
        let (transport, notifier) = notifier();
        notifier.task_started(&task(5)).await;

        let calls = transport.calls().await;
        let TransportCall::Sent { chat, text, options, .. } = &calls[0] else {
            panic!("expected a sent message");
        };
        assert_eq!(*chat, ADMIN);
        assert_eq!(*options, SendOptions::markdown());
        assert!(text.starts_with("👤 Task started by:"));
        assert!(text.contains("\"username\": \"@ann\""));
        assert!(text.contains("```json"));
    }

    #[tokio::test]
    async fn error_notice_escapes_link() {
        let (transport, notifier) = notifier();
        notifier.error(&task(5), "wrong link").await;
        let texts = transport.texts_to(ADMIN).await;
        assert!(texts[0].contains("🔗 Target link: @target\\_1"));
        assert!(texts[0].contains("reason: wrong link"));
    }

    #[tokio::test]
    async fn admin_own_tasks_are_skipped() {
        let (transport, notifier) = notifier();
        let own = task(ADMIN.0);
        notifier.task_started(&own).await;
        notifier.info(&own, "📥 1 Active stories uploaded to user!").await;
        notifier.error(&own, "boom").await;
        assert!(transport.calls().await.is_empty());

        notifier.task_stuck(&own, Duration::from_secs(420)).await;
        let texts = transport.texts_to(ADMIN).await;
        assert_eq!(texts.len(), 1);
        assert!(texts[0].contains("took too long"));
        assert!(texts[0].contains("\"link\": \"@target_1\""));
    }
}
