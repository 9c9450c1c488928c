// SPDX-FileCopyrightText: 2026 Storybot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Turns inbound chat events into queue submissions and replies.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use storybot_core::{
    ActionButton, ChatId, ChatTransport, InboundEvent, LinkKind, SendOptions, StorybotError,
};

use crate::engine::EngineHandle;
use crate::intake::{classify_text, parse_continuation};
use crate::messages;
use crate::task::Task;

/// Admin text (and button data) that asks for a process restart.
pub const RESTART_COMMAND: &str = "restart";

pub struct InboundRouter {
    engine: EngineHandle,
    transport: Arc<dyn ChatTransport>,
    admin_chat: ChatId,
    story_link_hosts: Vec<String>,
    restart: CancellationToken,
}

impl InboundRouter {
    /// `restart` is cancelled when the admin confirms a restart.
    pub fn new(
        engine: EngineHandle,
        transport: Arc<dyn ChatTransport>,
        admin_chat: ChatId,
        story_link_hosts: Vec<String>,
        restart: CancellationToken,
    ) -> Self {
        Self {
            engine,
            transport,
            admin_chat,
            story_link_hosts,
            restart,
        }
    }

    pub async fn route(&self, event: InboundEvent) -> Result<(), StorybotError> {
        match event {
            InboundEvent::Text {
                chat_id,
                from,
                text,
                received_at,
            } => {
                let text = text.trim();
                if text == "/start" || text.starts_with("/start ") {
                    return self.reply(chat_id, messages::USAGE).await;
                }

                if let Some(kind) = classify_text(text, &self.story_link_hosts) {
                    let mut task = Task::new(chat_id, text, kind);
                    task.created_at = received_at;
                    if let Some(user) = from {
                        task = task.with_user(user);
                    }
                    debug!(chat_id = %chat_id, %kind, "story request received");
                    return self.engine.submit(task).await;
                }

                let from_admin = from.as_ref().is_some_and(|u| u.id == self.admin_chat.0);
                if text == RESTART_COMMAND && from_admin {
                    let confirm = vec![vec![ActionButton::new(
                        messages::RESTART_CONFIRM,
                        RESTART_COMMAND,
                    )]];
                    self.transport
                        .send_message(
                            chat_id,
                            messages::RESTART_PROMPT,
                            SendOptions::default().with_buttons(confirm),
                        )
                        .await?;
                    return Ok(());
                }

                self.reply(chat_id, messages::INVALID_INPUT).await
            }
            InboundEvent::Action {
                chat_id,
                from,
                data,
                received_at,
            } => {
                if let Some((identity, ids)) = parse_continuation(&data) {
                    let mut task = Task::new(chat_id, identity, LinkKind::Identity)
                        .with_cursor(ids)
                        .with_user(from);
                    task.created_at = received_at;
                    return self.engine.submit(task).await;
                }

                if data == RESTART_COMMAND && from.id == self.admin_chat.0 {
                    info!("restart confirmed by admin");
                    self.reply(chat_id, messages::RESTARTING).await?;
                    self.restart.cancel();
                    return Ok(());
                }

                debug!(chat_id = %chat_id, data = data.as_str(), "ignoring unknown action");
                Ok(())
            }
        }
    }

    async fn reply(&self, chat: ChatId, text: &str) -> Result<(), StorybotError> {
        self.transport
            .send_message(chat, text, SendOptions::quiet())
            .await
            .map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use storybot_core::{SharedSession, StorySource};
    use storybot_test_utils::{MockStorySource, MockTransport, MockUserStore, TransportCall, user};

    use crate::engine::QueueEngine;
    use crate::settings::QueueSettings;

    const ADMIN: ChatId = ChatId(1000);

    struct Fixture {
        transport: Arc<MockTransport>,
        engine: EngineHandle,
        router: InboundRouter,
        restart: CancellationToken,
    }

    fn fixture() -> Fixture {
        let transport = Arc::new(MockTransport::new());
        let source: Arc<dyn StorySource> = Arc::new(MockStorySource::new());
        let settings = QueueSettings {
            admin_chat: ADMIN,
            ..QueueSettings::default()
        };
        let (engine, handle) = QueueEngine::new(
            transport.clone(),
            Arc::new(SharedSession::ready(source)),
            Arc::new(MockUserStore::new()),
            settings.clone(),
        );
        tokio::spawn(engine.run(CancellationToken::new()));

        let restart = CancellationToken::new();
        let router = InboundRouter::new(
            handle.clone(),
            transport.clone(),
            ADMIN,
            settings.story_link_hosts,
            restart.clone(),
        );
        Fixture {
            transport,
            engine: handle,
            router,
            restart,
        }
    }

    fn text(chat: i64, body: &str) -> InboundEvent {
        InboundEvent::Text {
            chat_id: ChatId(chat),
            from: Some(user(chat)),
            text: body.to_string(),
            received_at: Utc::now(),
        }
    }

    fn action(chat: i64, data: &str) -> InboundEvent {
        InboundEvent::Action {
            chat_id: ChatId(chat),
            from: user(chat),
            data: data.to_string(),
            received_at: Utc::now(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn start_replies_with_usage() {
        let f = fixture();
        f.router.route(text(5, "/start")).await.unwrap();
        assert_eq!(f.transport.texts_to(ChatId(5)).await, vec![messages::USAGE]);
    }

    #[tokio::test(start_paused = true)]
    async fn invalid_text_gets_hint() {
        let f = fixture();
        f.router.route(text(5, "hello there")).await.unwrap();
        assert_eq!(
            f.transport.texts_to(ChatId(5)).await,
            vec![messages::INVALID_INPUT]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn identity_is_submitted() {
        let f = fixture();
        f.router.route(text(5, "@alice")).await.unwrap();
        let snapshot = f.engine.snapshot().await.unwrap();
        assert_eq!(snapshot.active, Some(ChatId(5)));
    }

    #[tokio::test(start_paused = true)]
    async fn restart_needs_admin_and_confirmation() {
        let f = fixture();
        f.router.route(text(5, "restart")).await.unwrap();
        assert_eq!(
            f.transport.texts_to(ChatId(5)).await,
            vec![messages::INVALID_INPUT]
        );

        f.router.route(text(ADMIN.0, "restart")).await.unwrap();
        let calls = f.transport.calls().await;
        let Some(TransportCall::Sent { text, options, .. }) = calls.last() else {
            panic!("expected confirmation prompt");
        };
        assert_eq!(text, messages::RESTART_PROMPT);
        assert_eq!(options.buttons[0][0].action_data, RESTART_COMMAND);
        assert!(!f.restart.is_cancelled());

        f.router.route(action(5, RESTART_COMMAND)).await.unwrap();
        assert!(!f.restart.is_cancelled());

        f.router.route(action(ADMIN.0, RESTART_COMMAND)).await.unwrap();
        assert!(f.restart.is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn continuation_button_submits_cursor_task() {
        let f = fixture();
        f.router.route(action(7, "@alice&[4,3]")).await.unwrap();
        let snapshot = f.engine.snapshot().await.unwrap();
        assert_eq!(snapshot.active, Some(ChatId(7)));
    }
}
