// SPDX-FileCopyrightText: 2026 Storybot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Telegram transport for Storybot.
//!
//! Implements [`ChatTransport`] on the Telegram Bot API via teloxide and
//! runs long polling that feeds text messages and button presses into an
//! inbound queue.

pub mod handler;

use async_trait::async_trait;
use storybot_config::model::TelegramConfig;
use storybot_core::{
    ActionButton, AdapterType, ChatTransport, HealthStatus, InboundEvent, MediaItem, MediaKind,
    MessageRef, PluginAdapter, SendOptions, StorybotError, TextMode,
};
use teloxide::RequestError;
use teloxide::prelude::*;
use teloxide::types::{
    InlineKeyboardButton, InlineKeyboardMarkup, InputFile, InputMedia, InputMediaPhoto,
    InputMediaVideo, LinkPreviewOptions, MessageId, ParseMode,
};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Capacity of the inbound event queue.
const INBOUND_CAPACITY: usize = 256;

/// Telegram adapter: outbound [`ChatTransport`] plus inbound long polling.
pub struct TelegramChannel {
    bot: Bot,
    inbound_rx: tokio::sync::Mutex<mpsc::Receiver<InboundEvent>>,
    inbound_tx: mpsc::Sender<InboundEvent>,
    polling_handle: std::sync::Mutex<Option<tokio::task::JoinHandle<()>>>,
}

impl TelegramChannel {
    /// Creates a new adapter. Requires `config.bot_token` to be set.
    pub fn new(config: &TelegramConfig) -> Result<Self, StorybotError> {
        let token = config.bot_token.as_deref().ok_or_else(|| {
            StorybotError::Config("telegram.bot_token is required for Telegram adapter".into())
        })?;

        if token.trim().is_empty() {
            return Err(StorybotError::Config(
                "telegram.bot_token cannot be empty".into(),
            ));
        }

        let (inbound_tx, inbound_rx) = mpsc::channel(INBOUND_CAPACITY);

        Ok(Self {
            bot: Bot::new(token),
            inbound_rx: tokio::sync::Mutex::new(inbound_rx),
            inbound_tx,
            polling_handle: std::sync::Mutex::new(None),
        })
    }

    /// Starts long polling. Calling it again while polling is a no-op.
    pub fn connect(&self) -> Result<(), StorybotError> {
        let mut slot = self
            .polling_handle
            .lock()
            .map_err(|_| StorybotError::Internal("polling handle lock poisoned".into()))?;
        if slot.is_some() {
            return Ok(());
        }

        let bot = self.bot.clone();
        let message_tx = self.inbound_tx.clone();
        let callback_tx = self.inbound_tx.clone();

        info!("starting Telegram long polling");

        let handle = tokio::spawn(async move {
            let messages = Update::filter_message().endpoint(move |msg: Message| {
                let tx = message_tx.clone();
                async move {
                    match handler::text_event(&msg) {
                        Some(event) => forward(&tx, event).await,
                        None => debug!(msg_id = msg.id.0, "ignoring non-text message"),
                    }
                    respond(())
                }
            });

            let callbacks =
                Update::filter_callback_query().endpoint(move |bot: Bot, query: CallbackQuery| {
                    let tx = callback_tx.clone();
                    async move {
                        // Acknowledge first so the client stops its spinner.
                        if let Err(e) = bot.answer_callback_query(query.id.clone()).await {
                            warn!(error = %e, "failed to answer callback query");
                        }
                        if let Some(event) = handler::callback_event(&query) {
                            forward(&tx, event).await;
                        }
                        respond(())
                    }
                });

            Dispatcher::builder(bot, dptree::entry().branch(messages).branch(callbacks))
                .default_handler(|_| async {})
                .build()
                .dispatch()
                .await;
        });

        *slot = Some(handle);
        Ok(())
    }

    /// Waits for the next inbound event.
    pub async fn receive(&self) -> Result<InboundEvent, StorybotError> {
        let mut rx = self.inbound_rx.lock().await;
        rx.recv().await.ok_or_else(|| StorybotError::Channel {
            message: "Telegram inbound channel closed".into(),
            source: None,
        })
    }
}

async fn forward(tx: &mpsc::Sender<InboundEvent>, event: InboundEvent) {
    if tx.send(event).await.is_err() {
        warn!("inbound channel closed, dropping update");
    }
}

/// Maps a Bot API failure, keeping flood-control waits distinguishable.
fn map_request_error(action: &str, e: RequestError) -> StorybotError {
    match e {
        RequestError::RetryAfter(secs) => StorybotError::RateLimited {
            wait: secs.duration(),
        },
        other => StorybotError::channel(format!("failed to {action}: {other}"), other),
    }
}

fn parse_mode(mode: TextMode) -> Option<ParseMode> {
    match mode {
        TextMode::Plain => None,
        TextMode::MarkdownV2 => Some(ParseMode::MarkdownV2),
        TextMode::Html => Some(ParseMode::Html),
    }
}

fn keyboard(rows: &[Vec<ActionButton>]) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(rows.iter().map(|row| {
        row.iter()
            .map(|b| InlineKeyboardButton::callback(b.text.clone(), b.action_data.clone()))
            .collect::<Vec<_>>()
    }))
}

fn disabled_preview() -> LinkPreviewOptions {
    LinkPreviewOptions {
        is_disabled: true,
        url: None,
        prefer_small_media: false,
        prefer_large_media: false,
        show_above_text: false,
    }
}

/// Builds the album payload. Telegram shows the first caption as the album's.
fn to_input_media(items: Vec<MediaItem>) -> Vec<InputMedia> {
    items
        .into_iter()
        .enumerate()
        .map(|(i, item)| match item.kind {
            MediaKind::Photo => {
                let file = InputFile::memory(item.payload).file_name(format!("story_{i}.jpg"));
                let mut media = InputMediaPhoto::new(file);
                if let Some(caption) = item.caption {
                    media = media.caption(caption);
                }
                InputMedia::Photo(media)
            }
            MediaKind::Video => {
                let file = InputFile::memory(item.payload).file_name(format!("story_{i}.mp4"));
                let mut media = InputMediaVideo::new(file);
                if let Some(caption) = item.caption {
                    media = media.caption(caption);
                }
                InputMedia::Video(media)
            }
        })
        .collect()
}

#[async_trait]
impl PluginAdapter for TelegramChannel {
    fn name(&self) -> &str {
        "telegram"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Channel
    }

    async fn health_check(&self) -> Result<HealthStatus, StorybotError> {
        match self.bot.get_me().await {
            Ok(_) => Ok(HealthStatus::Healthy),
            Err(e) => Ok(HealthStatus::Unhealthy(format!(
                "Telegram bot unreachable: {e}"
            ))),
        }
    }

    async fn shutdown(&self) -> Result<(), StorybotError> {
        debug!("Telegram channel shutting down");
        if let Ok(mut slot) = self.polling_handle.lock()
            && let Some(handle) = slot.take()
        {
            handle.abort();
        }
        Ok(())
    }
}

#[async_trait]
impl ChatTransport for TelegramChannel {
    async fn send_message(
        &self,
        chat: storybot_core::ChatId,
        text: &str,
        options: SendOptions,
    ) -> Result<MessageRef, StorybotError> {
        let mut request = self.bot.send_message(ChatId(chat.0), text);
        if let Some(mode) = parse_mode(options.mode) {
            request = request.parse_mode(mode);
        }
        if options.disable_link_preview {
            request = request.link_preview_options(disabled_preview());
        }
        if !options.buttons.is_empty() {
            request = request.reply_markup(keyboard(&options.buttons));
        }

        let sent = request
            .await
            .map_err(|e| map_request_error("send message", e))?;
        Ok(MessageRef(sent.id.0))
    }

    async fn edit_message_text(
        &self,
        chat: storybot_core::ChatId,
        message: MessageRef,
        text: &str,
    ) -> Result<(), StorybotError> {
        match self
            .bot
            .edit_message_text(ChatId(chat.0), MessageId(message.0), text)
            .await
        {
            Ok(_) => Ok(()),
            Err(e) if e.to_string().contains("message is not modified") => Ok(()),
            Err(e) => Err(map_request_error("edit message", e)),
        }
    }

    async fn delete_message(
        &self,
        chat: storybot_core::ChatId,
        message: MessageRef,
    ) -> Result<(), StorybotError> {
        self.bot
            .delete_message(ChatId(chat.0), MessageId(message.0))
            .await
            .map_err(|e| map_request_error("delete message", e))?;
        Ok(())
    }

    async fn send_media_group(
        &self,
        chat: storybot_core::ChatId,
        items: Vec<MediaItem>,
    ) -> Result<(), StorybotError> {
        if items.is_empty() {
            return Ok(());
        }
        let count = items.len();
        self.bot
            .send_media_group(ChatId(chat.0), to_input_media(items))
            .await
            .map_err(|e| map_request_error("send media group", e))?;
        debug!(chat_id = chat.0, count, "media group sent");
        Ok(())
    }
}
