// SPDX-FileCopyrightText: 2026 Storybot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types shared by every Storybot crate.

use std::time::Duration;

use thiserror::Error;

/// The primary error type used across collaborator traits and services.
#[derive(Debug, Error)]
pub enum StorybotError {
    /// Configuration errors (missing token, invalid admin chat, bad URLs).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database connection, query failure, migrations).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Chat transport errors (send/edit/delete failures, malformed ids).
    #[error("channel error: {message}")]
    Channel {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Automated-session errors (bridge unreachable, malformed payloads).
    #[error("session error: {message}")]
    Session {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The upstream platform asked us to back off for `wait`.
    #[error("rate limited, retry after {wait:?}")]
    RateLimited { wait: Duration },

    /// The requested entity or story does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The inbound link could not be interpreted.
    #[error("invalid link: {0}")]
    InvalidLink(String),

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: Duration },

    /// The active task exceeded the maximum processing time.
    #[error("task for chat {chat_id} stuck for {elapsed:?}")]
    TaskStuck { chat_id: i64, elapsed: Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl StorybotError {
    /// Builds a [`StorybotError::Channel`] wrapping a transport error.
    pub fn channel(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Channel {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Builds a [`StorybotError::Session`] wrapping a session-client error.
    pub fn session(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Session {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Returns the required wait if this error is a rate-limit signal.
    pub fn rate_limit_wait(&self) -> Option<Duration> {
        match self {
            Self::RateLimited { wait } => Some(*wait),
            _ => None,
        }
    }
}
