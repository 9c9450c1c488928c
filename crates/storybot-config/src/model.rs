// SPDX-FileCopyrightText: 2026 Storybot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for Storybot.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use strum::Display;

/// Top-level Storybot configuration.
///
/// Loaded from TOML files following the XDG hierarchy, with environment
/// variable overrides. Every section has defaults except the secrets.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorybotConfig {
    /// Runtime mode and logging.
    #[serde(default)]
    pub bot: BotConfig,

    /// Telegram Bot API settings.
    #[serde(default)]
    pub telegram: TelegramConfig,

    /// Userbot bridge settings.
    #[serde(default)]
    pub session: SessionConfig,

    /// Queue engine timings and delivery limits.
    #[serde(default)]
    pub queue: QueueConfig,

    /// User database settings.
    #[serde(default)]
    pub storage: StorageConfig,
}

impl StorybotConfig {
    /// Cooldown candidates for the configured environment.
    pub fn cooldown_windows(&self) -> Vec<Duration> {
        let secs = match self.bot.environment {
            Environment::Production => &self.queue.cooldown_windows_secs,
            Environment::Development => &self.queue.dev_cooldown_windows_secs,
        };
        secs.iter().copied().map(Duration::from_secs).collect()
    }
}

/// Runtime mode. Selects the cooldown candidate set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Environment {
    #[default]
    Production,
    Development,
}

/// Process-level settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BotConfig {
    #[serde(default)]
    pub environment: Environment,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            environment: Environment::default(),
            log_level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Telegram Bot API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TelegramConfig {
    /// Bot API token. Required to serve.
    #[serde(default)]
    pub bot_token: Option<String>,

    /// Chat that receives operational notices and may restart the bot.
    #[serde(default)]
    pub admin_chat_id: i64,

    /// Hosts accepted in story permalinks.
    #[serde(default = "default_story_link_hosts")]
    pub story_link_hosts: Vec<String>,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: None,
            admin_chat_id: 0,
            story_link_hosts: default_story_link_hosts(),
        }
    }
}

fn default_story_link_hosts() -> Vec<String> {
    vec!["t.me".to_string()]
}

/// Userbot bridge configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SessionConfig {
    /// Base URL of the bridge holding the automated client session.
    #[serde(default = "default_bridge_url")]
    pub bridge_url: String,

    /// Bearer token presented to the bridge.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Per-request timeout, downloads included.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            bridge_url: default_bridge_url(),
            api_key: None,
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

fn default_bridge_url() -> String {
    "http://127.0.0.1:8790".to_string()
}

fn default_request_timeout_secs() -> u64 {
    120
}

/// Queue engine configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct QueueConfig {
    /// Cooldown candidates in production.
    #[serde(default = "default_cooldown_windows_secs")]
    pub cooldown_windows_secs: Vec<u64>,

    /// Cooldown candidates in development.
    #[serde(default = "default_dev_cooldown_windows_secs")]
    pub dev_cooldown_windows_secs: Vec<u64>,

    #[serde(default = "default_watchdog_interval_secs")]
    pub watchdog_interval_secs: u64,

    /// Maximum processing time of one task before the process is stopped.
    #[serde(default = "default_max_task_secs")]
    pub max_task_secs: u64,

    #[serde(default = "default_pinned_video_timeout_secs")]
    pub pinned_video_timeout_secs: u64,

    /// Pause after every download attempt.
    #[serde(default = "default_download_delay_ms")]
    pub download_delay_ms: u64,

    /// Pause between story listing requests.
    #[serde(default = "default_fetch_delay_ms")]
    pub fetch_delay_ms: u64,

    /// Pinned stories delivered per page.
    #[serde(default = "default_pinned_page_size")]
    pub pinned_page_size: usize,

    /// Largest single item that is uploaded.
    #[serde(default = "default_item_limit_mb")]
    pub item_limit_mb: u64,

    /// Largest cumulative size of one album.
    #[serde(default = "default_album_limit_mb")]
    pub album_limit_mb: u64,

    #[serde(default = "default_album_max_items")]
    pub album_max_items: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            cooldown_windows_secs: default_cooldown_windows_secs(),
            dev_cooldown_windows_secs: default_dev_cooldown_windows_secs(),
            watchdog_interval_secs: default_watchdog_interval_secs(),
            max_task_secs: default_max_task_secs(),
            pinned_video_timeout_secs: default_pinned_video_timeout_secs(),
            download_delay_ms: default_download_delay_ms(),
            fetch_delay_ms: default_fetch_delay_ms(),
            pinned_page_size: default_pinned_page_size(),
            item_limit_mb: default_item_limit_mb(),
            album_limit_mb: default_album_limit_mb(),
            album_max_items: default_album_max_items(),
        }
    }
}

fn default_cooldown_windows_secs() -> Vec<u64> {
    vec![240, 300, 360]
}

fn default_dev_cooldown_windows_secs() -> Vec<u64> {
    vec![2, 3, 5]
}

fn default_watchdog_interval_secs() -> u64 {
    30
}

fn default_max_task_secs() -> u64 {
    420
}

fn default_pinned_video_timeout_secs() -> u64 {
    30
}

fn default_download_delay_ms() -> u64 {
    1000
}

fn default_fetch_delay_ms() -> u64 {
    1000
}

fn default_pinned_page_size() -> usize {
    5
}

fn default_item_limit_mb() -> u64 {
    49
}

fn default_album_limit_mb() -> u64 {
    50
}

fn default_album_max_items() -> usize {
    10
}

/// User database configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("storybot").join("storybot.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("storybot.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_wal_mode() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn environment_selects_cooldown_set() {
        let mut config = StorybotConfig::default();
        assert_eq!(
            config.cooldown_windows(),
            vec![
                Duration::from_secs(240),
                Duration::from_secs(300),
                Duration::from_secs(360)
            ]
        );

        config.bot.environment = Environment::Development;
        assert_eq!(config.cooldown_windows()[0], Duration::from_secs(2));
    }

    #[test]
    fn environment_parses_lowercase() {
        let config: StorybotConfig = toml::from_str("[bot]\nenvironment = \"development\"\n").unwrap();
        assert_eq!(config.bot.environment, Environment::Development);
        assert_eq!(config.bot.environment.to_string(), "development");
    }

    #[test]
    fn queue_deny_unknown_fields() {
        let result = toml::from_str::<StorybotConfig>("[queue]\npage_size = 3\n");
        assert!(result.is_err());
    }
}
