// SPDX-FileCopyrightText: 2026 Storybot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.

use crate::diagnostic::ConfigError;
use crate::model::StorybotConfig;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Validate a deserialized configuration for semantic correctness.
///
/// Collects every failure instead of stopping at the first one.
pub fn validate_config(config: &StorybotConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();
    let mut fail = |message: String| errors.push(ConfigError::Validation { message });

    if !LOG_LEVELS.contains(&config.bot.log_level.as_str()) {
        fail(format!(
            "bot.log_level `{}` must be one of {}",
            config.bot.log_level,
            LOG_LEVELS.join(", ")
        ));
    }

    match config.telegram.bot_token.as_deref() {
        Some(token) if !token.trim().is_empty() => {}
        _ => fail("telegram.bot_token must be set".to_string()),
    }

    if config.telegram.admin_chat_id == 0 {
        fail("telegram.admin_chat_id must be a non-zero chat id".to_string());
    }

    if config.telegram.story_link_hosts.is_empty() {
        fail("telegram.story_link_hosts must list at least one host".to_string());
    }

    match url::Url::parse(&config.session.bridge_url) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => {}
        Ok(url) => fail(format!(
            "session.bridge_url must use http or https, got `{}`",
            url.scheme()
        )),
        Err(e) => fail(format!(
            "session.bridge_url `{}` is not a valid URL: {e}",
            config.session.bridge_url
        )),
    }

    if config.session.request_timeout_secs == 0 {
        fail("session.request_timeout_secs must be greater than 0".to_string());
    }

    let queue = &config.queue;
    if queue.cooldown_windows_secs.is_empty() {
        fail("queue.cooldown_windows_secs must not be empty".to_string());
    }
    if queue.dev_cooldown_windows_secs.is_empty() {
        fail("queue.dev_cooldown_windows_secs must not be empty".to_string());
    }
    if queue.watchdog_interval_secs == 0 {
        fail("queue.watchdog_interval_secs must be greater than 0".to_string());
    }
    if queue.max_task_secs < queue.watchdog_interval_secs {
        fail(format!(
            "queue.max_task_secs ({}) must be at least queue.watchdog_interval_secs ({})",
            queue.max_task_secs, queue.watchdog_interval_secs
        ));
    }
    if !(1..=10).contains(&queue.pinned_page_size) {
        fail(format!(
            "queue.pinned_page_size must be between 1 and 10, got {}",
            queue.pinned_page_size
        ));
    }
    if !(1..=10).contains(&queue.album_max_items) {
        fail(format!(
            "queue.album_max_items must be between 1 and 10, got {}",
            queue.album_max_items
        ));
    }
    if queue.item_limit_mb == 0 {
        fail("queue.item_limit_mb must be greater than 0".to_string());
    }
    if queue.album_limit_mb < queue.item_limit_mb {
        fail(format!(
            "queue.album_limit_mb ({}) must be at least queue.item_limit_mb ({})",
            queue.album_limit_mb, queue.item_limit_mb
        ));
    }

    if config.storage.database_path.trim().is_empty() {
        fail("storage.database_path must not be empty".to_string());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> StorybotConfig {
        let mut config = StorybotConfig::default();
        config.telegram.bot_token = Some("123:ABC".to_string());
        config.telegram.admin_chat_id = 777;
        config
    }

    fn has_message(errors: &[ConfigError], needle: &str) -> bool {
        errors
            .iter()
            .any(|e| matches!(e, ConfigError::Validation { message } if message.contains(needle)))
    }

    #[test]
    fn minimal_config_validates() {
        assert!(validate_config(&valid()).is_ok());
    }

    #[test]
    fn defaults_require_token_and_admin() {
        let errors = validate_config(&StorybotConfig::default()).unwrap_err();
        assert!(has_message(&errors, "bot_token"));
        assert!(has_message(&errors, "admin_chat_id"));
    }

    #[test]
    fn empty_cooldown_set_fails() {
        let mut config = valid();
        config.queue.cooldown_windows_secs.clear();
        let errors = validate_config(&config).unwrap_err();
        assert!(has_message(&errors, "cooldown_windows_secs"));
    }

    #[test]
    fn page_size_out_of_range_fails() {
        let mut config = valid();
        config.queue.pinned_page_size = 0;
        assert!(has_message(
            &validate_config(&config).unwrap_err(),
            "pinned_page_size"
        ));
        config.queue.pinned_page_size = 11;
        assert!(has_message(
            &validate_config(&config).unwrap_err(),
            "pinned_page_size"
        ));
    }

    #[test]
    fn album_limit_below_item_limit_fails() {
        let mut config = valid();
        config.queue.album_limit_mb = 10;
        assert!(has_message(
            &validate_config(&config).unwrap_err(),
            "album_limit_mb"
        ));
    }

    #[test]
    fn non_http_bridge_url_fails() {
        let mut config = valid();
        config.session.bridge_url = "ftp://bridge".to_string();
        assert!(has_message(&validate_config(&config).unwrap_err(), "bridge_url"));
        config.session.bridge_url = "not a url".to_string();
        assert!(has_message(&validate_config(&config).unwrap_err(), "bridge_url"));
    }

    #[test]
    fn unknown_log_level_fails() {
        let mut config = valid();
        config.bot.log_level = "loud".to_string();
        assert!(has_message(&validate_config(&config).unwrap_err(), "log_level"));
    }

    #[test]
    fn all_errors_are_collected() {
        let mut config = StorybotConfig::default();
        config.storage.database_path = " ".to_string();
        config.queue.watchdog_interval_secs = 0;
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.len() >= 4);
    }
}
