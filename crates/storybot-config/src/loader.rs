// SPDX-FileCopyrightText: 2026 Storybot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Lookup order: `./storybot.toml` > `~/.config/storybot/storybot.toml` >
//! `/etc/storybot/storybot.toml`, with `STORYBOT_` environment overrides on top.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::StorybotConfig;

pub(crate) const SYSTEM_CONFIG: &str = "/etc/storybot/storybot.toml";
pub(crate) const LOCAL_CONFIG: &str = "storybot.toml";

/// Section names recognised in `STORYBOT_<SECTION>_<KEY>` variables.
const SECTIONS: &[&str] = &["bot", "telegram", "session", "queue", "storage"];

pub(crate) fn user_config_path() -> PathBuf {
    dirs::config_dir()
        .map(|d| d.join("storybot/storybot.toml"))
        .unwrap_or_default()
}

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/storybot/storybot.toml`
/// 3. `~/.config/storybot/storybot.toml`
/// 4. `./storybot.toml`
/// 5. `STORYBOT_*` environment variables
pub fn load_config() -> Result<StorybotConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no file lookup, no env).
pub fn load_config_from_str(toml_content: &str) -> Result<StorybotConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(StorybotConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<StorybotConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(StorybotConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used for config loading, before extraction.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(StorybotConfig::default()))
        .merge(Toml::file(SYSTEM_CONFIG))
        .merge(Toml::file(user_config_path()))
        .merge(Toml::file(LOCAL_CONFIG))
        .merge(env_provider())
}

/// Maps `STORYBOT_TELEGRAM_BOT_TOKEN` to `telegram.bot_token`.
///
/// Only the first underscore after a known section name becomes a dot, so
/// keys that contain underscores stay intact.
fn env_provider() -> Env {
    Env::prefixed("STORYBOT_").map(|key| map_env_key(key.as_str()).into())
}

pub(crate) fn map_env_key(key: &str) -> String {
    for section in SECTIONS {
        if let Some(rest) = key
            .strip_prefix(section)
            .and_then(|rest| rest.strip_prefix('_'))
        {
            return format!("{section}.{rest}");
        }
    }
    key.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_keys_split_on_section_only() {
        assert_eq!(map_env_key("telegram_bot_token"), "telegram.bot_token");
        assert_eq!(map_env_key("queue_max_task_secs"), "queue.max_task_secs");
        assert_eq!(map_env_key("storage_wal_mode"), "storage.wal_mode");
        assert_eq!(map_env_key("unrelated"), "unrelated");
    }

    #[test]
    fn env_overrides_file_values() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "storybot.toml",
                "[telegram]\nadmin_chat_id = 5\n[queue]\nmax_task_secs = 100\n",
            )?;
            jail.set_env("STORYBOT_QUEUE_MAX_TASK_SECS", "60");
            jail.set_env("STORYBOT_TELEGRAM_BOT_TOKEN", "1:abc");

            let config = load_config_from_path(Path::new("storybot.toml"))?;
            assert_eq!(config.telegram.admin_chat_id, 5);
            assert_eq!(config.queue.max_task_secs, 60);
            assert_eq!(config.telegram.bot_token.as_deref(), Some("1:abc"));
            Ok(())
        });
    }
}
