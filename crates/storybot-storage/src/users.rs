// SPDX-FileCopyrightText: 2026 Storybot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of [`UserStore`].

use async_trait::async_trait;
use rusqlite::params;
use tokio::sync::OnceCell;
use tracing::debug;

use storybot_config::model::StorageConfig;
use storybot_core::{
    AdapterType, HealthStatus, PluginAdapter, StorybotError, UserProfile, UserStore,
};

use crate::database::{Database, map_tr_err};

/// SQLite-backed user store.
///
/// The database is opened lazily on first use, so constructing the store
/// never touches the filesystem.
pub struct SqliteUserStore {
    config: StorageConfig,
    db: OnceCell<Database>,
}

impl SqliteUserStore {
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            db: OnceCell::new(),
        }
    }

    /// Wraps an already opened database.
    pub fn with_database(config: StorageConfig, db: Database) -> Self {
        Self {
            config,
            db: OnceCell::new_with(Some(db)),
        }
    }

    async fn db(&self) -> Result<&Database, StorybotError> {
        self.db
            .get_or_try_init(|| Database::open(&self.config.database_path, self.config.wal_mode))
            .await
    }

    /// Loads a stored profile, if any.
    pub async fn get(&self, id: i64) -> Result<Option<UserProfile>, StorybotError> {
        self.db()
            .await?
            .connection()
            .call(move |conn| -> Result<Option<String>, rusqlite::Error> {
                let result = conn.query_row(
                    "SELECT profile FROM users WHERE id = ?1",
                    params![id],
                    |row| row.get(0),
                );
                match result {
                    Ok(profile) => Ok(Some(profile)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e),
                }
            })
            .await
            .map_err(map_tr_err)?
            .map(|json| {
                serde_json::from_str(&json).map_err(|e| StorybotError::Storage {
                    source: Box::new(e),
                })
            })
            .transpose()
    }

    pub async fn count(&self) -> Result<i64, StorybotError> {
        self.db()
            .await?
            .connection()
            .call(|conn| -> Result<i64, rusqlite::Error> {
                conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))
            })
            .await
            .map_err(map_tr_err)
    }
}

#[async_trait]
impl PluginAdapter for SqliteUserStore {
    fn name(&self) -> &str {
        "sqlite-users"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, StorybotError> {
        self.db()
            .await?
            .connection()
            .call(|conn| -> Result<(), rusqlite::Error> { conn.execute_batch("SELECT 1;") })
            .await
            .map_err(map_tr_err)?;
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), StorybotError> {
        if let Some(db) = self.db.get()
            && self.config.wal_mode
        {
            db.checkpoint().await?;
        }
        Ok(())
    }
}

#[async_trait]
impl UserStore for SqliteUserStore {
    async fn save_if_absent(&self, user: &UserProfile) -> Result<bool, StorybotError> {
        let profile = serde_json::to_string(user).map_err(|e| StorybotError::Storage {
            source: Box::new(e),
        })?;
        let user_id = user.id;
        let user = user.clone();
        let created_at = chrono::Utc::now().to_rfc3339();

        let inserted = self
            .db()
            .await?
            .connection()
            .call(move |conn| -> Result<usize, rusqlite::Error> {
                conn.execute(
                    "INSERT INTO users (id, is_bot, first_name, last_name, username, language_code, profile, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                     ON CONFLICT(id) DO NOTHING",
                    params![
                        user.id,
                        user.is_bot,
                        user.first_name,
                        user.last_name,
                        user.username,
                        user.language_code,
                        profile,
                        created_at,
                    ],
                )
            })
            .await
            .map_err(map_tr_err)?;

        debug!(user_id, inserted = inserted > 0, "user record checked");
        Ok(inserted > 0)
    }
}
