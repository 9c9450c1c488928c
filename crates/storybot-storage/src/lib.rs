// SPDX-FileCopyrightText: 2026 Storybot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence for Storybot.
//!
//! Records every user who submits a request. Writes go through a single
//! `tokio-rusqlite` connection; the schema is managed by embedded refinery
//! migrations.

pub mod database;
pub mod migrations;
pub mod users;

pub use database::Database;
pub use users::SqliteUserStore;
