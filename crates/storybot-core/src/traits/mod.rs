// SPDX-FileCopyrightText: 2026 Storybot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Collaborator trait definitions.
//!
//! All collaborators extend the [`PluginAdapter`] base trait and use
//! `#[async_trait]` so they can be held as trait objects.

pub mod adapter;
pub mod channel;
pub mod session;
pub mod storage;

pub use adapter::PluginAdapter;
pub use channel::ChatTransport;
pub use session::StorySource;
pub use storage::UserStore;
