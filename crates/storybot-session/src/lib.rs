// SPDX-FileCopyrightText: 2026 Storybot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Automated-session binding for Storybot.
//!
//! Talks to a userbot bridge over HTTP and exposes it as a
//! [`StorySource`](storybot_core::StorySource).

pub mod client;
pub mod types;

pub use client::BridgeClient;
