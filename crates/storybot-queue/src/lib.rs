// SPDX-FileCopyrightText: 2026 Storybot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Story request queue for Storybot.
//!
//! The [`QueueEngine`] serializes story requests: at most one task is active
//! at a time and consecutive dispatches are separated by a randomized
//! cooldown. A dispatched task is looked up by the [`FetchService`] and
//! uploaded by the [`DeliveryService`]; both report to the admin chat through
//! the [`AdminNotifier`]. [`InboundRouter`] turns chat events into tasks.

pub mod cooldown;
pub mod delivery;
pub mod engine;
pub mod fetch;
pub mod intake;
pub mod media;
pub mod messages;
pub mod notify;
pub mod router;
pub mod settings;
pub mod shutdown;
pub mod state;
pub mod task;

pub use cooldown::CooldownPolicy;
pub use delivery::DeliveryService;
pub use engine::{EngineHandle, QueueEngine};
pub use fetch::{FetchOutcome, FetchService, StorySet};
pub use notify::AdminNotifier;
pub use router::InboundRouter;
pub use settings::QueueSettings;
pub use shutdown::install_signal_handler;
pub use state::{Admission, QueueSnapshot, TaskQueue, WaitReason};
pub use task::{StatusMessages, Task, TaskId};
