// SPDX-FileCopyrightText: 2026 Storybot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Queue bookkeeping without any I/O.
//!
//! [`TaskQueue`] owns the FIFO of waiting tasks, the active slot and the
//! cooldown gate. The engine drives it with explicit timestamps, which keeps
//! every transition deterministic and easy to test.

use std::collections::VecDeque;
use std::time::Duration;

use tokio::time::Instant;

use storybot_core::ChatId;

use crate::task::{Task, TaskId};

/// Why a freshly queued task cannot start right away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitReason {
    /// The global cooldown is still running.
    Cooldown { remaining: Duration },
    /// `ahead` tasks will be served first.
    Position { ahead: usize },
}

/// Result of [`TaskQueue::submit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// The chat already has a queued or active task; nothing was enqueued.
    Duplicate,
    /// Enqueued and eligible for the next dispatch check.
    Ready(TaskId),
    /// Enqueued behind a running task, other tasks or the cooldown.
    Waiting(TaskId, WaitReason),
}

#[derive(Debug)]
pub struct ActiveTask {
    pub id: TaskId,
    pub task: Task,
    pub dispatched_at: Instant,
}

/// Read-only view of the queue for diagnostics and tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueSnapshot {
    pub queued: Vec<ChatId>,
    pub active: Option<ChatId>,
    pub running: bool,
    pub cooldown_remaining: Option<Duration>,
}

#[derive(Debug, Default)]
pub struct TaskQueue {
    queue: VecDeque<(TaskId, Task)>,
    active: Option<ActiveTask>,
    running: bool,
    cooldown_until: Option<Instant>,
    next_id: u64,
}

impl TaskQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if `chat` has a queued or active task.
    pub fn contains_chat(&self, chat: ChatId) -> bool {
        self.active.as_ref().is_some_and(|a| a.task.chat_id == chat)
            || self.queue.iter().any(|(_, t)| t.chat_id == chat)
    }

    /// Appends `task` unless its chat is already being served.
    pub fn submit(&mut self, task: Task, now: Instant) -> Admission {
        if self.contains_chat(task.chat_id) {
            return Admission::Duplicate;
        }

        self.next_id += 1;
        let id = TaskId(self.next_id);
        self.queue.push_back((id, task));

        if let Some(until) = self.cooldown_until {
            let remaining = until.saturating_duration_since(now);
            return Admission::Waiting(id, WaitReason::Cooldown { remaining });
        }

        let ahead = self.queue.len() - 1 + usize::from(self.running);
        if ahead > 0 {
            Admission::Waiting(id, WaitReason::Position { ahead })
        } else {
            Admission::Ready(id)
        }
    }

    /// Returns `true` when the head of the queue may be dispatched.
    pub fn can_dispatch(&self) -> bool {
        !self.running && self.cooldown_until.is_none() && !self.queue.is_empty()
    }

    /// Moves the queue head into the active slot and starts a cooldown of
    /// `cooldown`. Returns `None` when dispatching is not allowed.
    pub fn dispatch(&mut self, now: Instant, cooldown: Duration) -> Option<(TaskId, Task)> {
        if !self.can_dispatch() {
            return None;
        }
        let (id, task) = self.queue.pop_front()?;
        self.active = Some(ActiveTask {
            id,
            task: task.clone(),
            dispatched_at: now,
        });
        self.running = true;
        self.cooldown_until = Some(now + cooldown);
        Some((id, task))
    }

    /// Frees the active slot if it still holds `id`.
    ///
    /// Returns the finished task, or `None` for a stale signal.
    pub fn complete(&mut self, id: TaskId) -> Option<Task> {
        if self.active_id() != Some(id) {
            return None;
        }
        self.running = false;
        self.active.take().map(|a| a.task)
    }

    /// Reopens the dispatch gate once the cooldown window has elapsed.
    pub fn clear_cooldown(&mut self) {
        self.cooldown_until = None;
    }

    /// The task holding the processing slot, if any.
    pub fn active(&self) -> Option<&ActiveTask> {
        self.active.as_ref()
    }

    pub fn active_id(&self) -> Option<TaskId> {
        self.active.as_ref().map(|a| a.id)
    }

    /// Returns the active task if it has been running for at least `max`.
    ///
    /// Elapsed time counts from dispatch, not from `Task::created_at`, so time
    /// spent waiting in the queue never counts against a task.
    pub fn stuck(&self, now: Instant, max: Duration) -> Option<(&Task, Duration)> {
        let active = self.active.as_ref()?;
        let elapsed = now.saturating_duration_since(active.dispatched_at);
        (elapsed >= max).then_some((&active.task, elapsed))
    }

    /// Number of waiting tasks, excluding the active one.
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Point-in-time view for status queries and tests.
    pub fn snapshot(&self, now: Instant) -> QueueSnapshot {
        QueueSnapshot {
            queued: self.queue.iter().map(|(_, t)| t.chat_id).collect(),
            active: self.active.as_ref().map(|a| a.task.chat_id),
            running: self.running,
            cooldown_remaining: self
                .cooldown_until
                .map(|until| until.saturating_duration_since(now)),
        }
    }
}
