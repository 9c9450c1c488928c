// SPDX-FileCopyrightText: 2026 Storybot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The queue engine actor.
//!
//! A single task owns the [`TaskQueue`] and consumes [`Command`]s from an
//! `mpsc` channel. Fetch and delivery run as spawned jobs that report back
//! through the same channel, so every state transition happens on the actor.
//! A watchdog interval in the same loop stops the engine with
//! [`StorybotError::TaskStuck`] when the active task runs for too long.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};

use storybot_core::{
    ChatId, ChatTransport, SendOptions, SharedSession, StorySource, StorybotError, UserStore,
};

use crate::cooldown::CooldownPolicy;
use crate::delivery::DeliveryService;
use crate::fetch::{FetchOutcome, FetchService};
use crate::messages;
use crate::notify::AdminNotifier;
use crate::settings::QueueSettings;
use crate::state::{Admission, QueueSnapshot, TaskQueue, WaitReason};
use crate::task::{Task, TaskId};

const COMMAND_BUFFER: usize = 256;

#[derive(Debug)]
enum Command {
    Submit(Task),
    FetchCompleted { id: TaskId, outcome: FetchOutcome },
    DeliveryCompleted { id: TaskId },
    CooldownElapsed,
    Snapshot(oneshot::Sender<QueueSnapshot>),
}

/// Cloneable handle for talking to a running [`QueueEngine`].
#[derive(Debug, Clone)]
pub struct EngineHandle {
    sender: mpsc::Sender<Command>,
}

impl EngineHandle {
    /// Hands a new task to the engine.
    pub async fn submit(&self, task: Task) -> Result<(), StorybotError> {
        self.sender
            .send(Command::Submit(task))
            .await
            .map_err(|_| StorybotError::Internal("queue engine stopped".into()))
    }

    /// Asks the engine for its current queue state.
    pub async fn snapshot(&self) -> Result<QueueSnapshot, StorybotError> {
        let (reply, response) = oneshot::channel();
        self.sender
            .send(Command::Snapshot(reply))
            .await
            .map_err(|_| StorybotError::Internal("queue engine stopped".into()))?;
        response
            .await
            .map_err(|_| StorybotError::Internal("queue engine dropped snapshot".into()))
    }
}

/// The single actor that owns the task queue.
///
/// Tasks are admitted, dispatched one at a time behind a randomized cooldown,
/// fetched and delivered on spawned jobs, and watched for overrunning the
/// maximum processing time. Everything else talks to it through
/// [`EngineHandle`].
pub struct QueueEngine {
    state: TaskQueue,
    cooldown: CooldownPolicy,
    settings: QueueSettings,
    fetch: Arc<FetchService>,
    delivery: Arc<DeliveryService>,
    notifier: AdminNotifier,
    transport: Arc<dyn ChatTransport>,
    users: Arc<dyn UserStore>,
    commands: mpsc::Receiver<Command>,
    sender: mpsc::Sender<Command>,
    jobs: TaskTracker,
    jobs_cancel: CancellationToken,
}

impl QueueEngine {
    /// Builds the engine and the handle used to feed it.
    ///
    /// Nothing happens until [`QueueEngine::run`] is awaited.
    pub fn new(
        transport: Arc<dyn ChatTransport>,
        session: Arc<SharedSession<dyn StorySource>>,
        users: Arc<dyn UserStore>,
        settings: QueueSettings,
    ) -> (Self, EngineHandle) {
        let (sender, commands) = mpsc::channel(COMMAND_BUFFER);
        let notifier = AdminNotifier::new(transport.clone(), settings.admin_chat);
        let fetch = FetchService::new(
            session.clone(),
            transport.clone(),
            notifier.clone(),
            &settings,
        );
        let delivery = DeliveryService::new(
            session,
            transport.clone(),
            notifier.clone(),
            settings.clone(),
        );

        let engine = Self {
            state: TaskQueue::new(),
            cooldown: CooldownPolicy::new(settings.cooldown_windows.clone()),
            settings,
            fetch: Arc::new(fetch),
            delivery: Arc::new(delivery),
            notifier,
            transport,
            users,
            commands,
            sender: sender.clone(),
            jobs: TaskTracker::new(),
            jobs_cancel: CancellationToken::new(),
        };
        (engine, EngineHandle { sender })
    }

    /// Replaces the cooldown policy, e.g. with a seeded one.
    pub fn with_cooldown_policy(mut self, policy: CooldownPolicy) -> Self {
        self.cooldown = policy;
        self
    }

    /// Runs until `cancel` fires or the watchdog finds a stuck task.
    pub async fn run(mut self, cancel: CancellationToken) -> Result<(), StorybotError> {
        let mut watchdog = tokio::time::interval(self.settings.watchdog_interval);
        watchdog.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately.
        watchdog.tick().await;

        info!(
            admin_chat = %self.settings.admin_chat,
            max_task_secs = self.settings.max_task_duration.as_secs(),
            "queue engine running"
        );

        let result = loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("shutdown signal received, stopping queue engine");
                    break Ok(());
                }
                Some(command) = self.commands.recv() => self.handle(command),
                _ = watchdog.tick() => {
                    if let Err(e) = self.check_stuck().await {
                        break Err(e);
                    }
                }
            }
        };

        self.jobs_cancel.cancel();
        self.jobs.close();
        self.jobs.wait().await;
        info!("queue engine stopped");
        result
    }

    fn handle(&mut self, command: Command) {
        match command {
            Command::Submit(task) => self.on_submit(task),
            Command::FetchCompleted { id, outcome } => self.on_fetch_completed(id, outcome),
            Command::DeliveryCompleted { id } => self.finish(id),
            Command::CooldownElapsed => {
                debug!("cooldown elapsed");
                self.state.clear_cooldown();
                self.dispatch_next();
            }
            Command::Snapshot(reply) => {
                let _ = reply.send(self.state.snapshot(Instant::now()));
            }
        }
    }

    fn on_submit(&mut self, task: Task) {
        let chat = task.chat_id;
        let profile = if task.is_continuation() {
            None
        } else {
            task.user.clone()
        };

        match self.state.submit(task, Instant::now()) {
            Admission::Duplicate => {
                info!(chat_id = %chat, "chat already has a task, request rejected");
                self.tell(chat, messages::ONE_LINK_AT_ONCE.to_string());
                return;
            }
            Admission::Ready(id) => debug!(%id, chat_id = %chat, "task queued"),
            Admission::Waiting(id, reason) => {
                debug!(%id, chat_id = %chat, ?reason, "task queued behind others");
                let text = match reason {
                    WaitReason::Cooldown { remaining } => messages::cooldown_wait(remaining),
                    WaitReason::Position { ahead } => messages::queue_position(ahead),
                };
                self.tell(chat, text);
            }
        }

        if let Some(user) = profile {
            let users = self.users.clone();
            self.spawn_job(async move {
                match users.save_if_absent(&user).await {
                    Ok(true) => debug!(user_id = user.id, "new user recorded"),
                    Ok(false) => {}
                    Err(e) => warn!(user_id = user.id, error = %e, "failed to record user"),
                }
            });
        }

        self.dispatch_next();
    }

    fn dispatch_next(&mut self) {
        if !self.state.can_dispatch() {
            return;
        }
        let window = self.cooldown.next_window();
        let Some((id, task)) = self.state.dispatch(Instant::now(), window) else {
            return;
        };
        info!(
            %id,
            chat_id = %task.chat_id,
            link = task.link.as_str(),
            kind = %task.kind,
            cooldown_secs = window.as_secs(),
            "task dispatched"
        );

        let sender = self.sender.clone();
        self.spawn_job(async move {
            tokio::time::sleep(window).await;
            let _ = sender.send(Command::CooldownElapsed).await;
        });

        let fetch = self.fetch.clone();
        let sender = self.sender.clone();
        self.spawn_job(async move {
            let outcome = fetch.fetch(&task).await;
            let _ = sender.send(Command::FetchCompleted { id, outcome }).await;
        });
    }

    fn on_fetch_completed(&mut self, id: TaskId, outcome: FetchOutcome) {
        let Some(active) = self.state.active().filter(|a| a.id == id) else {
            debug!(%id, "ignoring fetch result of a task that is no longer active");
            return;
        };
        let task = active.task.clone();

        match outcome {
            FetchOutcome::Failure(text) => {
                info!(%id, chat_id = %task.chat_id, reason = text.as_str(), "task failed");
                let transport = self.transport.clone();
                let notifier = self.notifier.clone();
                let failed = task.clone();
                self.spawn_job(async move {
                    if let Err(e) = transport
                        .send_message(failed.chat_id, &text, SendOptions::quiet())
                        .await
                    {
                        warn!(
                            chat_id = %failed.chat_id,
                            error = %e,
                            "failed to send error message"
                        );
                    }
                    notifier.error(&failed, &text).await;
                });
                self.finish(id);
            }
            FetchOutcome::Stories(set) => {
                let delivery = self.delivery.clone();
                let sender = self.sender.clone();
                self.spawn_job(async move {
                    delivery.deliver(&task, set).await;
                    let _ = sender.send(Command::DeliveryCompleted { id }).await;
                });
            }
        }
    }

    /// Frees the active slot, removes status messages and dispatches the next task.
    fn finish(&mut self, id: TaskId) {
        let Some(task) = self.state.complete(id) else {
            debug!(%id, "ignoring completion of a task that is no longer active");
            return;
        };
        info!(%id, chat_id = %task.chat_id, "task done");

        let transport = self.transport.clone();
        self.spawn_job(async move {
            for message in task.status_messages.drain().await {
                if let Err(e) = transport.delete_message(task.chat_id, message).await {
                    debug!(error = %e, "failed to delete status message");
                }
            }
        });

        self.dispatch_next();
    }

    async fn check_stuck(&self) -> Result<(), StorybotError> {
        let Some((task, elapsed)) = self
            .state
            .stuck(Instant::now(), self.settings.max_task_duration)
        else {
            return Ok(());
        };

        error!(
            chat_id = %task.chat_id,
            link = task.link.as_str(),
            elapsed_secs = elapsed.as_secs(),
            "task exceeded the processing limit, stopping"
        );
        self.notifier.task_stuck(task, elapsed).await;
        Err(StorybotError::TaskStuck {
            chat_id: task.chat_id.0,
            elapsed,
        })
    }

    /// Sends a plain notice to a requester without blocking the actor.
    fn tell(&self, chat: ChatId, text: String) {
        let transport = self.transport.clone();
        self.spawn_job(async move {
            if let Err(e) = transport.send_message(chat, &text, SendOptions::quiet()).await {
                warn!(chat_id = %chat, error = %e, "failed to send notice");
            }
        });
    }

    fn spawn_job<F>(&self, job: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let cancel = self.jobs_cancel.clone();
        self.jobs.spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => {}
                _ = job => {}
            }
        });
    }
}
