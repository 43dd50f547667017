// SPDX-FileCopyrightText: 2026 Chatrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Queue worker loop.
//!
//! Drains the task queue one task at a time: drops tasks whose reply window has
//! closed, generates replies for the rest, and delivers them through the reply
//! transport. Per-task failures are logged and never stop the loop.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chatrelay_config::model::{DeliveryMode, WorkerConfig};
use chatrelay_core::{QueuedTask, RelayError, ReplyTransport, Task, TaskQueue};
use chrono::Utc;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::generator::ResponseGenerator;

/// States of the worker FSM.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    /// Blocked on the queue.
    Waiting,
    /// A task was taken off the queue.
    Dequeued,
    /// The task was too old to answer and was discarded.
    ExpiredDrop,
    /// Running the dispatcher or generator.
    Processing,
    Delivered,
    DeliveryFailed,
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkerState::Waiting => write!(f, "waiting"),
            WorkerState::Dequeued => write!(f, "dequeued"),
            WorkerState::ExpiredDrop => write!(f, "expired_drop"),
            WorkerState::Processing => write!(f, "processing"),
            WorkerState::Delivered => write!(f, "delivered"),
            WorkerState::DeliveryFailed => write!(f, "delivery_failed"),
        }
    }
}

/// How a single task ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskOutcome {
    Delivered,
    Expired,
    DeliveryFailed,
}

/// Counters returned by [`WorkerLoop::run`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerStats {
    pub delivered: u64,
    pub expired: u64,
    pub failed: u64,
}

impl WorkerStats {
    fn record(&mut self, outcome: TaskOutcome) {
        match outcome {
            TaskOutcome::Delivered => self.delivered += 1,
            TaskOutcome::Expired => self.expired += 1,
            TaskOutcome::DeliveryFailed => self.failed += 1,
        }
    }
}

pub struct WorkerLoop {
    queue: Arc<dyn TaskQueue>,
    generator: Arc<ResponseGenerator>,
    transport: Arc<dyn ReplyTransport>,
    config: WorkerConfig,
    fallback_message: String,
    state: watch::Sender<WorkerState>,
}

impl WorkerLoop {
    pub fn new(
        queue: Arc<dyn TaskQueue>,
        generator: Arc<ResponseGenerator>,
        transport: Arc<dyn ReplyTransport>,
        config: WorkerConfig,
        fallback_message: impl Into<String>,
    ) -> Self {
        let (state, _) = watch::channel(WorkerState::Waiting);
        Self {
            queue,
            generator,
            transport,
            config,
            fallback_message: fallback_message.into(),
            state,
        }
    }

    pub fn state(&self) -> WorkerState {
        *self.state.borrow()
    }

    /// Receiver that observes every state transition.
    pub fn subscribe(&self) -> watch::Receiver<WorkerState> {
        self.state.subscribe()
    }

    fn set_state(&self, state: WorkerState) {
        self.state.send_replace(state);
    }

    /// Runs until `cancel` fires. Cancellation is observed between tasks only.
    pub async fn run(&self, cancel: CancellationToken) -> WorkerStats {
        info!(delivery = ?self.config.delivery, "worker loop running");
        let mut stats = WorkerStats::default();

        while !cancel.is_cancelled() {
            self.set_state(WorkerState::Waiting);
            match self.queue.dequeue(self.config.dequeue_wait()).await {
                Ok(Some(queued)) => {
                    let outcome = self.process_task(queued).await;
                    stats.record(outcome);
                }
                Ok(None) => {}
                Err(e) => {
                    error!(error = %e, "dequeue failed, backing off");
                    tokio::select! {
                        _ = cancel.cancelled() => {}
                        _ = tokio::time::sleep(self.config.error_backoff()) => {}
                    }
                }
            }
        }

        self.set_state(WorkerState::Waiting);
        info!(
            delivered = stats.delivered,
            expired = stats.expired,
            failed = stats.failed,
            "worker loop stopped"
        );
        stats
    }

    /// Handles one dequeued task end to end and acknowledges it.
    pub async fn process_task(&self, queued: QueuedTask) -> TaskOutcome {
        self.set_state(WorkerState::Dequeued);
        let QueuedTask { id, task } = queued;
        let age = task.age(Utc::now());

        let outcome = if age > self.config.expiry() {
            self.set_state(WorkerState::ExpiredDrop);
            warn!(
                user_id = %task.user_id,
                queue_entry = id,
                age_secs = age.as_secs(),
                "dropping expired task"
            );
            TaskOutcome::Expired
        } else {
            self.handle(&task, id, age).await
        };

        if let Err(e) = self.queue.ack(id).await {
            error!(queue_entry = id, error = %e, "failed to acknowledge task");
        }
        outcome
    }

    async fn handle(&self, task: &Task, id: i64, age: Duration) -> TaskOutcome {
        self.set_state(WorkerState::Processing);
        debug!(
            user_id = %task.user_id,
            queue_entry = id,
            age_secs = age.as_secs(),
            "processing task"
        );

        let reply = self.generator.respond(&task.user_id, &task.message).await;

        match self.deliver(task, &reply).await {
            Ok(()) => {
                self.set_state(WorkerState::Delivered);
                info!(user_id = %task.user_id, queue_entry = id, "reply delivered");
                TaskOutcome::Delivered
            }
            Err(e) => {
                self.set_state(WorkerState::DeliveryFailed);
                error!(
                    user_id = %task.user_id,
                    queue_entry = id,
                    error = %e,
                    "reply delivery failed"
                );
                if let Err(e) = self.deliver(task, &self.fallback_message).await {
                    warn!(user_id = %task.user_id, error = %e, "fallback delivery failed");
                }
                TaskOutcome::DeliveryFailed
            }
        }
    }

    async fn deliver(&self, task: &Task, text: &str) -> Result<(), RelayError> {
        match self.config.delivery {
            DeliveryMode::Push => self.transport.push(&task.user_id, text).await,
            DeliveryMode::Reply => self.transport.reply(&task.reply_token, text).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatrelay_core::HistoryStore;
    use chatrelay_storage::InMemoryStore;
    use chatrelay_test_utils::{
        FailingStore, MockOutcome, MockProvider, MockTransport, MockWeather, SendKind,
    };
    use tracing_test::traced_test;

    use crate::dispatcher::CommandDispatcher;
    use crate::generator::GeneratorConfig;
    use crate::history::ConversationHistory;

    const FALLBACK: &str = "fallback";

    struct Fixture {
        store: Arc<InMemoryStore>,
        provider: Arc<MockProvider>,
        transport: Arc<MockTransport>,
        worker: WorkerLoop,
    }

    fn fixture(config: WorkerConfig, queue: Option<Arc<dyn TaskQueue>>) -> Fixture {
        let store = Arc::new(InMemoryStore::default());
        let provider = Arc::new(MockProvider::new());
        let transport = Arc::new(MockTransport::new());
        let history = ConversationHistory::new(store.clone());
        let dispatcher = CommandDispatcher::new(
            history.clone(),
            store.clone(),
            Arc::new(MockWeather::new()),
            vec!["weather".into()],
        );
        let generator = Arc::new(ResponseGenerator::new(
            dispatcher,
            provider.clone(),
            history,
            store.clone(),
            GeneratorConfig::default(),
        ));
        let queue = queue.unwrap_or_else(|| store.clone() as Arc<dyn TaskQueue>);
        let worker = WorkerLoop::new(queue, generator, transport.clone(), config, FALLBACK);
        Fixture {
            store,
            provider,
            transport,
            worker,
        }
    }

    fn aged_task(user: &str, text: &str, age_secs: i64) -> Task {
        let mut task = Task::new(user, text, "rt-1");
        task.enqueued_at = Utc::now() - chrono::TimeDelta::seconds(age_secs);
        task
    }

    async fn enqueue_and_take(store: &InMemoryStore, task: &Task) -> QueuedTask {
        store.enqueue(task).await.unwrap();
        store.dequeue(Duration::ZERO).await.unwrap().unwrap()
    }

    #[tokio::test]
    async fn fresh_task_is_answered_and_acked() {
        let f = fixture(WorkerConfig::default(), None);
        f.provider.push_outcome(MockOutcome::Reply("hello back".into())).await;
        let queued = enqueue_and_take(&f.store, &aged_task("U1", "hello", 5)).await;

        let outcome = f.worker.process_task(queued).await;

        assert_eq!(outcome, TaskOutcome::Delivered);
        assert_eq!(f.worker.state(), WorkerState::Delivered);
        let sent = f.transport.sent().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].kind, SendKind::Push);
        assert_eq!(sent[0].target, "U1");
        assert_eq!(sent[0].text, "hello back");
        assert_eq!(f.store.recent("U1", 10).await.unwrap().len(), 1);
        assert_eq!(f.store.len().await.unwrap(), 0);
    }

    #[tokio::test]
    #[traced_test]
    async fn expired_task_is_dropped_silently() {
        let f = fixture(WorkerConfig::default(), None);
        let queued = enqueue_and_take(&f.store, &aged_task("U1", "hello", 1750)).await;

        let outcome = f.worker.process_task(queued).await;

        assert_eq!(outcome, TaskOutcome::Expired);
        assert_eq!(f.worker.state(), WorkerState::ExpiredDrop);
        assert!(f.transport.sent().await.is_empty());
        assert_eq!(f.transport.attempts(), 0);
        assert_eq!(f.provider.call_count().await, 0);
        assert!(f.store.recent("U1", 10).await.unwrap().is_empty());
        assert_eq!(f.store.len().await.unwrap(), 0);
        assert!(logs_contain("dropping expired task"));
    }

    #[tokio::test]
    async fn reply_mode_uses_reply_token() {
        let config = WorkerConfig {
            delivery: DeliveryMode::Reply,
            ..WorkerConfig::default()
        };
        let f = fixture(config, None);
        let queued = enqueue_and_take(&f.store, &aged_task("U1", "/help", 1)).await;

        f.worker.process_task(queued).await;

        let sent = f.transport.sent().await;
        assert_eq!(sent[0].kind, SendKind::Reply);
        assert_eq!(sent[0].target, "rt-1");
        assert!(sent[0].text.starts_with("Available commands"));
    }

    #[tokio::test]
    async fn delivery_failure_sends_one_fallback() {
        let f = fixture(WorkerConfig::default(), None);
        f.transport.fail_next(1);
        let queued = enqueue_and_take(&f.store, &aged_task("U1", "hello", 1)).await;

        let outcome = f.worker.process_task(queued).await;

        assert_eq!(outcome, TaskOutcome::DeliveryFailed);
        let sent = f.transport.sent().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].text, FALLBACK);
        assert_eq!(f.transport.attempts(), 2);
    }

    #[tokio::test]
    async fn fallback_failure_is_swallowed() {
        let f = fixture(WorkerConfig::default(), None);
        f.transport.fail_next(2);
        let queued = enqueue_and_take(&f.store, &aged_task("U1", "hello", 1)).await;

        assert_eq!(f.worker.process_task(queued).await, TaskOutcome::DeliveryFailed);
        assert_eq!(f.transport.attempts(), 2);
        assert_eq!(f.store.len().await.unwrap(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn run_drains_queue_in_order_until_cancelled() {
        let f = fixture(WorkerConfig::default(), None);
        f.store.enqueue(&aged_task("U0", "stale", 4000)).await.unwrap();
        f.store.enqueue(&aged_task("U1", "first", 1)).await.unwrap();
        f.store.enqueue(&aged_task("U2", "second", 1)).await.unwrap();

        let cancel = CancellationToken::new();
        let worker = Arc::new(f.worker);
        let handle = {
            let worker = Arc::clone(&worker);
            let cancel = cancel.clone();
            tokio::spawn(async move { worker.run(cancel).await })
        };

        let sent = f.transport.wait_for_sends(2, Duration::from_secs(10)).await;
        cancel.cancel();
        let stats = handle.await.unwrap();

        assert_eq!(
            stats,
            WorkerStats {
                delivered: 2,
                expired: 1,
                failed: 0
            }
        );
        let targets: Vec<&str> = sent.iter().map(|m| m.target.as_str()).collect();
        assert_eq!(targets, vec!["U1", "U2"]);
        assert_eq!(f.store.len().await.unwrap(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn dequeue_errors_back_off_without_stopping() {
        let f = fixture(WorkerConfig::default(), Some(Arc::new(FailingStore)));
        let cancel = CancellationToken::new();
        let worker = Arc::new(f.worker);
        let handle = {
            let worker = Arc::clone(&worker);
            let cancel = cancel.clone();
            tokio::spawn(async move { worker.run(cancel).await })
        };

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(!handle.is_finished());
        cancel.cancel();
        let stats = handle.await.unwrap();
        assert_eq!(stats, WorkerStats::default());
    }

    #[tokio::test]
    async fn cancelled_before_start_returns_immediately() {
        let f = fixture(WorkerConfig::default(), None);
        f.store.enqueue(&aged_task("U1", "hi", 1)).await.unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let stats = f.worker.run(cancel).await;
        assert_eq!(stats, WorkerStats::default());
        assert_eq!(f.store.len().await.unwrap(), 1);
    }
}
