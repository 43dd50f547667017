// SPDX-FileCopyrightText: 2026 Chatrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end tests for the webhook -> queue -> worker -> transport pipeline.
//!
//! Each test opens its own temp SQLite database and wires the real webhook
//! router, store, dispatcher, generator, and worker around mock backends.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use chatrelay_agent::{
    CommandDispatcher, ConversationHistory, GeneratorConfig, ResponseGenerator, WorkerLoop,
    WorkerStats,
};
use chatrelay_config::model::{StorageConfig, WorkerConfig};
use chatrelay_core::{HistoryStore, Task, TaskQueue};
use chatrelay_line::signature::{SIGNATURE_HEADER, sign};
use chatrelay_line::{WebhookState, router};
use chatrelay_storage::SqliteStorage;
use chatrelay_test_utils::{MockProvider, MockTransport, MockWeather, SendKind};
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

const SECRET: &str = "e2e-secret";

struct Pipeline {
    _dir: tempfile::TempDir,
    storage: Arc<SqliteStorage>,
    provider: Arc<MockProvider>,
    transport: Arc<MockTransport>,
    app: axum::Router,
    cancel: CancellationToken,
    worker: tokio::task::JoinHandle<WorkerStats>,
}

impl Pipeline {
    async fn start(responses: Vec<&str>) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let config = StorageConfig {
            database_path: dir.path().join("relay.db").display().to_string(),
            ..StorageConfig::default()
        };
        let storage = SqliteStorage::new(config).with_poll_interval(Duration::from_millis(20));
        storage.initialize().await.unwrap();
        let storage = Arc::new(storage);

        let provider = Arc::new(MockProvider::with_responses(
            responses.into_iter().map(String::from).collect(),
        ));
        let transport = Arc::new(MockTransport::new());

        let history = ConversationHistory::new(storage.clone());
        let dispatcher = CommandDispatcher::new(
            history.clone(),
            storage.clone(),
            Arc::new(MockWeather::new()),
            vec!["weather".into(), "天氣".into()],
        );
        let generator = Arc::new(ResponseGenerator::new(
            dispatcher,
            provider.clone(),
            history,
            storage.clone(),
            GeneratorConfig::default(),
        ));
        let worker_config = WorkerConfig {
            dequeue_wait_ms: 100,
            ..WorkerConfig::default()
        };
        let worker = WorkerLoop::new(
            storage.clone(),
            generator,
            transport.clone(),
            worker_config,
            "fallback",
        );

        let cancel = CancellationToken::new();
        let handle = {
            let cancel = cancel.clone();
            tokio::spawn(async move { worker.run(cancel).await })
        };

        let app = router(WebhookState::new(SECRET, storage.clone(), transport.clone()));

        Self {
            _dir: dir,
            storage,
            provider,
            transport,
            app,
            cancel,
            worker: handle,
        }
    }

    async fn post_text(&self, user: &str, text: &str) -> StatusCode {
        let body = serde_json::json!({
            "destination": "Ubot",
            "events": [{
                "type": "message",
                "replyToken": format!("rt-{user}"),
                "source": {"type": "user", "userId": user},
                "message": {"type": "text", "id": "1", "text": text}
            }]
        })
        .to_string();
        let request = Request::post("/callback")
            .header(SIGNATURE_HEADER, sign(SECRET, body.as_bytes()))
            .header("content-type", "application/json")
            .body(Body::from(body))
            .unwrap();
        self.app.clone().oneshot(request).await.unwrap().status()
    }

    async fn stop(self) -> WorkerStats {
        self.cancel.cancel();
        self.worker.await.unwrap()
    }
}

#[tokio::test]
async fn webhook_message_is_answered_and_remembered() {
    let pipeline = Pipeline::start(vec!["Hello from the relay!"]).await;

    assert_eq!(pipeline.post_text("U1", "Hi there").await, StatusCode::OK);

    let sent = pipeline
        .transport
        .wait_for_sends(1, Duration::from_secs(5))
        .await;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].kind, SendKind::Push);
    assert_eq!(sent[0].target, "U1");
    assert_eq!(sent[0].text, "Hello from the relay!");

    let history = pipeline.storage.recent("U1", 10).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].user_text, "Hi there");

    let storage = pipeline.storage.clone();
    let stats = pipeline.stop().await;
    assert_eq!(stats.delivered, 1);
    assert_eq!(storage.len().await.unwrap(), 0);
}

#[tokio::test]
async fn lang_command_shapes_the_next_prompt() {
    let pipeline = Pipeline::start(vec!["了解"]).await;

    pipeline.post_text("U1", "/lang zh-TW").await;
    let sent = pipeline
        .transport
        .wait_for_sends(1, Duration::from_secs(5))
        .await;
    assert!(sent[0].text.contains("zh-TW"));
    assert_eq!(pipeline.provider.call_count().await, 0);

    pipeline.post_text("U1", "tell me a story").await;
    pipeline
        .transport
        .wait_for_sends(2, Duration::from_secs(5))
        .await;

    let requests = pipeline.provider.requests().await;
    assert_eq!(requests.len(), 1);
    assert!(requests[0].messages[0].content.contains("'zh-TW'"));

    pipeline.stop().await;
}

#[tokio::test]
async fn messages_are_processed_in_arrival_order() {
    let pipeline = Pipeline::start(vec!["one", "two", "three"]).await;

    for (user, text) in [("U1", "first"), ("U2", "second"), ("U3", "third")] {
        assert_eq!(pipeline.post_text(user, text).await, StatusCode::OK);
    }

    let sent = pipeline
        .transport
        .wait_for_sends(3, Duration::from_secs(5))
        .await;
    let order: Vec<(&str, &str)> = sent
        .iter()
        .map(|m| (m.target.as_str(), m.text.as_str()))
        .collect();
    assert_eq!(order, vec![("U1", "one"), ("U2", "two"), ("U3", "three")]);

    pipeline.stop().await;
}

#[tokio::test]
async fn stale_task_is_dropped_without_reply() {
    let pipeline = Pipeline::start(vec!["fresh reply"]).await;

    let mut stale = Task::new("U9", "are you there?", "rt-old");
    stale.enqueued_at = chrono::Utc::now() - chrono::TimeDelta::seconds(1750);
    pipeline.storage.enqueue(&stale).await.unwrap();
    pipeline.post_text("U1", "hello").await;

    let sent = pipeline
        .transport
        .wait_for_sends(1, Duration::from_secs(5))
        .await;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].target, "U1");
    assert!(pipeline.storage.recent("U9", 10).await.unwrap().is_empty());

    let stats = pipeline.stop().await;
    assert_eq!(stats.expired, 1);
    assert_eq!(stats.delivered, 1);
}
