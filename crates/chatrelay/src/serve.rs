// SPDX-FileCopyrightText: 2026 Chatrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `chatrelay serve` command implementation.
//!
//! Composition root: opens storage, builds the OpenAI provider, the LINE
//! client, and the lookup collaborators once, then runs the queue worker and
//! the webhook server side by side until a shutdown signal arrives.

use std::sync::Arc;
use std::time::Duration;

use chatrelay_agent::{
    CommandDispatcher, ConversationHistory, GeneratorConfig, ResponseGenerator, WorkerLoop,
    install_signal_handler,
};
use chatrelay_config::RelayConfig;
use chatrelay_config::model::StorageConfig;
use chatrelay_core::{
    HistoryStore, PluginAdapter, ProviderAdapter, RelayError, ReplyTransport, SettingsStore,
    TaskQueue, WeatherService,
};
use chatrelay_line::{LineClient, WebhookState};
use chatrelay_lookup::{OpenWeatherClient, ProviderTranslator, UnconfiguredWeather};
use chatrelay_openai::OpenAiProvider;
use chatrelay_storage::{InMemoryStore, SqliteStorage};
use tracing::{error, info, warn};

/// Crates whose events follow `agent.log_level`.
const LOG_TARGETS: &[&str] = &[
    "chatrelay",
    "chatrelay_agent",
    "chatrelay_config",
    "chatrelay_core",
    "chatrelay_line",
    "chatrelay_lookup",
    "chatrelay_openai",
    "chatrelay_storage",
];

/// Queue, history, and settings handles over one backing store.
struct Stores {
    queue: Arc<dyn TaskQueue>,
    history: Arc<dyn HistoryStore>,
    settings: Arc<dyn SettingsStore>,
    sqlite: Option<Arc<SqliteStorage>>,
}

impl Stores {
    async fn sqlite(config: &StorageConfig) -> Result<Self, RelayError> {
        let storage = SqliteStorage::new(config.clone());
        storage.initialize().await?;
        let storage = Arc::new(storage);
        info!(path = %config.database_path, "SQLite storage ready");
        Ok(Self {
            queue: storage.clone(),
            history: storage.clone(),
            settings: storage.clone(),
            sqlite: Some(storage),
        })
    }

    fn memory(config: &StorageConfig) -> Self {
        warn!("using in-memory storage, queued tasks and history are lost on exit");
        let store = Arc::new(
            InMemoryStore::new(config.max_history)
                .with_lock_timeout(Duration::from_secs(config.lock_timeout_secs)),
        );
        Self {
            queue: store.clone(),
            history: store.clone(),
            settings: store,
            sqlite: None,
        }
    }
}

/// Runs the `chatrelay serve` command.
pub async fn run_serve(config: RelayConfig, in_memory: bool) -> Result<(), RelayError> {
    init_tracing(&config.agent.log_level);
    info!(agent = %config.agent.name, "starting chatrelay serve");

    chatrelay_config::validate_secrets(&config).map_err(|errors| {
        chatrelay_config::render_errors(&errors);
        RelayError::Config(format!("{} required secret(s) missing", errors.len()))
    })?;

    let stores = if in_memory {
        Stores::memory(&config.storage)
    } else {
        Stores::sqlite(&config.storage).await?
    };

    let provider: Arc<dyn ProviderAdapter> = Arc::new(OpenAiProvider::new(&config.openai)?);
    let transport: Arc<dyn ReplyTransport> = Arc::new(LineClient::from_config(&config.line)?);

    let weather: Arc<dyn WeatherService> = match OpenWeatherClient::from_config(&config.weather)? {
        Some(client) => Arc::new(client),
        None => {
            info!("weather API key not set, weather command will report the service as unavailable");
            Arc::new(UnconfiguredWeather)
        }
    };
    let translator = Arc::new(ProviderTranslator::new(provider.clone(), &config.openai));

    let history = ConversationHistory::new(stores.history.clone());
    let dispatcher = CommandDispatcher::new(
        history.clone(),
        stores.settings.clone(),
        weather,
        config.agent.weather_keywords.clone(),
    );
    let generator = Arc::new(
        ResponseGenerator::new(
            dispatcher,
            provider.clone(),
            history,
            stores.settings.clone(),
            GeneratorConfig::from_config(&config),
        )
        .with_translator(translator),
    );
    let worker = WorkerLoop::new(
        stores.queue.clone(),
        generator,
        transport.clone(),
        config.worker.clone(),
        config.agent.delivery_fallback_message.clone(),
    );

    let cancel = install_signal_handler();

    let worker_handle = {
        let cancel = cancel.clone();
        tokio::spawn(async move { worker.run(cancel).await })
    };

    let state = WebhookState::new(
        config.line.channel_secret.clone().unwrap_or_default(),
        stores.queue.clone(),
        transport.clone(),
    );
    let server_result = match bind(&config).await {
        Ok(listener) => {
            chatrelay_line::serve(
                listener,
                chatrelay_line::router(state),
                cancel.clone().cancelled_owned(),
            )
            .await
        }
        Err(e) => Err(e),
    };
    if let Err(e) = &server_result {
        error!(error = %e, "webhook server stopped with an error");
    }

    // Stop the worker whether the server exited on a signal or an error.
    cancel.cancel();
    match worker_handle.await {
        Ok(stats) => info!(
            delivered = stats.delivered,
            expired = stats.expired,
            failed = stats.failed,
            "worker finished"
        ),
        Err(e) => error!(error = %e, "worker task panicked"),
    }

    if let Err(e) = provider.shutdown().await {
        warn!(error = %e, "provider shutdown failed");
    }
    if let Err(e) = transport.shutdown().await {
        warn!(error = %e, "transport shutdown failed");
    }
    if let Some(sqlite) = &stores.sqlite {
        if let Err(e) = sqlite.shutdown().await {
            warn!(error = %e, "storage shutdown failed");
        }
    }

    info!("chatrelay stopped");
    server_result
}

async fn bind(config: &RelayConfig) -> Result<tokio::net::TcpListener, RelayError> {
    let addr = format!("{}:{}", config.server.host, config.server.port);
    tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| RelayError::Delivery {
            message: format!("failed to bind webhook server to {addr}: {e}"),
            source: Some(Box::new(e)),
        })
}

/// Initializes the tracing subscriber. `RUST_LOG` takes precedence over `agent.log_level`.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(log_level)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}

fn default_directives(log_level: &str) -> String {
    let mut directives: Vec<String> = LOG_TARGETS
        .iter()
        .map(|target| format!("{target}={log_level}"))
        .collect();
    directives.push("tower_http=info".to_string());
    directives.push("warn".to_string());
    directives.join(",")
}
