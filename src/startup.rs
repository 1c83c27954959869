//! Application Startup
//!
//! Application building and server initialization.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::application::delivery::{spawn_consumers, DeliveryCascade, DeliveryPolicy};
use crate::application::services::{FanoutService, HistoryService, IngestService};
use crate::config::Settings;
use crate::domain::MessageStore;
use crate::infrastructure::broker::{Broker, RedisStreamBroker};
use crate::infrastructure::cache::{self, Cache, ConversationCache, PresenceCache, RedisCache};
use crate::infrastructure::database;
use crate::infrastructure::repositories::PgMessageRepository;
use crate::presentation::http::{handlers::health, routes};
use crate::presentation::websocket::SessionRegistry;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub registry: Arc<SessionRegistry>,
    pub store: Arc<dyn MessageStore>,
    pub cache: Arc<dyn Cache>,
    pub broker: Arc<dyn Broker>,
    pub ingest: IngestService,
    pub history: HistoryService,
    pub presence: PresenceCache,
}

impl AppState {
    /// Wire the services on top of the three backends.
    pub fn new(
        settings: Settings,
        store: Arc<dyn MessageStore>,
        cache: Arc<dyn Cache>,
        broker: Arc<dyn Broker>,
    ) -> Self {
        let op_timeout = settings.cache.op_timeout();
        let history = HistoryService::new(
            store.clone(),
            Self::conversations(&settings, &cache),
            settings.cache.history_limit,
        );

        Self {
            registry: Arc::new(SessionRegistry::new()),
            ingest: IngestService::new(broker.clone(), &settings.broker.topics),
            presence: PresenceCache::new(cache.clone(), op_timeout),
            history,
            store,
            cache,
            broker,
            settings: Arc::new(settings),
        }
    }

    fn conversations(settings: &Settings, cache: &Arc<dyn Cache>) -> ConversationCache {
        ConversationCache::new(
            cache.clone(),
            Duration::from_secs(settings.cache.history_ttl_secs),
            settings.cache.op_timeout(),
        )
    }

    /// The cascade handling records of all three topics.
    pub fn delivery_cascade(&self) -> DeliveryCascade {
        DeliveryCascade::new(
            self.store.clone(),
            self.broker.clone(),
            Self::conversations(&self.settings, &self.cache),
            FanoutService::new(self.registry.clone(), self.settings.websocket.overflow_policy),
            self.settings.broker.topics.clone(),
            DeliveryPolicy::from(&self.settings.delivery),
        )
    }

    /// Start one consumer per topic partition.
    pub fn spawn_delivery(&self, shutdown: watch::Receiver<bool>) -> Vec<JoinHandle<()>> {
        spawn_consumers(
            Arc::new(self.delivery_cascade()),
            self.broker.clone(),
            &self.settings.broker,
            shutdown,
        )
    }
}

/// Application instance
pub struct Application {
    listener: TcpListener,
    router: Router,
    state: AppState,
    consumers: Vec<JoinHandle<()>>,
    shutdown: watch::Sender<bool>,
}

impl Application {
    /// Build the application from settings
    pub async fn build(settings: Settings) -> Result<Self> {
        // Create database pool
        let db = database::create_pool(&settings.database).await?;
        database::run_migrations(&db).await?;
        info!("Database connection pool created, migrations applied");

        // Create Redis client, shared by the cache and the broker
        let redis = cache::create_redis_client(&settings.redis).await?;

        let broker = RedisStreamBroker::new(redis.clone(), &settings.broker);
        let topics = &settings.broker.topics;
        broker
            .ensure_topics(&[
                topics.primary.as_str(),
                topics.retry.as_str(),
                topics.dead.as_str(),
            ])
            .await?;
        info!(partitions = broker.partitions(), "Broker topics ready");

        let state = AppState::new(
            settings,
            Arc::new(PgMessageRepository::new(db)),
            Arc::new(RedisCache::new(redis)),
            Arc::new(broker),
        );
        Self::with_state(state).await
    }

    /// Bind the listener and start the consumers for an already wired state.
    pub async fn with_state(state: AppState) -> Result<Self> {
        health::init_server_start();

        let (shutdown, shutdown_rx) = watch::channel(false);
        let consumers = state.spawn_delivery(shutdown_rx);

        let router = routes::create_router(state.clone());

        // Bind to address
        let listener = TcpListener::bind(state.settings.server_addr()).await?;
        info!("Listening on {}", listener.local_addr()?);

        Ok(Self {
            listener,
            router,
            state,
            consumers,
            shutdown,
        })
    }

    /// Run the server until a shutdown signal arrives, then stop the
    /// consumers and close every live session.
    pub async fn run_until_stopped(self) -> Result<()> {
        let Self {
            listener,
            router,
            state,
            consumers,
            shutdown,
        } = self;

        let registry = state.registry.clone();
        axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                shutdown_signal().await;
                info!("Shutdown signal received");
                let _ = shutdown.send(true);
                registry.shutdown();
            })
            .await?;

        for consumer in consumers {
            if let Err(e) = consumer.await {
                warn!(error = %e, "Consumer task failed");
            }
        }
        state.registry.shutdown();

        info!("Server stopped");
        Ok(())
    }

    /// Get the bound address
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
