//! Balance service: the saga participant that keeps account balances.
//!
//! Runs the update and compensation pipelines against a shared ledger, and
//! exposes an HTTP surface for publishing inbound events, inspecting balances
//! and saga outcomes, health checks and Prometheus metrics.

pub mod config;
pub mod error;
pub mod history;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use broker::InMemoryBroker;
use ledger::LedgerStore;
use metrics_exporter_prometheus::PrometheusHandle;
use saga::{CompensationPipeline, SagaPublisher, Topology, UpdatePipeline};
use tokio::task::JoinHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use history::SagaHistory;

/// Queue the service binds to the saga exchange to feed [`SagaHistory`].
pub const HISTORY_QUEUE: &str = "balance-service.saga-history";

/// Shared application state accessible from all handlers.
pub struct AppState {
    pub ledger: LedgerStore,
    pub broker: InMemoryBroker,
    pub history: SagaHistory,
    pub topology: Topology,
}

/// A running service: its state plus the consumer tasks.
pub struct BalanceService {
    pub state: Arc<AppState>,
    tasks: Vec<JoinHandle<()>>,
}

impl BalanceService {
    /// Declares the topology, creates the ledger and spawns both pipelines
    /// and the history consumer.
    ///
    /// # Errors
    ///
    /// Fails if the topology cannot be declared or a queue cannot be consumed.
    pub async fn start(
        broker: InMemoryBroker,
        topology: Topology,
        history_limit: usize,
    ) -> broker::Result<Self> {
        topology.declare(&broker).await?;
        broker.declare_queue(HISTORY_QUEUE).await;
        broker
            .bind_queue(HISTORY_QUEUE, &topology.saga_exchange, "#")
            .await?;

        let ledger = LedgerStore::new();
        let history = SagaHistory::new(history_limit);
        let publisher = SagaPublisher::new(Arc::new(broker.clone()), &topology.saga_exchange);

        let update = UpdatePipeline::new(ledger.clone(), publisher.clone());
        let update_feed = broker.consume(&topology.update_queue).await?;
        let compensation = CompensationPipeline::new(ledger.clone(), publisher);
        let compensation_feed = broker.consume(&topology.compensation_queue).await?;
        let history_feed = broker.consume(HISTORY_QUEUE).await?;

        let recorder = history.clone();
        let tasks = vec![
            tokio::spawn(async move { update.run(update_feed).await }),
            tokio::spawn(async move { compensation.run(compensation_feed).await }),
            tokio::spawn(async move { recorder.run(history_feed).await }),
        ];

        tracing::info!(
            update_queue = %topology.update_queue,
            compensation_queue = %topology.compensation_queue,
            "balance service listening for balance updates and compensation"
        );

        let state = Arc::new(AppState {
            ledger,
            broker,
            history,
            topology,
        });

        Ok(Self { state, tasks })
    }

    /// Closes the inbound queues and waits for every consumer to drain.
    pub async fn shutdown(self) {
        let topology = &self.state.topology;
        for queue in [
            topology.update_queue.as_str(),
            topology.compensation_queue.as_str(),
            HISTORY_QUEUE,
        ] {
            if let Err(e) = self.state.broker.close_queue(queue).await {
                tracing::warn!(queue, error = %e, "failed to close queue");
            }
        }
        for task in self.tasks {
            if let Err(e) = task.await {
                tracing::error!(error = %e, "consumer task panicked");
            }
        }
        tracing::info!("balance service stopped");
    }
}

/// Creates the Axum application router with all routes and shared state.
pub fn create_app(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/accounts", get(routes::accounts::list))
        .route("/accounts/{account_id}/balance", get(routes::accounts::balance))
        .route(
            "/exchanges/{exchange}/{routing_key}",
            post(routes::exchanges::publish),
        )
        .route("/saga/events", get(routes::saga::events))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}
