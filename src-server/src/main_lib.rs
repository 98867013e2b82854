use std::sync::Arc;

use anyhow::Context;
use axum::http::HeaderValue;
use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;
use wealthgoals_core::goals::{GoalRepository, GoalService, GoalServiceTrait, GoalSettings};
use wealthgoals_core::valuation::{InMemoryValuationRepository, ValuationService};

use crate::api;
use crate::config::{Config, LogFormat};
use crate::events::{event_channel, ResourceEventPayload};
use crate::seed;

pub struct AppState {
    pub goal_service: Arc<dyn GoalServiceTrait>,
    pub goal_repository: Arc<GoalRepository>,
    pub events: broadcast::Sender<ResourceEventPayload>,
}

pub fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,wealthgoals_server=debug,wealthgoals_core=debug"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let result = match format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Pretty => builder.try_init(),
    };
    if let Err(e) = result {
        eprintln!("tracing already initialized: {}", e);
    }
}

pub fn build_state(config: &Config) -> Arc<AppState> {
    let goal_repository = Arc::new(GoalRepository::new());
    let valuation_service = Arc::new(ValuationService::new(Arc::new(
        InMemoryValuationRepository::new(),
    )));
    let goal_service = Arc::new(GoalService::new(
        goal_repository.clone(),
        valuation_service,
        GoalSettings {
            compounding: config.compounding,
        },
    ));

    Arc::new(AppState {
        goal_service,
        goal_repository,
        events: event_channel(),
    })
}

fn cors_layer(config: &Config) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .cors_allow_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin '{}'", origin);
                None
            }
        })
        .collect();

    let allow_origin = if origins.is_empty() {
        AllowOrigin::from(Any)
    } else {
        AllowOrigin::list(origins)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(Any)
        .allow_headers(Any)
}

pub fn app_router(state: Arc<AppState>, config: &Config) -> Router {
    api::router(config.request_timeout)
        .with_state(state)
        .layer(CompressionLayer::new())
        .layer(cors_layer(config))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
    tracing::info!("Shutdown signal received");
}

pub async fn run(config: Config) -> anyhow::Result<()> {
    let state = build_state(&config);

    if let Some(path) = &config.seed_path {
        let summary = seed::load_seed_file(path, &state)
            .await
            .with_context(|| format!("loading seed file {}", path.display()))?;
        tracing::info!(
            goals = summary.goals,
            allocations = summary.allocations,
            valuations = summary.valuations,
            "Seed data loaded"
        );
    }

    let router = app_router(state, &config);
    let listener = TcpListener::bind(config.listen_addr)
        .await
        .with_context(|| format!("binding {}", config.listen_addr))?;
    tracing::info!("Goals server listening on {}", listener.local_addr()?);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}
