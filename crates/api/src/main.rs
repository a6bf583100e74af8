use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::Instrument;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use cryptobot_core::domain::contract::{criteria_from_request, ValidationError};
use cryptobot_core::domain::recommendation::PipelineResult;
use cryptobot_core::gateway::diagnostic::{DiagnosticOutcome, DiagnosticProxy, DEFAULT_DIAGNOSTIC_SYMBOL};
use cryptobot_core::gateway::RecommendationGateway;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = cryptobot_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    if settings.analytics_base_url.is_none() {
        tracing::warn!("ANALYTICS_BASE_URL missing; recommendations will be served in demo mode");
    }

    let state = AppState {
        gateway: RecommendationGateway::from_settings(settings.clone()),
        diagnostics: DiagnosticProxy::from_settings(settings),
    };

    let app = router(state);

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(3000);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));

    tracing::info!(%addr, "api listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

#[derive(Clone)]
struct AppState {
    gateway: RecommendationGateway,
    diagnostics: DiagnosticProxy,
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/api/recommendations", post(post_recommendations))
        .route("/api/iceberg-demo", post(post_iceberg_demo))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

async fn healthz() -> &'static str {
    "ok"
}

async fn post_recommendations(State(state): State<AppState>, body: Bytes) -> Response {
    let request_id = Uuid::new_v4();

    // Validation happens before the fallback-protected call so bad input is never
    // masked as a demo response.
    let criteria = match parse_body(&body).and_then(|v| criteria_from_request(&v)) {
        Ok(criteria) => criteria,
        Err(err) => {
            tracing::info!(%request_id, field = err.field, reason = %err.reason, "rejected recommendation request");
            return validation_failure(err);
        }
    };

    let span = tracing::info_span!(
        "recommendations",
        %request_id,
        top_n = criteria.top_n(),
        max_risk = ?criteria.max_risk(),
        min_confidence = criteria.min_confidence(),
        symbol = criteria.symbol().unwrap_or("")
    );
    let result: PipelineResult = state
        .gateway
        .get_recommendations(&criteria)
        .instrument(span)
        .await;

    (StatusCode::OK, Json(result)).into_response()
}

async fn post_iceberg_demo(State(state): State<AppState>) -> Response {
    let outcome = state
        .diagnostics
        .run_diagnostic(DEFAULT_DIAGNOSTIC_SYMBOL)
        .await;

    let status = match outcome {
        DiagnosticOutcome::Ok { .. } => StatusCode::OK,
        DiagnosticOutcome::Error { .. } => StatusCode::SERVICE_UNAVAILABLE,
    };
    (status, Json(outcome)).into_response()
}

fn parse_body(body: &[u8]) -> Result<Value, ValidationError> {
    serde_json::from_slice(body).map_err(|e| ValidationError {
        field: "body",
        reason: format!("invalid JSON: {e}"),
    })
}

fn validation_failure(err: ValidationError) -> Response {
    (
        StatusCode::UNPROCESSABLE_ENTITY,
        Json(json!({
            "status": "error",
            "field": err.field,
            "message": err.to_string(),
        })),
    )
        .into_response()
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

fn init_sentry(settings: &cryptobot_core::config::Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}
