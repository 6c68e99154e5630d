use crate::bootstrap::SnapshotSource;
use crate::config::SERVICE_NAME;
use crate::server::AppState;

use axum::{
    extract::State,
    http::{header, HeaderValue, Method, StatusCode},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

/// Build all routes for the service.
pub fn build_routes(state: AppState) -> Router {
    let cors = cors_layer(&state.snapshot.config.cors_allowed_origins);

    Router::new()
        .route("/health", get(health_handler))
        .route("/health/ready", get(ready_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin '{origin}'");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true)
}

// ============================================================================
// Health
// ============================================================================

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    service: &'static str,
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        service: SERVICE_NAME,
    })
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ReadinessResponse {
    ready: bool,
    version: String,
    uptime: u64,
    secrets_source: SnapshotSource,
    secrets_loaded: usize,
    templates: TemplateStatus,
    cache_connected: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TemplateStatus {
    enabled: bool,
    degraded: bool,
    cached: usize,
}

async fn ready_handler(State(state): State<AppState>) -> (StatusCode, Json<ReadinessResponse>) {
    let ready = state.gate.is_ready();
    let cache_connected = state
        .resources
        .cache
        .instance()
        .is_some_and(|cache| cache.is_connected());

    let body = ReadinessResponse {
        ready,
        version: state.version.clone(),
        uptime: state.start_time.elapsed().as_secs(),
        secrets_source: state.snapshot.source,
        secrets_loaded: state.snapshot.secrets_loaded,
        templates: TemplateStatus {
            enabled: state.email.is_some(),
            degraded: state.templates.is_degraded(),
            cached: state.templates.len(),
        },
        cache_connected,
    };
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(body))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bootstrap::{BootstrapGate, BootstrapOptions};
    use crate::config::EnvironmentStore;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tower::ServiceExt;

    async fn state() -> AppState {
        let gate = Arc::new(BootstrapGate::new(
            EnvironmentStore::new(),
            BootstrapOptions::default(),
        ));
        let snapshot = gate.ensure_ready().await;
        AppState::new(gate, snapshot)
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn health_reports_service() {
        let (status, body) = get_json(build_routes(state().await), "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"status": "ok", "service": "auth"}));
    }

    #[tokio::test]
    async fn readiness_reflects_template_cache() {
        let state = state().await;
        state.templates.insert("otp-sign-in", "tmpl_1");
        state.templates.set_degraded(true);

        let (status, body) = get_json(build_routes(state), "/health/ready").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ready"], json!(true));
        assert_eq!(body["secretsSource"], json!("environment"));
        assert_eq!(
            body["templates"],
            json!({"enabled": false, "degraded": true, "cached": 1})
        );
        assert_eq!(body["cacheConnected"], json!(false));
    }

    #[tokio::test]
    async fn cors_allows_configured_origin() {
        let app = build_routes(state().await);
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .header(header::ORIGIN, "http://localhost:3000")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(
            response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "http://localhost:3000"
        );
    }
}
