//! HTTP surface: routes, middleware and the JSON error envelopes.

use crate::{
    cache::CACHE_TTL,
    config::Config,
    errors::{LookupError, LookupFailure},
    lookup::{LookupRequest, LookupService},
    metrics, ResponseEnvelope,
};
use axum::{
    extract::{rejection::JsonRejection, OriginalUri, State},
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use serde_json::json;
use std::{any::Any, sync::Arc, time::Instant};
use tower::ServiceBuilder;
use tower_http::{
    catch_panic::CatchPanicLayer,
    compression::CompressionLayer,
    cors::{AllowOrigin, CorsLayer},
    set_header::SetResponseHeaderLayer,
    trace::TraceLayer,
};
use tracing::{error, warn};
use uuid::Uuid;

#[derive(Clone)]
pub struct AppState {
    pub lookup_service: LookupService,
    pub config: Arc<Config>,
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    timestamp: String,
    version: &'static str,
    uptime: f64,
    cache: CacheHealth,
    environment: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CacheHealth {
    size: usize,
    max_age: String,
}

pub fn router(state: AppState) -> Router {
    // Paths used by the original web client
    let api = Router::new()
        .route("/whois", post(lookup))
        .route("/health", get(health_check))
        .route("/info", get(api_info));

    let routes = Router::new()
        .route("/lookup", post(lookup))
        .route("/health", get(health_check))
        .route("/info", get(api_info))
        .route("/metrics", get(metrics::metrics_handler))
        .nest("/api", api)
        .fallback(not_found);

    with_middleware(routes, &state.config).with_state(state)
}

/// Wraps routes in tracing, compression, CORS, security headers and the panic catch-all.
///
/// The catch-all sits innermost so its 500 still carries CORS and security headers.
pub fn with_middleware<S>(routes: Router<S>, config: &Config) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    routes.layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(CompressionLayer::new())
            .layer(cors_layer(&config.frontend_url))
            .layer(SetResponseHeaderLayer::if_not_present(
                header::X_CONTENT_TYPE_OPTIONS,
                HeaderValue::from_static("nosniff"),
            ))
            .layer(SetResponseHeaderLayer::if_not_present(
                header::X_FRAME_OPTIONS,
                HeaderValue::from_static("SAMEORIGIN"),
            ))
            .layer(SetResponseHeaderLayer::if_not_present(
                header::REFERRER_POLICY,
                HeaderValue::from_static("no-referrer"),
            ))
            .layer(CatchPanicLayer::custom(handle_panic))
            .into_inner(),
    )
}

fn cors_layer(origin: &str) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    // Browsers reject credentials with a wildcard origin
    if origin.trim() == "*" {
        warn!("Allowed origin is \"*\"; CORS credentials are disabled");
        return cors.allow_origin(AllowOrigin::any());
    }

    match HeaderValue::from_str(origin) {
        Ok(value) => cors.allow_origin(AllowOrigin::exact(value)).allow_credentials(true),
        Err(e) => {
            warn!("Ignoring invalid allowed origin {:?}: {}", origin, e);
            cors
        }
    }
}

async fn lookup(
    State(state): State<AppState>,
    payload: Result<Json<LookupRequest>, JsonRejection>,
) -> Result<Json<ResponseEnvelope>, LookupFailure> {
    let start_time = Instant::now();

    let Json(request) = payload.map_err(|rejection| {
        let detail = rejection.body_text();
        warn!("Rejected lookup body: {}", detail);
        metrics::increment_errors("INVALID_REQUEST");
        LookupFailure::new(
            LookupError::InvalidRequest(detail),
            start_time.elapsed().as_millis() as u64,
        )
    })?;

    match state.lookup_service.lookup(&request).await {
        Ok(envelope) => {
            metrics::increment_lookups(envelope.data_type.as_str());
            if envelope.cached {
                metrics::increment_cache_hits();
            } else {
                metrics::increment_cache_misses();
                metrics::record_lookup_time(envelope.response_time);
            }
            metrics::record_cache_size(state.lookup_service.cache().len().await);
            Ok(Json(envelope))
        }
        Err(failure) => {
            metrics::increment_errors(failure.error.code());
            Err(failure)
        }
    }
}

async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "OK",
        timestamp: chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
        version: env!("CARGO_PKG_VERSION"),
        uptime: state.config.start_time.elapsed().as_secs_f64(),
        cache: CacheHealth {
            size: state.lookup_service.cache().len().await,
            max_age: format!("{}s", CACHE_TTL.as_secs()),
        },
        environment: state.config.environment.clone(),
    })
}

async fn api_info() -> Json<serde_json::Value> {
    Json(json!({
        "name": "WHOIS Lookup API",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "WHOIS domain lookup service",
        "endpoints": {
            "/lookup": "POST - Domain WHOIS lookup",
            "/health": "GET - Health check",
            "/info": "GET - API information",
            "/metrics": "GET - Prometheus metrics"
        },
        "features": [
            "Domain and contact information lookup",
            "Input validation and sanitization",
            "Response caching",
            "Upstream error classification",
            "Security headers"
        ]
    }))
}

async fn not_found(OriginalUri(uri): OriginalUri) -> impl IntoResponse {
    let path = uri
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| uri.path().to_string());

    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "error": "Endpoint not found",
            "code": "NOT_FOUND",
            "path": path
        })),
    )
}

/// Last resort for panics inside handlers; only a correlation id leaves the process.
fn handle_panic(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else {
        "unknown panic payload".to_string()
    };

    let request_id = Uuid::new_v4().simple().to_string();
    error!(request_id = %request_id, "Unhandled error: {}", detail);

    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({
            "error": "Internal server error",
            "code": "UNHANDLED_ERROR",
            "requestId": request_id
        })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_panic_response_hides_details() {
        let response = handle_panic(Box::new("secret internal state"));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["code"], "UNHANDLED_ERROR");
        assert!(!body["requestId"].as_str().unwrap().is_empty());
        assert!(!String::from_utf8_lossy(&bytes).contains("secret"));
    }

    async fn explode() -> &'static str {
        panic!("handler exploded")
    }

    #[tokio::test]
    async fn test_panicking_route_keeps_cors_and_security_headers() {
        let config = Config {
            frontend_url: "http://localhost:3000".to_string(),
            ..Config::default()
        };
        let app = with_middleware(Router::new().route("/boom", get(explode)), &config);

        let request = axum::http::Request::builder()
            .uri("/boom")
            .header(header::ORIGIN, "http://localhost:3000")
            .body(axum::body::Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let headers = response.headers();
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "http://localhost:3000");
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_CREDENTIALS], "true");
        assert_eq!(headers[header::X_CONTENT_TYPE_OPTIONS], "nosniff");

        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["code"], "UNHANDLED_ERROR");
    }

    #[test]
    fn test_wildcard_origin_builds_without_credentials() {
        let config = Config {
            frontend_url: "*".to_string(),
            ..Config::default()
        };
        let _app: Router = with_middleware(Router::new().route("/info", get(api_info)), &config);
    }
}
