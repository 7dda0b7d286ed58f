//! HTTP service: rate relay and conversion recorder

pub mod api;
pub mod error;

use crate::core::config::{AppConfig, ServerConfig};
use crate::core::rates::RateGateway;
use crate::providers::ExchangeRateApiProvider;
use crate::store::StoreRecorder;
use anyhow::{Context, Result};
use axum::{
    Router,
    http::HeaderValue,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};

pub struct AppState {
    pub gateway: Arc<dyn RateGateway>,
    pub recorder: StoreRecorder,
}

impl AppState {
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let upstream = &config.providers.exchangerate_api;
        let gateway = ExchangeRateApiProvider::new(&upstream.base_url, upstream.timeout())
            .context("Failed to create rate provider")?;

        Ok(AppState {
            gateway: Arc::new(gateway),
            recorder: StoreRecorder::open(config),
        })
    }
}

fn cors_layer(config: &ServerConfig) -> CorsLayer {
    if config.cors_allow_origins.iter().any(|o| o == "*") {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
    }

    let origins = config
        .cors_allow_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(%origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect::<Vec<_>>();
    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(Any)
        .allow_headers(Any)
}

pub fn app_router(state: Arc<AppState>, config: &ServerConfig) -> Router {
    let api = Router::new()
        .route("/rates", get(api::get_rates))
        .route("/convert", post(api::save_conversion))
        .route("/healthz", get(api::healthz));

    Router::new()
        .nest("/api", api)
        .with_state(state)
        .layer(cors_layer(config))
        .layer(TraceLayer::new_for_http())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}

pub async fn serve(config: &AppConfig) -> Result<()> {
    let state = Arc::new(AppState::from_config(config)?);
    let router = app_router(state, &config.server);

    let listener = tokio::net::TcpListener::bind(config.server.listen_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.server.listen_addr))?;
    info!("Listening on {}", config.server.listen_addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::rates::{GatewayError, RateDocument};
    use crate::store::memory::MemoryConversionLog;
    use crate::store::ConversionLog;
    use async_trait::async_trait;
    use axum::body::{Body, to_bytes};
    use axum::http::{Method, Request, StatusCode, header};
    use serde_json::{Value, json};
    use tower::ServiceExt;

    const USD_DOCUMENT: &str =
        r#"{"base":"USD","date":"2026-10-18","rates":{"USD":1.0,"INR":83.1,"EUR":0.92,"XAU":1e21}}"#;

    struct StaticGateway;

    #[async_trait]
    impl RateGateway for StaticGateway {
        async fn get_rates(&self, base: &str) -> Result<RateDocument, GatewayError> {
            match base {
                "USD" => Ok(RateDocument::from_body(USD_DOCUMENT.to_string()).unwrap()),
                _ => Err(GatewayError::Upstream("HTTP error: 404".to_string())),
            }
        }
    }

    fn router_with(recorder: StoreRecorder) -> Router {
        let state = Arc::new(AppState {
            gateway: Arc::new(StaticGateway),
            recorder,
        });
        app_router(state, &ServerConfig::default())
    }

    async fn send(router: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = router.oneshot(request).await.unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_rates_are_relayed_verbatim() {
        let router = router_with(StoreRecorder::unavailable());
        let response = router.oneshot(get("/api/rates?base=USD")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "application/json"
        );
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(body, USD_DOCUMENT.as_bytes());
    }

    #[tokio::test]
    async fn test_rates_upstream_failure() {
        let router = router_with(StoreRecorder::unavailable());
        let (status, body) = send(router, get("/api/rates?base=XYZ")).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({"error": "Failed to fetch rates"}));
    }

    #[tokio::test]
    async fn test_rates_without_base() {
        let router = router_with(StoreRecorder::unavailable());
        let (status, body) = send(router, get("/api/rates")).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"error": "Missing base currency"}));
    }

    #[tokio::test]
    async fn test_convert_saves_record() {
        let log = Arc::new(MemoryConversionLog::new());
        let router = router_with(StoreRecorder::new(log.clone()));

        let (status, body) = send(
            router,
            post_json(
                "/api/convert",
                json!({"from": "USD", "to": "INR", "amount": 10, "result": 831.0}),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"message": "Conversion saved"}));

        let records = log.records().await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].from, "USD");
        assert_eq!(records[0].to, "INR");
        assert_eq!(records[0].amount, 10.0);
        assert_eq!(records[0].result, 831.0);
    }

    #[tokio::test]
    async fn test_convert_missing_fields() {
        let log = Arc::new(MemoryConversionLog::new());
        let router = router_with(StoreRecorder::new(log.clone()));

        let (status, body) = send(
            router,
            post_json("/api/convert", json!({"from": "USD", "to": "INR", "amount": 10})),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"error": "Missing required fields"}));
        assert!(log.records().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_convert_store_unavailable() {
        let router = router_with(StoreRecorder::unavailable());

        let (status, body) = send(
            router,
            post_json(
                "/api/convert",
                json!({"from": "USD", "to": "INR", "amount": 10, "result": 831.0}),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body, json!({"error": "Database not available"}));
    }

    #[tokio::test]
    async fn test_convert_malformed_body() {
        let router = router_with(StoreRecorder::new(Arc::new(MemoryConversionLog::new())));

        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/convert")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let (status, body) = send(router, request).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn test_convert_rejects_non_finite_amount() {
        let log = Arc::new(MemoryConversionLog::new());
        let router = router_with(StoreRecorder::new(log.clone()));

        let (status, body) = send(
            router,
            post_json(
                "/api/convert",
                json!({"from": "USD", "to": "INR", "amount": "NaN", "result": 831.0}),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
        assert!(log.records().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_healthz_reports_store() {
        let (_, body) = send(router_with(StoreRecorder::unavailable()), get("/api/healthz")).await;
        assert_eq!(body, json!({"status": "ok", "store": "unavailable"}));

        let connected = StoreRecorder::new(Arc::new(MemoryConversionLog::new()));
        let (_, body) = send(router_with(connected), get("/api/healthz")).await;
        assert_eq!(body, json!({"status": "ok", "store": "connected"}));
    }
}
