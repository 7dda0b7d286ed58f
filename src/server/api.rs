use crate::core::{Ack, ConversionRecorder, NewConversion, RateDocument};
use crate::server::AppState;
use crate::server::error::{ApiError, ApiResult};
use axum::{
    Json,
    extract::{Query, State, rejection::JsonRejection},
    http::header,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, warn};

#[derive(Debug, Deserialize)]
pub struct RatesQuery {
    base: Option<String>,
}

impl IntoResponse for RateDocument {
    fn into_response(self) -> Response {
        ([(header::CONTENT_TYPE, "application/json")], self.into_body()).into_response()
    }
}

/// Relays the upstream rate document for `base` unchanged.
pub async fn get_rates(
    State(state): State<Arc<AppState>>,
    Query(query): Query<RatesQuery>,
) -> ApiResult<RateDocument> {
    let base = query
        .base
        .ok_or_else(|| ApiError::BadRequest("Missing base currency".to_string()))?;

    let document = state.gateway.get_rates(&base).await.inspect_err(|e| {
        error!(error = %e, %base, "Failed to fetch rates");
    })?;
    Ok(document)
}

pub async fn save_conversion(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<NewConversion>, JsonRejection>,
) -> ApiResult<Json<Ack>> {
    let Json(conversion) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    let ack = state.recorder.record(conversion).await.inspect_err(|e| {
        warn!(error = %e, "Conversion not saved");
    })?;
    Ok(Json(ack))
}

#[derive(Debug, Serialize)]
pub struct Health {
    status: &'static str,
    store: &'static str,
}

pub async fn healthz(State(state): State<Arc<AppState>>) -> Json<Health> {
    Json(Health {
        status: "ok",
        store: if state.recorder.is_connected() {
            "connected"
        } else {
            "unavailable"
        },
    })
}
