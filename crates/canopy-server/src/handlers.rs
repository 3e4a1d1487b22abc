use axum::{
    Json,
    extract::{Query, State},
    http::{HeaderMap, header::IF_NONE_MATCH},
    response::{IntoResponse, Response},
};
use canopy_auth::BearerAuth;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::conditional::{evaluate, fingerprint};
use crate::error::ApiError;
use crate::layers::{DateFilter, parse_request_date};
use crate::server::AppState;

/// HEAD /meta. Liveness probe, no authentication.
pub async fn head_meta() -> Json<Value> {
    Json(json!({ "status": "OK" }))
}

/// GET /meta. Metadata of the published snapshot with an `ETag`.
pub async fn get_meta(
    State(state): State<AppState>,
    BearerAuth(auth): BearerAuth,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let snapshot = state.cache.current();
    tracing::debug!(subject = %auth.subject(), "Serving meta");
    let body = serde_json::to_vec(&snapshot.meta).map_err(|e| ApiError::internal(e.to_string()))?;

    let if_none_match = headers.get(IF_NONE_MATCH).and_then(|v| v.to_str().ok());
    Ok(evaluate(&fingerprint(&body), if_none_match).into_response(body))
}

#[derive(Debug, Deserialize)]
pub struct LayersQuery {
    pub date: Option<String>,
}

/// GET /layers?date=. Layers of the published snapshot, optionally
/// filtered to features observed on or before `date`.
pub async fn get_layers(
    State(state): State<AppState>,
    BearerAuth(auth): BearerAuth,
    Query(query): Query<LayersQuery>,
) -> Result<Response, ApiError> {
    let filter = query
        .date
        .as_deref()
        .map(parse_request_date)
        .transpose()?
        .map(|day| DateFilter::new(day, state.date_property.as_ref()));

    let snapshot = state.cache.current();
    let layers = snapshot.filter_by_date(filter.as_ref());

    tracing::debug!(
        subject = %auth.subject(),
        date = ?filter.as_ref().map(DateFilter::day),
        layers = layers.len(),
        "Serving layers"
    );

    Ok(Json(layers).into_response())
}
