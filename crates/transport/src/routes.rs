//! HTTP routes
//!
//! - `POST /events` - submit one record or a list of records
//!
//! Every acknowledgement is answered with `200 OK`; the outcome is carried
//! by the `status` field of the body.

use axum::extract::{DefaultBodyLimit, State};
use axum::http::header::CONTENT_TYPE;
use axum::http::HeaderMap;
use axum::routing::post;
use axum::{Json, Router};
use bytes::Bytes;

use contracts::{IngestAck, ShardBackend};

use crate::service::IngestService;

/// Build the ingest router
pub fn router<B>(service: IngestService<B>, max_body_bytes: usize) -> Router
where
    B: ShardBackend + Send + Sync + 'static,
{
    Router::new()
        .route("/events", post(ingest_events::<B>))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .with_state(service)
}

/// POST /events
async fn ingest_events<B>(
    State(service): State<IngestService<B>>,
    headers: HeaderMap,
    body: Bytes,
) -> Json<IngestAck>
where
    B: ShardBackend + Send + Sync + 'static,
{
    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok());

    Json(service.submit(content_type, &body))
}
