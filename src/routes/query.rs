//! Query endpoint.
//!
//! `POST /` and `POST /query` accept a JSON body `{ query?, loc, giorni? }`
//! and answer with the GraphQL response `{ data, errors? }`. Requests that
//! fail validation never reach the schema and get a plain-text 400.

use axum::{
    body::Bytes,
    extract::State,
    routing::post,
    Json, Router,
};
use tracing::{debug, info, Instrument};
use uuid::Uuid;

use super::AppState;
use crate::error::QueryError;
use crate::executor::{self, QueryRequest};

// ---

pub fn router() -> Router<AppState> {
    // ---
    Router::new()
        .route("/", post(handler))
        .route("/query", post(handler))
}

async fn handler(
    State(schema): State<AppState>,
    body: Bytes,
) -> Result<Json<serde_json::Value>, QueryError> {
    // ---
    let span = tracing::info_span!("query", request_id = %Uuid::new_v4());

    async move {
        info!("POST /query - Starting");

        let request = QueryRequest::from_slice(&body).inspect_err(|_| {
            debug!(body = %String::from_utf8_lossy(&body), "Undecodable request body");
        })?;
        let (document, ctx) = request.prepare()?;

        debug!(locations = ?ctx.locations.as_slice(), "POST /query - Executing");
        let result = executor::execute(&schema, &document, ctx).await?;

        info!("POST /query - Returning OK");
        Ok(Json(result))
    }
    .instrument(span)
    .await
}
