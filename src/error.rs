//! Error taxonomy for the query path and its mapping to HTTP responses.
//!
//! Request-shape failures (`InvalidLocation`, `InvalidWindow`,
//! `MalformedRequest`) are raised before the GraphQL document runs and become
//! plain-text client errors. Source failures raised inside the `features`
//! resolver become GraphQL field errors carrying an `extensions.code`.

use async_graphql::{ErrorExtensions, ServerError};
use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use thiserror::Error;

// ---

/// Failures of the data-source layer.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The location suffix cannot form a table name.
    #[error("invalid data source name: {0:?}")]
    InvalidSourceName(String),

    /// The database rejected or failed the query.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A row came back with a shape the decoder does not understand.
    #[error("unexpected row shape: {0}")]
    RowShape(String),
}

/// Errors surfaced by the query path.
#[derive(Error, Debug)]
pub enum QueryError {
    /// `loc` was missing or empty.
    #[error("Specify a location with loc=")]
    InvalidLocation,

    /// Days-back offset is not positive after normalization, or too large
    /// to address a row.
    #[error("Invalid days-back offset {0}: use a positive number of samples within range")]
    InvalidWindow(i64),

    /// The metadata table of a location could not be read.
    #[error("Location {location:?} is not in the data store")]
    UnknownDataSource {
        location: String,
        #[source]
        source: StoreError,
    },

    /// A forecast or reading query failed for a location.
    #[error("Failed to read {what} for location {location:?}: {source}")]
    SourceQueryFailed {
        location: String,
        what: &'static str,
        #[source]
        source: StoreError,
    },

    /// Strict merge policy found fewer rows than metadata rows.
    #[error("Location {location:?}: {sites} sensors but only {forecasts} forecast and {readings} reading rows")]
    RowMisalignment {
        location: String,
        sites: usize,
        forecasts: usize,
        readings: usize,
    },

    /// The engine rejected the document or could not run it.
    #[error("GraphQL execution failed: {}", format_errors(.0))]
    SchemaExecutionFailed(Vec<ServerError>),

    /// The request body could not be decoded.
    #[error("Malformed request body: {0}")]
    MalformedRequest(String),

    /// The engine's response could not be serialized.
    #[error("Failed to encode response: {0}")]
    ResponseEncoding(#[from] serde_json::Error),
}

fn format_errors(errors: &[ServerError]) -> String {
    errors
        .iter()
        .map(|e| e.message.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}

impl QueryError {
    /// Stable code exposed in GraphQL error extensions.
    pub fn code(&self) -> &'static str {
        // ---
        match self {
            QueryError::InvalidLocation => "INVALID_LOCATION",
            QueryError::InvalidWindow(_) => "INVALID_WINDOW",
            QueryError::UnknownDataSource { .. } => "UNKNOWN_DATA_SOURCE",
            QueryError::SourceQueryFailed { .. } => "SOURCE_QUERY_FAILED",
            QueryError::RowMisalignment { .. } => "ROW_MISALIGNMENT",
            QueryError::SchemaExecutionFailed(_) => "SCHEMA_EXECUTION_FAILED",
            QueryError::MalformedRequest(_) => "MALFORMED_REQUEST",
            QueryError::ResponseEncoding(_) => "RESPONSE_ENCODING",
        }
    }

    pub fn status(&self) -> StatusCode {
        // ---
        match self {
            QueryError::InvalidLocation
            | QueryError::InvalidWindow(_)
            | QueryError::MalformedRequest(_)
            | QueryError::SchemaExecutionFailed(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl ErrorExtensions for QueryError {
    fn extend(&self) -> async_graphql::Error {
        // ---
        let code = self.code();
        async_graphql::Error::new(self.to_string())
            .extend_with(|_, e| e.set("code", code.to_string()))
    }
}

impl IntoResponse for QueryError {
    fn into_response(self) -> Response {
        // ---
        let status = self.status();
        tracing::error!(
            status = status.as_u16(),
            error_code = self.code(),
            error_message = %self,
            "Request failed"
        );

        match self {
            QueryError::SchemaExecutionFailed(errors) => {
                let body = serde_json::json!({ "errors": errors });
                (
                    status,
                    [(header::CONTENT_TYPE, "application/json")],
                    body.to_string(),
                )
                    .into_response()
            }
            other => (status, other.to_string()).into_response(),
        }
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    #[test]
    fn test_client_errors_are_bad_request() {
        // ---
        assert_eq!(QueryError::InvalidLocation.status(), StatusCode::BAD_REQUEST);
        assert_eq!(QueryError::InvalidWindow(-1).status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            QueryError::MalformedRequest("eof".into()).status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_source_errors_are_server_errors() {
        // ---
        let err = QueryError::UnknownDataSource {
            location: "atlantide".into(),
            source: StoreError::InvalidSourceName("atlantide".into()),
        };
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(err.to_string().contains("not in the data store"));
    }

    #[test]
    fn test_extension_code() {
        // ---
        let err = QueryError::RowMisalignment {
            location: "milano".into(),
            sites: 3,
            forecasts: 0,
            readings: 3,
        }
        .extend();
        let code = err
            .extensions
            .as_ref()
            .and_then(|ext| ext.get("code"))
            .cloned();
        assert_eq!(
            code,
            Some(async_graphql::Value::from("ROW_MISALIGNMENT".to_string()))
        );
    }
}
