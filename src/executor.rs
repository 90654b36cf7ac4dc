//! Query execution: request parameters in, serialized GraphQL response out.

use async_graphql::dynamic::Schema;
use async_graphql::{Request, Value};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::QueryError;
use crate::location;
use crate::resolver::QueryContext;
use crate::window::DaysBack;

// ---

/// Document run when the caller sends no `query`.
pub const DEFAULT_QUERY: &str = r#"
{
    tempo
    type
    features {
        type
        geometry {
            type
            coordinates
        }
        properties {
            idsensore
            pm10
            temp
            prec
            vento
            no2
            o3
        }
    }
}
"#;

/// Body of a query request.
#[derive(Debug, Default, Deserialize)]
pub struct QueryRequest {
    /// GraphQL document; empty or absent selects [`DEFAULT_QUERY`].
    #[serde(default)]
    pub query: Option<String>,
    /// Comma-separated location tokens or a named region.
    #[serde(default)]
    pub loc: Option<String>,
    /// Samples back from the latest; absent or `0` is the latest.
    #[serde(default)]
    pub giorni: Option<i64>,
}

impl QueryRequest {
    /// Decode a raw request body.
    pub fn from_slice(body: &[u8]) -> Result<Self, QueryError> {
        serde_json::from_slice(body).map_err(|e| QueryError::MalformedRequest(e.to_string()))
    }

    /// Validate the parameters and split them into document and context.
    ///
    /// Fails before anything touches the store.
    pub fn prepare(self) -> Result<(String, QueryContext), QueryError> {
        // ---
        let locations = location::resolve(self.loc.as_deref().unwrap_or_default())?;
        let days_back = DaysBack::normalize(self.giorni.unwrap_or(0))?;

        let document = self
            .query
            .filter(|q| !q.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_QUERY.to_string());

        Ok((
            document,
            QueryContext {
                locations,
                days_back,
            },
        ))
    }
}

/// Run `document` against `schema` with `ctx` attached.
///
/// A response carrying errors but no data (parse or validation failure) is
/// [`QueryError::SchemaExecutionFailed`]. Partial data with field errors is a
/// successful result; the errors travel in the `errors` array.
pub async fn execute(
    schema: &Schema,
    document: &str,
    ctx: QueryContext,
) -> Result<serde_json::Value, QueryError> {
    // ---
    debug!(locations = ?ctx.locations.as_slice(), days_back = ctx.days_back.get(), "Executing query");

    let response = schema.execute(Request::new(document).data(ctx)).await;

    if !response.errors.is_empty() {
        if response.data == Value::Null {
            return Err(QueryError::SchemaExecutionFailed(response.errors));
        }
        for error in &response.errors {
            warn!(message = %error.message, path = ?error.path, "Field resolved with error");
        }
    }

    Ok(serde_json::to_value(&response)?)
}

#[cfg(test)]
mod tests {
    // ---
    use std::sync::Arc;

    use super::*;
    use crate::graphql::build_schema;
    use crate::models::{ForecastRow, ReadingRow, SensorSite};
    use crate::resolver::MergePolicy;
    use crate::store::{MemoryStore, SensorStore};

    fn store() -> MemoryStore {
        MemoryStore::new()
            .with_location(
                "milano",
                vec![SensorSite {
                    id: Some("mi-1".into()),
                    latitude: Some(45.46),
                    longitude: Some(9.19),
                }],
            )
            .with_forecasts(vec![ForecastRow::default()])
            .with_readings(vec![ReadingRow {
                pm10: Some(33.0),
                ..Default::default()
            }])
            .with_tempos(vec!["2020-03-01 10:00:00".into()])
    }

    fn schema(store: MemoryStore) -> Schema {
        let store: Arc<dyn SensorStore> = Arc::new(store);
        build_schema(store, MergePolicy::Ordinal).unwrap()
    }

    fn request(loc: &str) -> QueryRequest {
        QueryRequest {
            loc: Some(loc.into()),
            ..Default::default()
        }
    }

    #[test]
    fn test_prepare_defaults() {
        // ---
        let (document, ctx) = request("lombardia").prepare().unwrap();
        assert_eq!(document, DEFAULT_QUERY);
        assert_eq!(ctx.locations.as_slice(), ["milano".to_string()]);
        assert_eq!(ctx.days_back.get(), 1);
    }

    #[test]
    fn test_prepare_rejects_missing_location() {
        // ---
        assert!(matches!(
            QueryRequest::default().prepare(),
            Err(QueryError::InvalidLocation)
        ));
        assert!(matches!(
            request("").prepare(),
            Err(QueryError::InvalidLocation)
        ));
    }

    #[test]
    fn test_prepare_rejects_negative_days() {
        // ---
        let req = QueryRequest {
            giorni: Some(-1),
            ..request("milano")
        };
        assert!(matches!(req.prepare(), Err(QueryError::InvalidWindow(-1))));
    }

    #[test]
    fn test_from_slice_reports_malformed_body() {
        // ---
        assert!(matches!(
            QueryRequest::from_slice(b"{loc:"),
            Err(QueryError::MalformedRequest(_))
        ));
        let req = QueryRequest::from_slice(br#"{"loc":"tutto","giorni":2}"#).unwrap();
        assert_eq!(req.loc.as_deref(), Some("tutto"));
        assert_eq!(req.giorni, Some(2));
    }

    #[tokio::test]
    async fn test_default_document_resolves_collection() {
        // ---
        let (document, ctx) = request("lombardia").prepare().unwrap();
        let result = execute(&schema(store()), &document, ctx).await.unwrap();

        let data = &result["data"];
        assert_eq!(data["type"], "FeatureCollection");
        assert_eq!(data["tempo"], "2020-03-01 10:00:00");
        assert_eq!(data["features"][0]["type"], "Feature");
        assert_eq!(data["features"][0]["geometry"]["type"], "Point");
        assert_eq!(data["features"][0]["geometry"]["coordinates"][0], 9.19);
        assert_eq!(data["features"][0]["properties"]["idsensore"], "mi-1");
        assert_eq!(data["features"][0]["properties"]["pm10"], 33.0);
        assert!(result.get("errors").is_none());
    }

    #[tokio::test]
    async fn test_invalid_document_fails_execution() {
        // ---
        let (_, ctx) = request("milano").prepare().unwrap();
        let err = execute(&schema(store()), "{ nonsense }", ctx)
            .await
            .unwrap_err();
        match err {
            QueryError::SchemaExecutionFailed(errors) => assert!(!errors.is_empty()),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unknown_location_is_field_error() {
        // ---
        let (document, ctx) = request("milano,atlantide").prepare().unwrap();
        let result = execute(&schema(store()), &document, ctx).await.unwrap();

        assert_eq!(result["data"]["type"], "FeatureCollection");
        assert!(result["data"]["features"].is_null());
        assert_eq!(
            result["errors"][0]["extensions"]["code"],
            "UNKNOWN_DATA_SOURCE"
        );
    }

    #[tokio::test]
    async fn test_tempo_only_query_skips_features() {
        // ---
        let req = QueryRequest {
            query: Some("{ tempo }".into()),
            ..request("milano")
        };
        let (document, ctx) = req.prepare().unwrap();
        let store = Arc::new(store());
        let shared: Arc<dyn SensorStore> = store.clone();
        let schema = build_schema(shared, MergePolicy::Ordinal).unwrap();

        let result = execute(&schema, &document, ctx).await.unwrap();

        assert_eq!(result["data"]["tempo"], "2020-03-01 10:00:00");
        assert!(!store
            .calls()
            .await
            .iter()
            .any(|c| matches!(c, crate::store::StoreCall::SensorSites(_))));
    }
}
