//! Field resolution for the root query: `features` and `tempo`.
//!
//! Both are plain async functions of a [`SensorStore`] and the request's
//! [`QueryContext`], so they can be exercised without building a schema.
//!
//! `features` correlates three sources per location purely by fetch order:
//! row N of the metadata table, row N of the forecast table and row N of the
//! reading window make up feature N. No key ties them together, so any
//! divergence in ordering or cardinality between the tables attaches values
//! to the wrong sensor. [`MergePolicy::Strict`] turns row shortfalls into an
//! error; the default keeps the ordinal behavior and logs the shortfall.

use tracing::{debug, info, warn, Instrument};

use crate::error::{QueryError, StoreError};
use crate::location::LocationSet;
use crate::models::{Feature, ForecastRow, ReadingRow, SensorSite};
use crate::store::SensorStore;
use crate::window::{DaysBack, ReadingQuery, TimeWindow};

// ---

/// Request-scoped parameters every resolver reads.
#[derive(Debug, Clone)]
pub struct QueryContext {
    pub locations: LocationSet,
    pub days_back: DaysBack,
}

/// What to do when forecast or reading rows run out before metadata rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MergePolicy {
    /// Leave the missing values null and carry on.
    #[default]
    Ordinal,
    /// Fail the `features` field with [`QueryError::RowMisalignment`].
    Strict,
}

/// Resolve the features of every location, in location order.
///
/// The first failing location aborts the whole resolution, even when earlier
/// locations succeeded.
pub async fn resolve_features(
    store: &dyn SensorStore,
    ctx: &QueryContext,
    policy: MergePolicy,
) -> Result<Vec<Feature>, QueryError> {
    // ---
    let mut features = Vec::new();

    for location in ctx.locations.iter() {
        let span = tracing::debug_span!("location", %location);
        let merged = resolve_location(store, location, ctx.days_back, policy)
            .instrument(span)
            .await?;
        features.extend(merged);
    }

    info!(
        locations = ctx.locations.len(),
        features = features.len(),
        "Resolved features"
    );
    Ok(features)
}

async fn resolve_location(
    store: &dyn SensorStore,
    location: &str,
    days_back: DaysBack,
    policy: MergePolicy,
) -> Result<Vec<Feature>, QueryError> {
    // ---
    let unknown = |source: StoreError| {
        warn!(error = %source, "Metadata query failed");
        QueryError::UnknownDataSource {
            location: location.to_string(),
            source,
        }
    };
    let source_failed = |what: &'static str| {
        move |source: StoreError| {
            warn!(error = %source, what, "Source query failed");
            QueryError::SourceQueryFailed {
                location: location.to_string(),
                what,
                source,
            }
        }
    };

    let sites = store.sensor_sites(location).await.map_err(unknown)?;
    let count = store.sensor_count(location).await.map_err(unknown)?;
    let window = TimeWindow::new(count, days_back)
        .inspect_err(|e| warn!(error = %e, count, "Window out of range"))?;

    let forecasts = store
        .forecasts()
        .await
        .map_err(source_failed("forecasts"))?;

    let query = ReadingQuery::for_location(location, &window);
    debug!(?window, ?query, "Fetching readings");
    let readings = store
        .readings(query)
        .await
        .map_err(source_failed("readings"))?;

    merge_ordinal(location, sites, &forecasts, &readings, policy)
}

/// Zip metadata rows with forecast and reading rows by position.
///
/// Produces exactly one feature per metadata row. Surplus forecast and
/// reading rows are never looked at.
pub fn merge_ordinal(
    location: &str,
    sites: Vec<SensorSite>,
    forecasts: &[ForecastRow],
    readings: &[ReadingRow],
    policy: MergePolicy,
) -> Result<Vec<Feature>, QueryError> {
    // ---
    let wanted = sites.len();
    if forecasts.len() < wanted || readings.len() < wanted {
        if policy == MergePolicy::Strict {
            return Err(QueryError::RowMisalignment {
                location: location.to_string(),
                sites: wanted,
                forecasts: forecasts.len(),
                readings: readings.len(),
            });
        }
        warn!(
            location,
            sites = wanted,
            forecasts = forecasts.len(),
            readings = readings.len(),
            "Fewer forecast or reading rows than sensors; missing values left null"
        );
    }

    let mut forecasts = forecasts.iter();
    let mut readings = readings.iter();

    Ok(sites
        .into_iter()
        .map(|site| Feature::from_rows(site, forecasts.next(), readings.next()))
        .collect())
}

/// One step of the `tempo` lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TempoLookup {
    /// Timestamp at the computed window bound of the primary location.
    AtWindow,
    /// Timestamp of the most recent row.
    MostRecent,
}

impl TempoLookup {
    async fn run(
        self,
        store: &dyn SensorStore,
        ctx: &QueryContext,
    ) -> anyhow::Result<Option<String>> {
        // ---
        match self {
            TempoLookup::AtWindow => {
                let count = store.sensor_count(ctx.locations.primary()).await?;
                let window = TimeWindow::new(count, ctx.days_back)?;
                Ok(store.tempo_at(window.tempo_position()).await?)
            }
            TempoLookup::MostRecent => Ok(store.latest_tempo().await?),
        }
    }
}

/// Resolve the collection timestamp.
///
/// Tries the window bound first and falls back once to the most recent row.
/// Never fails: when both lookups come up empty the result is `""`.
pub async fn resolve_tempo(store: &dyn SensorStore, ctx: &QueryContext) -> String {
    // ---
    for step in [TempoLookup::AtWindow, TempoLookup::MostRecent] {
        match step.run(store, ctx).await {
            Ok(Some(tempo)) => return tempo,
            Ok(None) => debug!(?step, "No timestamp found"),
            Err(e) => warn!(?step, error = %e, "Timestamp lookup failed"),
        }
    }

    warn!("No timestamp available, returning empty tempo");
    String::new()
}
