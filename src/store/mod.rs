//! Data-source seam for the feature resolver.
//!
//! [`SensorStore`] abstracts the three independently-paged sources the
//! resolver correlates (sensor metadata, forecasts, live readings) plus the
//! timestamp lookups behind the `tempo` field. [`MySqlSensorStore`] talks to
//! the external relational store; [`MemoryStore`] serves fixed rows and
//! records every call, for tests and local runs without a database.

use async_trait::async_trait;

use crate::error::StoreError;
use crate::models::{ForecastRow, ReadingRow, SensorSite};
use crate::window::ReadingQuery;

mod memory;
mod mysql;

pub use memory::{MemoryStore, StoreCall};
pub use mysql::MySqlSensorStore;

// ---

/// Read-only access to the sensor tables.
///
/// Every method acquires what it needs, runs one query and releases it
/// before returning. Rows are returned in fetch order; that order is the
/// only thing correlating the three sources.
#[async_trait]
pub trait SensorStore: Send + Sync {
    // --- Per-location metadata ---

    /// Number of physical sensors registered for `location`.
    async fn sensor_count(&self, location: &str) -> Result<i64, StoreError>;

    /// All rows of `id_sensori<location>`, in table order.
    async fn sensor_sites(&self, location: &str) -> Result<Vec<SensorSite>, StoreError>;

    // --- Shared sources ---

    /// All forecast rows. Not scoped to a location.
    async fn forecasts(&self) -> Result<Vec<ForecastRow>, StoreError>;

    /// Live readings selected by `query`.
    async fn readings(&self, query: ReadingQuery) -> Result<Vec<ReadingRow>, StoreError>;

    // --- Timestamps ---

    /// Timestamp of the 1-based `position`-th row of the time-ordered
    /// reading table, or `None` when there is no such row.
    async fn tempo_at(&self, position: i64) -> Result<Option<String>, StoreError>;

    /// Timestamp of the most recent reading row.
    async fn latest_tempo(&self) -> Result<Option<String>, StoreError>;
}

/// Format used for `tempo` values on the wire.
pub const TEMPO_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
