//! In-memory [`SensorStore`] with call recording.
//!
//! Rows are served exactly as configured, so tests can line up (or
//! deliberately misalign) the three sources and then inspect which queries
//! the resolver issued.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::SensorStore;
use crate::error::StoreError;
use crate::models::{ForecastRow, ReadingRow, SensorSite};
use crate::window::ReadingQuery;

// ---

/// A query issued against a [`MemoryStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
    SensorCount(String),
    SensorSites(String),
    Forecasts,
    Readings(ReadingQuery),
    TempoAt(i64),
    LatestTempo,
}

/// Store serving fixed rows.
#[derive(Debug, Default)]
pub struct MemoryStore {
    sites: HashMap<String, Vec<SensorSite>>,
    forecasts: Vec<ForecastRow>,
    /// Generic reading table, most recent first.
    readings: Vec<ReadingRow>,
    /// Weather-service table, most recent first.
    weather_readings: Vec<ReadingRow>,
    /// Timestamps of the generic reading table, most recent first.
    tempos: Vec<String>,
    fail_forecasts: bool,
    fail_readings: bool,
    fail_tempo_at: bool,
    calls: Mutex<Vec<StoreCall>>,
}

fn missing_table(name: &str) -> StoreError {
    StoreError::Database(sqlx::Error::Protocol(format!(
        "Table '{name}' doesn't exist"
    )))
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `id_sensori<location>` with the given rows.
    pub fn with_location(mut self, location: &str, sites: Vec<SensorSite>) -> Self {
        self.sites.insert(location.to_string(), sites);
        self
    }

    pub fn with_forecasts(mut self, forecasts: Vec<ForecastRow>) -> Self {
        self.forecasts = forecasts;
        self
    }

    pub fn with_readings(mut self, readings: Vec<ReadingRow>) -> Self {
        self.readings = readings;
        self
    }

    pub fn with_weather_readings(mut self, readings: Vec<ReadingRow>) -> Self {
        self.weather_readings = readings;
        self
    }

    pub fn with_tempos(mut self, tempos: Vec<String>) -> Self {
        self.tempos = tempos;
        self
    }

    pub fn failing_forecasts(mut self) -> Self {
        self.fail_forecasts = true;
        self
    }

    pub fn failing_readings(mut self) -> Self {
        self.fail_readings = true;
        self
    }

    /// Make the windowed `tempo` lookup fail so the fallback runs.
    pub fn failing_tempo_at(mut self) -> Self {
        self.fail_tempo_at = true;
        self
    }

    /// Every call received so far, in order.
    pub async fn calls(&self) -> Vec<StoreCall> {
        self.calls.lock().await.clone()
    }

    async fn record(&self, call: StoreCall) {
        self.calls.lock().await.push(call);
    }

    fn location_rows(&self, location: &str) -> Result<&Vec<SensorSite>, StoreError> {
        self.sites
            .get(location)
            .ok_or_else(|| missing_table(&format!("id_sensori{location}")))
    }
}

#[async_trait]
impl SensorStore for MemoryStore {
    // ---
    async fn sensor_count(&self, location: &str) -> Result<i64, StoreError> {
        self.record(StoreCall::SensorCount(location.to_string())).await;
        Ok(self.location_rows(location)?.len() as i64)
    }

    async fn sensor_sites(&self, location: &str) -> Result<Vec<SensorSite>, StoreError> {
        self.record(StoreCall::SensorSites(location.to_string())).await;
        Ok(self.location_rows(location)?.clone())
    }

    async fn forecasts(&self) -> Result<Vec<ForecastRow>, StoreError> {
        // ---
        self.record(StoreCall::Forecasts).await;
        if self.fail_forecasts {
            return Err(missing_table("previsioni"));
        }
        Ok(self.forecasts.clone())
    }

    async fn readings(&self, query: ReadingQuery) -> Result<Vec<ReadingRow>, StoreError> {
        // ---
        self.record(StoreCall::Readings(query)).await;
        if self.fail_readings {
            return Err(match query {
                ReadingQuery::Windowed { .. } => missing_table("sensori"),
                ReadingQuery::Latest { .. } => missing_table("meteoit"),
            });
        }

        // Same semantics as `LIMIT offset, count` and `LIMIT count`
        let rows = match query {
            ReadingQuery::Windowed { start, end } => self
                .readings
                .iter()
                .skip(start.max(0) as usize)
                .take(end.max(0) as usize)
                .cloned()
                .collect(),
            ReadingQuery::Latest { limit } => self
                .weather_readings
                .iter()
                .take(limit.max(0) as usize)
                .cloned()
                .collect(),
        };
        Ok(rows)
    }

    async fn tempo_at(&self, position: i64) -> Result<Option<String>, StoreError> {
        // ---
        self.record(StoreCall::TempoAt(position)).await;
        if self.fail_tempo_at {
            return Err(missing_table("sensori"));
        }
        if position < 1 {
            return Ok(None);
        }
        Ok(self.tempos.get(position as usize - 1).cloned())
    }

    async fn latest_tempo(&self) -> Result<Option<String>, StoreError> {
        self.record(StoreCall::LatestTempo).await;
        Ok(self.tempos.first().cloned())
    }
}
