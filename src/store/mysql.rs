//! sqlx implementation of [`SensorStore`] over the MySQL sensor database.
//!
//! The database is managed elsewhere; this module only reads it. Per-location
//! metadata lives in one table per location named `id_sensori<location>`, so
//! the location suffix becomes part of an identifier and is checked before it
//! is spliced into SQL.

use async_trait::async_trait;
use chrono::NaiveDateTime;
use sqlx::{mysql::MySqlRow, ColumnIndex, MySqlPool, Row};

use super::{SensorStore, TEMPO_FORMAT};
use crate::error::StoreError;
use crate::models::{ForecastRow, ReadingRow, SensorSite};
use crate::window::ReadingQuery;

// ---

/// Store backed by a shared [`MySqlPool`].
#[derive(Debug, Clone)]
pub struct MySqlSensorStore {
    pool: MySqlPool,
}

impl MySqlSensorStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

/// Quoted name of the metadata table for `location`.
fn sensor_table(location: &str) -> Result<String, StoreError> {
    // ---
    let valid = location
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_');
    if !valid {
        return Err(StoreError::InvalidSourceName(location.to_string()));
    }
    Ok(format!("`id_sensori{location}`"))
}

/// Parse the text form MySQL uses for `DECIMAL` values.
fn parse_numeric_text(text: &str) -> Result<f64, StoreError> {
    // ---
    text.trim()
        .parse::<f64>()
        .map_err(|e| StoreError::RowShape(format!("non-numeric value {text:?}: {e}")))
}

/// Read a numeric column as `f64` whatever its SQL type.
///
/// Accepts `DOUBLE`/`FLOAT`, signed and unsigned integers, and `DECIMAL`,
/// which the MySQL protocol always ships as text.
fn decode_number<I>(row: &MySqlRow, index: I) -> Result<Option<f64>, StoreError>
where
    I: ColumnIndex<MySqlRow> + Copy,
{
    // ---
    let first_err = match row.try_get::<Option<f64>, _>(index) {
        Ok(value) => return Ok(value),
        Err(e) => e,
    };
    if let Ok(value) = row.try_get::<Option<f32>, _>(index) {
        return Ok(value.map(f64::from));
    }
    if let Ok(value) = row.try_get::<Option<i64>, _>(index) {
        return Ok(value.map(|n| n as f64));
    }
    if let Ok(value) = row.try_get::<Option<u64>, _>(index) {
        return Ok(value.map(|n| n as f64));
    }
    match row.try_get_unchecked::<Option<String>, _>(index) {
        Ok(Some(text)) => parse_numeric_text(&text).map(Some),
        Ok(None) => Ok(None),
        Err(_) => Err(first_err.into()),
    }
}

fn decode_site(row: &MySqlRow) -> Result<SensorSite, StoreError> {
    // ---
    if row.len() < 3 {
        return Err(StoreError::RowShape(format!(
            "sensor metadata row has {} columns, expected 3",
            row.len()
        )));
    }

    // Identifiers are text in some tables and integers in others
    let id = match row.try_get::<Option<String>, _>(0) {
        Ok(id) => id,
        Err(e) => match row.try_get::<Option<i64>, _>(0) {
            Ok(n) => n.map(|n| n.to_string()),
            Err(_) => row
                .try_get::<Option<u64>, _>(0)
                .map_err(|_| e)?
                .map(|n| n.to_string()),
        },
    };

    Ok(SensorSite {
        id,
        latitude: decode_number(row, 1)?,
        longitude: decode_number(row, 2)?,
    })
}

fn decode_forecast(row: &MySqlRow) -> Result<ForecastRow, StoreError> {
    // ---
    if row.len() < 12 {
        return Err(StoreError::RowShape(format!(
            "forecast row has {} columns, expected 12",
            row.len()
        )));
    }

    let mut forecast = ForecastRow::default();
    for horizon in 0..4 {
        forecast.pm10[horizon] = decode_number(row, horizon)?;
        forecast.no2[horizon] = decode_number(row, 4 + horizon)?;
        forecast.o3[horizon] = decode_number(row, 8 + horizon)?;
    }
    Ok(forecast)
}

fn decode_reading(row: &MySqlRow) -> Result<ReadingRow, StoreError> {
    // ---
    Ok(ReadingRow {
        pm10: decode_number(row, "pm10")?,
        temp: decode_number(row, "temp")?,
        umi: decode_number(row, "umi")?,
        prec: decode_number(row, "prec")?,
        vento: decode_number(row, "vento")?,
        no2: decode_number(row, "no2")?,
        o3: decode_number(row, "o3")?,
    })
}

fn format_tempo(tempo: Option<NaiveDateTime>) -> Option<String> {
    tempo.map(|t| t.format(TEMPO_FORMAT).to_string())
}

#[async_trait]
impl SensorStore for MySqlSensorStore {
    // ---
    async fn sensor_count(&self, location: &str) -> Result<i64, StoreError> {
        // ---
        let sql = format!("SELECT COUNT(*) FROM {}", sensor_table(location)?);
        let count: i64 = sqlx::query_scalar(&sql).fetch_one(&self.pool).await?;
        Ok(count)
    }

    async fn sensor_sites(&self, location: &str) -> Result<Vec<SensorSite>, StoreError> {
        // ---
        let sql = format!("SELECT * FROM {}", sensor_table(location)?);
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        rows.iter().map(decode_site).collect()
    }

    async fn forecasts(&self) -> Result<Vec<ForecastRow>, StoreError> {
        // ---
        let rows = sqlx::query("SELECT * FROM previsioni")
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(decode_forecast).collect()
    }

    async fn readings(&self, query: ReadingQuery) -> Result<Vec<ReadingRow>, StoreError> {
        // ---
        let rows = match query {
            ReadingQuery::Windowed { start, end } => {
                tracing::debug!(start, end, "Reading generic sensor window");
                sqlx::query(
                    r#"
                    SELECT pm10, temp, umi, prec, vento, no2, o3
                      FROM sensori
                     ORDER BY tempo DESC, id_sensore ASC
                     LIMIT ?, ?
                    "#,
                )
                .bind(start)
                .bind(end)
                .fetch_all(&self.pool)
                .await?
            }
            ReadingQuery::Latest { limit } => {
                tracing::debug!(limit, "Reading weather-service rows");
                sqlx::query(
                    r#"
                    SELECT pm10, pm25 AS temp, umi, prec, vento, `no` AS no2, o3
                      FROM meteoit
                     ORDER BY id DESC
                     LIMIT ?
                    "#,
                )
                .bind(limit)
                .fetch_all(&self.pool)
                .await?
            }
        };
        rows.iter().map(decode_reading).collect()
    }

    async fn tempo_at(&self, position: i64) -> Result<Option<String>, StoreError> {
        // ---
        if position < 1 {
            return Ok(None);
        }
        let tempo: Option<NaiveDateTime> = sqlx::query_scalar(
            r#"
            SELECT tempo
              FROM sensori
             ORDER BY tempo DESC, id_sensore ASC
             LIMIT 1 OFFSET ?
            "#,
        )
        .bind(position - 1)
        .fetch_optional(&self.pool)
        .await?;
        Ok(format_tempo(tempo))
    }

    async fn latest_tempo(&self) -> Result<Option<String>, StoreError> {
        // ---
        let tempo: Option<NaiveDateTime> = sqlx::query_scalar(
            "SELECT tempo FROM sensori ORDER BY tempo DESC, id_sensore ASC LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await?;
        Ok(format_tempo(tempo))
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    #[test]
    fn test_sensor_table_quotes_suffix() {
        // ---
        assert_eq!(sensor_table("milano").unwrap(), "`id_sensorimilano`");
        assert_eq!(sensor_table("area_51").unwrap(), "`id_sensoriarea_51`");
    }

    #[test]
    fn test_sensor_table_rejects_injection() {
        // ---
        for bad in ["milano; DROP TABLE sensori", "a`b", " milano", "mi-lano"] {
            assert!(matches!(
                sensor_table(bad),
                Err(StoreError::InvalidSourceName(_))
            ));
        }
    }

    #[test]
    fn test_decimal_text_parses() {
        // ---
        assert_eq!(parse_numeric_text("45.4642").unwrap(), 45.4642);
        assert_eq!(parse_numeric_text("-0.50").unwrap(), -0.5);
        assert_eq!(parse_numeric_text("12").unwrap(), 12.0);
        assert!(matches!(
            parse_numeric_text("n/a"),
            Err(StoreError::RowShape(_))
        ));
    }

    #[test]
    fn test_format_tempo() {
        // ---
        let t = NaiveDateTime::parse_from_str("2020-03-01 10:30:00", TEMPO_FORMAT).unwrap();
        assert_eq!(format_tempo(Some(t)).as_deref(), Some("2020-03-01 10:30:00"));
        assert_eq!(format_tempo(None), None);
    }
}
