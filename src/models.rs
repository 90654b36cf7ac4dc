//! Data models for the sensor feature collection.
//!
//! Two families live here: the raw rows fetched from the three data sources
//! (`SensorSite`, `ForecastRow`, `ReadingRow`) and the GeoJSON-like records
//! they are merged into (`Feature`, `Geometry`, `SensorReading`,
//! `ResultEnvelope`).

use serde::{Deserialize, Serialize};

// ---

/// One row of `id_sensori<location>`: a physical sensor and where it sits.
#[derive(Debug, Clone, PartialEq)]
pub struct SensorSite {
    // ---
    pub id: Option<String>,
    /// Second column of the metadata table.
    pub latitude: Option<f64>,
    /// Third column of the metadata table.
    pub longitude: Option<f64>,
}

/// One row of `previsioni`: four forecast horizons for each pollutant.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ForecastRow {
    // ---
    pub pm10: [Option<f64>; 4],
    pub no2: [Option<f64>; 4],
    pub o3: [Option<f64>; 4],
}

/// One live sample, already mapped onto the generic reading columns.
///
/// The weather-service source fills `temp` with its `pm25` column and `no2`
/// with its `no` column; the store performs that mapping.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReadingRow {
    // ---
    pub pm10: Option<f64>,
    pub temp: Option<f64>,
    pub umi: Option<f64>,
    pub prec: Option<f64>,
    pub vento: Option<f64>,
    pub no2: Option<f64>,
    pub o3: Option<f64>,
}

/// Point geometry. `coordinates` holds `[longitude slot, latitude slot]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Geometry {
    // ---
    #[serde(rename = "type")]
    pub kind: String,
    pub coordinates: [Option<f64>; 2],
}

/// Flat properties record of a feature: current values plus forecasts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SensorReading {
    // ---
    pub idsensore: Option<String>,
    pub pm10: Option<f64>,
    pub pm10p1: Option<f64>,
    pub pm10p2: Option<f64>,
    pub pm10p3: Option<f64>,
    pub pm10p4: Option<f64>,
    pub temp: Option<f64>,
    pub umi: Option<f64>,
    pub prec: Option<f64>,
    pub vento: Option<f64>,
    pub no2: Option<f64>,
    pub no2p1: Option<f64>,
    pub no2p2: Option<f64>,
    pub no2p3: Option<f64>,
    pub no2p4: Option<f64>,
    pub o3: Option<f64>,
    pub o3p1: Option<f64>,
    pub o3p2: Option<f64>,
    pub o3p3: Option<f64>,
    pub o3p4: Option<f64>,
}

/// One sensor's merged metadata, live reading and forecast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    // ---
    #[serde(rename = "type")]
    pub kind: String,
    pub geometry: Geometry,
    pub properties: SensorReading,
}

/// Root object of a successful query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultEnvelope {
    // ---
    pub tempo: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub features: Vec<Feature>,
}

impl Feature {
    /// Merge the rows fetched at the same position of the three cursors.
    ///
    /// Missing forecast or reading rows leave their properties null. The
    /// coordinates are laid out as the metadata columns have always been
    /// scanned: third column first, second column last.
    pub fn from_rows(
        site: SensorSite,
        forecast: Option<&ForecastRow>,
        reading: Option<&ReadingRow>,
    ) -> Self {
        // ---
        let forecast = forecast.cloned().unwrap_or_default();
        let reading = reading.cloned().unwrap_or_default();

        Feature {
            kind: "Feature".to_string(),
            geometry: Geometry {
                kind: "Point".to_string(),
                coordinates: [site.longitude, site.latitude],
            },
            properties: SensorReading {
                idsensore: site.id,
                pm10: reading.pm10,
                pm10p1: forecast.pm10[0],
                pm10p2: forecast.pm10[1],
                pm10p3: forecast.pm10[2],
                pm10p4: forecast.pm10[3],
                temp: reading.temp,
                umi: reading.umi,
                prec: reading.prec,
                vento: reading.vento,
                no2: reading.no2,
                no2p1: forecast.no2[0],
                no2p2: forecast.no2[1],
                no2p3: forecast.no2[2],
                no2p4: forecast.no2[3],
                o3: reading.o3,
                o3p1: forecast.o3[0],
                o3p2: forecast.o3[1],
                o3p3: forecast.o3[2],
                o3p4: forecast.o3[3],
            },
        }
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    fn site(id: &str) -> SensorSite {
        SensorSite {
            id: Some(id.to_string()),
            latitude: Some(45.46),
            longitude: Some(9.19),
        }
    }

    #[test]
    fn test_feature_from_all_rows() {
        // ---
        let forecast = ForecastRow {
            pm10: [Some(1.0), Some(2.0), Some(3.0), Some(4.0)],
            no2: [Some(5.0), Some(6.0), Some(7.0), Some(8.0)],
            o3: [Some(9.0), Some(10.0), Some(11.0), Some(12.0)],
        };
        let reading = ReadingRow {
            pm10: Some(21.0),
            temp: Some(18.5),
            umi: Some(60.0),
            prec: Some(0.0),
            vento: Some(3.2),
            no2: Some(40.0),
            o3: Some(80.0),
        };

        let feature = Feature::from_rows(site("s1"), Some(&forecast), Some(&reading));

        assert_eq!(feature.kind, "Feature");
        assert_eq!(feature.geometry.kind, "Point");
        assert_eq!(feature.properties.idsensore.as_deref(), Some("s1"));
        assert_eq!(feature.properties.pm10, Some(21.0));
        assert_eq!(feature.properties.temp, Some(18.5));
        assert_eq!(feature.properties.pm10p4, Some(4.0));
        assert_eq!(feature.properties.no2p3, Some(7.0));
        assert_eq!(feature.properties.o3p1, Some(9.0));
    }

    #[test]
    fn test_coordinates_keep_scan_order() {
        // ---
        // Third metadata column goes to slot 0, second column to slot 1
        let feature = Feature::from_rows(site("s1"), None, None);
        assert_eq!(feature.geometry.coordinates, [Some(9.19), Some(45.46)]);
    }

    #[test]
    fn test_missing_rows_leave_nulls() {
        // ---
        let feature = Feature::from_rows(site("s2"), None, None);
        assert_eq!(feature.properties.idsensore.as_deref(), Some("s2"));
        assert_eq!(feature.properties.pm10, None);
        assert_eq!(feature.properties.o3p4, None);
    }

    #[test]
    fn test_envelope_survives_wire_format() {
        // ---
        let envelope = ResultEnvelope {
            tempo: "2020-03-01 10:00:00".to_string(),
            kind: "FeatureCollection".to_string(),
            features: vec![Feature::from_rows(site("s3"), None, Some(&ReadingRow::default()))],
        };

        let json = serde_json::to_string(&envelope).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["type"], "FeatureCollection");
        assert_eq!(value["features"][0]["geometry"]["type"], "Point");

        let decoded: ResultEnvelope = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, envelope);
    }
}
