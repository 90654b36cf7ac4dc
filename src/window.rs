//! Row-window arithmetic over the descending time-ordered reading table.
//!
//! The reading table holds one row per sensor per sampling interval, ordered
//! by time descending. Going `n` samples back therefore means skipping
//! `sensor_count * n` rows. The arithmetic assumes the sensor count does not
//! change between the count query and the reading query; when it does, the
//! window silently lands on the wrong slice.

use crate::error::QueryError;
use crate::location::WEATHER_SERVICE;

// ---

/// Normalized "how many samples back" offset. Always `>= 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DaysBack(i64);

impl DaysBack {
    /// Normalize the caller's `giorni` value.
    ///
    /// `0` means the most recent sample and maps to `1`; negative values are
    /// rejected with [`QueryError::InvalidWindow`].
    pub fn normalize(giorni: i64) -> Result<Self, QueryError> {
        // ---
        let days = if giorni == 0 { 1 } else { giorni };
        if days < 1 {
            return Err(QueryError::InvalidWindow(giorni));
        }
        Ok(DaysBack(days))
    }

    pub fn get(self) -> i64 {
        self.0
    }
}

/// Window for one location: its live sensor count and the derived offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub sensor_count: i64,
    pub days_back: i64,
    pub absolute_offset: i64,
}

impl TimeWindow {
    /// Build the window for `sensor_count` live sensors.
    ///
    /// Fails with [`QueryError::InvalidWindow`] when the offset or either
    /// bound derived from it does not fit in an `i64`.
    pub fn new(sensor_count: i64, days_back: DaysBack) -> Result<Self, QueryError> {
        // ---
        let days = days_back.get();
        let absolute_offset = sensor_count
            .checked_mul(days)
            .filter(|offset| offset.checked_sub(sensor_count).is_some())
            .filter(|offset| offset.checked_sub(days).is_some())
            .ok_or(QueryError::InvalidWindow(days))?;

        Ok(TimeWindow {
            sensor_count,
            days_back: days,
            absolute_offset,
        })
    }

    /// Bounds `(absolute_offset - sensor_count, absolute_offset)` fed to the
    /// generic reading query's `LIMIT` clause.
    pub fn reading_bounds(&self) -> (i64, i64) {
        (self.absolute_offset - self.sensor_count, self.absolute_offset)
    }

    /// 1-based row position whose timestamp labels the collection.
    pub fn tempo_position(&self) -> i64 {
        self.absolute_offset - self.days_back
    }
}

/// Reading query for one location, chosen by the location discriminant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadingQuery {
    /// Generic `sensori` table, `LIMIT start, end`.
    Windowed { start: i64, end: i64 },
    /// Weather-service table, latest `limit` rows only.
    Latest { limit: i64 },
}

impl ReadingQuery {
    pub fn for_location(location: &str, window: &TimeWindow) -> Self {
        // ---
        if location == WEATHER_SERVICE {
            ReadingQuery::Latest {
                limit: window.sensor_count,
            }
        } else {
            let (start, end) = window.reading_bounds();
            ReadingQuery::Windowed { start, end }
        }
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    #[test]
    fn test_zero_means_latest_sample() {
        // ---
        assert_eq!(DaysBack::normalize(0).unwrap(), DaysBack::normalize(1).unwrap());
        assert_eq!(DaysBack::normalize(0).unwrap().get(), 1);
    }

    #[test]
    fn test_negative_days_rejected() {
        // ---
        assert!(matches!(
            DaysBack::normalize(-1),
            Err(QueryError::InvalidWindow(-1))
        ));
        assert!(DaysBack::normalize(-30).is_err());
    }

    #[test]
    fn test_offset_is_count_times_days() {
        // ---
        for count in [0, 1, 7, 12] {
            for days in 1..=5 {
                let window = TimeWindow::new(count, DaysBack::normalize(days).unwrap()).unwrap();
                assert_eq!(window.absolute_offset, count * days);
            }
        }
    }

    #[test]
    fn test_reading_bounds() {
        // ---
        let window = TimeWindow::new(4, DaysBack::normalize(3).unwrap()).unwrap();
        assert_eq!(window.reading_bounds(), (8, 12));
        assert_eq!(window.tempo_position(), 9);
    }

    #[test]
    fn test_offset_overflow_is_rejected() {
        // ---
        let days = DaysBack::normalize(i64::MAX / 2).unwrap();
        assert!(matches!(
            TimeWindow::new(3, days),
            Err(QueryError::InvalidWindow(d)) if d == i64::MAX / 2
        ));

        // Largest offset that still fits is accepted
        let days = DaysBack::normalize(i64::MAX / 3).unwrap();
        let window = TimeWindow::new(3, days).unwrap();
        assert_eq!(window.reading_bounds().1, (i64::MAX / 3) * 3);
    }

    #[test]
    fn test_weather_service_uses_count_only() {
        // ---
        let window = TimeWindow::new(5, DaysBack::normalize(2).unwrap()).unwrap();
        assert_eq!(
            ReadingQuery::for_location(WEATHER_SERVICE, &window),
            ReadingQuery::Latest { limit: 5 }
        );
        assert_eq!(
            ReadingQuery::for_location("milano", &window),
            ReadingQuery::Windowed { start: 5, end: 10 }
        );
    }
}
