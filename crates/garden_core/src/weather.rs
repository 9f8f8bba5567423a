//! Rain-series collaborator contract and pure shaping helpers.
//!
//! # Responsibility
//! - Describe the external rain-series source the core depends on.
//! - Split fetched days into observed and forecast halves.
//!
//! # Invariants
//! - The core never calls a [`RainSeriesSource`] itself; callers fetch and
//!   hand the result to pure projections.
//! - Non-finite or negative rainfall reads as `0.0`.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Rainfall for one calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RainDay {
    pub date: NaiveDate,
    pub rain_mm: f64,
}

impl RainDay {
    pub fn new(date: NaiveDate, rain_mm: f64) -> Self {
        Self {
            date,
            rain_mm: if rain_mm.is_finite() && rain_mm > 0.0 {
                rain_mm
            } else {
                0.0
            },
        }
    }
}

/// Days up to and including "today", and days after it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RainSeries {
    /// Oldest first.
    pub past: Vec<RainDay>,
    /// Oldest first.
    pub forecast: Vec<RainDay>,
}

impl RainSeries {
    /// Partitions `days` around `today`; each half is sorted by date.
    pub fn split(days: impl IntoIterator<Item = RainDay>, today: NaiveDate) -> Self {
        let (mut past, mut forecast): (Vec<_>, Vec<_>) = days
            .into_iter()
            .map(|day| RainDay::new(day.date, day.rain_mm))
            .partition(|day| day.date <= today);
        past.sort_by_key(|day| day.date);
        forecast.sort_by_key(|day| day.date);
        Self { past, forecast }
    }

    pub fn past_total(&self) -> f64 {
        total(&self.past)
    }

    pub fn forecast_total(&self) -> f64 {
        total(&self.forecast)
    }

    /// Rain over the last `days` observed days.
    pub fn recent_total(&self, days: usize) -> f64 {
        let skip = self.past.len().saturating_sub(days);
        total(&self.past[skip..])
    }
}

fn total(days: &[RainDay]) -> f64 {
    days.iter().map(|day| day.rain_mm).sum()
}

/// Failure reported by a rain-series source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WeatherError {
    /// Transport failure before any response.
    Network(String),
    /// Non-success HTTP status.
    Http(u16),
}

impl Display for WeatherError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Network(message) => write!(f, "network error: {message}"),
            Self::Http(status) => write!(f, "HTTP {status}"),
        }
    }
}

impl Error for WeatherError {}

/// External provider of daily precipitation.
pub trait RainSeriesSource {
    /// Fetches `past_days` observed days (today included) and `next_days`
    /// forecast days around `(lat, lon)`.
    fn fetch_rain_series(
        &self,
        lat: f64,
        lon: f64,
        past_days: u32,
        next_days: u32,
    ) -> Result<Vec<RainDay>, WeatherError>;
}

#[cfg(test)]
mod tests {
    use super::{RainDay, RainSeries, WeatherError};
    use chrono::NaiveDate;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 7, d).unwrap()
    }

    #[test]
    fn split_keeps_today_in_past_and_sorts_halves() {
        let series = RainSeries::split(
            vec![
                RainDay::new(day(12), 4.0),
                RainDay::new(day(10), 1.5),
                RainDay::new(day(11), f64::NAN),
                RainDay::new(day(9), 2.0),
            ],
            day(10),
        );
        let past: Vec<_> = series.past.iter().map(|d| d.date).collect();
        assert_eq!(past, vec![day(9), day(10)]);
        assert_eq!(series.forecast[0].date, day(11));
        assert_eq!(series.forecast[0].rain_mm, 0.0);
        assert_eq!(series.past_total(), 3.5);
        assert_eq!(series.forecast_total(), 4.0);
        assert_eq!(series.recent_total(1), 1.5);
        assert_eq!(series.recent_total(10), 3.5);
    }

    #[test]
    fn http_error_shows_status() {
        assert_eq!(WeatherError::Http(503).to_string(), "HTTP 503");
    }
}
