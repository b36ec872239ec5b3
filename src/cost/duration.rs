use chrono::{DateTime, Utc};

use crate::error::{Result, RunCostError};

/// Parses a provider timestamp such as `2024-06-15T10:30:00Z`.
///
/// `None` input yields `Ok(None)`; malformed input is a `Timestamp` error.
pub fn parse_timestamp(value: Option<&str>) -> Result<Option<DateTime<Utc>>> {
    let Some(value) = value else {
        return Ok(None);
    };

    DateTime::parse_from_rfc3339(value)
        .map(|dt| Some(dt.with_timezone(&Utc)))
        .map_err(|source| RunCostError::Timestamp {
            value: value.to_string(),
            source,
        })
}

/// Elapsed minutes between two points, floored at zero. A missing end (job
/// still running) or missing start counts as zero.
#[allow(clippy::cast_precision_loss)]
pub fn elapsed_minutes(start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> f64 {
    match (start, end) {
        (Some(start), Some(end)) => {
            ((end - start).num_milliseconds() as f64 / 60_000.0).max(0.0)
        }
        _ => 0.0,
    }
}
