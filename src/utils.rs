use crate::error::Error;
use chrono::prelude::*;
use eyre::{Result, WrapErr};
use std::convert::TryFrom;
use std::str::FromStr;
use std::time::Duration;

// Parse the datetime as either a timestamp, or as a handy string.
pub(crate) fn parse_since_argument(src: &str) -> Result<DateTime<Utc>> {
    // Try to parse as datetime
    if let Ok(dt) = DateTime::from_str(src) {
        return Ok(dt);
    }

    // Try to parse as naive datetime (and assume UTC)
    if let Ok(dt) = NaiveDateTime::from_str(src).map(|n| Utc.from_utc_datetime(&n)) {
        return Ok(dt);
    }

    // Try to parse as timestamp
    if let Some(dt) = src
        .parse::<i64>()
        .ok()
        .and_then(|i| Utc.timestamp_opt(i, 0).single())
    {
        return Ok(dt);
    }

    Err(Error::ParseSince).wrap_err("error parsing since argument")
}

/// Whole minutes, as the events API expects its duration.
pub(crate) fn whole_minutes(duration: Duration) -> i32 {
    i32::try_from(duration.as_secs() / 60).unwrap_or(i32::MAX)
}
