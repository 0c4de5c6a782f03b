//! Local time source
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{DateTime, Utc};

use crate::packet::{NtpTimestamp, NTP_UNIX_OFFSET};

/// Converts seconds since the NTP epoch into calendar time
#[must_use]
pub fn seconds_to_datetime(seconds: f64) -> Option<DateTime<Utc>> {
    if !seconds.is_finite() {
        return None;
    }

    let unix = seconds - f64::from(NTP_UNIX_OFFSET);
    let whole = unix.floor();

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let nanos = (((unix - whole) * 1e9).round() as u32).min(999_999_999);

    #[allow(clippy::cast_possible_truncation)]
    DateTime::from_timestamp(whole as i64, nanos)
}

/// Converts calendar time into seconds since the NTP epoch
#[allow(clippy::cast_precision_loss)]
#[must_use]
pub fn datetime_to_seconds(time: &DateTime<Utc>) -> f64 {
    time.timestamp() as f64
        + f64::from(NTP_UNIX_OFFSET)
        + f64::from(time.timestamp_subsec_nanos()) / 1e9
}

/// Supplies the current local time. Injected into clients and managers so
/// tests can drive a virtual clock.
pub trait TimeSource: Send + Sync {
    /// Seconds since the NTP epoch
    fn now(&self) -> f64;

    fn now_timestamp(&self) -> NtpTimestamp {
        NtpTimestamp::from_seconds(self.now())
    }

    fn now_datetime(&self) -> Option<DateTime<Utc>> {
        seconds_to_datetime(self.now())
    }
}

/// [`TimeSource`] backed by [`SystemTime`]
#[derive(Copy, Clone, Default, Debug)]
pub struct StdTimeSource;

impl TimeSource for StdTimeSource {
    fn now(&self) -> f64 {
        let unix = match SystemTime::now().duration_since(UNIX_EPOCH) {
            Ok(since) => since.as_secs_f64(),
            Err(err) => -err.duration().as_secs_f64(),
        };

        unix + f64::from(NTP_UNIX_OFFSET)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_std_time_source_is_after_2020() {
        // 2020-01-01T00:00:00Z
        assert!(StdTimeSource.now() > 3_786_825_600.0);
        assert!(StdTimeSource.now_timestamp().seconds() > 3_786_825_600);
    }

    #[test]
    fn test_datetime_roundtrip() {
        let seconds = 3_671_618_363.25;
        let time = seconds_to_datetime(seconds).unwrap();

        assert_eq!(
            time.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string(),
            "2016-05-07T13:59:23.250Z"
        );
        assert!((datetime_to_seconds(&time) - seconds).abs() < 1e-6);
        assert_eq!(seconds_to_datetime(f64::INFINITY), None);
    }
}
