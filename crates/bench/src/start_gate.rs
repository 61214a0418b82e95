//! Wall-clock start gate.
//!
//! Lets several harness processes on different machines begin submitting at
//! the same moment. Times are `YYYY-MM-DD HH:mm:ss` in local time.

use chrono::{DateTime, Local, NaiveDateTime, TimeZone};
use std::time::Duration;
use tracing::{info, warn};

/// `chrono` format of a start time.
pub const START_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// When channels may start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartGate {
    Immediate,
    At(DateTime<Local>),
}

impl StartGate {
    /// Parse a start time. Empty, malformed, or past values start immediately.
    pub fn parse(value: &str) -> Self {
        Self::parse_at(value, Local::now())
    }

    /// Like [`StartGate::parse`], relative to `now`.
    pub fn parse_at(value: &str, now: DateTime<Local>) -> Self {
        let value = value.trim();
        if value.is_empty() {
            return StartGate::Immediate;
        }
        if !has_start_time_shape(value) {
            warn!(
                start_time = value,
                "Start time is not YYYY-MM-DD HH:mm:ss, starting now"
            );
            return StartGate::Immediate;
        }

        let Ok(naive) = NaiveDateTime::parse_from_str(value, START_TIME_FORMAT) else {
            warn!(
                start_time = value,
                "Start time is not a valid date, starting now"
            );
            return StartGate::Immediate;
        };
        let Some(at) = Local.from_local_datetime(&naive).earliest() else {
            warn!(
                start_time = value,
                "Start time does not exist in local time, starting now"
            );
            return StartGate::Immediate;
        };
        if at <= now {
            warn!(start_time = value, "Start time has passed, starting now");
            return StartGate::Immediate;
        }
        StartGate::At(at)
    }

    /// Time left until the gate opens.
    pub fn delay_from(&self, now: DateTime<Local>) -> Duration {
        match self {
            StartGate::Immediate => Duration::ZERO,
            StartGate::At(at) => (*at - now).to_std().unwrap_or(Duration::ZERO),
        }
    }

    /// Sleep until the gate opens.
    pub async fn wait(&self) {
        let delay = self.delay_from(Local::now());
        if let StartGate::At(at) = self {
            info!(
                start_time = %at.format(START_TIME_FORMAT),
                delay_secs = delay.as_secs_f64(),
                "Waiting for start time"
            );
        }
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}

fn has_start_time_shape(value: &str) -> bool {
    let bytes = value.as_bytes();
    bytes.len() == 19
        && bytes.iter().enumerate().all(|(i, b)| match i {
            4 | 7 => *b == b'-',
            10 => *b == b' ',
            13 | 16 => *b == b':',
            _ => b.is_ascii_digit(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> DateTime<Local> {
        Local
            .with_ymd_and_hms(2030, 1, 1, 12, 0, 0)
            .earliest()
            .unwrap()
    }

    #[test]
    fn test_future_time_waits() {
        let gate = StartGate::parse_at("2030-01-01 12:00:30", now());
        assert!(matches!(gate, StartGate::At(_)));
        assert_eq!(gate.delay_from(now()), Duration::from_secs(30));
    }

    #[test]
    fn test_invalid_or_past_starts_immediately() {
        for value in [
            "",
            "   ",
            "2030-01-01",
            "2030-1-1 12:00:30",
            "2030-01-01T12:00:30",
            "2030-13-01 12:00:00",
            "2030-02-30 12:00:00",
            "2029-12-31 23:59:59",
            "2030-01-01 12:00:00",
        ] {
            assert_eq!(
                StartGate::parse_at(value, now()),
                StartGate::Immediate,
                "{value:?}"
            );
        }
    }

    #[test]
    fn test_immediate_has_no_delay() {
        assert_eq!(StartGate::Immediate.delay_from(now()), Duration::ZERO);
    }

    #[tokio::test]
    async fn test_wait_on_immediate_returns() {
        StartGate::parse("not a time").wait().await;
    }
}
