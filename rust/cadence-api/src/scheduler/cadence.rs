//! Cadence rules: when a scheduled task fires.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, NaiveTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use super::{SchedulerError, TaskSpec};

/// Cadence kind as written in configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CadenceKind {
    /// Once a day at a fixed UTC time of day.
    Daily,
    /// Every fixed period, starting from registration.
    #[default]
    Interval,
}

impl fmt::Display for CadenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Daily => write!(f, "daily"),
            Self::Interval => write!(f, "interval"),
        }
    }
}

/// A validated cadence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cadence {
    Daily(NaiveTime),
    Interval(Duration),
}

impl Cadence {
    /// Validate the cadence fields of `spec`.
    pub fn from_spec(spec: &TaskSpec) -> Result<Self, SchedulerError> {
        match spec.kind {
            CadenceKind::Daily => parse_time_of_day(&spec.time_of_day)
                .map(Self::Daily)
                .ok_or_else(|| {
                    SchedulerError::invalid_cadence(
                        &spec.name,
                        format!("time of day {:?} is not in HH:MM format", spec.time_of_day),
                    )
                }),
            CadenceKind::Interval => {
                if spec.interval.is_zero() {
                    return Err(SchedulerError::invalid_cadence(
                        &spec.name,
                        "interval must be greater than zero",
                    ));
                }
                if TimeDelta::from_std(spec.interval).is_err() {
                    return Err(SchedulerError::invalid_cadence(
                        &spec.name,
                        format!("interval {:?} is out of range", spec.interval),
                    ));
                }
                Ok(Self::Interval(spec.interval))
            }
        }
    }

    #[must_use]
    pub fn kind(&self) -> CadenceKind {
        match self {
            Self::Daily(_) => CadenceKind::Daily,
            Self::Interval(_) => CadenceKind::Interval,
        }
    }

    /// The first fire time strictly after `now`.
    #[must_use]
    pub fn next_after(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        match *self {
            Self::Daily(at) => next_daily(now, at),
            Self::Interval(every) => TimeDelta::from_std(every)
                .ok()
                .and_then(|delta| now.checked_add_signed(delta))
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
        }
    }

    /// How long to wait from `now` until the next fire.
    #[must_use]
    pub fn delay_after(&self, now: DateTime<Utc>) -> Duration {
        match *self {
            Self::Interval(every) => every,
            Self::Daily(at) => (next_daily(now, at) - now).to_std().unwrap_or(Duration::ZERO),
        }
    }
}

impl fmt::Display for Cadence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Daily(at) => write!(f, "daily at {} UTC", at.format("%H:%M")),
            Self::Interval(every) => write!(f, "every {every:?}"),
        }
    }
}

/// Parse `HH:MM` (seconds are accepted but optional).
#[must_use]
pub fn parse_time_of_day(value: &str) -> Option<NaiveTime> {
    let value = value.trim();
    NaiveTime::parse_from_str(value, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M:%S"))
        .ok()
}

fn next_daily(now: DateTime<Utc>, at: NaiveTime) -> DateTime<Utc> {
    let today = now.date_naive().and_time(at).and_utc();
    if today > now {
        today
    } else {
        today + TimeDelta::days(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 14, h, m, s).unwrap()
    }

    #[test]
    fn test_parse_time_of_day() {
        assert_eq!(parse_time_of_day("09:30"), NaiveTime::from_hms_opt(9, 30, 0));
        assert_eq!(parse_time_of_day("23:59:30"), NaiveTime::from_hms_opt(23, 59, 30));
        assert_eq!(parse_time_of_day(" 00:00 "), NaiveTime::from_hms_opt(0, 0, 0));
        assert!(parse_time_of_day("24:00").is_none());
        assert!(parse_time_of_day("9am").is_none());
        assert!(parse_time_of_day("").is_none());
    }

    #[test]
    fn test_daily_later_today() {
        let cadence = Cadence::Daily(NaiveTime::from_hms_opt(10, 0, 0).unwrap());
        assert_eq!(cadence.next_after(at(9, 0, 0)), at(10, 0, 0));
        assert_eq!(cadence.delay_after(at(9, 0, 0)), Duration::from_secs(3600));
    }

    #[test]
    fn test_daily_rolls_to_tomorrow() {
        let cadence = Cadence::Daily(NaiveTime::from_hms_opt(10, 0, 0).unwrap());
        let next = cadence.next_after(at(10, 0, 0));
        assert_eq!(next, at(10, 0, 0) + TimeDelta::days(1));

        let next = cadence.next_after(at(23, 0, 0));
        assert_eq!(next, at(10, 0, 0) + TimeDelta::days(1));
    }

    #[test]
    fn test_daily_fires_once_per_day() {
        let cadence = Cadence::Daily(NaiveTime::from_hms_opt(6, 15, 0).unwrap());
        let first = cadence.next_after(at(0, 0, 0));
        let second = cadence.next_after(first);
        assert_eq!(second - first, TimeDelta::days(1));
    }

    #[test]
    fn test_interval_next_after() {
        let cadence = Cadence::Interval(Duration::from_secs(90));
        assert_eq!(cadence.next_after(at(12, 0, 0)), at(12, 1, 30));
        assert_eq!(cadence.delay_after(at(12, 0, 0)), Duration::from_secs(90));
    }

    #[test]
    fn test_from_spec() {
        let daily = TaskSpec::daily("Report", "07:45");
        assert_eq!(
            Cadence::from_spec(&daily).unwrap(),
            Cadence::Daily(NaiveTime::from_hms_opt(7, 45, 0).unwrap())
        );

        let interval = TaskSpec::interval("Sweep", Duration::from_secs(5));
        assert_eq!(
            Cadence::from_spec(&interval).unwrap(),
            Cadence::Interval(Duration::from_secs(5))
        );
    }

    #[test]
    fn test_from_spec_rejects_bad_fields() {
        let err = Cadence::from_spec(&TaskSpec::daily("Report", "late")).unwrap_err();
        assert!(matches!(err, SchedulerError::InvalidCadence { ref task, .. } if task == "Report"));

        let err = Cadence::from_spec(&TaskSpec::interval("Sweep", Duration::ZERO)).unwrap_err();
        assert!(err.to_string().contains("greater than zero"));
    }

    #[test]
    fn test_kind_roundtrip_through_serde() {
        let kind: CadenceKind = serde_json::from_str("\"daily\"").unwrap();
        assert_eq!(kind, CadenceKind::Daily);
        assert!(serde_json::from_str::<CadenceKind>("\"weekly\"").is_err());
    }

    #[test]
    fn test_display() {
        let cadence = Cadence::Daily(NaiveTime::from_hms_opt(7, 5, 0).unwrap());
        assert_eq!(cadence.to_string(), "daily at 07:05 UTC");
        assert_eq!(CadenceKind::Interval.to_string(), "interval");
    }
}
