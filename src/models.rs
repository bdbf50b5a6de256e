// Core domain types: job specifications, trigger policies, fire events

use chrono::{DateTime, Utc};
use reqwest::{Method, StatusCode};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::errors::ScheduleError;

/// A wall-clock time of day in 24-hour "HH:MM" form
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TimeOfDay {
    pub hour: u8,
    pub minute: u8,
}

impl TimeOfDay {
    pub fn new(hour: u8, minute: u8) -> Result<Self, ScheduleError> {
        if hour > 23 || minute > 59 {
            return Err(ScheduleError::InvalidTimeOfDay {
                value: format!("{:02}:{:02}", hour, minute),
                reason: "hour must be 0-23 and minute 0-59".to_string(),
            });
        }
        Ok(Self { hour, minute })
    }
}

impl FromStr for TimeOfDay {
    type Err = ScheduleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| ScheduleError::InvalidTimeOfDay {
            value: s.to_string(),
            reason: reason.to_string(),
        };

        let (hh, mm) = s
            .split_once(':')
            .ok_or_else(|| invalid("expected HH:MM"))?;
        if hh.len() != 2 || mm.len() != 2 {
            return Err(invalid("expected two digits for hour and minute"));
        }
        let hour: u8 = hh.parse().map_err(|_| invalid("hour is not a number"))?;
        let minute: u8 = mm.parse().map_err(|_| invalid("minute is not a number"))?;
        if hour > 23 {
            return Err(invalid("hour out of range"));
        }
        if minute > 59 {
            return Err(invalid("minute out of range"));
        }
        Ok(Self { hour, minute })
    }
}

impl TryFrom<String> for TimeOfDay {
    type Error = ScheduleError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<TimeOfDay> for String {
    fn from(t: TimeOfDay) -> String {
        t.to_string()
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

/// HttpMethod represents the HTTP verbs jobs may use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    pub fn as_reqwest(&self) -> Method {
        match self {
            HttpMethod::Get => Method::GET,
            HttpMethod::Post => Method::POST,
            HttpMethod::Put => Method::PUT,
            HttpMethod::Delete => Method::DELETE,
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_reqwest())
    }
}

/// TriggerPolicy determines when a job fires
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerPolicy {
    /// Fires once at each listed local time, every day, forever
    DailyTimes { times: Vec<TimeOfDay> },
    /// One independent sub-loop per initial delay; each fires once after
    /// its delay, then every `interval` thereafter
    IntervalWithOffsets {
        initial_delays: Vec<Duration>,
        interval: Duration,
    },
}

impl TriggerPolicy {
    /// Validate the policy against the schedule invariants
    pub fn validate(&self) -> Result<(), ScheduleError> {
        match self {
            TriggerPolicy::DailyTimes { times } => {
                if times.is_empty() {
                    return Err(ScheduleError::EmptySchedule);
                }
                Ok(())
            }
            TriggerPolicy::IntervalWithOffsets {
                initial_delays,
                interval,
            } => {
                if initial_delays.is_empty() {
                    return Err(ScheduleError::EmptySchedule);
                }
                if interval.is_zero() {
                    return Err(ScheduleError::InvalidTimeOfDay {
                        value: "0s".to_string(),
                        reason: "interval must be positive".to_string(),
                    });
                }
                Ok(())
            }
        }
    }
}

/// One configured job: endpoint, method and trigger policy
///
/// Immutable after construction; the registry of specs is read-only for
/// the lifetime of the process.
#[derive(Debug, Clone)]
pub struct JobSpec {
    pub endpoint: String,
    pub method: HttpMethod,
    pub trigger: TriggerPolicy,
}

/// The outcome of one completed dispatch attempt, used for logging and
/// the status retry policy; never persisted
#[derive(Debug, Clone)]
pub struct FireEvent {
    pub endpoint: String,
    pub method: HttpMethod,
    pub fired_at: DateTime<Utc>,
    pub status: StatusCode,
}

impl FireEvent {
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_time_of_day() {
        let t: TimeOfDay = "09:30".parse().unwrap();
        assert_eq!(t, TimeOfDay { hour: 9, minute: 30 });
    }

    #[test]
    fn test_parse_midnight() {
        let t: TimeOfDay = "00:00".parse().unwrap();
        assert_eq!(t, TimeOfDay { hour: 0, minute: 0 });
    }

    #[test]
    fn test_parse_rejects_out_of_range_hour() {
        let err = "24:00".parse::<TimeOfDay>().unwrap_err();
        assert!(err.to_string().contains("24:00"));
    }

    #[test]
    fn test_parse_rejects_out_of_range_minute() {
        assert!("12:60".parse::<TimeOfDay>().is_err());
    }

    #[test]
    fn test_parse_rejects_missing_colon() {
        assert!("1230".parse::<TimeOfDay>().is_err());
    }

    #[test]
    fn test_parse_rejects_single_digit_fields() {
        assert!("9:30".parse::<TimeOfDay>().is_err());
        assert!("09:3".parse::<TimeOfDay>().is_err());
    }

    #[test]
    fn test_display_round_trips() {
        let t: TimeOfDay = "04:05".parse().unwrap();
        assert_eq!(t.to_string(), "04:05");
    }

    #[test]
    fn test_daily_policy_rejects_empty_times() {
        let policy = TriggerPolicy::DailyTimes { times: vec![] };
        assert!(matches!(
            policy.validate(),
            Err(ScheduleError::EmptySchedule)
        ));
    }

    #[test]
    fn test_interval_policy_rejects_zero_interval() {
        let policy = TriggerPolicy::IntervalWithOffsets {
            initial_delays: vec![Duration::ZERO],
            interval: Duration::ZERO,
        };
        assert!(policy.validate().is_err());
    }

    #[test]
    fn test_interval_policy_accepts_zero_delay() {
        let policy = TriggerPolicy::IntervalWithOffsets {
            initial_delays: vec![Duration::ZERO, Duration::from_secs(1200)],
            interval: Duration::from_secs(3600),
        };
        assert!(policy.validate().is_ok());
    }

    #[test]
    fn test_http_method_conversion() {
        assert_eq!(HttpMethod::Post.as_reqwest(), Method::POST);
        assert_eq!(HttpMethod::Put.as_reqwest(), Method::PUT);
    }
}
