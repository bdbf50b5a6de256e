// Error handling framework

use thiserror::Error;

/// Schedule-related errors
///
/// These are scoped to a single job's loop: an invalid schedule never
/// takes down sibling loops or the process (startup validation aside).
#[derive(Error, Debug)]
pub enum ScheduleError {
    #[error("Invalid time of day '{value}': {reason}")]
    InvalidTimeOfDay { value: String, reason: String },

    #[error("No times of day configured")]
    EmptySchedule,

    #[error("Invalid timezone: {0}")]
    InvalidTimezone(String),

    #[error("No next occurrence for '{0}'")]
    NoOccurrence(String),
}

/// Dispatch errors
///
/// Only transport-level failures live here. A response with a non-2xx
/// status is still a response; it is reported as a `FireEvent`, not an
/// error.
#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("Invalid request URL '{0}'")]
    InvalidUrl(String),

    #[error("Failed to build request: {0}")]
    RequestConstruction(String),

    #[error("Network error: {0}")]
    Network(String),
}

/// Progress stream errors
#[derive(Error, Debug)]
pub enum ProgressError {
    #[error("Failed to connect to progress stream: {0}")]
    Connection(String),

    #[error("Progress stream read failed: {0}")]
    Protocol(String),

    #[error("Malformed progress message: {0}")]
    Malformed(String),

    #[error("Remote job failed: {0}")]
    Remote(String),

    #[error("Progress stream closed before completion")]
    Disconnected,

    #[error("Timed out after {0} seconds waiting for completion")]
    TimedOut(u64),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schedule_error_display_names_offending_value() {
        let err = ScheduleError::InvalidTimeOfDay {
            value: "25:00".to_string(),
            reason: "hour out of range".to_string(),
        };
        assert!(err.to_string().contains("25:00"));
    }

    #[test]
    fn test_dispatch_error_display() {
        let err = DispatchError::Network("connection refused".to_string());
        assert!(err.to_string().contains("connection refused"));
    }
}
