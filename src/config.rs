// Configuration management with layered configuration (file, env)

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::warn;

use crate::errors::ScheduleError;
use crate::models::{HttpMethod, JobSpec, TimeOfDay, TriggerPolicy};

/// Main settings structure containing all configuration options
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub server: ServerConfig,
    pub dispatch: DispatchConfig,
    pub observability: ObservabilityConfig,
    pub jobs: Vec<JobSettings>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Base URL of the backend all endpoints are joined onto
    pub base_url: String,
    /// IANA zone name, or "system-local" to honor the TZ environment
    pub zone: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Explicit per-request timeout
    pub timeout_seconds: u64,
    /// Fixed backoff after transport failures
    pub retry_backoff_seconds: u64,
    /// Whether non-2xx responses re-enter the retry path
    #[serde(default)]
    pub retry_non_success: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    pub log_level: String,
}

/// One configured job as it appears in the settings file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobSettings {
    pub endpoint: String,
    pub method: HttpMethod,
    pub trigger: TriggerSettings,
}

/// Trigger policy as configured. Times of day stay raw strings here so a
/// malformed entry surfaces as a per-job schedule error instead of
/// failing the whole deserialization.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TriggerSettings {
    Daily {
        times: Vec<String>,
    },
    Interval {
        initial_delay_seconds: Vec<u64>,
        interval_seconds: u64,
    },
}

impl JobSettings {
    /// Build the validated, immutable spec for this job
    pub fn to_spec(&self) -> Result<JobSpec, ScheduleError> {
        let trigger = match &self.trigger {
            TriggerSettings::Daily { times } => {
                let times = times
                    .iter()
                    .map(|s| s.parse::<TimeOfDay>())
                    .collect::<Result<Vec<_>, _>>()?;
                TriggerPolicy::DailyTimes { times }
            }
            TriggerSettings::Interval {
                initial_delay_seconds,
                interval_seconds,
            } => TriggerPolicy::IntervalWithOffsets {
                initial_delays: initial_delay_seconds
                    .iter()
                    .map(|s| Duration::from_secs(*s))
                    .collect(),
                interval: Duration::from_secs(*interval_seconds),
            },
        };
        trigger.validate()?;

        Ok(JobSpec {
            endpoint: self.endpoint.clone(),
            method: self.method,
            trigger,
        })
    }
}

/// Build the job registry, dropping (with a warning) entries whose
/// schedule does not validate. The caller decides whether an empty
/// result is fatal.
pub fn build_registry(jobs: &[JobSettings]) -> Vec<JobSpec> {
    let mut specs = Vec::with_capacity(jobs.len());
    for job in jobs {
        match job.to_spec() {
            Ok(spec) => specs.push(spec),
            Err(e) => {
                warn!(endpoint = %job.endpoint, error = %e, "Skipping job with invalid schedule");
            }
        }
    }
    specs
}

impl Settings {
    /// Load configuration with layered precedence: defaults → file → env
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_path("config")
    }

    /// Load configuration from a specific directory
    pub fn load_from_path<P: AsRef<Path>>(config_dir: P) -> Result<Self, ConfigError> {
        let config_dir = config_dir.as_ref();

        let defaults = Config::try_from(&Settings::default())?;

        let builder = Config::builder()
            .add_source(defaults)
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            // Local configuration, not committed to git
            .add_source(File::from(config_dir.join("local.toml")).required(false))
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            );

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// Validate configuration settings
    pub fn validate(&self) -> Result<(), String> {
        if self.server.base_url.is_empty() {
            return Err("Server base_url cannot be empty".to_string());
        }
        if self.dispatch.timeout_seconds == 0 {
            return Err("Dispatch timeout_seconds must be greater than 0".to_string());
        }
        if self.dispatch.retry_backoff_seconds == 0 {
            return Err("Dispatch retry_backoff_seconds must be greater than 0".to_string());
        }
        if self.jobs.is_empty() {
            return Err("At least one job must be configured".to_string());
        }
        Ok(())
    }
}

impl Default for Settings {
    fn default() -> Self {
        let daily = |endpoint: &str, times: &[&str]| JobSettings {
            endpoint: endpoint.to_string(),
            method: HttpMethod::Post,
            trigger: TriggerSettings::Daily {
                times: times.iter().map(|s| s.to_string()).collect(),
            },
        };

        Self {
            server: ServerConfig {
                base_url: "http://backend:8000".to_string(),
                zone: "system-local".to_string(),
            },
            dispatch: DispatchConfig {
                timeout_seconds: 30,
                retry_backoff_seconds: 60,
                retry_non_success: false,
            },
            observability: ObservabilityConfig {
                log_level: "info".to_string(),
            },
            jobs: vec![
                daily("/jobs/find", &["04:00"]),
                daily("/jobs/review", &["09:00", "21:00"]),
                daily("/apps/create", &["10:00"]),
                daily("/apps/prepare", &["11:00"]),
                daily(
                    "/apps/submit",
                    &["09:30", "12:30", "15:30", "18:30", "21:30"],
                ),
            ],
        }
    }
}
