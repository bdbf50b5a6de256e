// Outbound HTTP dispatch
//
// One shared reqwest client, constructed once at startup and passed to
// every loop. A dispatch sends the job's method against base_url +
// endpoint with no body; any response at all is an outcome (FireEvent),
// and only transport-level failures are errors.

use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, Url};
use std::time::Duration;

use crate::errors::DispatchError;
use crate::models::{FireEvent, JobSpec};

/// Dispatcher issues one HTTP call for a job and reports the outcome
#[async_trait]
pub trait Dispatcher: Send + Sync {
    async fn dispatch(&self, job: &JobSpec) -> Result<FireEvent, DispatchError>;
}

/// HttpDispatcher sends requests against a fixed base URL
pub struct HttpDispatcher {
    client: Client,
    base_url: Url,
}

impl HttpDispatcher {
    /// Build the shared client with an explicit per-request timeout.
    /// The timeout is deliberately a required value, never "client
    /// default": a hung backend must not wedge a loop past its next
    /// scheduled occurrence.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, DispatchError> {
        let base_url = Url::parse(base_url)
            .map_err(|_| DispatchError::InvalidUrl(base_url.to_string()))?;
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DispatchError::RequestConstruction(e.to_string()))?;
        Ok(Self { client, base_url })
    }

    fn endpoint_url(&self, endpoint: &str) -> Result<Url, DispatchError> {
        self.base_url
            .join(endpoint)
            .map_err(|_| DispatchError::InvalidUrl(endpoint.to_string()))
    }
}

#[async_trait]
impl Dispatcher for HttpDispatcher {
    async fn dispatch(&self, job: &JobSpec) -> Result<FireEvent, DispatchError> {
        let url = self.endpoint_url(&job.endpoint)?;
        let fired_at = Utc::now();

        let response = self
            .client
            .request(job.method.as_reqwest(), url)
            .send()
            .await
            .map_err(|e| {
                if e.is_builder() {
                    DispatchError::RequestConstruction(e.to_string())
                } else {
                    DispatchError::Network(e.to_string())
                }
            })?;

        Ok(FireEvent {
            endpoint: job.endpoint.clone(),
            method: job.method,
            fired_at,
            status: response.status(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_rejects_unparseable_base_url() {
        let result = HttpDispatcher::new("not a url", Duration::from_secs(30));
        assert!(matches!(result, Err(DispatchError::InvalidUrl(_))));
    }

    #[test]
    fn test_joins_endpoint_onto_base() {
        let dispatcher =
            HttpDispatcher::new("http://backend:8000", Duration::from_secs(30)).unwrap();
        let url = dispatcher.endpoint_url("/jobs/review").unwrap();
        assert_eq!(url.as_str(), "http://backend:8000/jobs/review");
    }
}
