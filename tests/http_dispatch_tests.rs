// HTTP dispatcher tests against a mock backend

use std::time::Duration;
use wiremock::matchers::{body_string, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use cadenced::dispatch::{Dispatcher, HttpDispatcher};
use cadenced::errors::DispatchError;
use cadenced::models::{HttpMethod, JobSpec, TriggerPolicy};

fn job(endpoint: &str, http_method: HttpMethod) -> JobSpec {
    JobSpec {
        endpoint: endpoint.to_string(),
        method: http_method,
        trigger: TriggerPolicy::DailyTimes {
            times: vec!["09:00".parse().unwrap()],
        },
    }
}

#[tokio::test]
async fn dispatch_sends_method_and_path_with_empty_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/jobs/review"))
        .and(body_string(""))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let dispatcher = HttpDispatcher::new(&server.uri(), Duration::from_secs(5)).unwrap();
    let event = dispatcher
        .dispatch(&job("/jobs/review", HttpMethod::Post))
        .await
        .unwrap();

    assert_eq!(event.status.as_u16(), 200);
    assert!(event.is_success());
    assert_eq!(event.endpoint, "/jobs/review");
    server.verify().await;
}

#[tokio::test]
async fn dispatch_uses_put_when_configured() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/apps/submit"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let dispatcher = HttpDispatcher::new(&server.uri(), Duration::from_secs(5)).unwrap();
    let event = dispatcher
        .dispatch(&job("/apps/submit", HttpMethod::Put))
        .await
        .unwrap();

    assert!(event.is_success());
    server.verify().await;
}

#[tokio::test]
async fn non_success_response_is_an_outcome_not_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/jobs/find"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let dispatcher = HttpDispatcher::new(&server.uri(), Duration::from_secs(5)).unwrap();
    let event = dispatcher
        .dispatch(&job("/jobs/find", HttpMethod::Post))
        .await
        .unwrap();

    assert_eq!(event.status.as_u16(), 503);
    assert!(!event.is_success());
}

#[tokio::test]
async fn refused_connection_is_a_network_error() {
    // Nothing listens on this port
    let dispatcher = HttpDispatcher::new("http://127.0.0.1:1", Duration::from_secs(2)).unwrap();
    let result = dispatcher.dispatch(&job("/jobs/find", HttpMethod::Post)).await;

    assert!(matches!(result, Err(DispatchError::Network(_))));
}
