//! The probe executor: one HTTP GET per tick, classified into a
//! `CheckResult`. Every code path returns a result; transient network
//! failures are the signal being measured, not errors.

use std::time::{Duration, Instant};

use crate::db::enums::CheckStatus;

pub const PROBE_TIMEOUT: Duration = Duration::from_secs(10);
pub const MAX_REDIRECTS: usize = 5;
const USER_AGENT: &str = concat!("apiwatch/", env!("CARGO_PKG_VERSION"));

/// Normalized outcome of a single probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckResult {
    pub status: CheckStatus,
    pub response_time_ms: i32,
    /// HTTP status code, or 0 for connection-level failures.
    pub status_code: i32,
    pub error_detail: Option<String>,
}

pub struct Prober {
    client: reqwest::Client,
}

impl Prober {
    pub fn new() -> Self {
        Self::with_timeout(PROBE_TIMEOUT)
    }

    /// Timeout is configurable for tests only; production callers use
    /// [`Prober::new`].
    pub fn with_timeout(timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .user_agent(USER_AGENT)
            .build()
            .unwrap(); // Should not fail with default settings
        Self { client }
    }

    /// Performs one GET against `url` and classifies the outcome:
    /// status < 400 is UP, any 4xx/5xx is DOWN with the code retained,
    /// a timeout is TIMEOUT with code 0, and every other transport failure
    /// is DOWN with code 0 and an error detail.
    pub async fn probe(&self, url: &str) -> CheckResult {
        let start = Instant::now();
        let outcome = self.client.get(url).send().await;
        let response_time_ms = start.elapsed().as_millis() as i32;

        match outcome {
            Ok(response) => {
                let code = response.status().as_u16() as i32;
                if code < 400 {
                    CheckResult {
                        status: CheckStatus::Up,
                        response_time_ms,
                        status_code: code,
                        error_detail: None,
                    }
                } else {
                    CheckResult {
                        status: CheckStatus::Down,
                        response_time_ms,
                        status_code: code,
                        error_detail: Some(format!("HTTP {code}")),
                    }
                }
            }
            Err(e) if e.is_timeout() => CheckResult {
                status: CheckStatus::Timeout,
                response_time_ms,
                status_code: 0,
                error_detail: Some("Request timed out".to_string()),
            },
            Err(e) => CheckResult {
                status: CheckStatus::Down,
                response_time_ms,
                status_code: 0,
                error_detail: Some(connection_error_detail(&e)),
            },
        }
    }
}

impl Default for Prober {
    fn default() -> Self {
        Self::new()
    }
}

fn connection_error_detail(e: &reqwest::Error) -> String {
    if e.is_redirect() {
        "Too many redirects".to_string()
    } else if e.is_connect() {
        format!("Connection failed: {e}")
    } else {
        format!("Error: {e}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn classifies_2xx_as_up() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ok"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let result = Prober::new().probe(&format!("{}/ok", server.uri())).await;

        assert_eq!(result.status, CheckStatus::Up);
        assert_eq!(result.status_code, 200);
        assert!(result.error_detail.is_none());
        assert!(result.response_time_ms >= 0);
    }

    #[tokio::test]
    async fn classifies_4xx_as_down_with_code() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/missing"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let result = Prober::new()
            .probe(&format!("{}/missing", server.uri()))
            .await;

        assert_eq!(result.status, CheckStatus::Down);
        assert_eq!(result.status_code, 404);
        assert_eq!(result.error_detail.as_deref(), Some("HTTP 404"));
    }

    #[tokio::test]
    async fn classifies_5xx_as_down_not_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let result = Prober::new().probe(&server.uri()).await;

        assert_eq!(result.status, CheckStatus::Down);
        assert_eq!(result.status_code, 503);
    }

    #[tokio::test]
    async fn slow_response_is_timeout_with_code_zero() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
            .mount(&server)
            .await;

        let prober = Prober::with_timeout(Duration::from_millis(100));
        let result = prober.probe(&server.uri()).await;

        assert_eq!(result.status, CheckStatus::Timeout);
        assert_eq!(result.status_code, 0);
        assert!(result.response_time_ms >= 0);
    }

    #[tokio::test]
    async fn unreachable_host_is_down_with_detail() {
        // Nothing listens on this port.
        let result = Prober::with_timeout(Duration::from_secs(2))
            .probe("http://127.0.0.1:1")
            .await;

        assert_eq!(result.status, CheckStatus::Down);
        assert_eq!(result.status_code, 0);
        assert!(result.error_detail.is_some());
    }
}
