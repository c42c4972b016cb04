//! Request/response shapes and input normalization for endpoint routes.

use serde::{Deserialize, Serialize};

use crate::db::enums::ChannelType;
use crate::monitoring::scheduler::{MAX_INTERVAL_SEC, MIN_INTERVAL_SEC};

pub const DEFAULT_INTERVAL_SEC: i32 = 60;
pub const DEFAULT_ALERT_THRESHOLD: i32 = 4;
pub const MIN_ALERT_THRESHOLD: i32 = 1;
pub const MAX_ALERT_THRESHOLD: i32 = 20;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateEndpointRequest {
    pub url: String,
    pub name: Option<String>,
    pub check_interval_sec: Option<i32>,
    pub alert_on_consecutive_fails: Option<i32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEndpointRequest {
    pub name: Option<String>,
    pub check_interval_sec: Option<i32>,
    pub alert_on_consecutive_fails: Option<i32>,
    pub is_muted: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateChannelRequest {
    pub channel_type: ChannelType,
    pub target: String,
    #[serde(default)]
    pub is_default: bool,
}

#[derive(Debug, Deserialize)]
pub struct MetricsQuery {
    pub range: Option<String>,
    pub limit: Option<u64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ManualCheckResponse {
    pub status: crate::db::enums::CheckStatus,
    pub response_time_ms: i32,
    pub status_code: i32,
    pub error_detail: Option<String>,
    pub metric: crate::db::entities::endpoint_metric::Model,
}

/// Clamps an optional numeric parameter into `[min, max]`, falling back to
/// `default` when absent.
pub fn clamp_param(value: Option<i32>, default: i32, min: i32, max: i32) -> i32 {
    value.unwrap_or(default).clamp(min, max)
}

pub fn clamp_interval(value: Option<i32>) -> i32 {
    clamp_param(value, DEFAULT_INTERVAL_SEC, MIN_INTERVAL_SEC, MAX_INTERVAL_SEC)
}

pub fn clamp_threshold(value: Option<i32>) -> i32 {
    clamp_param(
        value,
        DEFAULT_ALERT_THRESHOLD,
        MIN_ALERT_THRESHOLD,
        MAX_ALERT_THRESHOLD,
    )
}

/// Only plain http/https URLs can be monitored.
pub fn is_valid_url(url: &str) -> bool {
    match reqwest::Url::parse(url) {
        Ok(parsed) => matches!(parsed.scheme(), "http" | "https") && parsed.host().is_some(),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interval_clamps_to_bounds_with_default() {
        assert_eq!(clamp_interval(None), 60);
        assert_eq!(clamp_interval(Some(10)), 30);
        assert_eq!(clamp_interval(Some(30)), 30);
        assert_eq!(clamp_interval(Some(90)), 90);
        assert_eq!(clamp_interval(Some(100_000)), 3600);
    }

    #[test]
    fn threshold_clamps_to_bounds_with_default() {
        assert_eq!(clamp_threshold(None), 4);
        assert_eq!(clamp_threshold(Some(0)), 1);
        assert_eq!(clamp_threshold(Some(7)), 7);
        assert_eq!(clamp_threshold(Some(50)), 20);
    }

    #[test]
    fn url_validation_requires_http_scheme_and_host() {
        assert!(is_valid_url("https://api.example.com/health"));
        assert!(is_valid_url("http://localhost:8080"));
        assert!(!is_valid_url("ftp://example.com"));
        assert!(!is_valid_url("not a url"));
        assert!(!is_valid_url("https://"));
    }
}
