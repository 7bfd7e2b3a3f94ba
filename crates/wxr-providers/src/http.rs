//! Shared HTTP plumbing for remote backends

use std::time::Duration;

use reqwest::{Client, Response, StatusCode};

use wxr_core::{Error, Result};

pub fn build_client(timeout_secs: u64) -> Result<Client> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| Error::Configuration(format!("Failed to build HTTP client: {}", e)))
}

/// Transport failures, timeouts included, are upstream outages
pub fn transport_error(service: &str, err: reqwest::Error) -> Error {
    if err.is_timeout() {
        Error::UpstreamUnavailable(format!("{} request timed out", service))
    } else {
        Error::UpstreamUnavailable(format!("{} request failed: {}", service, err))
    }
}

/// Map a non-success status to the matching error kind
pub async fn check_status(service: &str, response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());

    Err(status_error(service, status, &body))
}

pub fn status_error(service: &str, status: StatusCode, body: &str) -> Error {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            Error::Authentication(format!("{} rejected the credentials ({}): {}", service, status, body))
        }
        StatusCode::NOT_FOUND => Error::NotFound(format!("{} returned 404: {}", service, body)),
        _ => Error::UpstreamUnavailable(format!(
            "{} request failed with status {}: {}",
            service, status, body
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert!(matches!(
            status_error("hf", StatusCode::UNAUTHORIZED, ""),
            Error::Authentication(_)
        ));
        assert!(matches!(status_error("hf", StatusCode::NOT_FOUND, ""), Error::NotFound(_)));
        assert!(status_error("hf", StatusCode::SERVICE_UNAVAILABLE, "").is_upstream_failure());
    }
}
