//! Error mapping from `reqwest`/HTTP into [`wick_provider::ProviderError`].

use wick_provider::ProviderError;

/// Map a transport-level `reqwest` error to a provider error.
pub fn map_reqwest_error(err: reqwest::Error) -> ProviderError {
    if err.is_timeout() {
        ProviderError::RequestFailed(format!("timeout: {err}"))
    } else {
        ProviderError::RequestFailed(err.to_string())
    }
}

/// Map an HTTP error status and response body to a provider error.
pub fn map_http_status(status: reqwest::StatusCode, body: &str) -> ProviderError {
    match status.as_u16() {
        401 | 403 => ProviderError::AuthFailed(body.to_string()),
        429 => ProviderError::RateLimited,
        _ => ProviderError::RequestFailed(format!("HTTP {status}: {body}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_429_to_rate_limited() {
        let err = map_http_status(reqwest::StatusCode::TOO_MANY_REQUESTS, "slow down");
        assert!(matches!(err, ProviderError::RateLimited));
    }

    #[test]
    fn maps_401_to_auth_failed() {
        let err = map_http_status(reqwest::StatusCode::UNAUTHORIZED, "bad key");
        assert!(matches!(err, ProviderError::AuthFailed(_)));
    }

    #[test]
    fn maps_500_to_request_failed() {
        let err = map_http_status(reqwest::StatusCode::INTERNAL_SERVER_ERROR, "oops");
        assert!(matches!(err, ProviderError::RequestFailed(_)));
    }
}
