//! Maps HTTP/reqwest errors from the OpenAI API to [`ProviderError`].

use forge_router::ProviderError;

/// Map an HTTP status code (from the OpenAI API) to a [`ProviderError`].
///
/// Reference: <https://platform.openai.com/docs/guides/error-codes>
pub(crate) fn map_http_status(status: reqwest::StatusCode, body: &str) -> ProviderError {
    match status.as_u16() {
        401 | 403 => ProviderError::AuthFailed(body.to_string()),
        429 => ProviderError::RateLimited,
        500 | 502 | 503 => ProviderError::RequestFailed(format!("HTTP {status}: {body}")),
        _ => ProviderError::InvalidResponse(format!("HTTP {status}: {body}")),
    }
}

/// Map a [`reqwest::Error`] to a [`ProviderError`].
pub(crate) fn map_reqwest_error(err: reqwest::Error) -> ProviderError {
    ProviderError::RequestFailed(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unauthorized_maps_to_auth_failed() {
        let err = map_http_status(reqwest::StatusCode::UNAUTHORIZED, "invalid api key");
        assert!(matches!(err, ProviderError::AuthFailed(_)));
    }

    #[test]
    fn rate_limit_maps_to_rate_limited() {
        let err = map_http_status(reqwest::StatusCode::TOO_MANY_REQUESTS, "");
        assert!(err.is_retryable());
        assert!(matches!(err, ProviderError::RateLimited));
    }

    #[test]
    fn server_error_is_retryable() {
        let err = map_http_status(reqwest::StatusCode::BAD_GATEWAY, "bad gateway");
        assert!(err.is_retryable());
    }

    #[test]
    fn unknown_status_maps_to_invalid_response() {
        let err = map_http_status(reqwest::StatusCode::IM_A_TEAPOT, "teapot");
        assert!(matches!(err, ProviderError::InvalidResponse(_)));
    }
}
