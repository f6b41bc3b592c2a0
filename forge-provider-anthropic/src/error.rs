//! Maps HTTP/reqwest errors from the Anthropic API to [`ProviderError`].

use forge_router::ProviderError;

/// Map an HTTP status code (from the Anthropic API) to a [`ProviderError`].
///
/// Reference: <https://docs.anthropic.com/en/api/errors>
pub(crate) fn map_http_status(status: reqwest::StatusCode, body: &str) -> ProviderError {
    match status.as_u16() {
        401 | 403 => ProviderError::AuthFailed(body.to_string()),
        429 => ProviderError::RateLimited,
        // 529 is Anthropic's overloaded status; treat it like the rest of the 5xx range.
        500..=529 => ProviderError::RequestFailed(format!("HTTP {status}: {body}")),
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
        let err = map_http_status(reqwest::StatusCode::UNAUTHORIZED, "bad key");
        assert!(matches!(err, ProviderError::AuthFailed(_)));
    }

    #[test]
    fn too_many_requests_maps_to_rate_limited() {
        let err = map_http_status(reqwest::StatusCode::TOO_MANY_REQUESTS, "");
        assert!(matches!(err, ProviderError::RateLimited));
    }

    #[test]
    fn overloaded_maps_to_request_failed() {
        let err = map_http_status(reqwest::StatusCode::from_u16(529).unwrap(), "overloaded");
        assert!(matches!(err, ProviderError::RequestFailed(_)));
    }

    #[test]
    fn not_found_maps_to_invalid_response() {
        let err = map_http_status(reqwest::StatusCode::NOT_FOUND, "no such model");
        assert!(matches!(err, ProviderError::InvalidResponse(_)));
    }
}
