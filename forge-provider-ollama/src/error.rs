//! Maps HTTP/reqwest errors from the Ollama local API to [`ProviderError`].

use forge_router::ProviderError;

/// Map an HTTP status code (from the Ollama API) to a [`ProviderError`].
///
/// Reference: <https://github.com/ollama/ollama/blob/main/docs/api.md>
pub(crate) fn map_http_status(status: reqwest::StatusCode, body: &str) -> ProviderError {
    match status.as_u16() {
        404 => ProviderError::InvalidResponse(format!("model not found: {body}")),
        500..=599 => ProviderError::RequestFailed(format!("HTTP {status}: {body}")),
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
    fn not_found_maps_to_invalid_response() {
        let err = map_http_status(reqwest::StatusCode::NOT_FOUND, "model \"x\" not found");
        assert!(matches!(err, ProviderError::InvalidResponse(_)));
    }

    #[test]
    fn server_error_is_retryable() {
        let err = map_http_status(reqwest::StatusCode::INTERNAL_SERVER_ERROR, "oom");
        assert!(err.is_retryable());
    }
}
