//! Environment-variable credential resolution for model backends.
//!
//! The Router resolves each backend's credential once at construction
//! time: if the named environment variable is absent, the backend is
//! marked disabled rather than retried on every request.

#![deny(missing_docs)]

use std::sync::Arc;
use thiserror::Error;
use zeroize::Zeroizing;

/// Failure to resolve a credential.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SecretError {
    /// The named environment variable was not set.
    #[error("environment variable {0} not set")]
    NotFound(String),
    /// The environment variable was set but not valid UTF-8.
    #[error("environment variable {0} is not valid UTF-8")]
    NotUtf8(String),
}

/// An opaque secret value. Cannot be logged, serialized, or cloned.
/// Memory is zeroed on drop.
pub struct SecretValue {
    inner: Zeroizing<String>,
}

impl SecretValue {
    fn new(value: String) -> Self {
        Self {
            inner: Zeroizing::new(value),
        }
    }

    /// Scoped exposure. The secret is only accessible inside the
    /// closure, discouraging callers from holding onto a borrowed
    /// `&str` past the point it's actually needed.
    pub fn with_str<R>(&self, f: impl FnOnce(&str) -> R) -> R {
        f(&self.inner)
    }

    /// Whether the underlying value is empty.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl std::fmt::Debug for SecretValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("[REDACTED]")
    }
}

/// Resolve a credential by reading `var_name` from the process
/// environment.
pub fn resolve_env(var_name: &str) -> Result<SecretValue, SecretError> {
    match std::env::var(var_name) {
        Ok(value) => Ok(SecretValue::new(value)),
        Err(std::env::VarError::NotPresent) => Err(SecretError::NotFound(var_name.to_string())),
        Err(std::env::VarError::NotUnicode(_)) => Err(SecretError::NotUtf8(var_name.to_string())),
    }
}

/// A credential resolved once and held for the lifetime of a backend.
/// `None` means resolution failed at construction time; the backend
/// that owns this should treat itself as disabled rather than retry.
#[derive(Clone)]
pub struct ResolvedCredential(Arc<Option<Arc<SecretValue>>>);

impl ResolvedCredential {
    /// Resolve `var_name` once, capturing success or failure.
    pub fn resolve(var_name: &str) -> Self {
        Self(Arc::new(resolve_env(var_name).ok().map(Arc::new)))
    }

    /// Whether resolution succeeded.
    pub fn is_available(&self) -> bool {
        self.0.is_some()
    }

    /// Expose the resolved value, if resolution succeeded.
    pub fn with_str<R>(&self, f: impl FnOnce(&str) -> R) -> Option<R> {
        self.0.as_ref().as_ref().map(|v| v.with_str(f))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secret_value_debug_is_redacted() {
        let secret = SecretValue::new("super-secret-key".to_string());
        assert_eq!(format!("{:?}", secret), "[REDACTED]");
    }

    #[test]
    fn resolves_set_env_var() {
        std::env::set_var("FORGE_TEST_SECRET", "test-value-42");
        let value = resolve_env("FORGE_TEST_SECRET").unwrap();
        value.with_str(|s| assert_eq!(s, "test-value-42"));
        std::env::remove_var("FORGE_TEST_SECRET");
    }

    #[test]
    fn rejects_missing_env_var() {
        std::env::remove_var("FORGE_TEST_MISSING");
        let err = resolve_env("FORGE_TEST_MISSING").unwrap_err();
        assert!(matches!(err, SecretError::NotFound(_)));
    }

    #[test]
    fn resolved_credential_reports_unavailable_on_missing_var() {
        std::env::remove_var("FORGE_TEST_MISSING_CRED");
        let cred = ResolvedCredential::resolve("FORGE_TEST_MISSING_CRED");
        assert!(!cred.is_available());
        assert!(cred.with_str(|s| s.to_string()).is_none());
    }

    #[test]
    fn resolved_credential_caches_value_at_construction() {
        std::env::set_var("FORGE_TEST_CRED", "abc123");
        let cred = ResolvedCredential::resolve("FORGE_TEST_CRED");
        std::env::remove_var("FORGE_TEST_CRED");
        assert!(cred.is_available());
        assert_eq!(cred.with_str(|s| s.to_string()), Some("abc123".to_string()));
    }
}
