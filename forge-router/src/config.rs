//! The Router's backend configuration document: a human-edited TOML
//! file listing backends and the models each one serves.

use forge_core::DurationMs;
use serde::{Deserialize, Serialize};

/// Quality tier a model advertises, used to satisfy a request's
/// minimum-tier constraint. Distinct from [`forge_core::QualityTier`],
/// which scores stored artifacts rather than model backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum ModelTier {
    /// Cheapest, lowest-latency tier.
    Fast,
    /// Default tier for ordinary requests.
    General,
    /// Higher-quality tier for requests that failed at `General`.
    Escalation,
    /// Highest-quality tier, reserved for explicit "most powerful" cues.
    God,
}

/// One model a backend serves.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Model identifier as the backend expects it.
    pub model_id: String,
    /// Quality tier this model advertises.
    pub tier: ModelTier,
    /// Declared base timeout, used until a rolling window exists.
    #[serde(with = "duration_ms_secs")]
    pub base_timeout: DurationMs,
    /// Expected latency in milliseconds, used to rank same-tier models.
    pub expected_latency_ms: u64,
    /// A smaller/faster model to retry against on timeout.
    #[serde(default)]
    pub timeout_fallback: Option<String>,
}

/// One configured backend and the models it serves.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Backend name (e.g. `"anthropic"`).
    pub name: String,
    /// Environment variable holding this backend's API credential.
    pub credential_env_var: String,
    /// Models this backend serves.
    pub models: Vec<ModelConfig>,
}

/// The full backend configuration document.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RouterConfig {
    /// Configured backends.
    #[serde(default)]
    pub backends: Vec<BackendConfig>,
}

impl RouterConfig {
    /// Parse a configuration document from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }
}

mod duration_ms_secs {
    use forge_core::DurationMs;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &DurationMs, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(value.as_millis() / 1000)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DurationMs, D::Error> {
        let secs = u64::deserialize(d)?;
        Ok(DurationMs::from_secs(secs))
    }
}
