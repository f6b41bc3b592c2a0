//! The Model Router: selects a `(backend, model, timeout)` triple for
//! a task kind and optional constraints, then drives the actual
//! completion call with fallback-on-timeout and performance recording.

use crate::config::{BackendConfig, ModelConfig, ModelTier, RouterConfig};
use crate::keywords::infer_tier;
use crate::provider::{Provider, ProviderError};
use crate::types::{ProviderRequest, ProviderResponse};
use crate::window::WindowTable;
use forge_secret::ResolvedCredential;
use forge_store::ArtifactStore;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;

const DEFAULT_SAFETY_FACTOR: f64 = 1.5;
const FITNESS_MIN_SAMPLES: usize = 10;

/// Failures from routing or dispatching a completion request.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum RouterError {
    /// No backend has a usable credential.
    #[error("no enabled backend available")]
    NoEnabledBackend,
    /// No enabled backend advertises a model at the requested tier.
    #[error("no model meets the requested quality tier")]
    NoModelMeetsTier,
    /// The selected backend has no registered `Provider` implementation.
    #[error("no provider registered for backend {0}")]
    UnregisteredBackend(String),
    /// The provider call itself failed.
    #[error(transparent)]
    Provider(#[from] ProviderError),
    /// The request (and its fallback, if any) both timed out.
    #[error("request timed out after {0:?}")]
    Timeout(std::time::Duration),
}

struct ResolvedBackend {
    config: BackendConfig,
    credential: ResolvedCredential,
}

impl ResolvedBackend {
    fn is_enabled(&self) -> bool {
        self.credential.is_available()
    }
}

/// The caller's constraints on backend/model selection.
#[derive(Debug, Clone, Default)]
pub struct RoutingConstraints {
    /// Minimum quality tier required, if any.
    pub min_tier: Option<ModelTier>,
}

/// A chosen backend, model and timeout.
#[derive(Debug, Clone)]
pub struct RouteDecision {
    /// Name of the selected backend.
    pub backend: String,
    /// Model identifier to invoke.
    pub model_id: String,
    /// Timeout to apply to the call.
    pub timeout: forge_core::DurationMs,
}

/// Chooses backends/models and drives completion calls against them.
pub struct Router {
    backends: Vec<ResolvedBackend>,
    providers: HashMap<String, Arc<dyn Provider>>,
    windows: WindowTable,
}

impl Router {
    /// Build a router from a parsed configuration, resolving every
    /// backend's credential once. A backend whose credential cannot be
    /// resolved is recorded disabled rather than retried per request.
    pub fn new(config: RouterConfig, providers: HashMap<String, Arc<dyn Provider>>) -> Self {
        let backends = config
            .backends
            .into_iter()
            .map(|backend_config| {
                let credential = ResolvedCredential::resolve(&backend_config.credential_env_var);
                if !credential.is_available() {
                    tracing::warn!(
                        backend = %backend_config.name,
                        "backend disabled: credential not resolved"
                    );
                }
                ResolvedBackend {
                    config: backend_config,
                    credential,
                }
            })
            .collect();
        Self {
            backends,
            providers,
            windows: WindowTable::new(),
        }
    }

    /// Attach an [`ArtifactStore`] so per-model performance windows
    /// are persisted as `Performance` artifacts.
    pub fn with_store(mut self, store: Arc<dyn ArtifactStore>) -> Self {
        self.windows = WindowTable::with_store(store);
        self
    }

    /// Select a `(backend, model, timeout)` triple for `task_kind`.
    /// `request_text` is scanned for routing cues when `constraints`
    /// doesn't already set `min_tier`.
    pub async fn route(
        &self,
        task_kind: &str,
        request_text: &str,
        constraints: RoutingConstraints,
    ) -> Result<RouteDecision, RouterError> {
        let min_tier = constraints
            .min_tier
            .or_else(|| infer_tier(request_text))
            .or(Some(ModelTier::General));

        let enabled: Vec<&ResolvedBackend> =
            self.backends.iter().filter(|b| b.is_enabled()).collect();
        if enabled.is_empty() {
            return Err(RouterError::NoEnabledBackend);
        }

        let candidates: Vec<(&ResolvedBackend, &ModelConfig)> = enabled
            .iter()
            .flat_map(|backend| backend.config.models.iter().map(move |m| (*backend, m)))
            .filter(|(_, model)| min_tier.is_none_or(|t| model.tier >= t))
            .collect();
        if candidates.is_empty() {
            return Err(RouterError::NoModelMeetsTier);
        }

        let chosen = self.select_by_fitness(task_kind, &candidates).await.or_else(|| {
            candidates
                .iter()
                .min_by_key(|(_, model)| model.expected_latency_ms)
                .copied()
        });
        let (backend, model) = chosen.ok_or(RouterError::NoModelMeetsTier)?;

        let window_key = format!("{task_kind}:{}", model.model_id);
        let timeout = self
            .windows
            .timeout_for(&window_key, model.base_timeout, DEFAULT_SAFETY_FACTOR)
            .await;

        Ok(RouteDecision {
            backend: backend.config.name.clone(),
            model_id: model.model_id.clone(),
            timeout,
        })
    }

    /// If at least [`FITNESS_MIN_SAMPLES`] samples exist for any
    /// candidate under this task kind, pick the one with the highest
    /// `(success_rate + mean_quality) / 2`. No separate quality signal
    /// reaches the Router, so `mean_quality` is approximated by
    /// `success_rate` as well — see the Open Questions note on this.
    async fn select_by_fitness<'a>(
        &self,
        task_kind: &str,
        candidates: &[(&'a ResolvedBackend, &'a ModelConfig)],
    ) -> Option<(&'a ResolvedBackend, &'a ModelConfig)> {
        let mut best: Option<((&ResolvedBackend, &ModelConfig), f64)> = None;
        for &(backend, model) in candidates {
            let key = format!("{task_kind}:{}", model.model_id);
            if !self.windows.has_min_samples(&key, FITNESS_MIN_SAMPLES).await {
                continue;
            }
            let success_rate = self.windows.success_rate(&key).await.unwrap_or(0.0);
            let fitness = (success_rate + success_rate) / 2.0;
            if best.as_ref().is_none_or(|(_, f)| fitness > *f) {
                best = Some(((backend, model), fitness));
            }
        }
        best.map(|(candidate, _)| candidate)
    }

    /// Route and issue a completion request, retrying once against the
    /// selected model's `timeout_fallback` (if any) on timeout.
    pub async fn generate(
        &self,
        task_kind: &str,
        constraints: RoutingConstraints,
        mut request: ProviderRequest,
    ) -> Result<ProviderResponse, RouterError> {
        let decision = self.route(task_kind, &request.prompt, constraints).await?;
        request.model = decision.model_id.clone();

        match self
            .call_with_timeout(&decision.backend, &decision.model_id, decision.timeout, request.clone())
            .await
        {
            Ok(response) => Ok(response),
            Err(RouterError::Timeout(_)) => {
                let fallback_model = self.fallback_for(&decision.model_id);
                match fallback_model {
                    Some((backend, model_id, timeout)) => {
                        request.model = model_id.clone();
                        self.call_with_timeout(&backend, &model_id, timeout, request).await
                    }
                    None => Err(RouterError::Timeout(decision.timeout.to_std())),
                }
            }
            Err(e) => Err(e),
        }
    }

    fn fallback_for(&self, model_id: &str) -> Option<(String, String, forge_core::DurationMs)> {
        for backend in &self.backends {
            for model in &backend.config.models {
                if model.model_id == model_id {
                    let fallback_id = model.timeout_fallback.as_ref()?;
                    for (b2, m2) in self
                        .backends
                        .iter()
                        .flat_map(|b| b.config.models.iter().map(move |m| (b, m)))
                    {
                        if &m2.model_id == fallback_id {
                            return Some((b2.config.name.clone(), m2.model_id.clone(), m2.base_timeout));
                        }
                    }
                }
            }
        }
        None
    }

    async fn call_with_timeout(
        &self,
        backend: &str,
        model_id: &str,
        timeout: forge_core::DurationMs,
        request: ProviderRequest,
    ) -> Result<ProviderResponse, RouterError> {
        let provider = self
            .providers
            .get(backend)
            .ok_or_else(|| RouterError::UnregisteredBackend(backend.to_string()))?;
        let started = Instant::now();
        let result = tokio::time::timeout(timeout.to_std(), provider.complete(request)).await;
        let elapsed = forge_core::DurationMs::from(started.elapsed());
        match result {
            Ok(Ok(response)) => {
                self.windows.record(model_id, elapsed, true).await;
                Ok(response)
            }
            Ok(Err(e)) => {
                self.windows.record(model_id, elapsed, false).await;
                Err(RouterError::Provider(e))
            }
            Err(_) => {
                self.windows.record(model_id, elapsed, false).await;
                Err(RouterError::Timeout(timeout.to_std()))
            }
        }
    }
}
