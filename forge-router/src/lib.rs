//! # forge-router — the Model Router
//!
//! Selects which language-model backend and model serves each request,
//! enforces adaptive timeouts learned from a rolling per-model
//! performance window, and retries once against a declared fallback
//! model on timeout.
//!
//! | Module | What it holds |
//! |--------|---------------|
//! | [`config`] | the backend configuration document (TOML-loaded) |
//! | [`provider`] | [`provider::Provider`], the object-safe LLM backend trait |
//! | [`keywords`] | natural-language routing cue parsing |
//! | [`window`] | per-model rolling performance windows, persisted via `forge-store` |
//! | [`router`] | [`router::Router`], the selection + dispatch entry point |

#![deny(missing_docs)]

pub mod config;
pub mod keywords;
pub mod provider;
pub mod router;
pub mod types;
pub mod window;

pub use config::{BackendConfig, ModelConfig, ModelTier, RouterConfig};
pub use provider::{Provider, ProviderError};
pub use router::{Router, RouteDecision, RouterError, RoutingConstraints};
pub use types::{ProviderRequest, ProviderResponse, StopReason, TokenUsage};
