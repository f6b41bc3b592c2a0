//! # forge-embed — Embedding & Similarity Service
//!
//! | Module | What it holds |
//! |--------|---------------|
//! | [`service`] | the [`EmbeddingService`] trait every backend implements |
//! | [`hash_embedder`] | [`DeterministicHashEmbedder`], the offline default |
//! | [`remote`] | [`RemoteEmbedder`], an HTTP-backed semantic embedder |
//! | [`cache`] | [`CachedEmbedder`], a bounded recent-input cache wrapper |
//! | [`similarity`] | [`similarity::cosine`] |
//!
//! Callers that need similarity search must treat
//! [`error::EmbedError::Unavailable`] as a signal to degrade to
//! keyword/tag retrieval, never as a reason to fail the enclosing
//! request.

#![deny(missing_docs)]

pub mod cache;
pub mod error;
pub mod hash_embedder;
pub mod remote;
pub mod service;
pub mod similarity;

pub use cache::CachedEmbedder;
pub use error::EmbedError;
pub use hash_embedder::DeterministicHashEmbedder;
pub use remote::RemoteEmbedder;
pub use service::EmbeddingService;
pub use similarity::cosine;
