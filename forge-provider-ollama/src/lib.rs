//! Ollama local model backend for the codeforge Model Router.
//!
//! Implements [`forge_router::Provider`] against a locally running Ollama
//! instance's `/api/chat` endpoint.

#![deny(missing_docs)]

mod client;
mod error;

pub use client::Ollama;
