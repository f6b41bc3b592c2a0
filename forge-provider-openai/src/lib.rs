//! OpenAI Chat Completions backend for the codeforge Model Router.
//!
//! Implements [`forge_router::Provider`] against OpenAI's Chat Completions API.

#![deny(missing_docs)]

mod client;
mod error;

pub use client::OpenAi;
