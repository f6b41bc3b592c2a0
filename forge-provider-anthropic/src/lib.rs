//! Anthropic Messages API backend for the codeforge Model Router.
//!
//! Implements [`forge_router::Provider`] against Anthropic's Messages API.

#![deny(missing_docs)]

mod client;
mod error;

pub use client::Anthropic;
