#![deny(missing_docs)]
//! # forge-context — the Conversation & Context Manager
//!
//! Per-session dialog memory (spec §4.K): holds the ordered message
//! list for a session, fits a turn's context to the target model's
//! budget by folding older messages into a cheap-model summary once
//! the budget is exceeded, and answers cross-session similarity
//! lookups over stored transcripts.
//!
//! | Module | What it holds |
//! |--------|---------------|
//! | [`message`] | [`message::Message`], [`message::Role`], [`message::TurnPerformance`] |
//! | [`budget`] | [`budget::ModelBudget`], [`budget::TokenEstimator`] |
//! | [`manager`] | [`manager::ContextManager`], the stateful per-session API |

pub mod budget;
pub mod manager;
pub mod message;

pub use budget::{ModelBudget, TokenEstimator};
pub use manager::{ContextBundle, ContextManager, PriorSessionDigest};
pub use message::{Message, Role, TurnPerformance};
