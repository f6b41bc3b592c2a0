//! A single turn in a session's dialog.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who produced a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// The human or calling system.
    User,
    /// The model/system's reply.
    Assistant,
    /// A compaction summary standing in for older turns. Carries its
    /// own role rather than masquerading as `Assistant` so a later
    /// compaction pass can recognize and re-summarize it.
    Summary,
}

/// How long a turn took and what it cost, when that was measured.
/// Optional because not every message is the product of a tracked
/// provider call (a stored summary has none).
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct TurnPerformance {
    /// Wall-clock time the turn took to produce.
    pub latency_ms: u64,
    /// Input tokens consumed producing this turn.
    pub input_tokens: u64,
    /// Output tokens produced.
    pub output_tokens: u64,
}

/// One entry in a session's ordered message list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Who said it.
    pub role: Role,
    /// The message text.
    pub text: String,
    /// When it was recorded.
    pub timestamp: DateTime<Utc>,
    /// Performance record for the turn that produced this message, if
    /// tracked.
    pub performance: Option<TurnPerformance>,
}

impl Message {
    /// A user turn with no performance record.
    pub fn user(text: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self { role: Role::User, text: text.into(), timestamp: now, performance: None }
    }

    /// An assistant turn, optionally carrying the performance record
    /// for the call that produced it.
    pub fn assistant(text: impl Into<String>, now: DateTime<Utc>, performance: Option<TurnPerformance>) -> Self {
        Self { role: Role::Assistant, text: text.into(), timestamp: now, performance }
    }

    /// A compaction summary standing in for a run of older messages.
    pub fn summary(text: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self { role: Role::Summary, text: text.into(), timestamp: now, performance: None }
    }
}
