//! Terminal log entries. Append-only and for observability only.

use serde::{Deserialize, Serialize};

use crate::time::{Timestamp, now};

/// Which way a record travelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Written to the device (or applied by the emulator).
    Sent,
    /// A line read back from the device.
    Received,
    /// A message from the engine itself.
    Notice,
}

/// One terminal log line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandRecord {
    pub direction: Direction,
    pub text: String,
    pub timestamp: Timestamp,
}

impl CommandRecord {
    #[must_use]
    pub fn new(direction: Direction, text: impl Into<String>) -> Self {
        Self {
            direction,
            text: text.into(),
            timestamp: now(),
        }
    }

    #[must_use]
    pub fn sent(text: impl Into<String>) -> Self {
        Self::new(Direction::Sent, text)
    }

    #[must_use]
    pub fn received(text: impl Into<String>) -> Self {
        Self::new(Direction::Received, text)
    }

    #[must_use]
    pub fn notice(text: impl Into<String>) -> Self {
        Self::new(Direction::Notice, text)
    }
}

impl std::fmt::Display for CommandRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.direction {
            Direction::Sent => write!(f, "Sent: {}", self.text),
            Direction::Received => write!(f, "Received: {}", self.text),
            Direction::Notice => f.write_str(&self.text),
        }
    }
}
