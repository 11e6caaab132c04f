//! Connection mode of a session.

use serde::{Deserialize, Serialize};

/// Which backing the session engine currently drives.
///
/// Exactly one mode is active at a time. `Connecting` is only visible while
/// a connect attempt is in flight.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Emulated,
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Disconnected => f.write_str("disconnected"),
            Self::Connecting => f.write_str("connecting"),
            Self::Connected => f.write_str("connected"),
            Self::Emulated => f.write_str("emulated"),
        }
    }
}
