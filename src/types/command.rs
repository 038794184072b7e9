use serde::{Deserialize, Serialize};

/// Body returned for a command handled over the signed protocol.
///
/// Mirrors the Fleet REST command reply so callers see the same shape
/// whether or not the request fell back to REST.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandResponse {
    pub response: CommandResult,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandResult {
    pub result: bool,
    pub reason: String,
}

impl CommandResponse {
    pub fn success() -> Self {
        Self {
            response: CommandResult {
                result: true,
                reason: String::new(),
            },
        }
    }

    /// Vehicle refused the command for an expected reason (e.g. already locked).
    pub fn nominal(reason: impl Into<String>) -> Self {
        Self {
            response: CommandResult {
                result: false,
                reason: reason.into(),
            },
        }
    }
}
