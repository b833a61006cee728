use serde::{Deserialize, Serialize};

/// Role of the local agent in connectivity checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IceRole {
    /// Makes the final decision on which pair is used.
    #[default]
    Controlling,
    /// Accepts the pair chosen by the controlling side.
    Controlled,
}
