//! Operator credentials and remote operation results

use std::fmt;

use serde::{Deserialize, Serialize};

/// Acting-user (NOC) credentials forwarded with ticket operations
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub user_id: String,
    pub display_name: String,
    pub username: String,
    pub password: String,
}

impl Credentials {
    /// Both halves of the credential pair are present
    pub fn is_complete(&self) -> bool {
        !self.username.trim().is_empty() && !self.password.is_empty()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("user_id", &self.user_id)
            .field("display_name", &self.display_name)
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// Outcome of a mutating backend call
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationResult {
    pub message: String,
    /// Device-side log lines (configuration runs only)
    #[serde(default)]
    pub logs: Vec<String>,
}

impl OperationResult {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            logs: Vec::new(),
        }
    }
}
