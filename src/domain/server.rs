//! Game server identity.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque game-server identifier.
///
/// The server list is loaded once at startup; its order is preserved for
/// deterministic round-robin indexing in rotating mode.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Server(String);

impl Server {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Server {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Server {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}
