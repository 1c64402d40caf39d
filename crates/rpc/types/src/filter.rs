//! Filter identifiers.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque identifier of a polling filter.
///
/// Serialized as a bare JSON string so clients can hand back exactly what
/// `eth_newBlockFilter` returned.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FilterId(String);

impl FilterId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FilterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for FilterId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for FilterId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}
