use std::collections::HashMap;
use std::fmt;

use serde::Deserialize;
use serde::Serialize;

/// Namespaced identifier of a privileged action, e.g.
/// `org.freedesktop.udisks2.filesystem-mount`.
///
/// Compared by exact string equality. Uniqueness is owned by the
/// authorization service, not by this type.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ActionId(String);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("action id must not be empty")]
pub struct InvalidActionId;

impl ActionId {
    pub fn new(raw: impl Into<String>) -> Result<Self, InvalidActionId> {
        let raw = raw.into();
        if raw.is_empty() {
            return Err(InvalidActionId);
        }
        Ok(Self(raw))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for ActionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for ActionId {
    type Error = InvalidActionId;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<&str> for ActionId {
    type Error = InvalidActionId;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl std::str::FromStr for ActionId {
    type Err = InvalidActionId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl From<ActionId> for String {
    fn from(value: ActionId) -> Self {
        value.0
    }
}

/// Descriptive metadata the authorization service holds for one action.
///
/// This is a snapshot of a single round trip; nothing here is cached.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionMetadata {
    #[serde(default)]
    pub description: String,
    /// Text shown to the user when authentication is requested.
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub vendor: String,
    #[serde(default)]
    pub vendor_url: String,
    #[serde(default)]
    pub icon_name: String,
    #[serde(default)]
    pub annotations: HashMap<String, String>,
}

impl ActionMetadata {
    pub fn annotation(&self, key: &str) -> Option<&str> {
        self.annotations.get(key).map(String::as_str)
    }
}
