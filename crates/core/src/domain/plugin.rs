use serde::{Deserialize, Serialize};

/// Immutable identity of a registered plugin strategy.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PluginDescriptor {
    /// Stable machine key, e.g. `code-modifier`.
    pub id: String,
    pub name: String,
    pub description: String,
}

impl PluginDescriptor {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: description.into(),
        }
    }
}
