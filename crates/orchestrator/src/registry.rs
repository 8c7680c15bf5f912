use std::collections::HashMap;
use std::sync::Arc;

use taskforge_core::PluginDescriptor;
use tracing::{debug, warn};

use crate::plugin::Plugin;

/// Static strategy table, populated once at startup and handed to the
/// orchestrator by reference. Lookup is by plugin id; listing preserves
/// registration order.
#[derive(Default)]
pub struct PluginRegistry {
    plugins: HashMap<String, Arc<dyn Plugin>>,
    order: Vec<String>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a plugin under its own id. A duplicate id overwrites the
    /// earlier registration (last wins) and logs a warning.
    pub fn register(&mut self, plugin: Arc<dyn Plugin>) {
        let id = plugin.id().to_string();
        if self.plugins.insert(id.clone(), plugin).is_some() {
            warn!(plugin_id = %id, "duplicate plugin id, last registration wins");
        } else {
            debug!(plugin_id = %id, "registered plugin");
            self.order.push(id);
        }
    }

    pub fn resolve(&self, id: &str) -> Option<Arc<dyn Plugin>> {
        self.plugins.get(id).cloned()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.plugins.contains_key(id)
    }

    /// Descriptors of all registered plugins, in registration order.
    pub fn list(&self) -> Vec<PluginDescriptor> {
        self.order
            .iter()
            .filter_map(|id| self.plugins.get(id))
            .map(|p| p.descriptor())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }
}
