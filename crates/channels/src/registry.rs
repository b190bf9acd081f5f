use std::collections::HashMap;

use tracing::{info, warn};

use crate::{
    error::{Error, Result},
    plugin::ChannelPlugin,
};

/// Registry of all loaded channel plugins.
pub struct ChannelRegistry {
    plugins: HashMap<String, Box<dyn ChannelPlugin>>,
}

impl Default for ChannelRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ChannelRegistry {
    pub fn new() -> Self {
        Self {
            plugins: HashMap::new(),
        }
    }

    /// Register a plugin. Ids must be unique.
    pub fn register(&mut self, plugin: Box<dyn ChannelPlugin>) -> Result<()> {
        let id = plugin.id().to_string();
        if self.plugins.contains_key(&id) {
            return Err(Error::DuplicatePlugin { id });
        }
        info!(channel = %id, land = %plugin.platform().land.name, "channel plugin registered");
        self.plugins.insert(id, plugin);
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&dyn ChannelPlugin> {
        self.plugins.get(id).map(|p| p.as_ref())
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Box<dyn ChannelPlugin>> {
        self.plugins.get_mut(id)
    }

    pub fn list(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.plugins.keys().map(|s| s.as_str()).collect();
        ids.sort_unstable();
        ids
    }

    /// Stop the given account on every plugin, logging failures.
    pub async fn stop_all(&mut self, account_id: &str) {
        for (id, plugin) in &mut self.plugins {
            if let Err(e) = plugin.stop_account(account_id).await {
                warn!(channel = %id, account_id, error = %e, "failed to stop channel account");
            }
        }
    }
}
