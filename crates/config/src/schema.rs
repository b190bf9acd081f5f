/// Config schema types.
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{Context, Result};

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PorticoConfig {
    pub logging: LoggingConfig,
    pub channels: ChannelsConfig,
}

impl PorticoConfig {
    /// Raw config of a console account, handed to the plugin on start.
    ///
    /// A missing `default`/`user` entry resolves to an empty object so the
    /// console runs with its built-in defaults.
    pub fn console_account(&self, account_id: &str) -> Result<serde_json::Value> {
        if self.channels.console.is_empty() {
            return Ok(serde_json::Value::Object(Default::default()));
        }
        self.channels
            .console
            .get(account_id)
            .cloned()
            .with_context(|| format!("no console account `{account_id}` in [channels.console]"))
    }
}

/// Logging output settings. CLI flags override these.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset.
    pub level: String,
    /// Emit JSON lines instead of human-readable output.
    pub json: bool,
    /// Mirror log lines into the console scrollback while it is attached.
    pub capture: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            json: false,
            capture: true,
        }
    }
}

/// Channel accounts, keyed by channel type then account ID.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChannelsConfig {
    /// Console accounts, keyed by account ID.
    #[serde(default)]
    pub console: HashMap<String, serde_json::Value>,
}
