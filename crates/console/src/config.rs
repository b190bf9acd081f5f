use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{codec::UnknownElementPolicy, frontend::ConsoleUser};

/// Configuration for the console account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleAccountConfig {
    /// Window/banner title shown by the front-end.
    pub title: String,

    pub subtitle: String,

    /// Operator attached to the console.
    pub operator: ConsoleUser,

    /// Fail on raw event types without a parser instead of dropping them.
    pub strict_events: bool,

    /// Handling of outbound elements the console cannot represent.
    pub unknown_elements: UnknownElementPolicy,

    /// How long sent/received messages stay in the reply-correlation cache.
    pub message_cache_ttl_secs: u64,

    /// Upper bound on waiting for the console task during cleanup.
    pub shutdown_timeout_secs: u64,
}

impl ConsoleAccountConfig {
    pub fn message_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.message_cache_ttl_secs)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }
}

impl Default for ConsoleAccountConfig {
    fn default() -> Self {
        Self {
            title: "Portico".into(),
            subtitle: "Welcome to console".into(),
            operator: ConsoleUser::new("operator", "User"),
            strict_events: true,
            unknown_elements: UnknownElementPolicy::default(),
            message_cache_ttl_secs: 300,
            shutdown_timeout_secs: 5,
        }
    }
}
