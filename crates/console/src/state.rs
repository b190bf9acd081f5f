use std::{
    collections::HashMap,
    sync::{Arc, RwLock},
};

use crate::{config::ConsoleAccountConfig, service::ConsoleService};

/// Shared account state map.
pub type AccountStateMap = Arc<RwLock<HashMap<String, AccountState>>>;

/// Per-account runtime state.
pub struct AccountState {
    pub account_id: String,
    pub config: ConsoleAccountConfig,
    pub service: Arc<ConsoleService>,
}
