//! The single console account and target → context resolution.

use std::{collections::HashMap, sync::Arc};

use {
    portico_channels::{Context, HostEvent},
    portico_common::Selector,
    tokio::sync::watch,
};

use crate::{
    CONSOLE_ACCOUNT_ID, CONSOLE_LAND,
    error::{Error, Result},
    protocol::ConsoleProtocol,
};

/// Path of the one scene the console serves: `land(..).console(<user>)`.
pub const CONSOLE_SCENE_PATH: &str = "land.console";

/// Builds the context for a land-completed target.
pub type ContextSource = fn(&ConsoleAccount, &Selector, Option<&Selector>) -> Context;

/// Selector path → context source, filled once when the protocol is built.
#[derive(Default)]
pub struct ContextSourceRegistry {
    sources: HashMap<String, ContextSource>,
}

impl ContextSourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, path: impl Into<String>, source: ContextSource) -> Result<()> {
        let path = path.into();
        if self.sources.contains_key(&path) {
            return Err(Error::DuplicateRegistration {
                kind: "context source",
                key: path,
            });
        }
        self.sources.insert(path, source);
        Ok(())
    }

    pub fn get(&self, path: &str) -> Option<ContextSource> {
        self.sources.get(path).copied()
    }
}

/// Context for the console conversation itself.
pub fn console_scene_context(
    account: &ConsoleAccount,
    target: &Selector,
    via: Option<&Selector>,
) -> Context {
    Context {
        account: account.route().clone(),
        client: target.clone(),
        endpoint: account.route().clone(),
        scene: target.clone(),
        self_: account.route().clone(),
        via: via.into_iter().cloned().collect(),
    }
}

/// `land(console).account(user)`; read-only view of the gateway's
/// availability.
pub struct ConsoleAccount {
    route: Selector,
    protocol: Arc<ConsoleProtocol>,
    available: watch::Receiver<bool>,
}

impl ConsoleAccount {
    pub fn new(protocol: Arc<ConsoleProtocol>, available: watch::Receiver<bool>) -> Self {
        let route = Selector::new()
            .land(protocol.land().name.as_str())
            .account(CONSOLE_ACCOUNT_ID);
        Self {
            route,
            protocol,
            available,
        }
    }

    pub fn route(&self) -> &Selector {
        &self.route
    }

    pub fn land(&self) -> &str {
        self.route.get("land").unwrap_or(CONSOLE_LAND)
    }

    /// True while the console task is running.
    pub fn available(&self) -> bool {
        *self.available.borrow()
    }

    /// Resolve `target` (land optional) to a conversation context.
    pub fn get_context(&self, target: &Selector, via: Option<&Selector>) -> Result<Context> {
        let target = target.clone().complete_land(self.land());
        if target.get("land") != Some(self.land()) {
            return Err(Error::unsupported_target(&target));
        }
        let source = self
            .protocol
            .context_source(&target.path())
            .ok_or_else(|| Error::unsupported_target(&target))?;
        Ok(source(self, &target, via))
    }

    /// Context addressing the account itself.
    pub fn self_context(&self) -> Context {
        Context {
            account: self.route.clone(),
            client: self.route.clone(),
            endpoint: self.route.clone(),
            scene: self.route.clone(),
            self_: self.route.clone(),
            via: Vec::new(),
        }
    }
}

impl std::fmt::Debug for ConsoleAccount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsoleAccount")
            .field("route", &self.route.to_string())
            .field("available", &self.available())
            .finish()
    }
}

/// Last known availability of an account.
#[derive(Debug, Default)]
pub struct AccountStatus {
    available: bool,
}

/// Outcome of [`AccountStatus::transition`]: the new value and the events
/// the caller should deliver.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusChange {
    pub available: bool,
    pub notifications: Vec<HostEvent>,
}

impl AccountStatus {
    pub fn available(&self) -> bool {
        self.available
    }

    /// Record `available` and report a notification only when it changed.
    pub fn transition(&mut self, account: &Selector, available: bool) -> StatusChange {
        let changed = self.available != available;
        self.available = available;

        let notifications = match (changed, available) {
            (false, _) => Vec::new(),
            (true, true) => vec![HostEvent::AccountAvailable {
                account: account.clone(),
            }],
            (true, false) => vec![HostEvent::AccountUnavailable {
                account: account.clone(),
            }],
        };
        StatusChange {
            available,
            notifications,
        }
    }
}
