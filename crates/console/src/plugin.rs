use std::{
    collections::HashMap,
    sync::{Arc, RwLock},
};

use {
    anyhow::Result,
    async_trait::async_trait,
    portico_channels::{
        ChannelEventSink, ChannelHealthSnapshot, ChannelOutbound, ChannelPlugin, ChannelProfile,
        ChannelStatus, Context, ContextResolver, MessageCache, Nick, Summary,
    },
    portico_common::{Platform, Selector},
    tracing::{info, warn},
};

use crate::{
    CONSOLE_ACCOUNT_ID,
    config::ConsoleAccountConfig,
    error::Error,
    frontend::Frontend,
    logs::LogSink,
    outbound::ConsoleOutbound,
    protocol::ConsoleProtocol,
    service::ConsoleService,
    state::{AccountState, AccountStateMap},
};

/// Console channel plugin.
pub struct ConsolePlugin {
    accounts: AccountStateMap,
    outbound: ConsoleOutbound,
    frontend: Arc<dyn Frontend>,
    protocol: Arc<ConsoleProtocol>,
    event_sink: Option<Arc<dyn ChannelEventSink>>,
    message_cache: Option<Arc<dyn MessageCache>>,
    logs: LogSink,
}

impl ConsolePlugin {
    pub fn new(frontend: Arc<dyn Frontend>) -> crate::Result<Self> {
        let accounts: AccountStateMap = Arc::new(RwLock::new(HashMap::new()));
        let outbound = ConsoleOutbound {
            accounts: Arc::clone(&accounts),
        };
        Ok(Self {
            accounts,
            outbound,
            frontend,
            protocol: Arc::new(ConsoleProtocol::new()?),
            event_sink: None,
            message_cache: None,
            logs: LogSink::default(),
        })
    }

    pub fn with_event_sink(mut self, sink: Arc<dyn ChannelEventSink>) -> Self {
        self.event_sink = Some(sink);
        self
    }

    pub fn with_message_cache(mut self, cache: Arc<dyn MessageCache>) -> Self {
        self.message_cache = Some(cache);
        self
    }

    /// Sink the front-end attaches to for log lines.
    pub fn with_log_sink(mut self, logs: LogSink) -> Self {
        self.logs = logs;
        self
    }

    /// Get a shared reference to the outbound sender (for use outside the plugin).
    pub fn shared_outbound(&self) -> Arc<dyn ChannelOutbound> {
        Arc::new(ConsoleOutbound {
            accounts: Arc::clone(&self.accounts),
        })
    }

    /// List all active account IDs.
    pub fn account_ids(&self) -> Vec<String> {
        let accounts = self.accounts.read().unwrap_or_else(|e| e.into_inner());
        accounts.keys().cloned().collect()
    }

    /// Get the config for a specific account (serialized to JSON).
    pub fn account_config(&self, account_id: &str) -> Option<serde_json::Value> {
        let accounts = self.accounts.read().unwrap_or_else(|e| e.into_inner());
        accounts
            .get(account_id)
            .and_then(|s| serde_json::to_value(&s.config).ok())
    }

    /// Running service for `account_id`.
    pub fn service(&self, account_id: &str) -> Option<Arc<ConsoleService>> {
        let accounts = self.accounts.read().unwrap_or_else(|e| e.into_inner());
        accounts.get(account_id).map(|s| Arc::clone(&s.service))
    }

    fn require_service(&self, account_id: &str) -> Result<Arc<ConsoleService>> {
        self.service(account_id)
            .ok_or_else(|| portico_channels::Error::unknown_account(account_id).into())
    }
}

#[async_trait]
impl ChannelPlugin for ConsolePlugin {
    fn id(&self) -> &str {
        "console"
    }

    fn name(&self) -> &str {
        "Console"
    }

    fn platform(&self) -> &Platform {
        self.protocol.platform()
    }

    async fn start_account(&mut self, account_id: &str, config: serde_json::Value) -> Result<()> {
        if account_id != CONSOLE_ACCOUNT_ID {
            return Err(portico_channels::Error::unknown_account(account_id).into());
        }
        if self.service(account_id).is_some() {
            return Err(Error::startup(format!("console account `{account_id}` already running")).into());
        }
        let config: ConsoleAccountConfig = serde_json::from_value(config)?;

        info!(account_id, operator = %config.operator.id, "starting console account");

        let mut service = ConsoleService::new(
            Arc::clone(&self.frontend),
            Arc::clone(&self.protocol),
            config.clone(),
        )
        .with_log_sink(self.logs.clone());
        if let Some(sink) = &self.event_sink {
            service = service.with_event_sink(Arc::clone(sink));
        }
        if let Some(cache) = &self.message_cache {
            service = service.with_message_cache(Arc::clone(cache));
        }
        let service = Arc::new(service);

        service.prepare()?;
        if let Err(e) = service.block().await {
            service.cleanup().await?;
            return Err(e.into());
        }

        let mut accounts = self.accounts.write().unwrap_or_else(|e| e.into_inner());
        accounts.insert(account_id.to_string(), AccountState {
            account_id: account_id.to_string(),
            config,
            service,
        });
        Ok(())
    }

    async fn stop_account(&mut self, account_id: &str) -> Result<()> {
        let state = {
            let mut accounts = self.accounts.write().unwrap_or_else(|e| e.into_inner());
            accounts.remove(account_id)
        };

        if let Some(state) = state {
            info!(account_id = state.account_id, "stopping console account");
            state.service.cleanup().await?;
        } else {
            warn!(account_id, "console account not found");
        }

        Ok(())
    }

    fn outbound(&self) -> Option<&dyn ChannelOutbound> {
        Some(&self.outbound)
    }

    fn status(&self) -> Option<&dyn ChannelStatus> {
        Some(self)
    }

    fn profile(&self) -> Option<&dyn ChannelProfile> {
        Some(self)
    }

    fn contexts(&self) -> Option<&dyn ContextResolver> {
        Some(self)
    }
}

#[async_trait]
impl ChannelStatus for ConsolePlugin {
    async fn probe(&self, account_id: &str) -> Result<ChannelHealthSnapshot> {
        let snapshot = match self.service(account_id) {
            Some(service) => ChannelHealthSnapshot {
                connected: service.is_available(),
                account_id: account_id.to_string(),
                details: Some(format!(
                    "Operator: {} ({:?})",
                    service.current_user().nickname,
                    service.state()
                )),
            },
            None => ChannelHealthSnapshot {
                connected: false,
                account_id: account_id.to_string(),
                details: Some("account not started".into()),
            },
        };
        Ok(snapshot)
    }
}

/// Every console entity is the operator at the keyboard.
#[async_trait]
impl ChannelProfile for ConsolePlugin {
    async fn nick(&self, account_id: &str, target: &Selector) -> Result<Nick> {
        let service = self.require_service(account_id)?;
        service.account().get_context(target, None)?;
        let nickname = service.current_user().nickname;
        Ok(Nick {
            name: nickname.clone(),
            nickname,
            badge: String::new(),
        })
    }

    async fn summary(&self, account_id: &str, target: &Selector) -> Result<Summary> {
        let service = self.require_service(account_id)?;
        service.account().get_context(target, None)?;
        let nickname = service.current_user().nickname;
        Ok(Summary {
            name: nickname.clone(),
            description: nickname,
        })
    }
}

impl ContextResolver for ConsolePlugin {
    fn get_context(
        &self,
        account_id: &str,
        target: &Selector,
        via: Option<&Selector>,
    ) -> Result<Context> {
        let service = self.require_service(account_id)?;
        Ok(service.account().get_context(target, via)?)
    }
}
