use {
    anyhow::Result,
    async_trait::async_trait,
    portico_common::{Platform, Selector},
    serde::Serialize,
};

use crate::{
    event::{Context, HostEvent},
    message::MessageChain,
};

/// Sink for inbound events. The host provides the concrete implementation.
#[async_trait]
pub trait ChannelEventSink: Send + Sync {
    /// Hand a translated event to the host's dispatch mechanism.
    async fn post(&self, event: HostEvent, context: Context);
}

/// Core channel plugin trait. Each protocol binding implements this.
#[async_trait]
pub trait ChannelPlugin: Send + Sync {
    /// Channel identifier (e.g. "console").
    fn id(&self) -> &str;

    /// Human-readable channel name.
    fn name(&self) -> &str;

    /// Land and protocol descriptor.
    fn platform(&self) -> &Platform;

    /// Start an account connection.
    async fn start_account(&mut self, account_id: &str, config: serde_json::Value) -> Result<()>;

    /// Stop an account connection.
    async fn stop_account(&mut self, account_id: &str) -> Result<()>;

    /// Get outbound adapter for sending messages.
    fn outbound(&self) -> Option<&dyn ChannelOutbound>;

    /// Get status adapter for health checks.
    fn status(&self) -> Option<&dyn ChannelStatus>;

    /// Get profile adapter for nickname/summary lookups.
    fn profile(&self) -> Option<&dyn ChannelProfile> {
        None
    }

    /// Get the resolver turning target selectors into contexts.
    fn contexts(&self) -> Option<&dyn ContextResolver> {
        None
    }
}

/// Send messages and activity signals to a channel.
#[async_trait]
pub trait ChannelOutbound: Send + Sync {
    /// Deliver `message` to `target`, returning the selector of the sent message.
    async fn send_message(
        &self,
        account_id: &str,
        target: &Selector,
        message: &MessageChain,
        reply: Option<&Selector>,
    ) -> Result<Selector>;

    /// Trigger a named activity (e.g. "bell") on `target`.
    async fn trigger_activity(&self, account_id: &str, target: &Selector, activity: &str)
    -> Result<()>;
}

/// Probe channel account health.
#[async_trait]
pub trait ChannelStatus: Send + Sync {
    async fn probe(&self, account_id: &str) -> Result<ChannelHealthSnapshot>;
}

/// Channel health snapshot.
#[derive(Debug, Clone)]
pub struct ChannelHealthSnapshot {
    pub connected: bool,
    pub account_id: String,
    pub details: Option<String>,
}

/// Display name of an entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Nick {
    pub name: String,
    pub nickname: String,
    pub badge: String,
}

/// Short description of an entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub name: String,
    pub description: String,
}

/// Profile queries answered by a channel.
#[async_trait]
pub trait ChannelProfile: Send + Sync {
    async fn nick(&self, account_id: &str, target: &Selector) -> Result<Nick>;
    async fn summary(&self, account_id: &str, target: &Selector) -> Result<Summary>;
}

/// Resolves a target selector into the context the host uses for metadata
/// and permission queries.
pub trait ContextResolver: Send + Sync {
    fn get_context(
        &self,
        account_id: &str,
        target: &Selector,
        via: Option<&Selector>,
    ) -> Result<Context>;
}
