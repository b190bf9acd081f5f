use std::sync::Arc;

use {
    anyhow::Result,
    async_trait::async_trait,
    chrono::Utc,
    portico_channels::{ChannelOutbound, Message, MessageChain, message_id},
    portico_common::Selector,
    tracing::{debug, info},
};

use crate::{
    error::Error,
    frontend::{ConsoleUser, FrontendCall},
    protocol::message_cache_key,
    service::ConsoleService,
    state::AccountStateMap,
};

/// Outbound message sender for the console.
pub struct ConsoleOutbound {
    pub(crate) accounts: AccountStateMap,
}

impl ConsoleOutbound {
    fn get_service(&self, account_id: &str) -> Result<Arc<ConsoleService>> {
        let accounts = self.accounts.read().unwrap_or_else(|e| e.into_inner());
        accounts
            .get(account_id)
            .map(|s| Arc::clone(&s.service))
            .ok_or_else(|| portico_channels::Error::unknown_account(account_id).into())
    }
}

#[async_trait]
impl ChannelOutbound for ConsoleOutbound {
    async fn send_message(
        &self,
        account_id: &str,
        target: &Selector,
        message: &MessageChain,
        reply: Option<&Selector>,
    ) -> Result<Selector> {
        let service = self.get_service(account_id)?;
        let context = service.account().get_context(target, None)?;
        let content = service
            .protocol()
            .serialize_message(message, service.config().unknown_elements)?;

        service.send_message(content, ConsoleUser::robot()).await?;
        info!(account_id, scene = %context.scene, "[send][Console] <- {message}");
        if let Some(reply) = reply {
            debug!(%reply, "console has no reply threading, sent unthreaded");
        }

        let time = Utc::now();
        let sent = Message {
            id: message_id(&time),
            scene: context.scene,
            sender: service.account().route().clone(),
            content: message.clone(),
            time,
        };
        if let Some(cache) = service.cache() {
            cache
                .set(
                    &message_cache_key(&sent.id),
                    sent.clone(),
                    service.config().message_cache_ttl(),
                )
                .await;
        }
        Ok(sent.to_selector())
    }

    async fn trigger_activity(
        &self,
        account_id: &str,
        target: &Selector,
        activity: &str,
    ) -> Result<()> {
        let service = self.get_service(account_id)?;
        service.account().get_context(target, None)?;
        if activity != FrontendCall::BELL {
            return Err(Error::UnknownApi {
                api: activity.to_owned(),
            }
            .into());
        }
        service.bell().await?;
        Ok(())
    }
}
