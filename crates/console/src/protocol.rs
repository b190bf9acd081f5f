use {
    portico_channels::{MessageChain, ParsedEvent},
    portico_common::{Land, Platform},
    tracing::warn,
};

use crate::{
    CONSOLE_LAND,
    account::{CONSOLE_SCENE_PATH, ConsoleAccount, ContextSource, ContextSourceRegistry, console_scene_context},
    codec::{self, UnknownElementPolicy},
    error::{Error, Result},
    events::{ConsoleEvent, EventParserRegistry, MESSAGE_EVENT, parse_message},
    message::ConsoleMessage,
};

/// Cache key for a console message id.
pub fn message_cache_key(id: &str) -> String {
    format!("_console_context.message.{id}")
}

/// Static description of the console binding: platform, parser table and
/// context sources. Immutable once built.
pub struct ConsoleProtocol {
    platform: Platform,
    event_parsers: EventParserRegistry,
    context_sources: ContextSourceRegistry,
}

impl ConsoleProtocol {
    pub fn new() -> Result<Self> {
        let mut event_parsers = EventParserRegistry::new();
        event_parsers.register(MESSAGE_EVENT, parse_message)?;

        let mut context_sources = ContextSourceRegistry::new();
        context_sources.register(CONSOLE_SCENE_PATH, console_scene_context)?;

        let mut land = Land::new(CONSOLE_LAND);
        land.humanized_name = Some("Console".into());

        Ok(Self {
            platform: Platform {
                land,
                protocol: "Console".into(),
                humanized_name: Some("Console".into()),
            },
            event_parsers,
            context_sources,
        })
    }

    pub fn platform(&self) -> &Platform {
        &self.platform
    }

    pub fn land(&self) -> &Land {
        &self.platform.land
    }

    pub(crate) fn context_source(&self, path: &str) -> Option<ContextSource> {
        self.context_sources.get(path)
    }

    /// Translate a raw event. Unknown types fail in strict mode and are
    /// dropped with a warning otherwise.
    pub fn parse_event(
        &self,
        account: &ConsoleAccount,
        raw: &ConsoleEvent,
        strict: bool,
    ) -> Result<Option<ParsedEvent>> {
        let Some(parser) = self.event_parsers.get(&raw.event_type) else {
            if strict {
                return Err(Error::UnsupportedEvent {
                    event_type: raw.event_type.clone(),
                });
            }
            warn!(event_type = %raw.event_type, "received unsupported console event, dropped");
            return Ok(None);
        };
        parser(self, account, raw).map(Some)
    }

    pub fn serialize_message(
        &self,
        chain: &MessageChain,
        policy: UnknownElementPolicy,
    ) -> Result<ConsoleMessage> {
        codec::serialize(chain, policy)
    }

    pub fn deserialize_message(&self, message: &ConsoleMessage) -> MessageChain {
        codec::deserialize(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn platform_describes_console_land() {
        let protocol = ConsoleProtocol::new().unwrap();
        assert_eq!(protocol.land().name, "console");
        assert_eq!(protocol.platform().protocol, "Console");
        assert!(protocol.context_source(CONSOLE_SCENE_PATH).is_some());
        assert!(protocol.context_source("land.account").is_none());
    }

    #[test]
    fn cache_key_namespaces_message_ids() {
        assert_eq!(
            message_cache_key("1714564800.250000"),
            "_console_context.message.1714564800.250000"
        );
    }
}
