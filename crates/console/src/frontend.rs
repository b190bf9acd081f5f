//! Boundary with the interactive front-end.
//!
//! The front-end owns rendering, layout and keyboard handling. The core only
//! needs it to run a foreground loop, accept outbound calls and report who is
//! at the keyboard. Inbound traffic flows back through [`FrontendHandle`].

use std::{sync::Arc, time::Duration};

use {
    async_trait::async_trait,
    portico_channels::{ChannelEventSink, HostEvent, MessageCache},
    serde::{Deserialize, Serialize},
    serde_json::Value,
    tokio::sync::broadcast,
    tokio_util::sync::CancellationToken,
    tracing::debug,
};

use crate::{
    account::ConsoleAccount,
    error::{Error, Result},
    events::ConsoleEvent,
    logs::{LogLine, LogSink},
    message::ConsoleMessage,
    protocol::{ConsoleProtocol, message_cache_key},
};

/// A participant on the console side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsoleUser {
    pub id: String,
    #[serde(default)]
    pub nickname: String,
}

impl ConsoleUser {
    pub fn new(id: impl Into<String>, nickname: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            nickname: nickname.into(),
        }
    }

    /// Author of everything the host sends to the console.
    pub fn robot() -> Self {
        Self::new("console", "Portico")
    }
}

/// Outbound call delivered to the front-end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrontendCall {
    /// Append a message to the transcript.
    SendMessage {
        message: ConsoleMessage,
        info: ConsoleUser,
    },
    /// Ring the terminal bell.
    Bell,
}

impl FrontendCall {
    pub const BELL: &'static str = "bell";
    pub const SEND_MSG: &'static str = "send_msg";

    pub fn api(&self) -> &'static str {
        match self {
            Self::SendMessage { .. } => Self::SEND_MSG,
            Self::Bell => Self::BELL,
        }
    }

    /// Decode an untyped `(api, payload)` call.
    ///
    /// `send_msg` expects `{ "message": [elements], "info": { "id": .. } }`;
    /// `bell` ignores its payload.
    pub fn from_api(api: &str, payload: Value) -> Result<Self> {
        match api {
            Self::SEND_MSG => {
                let message = payload
                    .get("message")
                    .ok_or_else(|| Error::validation("send_msg payload is missing `message`"))
                    .and_then(ConsoleMessage::from_json)?;
                let info = payload
                    .get("info")
                    .cloned()
                    .ok_or_else(|| Error::validation("send_msg payload is missing `info`"))?;
                let info: ConsoleUser = serde_json::from_value(info)
                    .map_err(|e| Error::validation(format!("send_msg info: {e}")))?;
                Ok(Self::SendMessage { message, info })
            },
            Self::BELL => Ok(Self::Bell),
            other => Err(Error::UnknownApi {
                api: other.to_owned(),
            }),
        }
    }
}

/// Interactive console front-end.
#[async_trait]
pub trait Frontend: Send + Sync + 'static {
    /// Prepare the terminal before the foreground loop starts. An error here
    /// aborts service startup.
    async fn mount(&self) -> Result<()> {
        Ok(())
    }

    /// Foreground loop. Returns when the operator quits or `cancel` fires.
    async fn run(&self, handle: FrontendHandle, cancel: CancellationToken) -> Result<()>;

    /// Deliver an outbound call, in call order.
    async fn call(&self, call: FrontendCall) -> Result<()>;

    /// Operator currently attached to the console.
    fn current_user(&self) -> ConsoleUser;
}

/// What the front-end gets to talk back to the core.
#[derive(Clone)]
pub struct FrontendHandle {
    protocol: Arc<ConsoleProtocol>,
    account: Arc<ConsoleAccount>,
    sink: Option<Arc<dyn ChannelEventSink>>,
    cache: Option<Arc<dyn MessageCache>>,
    cache_ttl: Duration,
    logs: LogSink,
    strict: bool,
}

impl FrontendHandle {
    pub(crate) fn new(
        protocol: Arc<ConsoleProtocol>,
        account: Arc<ConsoleAccount>,
        sink: Option<Arc<dyn ChannelEventSink>>,
        cache: Option<Arc<dyn MessageCache>>,
        cache_ttl: Duration,
        logs: LogSink,
        strict: bool,
    ) -> Self {
        Self {
            protocol,
            account,
            sink,
            cache,
            cache_ttl,
            logs,
            strict,
        }
    }

    pub fn account(&self) -> &ConsoleAccount {
        &self.account
    }

    /// Attach to the log sink.
    pub fn logs(&self) -> broadcast::Receiver<LogLine> {
        self.logs.subscribe()
    }

    /// Parse a raw event and hand it to the host.
    ///
    /// Returns `false` when the event was dropped (unknown type, non-strict).
    pub async fn dispatch(&self, raw: ConsoleEvent) -> Result<bool> {
        let Some(parsed) = self
            .protocol
            .parse_event(&self.account, &raw, self.strict)?
        else {
            return Ok(false);
        };

        if let (Some(cache), HostEvent::MessageReceived { message }) = (&self.cache, &parsed.event)
        {
            cache
                .set(&message_cache_key(&message.id), message.clone(), self.cache_ttl)
                .await;
        }

        match &self.sink {
            Some(sink) => sink.post(parsed.event, parsed.context).await,
            None => debug!(event = parsed.event.name(), "no event sink attached, dropped"),
        }
        Ok(true)
    }
}
