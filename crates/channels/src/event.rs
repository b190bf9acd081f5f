use {
    portico_common::Selector,
    serde::{Deserialize, Serialize},
};

use crate::message::Message;

/// Addressing attached to every event: who sent it, in which scene, and
/// whom to answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Context {
    pub account: Selector,
    pub client: Selector,
    pub endpoint: Selector,
    pub scene: Selector,
    #[serde(rename = "self")]
    pub self_: Selector,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub via: Vec<Selector>,
}

/// Events a binding hands to the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HostEvent {
    MessageReceived { message: Message },
    /// An account became usable (its connection/task is up).
    AccountAvailable { account: Selector },
    /// An account stopped being usable.
    AccountUnavailable { account: Selector },
}

impl HostEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::MessageReceived { .. } => "message_received",
            Self::AccountAvailable { .. } => "account_available",
            Self::AccountUnavailable { .. } => "account_unavailable",
        }
    }
}

/// A translated event together with its resolved context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedEvent {
    pub event: HostEvent,
    pub context: Context,
}
