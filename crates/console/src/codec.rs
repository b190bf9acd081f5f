//! Conversion between host message chains and console messages.

use {
    portico_channels::{Element, MessageChain},
    serde::{Deserialize, Serialize},
    tracing::debug,
};

use crate::{
    element::ConsoleElement,
    error::{Error, Result},
    message::ConsoleMessage,
};

/// Protocol tag carried by console elements inside host chains.
pub const NATIVE_PROTOCOL: &str = "console";

/// What to do with host elements the console cannot represent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnknownElementPolicy {
    /// Fail with a validation error.
    #[default]
    Reject,
    /// Compatibility mode: replace the element with its plain-text fallback.
    Degrade,
}

/// Host chain → console message.
pub fn serialize(chain: &MessageChain, policy: UnknownElementPolicy) -> Result<ConsoleMessage> {
    chain
        .iter()
        .map(|element| serialize_element(element, policy))
        .collect::<Result<Vec<_>>>()
        .map(ConsoleMessage::new)
}

fn serialize_element(element: &Element, policy: UnknownElementPolicy) -> Result<ConsoleElement> {
    match element {
        Element::Text { text } => Ok(ConsoleElement::text(text.clone())),
        Element::Native {
            protocol,
            kind,
            data,
        } if protocol == NATIVE_PROTOCOL => ConsoleElement::from_native(kind, data),
        other => match policy {
            UnknownElementPolicy::Reject => Err(Error::validation(format!(
                "element `{}` has no console representation",
                other.kind()
            ))),
            UnknownElementPolicy::Degrade => {
                debug!(kind = other.kind(), "degrading element to plain text");
                Ok(ConsoleElement::text(other.plain_text()))
            },
        },
    }
}

/// Console message → host chain. Total: text maps to host text, every other
/// variant travels as a console-native element.
pub fn deserialize(message: &ConsoleMessage) -> MessageChain {
    message
        .iter()
        .map(|element| match element {
            ConsoleElement::Text(t) => Element::text(t.text.clone()),
            other => Element::Native {
                protocol: NATIVE_PROTOCOL.into(),
                kind: other.kind().into(),
                data: other.native_data(),
            },
        })
        .collect::<Vec<_>>()
        .into()
}
