//! Generic message representation shared by every binding.

use std::fmt;

use {
    chrono::{DateTime, Utc},
    portico_common::Selector,
    serde::{Deserialize, Serialize},
    serde_json::Value,
};

/// A generic message element.
///
/// Bindings translate their own element set to and from this one. Elements a
/// binding has no generic counterpart for travel as [`Element::Native`],
/// tagged with the binding's protocol name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Element {
    Text {
        text: String,
    },
    Image {
        url: String,
    },
    Native {
        protocol: String,
        kind: String,
        data: Value,
    },
}

impl Element {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    /// Short tag naming the element kind, used in logs and errors.
    pub fn kind(&self) -> &str {
        match self {
            Self::Text { .. } => "text",
            Self::Image { .. } => "image",
            Self::Native { kind, .. } => kind,
        }
    }

    /// Plain-text fallback for surfaces that cannot render the element.
    pub fn plain_text(&self) -> String {
        match self {
            Self::Text { text } => text.clone(),
            Self::Image { url } => format!("[image {url}]"),
            Self::Native { protocol, kind, .. } => format!("[{protocol}:{kind}]"),
        }
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.plain_text())
    }
}

/// Ordered sequence of generic elements.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageChain {
    pub content: Vec<Element>,
}

impl MessageChain {
    pub fn new(content: Vec<Element>) -> Self {
        Self { content }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Element> {
        self.content.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    pub fn len(&self) -> usize {
        self.content.len()
    }
}

impl From<&str> for MessageChain {
    fn from(text: &str) -> Self {
        Self::new(vec![Element::text(text)])
    }
}

impl From<Vec<Element>> for MessageChain {
    fn from(content: Vec<Element>) -> Self {
        Self::new(content)
    }
}

impl fmt::Display for MessageChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for element in &self.content {
            write!(f, "{element}")?;
        }
        Ok(())
    }
}

/// A received or sent message. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub scene: Selector,
    pub sender: Selector,
    pub content: MessageChain,
    pub time: DateTime<Utc>,
}

impl Message {
    /// Address of this message inside its scene.
    pub fn to_selector(&self) -> Selector {
        self.scene.clone().message(self.id.clone())
    }
}

/// Message id derived from a timestamp: `<unix seconds>.<microseconds>`.
pub fn message_id(time: &DateTime<Utc>) -> String {
    format!("{}.{:06}", time.timestamp(), time.timestamp_subsec_micros())
}
