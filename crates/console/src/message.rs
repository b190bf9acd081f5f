use std::fmt;

use {
    portico_channels::MessageChain,
    serde::{Deserialize, Serialize},
    serde_json::Value,
};

use crate::{
    codec::{self, UnknownElementPolicy},
    element::ConsoleElement,
    error::{Error, Result},
};

/// Ordered, immutable sequence of [`ConsoleElement`]s.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConsoleMessage {
    content: Vec<ConsoleElement>,
}

impl ConsoleMessage {
    pub fn new(content: Vec<ConsoleElement>) -> Self {
        Self { content }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self::new(vec![ConsoleElement::text(text)])
    }

    /// Build from the front-end wire form: a JSON array of tagged elements.
    pub fn from_json(value: &Value) -> Result<Self> {
        let items = value
            .as_array()
            .ok_or_else(|| Error::validation("message content must be an array"))?;
        items
            .iter()
            .enumerate()
            .map(|(i, item)| {
                serde_json::from_value(item.clone())
                    .map_err(|e| Error::validation(format!("element {i}: {e}")))
            })
            .collect::<Result<Vec<_>>>()
            .map(Self::new)
    }

    pub fn elements(&self) -> &[ConsoleElement] {
        &self.content
    }

    pub fn iter(&self) -> impl Iterator<Item = &ConsoleElement> {
        self.content.iter()
    }

    pub fn len(&self) -> usize {
        self.content.len()
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    pub fn into_elements(self) -> Vec<ConsoleElement> {
        self.content
    }
}

impl From<Vec<ConsoleElement>> for ConsoleMessage {
    fn from(content: Vec<ConsoleElement>) -> Self {
        Self::new(content)
    }
}

/// Strict conversion from a host chain: every element must be text or a
/// console-native element.
impl TryFrom<&MessageChain> for ConsoleMessage {
    type Error = Error;

    fn try_from(chain: &MessageChain) -> Result<Self> {
        codec::serialize(chain, UnknownElementPolicy::Reject)
    }
}

impl fmt::Display for ConsoleMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for element in &self.content {
            write!(f, "{element}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::element::{Markdown, Markup},
        portico_channels::Element,
        serde_json::json,
    };

    #[test]
    fn all_four_variants_validate() {
        let value = json!([
            {"type": "Text", "text": "a"},
            {"type": "Emoji", "name": "smile"},
            {"type": "Markup", "markup": "[b]c[/b]"},
            {"type": "Markdown", "markup": "# d"},
        ]);
        let msg = ConsoleMessage::from_json(&value).unwrap();
        assert_eq!(msg.elements(), &[
            ConsoleElement::text("a"),
            ConsoleElement::emoji("smile"),
            ConsoleElement::Markup(Markup::new("[b]c[/b]")),
            ConsoleElement::Markdown(Markdown::new("# d")),
        ]);
        assert_eq!(msg.to_string(), "a:smile:[b]c[/b]# d");
    }

    #[test]
    fn foreign_variant_fails_validation() {
        let value = json!([
            {"type": "Text", "text": "a"},
            {"type": "Image", "url": "http://x"},
        ]);
        let err = ConsoleMessage::from_json(&value).unwrap_err();
        assert!(matches!(err, Error::Validation { ref message } if message.starts_with("element 1")));
    }

    #[test]
    fn non_array_fails_validation() {
        assert!(matches!(
            ConsoleMessage::from_json(&json!("hi")),
            Err(Error::Validation { .. })
        ));
    }

    #[test]
    fn empty_message_is_valid() {
        assert!(ConsoleMessage::from_json(&json!([])).unwrap().is_empty());
    }

    #[test]
    fn host_chain_with_foreign_element_is_rejected() {
        let chain = MessageChain::new(vec![Element::text("hi"), Element::Image {
            url: "http://x".into(),
        }]);
        assert!(matches!(
            ConsoleMessage::try_from(&chain),
            Err(Error::Validation { .. })
        ));
    }

    #[test]
    fn host_text_chain_converts() {
        let chain = MessageChain::from("hi");
        assert_eq!(
            ConsoleMessage::try_from(&chain).unwrap(),
            ConsoleMessage::text("hi")
        );
    }
}
