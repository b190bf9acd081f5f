//! The closed set of elements a console message can carry.
//!
//! Adding a variant means updating the codec and the native encoding below;
//! there is no open extension point here.

use std::fmt;

use {
    serde::{Deserialize, Serialize},
    serde_json::{Value, json},
};

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ConsoleElement {
    Text(Text),
    Emoji(Emoji),
    Markup(Markup),
    Markdown(Markdown),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Text {
    pub text: String,
}

/// Emoji by name, e.g. `smile`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Emoji {
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmojiVariant {
    Text,
    Emoji,
}

/// Inline styled markup (`[bold]hi[/bold]`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Markup {
    pub markup: String,
    #[serde(default = "default_style")]
    pub style: String,
    #[serde(default = "default_true")]
    pub emoji: bool,
    #[serde(default)]
    pub emoji_variant: Option<EmojiVariant>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Justify {
    Default,
    Left,
    Center,
    Right,
    Full,
}

/// Block markdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Markdown {
    pub markup: String,
    #[serde(default = "default_code_theme")]
    pub code_theme: String,
    #[serde(default)]
    pub justify: Option<Justify>,
    #[serde(default = "default_style")]
    pub style: String,
    #[serde(default = "default_true")]
    pub hyperlinks: bool,
    #[serde(default)]
    pub inline_code_lexer: Option<String>,
    #[serde(default)]
    pub inline_code_theme: Option<String>,
}

fn default_style() -> String {
    "none".into()
}

fn default_code_theme() -> String {
    "monokai".into()
}

fn default_true() -> bool {
    true
}

impl Markup {
    pub fn new(markup: impl Into<String>) -> Self {
        Self {
            markup: markup.into(),
            style: default_style(),
            emoji: true,
            emoji_variant: None,
        }
    }
}

impl Markdown {
    pub fn new(markup: impl Into<String>) -> Self {
        Self {
            markup: markup.into(),
            code_theme: default_code_theme(),
            justify: None,
            style: default_style(),
            hyperlinks: true,
            inline_code_lexer: None,
            inline_code_theme: None,
        }
    }
}

impl ConsoleElement {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(Text { text: text.into() })
    }

    pub fn emoji(name: impl Into<String>) -> Self {
        Self::Emoji(Emoji { name: name.into() })
    }

    /// Variant tag, as used on the wire.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Text(_) => "Text",
            Self::Emoji(_) => "Emoji",
            Self::Markup(_) => "Markup",
            Self::Markdown(_) => "Markdown",
        }
    }

    /// Payload of the element without its tag, for the host's native
    /// element encoding.
    pub(crate) fn native_data(&self) -> Value {
        match self {
            Self::Text(t) => json!({ "text": t.text }),
            Self::Emoji(e) => json!({ "name": e.name }),
            Self::Markup(m) => json!({
                "markup": m.markup,
                "style": m.style,
                "emoji": m.emoji,
                "emoji_variant": m.emoji_variant,
            }),
            Self::Markdown(m) => json!({
                "markup": m.markup,
                "code_theme": m.code_theme,
                "justify": m.justify,
                "style": m.style,
                "hyperlinks": m.hyperlinks,
                "inline_code_lexer": m.inline_code_lexer,
                "inline_code_theme": m.inline_code_theme,
            }),
        }
    }

    /// Inverse of [`Self::native_data`].
    pub(crate) fn from_native(kind: &str, data: &Value) -> Result<Self> {
        let decode = |e: serde_json::Error| Error::validation(format!("malformed {kind}: {e}"));
        let data = data.clone();
        match kind {
            "Text" => serde_json::from_value(data).map(Self::Text).map_err(decode),
            "Emoji" => serde_json::from_value(data).map(Self::Emoji).map_err(decode),
            "Markup" => serde_json::from_value(data).map(Self::Markup).map_err(decode),
            "Markdown" => serde_json::from_value(data).map(Self::Markdown).map_err(decode),
            other => Err(Error::validation(format!("unknown console element `{other}`"))),
        }
    }
}

impl fmt::Display for ConsoleElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(t) => f.write_str(&t.text),
            Self::Emoji(e) => write!(f, ":{}:", e.name),
            Self::Markup(m) => f.write_str(&m.markup),
            Self::Markdown(m) => f.write_str(&m.markup),
        }
    }
}
