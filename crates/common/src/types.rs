//! Addressing types shared by the host and every protocol binding.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Hierarchical address naming accounts, scenes and senders.
///
/// A selector is an ordered list of `(key, value)` pairs, e.g.
/// `land(console).account(user)`. Keys are unique; setting an existing key
/// replaces its value in place.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Selector {
    pattern: Vec<(String, String)>,
}

impl Selector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `key` to `value`, appending the pair when the key is new.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let key = key.into();
        let value = value.into();
        match self.pattern.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.pattern.push((key, value)),
        }
        self
    }

    #[must_use]
    pub fn land(self, land: impl Into<String>) -> Self {
        self.with("land", land)
    }

    #[must_use]
    pub fn account(self, account: impl Into<String>) -> Self {
        self.with("account", account)
    }

    #[must_use]
    pub fn console(self, console: impl Into<String>) -> Self {
        self.with("console", console)
    }

    #[must_use]
    pub fn message(self, message: impl Into<String>) -> Self {
        self.with("message", message)
    }

    /// Prepend a `land` component when the selector has none.
    #[must_use]
    pub fn complete_land(mut self, land: &str) -> Self {
        if !self.contains("land") {
            self.pattern.insert(0, ("land".to_owned(), land.to_owned()));
        }
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.pattern
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.pattern.iter().any(|(k, _)| k == key)
    }

    /// Keys joined by `.`, e.g. `land.console`.
    pub fn path(&self) -> String {
        self.pattern
            .iter()
            .map(|(k, _)| k.as_str())
            .collect::<Vec<_>>()
            .join(".")
    }

    /// Value of the innermost component.
    pub fn last_value(&self) -> Option<&str> {
        self.pattern.last().map(|(_, v)| v.as_str())
    }

    /// Whether `prefix` names this selector or one of its ancestors.
    pub fn follows(&self, prefix: &Selector) -> bool {
        prefix.pattern.len() <= self.pattern.len()
            && prefix
                .pattern
                .iter()
                .zip(self.pattern.iter())
                .all(|(a, b)| a == b)
    }

    pub fn len(&self) -> usize {
        self.pattern.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pattern.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pattern.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (key, value)) in self.pattern.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            write!(f, "{key}({value})")?;
        }
        Ok(())
    }
}

impl FromStr for Selector {
    type Err = Error;

    /// Parse the display form, `land(console).console(u1)`.
    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let mut selector = Selector::new();
        let mut rest = input.trim();
        while !rest.is_empty() {
            let open = rest
                .find('(')
                .ok_or_else(|| Error::invalid_selector(input, "expected `(`"))?;
            let key = &rest[..open];
            if key.is_empty() || !key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
                return Err(Error::invalid_selector(input, format!("bad key `{key}`")));
            }
            let close = rest[open..]
                .find(')')
                .map(|i| open + i)
                .ok_or_else(|| Error::invalid_selector(input, "unclosed `(`"))?;
            if selector.contains(key) {
                return Err(Error::invalid_selector(input, format!("duplicate key `{key}`")));
            }
            selector = selector.with(key, &rest[open + 1..close]);
            rest = &rest[close + 1..];
            if let Some(next) = rest.strip_prefix('.') {
                if next.is_empty() {
                    return Err(Error::invalid_selector(input, "trailing `.`"));
                }
                rest = next;
            } else if !rest.is_empty() {
                return Err(Error::invalid_selector(input, "expected `.` between components"));
            }
        }
        Ok(selector)
    }
}

/// Top-level namespace identifying a protocol binding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Land {
    pub name: String,
    #[serde(default)]
    pub maintainers: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub humanized_name: Option<String>,
}

impl Land {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            maintainers: Vec::new(),
            humanized_name: None,
        }
    }
}

/// Descriptor a binding reports to the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Platform {
    pub land: Land,
    /// Protocol name, e.g. "Console".
    pub protocol: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub humanized_name: Option<String>,
}
