//! Raw console events and the tag-keyed parser table that turns them into
//! host events.

use std::collections::HashMap;

use {
    chrono::{DateTime, Utc},
    portico_channels::{HostEvent, Message, ParsedEvent, message_id},
    portico_common::Selector,
    serde::{Deserialize, Serialize, de::DeserializeOwned},
    serde_json::{Map, Value},
};

use crate::{
    account::ConsoleAccount,
    codec,
    error::{Error, Result},
    frontend::ConsoleUser,
    message::ConsoleMessage,
    protocol::ConsoleProtocol,
};

/// Tag of the operator message event.
pub const MESSAGE_EVENT: &str = "message";

/// Event as emitted by the front-end, before translation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsoleEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    pub time: DateTime<Utc>,
    pub self_id: String,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl ConsoleEvent {
    pub fn new(event_type: impl Into<String>, self_id: impl Into<String>, time: DateTime<Utc>) -> Self {
        Self {
            event_type: event_type.into(),
            time,
            self_id: self_id.into(),
            fields: Map::new(),
        }
    }

    /// Operator typed `message` into the console.
    pub fn message(
        self_id: impl Into<String>,
        user: &ConsoleUser,
        message: &ConsoleMessage,
        time: DateTime<Utc>,
    ) -> Self {
        let mut event = Self::new(MESSAGE_EVENT, self_id, time);
        event.fields.insert("user".into(), serde_json::json!(user));
        event.fields.insert("message".into(), serde_json::json!(message));
        event
    }

    /// Decode one of the flattened fields.
    pub fn field<T: DeserializeOwned>(&self, name: &str) -> Result<T> {
        let value = self.fields.get(name).cloned().ok_or_else(|| {
            Error::validation(format!("`{}` event is missing `{name}`", self.event_type))
        })?;
        serde_json::from_value(value)
            .map_err(|e| Error::validation(format!("`{}` event field `{name}`: {e}", self.event_type)))
    }
}

/// Translates one raw event type.
pub type EventParser = fn(&ConsoleProtocol, &ConsoleAccount, &ConsoleEvent) -> Result<ParsedEvent>;

/// Tag → parser map, filled once when the protocol is built.
#[derive(Default)]
pub struct EventParserRegistry {
    parsers: HashMap<String, EventParser>,
}

impl EventParserRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, event_type: impl Into<String>, parser: EventParser) -> Result<()> {
        let event_type = event_type.into();
        if self.parsers.contains_key(&event_type) {
            return Err(Error::DuplicateRegistration {
                kind: "event parser",
                key: event_type,
            });
        }
        self.parsers.insert(event_type, parser);
        Ok(())
    }

    pub fn get(&self, event_type: &str) -> Option<EventParser> {
        self.parsers.get(event_type).copied()
    }

    pub fn event_types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = self.parsers.keys().map(String::as_str).collect();
        types.sort_unstable();
        types
    }
}

/// Parser for [`MESSAGE_EVENT`].
pub fn parse_message(
    protocol: &ConsoleProtocol,
    account: &ConsoleAccount,
    raw: &ConsoleEvent,
) -> Result<ParsedEvent> {
    let user: ConsoleUser = raw.field("user")?;
    let content = raw
        .fields
        .get("message")
        .ok_or_else(|| Error::validation("`message` event is missing `message`"))
        .and_then(ConsoleMessage::from_json)?;

    let scene = Selector::new()
        .land(protocol.land().name.as_str())
        .console(user.id.as_str());
    let context = account.get_context(&scene, None)?;
    let message = Message {
        id: message_id(&raw.time),
        scene: scene.clone(),
        sender: scene,
        content: codec::deserialize(&content),
        time: raw.time,
    };

    Ok(ParsedEvent {
        event: HostEvent::MessageReceived { message },
        context,
    })
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::{account::tests::test_account, element::ConsoleElement},
        chrono::TimeZone,
        portico_channels::{Element, MessageChain},
        serde_json::json,
    };

    fn example_event() -> ConsoleEvent {
        serde_json::from_value(json!({
            "type": "message",
            "time": "2024-05-01T12:00:00.250Z",
            "self_id": "console",
            "message": [{"type": "Text", "text": "hi"}],
            "user": {"id": "u1", "nickname": "Bob"},
        }))
        .unwrap()
    }

    #[test]
    fn raw_event_keeps_extra_fields_flat() {
        let raw = example_event();
        assert_eq!(raw.event_type, "message");
        assert_eq!(raw.self_id, "console");
        assert!(raw.fields.contains_key("user"));

        let back = serde_json::to_value(&raw).unwrap();
        assert_eq!(back["type"], "message");
        assert_eq!(back["user"]["nickname"], "Bob");
    }

    #[test]
    fn message_constructor_matches_wire_form() {
        let raw = ConsoleEvent::message(
            "console",
            &ConsoleUser::new("u1", "Bob"),
            &ConsoleMessage::text("hi"),
            Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
        );
        let user: ConsoleUser = raw.field("user").unwrap();
        assert_eq!(user.nickname, "Bob");
        assert_eq!(
            raw.fields["message"],
            json!([{"type": "Text", "text": "hi"}])
        );
    }

    #[test]
    fn duplicate_parser_registration_fails_fast() {
        let mut registry = EventParserRegistry::new();
        registry.register("message", parse_message).unwrap();
        let err = registry.register("message", parse_message).unwrap_err();
        assert!(matches!(
            err,
            Error::DuplicateRegistration { kind: "event parser", ref key } if key == "message"
        ));
        assert_eq!(registry.event_types(), vec!["message"]);
    }

    #[test]
    fn example_message_parses_into_console_scene() {
        let (protocol, account) = test_account();
        let parsed = protocol
            .parse_event(&account, &example_event(), true)
            .unwrap()
            .unwrap();

        let scene: Selector = "land(console).console(u1)".parse().unwrap();
        assert_eq!(parsed.context.scene, scene);
        assert_eq!(parsed.context.account, *account.route());

        let HostEvent::MessageReceived { message } = parsed.event else {
            panic!("expected message event");
        };
        assert_eq!(message.scene, scene);
        assert_eq!(message.sender, scene);
        assert_eq!(message.id, "1714564800.250000");
        assert_eq!(message.content, MessageChain::new(vec![Element::text("hi")]));
        assert_eq!(
            ConsoleMessage::try_from(&message.content).unwrap(),
            ConsoleMessage::text("hi")
        );
    }

    #[test]
    fn identical_input_parses_identically() {
        let (protocol, account) = test_account();
        let a = protocol.parse_event(&account, &example_event(), true).unwrap().unwrap();
        let b = protocol.parse_event(&account, &example_event(), true).unwrap().unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn rich_content_travels_as_native_elements() {
        let (protocol, account) = test_account();
        let mut raw = example_event();
        raw.fields.insert(
            "message".into(),
            json!([{"type": "Text", "text": "hi "}, {"type": "Emoji", "name": "wave"}]),
        );
        let parsed = protocol.parse_event(&account, &raw, true).unwrap().unwrap();
        let HostEvent::MessageReceived { message } = parsed.event else {
            panic!("expected message event");
        };
        assert_eq!(
            ConsoleMessage::try_from(&message.content).unwrap().elements(),
            &[ConsoleElement::text("hi "), ConsoleElement::emoji("wave")]
        );
    }

    #[test]
    fn unknown_tag_strict_fails_lenient_drops() {
        let (protocol, account) = test_account();
        let raw = ConsoleEvent::new("unknown-tag", "console", Utc::now());

        assert!(protocol.parse_event(&account, &raw, false).unwrap().is_none());
        assert!(matches!(
            protocol.parse_event(&account, &raw, true),
            Err(Error::UnsupportedEvent { event_type }) if event_type == "unknown-tag"
        ));
    }

    #[test]
    fn malformed_message_event_is_validation_error() {
        let (protocol, account) = test_account();
        for patch in [
            json!({"message": "hi"}),
            json!({"message": [{"type": "Image", "url": "x"}]}),
            json!({"user": "u1"}),
        ] {
            let mut raw = example_event();
            for (k, v) in patch.as_object().unwrap() {
                raw.fields.insert(k.clone(), v.clone());
            }
            assert!(matches!(
                protocol.parse_event(&account, &raw, false),
                Err(Error::Validation { .. })
            ));
        }

        let mut raw = example_event();
        raw.fields.remove("user");
        assert!(matches!(
            protocol.parse_event(&account, &raw, true),
            Err(Error::Validation { .. })
        ));
    }
}
