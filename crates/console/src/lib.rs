//! Console channel plugin for portico.
//!
//! Bridges an interactive console front-end to the host: typed operator
//! messages become [`HostEvent::MessageReceived`](portico_channels::HostEvent)
//! events, and messages the host sends are rendered back to the console.
//! Exposes exactly one account, `land(console).account(user)`.

pub mod account;
pub mod codec;
pub mod config;
pub mod element;
pub mod error;
pub mod events;
pub mod frontend;
pub mod line;
pub mod logs;
pub mod message;
pub mod outbound;
pub mod plugin;
pub mod protocol;
pub mod service;
pub mod state;

pub use {
    account::ConsoleAccount,
    config::ConsoleAccountConfig,
    element::ConsoleElement,
    error::{Error, Result},
    events::ConsoleEvent,
    frontend::{ConsoleUser, Frontend, FrontendCall, FrontendHandle},
    line::LineFrontend,
    logs::{LogLine, LogSink},
    message::ConsoleMessage,
    plugin::ConsolePlugin,
    protocol::ConsoleProtocol,
    service::{ConsoleService, LifecycleState},
};

/// Land name of the console binding.
pub const CONSOLE_LAND: &str = "console";

/// The single account the console exposes.
pub const CONSOLE_ACCOUNT_ID: &str = "user";
