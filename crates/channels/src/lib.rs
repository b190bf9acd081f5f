//! Host-side channel model.
//!
//! Every protocol binding (the console, and any future one) implements the
//! ChannelPlugin trait with sub-traits for outbound messaging, status,
//! profile lookups and context resolution. Inbound traffic reaches the host
//! as [`HostEvent`]s posted to a [`ChannelEventSink`].

pub mod bus;
pub mod cache;
pub mod error;
pub mod event;
pub mod message;
pub mod plugin;
pub mod registry;

pub use {
    bus::EventBus,
    cache::{MemoryMessageCache, MessageCache},
    error::{Error, Result},
    event::{Context, HostEvent, ParsedEvent},
    message::{Element, Message, MessageChain, message_id},
    plugin::{
        ChannelEventSink, ChannelHealthSnapshot, ChannelOutbound, ChannelPlugin, ChannelProfile,
        ChannelStatus, ContextResolver, Nick, Summary,
    },
    registry::ChannelRegistry,
};
