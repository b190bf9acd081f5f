//! In-process event bus: the host's dispatch mechanism for channel events.
//!
//! Bindings post [`HostEvent`]s through [`ChannelEventSink`]; receivers
//! subscribe and get every event in posting order. Slow receivers lag and
//! lose the oldest entries rather than blocking the binding.

use {async_trait::async_trait, tokio::sync::broadcast, tracing::debug};

use crate::{
    event::{Context, HostEvent, ParsedEvent},
    plugin::ChannelEventSink,
};

const DEFAULT_BUS_CAPACITY: usize = 256;

#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<ParsedEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ParsedEvent> {
        self.tx.subscribe()
    }

    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_BUS_CAPACITY)
    }
}

#[async_trait]
impl ChannelEventSink for EventBus {
    async fn post(&self, event: HostEvent, context: Context) {
        let kind = event.name();
        if self.tx.send(ParsedEvent { event, context }).is_err() {
            debug!(event = kind, "no receivers for host event, dropped");
        }
    }
}

#[cfg(test)]
mod tests {
    use {super::*, portico_common::Selector};

    fn ctx() -> Context {
        let account = Selector::new().land("console").account("user");
        Context {
            account: account.clone(),
            client: account.clone(),
            endpoint: account.clone(),
            scene: account.clone(),
            self_: account,
            via: vec![],
        }
    }

    #[tokio::test]
    async fn delivers_in_posting_order() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe();
        let a = Selector::new().land("console").account("user");

        bus.post(HostEvent::AccountAvailable { account: a.clone() }, ctx())
            .await;
        bus.post(HostEvent::AccountUnavailable { account: a.clone() }, ctx())
            .await;

        assert_eq!(rx.recv().await.unwrap().event.name(), "account_available");
        assert_eq!(rx.recv().await.unwrap().event.name(), "account_unavailable");
    }

    #[tokio::test]
    async fn posting_without_receivers_is_harmless() {
        let bus = EventBus::new(4);
        assert_eq!(bus.receiver_count(), 0);
        bus.post(
            HostEvent::AccountAvailable {
                account: Selector::new(),
            },
            ctx(),
        )
        .await;
    }
}
