//! End-to-end tests for the console gateway driven by a scripted front-end.
#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::{Arc, Mutex};

use {
    async_trait::async_trait,
    chrono::Utc,
    portico_channels::{
        ChannelPlugin, EventBus, HostEvent, MemoryMessageCache, MessageCache, MessageChain,
        ParsedEvent,
    },
    portico_common::Selector,
    portico_console::{
        ConsoleAccountConfig, ConsoleEvent, ConsoleMessage, ConsolePlugin, ConsoleProtocol,
        ConsoleService, ConsoleUser, Error, Frontend, FrontendCall, FrontendHandle,
        LifecycleState, Result,
    },
    serde_json::json,
    tokio::{
        sync::{broadcast, mpsc},
        time::{Duration, timeout},
    },
    tokio_util::sync::CancellationToken,
};

// ── Scripted front-end ───────────────────────────────────────────────────────

enum Step {
    Say(&'static str),
    Quit,
}

#[derive(Default)]
struct Behaviour {
    fail_mount: bool,
    ignore_cancel: bool,
    panic_in_run: bool,
}

/// Front-end that replays operator steps and records every outbound call.
struct Scripted {
    behaviour: Behaviour,
    script: tokio::sync::Mutex<Option<mpsc::UnboundedReceiver<Step>>>,
    calls: Mutex<Vec<FrontendCall>>,
}

impl Scripted {
    fn new(behaviour: Behaviour) -> (Arc<Self>, mpsc::UnboundedSender<Step>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let fe = Arc::new(Self {
            behaviour,
            script: tokio::sync::Mutex::new(Some(rx)),
            calls: Mutex::new(Vec::new()),
        });
        (fe, tx)
    }

    fn calls(&self) -> Vec<FrontendCall> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl Frontend for Scripted {
    async fn mount(&self) -> Result<()> {
        if self.behaviour.fail_mount {
            return Err(Error::Io(std::io::Error::other("no terminal")));
        }
        Ok(())
    }

    async fn run(&self, handle: FrontendHandle, cancel: CancellationToken) -> Result<()> {
        if self.behaviour.panic_in_run {
            panic!("front-end crashed");
        }
        if self.behaviour.ignore_cancel {
            std::future::pending::<()>().await;
        }
        let Some(mut script) = self.script.lock().await.take() else {
            cancel.cancelled().await;
            return Ok(());
        };
        loop {
            tokio::select! {
                _ = cancel.cancelled() => return Ok(()),
                step = script.recv() => match step {
                    Some(Step::Say(text)) => {
                        let event = ConsoleEvent::message(
                            "console",
                            &self.current_user(),
                            &ConsoleMessage::text(text),
                            Utc::now(),
                        );
                        handle.dispatch(event).await?;
                    },
                    Some(Step::Quit) => return Ok(()),
                    None => {
                        cancel.cancelled().await;
                        return Ok(());
                    },
                },
            }
        }
    }

    async fn call(&self, call: FrontendCall) -> Result<()> {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(call);
        Ok(())
    }

    fn current_user(&self) -> ConsoleUser {
        ConsoleUser::new("u1", "Bob")
    }
}

// ── Helpers ──────────────────────────────────────────────────────────────────

fn service(fe: Arc<Scripted>, config: ConsoleAccountConfig, bus: &EventBus) -> ConsoleService {
    ConsoleService::new(fe, Arc::new(ConsoleProtocol::new().unwrap()), config)
        .with_event_sink(Arc::new(bus.clone()))
}

async fn next_event(rx: &mut broadcast::Receiver<ParsedEvent>) -> ParsedEvent {
    timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("timed out waiting for host event")
        .unwrap()
}

fn sel(s: &str) -> Selector {
    s.parse().unwrap()
}

// ── Lifecycle ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn start_then_immediate_cleanup_is_bounded() {
    let bus = EventBus::default();
    let (fe, _script) = Scripted::new(Behaviour::default());
    let svc = service(fe, ConsoleAccountConfig::default(), &bus);

    svc.prepare().unwrap();
    svc.block().await.unwrap();
    assert_eq!(svc.state(), LifecycleState::Blocking);
    assert!(svc.is_available());

    timeout(Duration::from_secs(2), svc.cleanup())
        .await
        .expect("cleanup must not hang")
        .unwrap();
    assert_eq!(svc.state(), LifecycleState::Stopped);
    assert!(!svc.is_available());

    // second cleanup is a no-op
    svc.cleanup().await.unwrap();
    timeout(Duration::from_secs(1), svc.exited()).await.unwrap();
}

#[tokio::test]
async fn stuck_task_is_aborted_after_shutdown_timeout() {
    let bus = EventBus::default();
    let (fe, _script) = Scripted::new(Behaviour {
        ignore_cancel: true,
        ..Default::default()
    });
    let config = ConsoleAccountConfig {
        shutdown_timeout_secs: 0,
        ..Default::default()
    };
    let svc = service(fe, config, &bus);

    svc.prepare().unwrap();
    svc.block().await.unwrap();
    timeout(Duration::from_secs(2), svc.cleanup())
        .await
        .expect("abort path must not hang")
        .unwrap();
    assert!(!svc.is_available());
    assert_eq!(svc.state(), LifecycleState::Stopped);
}

#[tokio::test]
async fn mount_failure_aborts_startup() {
    let bus = EventBus::default();
    let (fe, _script) = Scripted::new(Behaviour {
        fail_mount: true,
        ..Default::default()
    });
    let svc = service(fe, ConsoleAccountConfig::default(), &bus);

    svc.prepare().unwrap();
    let err = svc.block().await.unwrap_err();
    assert!(matches!(err, Error::Startup { ref message } if message.contains("no terminal")));
    assert!(!svc.is_available());
    svc.cleanup().await.unwrap();
}

#[tokio::test]
async fn operator_exit_marks_account_unavailable() {
    let bus = EventBus::default();
    let mut rx = bus.subscribe();
    let (fe, script) = Scripted::new(Behaviour::default());
    let svc = service(Arc::clone(&fe), ConsoleAccountConfig::default(), &bus);

    svc.prepare().unwrap();
    svc.block().await.unwrap();
    let up = next_event(&mut rx).await;
    assert_eq!(up.event, HostEvent::AccountAvailable {
        account: sel("land(console).account(user)"),
    });

    script.send(Step::Quit).unwrap();
    let down = next_event(&mut rx).await;
    assert_eq!(down.event, HostEvent::AccountUnavailable {
        account: sel("land(console).account(user)"),
    });
    timeout(Duration::from_secs(1), svc.exited()).await.unwrap();
    assert!(!svc.is_available());

    assert!(matches!(
        svc.send_message(ConsoleMessage::text("late"), ConsoleUser::robot())
            .await,
        Err(Error::ServiceUnavailable)
    ));
    assert!(matches!(
        svc.call("bell", json!(null)).await,
        Err(Error::ServiceUnavailable)
    ));
    assert!(fe.calls().is_empty());

    svc.cleanup().await.unwrap();
    // no duplicate unavailability notification
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn panicking_front_end_marks_account_unavailable() {
    let bus = EventBus::default();
    let mut rx = bus.subscribe();
    let (fe, _script) = Scripted::new(Behaviour {
        panic_in_run: true,
        ..Default::default()
    });
    let svc = service(Arc::clone(&fe), ConsoleAccountConfig::default(), &bus);

    svc.prepare().unwrap();
    svc.block().await.unwrap();
    assert!(matches!(
        next_event(&mut rx).await.event,
        HostEvent::AccountAvailable { .. }
    ));
    assert_eq!(next_event(&mut rx).await.event, HostEvent::AccountUnavailable {
        account: sel("land(console).account(user)"),
    });
    timeout(Duration::from_secs(1), svc.exited())
        .await
        .expect("exited must resolve after a panic");
    assert!(!svc.is_available());
    assert!(matches!(
        svc.send_message(ConsoleMessage::text("late"), ConsoleUser::robot())
            .await,
        Err(Error::ServiceUnavailable)
    ));
    assert!(matches!(svc.bell().await, Err(Error::ServiceUnavailable)));

    svc.cleanup().await.unwrap();
    assert_eq!(svc.state(), LifecycleState::Stopped);
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn oversized_cache_ttl_keeps_the_console_running() {
    let bus = EventBus::default();
    let mut rx = bus.subscribe();
    let (fe, script) = Scripted::new(Behaviour::default());
    let config: ConsoleAccountConfig =
        serde_json::from_value(json!({"message_cache_ttl_secs": u64::MAX})).unwrap();
    let svc = service(fe, config, &bus);

    svc.prepare().unwrap();
    svc.block().await.unwrap();
    next_event(&mut rx).await;

    script.send(Step::Say("hello")).unwrap();
    let HostEvent::MessageReceived { message } = next_event(&mut rx).await.event else {
        panic!("expected message event");
    };
    assert!(svc.is_available());
    assert_eq!(svc.state(), LifecycleState::Blocking);
    let cached = svc
        .cache()
        .unwrap()
        .get(&format!("_console_context.message.{}", message.id))
        .await;
    assert_eq!(cached, Some(message));

    svc.cleanup().await.unwrap();
}

#[tokio::test]
async fn call_surface_decodes_apis() {
    let bus = EventBus::default();
    let (fe, _script) = Scripted::new(Behaviour::default());
    let svc = service(Arc::clone(&fe), ConsoleAccountConfig::default(), &bus);
    svc.prepare().unwrap();
    svc.block().await.unwrap();

    svc.call(
        "send_msg",
        json!({"message": [{"type": "Text", "text": "hi"}], "info": {"id": "console"}}),
    )
    .await
    .unwrap();
    svc.call("bell", json!(null)).await.unwrap();
    assert!(matches!(
        svc.call("screenshot", json!({})).await,
        Err(Error::UnknownApi { ref api }) if api == "screenshot"
    ));
    assert!(matches!(
        svc.call("send_msg", json!({"message": [{"type": "Video"}], "info": {"id": "c"}}))
            .await,
        Err(Error::Validation { .. })
    ));

    assert_eq!(fe.calls(), vec![
        FrontendCall::SendMessage {
            message: ConsoleMessage::text("hi"),
            info: ConsoleUser::new("console", ""),
        },
        FrontendCall::Bell,
    ]);
    svc.cleanup().await.unwrap();
}

// ── Plugin flow ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn plugin_round_trip() {
    let bus = EventBus::default();
    let mut rx = bus.subscribe();
    let cache = Arc::new(MemoryMessageCache::new());
    let (fe, script) = Scripted::new(Behaviour::default());
    let mut plugin = ConsolePlugin::new(fe.clone())
        .unwrap()
        .with_event_sink(Arc::new(bus.clone()))
        .with_message_cache(cache.clone());

    plugin.start_account("user", json!({})).await.unwrap();
    assert!(matches!(
        next_event(&mut rx).await.event,
        HostEvent::AccountAvailable { .. }
    ));

    // inbound
    script.send(Step::Say("hi")).unwrap();
    let parsed = next_event(&mut rx).await;
    let HostEvent::MessageReceived { message } = parsed.event else {
        panic!("expected message event");
    };
    assert_eq!(parsed.context.scene, sel("land(console).console(u1)"));
    assert_eq!(message.content, MessageChain::from("hi"));
    let cached = cache
        .get(&format!("_console_context.message.{}", message.id))
        .await
        .unwrap();
    assert_eq!(cached, message);

    // outbound reply to the same scene
    let outbound = plugin.outbound().unwrap();
    let sent = outbound
        .send_message(
            "user",
            &sel("console(u1)"),
            &MessageChain::from("Hello, portico!"),
            Some(&message.to_selector()),
        )
        .await
        .unwrap();
    assert!(sent.follows(&sel("land(console).console(u1)")));
    let sent_id = sent.get("message").unwrap();
    let cached = cache
        .get(&format!("_console_context.message.{sent_id}"))
        .await
        .unwrap();
    assert_eq!(cached.sender, sel("land(console).account(user)"));

    outbound
        .trigger_activity("user", &sel("console(u1)"), "bell")
        .await
        .unwrap();
    let err = outbound
        .trigger_activity("user", &sel("console(u1)"), "shake")
        .await
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<Error>(),
        Some(Error::UnknownApi { .. })
    ));
    let err = outbound
        .send_message("user", &sel("group(g)"), &MessageChain::from("x"), None)
        .await
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<Error>(),
        Some(Error::UnsupportedTarget { .. })
    ));

    assert_eq!(fe.calls(), vec![
        FrontendCall::SendMessage {
            message: ConsoleMessage::text("Hello, portico!"),
            info: ConsoleUser::robot(),
        },
        FrontendCall::Bell,
    ]);

    plugin.stop_account("user").await.unwrap();
    assert!(matches!(
        next_event(&mut rx).await.event,
        HostEvent::AccountUnavailable { .. }
    ));
}
