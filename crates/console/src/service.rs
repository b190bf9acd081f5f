//! Lifecycle gateway owning the console's foreground task.
//!
//! Stages run strictly forward: `Preparing → Blocking → CleaningUp →
//! Stopped`. `block` spawns the front-end loop and returns immediately;
//! `cleanup` signals it to exit and does not return while it is still
//! running.

use std::sync::{Arc, Mutex, MutexGuard};

use {
    portico_channels::{ChannelEventSink, MemoryMessageCache, MessageCache},
    serde::Serialize,
    serde_json::Value,
    tokio::{
        sync::watch,
        task::{AbortHandle, JoinHandle},
    },
    tokio_util::sync::CancellationToken,
    tracing::{debug, error, info, warn},
};

use crate::{
    account::{AccountStatus, ConsoleAccount},
    config::ConsoleAccountConfig,
    error::{Error, Result},
    frontend::{ConsoleUser, Frontend, FrontendCall, FrontendHandle},
    logs::LogSink,
    message::ConsoleMessage,
    protocol::ConsoleProtocol,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    Preparing,
    Blocking,
    CleaningUp,
    Stopped,
}

impl LifecycleState {
    /// Move forward to `next`. Staying put is a no-op; going back fails.
    pub fn advance(&mut self, next: Self) -> Result<()> {
        if next < *self {
            return Err(Error::InvalidTransition {
                from: *self,
                to: next,
            });
        }
        *self = next;
        Ok(())
    }
}

/// Availability bookkeeping shared with the foreground task.
#[derive(Clone)]
struct Availability {
    tx: Arc<watch::Sender<bool>>,
    status: Arc<Mutex<AccountStatus>>,
    account: Arc<ConsoleAccount>,
    sink: Option<Arc<dyn ChannelEventSink>>,
}

impl Availability {
    async fn set(&self, available: bool) {
        let change = self
            .status
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .transition(self.account.route(), available);
        self.tx.send_replace(change.available);

        let Some(sink) = &self.sink else {
            return;
        };
        for event in change.notifications {
            sink.post(event, self.account.self_context()).await;
        }
    }
}

/// Aborts the front-end loop when its supervising task is dropped or aborted.
struct AbortOnDrop(AbortHandle);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}

pub struct ConsoleService {
    frontend: Arc<dyn Frontend>,
    protocol: Arc<ConsoleProtocol>,
    account: Arc<ConsoleAccount>,
    config: ConsoleAccountConfig,
    state: Mutex<LifecycleState>,
    task: tokio::sync::Mutex<Option<JoinHandle<()>>>,
    cancel: CancellationToken,
    exited: CancellationToken,
    available_tx: Arc<watch::Sender<bool>>,
    status: Arc<Mutex<AccountStatus>>,
    event_sink: Option<Arc<dyn ChannelEventSink>>,
    cache: Mutex<Option<Arc<dyn MessageCache>>>,
    logs: LogSink,
}

impl ConsoleService {
    pub fn new(
        frontend: Arc<dyn Frontend>,
        protocol: Arc<ConsoleProtocol>,
        config: ConsoleAccountConfig,
    ) -> Self {
        let (available_tx, available_rx) = watch::channel(false);
        let account = Arc::new(ConsoleAccount::new(Arc::clone(&protocol), available_rx));
        Self {
            frontend,
            protocol,
            account,
            config,
            state: Mutex::new(LifecycleState::Preparing),
            task: tokio::sync::Mutex::new(None),
            cancel: CancellationToken::new(),
            exited: CancellationToken::new(),
            available_tx: Arc::new(available_tx),
            status: Arc::new(Mutex::new(AccountStatus::default())),
            event_sink: None,
            cache: Mutex::new(None),
            logs: LogSink::default(),
        }
    }

    pub fn with_event_sink(mut self, sink: Arc<dyn ChannelEventSink>) -> Self {
        self.event_sink = Some(sink);
        self
    }

    pub fn with_message_cache(self, cache: Arc<dyn MessageCache>) -> Self {
        *self.cache.lock().unwrap_or_else(|e| e.into_inner()) = Some(cache);
        self
    }

    pub fn with_log_sink(mut self, logs: LogSink) -> Self {
        self.logs = logs;
        self
    }

    pub fn state(&self) -> LifecycleState {
        *self.lock_state()
    }

    pub fn account(&self) -> &Arc<ConsoleAccount> {
        &self.account
    }

    pub fn protocol(&self) -> &Arc<ConsoleProtocol> {
        &self.protocol
    }

    pub fn config(&self) -> &ConsoleAccountConfig {
        &self.config
    }

    pub fn log_sink(&self) -> &LogSink {
        &self.logs
    }

    pub fn cache(&self) -> Option<Arc<dyn MessageCache>> {
        self.cache.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Operator currently at the console.
    pub fn current_user(&self) -> ConsoleUser {
        self.frontend.current_user()
    }

    pub fn is_available(&self) -> bool {
        self.account.available()
    }

    /// Resolves once the foreground task has ended, by itself or through
    /// [`cleanup`](Self::cleanup).
    pub async fn exited(&self) {
        self.exited.cancelled().await;
    }

    /// Preparing: attach the message cache.
    pub fn prepare(&self) -> Result<()> {
        self.lock_state().advance(LifecycleState::Preparing)?;
        let mut cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
        if cache.is_none() {
            debug!("attaching in-memory message cache");
            *cache = Some(Arc::new(MemoryMessageCache::new()));
        }
        Ok(())
    }

    /// Blocking: mount the front-end and spawn its loop. Returns as soon as
    /// the task is running.
    pub async fn block(&self) -> Result<()> {
        let mut task = self.task.lock().await;
        let current = self.state();
        if current != LifecycleState::Preparing {
            return Err(Error::InvalidTransition {
                from: current,
                to: LifecycleState::Blocking,
            });
        }

        self.frontend.mount().await.map_err(|e| match e {
            Error::Startup { .. } => e,
            other => Error::startup(other),
        })?;
        self.lock_state().advance(LifecycleState::Blocking)?;

        let availability = self.availability();
        availability.set(true).await;

        let handle = FrontendHandle::new(
            Arc::clone(&self.protocol),
            Arc::clone(&self.account),
            self.event_sink.clone(),
            self.cache(),
            self.config.message_cache_ttl(),
            self.logs.clone(),
            self.config.strict_events,
        );
        let frontend = Arc::clone(&self.frontend);
        let cancel = self.cancel.clone();
        let exited = self.exited.clone();
        *task = Some(tokio::spawn(async move {
            // separate task: a panicking loop still reaches the bookkeeping below
            let run = tokio::spawn(async move { frontend.run(handle, cancel).await });
            let _abort = AbortOnDrop(run.abort_handle());
            match run.await {
                Ok(Ok(())) => info!("console task exited"),
                Ok(Err(e)) => error!(error = %e, "console task failed"),
                Err(e) if e.is_panic() => error!(error = %e, "console task panicked"),
                Err(e) => warn!(error = %e, "console task cancelled"),
            }
            availability.set(false).await;
            exited.cancel();
        }));

        info!(account = %self.account.route(), "console service started");
        Ok(())
    }

    /// CleaningUp → Stopped: signal the task, wait for it (aborting after
    /// the configured timeout). Idempotent, and fine to call before `block`.
    pub async fn cleanup(&self) -> Result<()> {
        let mut task = self.task.lock().await;
        {
            let mut state = self.lock_state();
            if *state == LifecycleState::Stopped {
                return Ok(());
            }
            state.advance(LifecycleState::CleaningUp)?;
        }

        self.cancel.cancel();
        if let Some(mut handle) = task.take() {
            let timeout = self.config.shutdown_timeout();
            match tokio::time::timeout(timeout, &mut handle).await {
                Ok(Ok(())) => debug!("console task joined"),
                Ok(Err(e)) => warn!(error = %e, "console task ended abnormally"),
                Err(_) => {
                    warn!(
                        timeout_secs = timeout.as_secs(),
                        "console task did not exit in time, aborting"
                    );
                    handle.abort();
                    let _ = handle.await;
                },
            }
        }

        self.availability().set(false).await;
        self.exited.cancel();
        self.lock_state().advance(LifecycleState::Stopped)?;
        info!(account = %self.account.route(), "console service stopped");
        Ok(())
    }

    /// Untyped call surface: `send_msg` or `bell`.
    pub async fn call(&self, api: &str, payload: Value) -> Result<Value> {
        self.ensure_available()?;
        let call = FrontendCall::from_api(api, payload)?;
        self.frontend.call(call).await?;
        Ok(Value::Null)
    }

    pub async fn send_message(&self, message: ConsoleMessage, info: ConsoleUser) -> Result<()> {
        self.ensure_available()?;
        self.frontend
            .call(FrontendCall::SendMessage { message, info })
            .await
    }

    pub async fn bell(&self) -> Result<()> {
        self.ensure_available()?;
        self.frontend.call(FrontendCall::Bell).await
    }

    fn ensure_available(&self) -> Result<()> {
        if self.is_available() {
            Ok(())
        } else {
            Err(Error::ServiceUnavailable)
        }
    }

    fn availability(&self) -> Availability {
        Availability {
            tx: Arc::clone(&self.available_tx),
            status: Arc::clone(&self.status),
            account: Arc::clone(&self.account),
            sink: self.event_sink.clone(),
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, LifecycleState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Drop for ConsoleService {
    fn drop(&mut self) {
        // Best-effort: let a still-running task notice the service is gone.
        self.cancel.cancel();
    }
}
