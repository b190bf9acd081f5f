//! Plain line-oriented front-end: reads operator lines, prints the transcript
//! and attached log lines.

use std::io::BufRead;

use {
    async_trait::async_trait,
    chrono::Utc,
    tokio::{
        io::{self, AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt},
        sync::{Mutex, broadcast::error::RecvError, mpsc},
    },
    tokio_util::sync::CancellationToken,
    tracing::{debug, warn},
};

use crate::{
    config::ConsoleAccountConfig,
    error::{Error, Result},
    events::ConsoleEvent,
    frontend::{ConsoleUser, Frontend, FrontendCall, FrontendHandle},
    message::ConsoleMessage,
};

const INPUT_BUFFER: usize = 16;

type Output = Box<dyn AsyncWrite + Unpin + Send>;

enum Input {
    /// Process stdin, read on a dedicated thread so a pending read never
    /// holds up runtime shutdown.
    Stdin,
    Reader(Box<dyn AsyncBufRead + Unpin + Send>),
}

impl Input {
    /// Start feeding lines into a channel that closes at end of input.
    fn into_lines(self) -> Result<mpsc::Receiver<io::Result<String>>> {
        let (tx, rx) = mpsc::channel(INPUT_BUFFER);
        match self {
            Self::Stdin => {
                std::thread::Builder::new()
                    .name("console-stdin".into())
                    .spawn(move || {
                        for line in std::io::stdin().lock().lines() {
                            let failed = line.is_err();
                            if tx.blocking_send(line).is_err() || failed {
                                break;
                            }
                        }
                        debug!("console stdin reader finished");
                    })?;
            },
            Self::Reader(reader) => {
                tokio::spawn(async move {
                    let mut lines = reader.lines();
                    while let Some(line) = lines.next_line().await.transpose() {
                        let failed = line.is_err();
                        if tx.send(line).await.is_err() || failed {
                            break;
                        }
                    }
                });
            },
        }
        Ok(rx)
    }
}

pub struct LineFrontend {
    title: String,
    subtitle: String,
    operator: ConsoleUser,
    input: Mutex<Option<Input>>,
    output: Mutex<Output>,
}

impl LineFrontend {
    /// Attach to the process' stdin/stdout.
    pub fn new(config: &ConsoleAccountConfig) -> Self {
        Self::build(config, Input::Stdin, Box::new(io::stdout()))
    }

    pub fn with_io(
        config: &ConsoleAccountConfig,
        input: impl AsyncBufRead + Unpin + Send + 'static,
        output: impl AsyncWrite + Unpin + Send + 'static,
    ) -> Self {
        Self::build(config, Input::Reader(Box::new(input)), Box::new(output))
    }

    fn build(config: &ConsoleAccountConfig, input: Input, output: Output) -> Self {
        Self {
            title: config.title.clone(),
            subtitle: config.subtitle.clone(),
            operator: config.operator.clone(),
            input: Mutex::new(Some(input)),
            output: Mutex::new(output),
        }
    }

    async fn write_line(&self, line: &str) -> Result<()> {
        let mut out = self.output.lock().await;
        out.write_all(line.as_bytes()).await?;
        out.write_all(b"\n").await?;
        out.flush().await?;
        Ok(())
    }

    async fn submit(&self, handle: &FrontendHandle, text: &str) -> Result<()> {
        let event = ConsoleEvent::message(
            ConsoleUser::robot().id,
            &self.operator,
            &ConsoleMessage::text(text),
            Utc::now(),
        );
        if let Err(e) = handle.dispatch(event).await {
            warn!(error = %e, "failed to dispatch console input");
            self.write_line(&format!("error: {e}")).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl Frontend for LineFrontend {
    async fn mount(&self) -> Result<()> {
        self.write_line(&self.title).await?;
        self.write_line(&self.subtitle).await
    }

    async fn run(&self, handle: FrontendHandle, cancel: CancellationToken) -> Result<()> {
        let input = self
            .input
            .lock()
            .await
            .take()
            .ok_or_else(|| Error::startup("console input already consumed"))?;
        let mut lines = input.into_lines()?;
        let mut logs = handle.logs();

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                line = lines.recv() => match line.transpose()? {
                    None => break,
                    Some(line) => match line.trim() {
                        "" => {},
                        "/quit" | "/exit" => break,
                        text => self.submit(&handle, text).await?,
                    },
                },
                log = logs.recv() => match log {
                    Ok(line) => self.write_line(&line.to_string()).await?,
                    Err(RecvError::Lagged(skipped)) => {
                        self.write_line(&format!("... {skipped} log lines skipped")).await?;
                    },
                    // the sender lives in `handle`
                    Err(RecvError::Closed) => {},
                },
            }
        }

        self.write_line("Console exit.").await
    }

    async fn call(&self, call: FrontendCall) -> Result<()> {
        match call {
            FrontendCall::SendMessage { message, info } => {
                let name = if info.nickname.is_empty() {
                    info.id
                } else {
                    info.nickname
                };
                self.write_line(&format!("{name}: {message}")).await
            },
            FrontendCall::Bell => {
                let mut out = self.output.lock().await;
                out.write_all(b"\x07").await?;
                out.flush().await?;
                Ok(())
            },
        }
    }

    fn current_user(&self) -> ConsoleUser {
        self.operator.clone()
    }
}
