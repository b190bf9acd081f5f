//! Log lines the front-end can show in its scrollback.
//!
//! The console core never installs a logger. Whoever owns logging (the CLI
//! does it with a tracing layer) pushes [`LogLine`]s into the sink, and the
//! front-end subscribes while it is attached.

use std::fmt;

use {serde::Serialize, tokio::sync::broadcast};

const DEFAULT_LOG_CAPACITY: usize = 512;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogLine {
    pub level: String,
    pub target: String,
    pub message: String,
}

impl fmt::Display for LogLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:>5} {}: {}", self.level, self.target, self.message)
    }
}

#[derive(Clone)]
pub struct LogSink {
    tx: broadcast::Sender<LogLine>,
}

impl LogSink {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Best-effort: dropped when nobody is attached.
    pub fn push(&self, line: LogLine) {
        let _ = self.tx.send(line);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LogLine> {
        self.tx.subscribe()
    }

    pub fn is_attached(&self) -> bool {
        self.tx.receiver_count() > 0
    }
}

impl Default for LogSink {
    fn default() -> Self {
        Self::new(DEFAULT_LOG_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(message: &str) -> LogLine {
        LogLine {
            level: "INFO".into(),
            target: "portico".into(),
            message: message.into(),
        }
    }

    #[tokio::test]
    async fn attached_receivers_get_lines() {
        let sink = LogSink::default();
        assert!(!sink.is_attached());
        sink.push(line("dropped"));

        let mut rx = sink.subscribe();
        assert!(sink.is_attached());
        sink.push(line("kept"));
        assert_eq!(rx.recv().await.unwrap().message, "kept");
    }

    #[test]
    fn display_pads_level() {
        assert_eq!(line("hi").to_string(), " INFO portico: hi");
    }
}
