//! Tracing layer that mirrors log events into the console scrollback.

use {
    portico_console::{LogLine, LogSink},
    tracing::field::{Field, Visit},
    tracing_subscriber::{Layer, layer::Context},
};

// ── Visitor (extracts fields from tracing events) ───────────────────────────

#[derive(Default)]
struct FieldVisitor {
    message: String,
    fields: Vec<String>,
}

impl FieldVisitor {
    fn render(self) -> String {
        if self.fields.is_empty() {
            self.message
        } else {
            format!("{} {}", self.message, self.fields.join(" "))
        }
    }
}

impl Visit for FieldVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{value:?}");
        } else {
            self.fields.push(format!("{}={value:?}", field.name()));
        }
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = value.into();
        } else {
            self.fields.push(format!("{}={value}", field.name()));
        }
    }
}

// ── LogSinkLayer ────────────────────────────────────────────────────────────

pub struct LogSinkLayer {
    sink: LogSink,
}

impl LogSinkLayer {
    pub fn new(sink: LogSink) -> Self {
        Self { sink }
    }
}

impl<S: tracing::Subscriber> Layer<S> for LogSinkLayer {
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        if !self.sink.is_attached() {
            return;
        }
        let meta = event.metadata();
        let mut visitor = FieldVisitor::default();
        event.record(&mut visitor);

        self.sink.push(LogLine {
            level: meta.level().to_string(),
            target: meta.target().into(),
            message: visitor.render(),
        });
    }
}
