//! Diagnostics sinks for parse and build messages.
//!
//! The pipeline only produces [`ParseMessage`]s; how they are displayed is
//! the host's decision.

use log::{info, warn};

use crate::setup::{ParseMessage, Severity};

pub trait DiagnosticsSink {
    fn report(&mut self, message: &ParseMessage);
}

/// Routes messages to the `log` facade.
#[derive(Debug, Default)]
pub struct LogSink;

impl DiagnosticsSink for LogSink {
    fn report(&mut self, message: &ParseMessage) {
        match message.severity {
            Severity::Error => warn!("{message}"),
            Severity::Warning => info!("{message}"),
        }
    }
}

/// Collects messages; used by tests and editor panes.
#[derive(Debug, Default)]
pub struct CollectSink {
    pub messages: Vec<ParseMessage>,
}

impl DiagnosticsSink for CollectSink {
    fn report(&mut self, message: &ParseMessage) {
        self.messages.push(message.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collect_sink_gathers_messages() {
        let mut sink = CollectSink::default();

        sink.report(&ParseMessage::warning("a", "b"));
        sink.report(&ParseMessage::error_with_fields("c", "d"));

        assert_eq!(sink.messages.len(), 2);
        assert_eq!(sink.messages[0].severity, Severity::Warning);
        assert_eq!(sink.messages[1].severity, Severity::Error);
    }
}
