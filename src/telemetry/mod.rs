//! Turn tracing with explicit span handles.
//!
//! Pipeline stages receive the parent [`Span`] and open children from it, so
//! the span tree never depends on an ambient "current span". Backends:
//! - `OtlpTraceSink`: OpenTelemetry batch export over OTLP/HTTP
//! - `NoopTraceSink`: discards everything
//! - `RecordingTraceSink`: keeps spans in memory for inspection

mod otlp;
mod recording;

pub use otlp::OtlpTraceSink;
pub use recording::{RecordedSpan, RecordingTraceSink};

use std::sync::Arc;

use crate::core::config::TelemetrySettings;

/// Backend half of a span. Implementations use interior mutability.
pub trait SpanBackend: Send + Sync {
    fn set_attribute(&self, key: &str, value: String);

    fn record_error(&self, message: &str) {
        self.set_attribute("error", message.to_string());
    }

    fn child(&self, name: &'static str) -> Box<dyn SpanBackend>;

    fn end(&self);
}

/// Produces root spans, one per turn.
pub trait TraceSink: Send + Sync {
    fn start_root(&self, name: &'static str) -> Span;

    /// Flushes buffered spans; called once at shutdown.
    fn shutdown(&self) {}
}

/// A live span. Ends when dropped.
pub struct Span {
    inner: Box<dyn SpanBackend>,
}

impl Span {
    pub fn new(inner: Box<dyn SpanBackend>) -> Self {
        Self { inner }
    }

    pub fn set_attribute(&self, key: &str, value: impl Into<String>) {
        self.inner.set_attribute(key, value.into());
    }

    pub fn record_error(&self, message: &str) {
        self.inner.record_error(message);
    }

    pub fn child(&self, name: &'static str) -> Span {
        Span::new(self.inner.child(name))
    }
}

impl Drop for Span {
    fn drop(&mut self) {
        self.inner.end();
    }
}

pub struct NoopTraceSink;

struct NoopSpan;

impl SpanBackend for NoopSpan {
    fn set_attribute(&self, _key: &str, _value: String) {}

    fn child(&self, _name: &'static str) -> Box<dyn SpanBackend> {
        Box::new(NoopSpan)
    }

    fn end(&self) {}
}

impl TraceSink for NoopTraceSink {
    fn start_root(&self, _name: &'static str) -> Span {
        Span::new(Box::new(NoopSpan))
    }
}

/// Builds the process-wide sink. Exporter failures degrade to a no-op sink
/// rather than aborting startup.
pub fn build_trace_sink(settings: &TelemetrySettings) -> Arc<dyn TraceSink> {
    if settings.collector_endpoint.trim().is_empty() {
        tracing::info!("Trace collector endpoint not set; span export disabled");
        return Arc::new(NoopTraceSink);
    }

    match OtlpTraceSink::new(settings) {
        Ok(sink) => {
            tracing::info!("Exporting spans to {}", settings.collector_endpoint);
            Arc::new(sink)
        }
        Err(err) => {
            tracing::warn!("Failed to initialize span exporter: {}", err);
            Arc::new(NoopTraceSink)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_endpoint_yields_noop_sink() {
        let settings = TelemetrySettings {
            collector_endpoint: String::new(),
            ..TelemetrySettings::default()
        };
        let sink = build_trace_sink(&settings);
        let root = sink.start_root("teams_turn");
        root.set_attribute("input.value", "hello");
        let _child = root.child("azure_search");
    }
}
