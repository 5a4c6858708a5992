use std::collections::HashMap;

use opentelemetry::trace::{Status, TraceContextExt, Tracer as _, TracerProvider};
use opentelemetry::{Context, KeyValue};
use opentelemetry_otlp::{WithExportConfig, WithHttpConfig};
use opentelemetry_sdk::trace::SdkTracerProvider;
use opentelemetry_sdk::Resource;
use thiserror::Error;

use super::{Span, SpanBackend, TraceSink};
use crate::core::config::TelemetrySettings;

type Tracer = <SdkTracerProvider as TracerProvider>::Tracer;

#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("failed to build OTLP exporter: {0}")]
    Exporter(String),
}

/// OpenTelemetry sink exporting batched spans over OTLP/HTTP (protobuf).
pub struct OtlpTraceSink {
    provider: SdkTracerProvider,
    tracer: Tracer,
}

impl OtlpTraceSink {
    pub fn new(settings: &TelemetrySettings) -> Result<Self, TelemetryError> {
        let exporter = opentelemetry_otlp::SpanExporter::builder()
            .with_http()
            .with_endpoint(settings.collector_endpoint.clone())
            .with_headers(collector_headers(settings))
            .build()
            .map_err(|e| TelemetryError::Exporter(e.to_string()))?;

        let provider = SdkTracerProvider::builder()
            .with_batch_exporter(exporter)
            .with_resource(
                Resource::builder()
                    .with_service_name(settings.service_name.clone())
                    .build(),
            )
            .build();
        let tracer = provider.tracer("ragbot");

        Ok(Self { provider, tracer })
    }
}

/// Arize-style auth headers, sent only when an API key is configured.
fn collector_headers(settings: &TelemetrySettings) -> HashMap<String, String> {
    let mut headers = HashMap::new();
    if !settings.api_key.is_empty() {
        headers.insert("api_key".to_string(), settings.api_key.clone());
        headers.insert("space_id".to_string(), settings.space_id.clone());
    }
    headers
}

struct OtelSpan {
    cx: Context,
    tracer: Tracer,
}

impl SpanBackend for OtelSpan {
    fn set_attribute(&self, key: &str, value: String) {
        self.cx
            .span()
            .set_attribute(KeyValue::new(key.to_string(), value));
    }

    fn record_error(&self, message: &str) {
        let span = self.cx.span();
        span.set_attribute(KeyValue::new("error", message.to_string()));
        span.set_status(Status::error(message.to_string()));
    }

    fn child(&self, name: &'static str) -> Box<dyn SpanBackend> {
        let span = self.tracer.start_with_context(name, &self.cx);
        Box::new(OtelSpan {
            cx: self.cx.with_span(span),
            tracer: self.tracer.clone(),
        })
    }

    fn end(&self) {
        self.cx.span().end();
    }
}

impl TraceSink for OtlpTraceSink {
    fn start_root(&self, name: &'static str) -> Span {
        // an empty parent context makes this a new trace regardless of caller
        let parent = Context::new();
        let span = self.tracer.start_with_context(name, &parent);
        Span::new(Box::new(OtelSpan {
            cx: parent.with_span(span),
            tracer: self.tracer.clone(),
        }))
    }

    fn shutdown(&self) {
        if let Err(err) = self.provider.shutdown() {
            tracing::warn!("Failed to flush spans on shutdown: {}", err);
        }
    }
}
