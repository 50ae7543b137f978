//! Tracing subscriber setup.
//!
//! Logs always go to stderr so stdout carries only the collected manifests.

use std::io::IsTerminal;

use anyhow::{Context, Result};
use opentelemetry::trace::TracerProvider as _;
use opentelemetry_sdk::{trace::SdkTracerProvider, Resource};
use tracing::Level;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Service name reported to OpenTelemetry unless `OTEL_SERVICE_NAME` is set.
const SERVICE_NAME: &str = "collect-manifests";

/// Flushes exported spans when dropped.
pub struct TelemetryGuard {
	tracer_provider: Option<SdkTracerProvider>,
}

impl Drop for TelemetryGuard {
	fn drop(&mut self) {
		if let Some(provider) = self.tracer_provider.take() {
			if let Err(e) = provider.shutdown() {
				eprintln!("failed to shut down tracer provider: {e}");
			}
		}
	}
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum LogFormat {
	/// Pretty when stderr is a terminal, JSON otherwise
	#[default]
	Auto,
	Pretty,
	Json,
}

impl LogFormat {
	fn use_json(self, stderr_is_terminal: bool) -> bool {
		match self {
			LogFormat::Auto => !stderr_is_terminal,
			LogFormat::Pretty => false,
			LogFormat::Json => true,
		}
	}
}

/// Build the level filter. An explicit level wins over `RUST_LOG`, which wins over `info`.
fn env_filter(log_level: Option<Level>) -> EnvFilter {
	match log_level {
		Some(level) => EnvFilter::new(level.as_str()),
		None => EnvFilter::builder()
			.with_default_directive(Level::INFO.into())
			.from_env_lossy(),
	}
}

/// Spans are exported only when an OTLP endpoint is configured.
fn otel_export_enabled() -> bool {
	std::env::var_os(opentelemetry_otlp::OTEL_EXPORTER_OTLP_ENDPOINT).is_some()
		|| std::env::var_os(opentelemetry_otlp::OTEL_EXPORTER_OTLP_TRACES_ENDPOINT).is_some()
}

/// Install the global subscriber.
pub fn init(log_level: Option<Level>, format: LogFormat) -> Result<TelemetryGuard> {
	let fmt_layer = if format.use_json(std::io::stderr().is_terminal()) {
		tracing_subscriber::fmt::layer()
			.with_writer(std::io::stderr)
			.json()
			.boxed()
	} else {
		tracing_subscriber::fmt::layer()
			.with_writer(std::io::stderr)
			.pretty()
			.boxed()
	};

	let registry = tracing_subscriber::registry()
		.with(env_filter(log_level))
		.with(fmt_layer);

	if !otel_export_enabled() {
		registry.init();
		return Ok(TelemetryGuard {
			tracer_provider: None,
		});
	}

	let tracer_provider = build_tracer_provider()?;
	let otel_layer = tracing_opentelemetry::layer()
		.with_error_records_to_exceptions(true)
		.with_tracer(tracer_provider.tracer(SERVICE_NAME));
	opentelemetry::global::set_tracer_provider(tracer_provider.clone());

	registry.with(otel_layer).init();

	Ok(TelemetryGuard {
		tracer_provider: Some(tracer_provider),
	})
}

fn build_tracer_provider() -> Result<SdkTracerProvider> {
	// The builder picks up OTEL_SERVICE_NAME and OTEL_RESOURCE_ATTRIBUTES on its own.
	let mut resource = Resource::builder();
	if std::env::var_os("OTEL_SERVICE_NAME").is_none() {
		resource = resource.with_service_name(SERVICE_NAME);
	}

	let protocol = std::env::var(opentelemetry_otlp::OTEL_EXPORTER_OTLP_PROTOCOL)
		.unwrap_or_else(|_| opentelemetry_otlp::OTEL_EXPORTER_OTLP_PROTOCOL_DEFAULT.to_string());
	let exporter = if protocol == "grpc" {
		opentelemetry_otlp::SpanExporter::builder()
			.with_tonic()
			.build()
	} else {
		opentelemetry_otlp::SpanExporter::builder()
			.with_http()
			.build()
	}
	.context("building OTLP span exporter")?;

	Ok(SdkTracerProvider::builder()
		.with_resource(resource.build())
		.with_batch_exporter(exporter)
		.build())
}

#[cfg(test)]
mod tests {
	use rstest::rstest;

	use super::*;

	#[rstest]
	#[case(LogFormat::Auto, true, false)]
	#[case(LogFormat::Auto, false, true)]
	#[case(LogFormat::Pretty, false, false)]
	#[case(LogFormat::Json, true, true)]
	fn test_use_json(#[case] format: LogFormat, #[case] terminal: bool, #[case] json: bool) {
		assert_eq!(format.use_json(terminal), json);
	}
}
