//! Tracing subscriber and OpenTelemetry wiring.
//!
//! `RUST_LOG` takes precedence; otherwise the level is `info`, or `debug`
//! with `--debug`. Lines go to stdout, or to the log file when one is set.
//! In debug mode with a log file, lines go to both.

use std::fs::{File, OpenOptions};
use std::path::Path;
use std::sync::Mutex;

use anyhow::Context;
use clap::ValueEnum;
use opentelemetry::trace::TracerProvider as _;
use opentelemetry::KeyValue;
use opentelemetry_sdk::trace::TracerProvider as SdkTracerProvider;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::{runtime, Resource};
use serde::Deserialize;
use tracing_subscriber::fmt::writer::{BoxMakeWriter, MakeWriterExt};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::config::Settings;

const SERVICE_NAME: &str = "nomaster";

// Dependencies are noisy at debug; keep them at info unless RUST_LOG says otherwise.
const DEBUG_DIRECTIVES: &str = "debug,hyper=info,hyper_util=info,h2=info,tower=info,tonic=info,reqwest=info";

/// Log line format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Keeps the OTLP pipeline alive. Dropping it flushes pending spans.
pub struct ObservabilityGuard {
    tracer_provider: Option<SdkTracerProvider>,
}

impl Drop for ObservabilityGuard {
    fn drop(&mut self) {
        if let Some(provider) = self.tracer_provider.take() {
            if let Err(err) = provider.shutdown() {
                eprintln!("nomaster: failed to flush trace spans: {err}");
            }
        }
    }
}

/// Installs the global subscriber. Must be called from within the runtime.
pub fn init(settings: &Settings) -> anyhow::Result<ObservabilityGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if settings.debug { DEBUG_DIRECTIVES } else { "info" })
    });
    let writer = make_writer(settings.logfile.as_deref(), settings.debug)?;
    let ansi = settings.logfile.is_none();

    let tracer_provider = settings
        .otlp_endpoint
        .as_deref()
        .map(otlp_tracer_provider)
        .transpose()?;
    let otel_layer = tracer_provider
        .as_ref()
        .map(|provider| tracing_opentelemetry::layer().with_tracer(provider.tracer(SERVICE_NAME)));

    let registry = tracing_subscriber::registry().with(filter).with(otel_layer);
    let installed = match settings.log_format {
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_writer(writer),
            )
            .try_init(),
        LogFormat::Text => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_ansi(ansi)
                    .with_writer(writer),
            )
            .try_init(),
    };
    installed.context("failed to install tracing subscriber")?;

    Ok(ObservabilityGuard { tracer_provider })
}

fn make_writer(logfile: Option<&Path>, debug: bool) -> anyhow::Result<BoxMakeWriter> {
    let Some(path) = logfile else {
        return Ok(BoxMakeWriter::new(std::io::stdout));
    };
    let file = open_log_file(path)
        .with_context(|| format!("failed to open log file {}", path.display()))?;
    if debug {
        Ok(BoxMakeWriter::new(Mutex::new(file).and(std::io::stdout)))
    } else {
        Ok(BoxMakeWriter::new(Mutex::new(file)))
    }
}

/// Opens `path` for appending, creating it with mode 0640 on unix.
fn open_log_file(path: &Path) -> std::io::Result<File> {
    let mut options = OpenOptions::new();
    options.create(true).append(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o640);
    }
    options.open(path)
}

fn otlp_tracer_provider(endpoint: &str) -> anyhow::Result<SdkTracerProvider> {
    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint)
        .build()
        .with_context(|| format!("failed to build OTLP exporter for {endpoint}"))?;

    Ok(SdkTracerProvider::builder()
        .with_batch_exporter(exporter, runtime::Tokio)
        .with_resource(Resource::new(vec![KeyValue::new(
            "service.name",
            SERVICE_NAME,
        )]))
        .build())
}
