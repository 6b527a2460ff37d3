//! This serves as an unified logging config for the services of this workspace.
//! It outputs logs to stdout, either compact for humans or JSON for log shippers,
//! and optionally exports spans to an OTLP collector.
//!

use opentelemetry::sdk::trace::Tracer;
use opentelemetry_otlp::WithExportConfig;
use std::str::FromStr;
use tracing::subscriber::{self};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{EnvFilter, Layer};

const DEFAULT_FILTER: &str = "info";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(format!("Unknown log format {other}, use pretty or json")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TracingConfig {
    pub service_name: String,
    pub environment: String,
    pub log_format: LogFormat,
    /// gRPC endpoint of an OTLP collector, spans are only exported if set
    pub otlp_endpoint: Option<String>,
}

/// This is a guard that will shutdown the OpenTelemetry exporter on drop.
/// Keep this around in main to make sure it is dropped after the
/// program exits, so buffered spans get flushed.
#[derive(Debug)]
pub struct TraceShutdownGuard {
    tracer: Tracer,
}

impl Drop for TraceShutdownGuard {
    fn drop(&mut self) {
        if let Some(provider) = self.tracer.provider() {
            for export_res in provider.force_flush() {
                if let Err(err) = export_res {
                    println!(
                        "Failed to export traces during TraceShutdownGuard drop, please, look into it: {:?}",
                        err
                    );
                }
            }
        }
        println!("Tracer is shutting down because the handle was dropped, traces will no longer be exported!");
        opentelemetry::global::shutdown_tracer_provider();
    }
}

fn env_filter_or_default() -> EnvFilter {
    let env_filter = EnvFilter::try_from_env("RUST_LOG").unwrap_or_else(|e| {
        println!(
            "Missing or invalid RUST_LOG, defaulting to {DEFAULT_FILTER}. {:#?}",
            e
        );
        EnvFilter::builder()
            .parse(DEFAULT_FILTER)
            .unwrap_or_else(|_| panic!("{DEFAULT_FILTER} should work as filter"))
    });
    println!("Using env filter: {}", env_filter);
    env_filter
}

/// Uses RUST_LOG, see https://docs.rs/tracing-subscriber/latest/tracing_subscriber/filter/struct.EnvFilter.html
/// on how to configure that. If not present, defaults to plain "info".
/// Must be called from inside a tokio runtime when `otlp_endpoint` is set, the batch exporter
/// runs on it.
pub fn setup_or_panic(config: TracingConfig) -> Option<TraceShutdownGuard> {
    if config.service_name.trim().is_empty() {
        panic!("Service name can't be empty.");
    }
    if config.environment.trim().is_empty() {
        panic!("Environment can't be empty. Example: local, dev, stage, prod");
    }
    let service_name_with_env = format!("{}-{}", config.service_name, config.environment);
    println!("Initializing tracing for service: {service_name_with_env}");

    let (json, compact) = match config.log_format {
        LogFormat::Json => (Some(tracing_subscriber::fmt::layer().json()), None),
        LogFormat::Pretty => (
            None,
            Some(tracing_subscriber::fmt::layer().with_ansi(true).compact()),
        ),
    };

    let tracer = config.otlp_endpoint.as_ref().map(|endpoint| {
        println!("Exporting spans to OTLP collector at: {endpoint}");
        opentelemetry_otlp::new_pipeline()
            .tracing()
            .with_exporter(
                opentelemetry_otlp::new_exporter()
                    .tonic()
                    .with_endpoint(endpoint.clone()),
            )
            .with_trace_config(opentelemetry::sdk::trace::config().with_resource(
                opentelemetry::sdk::Resource::new(vec![opentelemetry::KeyValue::new(
                    "service.name",
                    service_name_with_env.clone(),
                )]),
            ))
            .install_batch(opentelemetry::runtime::Tokio)
            .unwrap_or_else(|e| panic!("OTLP pipeline for {endpoint} should be valid: {e}"))
    });
    let otel = tracer
        .clone()
        .map(|tracer| tracing_opentelemetry::layer().with_tracer(tracer));

    let subscriber = tracing_subscriber::Registry::default()
        .with(json)
        .with(compact)
        .with(otel)
        .with(env_filter_or_default());
    subscriber::set_global_default(subscriber)
        .unwrap_or_else(|_| panic!("Tried to initialize tracing again, please, don't do this"));
    tracer.map(|tracer| TraceShutdownGuard { tracer })
}

/// Compact console logging for tests. Safe to call from several tests, only the first call
/// installs the subscriber.
pub fn setup_tracing_console_logging_for_test() {
    static ONCE: std::sync::OnceLock<()> = std::sync::OnceLock::new();
    ONCE.get_or_init(|| {
        let fmt = tracing_subscriber::fmt::layer()
            // for tests ansi if nice
            .with_ansi(true)
            .with_test_writer()
            .compact()
            .with_filter(env_filter_or_default());
        let subscriber = tracing_subscriber::Registry::default().with(fmt);
        // another test harness may have installed one already
        let _ = subscriber::set_global_default(subscriber);
    });
}

#[test]
fn log_format_parses_case_insensitive() {
    assert_eq!(LogFormat::from_str("JSON"), Ok(LogFormat::Json));
    assert_eq!(LogFormat::from_str("pretty"), Ok(LogFormat::Pretty));
    assert!(LogFormat::from_str("xml").is_err());
}
