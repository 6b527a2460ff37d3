use crate::api::state::AppState;
use crate::collaborators::event_store::HttpEventStore;
use crate::collaborators::search::HttpTraceSearch;
use backtraced_error::error_chain_to_pretty_formatted;
use clap::Parser;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, instrument};
use tracing_config_helper::{LogFormat, TracingConfig};

mod api;
mod collaborators;
mod trace_tree;

#[tokio::main]
async fn main() {
    // load env vars so clap can use it when parsing a config
    println!("Loading env vars");
    dotenv::dotenv().ok();
    let config = LaunchConfig::parse();
    let _tracer_shutdown_guard = tracing_config_helper::setup_or_panic(TracingConfig {
        service_name: env!("CARGO_BIN_NAME").to_string(),
        environment: config.environment.clone(),
        log_format: config.logging.log_format,
        otlp_endpoint: config.logging.otlp_endpoint.clone(),
    });
    let api_handle = match start_api(config) {
        Ok(api_handle) => api_handle,
        Err(e) => {
            error!(
                "Failed to start api: {}",
                error_chain_to_pretty_formatted(&e)
            );
            return;
        }
    };
    if let Err(e) = api_handle.await {
        error!("Api task ended abnormally: {e}");
    }
}

#[instrument(level = "error", skip_all)]
fn start_api(config: LaunchConfig) -> Result<tokio::task::JoinHandle<()>, backtraced_error::ReqwestError> {
    info!("Using config: {:#?}", config);
    let timeout = Duration::from_millis(config.collaborators.collaborator_timeout_ms);
    let app_state = AppState {
        search: Arc::new(HttpTraceSearch::new(
            config.collaborators.search_service_url,
            timeout,
        )?),
        event_store: Arc::new(HttpEventStore::new(
            config.collaborators.event_store_url,
            timeout,
        )?),
    };
    Ok(api::start(app_state, config.api_listen_port))
}

#[derive(Debug, clap::Parser)]
pub struct LaunchConfig {
    #[clap(flatten)]
    pub collaborators: CollaboratorsConfig,
    #[clap(flatten)]
    pub logging: LoggingConfig,
    #[clap(long, env, default_value_t = 4200)]
    pub api_listen_port: u16,
    #[clap(long, env)]
    pub environment: String,
}

#[derive(clap::Parser)]
pub struct CollaboratorsConfig {
    #[clap(long, env)]
    pub search_service_url: String,
    #[clap(long, env)]
    pub event_store_url: String,
    #[clap(long, env, default_value_t = 10_000)]
    pub collaborator_timeout_ms: u64,
}

/// Keeps only the end of an url, enough to tell them apart without leaking credentials
fn url_tail(url: &str) -> String {
    url.chars()
        .rev()
        .take(15)
        .collect::<String>()
        .chars()
        .rev()
        .collect::<String>()
}

impl Debug for CollaboratorsConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CollaboratorsConfig")
            .field("search_service_url", &url_tail(&self.search_service_url))
            .field("event_store_url", &url_tail(&self.event_store_url))
            .field("collaborator_timeout_ms", &self.collaborator_timeout_ms)
            .finish()
    }
}

#[derive(Debug, clap::Parser)]
pub struct LoggingConfig {
    /// pretty or json
    #[clap(long, env, default_value = "pretty")]
    pub log_format: LogFormat,
    #[clap(long, env)]
    pub otlp_endpoint: Option<String>,
}
