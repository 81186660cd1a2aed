use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use birdcall_classifier::config::{ServiceConfig, NUM_CLASSES};
use birdcall_classifier::error::{log_model_error, ErrorCode};
use birdcall_classifier::http::run_http_server;
use birdcall_classifier::inference::OnnxClassifier;
use birdcall_classifier::{init_logging, AppContext};
use clap::Parser;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(
    name = "birdcall_server",
    about = "HTTP service classifying bird calls in uploaded audio"
)]
struct Cli {
    /// JSON configuration file (missing file falls back to defaults)
    #[arg(long)]
    config: Option<PathBuf>,
    /// Listen address, overrides config and BIRDCALL_ADDR
    #[arg(long)]
    addr: Option<SocketAddr>,
    /// ONNX model path, overrides config and BIRDCALL_MODEL
    #[arg(long)]
    model: Option<PathBuf>,
    /// Scratch directory for uploads, overrides config and BIRDCALL_UPLOAD_DIR
    #[arg(long)]
    upload_dir: Option<PathBuf>,
    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn service_config(&self) -> ServiceConfig {
        let mut config = match &self.config {
            Some(path) => ServiceConfig::load_from_file(path),
            None => ServiceConfig::default(),
        }
        .with_env_overrides();

        if let Some(addr) = self.addr {
            config.bind_addr = addr;
        }
        if let Some(model) = &self.model {
            config.model_path = model.clone();
        }
        if let Some(dir) = &self.upload_dir {
            config.upload_dir = dir.clone();
        }
        config
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("birdcall_server error: {err:?}");
            ExitCode::from(1)
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = cli.service_config();

    let classifier = match OnnxClassifier::load(
        &config.model_path,
        config.inference_threads,
        NUM_CLASSES,
    ) {
        Ok(classifier) => classifier,
        Err(err) => {
            log_model_error(&err, "startup");
            anyhow::bail!("Failed to load model (code {}): {}", err.code(), err.message());
        }
    };
    info!("Model loaded successfully.");

    let addr = config.bind_addr;
    let context = AppContext::new(config, Arc::new(classifier))?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("building tokio runtime")?;

    runtime.block_on(run_http_server(context, addr, shutdown_signal()))
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!("failed to listen for ctrl-c: {}", err);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
