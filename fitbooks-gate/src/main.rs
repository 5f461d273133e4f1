#![forbid(unsafe_code)]

use clap::Parser;
use fitbooks_gate_lib::telemetry::{init_metrics, init_tracing, start_observability_server};
use fitbooks_gate_lib::{config::load_from_path, run, AppState};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(author, version, about = "Rate-limited lead intake and chat relay API")]
struct Cli {
    /// Path to configuration TOML file
    #[arg(
        short,
        long,
        value_name = "FILE",
        env = "GATE_CONFIG",
        default_value = "config/gate.toml"
    )]
    config: PathBuf,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let cfg = match load_from_path(&cli.config) {
        Ok(cfg) => cfg,
        Err(err) => {
            eprintln!(
                "failed to load configuration from {}: {err}",
                cli.config.display()
            );
            std::process::exit(1);
        }
    };

    if let Err(err) = init_tracing(&cfg.logging, &cfg.telemetry) {
        eprintln!("{err}");
        std::process::exit(1);
    }
    info!(?cfg.listen, "configuration loaded");

    let metrics = match cfg.telemetry.metrics_port {
        Some(_) => match init_metrics() {
            Ok((metrics, registry)) => Some((metrics, registry)),
            Err(err) => {
                error!(%err, "failed to initialize metrics");
                std::process::exit(1);
            }
        },
        None => None,
    };

    let state = match AppState::from_config(&cfg, metrics.as_ref().map(|(m, _)| Arc::clone(m))) {
        Ok(state) => Arc::new(state),
        Err(err) => {
            error!(%err, "failed to build application state");
            std::process::exit(1);
        }
    };

    if let (Some(port), Some((_, registry))) = (cfg.telemetry.metrics_port, metrics) {
        let readiness = state.readiness();
        tokio::spawn(async move {
            if let Err(err) = start_observability_server(port, registry, readiness).await {
                error!(%err, "observability server exited with error");
            }
        });
    }

    if let Err(err) = run(Arc::new(cfg), state).await {
        error!(%err, "API server exited with error");
        std::process::exit(1);
    }
}
