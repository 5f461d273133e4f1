use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use hyper::body::Incoming;
use hyper::Request;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use tokio::net::TcpListener;
use tokio::signal;
use tokio::time::{sleep, Duration};
use tracing::{info, warn};

use crate::api::{handle_request, AppState};
use crate::config::Config;
use crate::error::{GateError, Result};

/// Guard to decrement active connections counter when dropped
struct ConnectionGuard(Arc<AtomicUsize>);

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::Relaxed);
    }
}

/// Serve the API on `config.listen` until SIGTERM or SIGINT.
///
/// After the signal no new connections are accepted; in-flight ones get up to
/// `timeout.shutdown_secs` to finish.
pub async fn run(config: Arc<Config>, state: Arc<AppState>) -> Result<()> {
    let addr = config.listen;
    let listener = TcpListener::bind(addr).await.map_err(GateError::Io)?;

    serve(
        listener,
        state,
        Duration::from_secs(config.timeout.shutdown_secs),
    )
    .await
}

/// Accept loop over an already bound listener.
pub async fn serve(
    listener: TcpListener,
    state: Arc<AppState>,
    shutdown_timeout: Duration,
) -> Result<()> {
    let builder = ConnBuilder::new(TokioExecutor::new());
    let active_connections = Arc::new(AtomicUsize::new(0));

    let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate()).map_err(|e| {
        GateError::Io(std::io::Error::other(format!(
            "Failed to setup SIGTERM handler: {e}"
        )))
    })?;
    let mut sigint = signal::unix::signal(signal::unix::SignalKind::interrupt()).map_err(|e| {
        GateError::Io(std::io::Error::other(format!(
            "Failed to setup SIGINT handler: {e}"
        )))
    })?;

    info!(addr = ?listener.local_addr().ok(), "Starting API server (h1/h2)");

    loop {
        tokio::select! {
            _ = sigterm.recv() => {
                info!("Received SIGTERM, initiating graceful shutdown");
                break;
            }
            _ = sigint.recv() => {
                info!("Received SIGINT, initiating graceful shutdown");
                break;
            }
            result = listener.accept() => {
                let (stream, peer) = match result {
                    Ok((stream, peer)) => (stream, peer),
                    Err(e) => {
                        warn!(error = %e, "accept error");
                        continue;
                    }
                };

                active_connections.fetch_add(1, Ordering::Relaxed);

                let builder = builder.clone();
                let state = Arc::clone(&state);
                let active_connections = active_connections.clone();

                tokio::spawn(async move {
                    let _guard = ConnectionGuard(active_connections);

                    let svc = hyper::service::service_fn(move |req: Request<Incoming>| {
                        let state = Arc::clone(&state);
                        async move {
                            Ok::<_, hyper::Error>(handle_request(&state, req, peer).await)
                        }
                    });

                    if let Err(e) = builder.serve_connection(TokioIo::new(stream), svc).await {
                        warn!(?peer, error = %e, "serve_connection error");
                    }
                });
            }
        }
    }

    drop(listener);

    info!(
        "Waiting for active connections to finish (timeout: {}s)",
        shutdown_timeout.as_secs()
    );
    let start = std::time::Instant::now();

    loop {
        let active = active_connections.load(Ordering::Relaxed);
        if active == 0 {
            info!("All connections closed, shutdown complete");
            break;
        }

        if start.elapsed() >= shutdown_timeout {
            warn!(
                active_connections = active,
                "Shutdown timeout reached, {} connections still active", active
            );
            break;
        }

        info!(
            active_connections = active,
            "Waiting for connections to close"
        );
        sleep(Duration::from_millis(100)).await;
    }

    info!("API server stopped");
    Ok(())
}
