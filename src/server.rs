//! Web server

use crate::cli;

use std::{net::SocketAddr, path::PathBuf, process::exit, str::FromStr, time::Duration};

use axum::ServiceExt;
use axum_server::{tls_rustls::RustlsConfig, Handle};
use expanduser::expanduser;
use tokio::signal;

/// Serve the diversity server API
///
/// # Arguments
///
/// * `args`: Command line arguments
/// * `service`: The [crate::app::Service] to serve
pub async fn serve(args: &cli::CommandLineArgs, service: crate::app::Service) {
    let addr = SocketAddr::from_str(&format!("{}:{}", args.host, args.port))
        .expect("invalid host name, IP address or port number");

    // Catch ctrl+c and try to shutdown gracefully
    let handle = Handle::new();
    tokio::spawn(shutdown_signal(
        handle.clone(),
        args.graceful_shutdown_timeout,
    ));

    if args.https {
        let tls_config = tls_config(args).await;
        tracing::info!("listening on https://{}", addr);
        // run HTTPS server with hyper
        axum_server::bind_rustls(addr, tls_config)
            .handle(handle)
            .serve(service.into_make_service())
            .await
            .unwrap();
    } else {
        tracing::info!("listening on http://{}", addr);
        // run HTTP server with hyper
        axum_server::bind(addr)
            .handle(handle)
            .serve(service.into_make_service())
            .await
            .unwrap();
    }
}

/// Resolve a path that may start with `~` to an absolute path, exiting if it does not exist.
fn existing_file(path: &str, description: &str) -> PathBuf {
    let expanded = expanduser(path)
        .expect("Failed to expand ~ to user name. Please provide an absolute path instead.");
    match expanded.canonicalize() {
        Ok(path) => path,
        Err(_) => {
            tracing::error!(
                "{} expected at '{}' but not found.",
                description,
                expanded.display()
            );
            exit(1)
        }
    }
}

/// Load the TLS certificate and key named on the command line.
async fn tls_config(args: &cli::CommandLineArgs) -> RustlsConfig {
    let cert_file = existing_file(&args.cert_file, "TLS certificate file");
    let key_file = existing_file(&args.key_file, "TLS key file");
    RustlsConfig::from_pem_file(cert_file, key_file)
        .await
        .expect("Failed to load TLS certificate files")
}

/// Graceful shutdown handler
///
/// Installs signal handlers to catch Ctrl-C or SIGTERM and trigger a graceful shutdown.
async fn shutdown_signal(handle: Handle, timeout: u64) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("signal received, starting graceful shutdown");
    // Force shutdown once the timeout expires.
    handle.graceful_shutdown(Some(Duration::from_secs(timeout)));
}
