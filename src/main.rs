//! This file defines the diversity-server binary entry point.

use diversity_server::app;
use diversity_server::cli;
use diversity_server::metrics;
use diversity_server::netcdf_dataset::NetcdfSource;
use diversity_server::server;
use diversity_server::tracing;

use std::sync::Arc;

/// Application entry point
#[tokio::main]
async fn main() {
    let args = cli::parse();
    tracing::init_tracing();
    ::tracing::debug!("{:?}", args);
    metrics::register_metrics();
    app::init(&args);
    let source = NetcdfSource::new(&args.dataset);
    if !source.path().exists() {
        ::tracing::warn!(
            "dataset {} not found; requests will fail until it is available",
            source.path().display()
        );
    }
    let service = app::service(&args, Arc::new(source));
    server::serve(&args, service).await;
}
