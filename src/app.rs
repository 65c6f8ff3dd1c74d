//! Diversity server API web application

use crate::app_state::{AppState, SharedAppState};
use crate::cli::CommandLineArgs;
use crate::dataset::DatasetSource;
use crate::error::DataServerError;
use crate::metrics;
use crate::models::{self, VariableRequest};
use crate::operation::Operation;
use crate::operations;
use crate::validated_query::ValidatedQuery;

use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::State,
    http::header,
    http::HeaderValue,
    routing::get,
    Json, Router,
};
use tower::Layer;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::normalize_path::{NormalizePath, NormalizePathLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

/// `Service` type returned by [service] and served by [crate::server::serve].
pub type Service = NormalizePath<Router>;

/// Initialise the application.
///
/// Configures the global Rayon thread pool if Rayon is enabled.
pub fn init(args: &CommandLineArgs) {
    if args.use_rayon {
        let mut builder = rayon::ThreadPoolBuilder::new();
        if let Some(thread_limit) = args.thread_limit {
            builder = builder.num_threads(thread_limit);
        }
        if let Err(err) = builder.build_global() {
            tracing::warn!("failed to configure Rayon thread pool: {}", err);
        }
    }
}

/// Returns a [axum::Router] for the diversity server API
///
/// The router is populated with all routes as well as the following middleware:
///
/// * a [tower_http::trace::TraceLayer] for tracing requests and responses and recording metrics
/// * a [tower_http::set_header::SetResponseHeaderLayer] disabling caching of API responses
/// * a permissive [tower_http::cors::CorsLayer] for browser clients
///
/// # Arguments
///
/// * `args`: Command line arguments
/// * `source`: Opens the dataset for each request
fn router(args: &CommandLineArgs, source: Arc<dyn DatasetSource>) -> Router {
    let state: SharedAppState = Arc::new(AppState::new(args, source));

    fn api() -> Router<SharedAppState> {
        Router::new()
            .route("/globe-data", get(map_handler))
            .route("/diversity-map", get(map_handler))
            .route("/line-data", get(series_handler))
            .route("/features", get(features_handler))
            .layer(
                ServiceBuilder::new()
                    .layer(
                        TraceLayer::new_for_http()
                            .on_request(metrics::request_counter)
                            .on_response(metrics::record_response_metrics),
                    )
                    .layer(SetResponseHeaderLayer::overriding(
                        header::CACHE_CONTROL,
                        HeaderValue::from_static("no-store"),
                    )),
            )
    }

    Router::new()
        .route("/metrics", get(metrics::metrics_handler))
        .nest("/api", api())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Returns a [crate::app::Service] for the diversity server API
///
/// The service is populated with all routes as well as the following middleware:
///
/// * a [tower_http::normalize_path::NormalizePathLayer] for trimming trailing slashes from
///   requests
///
/// # Arguments
///
/// * `args`: Command line arguments
/// * `source`: Opens the dataset for each request
pub fn service(args: &CommandLineArgs, source: Arc<dyn DatasetSource>) -> Service {
    let router = router(args, source);

    // Note that any middleware that should affect routing must wrap the router.
    // See https://docs.rs/axum/0.6.18/axum/middleware/index.html#rewriting-request-uri-in-middleware
    NormalizePathLayer::trim_trailing_slash().layer(router)
}

/// Handler for map requests
async fn map_handler(
    State(state): State<SharedAppState>,
    ValidatedQuery(query): ValidatedQuery<models::MapQuery>,
) -> Result<Json<models::MapResult>, DataServerError> {
    operation_handler::<operations::GetMap>(state, query.into()).await
}

/// Handler for time series requests
async fn series_handler(
    State(state): State<SharedAppState>,
    ValidatedQuery(query): ValidatedQuery<models::SeriesQuery>,
) -> Result<Json<models::SeriesResult>, DataServerError> {
    let request = models::SeriesRequest::try_from(query)?;
    operation_handler::<operations::GetSeries>(state, request).await
}

/// Handler for feature listing requests
async fn features_handler(
    State(state): State<SharedAppState>,
    ValidatedQuery(query): ValidatedQuery<models::FeaturesQuery>,
) -> Result<Json<models::FeatureList>, DataServerError> {
    operation_handler::<operations::ListFeatures>(state, query.into()).await
}

/// Run an operation against a freshly opened dataset.
///
/// The dataset is opened and read on a blocking thread, or on the Rayon pool if enabled, while
/// holding the global dataset read lock.
///
/// # Arguments
///
/// * `state`: Shared application state
/// * `request`: Parsed request parameters
#[tracing::instrument(level = "DEBUG", skip_all, fields(operation = T::NAME))]
async fn operation_handler<T: Operation + 'static>(
    state: SharedAppState,
    request: T::Request,
) -> Result<Json<T::Response>, DataServerError>
where
    T::Request: VariableRequest,
{
    state.check_variable(request.variable())?;

    let _task_permit = state.resource_manager.task().await?;
    let read_permit = state.resource_manager.dataset_read().await?;
    let source = state.source.clone();
    let work = move || {
        let _read_permit = read_permit;
        let start = Instant::now();
        let result = source
            .open()
            .and_then(|dataset| T::execute(dataset.as_ref(), &request));
        metrics::record_operation(T::NAME, start.elapsed());
        result
    };
    let result = if state.args.use_rayon {
        tokio_rayon::spawn(work).await
    } else {
        tokio::task::spawn_blocking(work).await?
    };

    match result {
        Ok(response) => Ok(Json(response)),
        Err(err) => {
            metrics::record_operation_error(T::NAME, &err.kind().to_string());
            Err(err)
        }
    }
}
