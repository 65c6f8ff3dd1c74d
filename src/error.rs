//! Error handling.

use axum::{
    extract::rejection::QueryRejection,
    http::header,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use ndarray::ShapeError;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::path::PathBuf;
use strum_macros::Display;
use thiserror::Error;
use tokio::sync::AcquireError;
use tokio::task::JoinError;
use tracing::{event, Level};

/// Diversity server error type
///
/// This type encapsulates the various errors that may occur.
/// Each variant maps onto one [ErrorKind] and may result in a different API error response.
#[derive(Debug, Error)]
pub enum DataServerError {
    /// Requested variable is absent from the dataset or not served
    #[error("variable '{variable}' not found in dataset")]
    UnknownVariable { variable: String },

    /// Feature token matches neither a valid index nor a known name
    #[error("Unknown feature '{token}'. Expected one of: {expected:?}")]
    UnknownFeature {
        token: String,
        expected: Vec<String>,
    },

    /// Time or index window is malformed, or the selection is incomplete
    #[error("invalid range: {reason}")]
    InvalidRange { reason: String },

    /// Dataset file does not exist
    #[error("dataset {} not found", .path.display())]
    DatasetNotFound { path: PathBuf },

    /// Dataset does not have the expected structure
    #[error("dataset is malformed: {reason}")]
    MalformedDataset { reason: String },

    /// Error reported by the NetCDF library
    #[cfg(feature = "netcdf")]
    #[error("failed to read dataset")]
    Netcdf(#[from] netcdf::Error),

    /// Error deserialising query parameters
    #[error("request parameters are not valid")]
    RequestQueryRejection(#[from] QueryRejection),

    /// Error validating query parameters
    #[error("request parameters are not valid")]
    RequestDataValidation(#[from] validator::ValidationErrors),

    /// Error acquiring a semaphore
    #[error("error acquiring resources")]
    SemaphoreAcquireError(#[from] AcquireError),

    /// Error creating an ndarray view with the requested shape
    #[error("failed to create array from shape")]
    ShapeInvalid(#[from] ShapeError),

    /// Blocking task panicked or was cancelled
    #[error("extraction task failed")]
    TaskJoin(#[from] JoinError),
}

/// Caller-visible classification of a [DataServerError].
#[derive(Clone, Copy, Debug, Deserialize, Display, PartialEq, Serialize)]
pub enum ErrorKind {
    UnknownVariable,
    UnknownFeature,
    InvalidRange,
    /// Possibly transient; callers may retry.
    DatasetUnavailable,
    InvalidRequest,
    Internal,
}

impl DataServerError {
    /// Shorthand for [DataServerError::InvalidRange].
    pub fn invalid_range(reason: impl Into<String>) -> Self {
        Self::InvalidRange {
            reason: reason.into(),
        }
    }

    /// Shorthand for [DataServerError::MalformedDataset].
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedDataset {
            reason: reason.into(),
        }
    }

    /// Returns the kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UnknownVariable { .. } => ErrorKind::UnknownVariable,
            Self::UnknownFeature { .. } => ErrorKind::UnknownFeature,
            Self::InvalidRange { .. } => ErrorKind::InvalidRange,
            Self::DatasetNotFound { .. }
            | Self::MalformedDataset { .. }
            | Self::ShapeInvalid(_) => ErrorKind::DatasetUnavailable,
            #[cfg(feature = "netcdf")]
            Self::Netcdf(_) => ErrorKind::DatasetUnavailable,
            Self::RequestQueryRejection(_) | Self::RequestDataValidation(_) => {
                ErrorKind::InvalidRequest
            }
            Self::SemaphoreAcquireError(_) | Self::TaskJoin(_) => ErrorKind::Internal,
        }
    }
}

impl IntoResponse for DataServerError {
    /// Convert from a `DataServerError` into an [axum::response::Response].
    fn into_response(self) -> Response {
        ErrorResponse::from(self).into_response()
    }
}

/// Body of error response
///
/// Implements serde (de)serialise.
#[derive(Deserialize, Serialize)]
struct ErrorBody {
    /// Main error message
    message: String,

    /// Error classification
    kind: ErrorKind,

    /// Optional list of causes
    #[serde(skip_serializing_if = "Option::is_none")]
    caused_by: Option<Vec<String>>,
}

impl ErrorBody {
    /// Return a new ErrorBody
    ///
    /// # Arguments
    ///
    /// * `error`: The error that occurred
    fn new(error: &DataServerError) -> Self {
        let message = error.to_string();
        let mut caused_by: Option<Vec<String>> = None;
        let mut current = error.source();
        while let Some(source) = current {
            caused_by
                .get_or_insert_with(Vec::new)
                .push(source.to_string());
            current = source.source();
        }
        // Remove duplicate entries.
        if let Some(caused_by) = caused_by.as_mut() {
            caused_by.dedup()
        }
        ErrorBody {
            message,
            kind: error.kind(),
            caused_by,
        }
    }
}

/// A response to send in error cases
///
/// Implements serde (de)serialise.
#[derive(Deserialize, Serialize)]
struct ErrorResponse {
    /// HTTP status of the response
    #[serde(skip)]
    status: StatusCode,

    /// Response body
    error: ErrorBody,
}

impl From<DataServerError> for ErrorResponse {
    /// Convert from a `DataServerError` into an `ErrorResponse`.
    fn from(error: DataServerError) -> Self {
        let status = match error.kind() {
            ErrorKind::UnknownVariable
            | ErrorKind::UnknownFeature
            | ErrorKind::InvalidRange
            | ErrorKind::InvalidRequest => StatusCode::BAD_REQUEST,
            ErrorKind::DatasetUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        };

        // Log server errors.
        if status.is_server_error() {
            event!(Level::ERROR, "{}", error.to_string());
            let mut current = error.source();
            while let Some(source) = current {
                event!(Level::ERROR, "Caused by: {}", source.to_string());
                current = source.source();
            }
        }

        ErrorResponse {
            status,
            error: ErrorBody::new(&error),
        }
    }
}

impl IntoResponse for ErrorResponse {
    /// Convert from an `ErrorResponse` into an `axum::response::Response`.
    ///
    /// Renders the response as JSON.
    fn into_response(self) -> Response {
        let json_body = serde_json::to_string_pretty(&self);
        match json_body {
            Err(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to serialise error response: {}", err),
            )
                .into_response(),
            Ok(json_body) => (
                self.status,
                [(&header::CONTENT_TYPE, mime::APPLICATION_JSON.to_string())],
                json_body,
            )
                .into_response(),
        }
    }
}
