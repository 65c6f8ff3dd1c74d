use crate::dataset::Dataset;
use crate::error::DataServerError;

/// Trait for data extraction operations.
///
/// This forms the contract between the API layer and the extraction core. Operations are
/// synchronous and run to completion once dispatched; the caller provides an open dataset and an
/// already-parsed request, and serialises the plain-data response.
pub trait Operation {
    /// Parsed request parameters.
    type Request: Send + 'static;

    /// Plain-data result.
    type Response: serde::Serialize + Send + 'static;

    /// Name used in logs and metrics.
    const NAME: &'static str;

    /// Execute the operation.
    ///
    /// # Arguments
    ///
    /// * `dataset`: Open dataset handle
    /// * `request`: Request parameters
    fn execute(
        dataset: &dyn Dataset,
        request: &Self::Request,
    ) -> Result<Self::Response, DataServerError>;
}
