//! This crate provides a data server for a gridded biodiversity index. It serves derived slices
//! of a multi-feature dataset with latitude, longitude and monthly time dimensions to a
//! visualisation client: 2-D maps of one feature at one time step, point and area time series
//! with standard error and a linear trend, and the list of available features.
//!
//! The dataset is opened read-only for each request and dimensions are always addressed by name,
//! so variables may store their dimensions in any order and latitudes in either direction.
//! Missing data (fill values, NaN and values outside a valid range) never reaches clients: every
//! value leaving the server is a rounded finite number or `null`.
//!
//! The server is built on top of a number of open source components.
//!
//! * [Tokio](tokio), the most popular asynchronous Rust runtime.
//! * [Axum](axum) web framework, built by the Tokio team, on top of the [hyper] HTTP library.
//! * [Serde](serde) performs serialisation of JSON response data.
//! * [ndarray] provides [NumPy](https://numpy.org)-like n-dimensional arrays used in numerical
//!   computation.
//! * The `netcdf` crate, behind the `netcdf` feature, reads NetCDF files through libnetcdf.

pub mod app;
pub mod app_state;
pub mod array;
pub mod cli;
pub mod dataset;
pub mod error;
pub mod feature;
pub mod metrics;
pub mod models;
#[cfg(feature = "netcdf")]
pub mod netcdf_dataset;
pub mod operation;
pub mod operations;
pub mod resource_manager;
pub mod server;
#[cfg(test)]
pub mod test_utils;
pub mod tracing;
pub mod transport;
pub mod trend;
pub mod types;
pub mod validated_query;
