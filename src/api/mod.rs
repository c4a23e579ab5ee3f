//! HTTP access to the robo-loader status API.

pub mod client;
pub mod error;
pub mod queries;
pub mod types;

pub use client::ApiClient;
pub use error::ApiError;
pub use queries::Queries;
