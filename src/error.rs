use crate::workflow::WorkflowStatus;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("{endpoint} returned HTTP {status}")]
    Status { endpoint: String, status: u16 },
    #[error("unexpected response from {endpoint}: {message}")]
    Malformed { endpoint: String, message: String },
    #[error("failed to read image {path}: {source}")]
    Image {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("no authenticated user")]
    Identity,
    #[error(transparent)]
    Network(#[from] ApiError),
    #[error("no products to customize")]
    EmptyInput,
    #[error("no product could be customized")]
    NoResults,
    #[error("workflow is busy ({status})")]
    Busy { status: WorkflowStatus },
    #[error("workflow was reset while the operation was running")]
    Reset,
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage io error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("storage file {path} is corrupt: {message}")]
    Corrupt { path: String, message: String },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CheckoutError {
    #[error("the cart is empty")]
    EmptyCart,
    #[error("{0} is required")]
    MissingField(&'static str),
    #[error("{0} is not a valid email address")]
    InvalidEmail(String),
}
