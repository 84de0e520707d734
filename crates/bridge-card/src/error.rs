use thiserror::Error;

/// Failure reported by an [`crate::AppKeyStore`] backend.
///
/// The card never forwards these to the guest; they are logged and the buffer is left empty.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("backend unavailable: {0}")]
    Unavailable(String),
}

/// Failure reported by a [`crate::RemoteFetch`] backend.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("invalid url {0:?}")]
    InvalidUrl(String),

    #[error("remote request failed with HTTP status {status}")]
    HttpStatus { status: u16 },

    #[error("remote request failed: {0}")]
    Http(String),

    #[error("I/O error: {0}")]
    Io(String),
}
