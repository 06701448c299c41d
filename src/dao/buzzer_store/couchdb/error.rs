//! Error types for the CouchDB buzzer store.

use reqwest::StatusCode;
use thiserror::Error;

use crate::dao::storage::StorageError;

/// Convenient result alias returning [`CouchDaoError`] failures.
pub type CouchResult<T> = Result<T, CouchDaoError>;

/// Failures that can occur while interacting with CouchDB.
#[derive(Debug, Error)]
pub enum CouchDaoError {
    /// Required environment variable is missing.
    #[error("missing CouchDB environment variable `{var}`")]
    MissingEnvVar { var: &'static str },
    /// Building the HTTP client failed (invalid TLS setup, etc).
    #[error("failed to build CouchDB client")]
    ClientBuilder {
        #[source]
        source: reqwest::Error,
    },
    /// Probing the database failed at the transport level.
    #[error("failed to query CouchDB database `{database}`")]
    DatabaseQuery {
        database: String,
        #[source]
        source: reqwest::Error,
    },
    /// Creating the database failed at the transport level.
    #[error("failed to create CouchDB database `{database}`")]
    DatabaseCreate {
        database: String,
        #[source]
        source: reqwest::Error,
    },
    /// The database probe returned an unexpected status.
    #[error("CouchDB database `{database}` responded with status {status}")]
    DatabaseStatus {
        database: String,
        status: StatusCode,
    },
    /// A document request failed at the transport level.
    #[error("CouchDB request to `{path}` failed")]
    RequestSend {
        path: String,
        #[source]
        source: reqwest::Error,
    },
    /// A document request returned an unexpected status.
    #[error("CouchDB request to `{path}` returned status {status}")]
    RequestStatus { path: String, status: StatusCode },
    /// A response body could not be decoded.
    #[error("failed to decode CouchDB response from `{path}`")]
    DecodeResponse {
        path: String,
        #[source]
        source: reqwest::Error,
    },
}

impl From<CouchDaoError> for StorageError {
    fn from(err: CouchDaoError) -> Self {
        StorageError::unavailable(err.to_string(), err)
    }
}
