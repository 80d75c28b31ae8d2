//! Error types for the hosted data store

use thiserror::Error;

/// Errors returned by a [`DataStore`](crate::store::DataStore)
#[derive(Debug, Error)]
pub enum StoreError {
    /// The request never got a response
    #[error("request to {table} failed: {source}")]
    Http {
        table: String,
        #[source]
        source: reqwest::Error,
    },

    /// The store answered with a non-success status
    #[error("{table} returned HTTP {status}: {body}")]
    Status {
        table: String,
        status: u16,
        body: String,
    },

    /// The response body did not match the expected rows
    #[error("could not decode {table} response: {source}")]
    Decode {
        table: String,
        #[source]
        source: serde_json::Error,
    },

    /// A single-row lookup came back empty
    #[error("no {table} row for {key}")]
    NotFound { table: String, key: String },

    /// The store refused the write
    #[error("{table} rejected the write: {reason}")]
    Rejected { table: String, reason: String },
}

impl StoreError {
    /// True for 401/403 responses, which mean the service key is wrong.
    pub fn is_auth(&self) -> bool {
        matches!(self, StoreError::Status { status: 401 | 403, .. })
    }
}
