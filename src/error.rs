//! Error Taxonomy
//!
//! Failures a shard reports to its immediate caller. None of them is retried
//! automatically; the coordinator's orchestration logic decides what to do.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::worker::types::ShardCredential;

#[derive(Debug, Error, PartialEq)]
pub enum WorkerError {
    /// A second `shard/config` reached a shard that is already configured.
    #[error("shard is already in a configured state")]
    AlreadyConfigured,

    /// The caller's credential does not match what the shard was configured with.
    #[error("incorrect credentials: offered {offered}, expected {expected}")]
    AuthMismatch {
        offered: ShardCredential,
        expected: String,
    },

    #[error("unknown unit of work: {0}")]
    UnknownStrategy(String),

    #[error("no active task queue")]
    NoActiveQueue,

    #[error("shard has no unit of work configured")]
    NotConfigured,

    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    #[error("no route for {0}")]
    UnroutedRequest(String),
}

impl WorkerError {
    pub fn status(&self) -> StatusCode {
        match self {
            WorkerError::AlreadyConfigured | WorkerError::AuthMismatch { .. } => {
                StatusCode::FORBIDDEN
            }
            WorkerError::UnknownStrategy(_) | WorkerError::MalformedPayload(_) => {
                StatusCode::BAD_REQUEST
            }
            WorkerError::NoActiveQueue | WorkerError::NotConfigured => StatusCode::CONFLICT,
            WorkerError::UnroutedRequest(_) => StatusCode::NOT_FOUND,
        }
    }

    /// Plain-text body sent back to the caller.
    ///
    /// Credential failures never echo the expected identifiers; those only go to the log.
    pub fn body(&self) -> String {
        let text = match self {
            WorkerError::AlreadyConfigured => {
                "Forbidden, shard is already in a configured state".to_string()
            }
            WorkerError::AuthMismatch { .. } => {
                "Forbidden, incorrect credentials for this shard".to_string()
            }
            WorkerError::UnroutedRequest(_) => "Not Found".to_string(),
            other => other.to_string(),
        };
        format!("{}\r\n", text)
    }
}

impl IntoResponse for WorkerError {
    fn into_response(self) -> Response {
        (self.status(), self.body()).into_response()
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum RingError {
    #[error("cannot build a hash ring from an empty shard set")]
    Empty,
}
