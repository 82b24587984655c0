//! API error types.

/// Errors produced while talking to the Pulp server.
///
/// Transport failures ([`ApiError::Http`]) and unexpected status codes
/// ([`ApiError::Status`]) are client-side faults. A task that ends badly
/// on the server is reported as [`ApiError::TaskFailed`] or
/// [`ApiError::UnexpectedState`].
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP response: {status}, expected: {expected}, body: {body}")]
    Status {
        status: u16,
        expected: u16,
        body: String,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid server URL: {0}")]
    InvalidUrl(String),

    #[error("{description}")]
    TaskFailed { task: String, description: String },

    #[error("task {task} state = {state}, expected \"completed\"")]
    UnexpectedState { task: String, state: String },

    #[error("task {0} completed without creating any resource")]
    NoCreatedResource(String),
}

impl ApiError {
    /// HTTP status code carried by the error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}
