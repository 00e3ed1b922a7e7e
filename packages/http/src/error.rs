use crate::types::ErrorBody;

/// Failures of [`TreeClient`](crate::TreeClient) requests.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("Invalid URL: {message}")]
    InvalidUrl { message: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The server answered with one of its documented errors.
    #[error("{} ({}, status {status})", .body.user_message, .body.id)]
    Api { status: u16, body: ErrorBody },

    /// The server answered with a failure status and a body that is not an
    /// error document.
    #[error("request failed with status {status}: {body}")]
    UnexpectedResponse { status: u16, body: String },
}

impl Error {
    /// The documented error id, if the server sent one.
    pub fn api_id(&self) -> Option<&str> {
        match self {
            Error::Api { body, .. } => Some(&body.id),
            _ => None,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Api { status, .. } | Error::UnexpectedResponse { status, .. } => Some(*status),
            Error::Http(error) => error.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}
