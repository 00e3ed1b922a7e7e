//! The closed set of errors the HTTP surface can answer with.

use std::borrow::Cow;

use bytes::Bytes;
use http::header::{HeaderValue, CONTENT_TYPE};
use http::{Response, StatusCode};

use crate::types::ErrorBody;

/// Every error a client can observe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    MethodNotAllowed,
    InternalServerError,
    NotFound,
    FileExpected,
    BadInput,
    WriteAccessDenied,
    DeleteAccessDenied,
    FileAlreadyExists,
}

impl ErrorKind {
    pub const ALL: [ErrorKind; 8] = [
        ErrorKind::MethodNotAllowed,
        ErrorKind::InternalServerError,
        ErrorKind::NotFound,
        ErrorKind::FileExpected,
        ErrorKind::BadInput,
        ErrorKind::WriteAccessDenied,
        ErrorKind::DeleteAccessDenied,
        ErrorKind::FileAlreadyExists,
    ];

    /// Stable identifier sent as `id`.
    pub fn id(&self) -> &'static str {
        match self {
            ErrorKind::MethodNotAllowed => "method-not-allowed",
            ErrorKind::InternalServerError => "internal-server-error",
            ErrorKind::NotFound => "not-found",
            ErrorKind::FileExpected => "file-expected",
            ErrorKind::BadInput => "bad-input",
            ErrorKind::WriteAccessDenied => "write-access-denied",
            ErrorKind::DeleteAccessDenied => "delete-access-denied",
            ErrorKind::FileAlreadyExists => "file-already-exists",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ErrorKind::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ErrorKind::InternalServerError => StatusCode::INTERNAL_SERVER_ERROR,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::FileExpected | ErrorKind::BadInput | ErrorKind::FileAlreadyExists => {
                StatusCode::BAD_REQUEST
            }
            ErrorKind::WriteAccessDenied | ErrorKind::DeleteAccessDenied => StatusCode::FORBIDDEN,
        }
    }

    /// Default (user, system) messages.
    fn messages(&self) -> (&'static str, &'static str) {
        match self {
            ErrorKind::MethodNotAllowed => (
                "Invalid request.",
                "This method is not allowed for this endpoint.",
            ),
            ErrorKind::InternalServerError => (
                "oops! sorry something failed on our end.",
                "unexpected server error occurred.",
            ),
            ErrorKind::NotFound => (
                "oh no! no such file or directory.",
                "no file element exists at the requested path or access is denied.",
            ),
            ErrorKind::FileExpected => (
                "this request is only supported for files.",
                "this request is only supported for files.",
            ),
            ErrorKind::BadInput => (
                "incorrect data format, only JSON is accepted.",
                "could not parse request body as JSON.",
            ),
            ErrorKind::WriteAccessDenied => (
                "could not write to the requested file due to insufficient permission.",
                "could not write to the requested file due to insufficient permission.",
            ),
            ErrorKind::DeleteAccessDenied => (
                "you do not have permission to delete file or dir.",
                "you do not have permission to delete file or dir.",
            ),
            ErrorKind::FileAlreadyExists => (
                "this file already exists at the given path, cannot create a new one.",
                "this file already exists at the given path, cannot create a new one.",
            ),
        }
    }
}

/// A rendered error: kind plus the messages to send.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("{user_message}")]
pub struct ApiError {
    kind: ErrorKind,
    user_message: Cow<'static, str>,
    system_message: Cow<'static, str>,
}

impl ApiError {
    pub fn new(kind: ErrorKind) -> Self {
        let (user_message, system_message) = kind.messages();
        Self {
            kind,
            user_message: Cow::Borrowed(user_message),
            system_message: Cow::Borrowed(system_message),
        }
    }

    /// A `bad-input` error explaining what was wrong.
    pub fn bad_input(message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            kind: ErrorKind::BadInput,
            user_message: Cow::Owned(message.clone()),
            system_message: Cow::Owned(message),
        }
    }

    pub fn internal() -> Self {
        Self::new(ErrorKind::InternalServerError)
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn status(&self) -> StatusCode {
        self.kind.status()
    }

    pub fn body(&self) -> ErrorBody {
        ErrorBody {
            id: self.kind.id().to_string(),
            user_message: self.user_message.to_string(),
            system_message: self.system_message.to_string(),
        }
    }

    pub fn to_response(&self) -> Response<Bytes> {
        // ErrorBody only holds strings, serialization cannot fail.
        let body = serde_json::to_vec(&self.body()).unwrap_or_default();
        let mut response = Response::new(Bytes::from(body));
        *response.status_mut() = self.status();
        response
            .headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        response
    }
}

impl From<ErrorKind> for ApiError {
    fn from(kind: ErrorKind) -> Self {
        ApiError::new(kind)
    }
}
