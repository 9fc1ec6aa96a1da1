use std::fmt;

use bytes::Bytes;
use http_body_util::Full;
use hyper::{
    header::{HeaderValue, CONTENT_TYPE},
    Response, StatusCode,
};

/// The own result type where the error part is a async friendly error.
pub type Result<T> = std::result::Result<T, Error>;

/// Shorthand of a boxed Send, Sync error.
pub type Error = Box<dyn std::error::Error + Send + Sync>;

/// Errors answered to HTTP callers. The discriminant is the status code.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum HttpError {
    BadRequest = 400,
    NotFound = 404,
    MethodNotAllowed = 405,
    InternalError = 500,
}

/// An [`HttpError`] together with the text sent in the response body.
#[derive(Debug)]
pub struct RuntimeError {
    pub code: HttpError,
    pub text: String,
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl std::error::Error for RuntimeError {}

impl HttpError {
    pub fn status(self) -> StatusCode {
        StatusCode::from_u16(self as u16).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    pub fn into_runtime_error(self, text: &str) -> RuntimeError {
        RuntimeError {
            code: self,
            text: text.to_owned(),
        }
    }

    pub fn into_result<T>(self, text: &str) -> Result<T> {
        Err(Box::new(self.into_runtime_error(text)))
    }

    /// Plain text response with the status code of the error.
    pub fn into_response(self, text: &str) -> Response<Full<Bytes>> {
        let mut response = Response::new(Full::new(Bytes::from(format!("{text}\n"))));

        *response.status_mut() = self.status();
        response
            .headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static("text/plain; charset=utf-8"));

        response
    }
}

impl From<RuntimeError> for Response<Full<Bytes>> {
    fn from(err: RuntimeError) -> Self {
        err.code.into_response(&err.text)
    }
}

/// Converts all errors as `RuntimeError`. Unknown errors are wrapped as internal errors.
pub fn to_runtime_error(err: Error) -> RuntimeError {
    match err.downcast::<RuntimeError>() {
        Ok(rte) => *rte,
        Err(e) => RuntimeError {
            code: HttpError::InternalError,
            text: format!("Internal error: {e}"),
        },
    }
}
