use std::fmt;

/// Error answered by the server. `code` is the HTTP status of the failed call.
#[derive(Clone, Debug)]
pub struct ClientError {
    pub code: u16,
    pub message: String,
}

impl std::fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientError")
            .field("code", &self.code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for ClientError {}

/// Shorthand for creating errors in async functions.
#[macro_export]
macro_rules! client_error {
    ($code:expr, $message:expr) => {
        ::std::result::Result::Err(anyhow::Error::new($crate::ClientError {
            code: $code,
            message: ::std::string::String::from($message),
        }))
    };
}
