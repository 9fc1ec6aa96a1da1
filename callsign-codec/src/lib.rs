//! Text frames exchanged between relay clients and the relay server.
//!
//! Every frame is a single WebSocket text message of the form `name:payload`.
//! Inbound the name is the recipient, outbound it is the sender (or
//! [`frame::NOTICE_SENDER`] for server notices). The `frame` module holds the
//! parsing and formatting functions.
pub mod frame;


use std::fmt;

/// Type alias for a sync and send error.
pub type Error = Box<dyn std::error::Error + Send + Sync>;
/// Type alias for a simplified Result with Error.
pub type Result<T> = std::result::Result<T, Error>;

/// Frame error code when the frame doesn't have the `name:payload` shape.
pub const FRAME_ERROR: u16 = 501;

/// Error struct used by the crate.
#[derive(Debug)]
pub struct FrameError {
    pub code: u16,
    pub message: String,
}

impl fmt::Display for FrameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", &self)
    }
}

impl std::error::Error for FrameError {}

/// Shorthand for making errors with error code and error message.
///
/// ```no_run
/// use callsign_codec::frame_error;
///
/// fn sender(frame: &str) -> callsign_codec::Result<&str> {
///     match frame.split_once(':') {
///         Some((from, _)) => Ok(from),
///         None => frame_error!(callsign_codec::FRAME_ERROR, "Frame has no sender"),
///     }
/// }
/// ```
#[macro_export]
macro_rules! frame_error {
    ($code:expr, $message:expr) => {
        ::std::result::Result::Err(Box::new($crate::FrameError {
            code: $code,
            message: ::std::string::String::from($message),
        }))
    };
}
