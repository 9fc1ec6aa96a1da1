//! Parsing inbound directives and formatting outbound frames.
use crate::{frame_error, Result, FRAME_ERROR};

/// Separator between the name and the payload of a frame.
pub const SEPARATOR: char = ':';

/// Sender name of the frames generated by the server itself.
pub const NOTICE_SENDER: &str = "server";

/// An inbound frame sent by a client: deliver `message` to `recipient`.
///
/// Both parts borrow from the frame text. The recipient may be empty, it is
/// just a name nobody can be registered under.
#[derive(Debug, PartialEq, Eq)]
pub struct Directive<'a> {
    pub recipient: &'a str,
    pub message: &'a str,
}

/// Split an inbound frame on the first separator. Frames without separator are not directives.
pub fn parse_directive(frame: &str) -> Option<Directive<'_>> {
    frame
        .split_once(SEPARATOR)
        .map(|(recipient, message)| Directive { recipient, message })
}

/// The frame a client sends to have `message` relayed to `recipient`.
pub fn directive(recipient: &str, message: &str) -> String {
    format!("{recipient}{SEPARATOR}{message}")
}

/// The frame the recipient gets when `sender` relays `message` to it.
pub fn forward(sender: &str, message: &str) -> String {
    format!("{sender}{SEPARATOR}{message}")
}

/// The frame sent back to the sender when `recipient` has no live connection.
pub fn notice(recipient: &str) -> String {
    forward(NOTICE_SENDER, &format!("Pengguna {recipient} tidak tersambung"))
}

/// An outbound frame as the client sees it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Delivery {
    /// A message relayed from another client.
    Message { from: String, body: String },
    /// A notice generated by the server.
    Notice { text: String },
}

impl Delivery {
    /// Decode a frame sent by the server.
    ///
    /// Notices are recognized by the [`NOTICE_SENDER`] prefix only. Nothing stops a client from
    /// registering under that name, so a message relayed from such a client decodes as a notice.
    pub fn decode(frame: &str) -> Result<Delivery> {
        match frame.split_once(SEPARATOR) {
            Some((NOTICE_SENDER, text)) => Ok(Delivery::Notice { text: text.to_owned() }),
            Some((from, body)) => Ok(Delivery::Message {
                from: from.to_owned(),
                body: body.to_owned(),
            }),
            None => frame_error!(FRAME_ERROR, format!("Frame without sender: {frame:?}")),
        }
    }

    /// Encode the delivery back to the text the server sent.
    #[cfg(test)]
    pub fn encode(&self) -> String {
        match self {
            Delivery::Message { from, body } => forward(from, body),
            Delivery::Notice { text } => forward(NOTICE_SENDER, text),
        }
    }
}
