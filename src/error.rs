use thiserror::Error;

use crate::backend::BackendError;
use crate::protocol::response::ErrPayload;

#[derive(Debug, Error)]
pub enum Error {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Bad config error: {0}")]
    BadConfigError(String),

    #[error("Invalid packet")]
    InvalidPacket,

    #[error("Payload of {0} bytes exceeds the 0xFFFFFF packet size limit")]
    PayloadTooLarge(usize),

    #[error("Client does not support plugin authentication")]
    UnsupportedAuthPlugin,

    #[error("Malformed handshake response: {0}")]
    MalformedHandshake(&'static str),

    #[error("Access denied for user '{0}'")]
    AccessDenied(String),

    /// A value, column name or column count does not fit a 1-byte length field
    #[error("{what} of {len} bytes does not fit a 1-byte length field")]
    FieldTooLong { what: &'static str, len: usize },

    #[error("Backend error: {0}")]
    BackendError(#[from] BackendError),
}

impl Error {
    /// The ERR packet a client should see before the session is closed.
    ///
    /// I/O failures have no ERR packet: the connection is already unusable.
    pub fn err_payload(&self) -> Option<ErrPayload> {
        match self {
            Error::UnsupportedAuthPlugin => Some(ErrPayload::access_denied(
                "Authentication plugin not supported",
            )),
            Error::MalformedHandshake(_) | Error::AccessDenied(_) => {
                Some(ErrPayload::access_denied("Access denied"))
            }
            Error::BackendError(err) => Some(ErrPayload::unknown(err.to_string())),
            Error::PayloadTooLarge(_) | Error::FieldTooLong { .. } | Error::InvalidPacket => {
                Some(ErrPayload::unknown(self.to_string()))
            }
            Error::IoError(_) | Error::BadConfigError(_) => None,
        }
    }

    /// Whether the error came from a malformed or oversized frame or field
    pub fn is_protocol(&self) -> bool {
        matches!(
            self,
            Error::InvalidPacket
                | Error::PayloadTooLarge(_)
                | Error::UnsupportedAuthPlugin
                | Error::MalformedHandshake(_)
                | Error::FieldTooLong { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn protocol_errors_are_told_apart_from_backend_and_io() {
        assert!(Error::InvalidPacket.is_protocol());
        assert!(Error::PayloadTooLarge(0x100_0000).is_protocol());
        assert!(Error::UnsupportedAuthPlugin.is_protocol());
        assert!(Error::FieldTooLong { what: "value", len: 256 }.is_protocol());

        assert!(!Error::BackendError(BackendError::new("no such table: t")).is_protocol());
        assert!(!Error::from(std::io::Error::from(std::io::ErrorKind::BrokenPipe)).is_protocol());
        assert!(!Error::AccessDenied("root".to_string()).is_protocol());
    }
}
