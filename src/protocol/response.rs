use crate::constant::{ServerStatusFlags, error_code, sql_state};
use crate::error::{Error, Result};
use crate::protocol::primitive::*;
use zerocopy::byteorder::little_endian::U16 as U16LE;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

/// OK packet response
///
/// Layout: 0x00 followed by
/// - affected_rows: length-encoded integer
/// - last_insert_id: length-encoded integer
/// - status_flags: 2 bytes
/// - warnings: 2 bytes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OkPayload {
    pub affected_rows: u64,
    pub last_insert_id: u64,
    pub status_flags: ServerStatusFlags,
    pub warnings: u16,
}

impl Default for OkPayload {
    fn default() -> Self {
        Self {
            affected_rows: 0,
            last_insert_id: 0,
            status_flags: ServerStatusFlags::SERVER_STATUS_AUTOCOMMIT,
            warnings: 0,
        }
    }
}

/// Write OK packet payload
///
/// The default payload encodes to `00 00 00 02 00 00 00`.
pub fn write_ok(out: &mut Vec<u8>, ok: &OkPayload) {
    write_int_1(out, 0x00);
    write_int_lenenc(out, ok.affected_rows);
    write_int_lenenc(out, ok.last_insert_id);
    write_int_2(out, ok.status_flags.bits());
    write_int_2(out, ok.warnings);
}

/// ERR packet response
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("ERROR {} ({}): {}", self.error_code, self.sql_state, self.message)]
pub struct ErrPayload {
    pub error_code: u16,
    pub sql_state: String,
    pub message: String,
}

impl ErrPayload {
    /// The rejection sent for every authentication failure
    pub fn access_denied(message: impl Into<String>) -> Self {
        Self {
            error_code: error_code::ACCESS_DENIED,
            sql_state: sql_state::INVALID_AUTHORIZATION.to_string(),
            message: message.into(),
        }
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Self {
            error_code: error_code::UNKNOWN_ERROR,
            sql_state: sql_state::GENERAL_ERROR.to_string(),
            message: message.into(),
        }
    }
}

/// Write ERR packet payload: `FF <code LE> '#' <5-byte SQLSTATE> <message>`
pub fn write_err(out: &mut Vec<u8>, err: &ErrPayload) {
    write_int_1(out, 0xFF);
    write_int_2(out, err.error_code);
    write_int_1(out, b'#');
    write_bytes_fix(out, err.sql_state.as_bytes());
    write_bytes_fix(out, err.message.as_bytes());
}

/// Read ERR packet payload
pub fn read_err(payload: &[u8]) -> Result<ErrPayload> {
    let (header, data) = read_int_1(payload)?;
    if header != 0xFF {
        return Err(Error::InvalidPacket);
    }

    let (error_code, data) = read_int_2(data)?;

    // Check for SQL state marker '#'
    let (sql_state, rest) = match data.split_first() {
        Some((b'#', rest)) => {
            let (state_bytes, rest) = read_string_fix(rest, 5)?;
            (String::from_utf8_lossy(state_bytes).to_string(), rest)
        }
        _ => (String::new(), data),
    };

    Ok(ErrPayload {
        error_code,
        sql_state,
        message: String::from_utf8_lossy(rest).to_string(),
    })
}

/// EOF packet response (zero-copy)
///
/// Layout matches MySQL wire protocol after header byte 0xFE:
/// - warnings: 2 bytes (little-endian)
/// - status_flags: 2 bytes (little-endian)
#[repr(C, packed)]
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable)]
pub struct EofPacket {
    pub warnings: U16LE,
    pub status_flags: U16LE,
}

impl EofPacket {
    pub fn new(status_flags: ServerStatusFlags) -> Self {
        Self {
            warnings: U16LE::new(0),
            status_flags: U16LE::new(status_flags.bits()),
        }
    }
}

/// Write EOF packet payload; with autocommit status this is `FE 00 00 02 00`
pub fn write_eof(out: &mut Vec<u8>, eof: &EofPacket) {
    write_int_1(out, 0xFE);
    write_bytes_fix(out, eof.as_bytes());
}
