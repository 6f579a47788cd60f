use crate::backend::ResultSet;
use crate::constant::ServerStatusFlags;
use crate::error::{Error, Result};
use crate::protocol::primitive::*;
use crate::protocol::response::{EofPacket, write_eof};

/// Catalog "def", then empty schema, table and original table
const COLUMN_DEFINITION_HEAD: [u8; 7] = [0x03, b'd', b'e', b'f', 0x00, 0x00, 0x00];

/// Empty original name, then the fixed charset/length/type/flags block
const COLUMN_DEFINITION_TAIL: [u8; 13] = [
    0x00, 0x0c, 0x21, 0x00, 0xff, 0x00, 0x00, 0xfc, 0x00, 0x00, 0x00, 0x00, 0x00,
];

/// Database name reported by `SHOW DATABASES`
pub const DATABASE_NAME: &str = "sqlite3";

/// Write the column count packet payload (a single byte)
pub fn write_column_count(out: &mut Vec<u8>, count: usize) -> Result<()> {
    let count = u8::try_from(count).map_err(|_| Error::FieldTooLong {
        what: "column count",
        len: count,
    })?;
    write_int_1(out, count);
    Ok(())
}

/// Write a column definition packet payload
pub fn write_column_definition(out: &mut Vec<u8>, name: &str) -> Result<()> {
    write_bytes_fix(out, &COLUMN_DEFINITION_HEAD);
    write_bytes_len1(out, "column name", name.as_bytes())?;
    write_bytes_fix(out, &COLUMN_DEFINITION_TAIL);
    Ok(())
}

/// Write a text row packet payload: `(1-byte length, bytes)` per value
pub fn write_text_row(out: &mut Vec<u8>, row: &[String]) -> Result<()> {
    for value in row {
        write_bytes_len1(out, "value", value.as_bytes())?;
    }
    Ok(())
}

/// Encode a result set into its packet payloads, in send order:
/// column count, one definition per column, EOF, one packet per row, EOF.
///
/// Nothing is returned unless every packet could be encoded.
pub fn encode_result_set(result: &ResultSet) -> Result<Vec<Vec<u8>>> {
    let eof = EofPacket::new(ServerStatusFlags::SERVER_STATUS_AUTOCOMMIT);
    let mut packets = Vec::with_capacity(result.columns.len() + result.rows.len() + 3);

    let mut out = Vec::with_capacity(1);
    write_column_count(&mut out, result.columns.len())?;
    packets.push(out);

    for column in &result.columns {
        let mut out = Vec::with_capacity(
            COLUMN_DEFINITION_HEAD.len() + 1 + column.len() + COLUMN_DEFINITION_TAIL.len(),
        );
        write_column_definition(&mut out, column)?;
        packets.push(out);
    }

    let mut out = Vec::with_capacity(5);
    write_eof(&mut out, &eof);
    packets.push(out);

    for row in &result.rows {
        let mut out = Vec::new();
        write_text_row(&mut out, row)?;
        packets.push(out);
    }

    let mut out = Vec::with_capacity(5);
    write_eof(&mut out, &eof);
    packets.push(out);

    Ok(packets)
}

/// The fixed answer to `SHOW DATABASES`
pub fn show_databases() -> ResultSet {
    ResultSet {
        columns: vec!["Database".to_string()],
        rows: vec![vec![DATABASE_NAME.to_string()]],
    }
}
