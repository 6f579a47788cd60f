pub mod resultset;

use crate::constant::CommandByte;
use crate::protocol::decode_text;

/// One decoded client command, bound to the sequence id it arrived with
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub sequence_id: u8,
    pub kind: CommandKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandKind {
    /// COM_QUIT: close without a reply
    Quit,
    /// COM_PING
    Ping,
    /// COM_INIT_DB, answered like `USE`
    InitDb,
    /// Any other prefix: SQL text, trimmed, invalid UTF-8 dropped
    Text(String),
}

/// Where a text command is served from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route<'a> {
    /// `SELECT ...`: executed by the backend, answered with a result set
    Query(&'a str),
    /// `SHOW DATABASES`: answered with a fixed result, never reaches the backend
    ShowDatabases,
    /// `USE ...`: acknowledged with OK, never reaches the backend
    Use,
    /// Everything else: executed and committed by the backend, answered with OK
    Statement(&'a str),
}

/// Decode a command packet payload
///
/// The first byte is the command type; the rest is the SQL text for anything
/// that is not a recognised utility command.
pub fn read_command(sequence_id: u8, payload: &[u8]) -> Command {
    let (command, body) = match payload.split_first() {
        Some((&command, body)) => (CommandByte::from_u8(command), body),
        None => (None, payload),
    };

    let kind = match command {
        Some(CommandByte::Quit) => CommandKind::Quit,
        Some(CommandByte::Ping) => CommandKind::Ping,
        Some(CommandByte::InitDb) => CommandKind::InitDb,
        Some(CommandByte::Query) | None => CommandKind::Text(decode_text(body).trim().to_string()),
    };

    Command { sequence_id, kind }
}

/// Classify SQL text by its leading keyword, ignoring ASCII case
pub fn classify(sql: &str) -> Route<'_> {
    if starts_with_keyword(sql, "SELECT") {
        Route::Query(sql)
    } else if starts_with_keyword(sql, "USE") {
        Route::Use
    } else if sql.eq_ignore_ascii_case("SHOW DATABASES") {
        Route::ShowDatabases
    } else {
        Route::Statement(sql)
    }
}

fn starts_with_keyword(sql: &str, keyword: &str) -> bool {
    sql.as_bytes()
        .get(..keyword.len())
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case(keyword.as_bytes()))
}
