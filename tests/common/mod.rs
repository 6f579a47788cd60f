//! Client-side helpers shared by the integration tests

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::io::{AsyncRead, AsyncWrite};

use vortex::backend::{Backend, BackendError, Cursor, ResultSet};
use vortex::constant::CapabilityFlags;
use vortex::protocol::connection::{USERNAME_OFFSET, scramble_native_password};
use vortex::protocol::packet::{self, PacketHeader, SequenceId};
use vortex::protocol::primitive::{write_int_1, write_int_4};
use vortex::tokio::PacketStream;
use vortex::{Credentials, Salt, ServerIdentity};

pub const OK: &[u8] = b"\x00\x00\x00\x02\x00\x00\x00";
pub const EOF: &[u8] = b"\xfe\x00\x00\x02\x00";
pub const ACCESS_DENIED: &[u8] = b"\xff\x04\x04#28000Access denied";
pub const PLUGIN_NOT_SUPPORTED: &[u8] = b"\xff\x04\x04#28000Authentication plugin not supported";

pub const TEST_SALT: &[u8; 20] = b"ABCDEFGHIJKLMNOPQRST";

pub fn identity(password: Option<&str>) -> Arc<ServerIdentity> {
    Arc::new(ServerIdentity {
        salt: Salt::from_bytes(TEST_SALT),
        credentials: Credentials::new("vortex", password.map(str::to_string)),
        ..ServerIdentity::default()
    })
}

/// Handshake response payload with the username at raw packet offset 23
pub fn handshake_response(caps: CapabilityFlags, username: &[u8], auth: &[u8]) -> Vec<u8> {
    let mut payload = Vec::new();
    write_int_4(&mut payload, caps.bits());
    write_int_4(&mut payload, 0x0100_0000);
    write_int_1(&mut payload, 33);
    payload.resize(USERNAME_OFFSET - PacketHeader::SIZE, 0);
    payload.extend_from_slice(username);
    payload.push(0);
    payload.push(auth.len() as u8);
    payload.extend_from_slice(auth);
    payload
}

pub fn client_caps() -> CapabilityFlags {
    CapabilityFlags::CLIENT_PROTOCOL_41
        | CapabilityFlags::CLIENT_TRANSACTIONS
        | CapabilityFlags::CLIENT_PLUGIN_AUTH
}

/// Salt carried in a protocol-10 greeting payload
pub fn salt_from_greeting(greeting: &[u8]) -> Salt {
    let version_end = greeting[1..].iter().position(|&b| b == 0).unwrap() + 1;
    let fixed = &greeting[version_end + 1..];
    let mut salt = fixed[4..12].to_vec();
    // conn id (4) + salt (8) + filler + caps + charset + status + caps + len + 10 zeros
    salt.extend_from_slice(&fixed[31..43]);
    Salt::from_bytes(&salt)
}

/// Minimal MySQL client speaking raw packets
pub struct TestClient<S> {
    stream: PacketStream<S>,
    buffer: Vec<u8>,
}

impl<S: AsyncRead + AsyncWrite + Unpin> TestClient<S> {
    pub fn new(stream: S) -> Self {
        Self {
            stream: PacketStream::new(stream),
            buffer: Vec::new(),
        }
    }

    pub async fn send(&mut self, payload: &[u8], seq: u8) {
        self.stream
            .write_packet(payload, &mut SequenceId::new(seq))
            .await
            .unwrap();
    }

    /// Send a text command (COM_QUERY prefix) with sequence id 0
    pub async fn query(&mut self, sql: &str) {
        let mut payload = vec![0x03];
        payload.extend_from_slice(sql.as_bytes());
        self.send(&payload, 0).await;
    }

    /// Next packet as `(sequence_id, payload)`, `None` once the server closed
    pub async fn recv(&mut self) -> Option<(u8, Vec<u8>)> {
        if !self.stream.read_frame(&mut self.buffer).await.unwrap() {
            return None;
        }
        let (_, seq, payload) = packet::decode(&self.buffer).unwrap();
        Some((seq, payload.to_vec()))
    }

    pub async fn expect(&mut self) -> (u8, Vec<u8>) {
        self.recv().await.expect("server closed the connection")
    }

    /// Read the greeting and log in; panics unless the server answers OK
    pub async fn login(&mut self, password: Option<&str>) {
        let (seq, greeting) = self.expect().await;
        assert_eq!(seq, 0);
        let auth = match password {
            Some(password) => {
                scramble_native_password(password, &salt_from_greeting(&greeting)).to_vec()
            }
            None => Vec::new(),
        };
        self.send(&handshake_response(client_caps(), b"vortex", &auth), 1)
            .await;
        assert_eq!(self.expect().await, (2, OK.to_vec()));
    }

    /// Read a whole text result set that began with sequence id `first_seq`
    pub async fn read_result_set(&mut self, first_seq: u8) -> ResultSet {
        let mut seq = first_seq;
        let mut next = |actual: u8| {
            assert_eq!(actual, seq, "sequence ids must be consecutive");
            seq = seq.wrapping_add(1);
        };

        let (s, count) = self.expect().await;
        next(s);
        assert_eq!(count.len(), 1);

        let mut columns = Vec::new();
        for _ in 0..count[0] {
            let (s, def) = self.expect().await;
            next(s);
            assert_eq!(&def[..7], b"\x03def\x00\x00\x00");
            let len = def[7] as usize;
            columns.push(String::from_utf8(def[8..8 + len].to_vec()).unwrap());
        }

        let (s, eof) = self.expect().await;
        next(s);
        assert_eq!(eof, EOF);

        let mut rows = Vec::new();
        loop {
            let (s, payload) = self.expect().await;
            next(s);
            if payload == EOF {
                break;
            }
            let mut row = Vec::new();
            let mut rest = payload.as_slice();
            while let Some((&len, tail)) = rest.split_first() {
                let (value, tail) = tail.split_at(len as usize);
                row.push(String::from_utf8(value.to_vec()).unwrap());
                rest = tail;
            }
            rows.push(row);
        }

        ResultSet { columns, rows }
    }
}

/// What a [`ScriptedBackend`] has seen
#[derive(Debug, Default)]
pub struct Journal {
    pub opened: usize,
    pub closed: usize,
    pub queries: Vec<String>,
    pub statements: Vec<String>,
}

/// In-memory backend answering queries from a fixed script
#[derive(Clone, Default)]
pub struct ScriptedBackend {
    results: Arc<HashMap<String, ResultSet>>,
    journal: Arc<Mutex<Journal>>,
    fail_open: bool,
}

impl ScriptedBackend {
    pub fn with_results<I>(results: I) -> Self
    where
        I: IntoIterator<Item = (&'static str, ResultSet)>,
    {
        Self {
            results: Arc::new(
                results
                    .into_iter()
                    .map(|(sql, result)| (sql.to_string(), result))
                    .collect(),
            ),
            ..Self::default()
        }
    }

    pub fn failing_open() -> Self {
        Self {
            fail_open: true,
            ..Self::default()
        }
    }

    pub fn opened(&self) -> usize {
        self.journal.lock().unwrap().opened
    }

    pub fn closed(&self) -> usize {
        self.journal.lock().unwrap().closed
    }

    pub fn queries(&self) -> Vec<String> {
        self.journal.lock().unwrap().queries.clone()
    }

    pub fn statements(&self) -> Vec<String> {
        self.journal.lock().unwrap().statements.clone()
    }
}

impl Backend for ScriptedBackend {
    type Cursor = ScriptedCursor;

    fn open(&self) -> Result<ScriptedCursor, BackendError> {
        if self.fail_open {
            return Err(BackendError::new("unable to open database file"));
        }
        self.journal.lock().unwrap().opened += 1;
        Ok(ScriptedCursor {
            results: self.results.clone(),
            journal: self.journal.clone(),
        })
    }
}

pub struct ScriptedCursor {
    results: Arc<HashMap<String, ResultSet>>,
    journal: Arc<Mutex<Journal>>,
}

impl Cursor for ScriptedCursor {
    fn query(&mut self, sql: &str) -> Result<ResultSet, BackendError> {
        self.journal.lock().unwrap().queries.push(sql.to_string());
        self.results
            .get(sql)
            .cloned()
            .ok_or_else(|| BackendError::new(format!("no such table: {sql}")))
    }

    fn execute(&mut self, sql: &str) -> Result<(), BackendError> {
        if sql.contains("FAIL") {
            return Err(BackendError::new("UNIQUE constraint failed: t.id"));
        }
        self.journal.lock().unwrap().statements.push(sql.to_string());
        Ok(())
    }

    fn close(self) {
        self.journal.lock().unwrap().closed += 1;
    }
}

pub fn result_set(columns: &[&str], rows: &[&[&str]]) -> ResultSet {
    ResultSet {
        columns: columns.iter().map(|c| c.to_string()).collect(),
        rows: rows
            .iter()
            .map(|row| row.iter().map(|v| v.to_string()).collect())
            .collect(),
    }
}
