use std::path::PathBuf;
use std::time::Duration;

use rand::RngCore;
use smart_default::SmartDefault;

use crate::constant::{
    CHARSET_UTF8MB4, CapabilityFlags, DEFAULT_SERVER_CAPABILITIES, ServerStatusFlags,
};

/// The 20-byte challenge sent in the greeting
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Salt([u8; Salt::LEN]);

impl Salt {
    pub const LEN: usize = 20;

    /// Zero-pads input shorter than 20 bytes and truncates longer input
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let mut salt = [0u8; Self::LEN];
        let n = bytes.len().min(Self::LEN);
        salt[..n].copy_from_slice(&bytes[..n]);
        Self(salt)
    }

    pub fn random() -> Self {
        let mut salt = [0u8; Self::LEN];
        rand::thread_rng().fill_bytes(&mut salt);
        Self(salt)
    }

    pub fn as_bytes(&self) -> &[u8; Self::LEN] {
        &self.0
    }
}

// Keep the challenge out of logs.
impl std::fmt::Debug for Salt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Salt(..)")
    }
}

/// The single account the server accepts
#[derive(Clone, PartialEq, Eq, SmartDefault)]
pub struct Credentials {
    #[default = "vortex"]
    pub username: String,

    /// `None` or an empty password accepts any auth response
    pub password: Option<String>,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: Option<String>) -> Self {
        Self {
            username: username.into(),
            password,
        }
    }

    /// The configured password, if one must be checked
    pub fn password(&self) -> Option<&str> {
        self.password.as_deref().filter(|p| !p.is_empty())
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &self.password().map(|_| "***"))
            .finish()
    }
}

/// What the server advertises about itself, fixed before the listener binds
///
/// Sessions only ever see this behind an `Arc`.
#[derive(Debug, Clone, SmartDefault)]
pub struct ServerIdentity {
    #[default = "127.0.0.1"]
    pub host: String,

    #[default = 3306]
    pub port: u16,

    /// Null-terminated in the greeting
    #[default = "5.7.0-custom"]
    pub server_version: String,

    #[default = "mysql_native_password"]
    pub auth_plugin: String,

    #[default(DEFAULT_SERVER_CAPABILITIES)]
    pub capability_flags: CapabilityFlags,

    #[default(CHARSET_UTF8MB4)]
    pub charset: u8,

    #[default(ServerStatusFlags::SERVER_STATUS_AUTOCOMMIT)]
    pub status_flags: ServerStatusFlags,

    #[default(Salt::random())]
    pub salt: Salt,

    pub credentials: Credentials,
}

/// Socket read deadlines
#[derive(Debug, Clone, Copy, PartialEq, Eq, SmartDefault)]
pub struct Timeouts {
    /// Waiting for the client's handshake response
    #[default(Duration::from_secs(5))]
    pub handshake: Duration,

    /// Waiting for the next command; expiry ends the session quietly
    #[default(Duration::from_secs(30))]
    pub idle: Duration,
}

/// A validated server configuration
///
/// ```rs
/// let mut opts = Opts::default();
/// opts.identity.port = 3307;
/// opts.data_file = "/var/lib/vortex/data.db".into();
/// ```
#[derive(Debug, Clone, SmartDefault)]
pub struct Opts {
    pub identity: ServerIdentity,

    /// SQLite database file every session opens
    #[default(PathBuf::from("/tmp/sqlite.db"))]
    pub data_file: PathBuf,

    pub timeouts: Timeouts,
}

impl Opts {
    /// `host:port` the listener binds to
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.identity.host, self.identity.port)
    }
}
