//! Configuration file loading, command-line overrides and validation
//!
//! The file is TOML with a single `[server]` table:
//!
//! ```toml
//! [server]
//! host = "localhost"
//! port = 3307
//! username = "vortex"
//! password = ""
//! data_file = "/tmp/vortex.db"
//! ```
//!
//! Values are read as-is, overridden from the command line, validated, and
//! only then turned into an immutable [`Opts`].

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::opts::{Credentials, Opts, ServerIdentity};

/// Whole configuration file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigFile {
    pub server: ServerSection,
}

/// `[server]` table; every key is optional until validation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,

    /// Wider than `u16` so that an out-of-range port reaches validation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_file: Option<PathBuf>,
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            server: ServerSection {
                host: Some("localhost".to_string()),
                port: Some(3307),
                username: Some("vortex".to_string()),
                password: Some(String::new()),
                data_file: Some(PathBuf::from("/tmp/vortex.db")),
            },
        }
    }
}

/// Values given on the command line; empty strings and port 0 are ignored
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub data_file: Option<PathBuf>,
}

/// `<config dir>/vortex/config.toml`, e.g. `~/.config/vortex/config.toml` on Linux
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("vortex")
        .join("config.toml")
}

/// Read the `[server]` table from a TOML file
pub fn load_config(path: &Path) -> Result<ServerSection> {
    if !path.exists() {
        return Err(Error::BadConfigError(format!(
            "Configuration file not found at {}",
            path.display()
        )));
    }
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::BadConfigError(format!("Failed to read {}: {e}", path.display()))
    })?;
    parse_config(&content)
        .map_err(|e| match e {
            Error::BadConfigError(msg) => {
                Error::BadConfigError(format!("{msg} in {}", path.display()))
            }
            other => other,
        })
}

/// Parse configuration file contents
///
/// A key of the wrong type is reported with the same message validation
/// gives for it, not as a TOML error.
pub fn parse_config(content: &str) -> Result<ServerSection> {
    let mut file: toml::Table = content
        .parse()
        .map_err(|e| Error::BadConfigError(format!("Invalid TOML syntax: {e}")))?;
    let server = match file.remove("server") {
        Some(toml::Value::Table(server)) => server,
        Some(_) => {
            return Err(Error::BadConfigError(
                "'server' must be a table".to_string(),
            ));
        }
        None => {
            return Err(Error::BadConfigError(
                "Missing 'server' section".to_string(),
            ));
        }
    };
    check_key_types(&server)?;
    toml::Value::Table(server)
        .try_into()
        .map_err(|e| Error::BadConfigError(format!("Invalid 'server' section: {e}")))
}

/// Checked in the same order as [`ServerSection::validate`]
fn check_key_types(server: &toml::Table) -> Result<()> {
    match server.get("port") {
        None | Some(toml::Value::Integer(_)) => {}
        Some(port) => {
            let shown = port.as_str().map_or_else(|| port.to_string(), str::to_string);
            return Err(Error::BadConfigError(format!(
                "Invalid port: {shown} (must be 1-65535)"
            )));
        }
    }
    for (key, message) in [
        ("host", "Host must be a string"),
        ("data_file", "Data file path must be a string"),
        ("username", "Username must be a string"),
        ("password", "Password must be a string"),
    ] {
        if server.get(key).is_some_and(|value| !value.is_str()) {
            return Err(Error::BadConfigError(message.to_string()));
        }
    }
    Ok(())
}

/// Write the default configuration file unless one already exists
///
/// Returns whether a file was written. Parent directories are created.
pub fn create_default_config(path: &Path) -> Result<bool> {
    if path.exists() {
        tracing::debug!(path = %path.display(), "config file already exists");
        return Ok(false);
    }

    let fail = |e: &dyn std::fmt::Display| {
        Error::BadConfigError(format!(
            "Failed to create config file at {}: {e}",
            path.display()
        ))
    };

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| fail(&e))?;
    }
    let content = toml::to_string_pretty(&ConfigFile::default()).map_err(|e| fail(&e))?;
    std::fs::write(path, content).map_err(|e| fail(&e))?;

    tracing::info!(path = %path.display(), "created default config file");
    Ok(true)
}

impl ServerSection {
    /// Replace file values with any non-empty command-line value
    pub fn apply(&mut self, overrides: &ConfigOverrides) {
        if let Some(host) = overrides.host.as_ref().filter(|h| !h.is_empty()) {
            self.host = Some(host.clone());
        }
        if let Some(port) = overrides.port.filter(|p| *p != 0) {
            self.port = Some(i64::from(port));
        }
        if let Some(username) = overrides.username.as_ref().filter(|u| !u.is_empty()) {
            self.username = Some(username.clone());
        }
        if let Some(password) = overrides.password.as_ref().filter(|p| !p.is_empty()) {
            self.password = Some(password.clone());
        }
        if let Some(data_file) = overrides
            .data_file
            .as_ref()
            .filter(|f| !f.as_os_str().is_empty())
        {
            self.data_file = Some(data_file.clone());
        }
    }

    /// Check every value, reporting the first problem found
    pub fn validate(&self) -> Result<()> {
        self.port()?;
        if self.host.as_deref().is_none_or(str::is_empty) {
            return Err(Error::BadConfigError("Host cannot be empty".to_string()));
        }
        if self
            .data_file
            .as_deref()
            .is_none_or(|f| f.as_os_str().is_empty())
        {
            return Err(Error::BadConfigError(
                "Data file path cannot be empty".to_string(),
            ));
        }
        if self.username.is_none() {
            return Err(Error::BadConfigError(
                "Username must be a string".to_string(),
            ));
        }
        if self.password.is_none() {
            return Err(Error::BadConfigError(
                "Password must be a string".to_string(),
            ));
        }
        Ok(())
    }

    fn port(&self) -> Result<u16> {
        self.port
            .and_then(|p| u16::try_from(p).ok())
            .filter(|p| *p != 0)
            .ok_or_else(|| {
                let shown = self
                    .port
                    .map_or_else(|| "None".to_string(), |p| p.to_string());
                Error::BadConfigError(format!("Invalid port: {shown} (must be 1-65535)"))
            })
    }

    /// Validate and build the server options
    pub fn into_opts(self) -> Result<Opts> {
        self.validate()?;
        let port = self.port()?;
        let (Some(host), Some(username), Some(password), Some(data_file)) =
            (self.host, self.username, self.password, self.data_file)
        else {
            return Err(Error::BadConfigError("Incomplete configuration".to_string()));
        };

        Ok(Opts {
            identity: ServerIdentity {
                host,
                port,
                credentials: Credentials::new(username, Some(password)),
                ..ServerIdentity::default()
            },
            data_file,
            ..Opts::default()
        })
    }
}
