//! Client configuration

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

fn default_port() -> u16 {
    22
}

/// SFTP connection configuration.
///
/// One value per client instance; there is no process-wide default. A
/// session can be built from it once either `password` or
/// `private_key_path` is set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SftpConfig {
    /// Remote host address
    pub host: String,

    /// SFTP port (default: 22)
    #[serde(default = "default_port")]
    pub port: u16,

    /// Username for authentication
    pub username: String,

    /// Password, when authenticating with one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    /// Path to the private key, when authenticating with one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub private_key_path: Option<PathBuf>,

    /// Optional passphrase decrypting the private key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub private_key_passphrase: Option<String>,

    /// Connect as soon as the configuration is applied to a client
    #[serde(default)]
    pub auto_connect: bool,
}

impl SftpConfig {
    /// Password-authenticated configuration.
    pub fn password(
        host: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            port: default_port(),
            username: username.into(),
            password: Some(password.into()),
            private_key_path: None,
            private_key_passphrase: None,
            auto_connect: false,
        }
    }

    /// Private-key-authenticated configuration.
    pub fn private_key(
        host: impl Into<String>,
        username: impl Into<String>,
        key_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            host: host.into(),
            port: default_port(),
            username: username.into(),
            password: None,
            private_key_path: Some(key_path.into()),
            private_key_passphrase: None,
            auto_connect: false,
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_passphrase(mut self, passphrase: impl Into<String>) -> Self {
        self.private_key_passphrase = Some(passphrase.into());
        self
    }

    pub fn with_auto_connect(mut self, auto_connect: bool) -> Self {
        self.auto_connect = auto_connect;
        self
    }

    fn has_password(&self) -> bool {
        self.password
            .as_deref()
            .is_some_and(|p| !p.trim().is_empty())
    }

    fn has_private_key(&self) -> bool {
        self.private_key_path
            .as_deref()
            .is_some_and(|p| !p.as_os_str().is_empty())
    }

    /// A session can only be built when one credential mechanism resolves.
    pub(crate) fn validate(&self) -> Result<()> {
        if !self.has_password() && !self.has_private_key() {
            return Err(Error::Config(
                "a password or private key must be provided for authentication".into(),
            ));
        }
        Ok(())
    }
}
