//! SSH private key loading
//!
//! The key is loaded once per run and shared by every host session, so a
//! fleet of hundreds of hosts reads and decodes the credential a single time.

use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use russh::keys::{PrivateKey, decode_secret_key, load_secret_key};
use tracing::debug;

/// Where the SSH private key comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeySource {
    /// Explicit path to key file
    Path(PathBuf),
    /// Name of an environment variable holding the base64-encoded key
    Env(String),
}

impl KeySource {
    /// Load the credential described by this source
    ///
    /// # Errors
    /// Returns `KeyError` if the key file is missing, has loose permissions,
    /// cannot be decoded, or the environment variable is unset.
    pub fn load(&self) -> Result<Credential, KeyError> {
        match self {
            KeySource::Path(path) => {
                if !path.exists() {
                    return Err(KeyError::NotFound(path.display().to_string()));
                }
                validate_key_permissions(path)?;
                let key = load_secret_key(path, None)
                    .map_err(|e| KeyError::Decode(e.to_string()))?;
                debug!(path = %path.display(), "loaded SSH key from file");
                Ok(Credential::new(key))
            }
            KeySource::Env(var_name) => {
                let encoded =
                    env::var(var_name).map_err(|_| KeyError::EnvNotSet(var_name.clone()))?;
                let credential = Credential::from_base64(&encoded)?;
                debug!(var = %var_name, "loaded SSH key from environment");
                Ok(credential)
            }
        }
    }
}

/// A decoded private key, cheap to clone across host sessions
#[derive(Debug, Clone)]
pub struct Credential {
    key: Arc<PrivateKey>,
}

impl Credential {
    /// Wrap a decoded key
    pub fn new(key: PrivateKey) -> Self {
        Self { key: Arc::new(key) }
    }

    /// Decode an OpenSSH/PEM key that was base64-encoded as a whole
    ///
    /// # Errors
    /// Returns `KeyError::InvalidBase64` or `KeyError::Decode`
    pub fn from_base64(encoded: &str) -> Result<Self, KeyError> {
        let key_data = base64_decode(encoded).map_err(|_| KeyError::InvalidBase64)?;
        let pem = String::from_utf8(key_data)
            .map_err(|_| KeyError::Decode("key is not valid UTF-8".to_string()))?;
        let key = decode_secret_key(&pem, None).map_err(|e| KeyError::Decode(e.to_string()))?;
        Ok(Self::new(key))
    }

    /// The shared private key
    #[must_use]
    pub fn private_key(&self) -> &Arc<PrivateKey> {
        &self.key
    }
}

/// Key loading errors
#[derive(Debug, thiserror::Error)]
pub enum KeyError {
    #[error("environment variable {0} not set")]
    EnvNotSet(String),

    #[error("invalid base64 encoding")]
    InvalidBase64,

    #[error("key file permissions too open: {0} (should be 600)")]
    BadPermissions(String),

    #[error("key file not found: {0}")]
    NotFound(String),

    #[error("failed to decode private key: {0}")]
    Decode(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn base64_decode(input: &str) -> Result<Vec<u8>, base64::DecodeError> {
    use base64::Engine;
    base64::engine::general_purpose::STANDARD.decode(input.trim())
}

fn validate_key_permissions(path: &Path) -> Result<(), KeyError> {
    use std::os::unix::fs::PermissionsExt;

    let mode = std::fs::metadata(path)?.permissions().mode();

    // group and other bits must be clear
    if mode & 0o77 != 0 {
        return Err(KeyError::BadPermissions(path.display().to_string()));
    }

    Ok(())
}
