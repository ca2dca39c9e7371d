//! secrets::file_store
//!
//! File-based secret storage.
//!
//! # Security
//!
//! - Secrets are stored in `~/.ridgeline/secrets.toml`
//! - File permissions are set to 0600 on Unix (owner read/write only)
//! - All writes are atomic (write to temp file, then rename)
//! - Secrets are NEVER logged, printed, or included in error messages
//!
//! # Example
//!
//! ```ignore
//! use ridgeline::secrets::{FileSecretStore, SecretStore};
//!
//! let store = FileSecretStore::new()?;
//! store.set("github.pat", "ghp_xxxx...")?;
//!
//! if let Some(token) = store.get("github.pat")? {
//!     // Use token...
//! }
//! ```

use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

use super::traits::{SecretError, SecretStore};

/// File-based secret storage.
///
/// Stores secrets in a TOML file at `~/.ridgeline/secrets.toml`.
/// This is the default secret store for Ridgeline.
///
/// # Security Considerations
///
/// - On Unix, file permissions are set to 0600 (owner read/write only)
/// - Writes are atomic (write to temp file, then rename)
/// - Secrets are never included in error messages or logs
///
/// # Example
///
/// ```ignore
/// use ridgeline::secrets::{FileSecretStore, SecretStore};
///
/// let store = FileSecretStore::new()?;
///
/// // Store a token
/// store.set("github.pat", "ghp_xxxxx...")?;
///
/// // Retrieve it
/// if let Some(token) = store.get("github.pat")? {
///     println!("Token found (not printing it!)");
/// }
///
/// // Delete when done
/// store.delete("github.pat")?;
/// ```
#[derive(Debug)]
pub struct FileSecretStore {
    /// Path to the secrets file
    path: PathBuf,
}

impl FileSecretStore {
    /// Create a new file secret store at the default location.
    ///
    /// The default location is `~/.ridgeline/secrets.toml`.
    ///
    /// # Errors
    ///
    /// Returns an error if the home directory cannot be determined.
    pub fn new() -> Result<Self, SecretError> {
        let home = dirs::home_dir()
            .ok_or_else(|| SecretError::ReadError("cannot determine home directory".into()))?;
        let path = home.join(".ridgeline").join("secrets.toml");
        Ok(Self { path })
    }

    /// Create a file secret store at a custom path.
    ///
    /// This is primarily useful for testing.
    pub fn with_path(path: PathBuf) -> Self {
        Self { path }
    }

    /// Get the path to the secrets file.
    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    /// Read all secrets from the file.
    fn read_secrets(&self) -> Result<HashMap<String, String>, SecretError> {
        if !self.path.exists() {
            return Ok(HashMap::new());
        }

        let content = fs::read_to_string(&self.path)
            .map_err(|e| SecretError::ReadError(format!("cannot read secrets file: {}", e)))?;

        // Parse as TOML
        let secrets: HashMap<String, String> = toml::from_str(&content)
            .map_err(|e| SecretError::ReadError(format!("cannot parse secrets file: {}", e)))?;

        Ok(secrets)
    }

    /// Write secrets to the file with atomic write and proper permissions.
    fn write_secrets(&self, secrets: &HashMap<String, String>) -> Result<(), SecretError> {
        // Ensure parent directory exists
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| SecretError::WriteError(format!("cannot create directory: {}", e)))?;
        }

        // Serialize to TOML
        let content = toml::to_string_pretty(secrets)
            .map_err(|e| SecretError::WriteError(format!("cannot serialize secrets: {}", e)))?;

        // Write to a temp file first for atomicity
        let temp_path = self.path.with_extension("tmp");

        // Create and write to temp file
        {
            let mut file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(&temp_path)
                .map_err(|e| SecretError::WriteError(format!("cannot create temp file: {}", e)))?;

            // Set restrictive permissions BEFORE writing content (Unix only)
            #[cfg(unix)]
            {
                let permissions = fs::Permissions::from_mode(0o600);
                file.set_permissions(permissions).map_err(|e| {
                    SecretError::WriteError(format!("cannot set permissions: {}", e))
                })?;
            }

            // Write content
            file.write_all(content.as_bytes())
                .map_err(|e| SecretError::WriteError(format!("cannot write secrets: {}", e)))?;

            // Sync to disk
            file.sync_all()
                .map_err(|e| SecretError::WriteError(format!("cannot sync to disk: {}", e)))?;
        }

        // Atomic rename
        fs::rename(&temp_path, &self.path)
            .map_err(|e| SecretError::WriteError(format!("cannot rename temp file: {}", e)))?;

        Ok(())
    }

    /// Verify file permissions are correct (Unix only).
    ///
    /// Returns true if the file doesn't exist or has 0600 permissions.
    #[cfg(unix)]
    pub fn verify_permissions(&self) -> Result<bool, SecretError> {
        if !self.path.exists() {
            return Ok(true);
        }

        let metadata = fs::metadata(&self.path)
            .map_err(|e| SecretError::ReadError(format!("cannot read file metadata: {}", e)))?;

        let mode = metadata.permissions().mode() & 0o777;
        Ok(mode == 0o600)
    }

    /// Verify file permissions are correct (non-Unix always returns true).
    #[cfg(not(unix))]
    pub fn verify_permissions(&self) -> Result<bool, SecretError> {
        Ok(true)
    }
}

impl SecretStore for FileSecretStore {
    fn get(&self, key: &str) -> Result<Option<String>, SecretError> {
        let secrets = self.read_secrets()?;
        Ok(secrets.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), SecretError> {
        let mut secrets = self.read_secrets()?;
        secrets.insert(key.to_string(), value.to_string());
        self.write_secrets(&secrets)
    }

    fn delete(&self, key: &str) -> Result<(), SecretError> {
        let mut secrets = self.read_secrets()?;
        secrets.remove(key);
        self.write_secrets(&secrets)
    }
}
