//! Session credentials and their on-disk persistence.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Credentials for the resource endpoint.
///
/// A token obtained from the device flow keeps its `device_code` so the
/// session can be re-authorised when no refresh token was issued.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_code: Option<String>,
}

impl Token {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: None,
            device_code: None,
        }
    }

    #[must_use]
    pub fn with_refresh_token(mut self, refresh_token: impl Into<String>) -> Self {
        self.refresh_token = Some(refresh_token.into());
        self
    }

    #[must_use]
    pub fn with_device_code(mut self, device_code: impl Into<String>) -> Self {
        self.device_code = Some(device_code.into());
        self
    }
}

fn mask(value: &str) -> String {
    match value.get(..5) {
        Some(head) if value.len() > 5 => format!("{head}****"),
        _ if value.is_empty() => "None".to_string(),
        _ => "****".to_string(),
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("Token");
        s.field("access_token", &mask(&self.access_token));
        if let Some(refresh) = &self.refresh_token {
            s.field("refresh_token", &mask(refresh));
        }
        if let Some(code) = &self.device_code {
            s.field("device_code", &mask(code));
        }
        s.finish()
    }
}

/// JSON token file.
#[derive(Debug, Clone)]
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the saved token. Returns `None` when no file exists yet.
    ///
    /// # Errors
    /// Returns [`Error::Token`] if the file cannot be read or parsed.
    pub async fn load(&self) -> Result<Option<Token>> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(Error::Token(format!(
                    "failed to read {}: {e}",
                    self.path.display()
                )));
            }
        };
        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|e| Error::Token(format!("failed to parse {}: {e}", self.path.display())))
    }

    /// Writes `token`, creating parent directories. The file is private to the user on unix.
    ///
    /// # Errors
    /// Returns [`Error::Token`] if serialisation or any filesystem step fails.
    pub async fn save(&self, token: &Token) -> Result<()> {
        let json = serde_json::to_string_pretty(token)
            .map_err(|e| Error::Token(format!("failed to encode token: {e}")))?;
        let write_err =
            |e: std::io::Error| Error::Token(format!("failed to write {}: {e}", self.path.display()));

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
        }
        tokio::fs::write(&self.path, json).await.map_err(write_err)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tokio::fs::set_permissions(&self.path, std::fs::Permissions::from_mode(0o600))
                .await
                .map_err(write_err)?;
        }
        log::debug!("Saved token to {}", self.path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn debug_masks_secrets() {
        let token = Token::new("abcdefghij").with_refresh_token("xyz");
        let shown = format!("{token:?}");
        assert!(shown.contains("abcde****"));
        assert!(!shown.contains("abcdefghij"));
        assert!(shown.contains("refresh_token: \"****\""));
        assert!(!shown.contains("device_code"));
    }

    #[tokio::test]
    async fn missing_file_loads_as_none() {
        let dir = TempDir::new().unwrap();
        let store = TokenStore::new(dir.path().join("token.json"));
        assert!(store.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn save_then_load_creates_parent_dirs() {
        let dir = TempDir::new().unwrap();
        let store = TokenStore::new(dir.path().join("nested/seedr/token.json"));
        let token = Token::new("access").with_device_code("dev");

        store.save(&token).await.unwrap();
        assert_eq!(store.load().await.unwrap(), Some(token));

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(store.path()).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o600);
        }
    }

    #[tokio::test]
    async fn corrupt_file_is_a_token_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("token.json");
        std::fs::write(&path, "not json").unwrap();

        let err = TokenStore::new(path).load().await.unwrap_err();
        assert!(matches!(err, Error::Token(_)));
    }

    #[test]
    fn optional_fields_are_omitted_from_json() {
        let json = serde_json::to_string(&Token::new("a")).unwrap();
        assert_eq!(json, r#"{"access_token":"a"}"#);
    }
}
