//! Session credential storage.
//!
//! Stores the token pair and the cached user record in
//! `<base>/credentials.json` with restricted permissions (0600).
//! Tokens are never logged or displayed in full.
//!
//! Every write replaces the whole document, so the access and refresh
//! tokens can never be observed half-updated.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use anyhow::{Context, Result};
use plaza_types::{RefreshedToken, TokenPair, User};
use serde::{Deserialize, Serialize};

use crate::config::paths;

/// On-disk credentials document.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredSession {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// Cached user record, refreshed on restore and login.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,
}

impl StoredSession {
    fn is_empty(&self) -> bool {
        self.access_token.is_none() && self.refresh_token.is_none() && self.user.is_none()
    }
}

/// Durable key/value store for the session credentials.
///
/// File-backed stores write through on every mutation; in-memory stores
/// keep the same semantics without touching disk.
#[derive(Debug)]
pub struct CredentialStore {
    path: Option<PathBuf>,
    state: Mutex<StoredSession>,
}

impl CredentialStore {
    /// Opens the store at the default location (`<home>/credentials.json`).
    ///
    /// # Errors
    /// Returns an error if an existing file cannot be read or parsed.
    pub fn open_default() -> Result<Self> {
        Self::open(paths::credentials_path())
    }

    /// Opens a file-backed store. A missing file is an empty store.
    ///
    /// # Errors
    /// Returns an error if an existing file cannot be read or parsed.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let state = Self::read_file(&path)?;
        Ok(Self {
            path: Some(path),
            state: Mutex::new(state),
        })
    }

    /// Creates a store that lives only in memory.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            state: Mutex::new(StoredSession::default()),
        }
    }

    /// Returns the backing file, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Returns the token pair when both tokens are present.
    pub fn load(&self) -> Option<TokenPair> {
        let state = self.lock();
        match (&state.access_token, &state.refresh_token) {
            (Some(access), Some(refresh)) => Some(TokenPair {
                access: access.clone(),
                refresh: refresh.clone(),
            }),
            _ => None,
        }
    }

    pub fn access_token(&self) -> Option<String> {
        self.lock().access_token.clone()
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.lock().refresh_token.clone()
    }

    pub fn cached_user(&self) -> Option<User> {
        self.lock().user.clone()
    }

    /// Persists a fresh token pair.
    ///
    /// # Errors
    /// Returns an error if the file cannot be written; memory is left unchanged.
    pub fn save(&self, tokens: &TokenPair) -> Result<()> {
        self.update(|state| {
            state.access_token = Some(tokens.access.clone());
            state.refresh_token = Some(tokens.refresh.clone());
        })
    }

    /// Stores the result of a token refresh. The refresh token is kept
    /// unless the backend rotated it.
    ///
    /// # Errors
    /// Returns an error if the file cannot be written.
    pub fn update_access(&self, refreshed: &RefreshedToken) -> Result<()> {
        self.update(|state| {
            state.access_token = Some(refreshed.access.clone());
            if let Some(refresh) = &refreshed.refresh {
                state.refresh_token = Some(refresh.clone());
            }
        })
    }

    /// Caches the current user record.
    ///
    /// # Errors
    /// Returns an error if the file cannot be written.
    pub fn save_user(&self, user: &User) -> Result<()> {
        self.update(|state| state.user = Some(user.clone()))
    }

    /// Removes tokens and the cached user together.
    /// Returns true if anything was stored.
    ///
    /// Memory is always emptied, even when the file cannot be removed.
    ///
    /// # Errors
    /// Returns an error if the file cannot be removed.
    pub fn clear(&self) -> Result<bool> {
        let mut state = self.lock();
        let had_any = !std::mem::take(&mut *state).is_empty();
        if let Some(path) = &self.path
            && path.exists()
        {
            fs::remove_file(path)
                .with_context(|| format!("Failed to remove {}", path.display()))?;
        }
        Ok(had_any)
    }

    fn lock(&self) -> MutexGuard<'_, StoredSession> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Applies `change` to a copy, persists it, then swaps it in.
    fn update(&self, change: impl FnOnce(&mut StoredSession)) -> Result<()> {
        let mut state = self.lock();
        let mut next = state.clone();
        change(&mut next);
        if let Some(path) = &self.path {
            Self::write_file(path, &next)?;
        }
        *state = next;
        Ok(())
    }

    fn read_file(path: &Path) -> Result<StoredSession> {
        if !path.exists() {
            return Ok(StoredSession::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read credentials from {}", path.display()))?;
        if contents.trim().is_empty() {
            return Ok(StoredSession::default());
        }

        serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse credentials from {}", path.display()))
    }

    /// Writes to a sibling temp file and renames it over the target.
    /// `tempfile` creates the file with 0600 on unix.
    fn write_file(path: &Path, session: &StoredSession) -> Result<()> {
        let parent = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;

        let contents =
            serde_json::to_string_pretty(session).context("Failed to serialize credentials")?;

        let mut file = tempfile::NamedTempFile::new_in(parent)
            .with_context(|| format!("Failed to create temp file in {}", parent.display()))?;
        file.write_all(contents.as_bytes())
            .with_context(|| format!("Failed to write credentials for {}", path.display()))?;
        file.persist(path)
            .with_context(|| format!("Failed to replace {}", path.display()))?;
        Ok(())
    }
}

/// Returns a masked version of a token for display (first 12 chars + ...).
pub fn mask_token(token: &str) -> String {
    if token.len() <= 16 || !token.is_char_boundary(12) {
        return "***".to_string();
    }
    format!("{}...", &token[..12])
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;

    fn pair(access: &str, refresh: &str) -> TokenPair {
        TokenPair {
            access: access.to_string(),
            refresh: refresh.to_string(),
        }
    }

    fn user() -> User {
        User {
            id: 1,
            username: "ana".to_string(),
            email: "ana@example.com".to_string(),
            first_name: "Ana".to_string(),
            last_name: "Lima".to_string(),
            bio: None,
            profile_picture: None,
            joined_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        }
    }

    /// Test: save then reopen from disk yields the same pair and user.
    #[test]
    fn test_file_store_persists_across_open() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");

        let store = CredentialStore::open(&path).unwrap();
        store.save(&pair("access-1", "refresh-1")).unwrap();
        store.save_user(&user()).unwrap();

        let reopened = CredentialStore::open(&path).unwrap();
        assert_eq!(reopened.load(), Some(pair("access-1", "refresh-1")));
        assert_eq!(reopened.cached_user(), Some(user()));
    }

    /// Test: a refresh keeps the refresh token unless rotated.
    #[test]
    fn test_update_access_keeps_or_rotates_refresh() {
        let store = CredentialStore::in_memory();
        store.save(&pair("a1", "r1")).unwrap();

        store
            .update_access(&RefreshedToken {
                access: "a2".to_string(),
                refresh: None,
            })
            .unwrap();
        assert_eq!(store.load(), Some(pair("a2", "r1")));

        store
            .update_access(&RefreshedToken {
                access: "a3".to_string(),
                refresh: Some("r2".to_string()),
            })
            .unwrap();
        assert_eq!(store.load(), Some(pair("a3", "r2")));
    }

    #[test]
    fn test_load_requires_both_tokens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        fs::write(&path, r#"{"access_token": "only-access"}"#).unwrap();

        let store = CredentialStore::open(&path).unwrap();
        assert_eq!(store.access_token().as_deref(), Some("only-access"));
        assert!(store.load().is_none());
    }

    /// Test: clear removes the file and reports whether anything was stored.
    #[test]
    fn test_clear_removes_everything() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        let store = CredentialStore::open(&path).unwrap();
        store.save(&pair("a", "r")).unwrap();
        store.save_user(&user()).unwrap();
        assert!(path.exists());

        assert!(store.clear().unwrap());
        assert!(!path.exists());
        assert!(store.load().is_none());
        assert!(store.cached_user().is_none());

        assert!(!store.clear().unwrap());
    }

    /// Test: a file that cannot be removed still leaves no token in memory.
    #[test]
    fn test_clear_failure_still_drops_tokens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        let store = CredentialStore::open(&path).unwrap();
        store.save(&pair("a", "r")).unwrap();
        store.save_user(&user()).unwrap();

        // A directory in place of the file makes `remove_file` fail.
        fs::remove_file(&path).unwrap();
        fs::create_dir(&path).unwrap();

        assert!(store.clear().is_err());
        assert!(store.access_token().is_none());
        assert!(store.refresh_token().is_none());
        assert!(store.cached_user().is_none());
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        fs::write(&path, "{not json").unwrap();
        assert!(CredentialStore::open(&path).is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_file_permissions_are_restricted() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        let store = CredentialStore::open(&path).unwrap();
        store.save(&pair("a", "r")).unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_mask_token() {
        assert_eq!(mask_token("eyJhbGciOiJIUzI1NiIsInR5cCI6"), "eyJhbGciOiJI...");
        assert_eq!(mask_token("short"), "***");
    }
}
