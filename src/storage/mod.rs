//! Local persistence for credentials and the cached profile.
//!
//! Two kinds of slots, all under one data directory:
//! - protected slot: the bearer token, written with owner-only permissions
//! - ordinary slots: the serialized profile, the remembered login email
//!   and the selected store id
//!
//! Fixed file names, no versioning, no migration. A missing file reads as
//! `None`; removal is idempotent.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::models::User;

const TOKEN_FILE: &str = "token";
const PROFILE_FILE: &str = "profile.json";
const REMEMBER_EMAIL_FILE: &str = "remember_email";
const ACTIVE_STORE_FILE: &str = "active_store";

/// File-backed credential store.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    dir: PathBuf,
}

impl CredentialStore {
    /// Open (or create) the store rooted at the given directory.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create credential dir {}", dir.display()))?;
        Ok(Self { dir })
    }

    /// Open the store at the platform-default data directory.
    pub fn open_default() -> Result<Self> {
        let dir = crate::config::Config::data_dir()
            .context("could not resolve a data directory for credentials")?;
        Self::new(dir)
    }

    // ── Protected slot: bearer token ─────────────────────────

    pub fn set_token(&self, token: &str) -> Result<()> {
        let path = self.dir.join(TOKEN_FILE);
        std::fs::write(&path, token)
            .with_context(|| format!("failed to write token to {}", path.display()))?;
        restrict_permissions(&path)?;
        tracing::debug!("token persisted");
        Ok(())
    }

    pub fn token(&self) -> Option<String> {
        read_if_found(&self.dir.join(TOKEN_FILE)).filter(|t| !t.is_empty())
    }

    pub fn remove_token(&self) {
        remove_if_found(&self.dir.join(TOKEN_FILE));
    }

    // ── Ordinary slots ───────────────────────────────────────

    pub fn set_profile(&self, user: &User) -> Result<()> {
        let path = self.dir.join(PROFILE_FILE);
        let json = serde_json::to_string(user).context("failed to serialize profile")?;
        std::fs::write(&path, json)
            .with_context(|| format!("failed to write profile to {}", path.display()))?;
        tracing::debug!(email = %user.email, "profile persisted");
        Ok(())
    }

    /// Cached profile, or `None` when absent or unreadable. A corrupt
    /// cache is treated as absent; the next login rewrites it.
    pub fn profile(&self) -> Option<User> {
        let raw = read_if_found(&self.dir.join(PROFILE_FILE))?;
        match serde_json::from_str(&raw) {
            Ok(user) => Some(user),
            Err(err) => {
                tracing::warn!(error = %err, "discarding unreadable cached profile");
                None
            }
        }
    }

    pub fn remove_profile(&self) {
        remove_if_found(&self.dir.join(PROFILE_FILE));
    }

    pub fn set_remember_email(&self, email: &str) -> Result<()> {
        let path = self.dir.join(REMEMBER_EMAIL_FILE);
        std::fs::write(&path, email)
            .with_context(|| format!("failed to write email to {}", path.display()))
    }

    pub fn remember_email(&self) -> Option<String> {
        read_if_found(&self.dir.join(REMEMBER_EMAIL_FILE)).filter(|e| !e.is_empty())
    }

    pub fn remove_remember_email(&self) {
        remove_if_found(&self.dir.join(REMEMBER_EMAIL_FILE));
    }

    /// Persist the selected store id so later processes restore it.
    pub fn set_active_store(&self, store_id: &str) -> Result<()> {
        let path = self.dir.join(ACTIVE_STORE_FILE);
        std::fs::write(&path, store_id)
            .with_context(|| format!("failed to write store selection to {}", path.display()))
    }

    pub fn active_store(&self) -> Option<String> {
        read_if_found(&self.dir.join(ACTIVE_STORE_FILE)).filter(|s| !s.is_empty())
    }

    pub fn remove_active_store(&self) {
        remove_if_found(&self.dir.join(ACTIVE_STORE_FILE));
    }

    /// Remove token, profile and the store selection. The remembered
    /// email survives a logout.
    pub fn clear(&self) {
        self.remove_token();
        self.remove_profile();
        self.remove_active_store();
        tracing::debug!("persisted credentials cleared");
    }
}

fn read_if_found(path: &Path) -> Option<String> {
    match std::fs::read_to_string(path) {
        Ok(contents) => Some(contents),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => None,
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "failed to read credential file");
            None
        }
    }
}

fn remove_if_found(path: &Path) {
    if let Err(err) = std::fs::remove_file(path) {
        if err.kind() != std::io::ErrorKind::NotFound {
            tracing::warn!(path = %path.display(), error = %err, "failed to remove credential file");
        }
    }
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
        .with_context(|| format!("failed to restrict permissions on {}", path.display()))
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> Result<()> {
    Ok(())
}

// ── Tests ────────────────────────────────────────────────────────
