use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};
use tokio::fs;
use tracing::{debug, info, warn};

use crate::cache::token::{Token, TokenContext};
use crate::config::service::StorageConfig;

/// Durable token storage: the token body (JSON) and its issuance timestamp
/// (seconds since epoch as text) live in two separate files.
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    token_path: PathBuf,
    birth_path: PathBuf,
}

impl FileTokenStore {
    pub fn new(token_path: impl Into<PathBuf>, birth_path: impl Into<PathBuf>) -> Self {
        Self { token_path: token_path.into(), birth_path: birth_path.into() }
    }

    pub fn from_config(cfg: &StorageConfig) -> Self {
        Self::new(cfg.token_path.clone(), cfg.token_birth_path.clone())
    }

    pub fn token_path(&self) -> &Path {
        &self.token_path
    }

    pub fn birth_path(&self) -> &Path {
        &self.birth_path
    }

    /// Read the persisted token back.
    ///
    /// Anything missing or unreadable yields `None`: the caller falls back to a
    /// full exchange instead of failing.
    pub async fn load(&self) -> Option<TokenContext> {
        let body = match read_optional(&self.token_path).await {
            Ok(Some(body)) => body,
            Ok(None) => {
                debug!("no persisted token at '{}'", self.token_path.display());
                return None;
            }
            Err(e) => {
                warn!("cannot read persisted token '{}': {}", self.token_path.display(), e);
                return None;
            }
        };

        let birth = match read_optional(&self.birth_path).await {
            Ok(Some(birth)) => birth,
            Ok(None) => {
                warn!(
                    "persisted token '{}' has no issuance timestamp, ignoring it",
                    self.token_path.display()
                );
                return None;
            }
            Err(e) => {
                warn!("cannot read token birth '{}': {}", self.birth_path.display(), e);
                return None;
            }
        };

        let token: Token = match serde_json::from_str(&body) {
            Ok(token) => token,
            Err(e) => {
                warn!("persisted token '{}' is malformed: {}", self.token_path.display(), e);
                return None;
            }
        };

        let issued_at = match parse_birth(&birth) {
            Some(ts) => ts,
            None => {
                warn!("token birth '{}' is not a timestamp: '{}'", self.birth_path.display(), birth.trim());
                return None;
            }
        };

        Some(TokenContext::new(token, issued_at))
    }

    /// Persist the token body first and the issuance timestamp second.
    ///
    /// A crash in between pairs the new body with an older timestamp, which
    /// only makes the token look older than it is.
    pub async fn save(&self, token_context: &TokenContext) -> Result<()> {
        let body = serde_json::to_vec(&token_context.token)?;
        write_atomic(&self.token_path, &body).await?;
        write_atomic(&self.birth_path, token_context.issued_at_unix_ts.to_string().as_bytes()).await?;
        info!(
            "token persisted to '{}', issued at {}",
            self.token_path.display(),
            token_context.issued_at_unix_ts
        );
        Ok(())
    }
}

async fn read_optional(path: &Path) -> std::io::Result<Option<String>> {
    match fs::read_to_string(path).await {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

/// Whole seconds; fractional values written by older tooling are truncated.
fn parse_birth(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    if let Ok(secs) = raw.parse::<i64>() {
        return Some(secs);
    }
    raw.parse::<f64>()
        .ok()
        .filter(|secs| secs.is_finite() && *secs >= 0.0)
        .map(|secs| secs.trunc() as i64)
}

/// tmp file -> 0600 -> rename
async fn write_atomic(path: &Path, content: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await?;
    }
    let file_name = path
        .file_name()
        .ok_or_else(|| anyhow!("'{}' is not a file path", path.display()))?;
    let mut tmp_name = file_name.to_os_string();
    tmp_name.push(".tmp");
    let tmp = path.with_file_name(tmp_name);

    fs::write(&tmp, content).await?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(&tmp, std::fs::Permissions::from_mode(0o600)).await?;
    }
    fs::rename(&tmp, path).await?;
    Ok(())
}
