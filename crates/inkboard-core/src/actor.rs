//! Actor identity resolution.
//!
//! Every edit is attributed to an actor. The authoritative identity comes from
//! the session's authority (a signed-in user); when that is unavailable a local
//! identifier is generated once and persisted so the same client environment
//! keeps the same identity across restarts.

use crate::error::EngineError;
use crate::storage::{BoxFuture, StorageError, StorageResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use uuid::Uuid;

/// File name of the persisted local identity.
pub const LOCAL_ID_FILE: &str = "local_actor_id";

/// Prefix of locally generated actor ids.
pub const LOCAL_ID_PREFIX: &str = "local-";

/// Identity an edit is attributed to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActorId(String);

impl ActorId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a fresh local identity.
    pub fn generate_local() -> Self {
        Self(format!("{}{}", LOCAL_ID_PREFIX, Uuid::new_v4().simple()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_local(&self) -> bool {
        self.0.starts_with(LOCAL_ID_PREFIX)
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ActorId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for ActorId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Errors from the actor authority.
#[derive(Debug, Error)]
pub enum AuthorityError {
    #[error("Authority unreachable: {0}")]
    Unreachable(String),
    #[error("Session expired")]
    SessionExpired,
}

/// Source of the authenticated actor (e.g. the auth session of the hosted backend).
pub trait ActorAuthority {
    /// The signed-in actor, or `None` when nobody is signed in.
    fn current_actor(&self) -> BoxFuture<'_, Result<Option<ActorId>, AuthorityError>>;
}

/// Authority with a fixed answer.
#[derive(Debug, Clone, Default)]
pub struct StaticAuthority {
    actor: Option<ActorId>,
}

impl StaticAuthority {
    pub fn signed_in(actor: impl Into<ActorId>) -> Self {
        Self {
            actor: Some(actor.into()),
        }
    }

    pub fn anonymous() -> Self {
        Self { actor: None }
    }
}

impl ActorAuthority for StaticAuthority {
    fn current_actor(&self) -> BoxFuture<'_, Result<Option<ActorId>, AuthorityError>> {
        let actor = self.actor.clone();
        Box::pin(async move { Ok(actor) })
    }
}

/// Authority that always fails (offline clients).
#[derive(Debug, Clone, Default)]
pub struct OfflineAuthority;

impl ActorAuthority for OfflineAuthority {
    fn current_actor(&self) -> BoxFuture<'_, Result<Option<ActorId>, AuthorityError>> {
        Box::pin(async { Err(AuthorityError::Unreachable("offline".to_string())) })
    }
}

/// Durable slot for the locally generated identity.
pub trait LocalIdStore {
    fn load(&self) -> StorageResult<Option<String>>;
    fn store(&self, id: &str) -> StorageResult<()>;
}

/// Local identity kept in memory (tests, ephemeral clients).
#[derive(Debug, Default)]
pub struct MemoryIdStore {
    id: Mutex<Option<String>>,
}

impl MemoryIdStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LocalIdStore for MemoryIdStore {
    fn load(&self) -> StorageResult<Option<String>> {
        let id = self
            .id
            .lock()
            .map_err(|e| StorageError::Other(format!("Lock error: {}", e)))?;
        Ok(id.clone())
    }

    fn store(&self, id: &str) -> StorageResult<()> {
        let mut slot = self
            .id
            .lock()
            .map_err(|e| StorageError::Other(format!("Lock error: {}", e)))?;
        *slot = Some(id.to_string());
        Ok(())
    }
}

/// Local identity persisted to a file.
#[derive(Debug, Clone)]
pub struct FileIdStore {
    path: PathBuf,
}

impl FileIdStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Store under the platform data directory.
    ///
    /// On Unix: `~/.local/share/<app_dir>/local_actor_id`
    #[cfg(not(target_arch = "wasm32"))]
    pub fn default_location(app_dir: &str) -> StorageResult<Self> {
        let base = dirs::data_local_dir()
            .or_else(dirs::home_dir)
            .ok_or_else(|| StorageError::Io("Could not determine home directory".to_string()))?;
        Ok(Self::new(base.join(app_dir).join(LOCAL_ID_FILE)))
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }
}

impl LocalIdStore for FileIdStore {
    fn load(&self) -> StorageResult<Option<String>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let raw = fs::read_to_string(&self.path).map_err(|e| {
            StorageError::Io(format!("Failed to read {}: {}", self.path.display(), e))
        })?;
        let id = raw.trim();
        Ok((!id.is_empty()).then(|| id.to_string()))
    }

    fn store(&self, id: &str) -> StorageResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                StorageError::Io(format!("Failed to create {}: {}", parent.display(), e))
            })?;
        }
        fs::write(&self.path, id).map_err(|e| {
            StorageError::Io(format!("Failed to write {}: {}", self.path.display(), e))
        })
    }
}

/// Local identity kept in the browser's `localStorage`.
#[cfg(target_arch = "wasm32")]
#[derive(Debug, Clone)]
pub struct BrowserIdStore {
    key: String,
}

#[cfg(target_arch = "wasm32")]
impl BrowserIdStore {
    pub fn new(app_dir: &str) -> Self {
        Self {
            key: format!("{}_{}", app_dir, LOCAL_ID_FILE),
        }
    }

    fn local_storage() -> StorageResult<web_sys::Storage> {
        let window = web_sys::window()
            .ok_or_else(|| StorageError::Other("No window object".to_string()))?;
        window
            .local_storage()
            .map_err(|e| StorageError::Other(format!("localStorage error: {:?}", e)))?
            .ok_or_else(|| StorageError::Other("localStorage not available".to_string()))
    }
}

#[cfg(target_arch = "wasm32")]
impl LocalIdStore for BrowserIdStore {
    fn load(&self) -> StorageResult<Option<String>> {
        let id = Self::local_storage()?
            .get_item(&self.key)
            .map_err(|e| StorageError::Other(format!("localStorage read failed: {:?}", e)))?;
        Ok(id.filter(|id| !id.trim().is_empty()))
    }

    fn store(&self, id: &str) -> StorageResult<()> {
        Self::local_storage()?
            .set_item(&self.key, id)
            .map_err(|e| StorageError::Other(format!("localStorage write failed: {:?}", e)))
    }
}

/// Resolves the acting identity for a session.
///
/// The first resolved id is cached: every later call returns the same value.
pub struct IdentityResolver {
    authority: Arc<dyn ActorAuthority>,
    local: Arc<dyn LocalIdStore>,
    resolved: Option<ActorId>,
}

impl IdentityResolver {
    pub fn new(authority: Arc<dyn ActorAuthority>, local: Arc<dyn LocalIdStore>) -> Self {
        Self {
            authority,
            local,
            resolved: None,
        }
    }

    /// The identity resolved so far, if any.
    pub fn resolved(&self) -> Option<&ActorId> {
        self.resolved.as_ref()
    }

    /// Resolve the actor id. Never fails.
    pub async fn actor_id(&mut self) -> ActorId {
        if let Some(actor) = &self.resolved {
            return actor.clone();
        }

        let actor = match self.authoritative().await {
            Ok(actor) => actor,
            Err(e) => {
                log::warn!("{}; using local identity", e);
                self.local_fallback()
            }
        };

        self.resolved = Some(actor.clone());
        actor
    }

    async fn authoritative(&self) -> Result<ActorId, EngineError> {
        match self.authority.current_actor().await {
            Ok(Some(actor)) => Ok(actor),
            Ok(None) => Err(EngineError::IdentityUnavailable("no signed-in actor".to_string())),
            Err(e) => Err(EngineError::IdentityUnavailable(e.to_string())),
        }
    }

    fn local_fallback(&self) -> ActorId {
        match self.local.load() {
            Ok(Some(id)) => return ActorId::new(id),
            Ok(None) => {}
            Err(e) => log::warn!("Failed to read local identity: {}", e),
        }

        let actor = ActorId::generate_local();
        if let Err(e) = self.local.store(actor.as_str()) {
            log::warn!("Failed to persist local identity {}: {}", actor, e);
        }
        actor
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pollster::block_on;

    #[test]
    fn test_authority_wins() {
        let mut resolver = IdentityResolver::new(
            Arc::new(StaticAuthority::signed_in("user-1")),
            Arc::new(MemoryIdStore::new()),
        );
        assert_eq!(block_on(resolver.actor_id()), ActorId::from("user-1"));
    }

    #[test]
    fn test_anonymous_falls_back_to_local() {
        let local = Arc::new(MemoryIdStore::new());
        let mut resolver = IdentityResolver::new(Arc::new(StaticAuthority::anonymous()), local.clone());

        let actor = block_on(resolver.actor_id());
        assert!(actor.is_local());
        assert_eq!(local.load().unwrap(), Some(actor.as_str().to_string()));
    }

    #[test]
    fn test_stable_within_session() {
        let mut resolver = IdentityResolver::new(Arc::new(OfflineAuthority), Arc::new(MemoryIdStore::new()));
        let first = block_on(resolver.actor_id());
        let second = block_on(resolver.actor_id());
        assert_eq!(first, second);
        assert_eq!(resolver.resolved(), Some(&first));
    }

    #[test]
    fn test_repeated_authority_failures_reuse_fallback() {
        let local: Arc<dyn LocalIdStore> = Arc::new(MemoryIdStore::new());

        let mut first = IdentityResolver::new(Arc::new(OfflineAuthority), local.clone());
        let mut second = IdentityResolver::new(Arc::new(OfflineAuthority), local);

        assert_eq!(block_on(first.actor_id()), block_on(second.actor_id()));
    }

    #[test]
    fn test_file_store_survives_restart() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(LOCAL_ID_FILE);

        let mut first = IdentityResolver::new(
            Arc::new(OfflineAuthority),
            Arc::new(FileIdStore::new(path.clone())),
        );
        let id = block_on(first.actor_id());

        let mut restarted = IdentityResolver::new(Arc::new(OfflineAuthority), Arc::new(FileIdStore::new(path)));
        assert_eq!(block_on(restarted.actor_id()), id);
    }

    #[test]
    fn test_file_store_empty_file_is_absent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(LOCAL_ID_FILE);
        fs::write(&path, "  \n").unwrap();
        assert_eq!(FileIdStore::new(path).load().unwrap(), None);
    }
}
