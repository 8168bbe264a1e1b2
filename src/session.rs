// src/session.rs

//! Persisted authentication session.
//!
//! The store holds the current [`AuthSession`] in memory and mirrors it to a
//! JSON file so the credential survives restarts. A restored credential is
//! not trusted until the caller has validated it against the backend; see
//! `ScmsClient::bootstrap`.
//!
//! The unauthorized latch fires at most once per session: the first rejected
//! request tears the credential down, concurrent rejections are ignored, and
//! a fresh login re-arms the latch.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use tokio::io::AsyncWriteExt;

use crate::error::Result;
use crate::models::{AuthSession, UserRef};

/// Shared handle to the session state. Cheap to clone.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    path: PathBuf,
    state: RwLock<Option<AuthSession>>,
    unauthorized: AtomicBool,
}

impl SessionStore {
    /// Create an empty store backed by the given file. Nothing is read yet;
    /// call [`SessionStore::load_from_disk`] to restore a persisted session.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            inner: Arc::new(SessionInner {
                path: path.into(),
                state: RwLock::new(None),
                unauthorized: AtomicBool::new(false),
            }),
        }
    }

    pub fn path(&self) -> &Path {
        &self.inner.path
    }

    /// Restore a persisted session into memory, if one exists.
    ///
    /// A missing file means no session. A corrupt file is treated the same
    /// and removed, so one bad write cannot wedge every later boot.
    pub async fn load_from_disk(&self) -> Result<bool> {
        let bytes = match tokio::fs::read(&self.inner.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(false),
            Err(e) => return Err(e.into()),
        };

        match serde_json::from_slice::<AuthSession>(&bytes) {
            Ok(session) => {
                *self.write_state() = Some(session);
                self.inner.unauthorized.store(false, Ordering::SeqCst);
                Ok(true)
            }
            Err(e) => {
                log::warn!(
                    "Discarding unreadable session file {}: {}",
                    self.inner.path.display(),
                    e
                );
                let _ = tokio::fs::remove_file(&self.inner.path).await;
                Ok(false)
            }
        }
    }

    /// Install a freshly issued session, persist it, and re-arm the
    /// unauthorized latch.
    pub async fn set(&self, session: AuthSession) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(&session)?;
        *self.write_state() = Some(session);
        self.inner.unauthorized.store(false, Ordering::SeqCst);
        self.persist(&bytes).await
    }

    /// Drop the session from memory and disk. Idempotent: clearing an
    /// already-empty store succeeds.
    pub async fn clear(&self) -> Result<()> {
        *self.write_state() = None;
        match tokio::fs::remove_file(&self.inner.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.read_state().is_some()
    }

    /// The raw access token, for the Authorization header.
    pub fn token(&self) -> Option<String> {
        self.read_state()
            .as_ref()
            .map(|s| s.access_token.clone())
    }

    pub fn user(&self) -> Option<UserRef> {
        self.read_state().as_ref().map(|s| s.user.clone())
    }

    pub fn session(&self) -> Option<AuthSession> {
        self.read_state().clone()
    }

    /// Record that the backend rejected the credential.
    ///
    /// The first call tears the session down (memory and file) and returns
    /// `true`; every later call is a no-op returning `false` until a new
    /// session is installed.
    pub fn flag_unauthorized(&self) -> bool {
        if self.inner.unauthorized.swap(true, Ordering::SeqCst) {
            return false;
        }
        *self.write_state() = None;
        // Tiny unlink, done inline so no stale token survives the teardown.
        if let Err(e) = std::fs::remove_file(&self.inner.path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                log::warn!(
                    "Failed to remove session file {}: {}",
                    self.inner.path.display(),
                    e
                );
            }
        }
        true
    }

    /// Whether the unauthorized latch has fired for the current session.
    pub fn unauthorized_fired(&self) -> bool {
        self.inner.unauthorized.load(Ordering::SeqCst)
    }

    async fn persist(&self, bytes: &[u8]) -> Result<()> {
        if let Some(parent) = self.inner.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let tmp = self.inner.path.with_extension("tmp");
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        drop(file);
        tokio::fs::rename(&tmp, &self.inner.path).await?;
        Ok(())
    }

    fn read_state(&self) -> std::sync::RwLockReadGuard<'_, Option<AuthSession>> {
        self.inner.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_state(&self) -> std::sync::RwLockWriteGuard<'_, Option<AuthSession>> {
        self.inner.state.write().unwrap_or_else(|e| e.into_inner())
    }
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("path", &self.inner.path)
            .field("authenticated", &self.is_authenticated())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;
    use std::sync::Barrier;
    use std::thread;
    use tempfile::TempDir;

    fn make_session(token: &str) -> AuthSession {
        AuthSession {
            access_token: token.to_string(),
            token_type: "Bearer".to_string(),
            expires_at: None,
            user: UserRef {
                id: "7".to_string(),
                name: "Asha Rao".to_string(),
                email: Some("asha@campus.edu".to_string()),
                role: Role::User,
                department: None,
            },
        }
    }

    fn store_in(tmp: &TempDir) -> SessionStore {
        SessionStore::new(tmp.path().join("session.json"))
    }

    #[tokio::test]
    async fn set_persists_and_reloads() {
        let tmp = TempDir::new().unwrap();
        let store = store_in(&tmp);
        store.set(make_session("tok-1")).await.unwrap();

        let restored = store_in(&tmp);
        assert!(restored.load_from_disk().await.unwrap());
        assert_eq!(restored.token().as_deref(), Some("tok-1"));
        assert_eq!(restored.user().unwrap().name, "Asha Rao");
    }

    #[tokio::test]
    async fn load_without_file_is_empty() {
        let tmp = TempDir::new().unwrap();
        let store = store_in(&tmp);
        assert!(!store.load_from_disk().await.unwrap());
        assert!(!store.is_authenticated());
    }

    #[tokio::test]
    async fn corrupt_file_is_discarded() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("session.json");
        tokio::fs::write(&path, b"{ not json").await.unwrap();

        let store = SessionStore::new(&path);
        assert!(!store.load_from_disk().await.unwrap());
        assert!(!path.exists(), "corrupt file must be removed");
    }

    #[tokio::test]
    async fn clear_is_idempotent() {
        let tmp = TempDir::new().unwrap();
        let store = store_in(&tmp);
        store.set(make_session("tok-1")).await.unwrap();

        store.clear().await.unwrap();
        store.clear().await.unwrap();
        assert!(!store.is_authenticated());
        assert!(!store.path().exists());
    }

    #[tokio::test]
    async fn unauthorized_latch_fires_once() {
        let tmp = TempDir::new().unwrap();
        let store = store_in(&tmp);
        store.set(make_session("tok-1")).await.unwrap();

        assert!(store.flag_unauthorized());
        assert!(!store.flag_unauthorized(), "second rejection is a no-op");
        assert!(!store.is_authenticated());
        assert!(!store.path().exists());
    }

    #[tokio::test]
    async fn concurrent_rejections_tear_down_once() {
        let tmp = TempDir::new().unwrap();
        let store = store_in(&tmp);
        store.set(make_session("tok-1")).await.unwrap();

        let barrier = Arc::new(Barrier::new(8));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = store.clone();
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    store.flag_unauthorized()
                })
            })
            .collect();

        let teardowns = handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .filter(|fired| *fired)
            .count();
        assert_eq!(teardowns, 1, "exactly one rejection performs the teardown");
        assert!(!store.is_authenticated());
        assert!(!store.path().exists());
    }

    #[tokio::test]
    async fn fresh_login_rearms_the_latch() {
        let tmp = TempDir::new().unwrap();
        let store = store_in(&tmp);
        store.set(make_session("tok-1")).await.unwrap();
        assert!(store.flag_unauthorized());

        store.set(make_session("tok-2")).await.unwrap();
        assert!(!store.unauthorized_fired());
        assert!(store.flag_unauthorized(), "latch must fire for the new session");
    }
}
