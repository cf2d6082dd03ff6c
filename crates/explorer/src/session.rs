//! Session Context: the bearer credential and identity of the signed-in
//! user, persisted under two fixed keys so a restart restores it.
//!
//! There is one writer (login/logout) and many readers; the context is
//! created at the composition root and shared by reference.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, RwLock};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use tracity_client::wire::LoginRequest;
use tracity_client::{AuthHeaders, Backend};

use crate::error::{ExplorerError, SessionError};

pub const TOKEN_KEY: &str = "tracity_token";
pub const USER_KEY: &str = "tracity_user";

/// Who is signed in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub user_id: String,
    pub email: String,
}

/// Key/value storage for the persisted session.
pub trait SessionStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, SessionError>;
    fn set(&self, key: &str, value: &str) -> Result<(), SessionError>;
    fn remove(&self, key: &str) -> Result<(), SessionError>;
    /// Drop every entry, including unreadable ones.
    fn clear(&self) -> Result<(), SessionError>;
}

// ── File store ────────────────────────────────────────────────

/// JSON object on disk, e.g. `~/.config/tracity/session.json`.
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `~/.config/tracity/session.json`, when a config dir exists.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("tracity").join("session.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_map(&self) -> Result<BTreeMap<String, String>, SessionError> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let content = std::fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_str(&content).map_err(|e| SessionError::Corrupt(e.to_string()))
    }

    fn write_map(&self, map: &BTreeMap<String, String>) -> Result<(), SessionError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(map)
            .map_err(|e| SessionError::Corrupt(e.to_string()))?;
        std::fs::write(&self.path, json)?;
        debug!(path = %self.path.display(), "Session saved");
        Ok(())
    }
}

impl SessionStore for FileSessionStore {
    fn get(&self, key: &str) -> Result<Option<String>, SessionError> {
        Ok(self.read_map()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), SessionError> {
        let mut map = self.read_map()?;
        map.insert(key.to_string(), value.to_string());
        self.write_map(&map)
    }

    fn remove(&self, key: &str) -> Result<(), SessionError> {
        let mut map = self.read_map()?;
        if map.remove(key).is_some() {
            self.write_map(&map)?;
        }
        Ok(())
    }

    fn clear(&self) -> Result<(), SessionError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

// ── Memory store ──────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct MemorySessionStore {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entries<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            entries: Mutex::new(
                entries
                    .into_iter()
                    .map(|(k, v)| (k.into(), v.into()))
                    .collect(),
            ),
        }
    }
}

impl SessionStore for MemorySessionStore {
    fn get(&self, key: &str) -> Result<Option<String>, SessionError> {
        Ok(self
            .entries
            .lock()
            .expect("session store lock poisoned")
            .get(key)
            .cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), SessionError> {
        self.entries
            .lock()
            .expect("session store lock poisoned")
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), SessionError> {
        self.entries
            .lock()
            .expect("session store lock poisoned")
            .remove(key);
        Ok(())
    }

    fn clear(&self) -> Result<(), SessionError> {
        self.entries.lock().expect("session store lock poisoned").clear();
        Ok(())
    }
}

// ── Context ───────────────────────────────────────────────────

#[derive(Debug, Clone)]
struct Credential {
    identity: Identity,
    token: String,
}

pub struct SessionContext {
    store: Box<dyn SessionStore>,
    current: RwLock<Option<Credential>>,
}

impl std::fmt::Debug for SessionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionContext")
            .field("identity", &self.identity())
            .finish_non_exhaustive()
    }
}

impl SessionContext {
    /// Restore whatever session the store holds. Unreadable or partial
    /// data counts as "no session" and is purged.
    pub fn restore(store: impl SessionStore + 'static) -> Self {
        let current = match read_persisted(&store) {
            Ok(credential) => credential,
            Err(e) => {
                warn!(error = %e, "Discarding unreadable persisted session");
                if let Err(e) = store.clear() {
                    warn!(error = %e, "Failed to purge persisted session");
                }
                None
            }
        };
        if let Some(c) = &current {
            debug!(user_id = %c.identity.user_id, "Session restored");
        }
        Self {
            store: Box::new(store),
            current: RwLock::new(current),
        }
    }

    /// A signed-out context backed by memory only.
    pub fn anonymous() -> Self {
        Self::restore(MemorySessionStore::new())
    }

    pub fn is_authenticated(&self) -> bool {
        self.current.read().expect("session lock poisoned").is_some()
    }

    pub fn identity(&self) -> Option<Identity> {
        self.current
            .read()
            .expect("session lock poisoned")
            .as_ref()
            .map(|c| c.identity.clone())
    }

    /// Bearer header when signed in, empty otherwise.
    pub fn auth_headers(&self) -> AuthHeaders {
        match self.current.read().expect("session lock poisoned").as_ref() {
            Some(c) => AuthHeaders::bearer(&c.token),
            None => AuthHeaders::none(),
        }
    }

    /// Persist the credential, then flip to authenticated.
    pub fn login(&self, identity: Identity, token: &str) -> Result<(), SessionError> {
        let user = serde_json::to_string(&identity)
            .map_err(|e| SessionError::Corrupt(e.to_string()))?;
        self.store.set(TOKEN_KEY, token)?;
        self.store.set(USER_KEY, &user)?;
        info!(user_id = %identity.user_id, "Signed in");
        *self.current.write().expect("session lock poisoned") = Some(Credential {
            identity,
            token: token.to_string(),
        });
        Ok(())
    }

    /// Exchange credentials and a captcha answer for a session.
    pub async fn exchange(
        &self,
        backend: &dyn Backend,
        email: &str,
        password: &str,
        captcha_answer: i64,
    ) -> Result<Identity, ExplorerError> {
        let request = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
            captcha_answer,
        };
        let response = backend.login(&request).await?;
        let identity = Identity {
            user_id: response.user_id,
            email: response.email,
        };
        self.login(identity.clone(), &response.token)?;
        Ok(identity)
    }

    /// Notify the backend (best effort), then forget the session locally.
    /// Always completes.
    pub async fn logout(&self, backend: &dyn Backend) {
        let headers = self.auth_headers();
        if !headers.is_empty() {
            if let Err(e) = backend.logout(&headers).await {
                warn!(error = %e, "Logout notification failed");
            }
        }

        *self.current.write().expect("session lock poisoned") = None;
        for key in [TOKEN_KEY, USER_KEY] {
            if let Err(e) = self.store.remove(key) {
                warn!(key, error = %e, "Failed to remove persisted session key");
            }
        }
        info!("Signed out");
    }
}

fn read_persisted(store: &dyn SessionStore) -> Result<Option<Credential>, SessionError> {
    let token = store.get(TOKEN_KEY)?;
    let user = store.get(USER_KEY)?;
    match (token, user) {
        (None, None) => Ok(None),
        (Some(token), Some(user)) if !token.is_empty() => {
            let identity: Identity =
                serde_json::from_str(&user).map_err(|e| SessionError::Corrupt(e.to_string()))?;
            Ok(Some(Credential { identity, token }))
        }
        _ => Err(SessionError::Corrupt("incomplete session".to_string())),
    }
}
