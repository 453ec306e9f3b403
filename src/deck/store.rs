use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use serde::de::DeserializeOwned;

use crate::errors::{IdeaSwipeError, IdeaSwipeResult};
use crate::ideas::types::{DeckSession, Idea};

pub const SESSION_KEY: &str = "echo-ideas-session";
pub const FAVORITES_KEY: &str = "echo-ideas-favorites";
pub const CHAT_PROMPT_KEY: &str = "chat-prompt";

/// Raw string key-value persistence. Swappable so tests can run in memory.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> IdeaSwipeResult<Option<String>>;
    fn set(&self, key: &str, value: &str) -> IdeaSwipeResult<()>;
    fn remove(&self, key: &str) -> IdeaSwipeResult<()>;
}

/// One JSON document per key under a directory.
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn open(dir: impl Into<PathBuf>) -> IdeaSwipeResult<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        tracing::debug!(path = %dir.display(), "file store opened");
        Ok(Self { dir })
    }

    fn path_for(&self, key: &str) -> IdeaSwipeResult<PathBuf> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(IdeaSwipeError::Storage(format!("invalid store key '{key}'")));
        }
        Ok(self.dir.join(format!("{key}.json")))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> IdeaSwipeResult<Option<String>> {
        let path = self.path_for(key)?;
        match std::fs::read_to_string(&path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> IdeaSwipeResult<()> {
        let path = self.path_for(key)?;
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, value)?;
        std::fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> IdeaSwipeResult<()> {
        let path = self.path_for(key)?;
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> IdeaSwipeResult<std::sync::MutexGuard<'_, HashMap<String, String>>> {
        self.entries
            .lock()
            .map_err(|_| IdeaSwipeError::Storage("memory store lock poisoned".into()))
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> IdeaSwipeResult<Option<String>> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> IdeaSwipeResult<()> {
        self.lock()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> IdeaSwipeResult<()> {
        self.lock()?.remove(key);
        Ok(())
    }
}

/// Typed access to the deck session, favorites and chat handoff.
///
/// Every operation fails soft: read problems yield empty values and write
/// problems are logged and dropped. A store built with [`IdeaStore::unavailable`]
/// behaves as if persistence does not exist in this context.
#[derive(Clone)]
pub struct IdeaStore {
    backend: Option<Arc<dyn KeyValueStore>>,
}

impl IdeaStore {
    pub fn new(backend: Arc<dyn KeyValueStore>) -> Self {
        Self {
            backend: Some(backend),
        }
    }

    pub fn unavailable() -> Self {
        Self { backend: None }
    }

    /// File-backed store in `dir`, or an unavailable one if it cannot be opened.
    pub fn open_dir(dir: &Path) -> Self {
        match FileStore::open(dir) {
            Ok(store) => Self::new(Arc::new(store)),
            Err(e) => {
                tracing::warn!(path = %dir.display(), error = %e, "idea store unavailable");
                Self::unavailable()
            }
        }
    }

    pub fn is_available(&self) -> bool {
        self.backend.is_some()
    }

    pub fn load_session(&self) -> Option<DeckSession> {
        let session: DeckSession = self.read_json(SESSION_KEY)?;
        if !session.is_consistent() {
            tracing::warn!(
                current_index = session.current_index,
                ideas = session.ideas.len(),
                consumed = session.results.len(),
                "stored session is inconsistent; discarding"
            );
            return None;
        }
        Some(session)
    }

    pub fn save_session(&self, session: &DeckSession) {
        self.write_json(SESSION_KEY, session);
    }

    pub fn clear_session(&self) {
        self.remove(SESSION_KEY);
    }

    pub fn list_favorites(&self) -> Vec<Idea> {
        self.read_json(FAVORITES_KEY).unwrap_or_default()
    }

    pub fn is_favorited(&self, id: &str) -> bool {
        self.list_favorites().iter().any(|fav| fav.id == id)
    }

    pub fn add_favorite(&self, idea: &Idea) {
        let mut favorites = self.list_favorites();
        if favorites.iter().any(|fav| fav.id == idea.id) {
            return;
        }
        favorites.push(idea.clone());
        self.write_json(FAVORITES_KEY, &favorites);
        tracing::debug!(id = %idea.id, "favorite added");
    }

    pub fn remove_favorite(&self, id: &str) {
        let mut favorites = self.list_favorites();
        let before = favorites.len();
        favorites.retain(|fav| fav.id != id);
        if favorites.len() != before {
            self.write_json(FAVORITES_KEY, &favorites);
            tracing::debug!(id, "favorite removed");
        }
    }

    pub fn stash_chat_prompt(&self, prompt: &str) {
        let Some(backend) = &self.backend else { return };
        if let Err(e) = backend.set(CHAT_PROMPT_KEY, prompt) {
            tracing::warn!(error = %e, "failed to stash chat prompt");
        }
    }

    /// Returns the stashed prompt and deletes it.
    pub fn take_chat_prompt(&self) -> Option<String> {
        let backend = self.backend.as_ref()?;
        let prompt = match backend.get(CHAT_PROMPT_KEY) {
            Ok(prompt) => prompt,
            Err(e) => {
                tracing::warn!(error = %e, "failed to read chat prompt");
                None
            }
        };
        self.remove(CHAT_PROMPT_KEY);
        prompt.filter(|p| !p.is_empty())
    }

    fn read_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let backend = self.backend.as_ref()?;
        let raw = match backend.get(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!(key, error = %e, "store read failed");
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(key, error = %e, "stored value is malformed; ignoring");
                None
            }
        }
    }

    fn write_json<T: serde::Serialize>(&self, key: &str, value: &T) {
        let Some(backend) = &self.backend else { return };
        let result = serde_json::to_string(value)
            .map_err(IdeaSwipeError::from)
            .and_then(|json| backend.set(key, &json));
        if let Err(e) = result {
            tracing::warn!(key, error = %e, "store write failed");
        }
    }

    fn remove(&self, key: &str) {
        let Some(backend) = &self.backend else { return };
        if let Err(e) = backend.remove(key) {
            tracing::warn!(key, error = %e, "store remove failed");
        }
    }
}
