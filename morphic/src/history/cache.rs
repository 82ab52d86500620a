//! Capped local chat cache for anonymous users.

use std::sync::Arc;

use tracing::error;

use super::store::KeyValueStore;
use crate::error::StorageError;
use crate::models::ChatSummary;

/// Fixed storage slot holding the cached chats.
pub const STORAGE_KEY: &str = "morphic:chats";

/// Maximum number of chats kept locally.
pub const LOCAL_CACHE_LIMIT: usize = 20;

/// The local chat list, most recent first, never longer than [`LOCAL_CACHE_LIMIT`].
#[derive(Clone)]
pub struct LocalChatCache {
    store: Arc<dyn KeyValueStore>,
}

impl LocalChatCache {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Read the cached chats. Unreadable or corrupt data yields an empty list.
    pub fn load(&self) -> Vec<ChatSummary> {
        match self.try_load() {
            Ok(chats) => chats,
            Err(e) => {
                error!(error = %e, "error reading local chats");
                Vec::new()
            }
        }
    }

    fn try_load(&self) -> Result<Vec<ChatSummary>, StorageError> {
        match self.store.get(STORAGE_KEY)? {
            Some(raw) => Ok(serde_json::from_str(&raw)?),
            None => Ok(Vec::new()),
        }
    }

    /// Persist `chats`, keeping only the first [`LOCAL_CACHE_LIMIT`].
    pub fn save(&self, chats: &[ChatSummary]) -> Result<(), StorageError> {
        let limited = &chats[..chats.len().min(LOCAL_CACHE_LIMIT)];
        let raw = serde_json::to_string(limited)?;
        self.store.set(STORAGE_KEY, &raw)
    }

    /// Put `chat` at the front, dropping any older entry with the same id.
    pub fn record(&self, chat: ChatSummary) -> Result<(), StorageError> {
        let mut chats = self.load();
        chats.retain(|c| c.id != chat.id);
        chats.insert(0, chat);
        self.save(&chats)
    }

    pub fn clear(&self) -> Result<(), StorageError> {
        self.store.remove(STORAGE_KEY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::store::MemoryStore;

    fn chat(id: &str) -> ChatSummary {
        ChatSummary::new(id.to_string(), format!("chat {id}"))
    }

    fn cache() -> (LocalChatCache, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        (LocalChatCache::new(store.clone()), store)
    }

    #[test]
    fn test_empty_cache() {
        let (cache, _) = cache();
        assert!(cache.load().is_empty());
    }

    #[test]
    fn test_save_truncates_to_limit() {
        let (cache, store) = cache();
        let chats: Vec<_> = (0..25).map(|i| chat(&i.to_string())).collect();

        cache.save(&chats).unwrap();

        let loaded = cache.load();
        assert_eq!(loaded.len(), LOCAL_CACHE_LIMIT);
        assert_eq!(loaded.first().unwrap().id, "0");
        assert_eq!(loaded.last().unwrap().id, "19");

        let raw: Vec<serde_json::Value> =
            serde_json::from_str(&store.get(STORAGE_KEY).unwrap().unwrap()).unwrap();
        assert_eq!(raw.len(), LOCAL_CACHE_LIMIT);
    }

    #[test]
    fn test_record_moves_to_front_and_caps() {
        let (cache, _) = cache();
        for i in 0..LOCAL_CACHE_LIMIT {
            cache.record(chat(&i.to_string())).unwrap();
        }
        cache.record(chat("5")).unwrap();
        cache.record(chat("new")).unwrap();

        let loaded = cache.load();
        assert_eq!(loaded.len(), LOCAL_CACHE_LIMIT);
        assert_eq!(loaded[0].id, "new");
        assert_eq!(loaded[1].id, "5");
        assert_eq!(loaded.iter().filter(|c| c.id == "5").count(), 1);
        // the oldest entry fell off
        assert!(loaded.iter().all(|c| c.id != "0"));
    }

    #[test]
    fn test_corrupt_data_reads_as_empty() {
        let (cache, store) = cache();
        store.set(STORAGE_KEY, "{not json").unwrap();
        assert!(cache.load().is_empty());
    }

    #[test]
    fn test_clear() {
        let (cache, _) = cache();
        cache.record(chat("a")).unwrap();
        cache.clear().unwrap();
        assert!(cache.load().is_empty());
    }
}
