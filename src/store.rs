//! Generation-based cache storage behind the offline agent.
//!
//! A store is an explicitly constructed object with its own `open`/`close`
//! lifecycle, injected into the agent so independent instances can be tested
//! in isolation. Entries live inside named generations; the agent deletes
//! whole generations during activation and on the clear-cache command.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::http::{CacheKey, Response};

/// Errors surfaced by a cache store.
#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    #[error("cache store is not open")]
    Closed,
    #[error("cache quota exceeded ({entries} entries, max {max})")]
    QuotaExceeded { entries: usize, max: usize },
    #[error("cache backend failure: {0}")]
    Backend(String),
}

/// Named-generation cache of request/response pairs.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn open(&self) -> Result<(), StoreError>;
    async fn close(&self) -> Result<(), StoreError>;

    /// Names of every generation currently present.
    async fn list_generations(&self) -> Result<Vec<String>, StoreError>;

    /// Delete a whole generation. Returns whether it existed.
    async fn delete_generation(&self, name: &str) -> Result<bool, StoreError>;

    async fn put(
        &self,
        generation: &str,
        key: &CacheKey,
        response: Response,
    ) -> Result<(), StoreError>;

    async fn get(&self, generation: &str, key: &CacheKey)
        -> Result<Option<Response>, StoreError>;
}

#[derive(Default)]
struct MemoryStoreState {
    open: bool,
    generations: HashMap<String, HashMap<CacheKey, Response>>,
}

/// In-memory store. An optional entry quota caps the total number of cached
/// responses across generations so quota-exhaustion paths are testable.
pub struct MemoryStore {
    state: RwLock<MemoryStoreState>,
    max_entries: Option<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self { state: RwLock::new(MemoryStoreState::default()), max_entries: None }
    }

    /// A store that rejects writes once `max_entries` responses are cached.
    pub fn with_capacity(max_entries: usize) -> Self {
        Self { state: RwLock::new(MemoryStoreState::default()), max_entries: Some(max_entries) }
    }

    /// Number of entries in one generation, for assertions in tests.
    pub async fn generation_len(&self, name: &str) -> usize {
        let state = self.state.read().await;
        state.generations.get(name).map(|g| g.len()).unwrap_or(0)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn open(&self) -> Result<(), StoreError> {
        self.state.write().await.open = true;
        Ok(())
    }

    async fn close(&self) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        state.open = false;
        state.generations.clear();
        Ok(())
    }

    async fn list_generations(&self) -> Result<Vec<String>, StoreError> {
        let state = self.state.read().await;
        if !state.open {
            return Err(StoreError::Closed);
        }
        Ok(state.generations.keys().cloned().collect())
    }

    async fn delete_generation(&self, name: &str) -> Result<bool, StoreError> {
        let mut state = self.state.write().await;
        if !state.open {
            return Err(StoreError::Closed);
        }
        Ok(state.generations.remove(name).is_some())
    }

    async fn put(
        &self,
        generation: &str,
        key: &CacheKey,
        response: Response,
    ) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        if !state.open {
            return Err(StoreError::Closed);
        }
        if let Some(max) = self.max_entries {
            let entries: usize = state.generations.values().map(|g| g.len()).sum();
            let replacing = state
                .generations
                .get(generation)
                .map(|g| g.contains_key(key))
                .unwrap_or(false);
            if !replacing && entries >= max {
                return Err(StoreError::QuotaExceeded { entries, max });
            }
        }
        state
            .generations
            .entry(generation.to_string())
            .or_default()
            .insert(key.clone(), response);
        Ok(())
    }

    async fn get(
        &self,
        generation: &str,
        key: &CacheKey,
    ) -> Result<Option<Response>, StoreError> {
        let state = self.state.read().await;
        if !state.open {
            return Err(StoreError::Closed);
        }
        Ok(state.generations.get(generation).and_then(|g| g.get(key)).cloned())
    }
}
