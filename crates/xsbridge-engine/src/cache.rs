//! Per-collection client cache.
//!
//! Clients are created on first use and kept until explicitly evicted. The
//! schema of a collection is fixed when its client is created, so a changed
//! field declaration only takes effect after [`ClientCache::evict`] or a
//! restart.
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

pub struct ClientCache<C> {
    clients: RwLock<HashMap<String, Arc<C>>>,
}

impl<C> Default for ClientCache<C> {
    fn default() -> Self { Self { clients: RwLock::new(HashMap::new()) } }
}

impl<C> ClientCache<C> {
    pub fn new() -> Self { Self::default() }

    pub fn get(&self, collection: &str) -> Option<Arc<C>> {
        self.clients.read().get(collection).cloned()
    }

    /// Returns the cached client or creates it with `create`.
    ///
    /// Creation runs under the write lock after a second lookup, so
    /// concurrent callers never build two clients for one collection. A
    /// failed creation caches nothing.
    pub fn get_or_try_insert_with<E, F>(&self, collection: &str, create: F) -> Result<Arc<C>, E>
    where
        F: FnOnce() -> Result<C, E>,
    {
        if let Some(client) = self.get(collection) {
            return Ok(client);
        }
        let mut clients = self.clients.write();
        if let Some(client) = clients.get(collection) {
            return Ok(Arc::clone(client));
        }
        let client = Arc::new(create()?);
        clients.insert(collection.to_string(), Arc::clone(&client));
        Ok(client)
    }

    /// Drops the client for `collection`. Handles already given out stay
    /// usable; the next lookup creates a fresh client.
    pub fn evict(&self, collection: &str) -> bool {
        self.clients.write().remove(collection).is_some()
    }

    pub fn collections(&self) -> Vec<String> {
        let mut names: Vec<String> = self.clients.read().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize { self.clients.read().len() }

    pub fn is_empty(&self) -> bool { self.clients.read().is_empty() }
}
