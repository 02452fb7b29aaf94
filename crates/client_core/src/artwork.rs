use std::{
    collections::HashMap,
    sync::{Arc, Mutex, PoisonError},
};

use futures::future::join_all;
use tracing::{debug, warn};

use crate::{ArtworkService, ClientError};

pub type ArtworkBytes = Arc<Vec<u8>>;

/// In-memory image cache in front of an [`ArtworkService`].
pub struct ArtworkCache {
    service: Arc<dyn ArtworkService>,
    entries: Mutex<HashMap<String, ArtworkBytes>>,
}

impl ArtworkCache {
    pub fn new(service: Arc<dyn ArtworkService>) -> Self {
        Self {
            service,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Synchronous lookup; never touches the network.
    pub fn cached(&self, url: &str) -> Option<ArtworkBytes> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(url)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub async fn load(&self, url: &str) -> Result<ArtworkBytes, ClientError> {
        if let Some(hit) = self.cached(url) {
            return Ok(hit);
        }

        debug!(url, "artwork: cache miss");
        let bytes = Arc::new(self.service.fetch_artwork(url).await?);
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(url.to_string(), Arc::clone(&bytes));
        Ok(bytes)
    }

    /// Loads every url concurrently, keeping input order. Failures are logged
    /// and yield `None` in their slot.
    pub async fn preload(&self, urls: &[String]) -> Vec<Option<ArtworkBytes>> {
        let loads = urls.iter().map(|url| async move {
            match self.load(url).await {
                Ok(bytes) => Some(bytes),
                Err(err) => {
                    warn!(url = %url, "artwork: failed to load: {err}");
                    None
                }
            }
        });
        join_all(loads).await
    }
}

#[cfg(test)]
#[path = "tests/artwork_tests.rs"]
mod tests;
