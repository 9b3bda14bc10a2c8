use crate::domain::unsubscribe_store::{StoreError, UnsubscribeStore};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Process-local store for local runs and tests. Clones share the same records.
#[derive(Debug, Clone, Default)]
pub struct InMemoryUnsubscribeStore {
    records: Arc<RwLock<HashMap<String, String>>>,
}

impl InMemoryUnsubscribeStore {
    pub async fn get(&self, key: &str) -> Option<String> {
        self.records.read().await.get(key).cloned()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl UnsubscribeStore for InMemoryUnsubscribeStore {
    #[tracing::instrument(name = "put_unsubscribe_in_memory", skip(self, value))]
    async fn put(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.records
            .write()
            .await
            .insert(key.to_string(), value.to_string());

        Ok(())
    }
}
