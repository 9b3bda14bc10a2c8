use crate::utils::error_chain_fmt;
use async_trait::async_trait;

#[derive(thiserror::Error)]
pub enum StoreError {
    #[error(transparent)]
    UnexpectedError(#[from] anyhow::Error),
}

impl std::fmt::Debug for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

/// Opt-out records keyed by normalized email address. `put` is an upsert.
#[async_trait]
pub trait UnsubscribeStore: Send + Sync {
    async fn put(&self, key: &str, value: &str) -> Result<(), StoreError>;
}
