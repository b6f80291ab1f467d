use async_trait::async_trait;
use chrono::DateTime;
use chrono::Duration;
use chrono::Utc;
use dashmap::DashMap;

use crate::domain::authentication::errors::StateStoreError;
use crate::domain::authentication::ports::OAuthStateStore;

/// Process-local OAuth state store.
///
/// States live only in this process, so a deployment with several replicas
/// needs a shared store behind the same port.
pub struct InMemoryStateStore {
    states: DashMap<String, DateTime<Utc>>,
    ttl: Duration,
}

impl InMemoryStateStore {
    pub const DEFAULT_TTL_MINUTES: i64 = 10;

    pub fn new(ttl: Duration) -> Self {
        Self {
            states: DashMap::new(),
            ttl,
        }
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}

impl Default for InMemoryStateStore {
    fn default() -> Self {
        Self::new(Duration::minutes(Self::DEFAULT_TTL_MINUTES))
    }
}

#[async_trait]
impl OAuthStateStore for InMemoryStateStore {
    async fn issue(&self) -> Result<String, StateStoreError> {
        let state = auth::generate_opaque_token()
            .map_err(|e| StateStoreError::Generation(e.to_string()))?;
        self.states.insert(state.clone(), Utc::now() + self.ttl);

        Ok(state)
    }

    async fn consume(&self, state: &str) -> Result<bool, StateStoreError> {
        // Removal is the check: only one caller can get the entry back.
        Ok(self
            .states
            .remove(state)
            .is_some_and(|(_, expires_at)| expires_at > Utc::now()))
    }

    async fn sweep_expired(&self) -> Result<usize, StateStoreError> {
        let now = Utc::now();
        let before = self.states.len();
        self.states.retain(|_, expires_at| *expires_at > now);

        Ok(before.saturating_sub(self.states.len()))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[tokio::test]
    async fn test_state_is_single_use() {
        let store = InMemoryStateStore::default();
        let state = store.issue().await.unwrap();

        assert_eq!(state.len(), 43);
        assert!(store.consume(&state).await.unwrap());
        assert!(!store.consume(&state).await.unwrap());
    }

    #[tokio::test]
    async fn test_unknown_state_is_rejected() {
        let store = InMemoryStateStore::default();
        assert!(!store.consume("never-issued").await.unwrap());
    }

    #[tokio::test]
    async fn test_expired_state_is_rejected_and_removed() {
        let store = InMemoryStateStore::new(Duration::seconds(-1));
        let state = store.issue().await.unwrap();

        assert!(!store.consume(&state).await.unwrap());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_sweep_drops_only_expired_states() {
        let store = InMemoryStateStore::default();
        let live = store.issue().await.unwrap();
        store
            .states
            .insert("stale".to_string(), Utc::now() - Duration::minutes(1));

        assert_eq!(store.sweep_expired().await.unwrap(), 1);
        assert_eq!(store.len(), 1);
        assert!(store.consume(&live).await.unwrap());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_consume_has_one_winner() {
        let store = Arc::new(InMemoryStateStore::default());
        let state = store.issue().await.unwrap();

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let store = Arc::clone(&store);
                let state = state.clone();
                tokio::spawn(async move { store.consume(&state).await.unwrap() })
            })
            .collect();

        let mut winners = 0;
        for handle in handles {
            if handle.await.unwrap() {
                winners += 1;
            }
        }

        assert_eq!(winners, 1);
    }
}
