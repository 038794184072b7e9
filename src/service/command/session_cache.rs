use crate::service::command::transport::SessionState;
use moka::future::Cache;

/// Bounded VIN → handshake state map. Eviction is left to moka.
#[derive(Clone)]
pub struct SessionCache {
    inner: Cache<String, SessionState>,
}

impl SessionCache {
    pub fn new(capacity: u64) -> Self {
        Self {
            inner: Cache::new(capacity.max(1)),
        }
    }

    pub async fn get(&self, vin: &str) -> Option<SessionState> {
        self.inner.get(vin).await
    }

    pub async fn put(&self, vin: &str, state: SessionState) {
        self.inner.insert(vin.to_string(), state).await;
    }
}
