//! Typed access to persisted state
//!
//! All state lives in a [`StateStore`] as JSON strings under fixed keys, so any
//! key-value backend (SQLite, memory, a hosted KV) can hold it.

use serde::{Serialize, de::DeserializeOwned};
use std::sync::Arc;
use std::time::Duration;

use crate::model::{DryRunReport, PollState, ScheduleCache, Session};
use crate::ports::{StateError, StateStore};

pub const LAST_POSTED_ID_KEY: &str = "last-posted-id";
pub const POLL_STATE_KEY: &str = "poll-state";
pub const SCHEDULE_CACHE_KEY: &str = "schedule-cache";
pub const SESSION_KEY: &str = "bsky-session";
pub const DRY_RUN_KEY: &str = "dry-run-result";

/// Typed wrapper around a key-value state store
pub struct AppState<St: StateStore + ?Sized> {
    store: Arc<St>,
}

impl<St: StateStore + ?Sized> Clone for AppState<St> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<St: StateStore + ?Sized> AppState<St> {
    pub fn new(store: Arc<St>) -> Self {
        Self { store }
    }

    /// Last successfully mirrored post ID
    pub async fn cursor(&self) -> Result<Option<String>, StateError> {
        let value = self.store.get(LAST_POSTED_ID_KEY).await?;
        Ok(value.filter(|v| !v.is_empty()))
    }

    pub async fn set_cursor(&self, id: &str) -> Result<(), StateError> {
        self.store.put(LAST_POSTED_ID_KEY, id, None).await
    }

    pub async fn poll_state(&self) -> Result<PollState, StateError> {
        Ok(self.get_json(POLL_STATE_KEY).await?.unwrap_or_default())
    }

    pub async fn set_poll_state(&self, state: &PollState) -> Result<(), StateError> {
        self.put_json(POLL_STATE_KEY, state, None).await
    }

    pub async fn schedule_cache(&self) -> Result<Option<ScheduleCache>, StateError> {
        self.get_json(SCHEDULE_CACHE_KEY).await
    }

    pub async fn set_schedule_cache(&self, cache: &ScheduleCache) -> Result<(), StateError> {
        self.put_json(SCHEDULE_CACHE_KEY, cache, None).await
    }

    pub async fn session(&self) -> Result<Option<Session>, StateError> {
        self.get_json(SESSION_KEY).await
    }

    pub async fn set_session(&self, session: &Session, ttl: Duration) -> Result<(), StateError> {
        self.put_json(SESSION_KEY, session, Some(ttl)).await
    }

    pub async fn clear_session(&self) -> Result<(), StateError> {
        self.store.delete(SESSION_KEY).await
    }

    pub async fn dry_run_report(&self) -> Result<Option<DryRunReport>, StateError> {
        self.get_json(DRY_RUN_KEY).await
    }

    pub async fn set_dry_run_report(&self, report: &DryRunReport) -> Result<(), StateError> {
        self.put_json(DRY_RUN_KEY, report, None).await
    }

    async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StateError> {
        match self.store.get(key).await? {
            Some(raw) => serde_json::from_str(&raw)
                .map(Some)
                .map_err(|e| StateError::Serialization(format!("{}: {}", key, e))),
            None => Ok(None),
        }
    }

    async fn put_json<T: Serialize>(
        &self,
        key: &str,
        value: &T,
        ttl: Option<Duration>,
    ) -> Result<(), StateError> {
        let raw = serde_json::to_string(value)
            .map_err(|e| StateError::Serialization(format!("{}: {}", key, e)))?;
        self.store.put(key, &raw, ttl).await
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! In-crate fake store shared by use case tests

    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct FakeStateStore {
        pub values: Mutex<HashMap<String, String>>,
        pub ttls: Mutex<HashMap<String, Option<Duration>>>,
        /// Every `put` in call order
        pub writes: Mutex<Vec<(String, String)>>,
    }

    impl FakeStateStore {
        pub fn raw(&self, key: &str) -> Option<String> {
            self.values.lock().unwrap().get(key).cloned()
        }

        pub fn writes_to(&self, key: &str) -> Vec<String> {
            self.writes
                .lock()
                .unwrap()
                .iter()
                .filter(|(k, _)| k == key)
                .map(|(_, v)| v.clone())
                .collect()
        }

        pub fn seed(&self, key: &str, value: &str) {
            self.values
                .lock()
                .unwrap()
                .insert(key.to_string(), value.to_string());
        }
    }

    #[async_trait]
    impl StateStore for FakeStateStore {
        async fn get(&self, key: &str) -> Result<Option<String>, StateError> {
            Ok(self.raw(key))
        }

        async fn put(
            &self,
            key: &str,
            value: &str,
            ttl: Option<Duration>,
        ) -> Result<(), StateError> {
            self.seed(key, value);
            self.writes
                .lock()
                .unwrap()
                .push((key.to_string(), value.to_string()));
            self.ttls.lock().unwrap().insert(key.to_string(), ttl);
            Ok(())
        }

        async fn delete(&self, key: &str) -> Result<(), StateError> {
            self.values.lock().unwrap().remove(key);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::FakeStateStore;
    use super::*;
    use crate::model::PollMode;
    use time::macros::datetime;

    #[tokio::test]
    async fn test_cursor_roundtrip_and_empty_value() {
        let store = Arc::new(FakeStateStore::default());
        let state = AppState::new(Arc::clone(&store));

        assert_eq!(state.cursor().await.unwrap(), None);

        store.seed(LAST_POSTED_ID_KEY, "");
        assert_eq!(state.cursor().await.unwrap(), None);

        state.set_cursor("1850000000000000001").await.unwrap();
        assert_eq!(
            state.cursor().await.unwrap().as_deref(),
            Some("1850000000000000001")
        );
    }

    #[tokio::test]
    async fn test_session_written_with_ttl() {
        let store = Arc::new(FakeStateStore::default());
        let state = AppState::new(Arc::clone(&store));
        let session = Session {
            access_jwt: "jwt".to_string(),
            did: "did:plc:abc".to_string(),
            created_at: datetime!(2025-11-01 12:00 UTC),
        };

        state
            .set_session(&session, Duration::from_secs(3600))
            .await
            .unwrap();

        assert_eq!(
            store.ttls.lock().unwrap().get(SESSION_KEY).copied().flatten(),
            Some(Duration::from_secs(3600))
        );
        assert_eq!(state.session().await.unwrap(), Some(session));

        state.clear_session().await.unwrap();
        assert_eq!(state.session().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_poll_state_roundtrip() {
        let store = Arc::new(FakeStateStore::default());
        let state = AppState::new(store);

        assert_eq!(state.poll_state().await.unwrap(), PollState::default());

        let poll = PollState {
            last_poll_at: Some(datetime!(2025-11-10 23:00 UTC)),
            last_mode: Some(PollMode::Game),
        };
        state.set_poll_state(&poll).await.unwrap();
        assert_eq!(state.poll_state().await.unwrap(), poll);
    }

    #[tokio::test]
    async fn test_corrupt_value_is_serialization_error() {
        let store = Arc::new(FakeStateStore::default());
        store.seed(POLL_STATE_KEY, "not json");
        let state = AppState::new(store);

        assert!(matches!(
            state.poll_state().await,
            Err(StateError::Serialization(_))
        ));
    }
}
