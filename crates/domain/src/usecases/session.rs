//! Destination session cache

use std::sync::Arc;

use crate::model::Session;
use crate::ports::{Clock, Credentials, Destination, DestinationError, StateStore};
use crate::state::AppState;

/// Reuses a destination session until it ages out, then logs in again
pub struct SessionCache<D, St, Cl>
where
    D: Destination + ?Sized,
    St: StateStore + ?Sized,
    Cl: Clock + ?Sized,
{
    destination: Arc<D>,
    state: AppState<St>,
    clock: Arc<Cl>,
    credentials: Credentials,
    ttl: std::time::Duration,
}

impl<D, St, Cl> SessionCache<D, St, Cl>
where
    D: Destination + ?Sized,
    St: StateStore + ?Sized,
    Cl: Clock + ?Sized,
{
    pub fn new(
        destination: Arc<D>,
        state: AppState<St>,
        clock: Arc<Cl>,
        credentials: Credentials,
        ttl: std::time::Duration,
    ) -> Self {
        Self {
            destination,
            state,
            clock,
            credentials,
            ttl,
        }
    }

    /// A cached session younger than the TTL, else a fresh one
    pub async fn acquire(&self) -> Result<Session, DestinationError> {
        match self.state.session().await {
            Ok(Some(session)) if self.is_fresh(&session) => return Ok(session),
            Ok(_) => {}
            Err(e) => tracing::warn!(error = %e, "Unreadable cached session, logging in again"),
        }
        self.create().await
    }

    /// Always exchange credentials for a new session and cache it
    pub async fn create(&self) -> Result<Session, DestinationError> {
        let grant = self.destination.create_session(&self.credentials).await?;
        let session = Session {
            access_jwt: grant.access_jwt,
            did: grant.did,
            created_at: self.clock.now(),
        };

        tracing::debug!(did = %session.did, "Created destination session");

        if let Err(e) = self.state.set_session(&session, self.ttl).await {
            tracing::warn!(error = %e, "Failed to cache session");
        }
        Ok(session)
    }

    /// Drop the cached session so the next acquire logs in again
    pub async fn invalidate(&self) {
        if let Err(e) = self.state.clear_session().await {
            tracing::warn!(error = %e, "Failed to clear cached session");
        }
    }

    fn is_fresh(&self, session: &Session) -> bool {
        let age = self.clock.now() - session.created_at;
        age >= time::Duration::ZERO && age < self.ttl
    }
}
