use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_models::entities::User;

use crate::error::ClientError;
use crate::gateway::BookingGateway;
use crate::models::Credentials;

pub const CURRENT_USER_KEY: &str = "currentUser";
pub const CURRENT_USER_ID_KEY: &str = "currentUserId";
pub const AUTH_TOKEN_KEY: &str = "authToken";

/// Session-scoped key-value storage for client state.
pub trait SessionStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: String);
    fn remove(&self, key: &str);
}

#[derive(Default)]
pub struct MemorySessionStore {
    values: RwLock<HashMap<String, String>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemorySessionStore {
    fn get(&self, key: &str) -> Option<String> {
        let values = self.values.read().unwrap_or_else(PoisonError::into_inner);
        values.get(key).cloned()
    }

    fn set(&self, key: &str, value: String) {
        let mut values = self.values.write().unwrap_or_else(PoisonError::into_inner);
        values.insert(key.to_string(), value);
    }

    fn remove(&self, key: &str) {
        let mut values = self.values.write().unwrap_or_else(PoisonError::into_inner);
        values.remove(key);
    }
}

/// The signed-in user as seen by every view. Populated on login or restore,
/// cleared on logout.
#[derive(Clone)]
pub struct SessionContext {
    store: Arc<dyn SessionStore>,
}

impl SessionContext {
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self { store }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemorySessionStore::new()))
    }

    pub async fn login(
        &self,
        gateway: &dyn BookingGateway,
        credentials: &Credentials,
    ) -> Result<User, ClientError> {
        let session = gateway.login(credentials).await?;
        self.store.set(AUTH_TOKEN_KEY, session.token);
        self.remember(&session.user)?;

        info!("Signed in as {}", session.user.id);
        Ok(session.user)
    }

    /// Re-validate a stored token with the server. A rejected token clears the
    /// local session.
    pub async fn restore(&self, gateway: &dyn BookingGateway) -> Result<User, ClientError> {
        let token = self.token().ok_or(ClientError::NotAuthenticated)?;

        match gateway.restore_session(&token).await {
            Ok(user) => {
                self.remember(&user)?;
                debug!("Restored session for {}", user.id);
                Ok(user)
            }
            Err(e) => {
                if e.is_unauthorized() {
                    self.clear();
                }
                Err(e)
            }
        }
    }

    /// Local state is cleared even when the server call fails.
    pub async fn logout(&self, gateway: &dyn BookingGateway) -> Result<(), ClientError> {
        let result = match self.token() {
            Some(token) => gateway.logout(&token).await,
            None => Ok(()),
        };
        if let Err(e) = &result {
            warn!("Server-side logout failed: {}", e);
        }
        self.clear();
        result
    }

    pub fn current_user(&self) -> Option<User> {
        let raw = self.store.get(CURRENT_USER_KEY)?;
        serde_json::from_str(&raw).ok()
    }

    pub fn current_user_id(&self) -> Option<Uuid> {
        self.store.get(CURRENT_USER_ID_KEY)?.parse().ok()
    }

    pub fn token(&self) -> Option<String> {
        self.store.get(AUTH_TOKEN_KEY)
    }

    pub fn is_signed_in(&self) -> bool {
        self.token().is_some() && self.current_user_id().is_some()
    }

    fn remember(&self, user: &User) -> Result<(), ClientError> {
        let raw = serde_json::to_string(user).map_err(|e| ClientError::Decode(e.to_string()))?;
        self.store.set(CURRENT_USER_KEY, raw);
        self.store.set(CURRENT_USER_ID_KEY, user.id.to_string());
        Ok(())
    }

    pub fn clear(&self) {
        self.store.remove(CURRENT_USER_KEY);
        self.store.remove(CURRENT_USER_ID_KEY);
        self.store.remove(AUTH_TOKEN_KEY);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_store_survives_a_poisoned_lock() {
        let store = Arc::new(MemorySessionStore::new());
        store.set(AUTH_TOKEN_KEY, "stale".to_string());

        let poisoner = Arc::clone(&store);
        let outcome = std::thread::spawn(move || {
            let _guard = poisoner.values.write().unwrap();
            panic!("writer died holding the lock");
        })
        .join();
        assert!(outcome.is_err());
        assert!(store.values.is_poisoned());

        assert_eq!(store.get(AUTH_TOKEN_KEY).as_deref(), Some("stale"));

        store.remove(AUTH_TOKEN_KEY);
        assert_eq!(store.get(AUTH_TOKEN_KEY), None);

        store.set(AUTH_TOKEN_KEY, "fresh".to_string());
        assert_eq!(store.get(AUTH_TOKEN_KEY).as_deref(), Some("fresh"));
    }

    #[test]
    fn clear_drops_every_session_key() {
        let session = SessionContext::in_memory();
        session.store.set(AUTH_TOKEN_KEY, "token".to_string());
        session.store.set(CURRENT_USER_ID_KEY, Uuid::new_v4().to_string());
        assert!(session.is_signed_in());

        session.clear();
        assert!(!session.is_signed_in());
        assert_eq!(session.token(), None);
    }
}
