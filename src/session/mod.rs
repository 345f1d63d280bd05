use crate::api::UserId;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, PoisonError, RwLock};

pub mod store;

pub const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthSession {
    pub schema_version: u32,
    pub user_id: UserId,
    pub email: String,
    pub token: String,
    pub created_at: String,
}

pub trait IdentityProvider: Send + Sync {
    fn current_user_id(&self) -> Option<UserId>;
}

/// Shared slot for the signed-in user, read by the HTTP client for the
/// bearer token and by the workflow tracker for the user id.
#[derive(Debug, Clone, Default)]
pub struct SessionHandle {
    inner: Arc<RwLock<Option<AuthSession>>>,
}

impl SessionHandle {
    pub fn new(session: Option<AuthSession>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(session)),
        }
    }

    pub fn current(&self) -> Option<AuthSession> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn token(&self) -> Option<String> {
        self.current().map(|session| session.token)
    }

    pub fn replace(&self, session: Option<AuthSession>) {
        *self.inner.write().unwrap_or_else(PoisonError::into_inner) = session;
    }
}

impl IdentityProvider for SessionHandle {
    fn current_user_id(&self) -> Option<UserId> {
        self.current().map(|session| session.user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::{AuthSession, IdentityProvider, SessionHandle, SCHEMA_VERSION};
    use crate::api::UserId;

    #[test]
    fn handle_resolves_identity_until_cleared() {
        let handle = SessionHandle::default();
        assert!(handle.current_user_id().is_none());

        handle.replace(Some(AuthSession {
            schema_version: SCHEMA_VERSION,
            user_id: UserId(4),
            email: "ana@example.com".to_string(),
            token: "t0k3n".to_string(),
            created_at: "1".to_string(),
        }));
        let clone = handle.clone();
        assert_eq!(clone.current_user_id(), Some(UserId(4)));
        assert_eq!(clone.token().as_deref(), Some("t0k3n"));

        handle.replace(None);
        assert!(clone.current_user_id().is_none());
    }
}
