//! Session identity as seen by the cart.
//!
//! The cart does not authenticate anyone. It only needs to know whether a
//! user is present and which credential to attach to backend calls.

use serde::{Deserialize, Serialize};

use bookstore_core::UserId;

use crate::store::{keys, KeyValueStore, StoreError};

/// Opaque bearer credential minted by the auth service.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AuthToken(String);

impl AuthToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// The raw token, for the `Authorization` header only.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("AuthToken(***)")
    }
}

/// An authenticated user: id plus credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub user_id: UserId,
    pub auth_token: AuthToken,
}

impl Identity {
    pub fn new(user_id: UserId, auth_token: AuthToken) -> Self {
        Self {
            user_id,
            auth_token,
        }
    }
}

/// The persisted session record.
///
/// The storefront keeps more than the identity under this key (names, email,
/// admin flag); only the two fields the cart needs are read, and a record
/// missing either of them counts as "no session".
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionRecord {
    #[serde(default)]
    user_id: Option<UserId>,
    #[serde(default)]
    auth_token: Option<AuthToken>,
}

/// Reads and writes the session record in the local store.
#[derive(Debug, Clone)]
pub struct SessionStore<S> {
    store: S,
}

impl<S: KeyValueStore> SessionStore<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Current identity, or `None` when logged out or the record is unusable.
    pub async fn load(&self) -> Result<Option<Identity>, StoreError> {
        let Some(raw) = self.store.get(keys::SESSION).await? else {
            return Ok(None);
        };

        match serde_json::from_str::<SessionRecord>(&raw) {
            Ok(SessionRecord {
                user_id: Some(user_id),
                auth_token: Some(auth_token),
            }) => Ok(Some(Identity::new(user_id, auth_token))),
            Ok(_) => Ok(None),
            Err(err) => {
                tracing::warn!("ignoring malformed session record: {err}");
                Ok(None)
            }
        }
    }

    pub async fn save(&self, identity: &Identity) -> Result<(), StoreError> {
        let raw = serde_json::to_string(identity).map_err(|e| StoreError::Encode {
            key: keys::SESSION.to_string(),
            message: e.to_string(),
        })?;
        self.store.set(keys::SESSION, &raw).await
    }

    pub async fn clear(&self) -> Result<(), StoreError> {
        self.store.remove(keys::SESSION).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryStore;

    #[test]
    fn token_is_redacted_in_debug() {
        let identity = Identity::new(UserId::new(1), AuthToken::new("secret-token"));
        let rendered = format!("{identity:?}");
        assert!(!rendered.contains("secret-token"));
    }

    #[tokio::test]
    async fn save_load_clear() {
        let sessions = SessionStore::new(InMemoryStore::new());
        assert_eq!(sessions.load().await.unwrap(), None);

        let identity = Identity::new(UserId::new(9), AuthToken::new("t"));
        sessions.save(&identity).await.unwrap();
        assert_eq!(sessions.load().await.unwrap(), Some(identity));

        sessions.clear().await.unwrap();
        assert_eq!(sessions.load().await.unwrap(), None);
    }

    #[tokio::test]
    async fn storefront_record_without_token_is_no_session() {
        let store = InMemoryStore::with_entries([(
            keys::SESSION,
            r#"{"firstName":"John","email":"john@example.com","isAdmin":false}"#,
        )]);
        assert_eq!(SessionStore::new(store).load().await.unwrap(), None);
    }

    #[tokio::test]
    async fn extra_fields_are_ignored() {
        let store = InMemoryStore::with_entries([(
            keys::SESSION,
            r#"{"userId":3,"authToken":"abc","firstName":"Ann","isAdmin":true}"#,
        )]);
        let identity = SessionStore::new(store).load().await.unwrap().unwrap();
        assert_eq!(identity.user_id, UserId::new(3));
        assert_eq!(identity.auth_token.expose(), "abc");
    }

    #[tokio::test]
    async fn malformed_record_is_no_session() {
        let store = InMemoryStore::with_entries([(keys::SESSION, "{not json")]);
        assert_eq!(SessionStore::new(store).load().await.unwrap(), None);
    }
}
