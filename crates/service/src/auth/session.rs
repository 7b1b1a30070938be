//! Refresh-token cache: at most one live refresh token per user.

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("cache backend error: {0}")]
    Backend(String),
}

impl From<redis::RedisError> for SessionError {
    fn from(e: redis::RedisError) -> Self { SessionError::Backend(e.to_string()) }
}

/// Cache key holding the live refresh token of `user_id`.
pub fn session_key(user_id: Uuid) -> String {
    format!("refreshToken-{}", user_id)
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Unconditional overwrite.
    async fn put(&self, user_id: Uuid, refresh_token: &str, ttl_secs: u64) -> Result<(), SessionError>;
    async fn get(&self, user_id: Uuid) -> Result<Option<String>, SessionError>;
    /// Returns whether an entry existed.
    async fn delete(&self, user_id: Uuid) -> Result<bool, SessionError>;
}

/// Redis-backed store; `ConnectionManager` reconnects on its own and is cheap to clone.
#[derive(Clone)]
pub struct RedisSessionStore {
    conn: ConnectionManager,
}

impl RedisSessionStore {
    pub async fn connect(url: &str) -> Result<Self, SessionError> {
        info!("connecting to redis");
        let client = Client::open(url)?;
        let conn = ConnectionManager::new(client).await?;
        info!("redis connection established");
        Ok(Self { conn })
    }

    pub async fn ping(&self) -> Result<bool, SessionError> {
        let mut conn = self.conn.clone();
        let pong: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(pong == "PONG")
    }
}

#[async_trait]
impl SessionStore for RedisSessionStore {
    async fn put(&self, user_id: Uuid, refresh_token: &str, ttl_secs: u64) -> Result<(), SessionError> {
        let mut conn = self.conn.clone();
        let _: () = conn.set_ex(session_key(user_id), refresh_token, ttl_secs).await?;
        Ok(())
    }

    async fn get(&self, user_id: Uuid) -> Result<Option<String>, SessionError> {
        let mut conn = self.conn.clone();
        let value: Option<String> = conn.get(session_key(user_id)).await?;
        Ok(value)
    }

    async fn delete(&self, user_id: Uuid) -> Result<bool, SessionError> {
        let mut conn = self.conn.clone();
        let deleted: i64 = conn.del(session_key(user_id)).await?;
        Ok(deleted > 0)
    }
}

/// In-memory store with TTL for tests and local runs without redis.
pub mod mock {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::time::{Duration, Instant};

    #[derive(Default)]
    pub struct InMemorySessionStore {
        entries: Mutex<HashMap<String, (String, Instant)>>,
    }

    impl InMemorySessionStore {
        pub fn new() -> Self { Self::default() }

        pub fn contains(&self, user_id: Uuid) -> bool {
            let entries = self.entries.lock().unwrap();
            entries
                .get(&session_key(user_id))
                .map(|(_, deadline)| *deadline > Instant::now())
                .unwrap_or(false)
        }
    }

    #[async_trait]
    impl SessionStore for InMemorySessionStore {
        async fn put(&self, user_id: Uuid, refresh_token: &str, ttl_secs: u64) -> Result<(), SessionError> {
            let deadline = Instant::now() + Duration::from_secs(ttl_secs);
            self.entries.lock().unwrap().insert(session_key(user_id), (refresh_token.to_string(), deadline));
            Ok(())
        }

        async fn get(&self, user_id: Uuid) -> Result<Option<String>, SessionError> {
            let mut entries = self.entries.lock().unwrap();
            let key = session_key(user_id);
            match entries.get(&key) {
                Some((token, deadline)) if *deadline > Instant::now() => Ok(Some(token.clone())),
                Some(_) => {
                    entries.remove(&key);
                    Ok(None)
                }
                None => Ok(None),
            }
        }

        async fn delete(&self, user_id: Uuid) -> Result<bool, SessionError> {
            Ok(self.entries.lock().unwrap().remove(&session_key(user_id)).is_some())
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[tokio::test]
        async fn put_overwrites_and_delete_removes() {
            let store = InMemorySessionStore::new();
            let id = Uuid::new_v4();
            store.put(id, "one", 60).await.unwrap();
            store.put(id, "two", 60).await.unwrap();
            assert_eq!(store.get(id).await.unwrap().as_deref(), Some("two"));
            assert!(store.delete(id).await.unwrap());
            assert!(!store.delete(id).await.unwrap());
            assert_eq!(store.get(id).await.unwrap(), None);
        }

        #[tokio::test]
        async fn zero_ttl_entry_is_already_gone() {
            let store = InMemorySessionStore::new();
            let id = Uuid::new_v4();
            store.put(id, "tok", 0).await.unwrap();
            assert_eq!(store.get(id).await.unwrap(), None);
            assert!(!store.contains(id));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_is_prefixed_with_refresh_token() {
        let id = Uuid::nil();
        assert_eq!(session_key(id), "refreshToken-00000000-0000-0000-0000-000000000000");
    }
}
