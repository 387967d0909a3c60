use std::fmt::{Debug, Formatter};

use async_trait::async_trait;
use chrono::Utc;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use tower_sessions::SessionStore;
use tower_sessions::session::{Id, Record};
use tower_sessions::session_store::{self, Error as SessionStoreError};

/// Cookie session records stored as JSON strings with a redis TTL.
#[derive(Clone)]
pub struct RedisSessionStore {
    connection: ConnectionManager,
    key_prefix: String,
}

impl RedisSessionStore {
    /// Opens a reconnecting connection for session traffic.
    pub async fn connect(
        client: redis::Client,
        key_prefix: impl Into<String>,
    ) -> redis::RedisResult<Self> {
        Ok(Self {
            connection: ConnectionManager::new(client).await?,
            key_prefix: key_prefix.into(),
        })
    }

    fn key_for(&self, session_id: &Id) -> String {
        format!("{}:{}", self.key_prefix, session_id)
    }
}

impl Debug for RedisSessionStore {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("RedisSessionStore")
            .field("key_prefix", &self.key_prefix)
            .finish_non_exhaustive()
    }
}

fn remaining_ttl_seconds(expiry_unix_timestamp: i64, now_unix_timestamp: i64) -> Option<u64> {
    u64::try_from(expiry_unix_timestamp - now_unix_timestamp)
        .ok()
        .filter(|seconds| *seconds > 0)
}

fn backend_error(error: redis::RedisError) -> SessionStoreError {
    SessionStoreError::Backend(error.to_string())
}

#[async_trait]
impl SessionStore for RedisSessionStore {
    async fn save(&self, session_record: &Record) -> session_store::Result<()> {
        let key = self.key_for(&session_record.id);
        let mut connection = self.connection.clone();

        let Some(ttl_seconds) = remaining_ttl_seconds(
            session_record.expiry_date.unix_timestamp(),
            Utc::now().timestamp(),
        ) else {
            connection.del::<_, i64>(key).await.map_err(backend_error)?;
            return Ok(());
        };

        let encoded_record = serde_json::to_string(session_record)
            .map_err(|error| SessionStoreError::Encode(error.to_string()))?;

        connection
            .set_ex::<_, _, ()>(key, encoded_record, ttl_seconds)
            .await
            .map_err(backend_error)
    }

    async fn load(&self, session_id: &Id) -> session_store::Result<Option<Record>> {
        let mut connection = self.connection.clone();
        let encoded_record: Option<String> = connection
            .get(self.key_for(session_id))
            .await
            .map_err(backend_error)?;

        encoded_record
            .as_deref()
            .map(|value| {
                serde_json::from_str::<Record>(value)
                    .map_err(|error| SessionStoreError::Decode(error.to_string()))
            })
            .transpose()
    }

    async fn delete(&self, session_id: &Id) -> session_store::Result<()> {
        let mut connection = self.connection.clone();
        connection
            .del::<_, i64>(self.key_for(session_id))
            .await
            .map_err(backend_error)?;

        Ok(())
    }
}
