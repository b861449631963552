//! Redis-backed scope cache for multi-instance deployments.

use std::time::Duration;

use async_trait::async_trait;
use graphscope_application::ScopeCache;
use graphscope_core::{AppError, AppResult, GroupId};
use graphscope_domain::Scope;
use redis::AsyncCommands;

/// Extra lifetime granted to the group index beyond the scope TTL. The
/// index may outlive individual entries; consumers must not assume the
/// converse.
const GROUP_INDEX_GRACE_SECONDS: u64 = 60;

/// Redis implementation of the scope cache port.
#[derive(Clone)]
pub struct RedisScopeCache {
    client: redis::Client,
    key_prefix: String,
}

impl RedisScopeCache {
    /// Creates a cache adapter with a configured Redis client and key prefix.
    #[must_use]
    pub fn new(client: redis::Client, key_prefix: impl Into<String>) -> Self {
        Self {
            client,
            key_prefix: key_prefix.into(),
        }
    }

    fn scope_key(&self, token_id: &str) -> String {
        format!("{}:scope:{token_id}", self.key_prefix)
    }

    fn group_key(&self, group_id: &GroupId) -> String {
        format!(
            "{}:group:{}",
            self.key_prefix,
            group_id.as_str().to_lowercase()
        )
    }

    async fn connection(&self) -> AppResult<redis::aio::MultiplexedConnection> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(|error| AppError::Internal(format!("failed to connect to redis: {error}")))
    }
}

#[async_trait]
impl ScopeCache for RedisScopeCache {
    async fn put(&self, token_id: &str, scope: Scope, ttl: Duration) -> AppResult<()> {
        let encoded = serde_json::to_string(&scope)
            .map_err(|error| AppError::Internal(format!("failed to encode scope: {error}")))?;
        let group_key = self.group_key(scope.group_id());
        let ttl_seconds = ttl.as_secs().max(1);

        let mut connection = self.connection().await?;
        connection
            .set_ex::<_, _, ()>(self.scope_key(token_id), encoded, ttl_seconds)
            .await
            .map_err(|error| {
                AppError::Internal(format!("failed to write scope cache entry: {error}"))
            })?;
        connection
            .sadd::<_, _, ()>(&group_key, token_id)
            .await
            .map_err(|error| {
                AppError::Internal(format!("failed to index scope cache entry: {error}"))
            })?;
        connection
            .expire::<_, ()>(&group_key, (ttl_seconds + GROUP_INDEX_GRACE_SECONDS) as i64)
            .await
            .map_err(|error| {
                AppError::Internal(format!("failed to expire scope group index: {error}"))
            })?;

        Ok(())
    }

    async fn get(&self, token_id: &str) -> AppResult<Option<Scope>> {
        let mut connection = self.connection().await?;
        let encoded: Option<String> = connection
            .get(self.scope_key(token_id))
            .await
            .map_err(|error| {
                AppError::Internal(format!("failed to read scope cache entry: {error}"))
            })?;

        encoded
            .as_deref()
            .map(|value| {
                serde_json::from_str::<Scope>(value).map_err(|error| {
                    AppError::Internal(format!("invalid scope cache entry: {error}"))
                })
            })
            .transpose()
    }

    async fn remove(&self, token_id: &str) -> AppResult<()> {
        let mut connection = self.connection().await?;
        // The group index entry is left to its grace-window expiry.
        connection
            .del::<_, ()>(self.scope_key(token_id))
            .await
            .map_err(|error| {
                AppError::Internal(format!("failed to remove scope cache entry: {error}"))
            })
    }

    async fn remove_by_group(&self, group_id: &GroupId) -> AppResult<usize> {
        let group_key = self.group_key(group_id);
        let mut connection = self.connection().await?;

        let token_ids: Vec<String> = connection.smembers(&group_key).await.map_err(|error| {
            AppError::Internal(format!("failed to read scope group index: {error}"))
        })?;

        let mut evicted = 0_usize;
        for token_id in &token_ids {
            let removed: i64 = connection
                .del(self.scope_key(token_id))
                .await
                .map_err(|error| {
                    AppError::Internal(format!("failed to remove scope cache entry: {error}"))
                })?;
            evicted += usize::try_from(removed).unwrap_or(0);
        }

        connection.del::<_, ()>(&group_key).await.map_err(|error| {
            AppError::Internal(format!("failed to remove scope group index: {error}"))
        })?;

        Ok(evicted)
    }
}
