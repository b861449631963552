use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use graphscope_application::ScopeCache;
use graphscope_core::{AppResult, GroupId};
use graphscope_domain::Scope;
use tokio::sync::RwLock;

#[derive(Debug, Clone)]
struct ScopeCacheEntry {
    scope: Scope,
    expires_at: Instant,
}

/// Entries and the group index live under one lock so that insertions and
/// evictions update both atomically.
#[derive(Default)]
struct CacheState {
    entries: HashMap<String, ScopeCacheEntry>,
    group_index: HashMap<GroupId, HashSet<String>>,
}

impl CacheState {
    fn remove_entry(&mut self, token_id: &str) -> bool {
        let Some(entry) = self.entries.remove(token_id) else {
            return false;
        };

        let group_id = entry.scope.group_id().clone();
        if let Some(token_ids) = self.group_index.get_mut(&group_id) {
            token_ids.remove(token_id);
            if token_ids.is_empty() {
                self.group_index.remove(&group_id);
            }
        }

        true
    }
}

/// In-memory scope cache adapter.
#[derive(Default)]
pub struct InMemoryScopeCache {
    state: RwLock<CacheState>,
}

impl InMemoryScopeCache {
    /// Creates an empty in-memory scope cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ScopeCache for InMemoryScopeCache {
    async fn put(&self, token_id: &str, scope: Scope, ttl: Duration) -> AppResult<()> {
        let now = Instant::now();
        let expires_at = now.checked_add(ttl).unwrap_or(now);
        let group_id = scope.group_id().clone();

        let mut state = self.state.write().await;
        state
            .entries
            .insert(token_id.to_owned(), ScopeCacheEntry { scope, expires_at });
        state
            .group_index
            .entry(group_id)
            .or_default()
            .insert(token_id.to_owned());

        Ok(())
    }

    async fn get(&self, token_id: &str) -> AppResult<Option<Scope>> {
        {
            let state = self.state.read().await;
            match state.entries.get(token_id) {
                Some(entry) if entry.expires_at > Instant::now() => {
                    return Ok(Some(entry.scope.clone()));
                }
                Some(_) => {}
                None => return Ok(None),
            }
        }

        // Expired entry: evict lazily under the write lock.
        let mut state = self.state.write().await;
        if state
            .entries
            .get(token_id)
            .is_some_and(|entry| entry.expires_at <= Instant::now())
        {
            state.remove_entry(token_id);
        }

        Ok(None)
    }

    async fn remove(&self, token_id: &str) -> AppResult<()> {
        let mut state = self.state.write().await;
        state.remove_entry(token_id);
        Ok(())
    }

    async fn remove_by_group(&self, group_id: &GroupId) -> AppResult<usize> {
        let mut state = self.state.write().await;
        let Some(token_ids) = state.group_index.remove(group_id) else {
            return Ok(0);
        };

        let mut evicted = 0;
        for token_id in token_ids {
            if state.entries.remove(&token_id).is_some() {
                evicted += 1;
            }
        }

        Ok(evicted)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use chrono::Utc;
    use graphscope_application::ScopeCache;
    use graphscope_core::GroupId;
    use graphscope_domain::{Resource, ResourceKind, Scope};

    use super::InMemoryScopeCache;

    fn group(value: &str) -> GroupId {
        GroupId::new(value).expect("valid group")
    }

    fn scope(group_id: &str) -> Scope {
        let now = Utc::now();
        Scope::new(
            group(group_id),
            vec![Resource {
                id: "r1".to_owned(),
                mail: Some("room-a@x".to_owned()),
                kind: ResourceKind::Room,
                display_name: None,
                capacity: None,
                location: None,
            }],
            now,
            now + chrono::Duration::seconds(900),
        )
    }

    const TTL: Duration = Duration::from_secs(900);

    #[tokio::test]
    async fn get_after_put_returns_equal_scope() {
        let cache = InMemoryScopeCache::new();
        let stored = scope("G1");

        cache.put("t1", stored.clone(), TTL).await.expect("put succeeds");
        let loaded = cache.get("t1").await.expect("get succeeds");

        assert_eq!(loaded, Some(stored));
    }

    #[tokio::test]
    async fn expired_entries_are_absent() {
        let cache = InMemoryScopeCache::new();
        cache
            .put("t1", scope("G1"), Duration::ZERO)
            .await
            .expect("put succeeds");

        let loaded = cache.get("t1").await.expect("get succeeds");
        assert_eq!(loaded, None);
    }

    #[tokio::test]
    async fn remove_is_idempotent() {
        let cache = InMemoryScopeCache::new();
        cache.put("t1", scope("G1"), TTL).await.expect("put succeeds");

        cache.remove("t1").await.expect("first remove");
        cache.remove("t1").await.expect("second remove");

        assert_eq!(cache.get("t1").await.expect("get succeeds"), None);
    }

    #[tokio::test]
    async fn remove_by_group_evicts_only_that_group() {
        let cache = InMemoryScopeCache::new();
        cache.put("t1", scope("G1"), TTL).await.expect("put succeeds");
        cache.put("t2", scope("G1"), TTL).await.expect("put succeeds");
        cache.put("t3", scope("G2"), TTL).await.expect("put succeeds");

        let evicted = cache
            .remove_by_group(&group("G1"))
            .await
            .expect("invalidate succeeds");
        assert_eq!(evicted, 2);

        assert_eq!(cache.get("t1").await.expect("get succeeds"), None);
        assert_eq!(cache.get("t2").await.expect("get succeeds"), None);
        assert!(cache.get("t3").await.expect("get succeeds").is_some());

        // Idempotent.
        let again = cache
            .remove_by_group(&group("G1"))
            .await
            .expect("invalidate succeeds");
        assert_eq!(again, 0);
    }

    #[tokio::test]
    async fn group_invalidation_is_case_insensitive() {
        let cache = InMemoryScopeCache::new();
        cache.put("t1", scope("Group-One"), TTL).await.expect("put succeeds");

        let evicted = cache
            .remove_by_group(&group("GROUP-ONE"))
            .await
            .expect("invalidate succeeds");
        assert_eq!(evicted, 1);
    }
}
