//! Scope materialization from upstream group membership, plus the cache
//! port that stores materialized scopes under their token id.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use graphscope_core::{AppError, AppResult, GroupId};
use graphscope_domain::{AdmissionPolicy, DirectoryMember, Resource, Scope, classify};

/// Upstream page size for group-member enumeration.
const MEMBER_PAGE_SIZE: usize = 100;

// ---------------------------------------------------------------------------
// Ports
// ---------------------------------------------------------------------------

/// One page of group members plus the continuation cursor, if any.
#[derive(Debug, Clone, Default)]
pub struct MemberPage {
    pub members: Vec<DirectoryMember>,
    pub next_cursor: Option<String>,
}

/// A places-catalogue record used to enrich already-admitted resources.
#[derive(Debug, Clone, Default)]
pub struct PlaceRecord {
    pub id: String,
    pub mail: Option<String>,
    pub display_name: Option<String>,
    pub capacity: Option<u32>,
    pub location: Option<String>,
}

/// Gateway port for the upstream directory.
#[async_trait]
pub trait DirectoryGateway: Send + Sync {
    /// Fetches one page of group members. A `None` cursor requests the
    /// first page; the returned cursor continues the enumeration.
    async fn fetch_member_page(
        &self,
        group_id: &GroupId,
        cursor: Option<&str>,
        page_size: usize,
    ) -> AppResult<MemberPage>;

    /// Fetches the upstream places catalogue.
    async fn fetch_places(&self) -> AppResult<Vec<PlaceRecord>>;
}

/// Cache port for materialized scopes, keyed by token id and indexed by
/// group for group-wide invalidation.
#[async_trait]
pub trait ScopeCache: Send + Sync {
    /// Stores `scope` under `token_id` and indexes it under its group.
    async fn put(&self, token_id: &str, scope: Scope, ttl: Duration) -> AppResult<()>;

    /// Returns the scope for `token_id` if present and unexpired.
    async fn get(&self, token_id: &str) -> AppResult<Option<Scope>>;

    /// Drops one entry. Idempotent.
    async fn remove(&self, token_id: &str) -> AppResult<()>;

    /// Evicts every entry currently indexed for `group_id`, returning how
    /// many entries were dropped. Idempotent.
    async fn remove_by_group(&self, group_id: &GroupId) -> AppResult<usize>;
}

// ---------------------------------------------------------------------------
// Service
// ---------------------------------------------------------------------------

/// Policy knobs for scope materialization.
#[derive(Debug, Clone)]
pub struct ScopeServiceConfig {
    pub admission_policy: AdmissionPolicy,
    pub max_scope_size: usize,
    pub use_places_api: bool,
    pub scope_ttl: Duration,
}

/// Application service building scopes from group membership.
#[derive(Clone)]
pub struct ScopeService {
    directory: Arc<dyn DirectoryGateway>,
    config: ScopeServiceConfig,
}

impl ScopeService {
    /// Creates a new scope service.
    #[must_use]
    pub fn new(directory: Arc<dyn DirectoryGateway>, config: ScopeServiceConfig) -> Self {
        Self { directory, config }
    }

    /// Materializes the scope for `group_id` from upstream membership.
    ///
    /// Enumeration is exhaustive modulo the upstream pagination contract.
    /// Any enumeration failure fails the whole build; nothing partial is
    /// returned. A places-catalogue failure only costs the enrichment.
    pub async fn build_scope(&self, group_id: &GroupId) -> AppResult<Scope> {
        let mut resources: Vec<Resource> = Vec::new();
        let mut seen_ids: HashSet<String> = HashSet::new();
        let mut seen_mails: HashSet<String> = HashSet::new();
        let mut cursor: Option<String> = None;
        let mut truncated = 0_usize;

        loop {
            let page = self
                .directory
                .fetch_member_page(group_id, cursor.as_deref(), MEMBER_PAGE_SIZE)
                .await?;

            for member in &page.members {
                let Some(resource) = classify(member, &self.config.admission_policy) else {
                    continue;
                };
                if !self.config.admission_policy.admits(resource.kind) {
                    continue;
                }

                // Deduplicate by (id, mail), first occurrence wins.
                let id_key = resource.id.to_lowercase();
                let duplicate_id = !resource.id.is_empty() && seen_ids.contains(&id_key);
                let duplicate_mail = resource
                    .mail
                    .as_ref()
                    .is_some_and(|mail| seen_mails.contains(mail));
                if duplicate_id || duplicate_mail {
                    continue;
                }

                if resources.len() >= self.config.max_scope_size {
                    truncated += 1;
                    continue;
                }

                if !resource.id.is_empty() {
                    seen_ids.insert(id_key);
                }
                if let Some(mail) = &resource.mail {
                    seen_mails.insert(mail.clone());
                }
                resources.push(resource);
            }

            match page.next_cursor {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }

        if truncated > 0 {
            tracing::warn!(
                group_id = %group_id,
                kept = resources.len(),
                dropped = truncated,
                "scope truncated to the configured maximum size"
            );
        }

        if resources.is_empty() {
            return Err(AppError::EmptyScope(group_id.to_string()));
        }

        if self.config.use_places_api {
            match self.directory.fetch_places().await {
                Ok(places) => enrich_from_places(&mut resources, &places),
                Err(error) => {
                    tracing::warn!(group_id = %group_id, %error, "places supplementation failed");
                }
            }
        }

        let now = Utc::now();
        let expires_at = now
            + chrono::Duration::from_std(self.config.scope_ttl)
                .map_err(|error| AppError::Internal(format!("invalid scope TTL: {error}")))?;

        Ok(Scope::new(group_id.clone(), resources, now, expires_at))
    }

    /// Returns the configured scope TTL.
    #[must_use]
    pub fn scope_ttl(&self) -> Duration {
        self.config.scope_ttl
    }
}

/// Fills missing advisory fields from places records. Supplementation
/// never adds new resources and never removes existing ones.
fn enrich_from_places(resources: &mut [Resource], places: &[PlaceRecord]) {
    for resource in resources.iter_mut() {
        let matched = places.iter().find(|place| {
            (!place.id.is_empty() && resource.matches(&place.id))
                || place
                    .mail
                    .as_deref()
                    .is_some_and(|mail| resource.matches(mail))
        });
        let Some(place) = matched else {
            continue;
        };

        if resource.display_name.is_none() {
            resource.display_name = place.display_name.clone();
        }
        if resource.capacity.is_none() {
            resource.capacity = place.capacity;
        }
        if resource.location.is_none() {
            resource.location = place.location.clone();
        }
    }
}
