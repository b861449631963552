use chrono::{DateTime, Utc};
use graphscope_core::GroupId;
use serde::{Deserialize, Serialize};

use crate::resource::Resource;

/// The materialized permission list backing one token.
///
/// A scope is immutable after creation; refreshing a group produces a new
/// scope rather than mutating a cached one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scope {
    group_id: GroupId,
    resources: Vec<Resource>,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

impl Scope {
    /// Creates a scope from already-deduplicated, already-admitted resources.
    #[must_use]
    pub fn new(
        group_id: GroupId,
        resources: Vec<Resource>,
        created_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            group_id,
            resources,
            created_at,
            expires_at,
        }
    }

    /// Returns the group whose membership produced this scope.
    #[must_use]
    pub fn group_id(&self) -> &GroupId {
        &self.group_id
    }

    /// Returns the admitted resources in enumeration order.
    #[must_use]
    pub fn resources(&self) -> &[Resource] {
        &self.resources
    }

    /// Returns the number of admitted resources.
    #[must_use]
    pub fn resource_count(&self) -> usize {
        self.resources.len()
    }

    /// Returns when the scope was materialized.
    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns when the scope stops being servable.
    #[must_use]
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// Returns whether `candidate` identifies any resource in this scope,
    /// by id or mail, case-insensitively.
    #[must_use]
    pub fn contains(&self, candidate: &str) -> bool {
        self.resources
            .iter()
            .any(|resource| resource.matches(candidate))
    }

    /// Returns whether the scope has passed its expiry at `now`.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}
