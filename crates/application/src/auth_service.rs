//! Login, refresh, and logout flows tying scopes, tokens, and the cache
//! together.

use std::collections::HashMap;
use std::sync::Arc;

use graphscope_core::{AppError, AppResult, GroupId};
use graphscope_domain::Scope;

use crate::scope_service::{ScopeCache, ScopeService};
use crate::token_service::{TokenClaims, TokenService};

/// Configuration-owned mapping of API keys to the groups they may scope.
/// Read-only at runtime.
#[derive(Debug, Clone, Default)]
pub struct ApiKeyBindings {
    bindings: HashMap<String, Vec<GroupId>>,
}

impl ApiKeyBindings {
    /// Creates bindings from configuration.
    #[must_use]
    pub fn new(bindings: HashMap<String, Vec<GroupId>>) -> Self {
        Self { bindings }
    }

    /// Returns whether `api_key` is bound to `group_id`.
    ///
    /// An unknown key and a known key without the binding are
    /// indistinguishable to the caller, preventing key enumeration.
    #[must_use]
    pub fn is_bound(&self, api_key: &str, group_id: &GroupId) -> bool {
        self.bindings
            .get(api_key)
            .is_some_and(|groups| groups.contains(group_id))
    }

    /// Returns whether any bindings are configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

/// Successful login or refresh result.
#[derive(Debug, Clone)]
pub struct LoginOutput {
    pub token: String,
    pub group_id: GroupId,
    pub resource_count: usize,
    pub expires_in: i64,
}

/// Application service for the token lifecycle.
#[derive(Clone)]
pub struct AuthService {
    bindings: ApiKeyBindings,
    scope_service: ScopeService,
    token_service: Arc<TokenService>,
    scope_cache: Arc<dyn ScopeCache>,
}

impl AuthService {
    /// Creates a new auth service.
    #[must_use]
    pub fn new(
        bindings: ApiKeyBindings,
        scope_service: ScopeService,
        token_service: Arc<TokenService>,
        scope_cache: Arc<dyn ScopeCache>,
    ) -> Self {
        Self {
            bindings,
            scope_service,
            token_service,
            scope_cache,
        }
    }

    /// Exchanges an API key plus group id for a bearer token.
    ///
    /// Materializes the scope, mints a token keyed to it, and stores the
    /// scope under the token id. Nothing is cached when any step fails.
    pub async fn login(&self, api_key: &str, group_id: &str) -> AppResult<LoginOutput> {
        let group_id = GroupId::new(group_id)?;

        if !self.bindings.is_bound(api_key, &group_id) {
            return Err(AppError::InvalidCredentials(
                "api key is not bound to the requested group".to_owned(),
            ));
        }

        let scope = self.scope_service.build_scope(&group_id).await?;
        let minted = self.token_service.mint(api_key, &group_id, &scope)?;

        self.scope_cache
            .put(
                &minted.claims.jti,
                scope.clone(),
                self.scope_service.scope_ttl(),
            )
            .await?;

        tracing::info!(
            group_id = %group_id,
            resource_count = scope.resource_count(),
            "login issued scope token"
        );

        let expires_in = minted.expires_in();
        Ok(LoginOutput {
            token: minted.token,
            group_id,
            resource_count: scope.resource_count(),
            expires_in,
        })
    }

    /// Validates a bearer token and resolves its scope from the cache.
    pub async fn authenticate(&self, token: &str) -> AppResult<(TokenClaims, Scope)> {
        let claims = self.token_service.validate(token).await?;

        let scope = self
            .scope_cache
            .get(&claims.jti)
            .await?
            .ok_or_else(|| AppError::ScopeMissing(claims.jti.clone()))?;

        Ok((claims, scope))
    }

    /// Mints a new token from a live one, revoking the old.
    pub async fn refresh(&self, token: &str) -> AppResult<LoginOutput> {
        let (claims, scope) = self.authenticate(token).await?;

        let group_id = scope.group_id().clone();
        let minted = self.token_service.mint(&claims.sub, &group_id, &scope)?;

        self.scope_cache
            .put(
                &minted.claims.jti,
                scope.clone(),
                self.scope_service.scope_ttl(),
            )
            .await?;

        self.token_service.revoke(token).await?;
        self.scope_cache.remove(&claims.jti).await?;

        let expires_in = minted.expires_in();
        Ok(LoginOutput {
            token: minted.token,
            group_id,
            resource_count: scope.resource_count(),
            expires_in,
        })
    }

    /// Revokes a live token and drops its cached scope. Idempotent.
    pub async fn logout(&self, token: &str) -> AppResult<()> {
        let claims = self.token_service.validate(token).await?;

        self.token_service.revoke(token).await?;
        self.scope_cache.remove(&claims.jti).await?;

        Ok(())
    }

    /// Evicts every cached scope for `group_id`; tokens minted against
    /// them resolve to `ScopeMissing` until their holders re-login.
    pub async fn invalidate_group(&self, group_id: &GroupId) -> AppResult<usize> {
        let evicted = self.scope_cache.remove_by_group(group_id).await?;
        tracing::info!(group_id = %group_id, evicted, "group scopes invalidated");
        Ok(evicted)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::{HashMap, HashSet};
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use graphscope_core::{AppError, AppResult, GroupId};
    use graphscope_domain::{AdmissionPolicy, DirectoryMember, ResourceKind, Scope};
    use tokio::sync::Mutex;

    use crate::scope_service::{
        DirectoryGateway, MemberPage, PlaceRecord, ScopeCache, ScopeService, ScopeServiceConfig,
    };
    use crate::token_service::{TokenService, TokenServiceConfig};

    use super::{ApiKeyBindings, AuthService};

    struct FakeDirectory {
        members: Vec<DirectoryMember>,
    }

    #[async_trait]
    impl DirectoryGateway for FakeDirectory {
        async fn fetch_member_page(
            &self,
            _group_id: &GroupId,
            _cursor: Option<&str>,
            _page_size: usize,
        ) -> AppResult<MemberPage> {
            Ok(MemberPage {
                members: self.members.clone(),
                next_cursor: None,
            })
        }

        async fn fetch_places(&self) -> AppResult<Vec<PlaceRecord>> {
            Ok(Vec::new())
        }
    }

    #[derive(Default)]
    struct FakeScopeCache {
        entries: Mutex<HashMap<String, Scope>>,
    }

    #[async_trait]
    impl ScopeCache for FakeScopeCache {
        async fn put(&self, token_id: &str, scope: Scope, _ttl: Duration) -> AppResult<()> {
            self.entries.lock().await.insert(token_id.to_owned(), scope);
            Ok(())
        }

        async fn get(&self, token_id: &str) -> AppResult<Option<Scope>> {
            Ok(self.entries.lock().await.get(token_id).cloned())
        }

        async fn remove(&self, token_id: &str) -> AppResult<()> {
            self.entries.lock().await.remove(token_id);
            Ok(())
        }

        async fn remove_by_group(&self, group_id: &GroupId) -> AppResult<usize> {
            let mut entries = self.entries.lock().await;
            let before = entries.len();
            entries.retain(|_, scope| scope.group_id() != group_id);
            Ok(before - entries.len())
        }
    }

    fn member(id: &str, mail: &str, display_name: &str) -> DirectoryMember {
        DirectoryMember {
            id: id.to_owned(),
            mail: Some(mail.to_owned()),
            display_name: Some(display_name.to_owned()),
        }
    }

    fn auth_service(members: Vec<DirectoryMember>) -> AuthService {
        let scope_service = ScopeService::new(
            Arc::new(FakeDirectory { members }),
            ScopeServiceConfig {
                admission_policy: AdmissionPolicy::new(
                    [ResourceKind::Room, ResourceKind::Workspace]
                        .into_iter()
                        .collect::<HashSet<_>>(),
                    false,
                ),
                max_scope_size: 500,
                use_places_api: false,
                scope_ttl: Duration::from_secs(900),
            },
        );
        let token_service = Arc::new(
            TokenService::new(TokenServiceConfig {
                signing_key: b"0123456789abcdef0123456789abcdef".to_vec(),
                issuer: "graphscope-proxy".to_owned(),
                audience: "graphscope-clients".to_owned(),
                token_lifetime_secs: 900,
            })
            .expect("valid config"),
        );
        let bindings = ApiKeyBindings::new(HashMap::from([(
            "k1".to_owned(),
            vec![GroupId::new("G1").expect("valid group")],
        )]));

        AuthService::new(
            bindings,
            scope_service,
            token_service,
            Arc::new(FakeScopeCache::default()),
        )
    }

    fn default_members() -> Vec<DirectoryMember> {
        vec![
            member("r1", "room-a@x", "Conference Room A (Cap: 10)"),
            member("r2", "desk-1@x", "Workspace Desk 1"),
            member("u1", "alice@x", "Alice"),
        ]
    }

    #[tokio::test]
    async fn login_returns_token_with_resource_count() {
        let service = auth_service(default_members());

        let output = service.login("k1", "G1").await.expect("login succeeds");
        assert_eq!(output.resource_count, 3);
        assert_eq!(output.expires_in, 900);
        assert_eq!(output.group_id.as_str(), "G1");

        let (claims, scope) = service
            .authenticate(&output.token)
            .await
            .expect("token resolves");
        assert_eq!(claims.rc, 3);
        assert!(scope.contains("room-a@x"));
    }

    #[tokio::test]
    async fn unknown_key_and_unbound_group_are_indistinguishable() {
        let service = auth_service(default_members());

        let unknown = service.login("nope", "G1").await.expect_err("must fail");
        let unbound = service.login("k1", "G2").await.expect_err("must fail");

        assert!(matches!(unknown, AppError::InvalidCredentials(_)));
        assert!(matches!(unbound, AppError::InvalidCredentials(_)));
        assert_eq!(unknown.to_string(), unbound.to_string());
    }

    #[tokio::test]
    async fn logout_revokes_and_drops_scope() {
        let service = auth_service(default_members());
        let output = service.login("k1", "G1").await.expect("login succeeds");

        service.logout(&output.token).await.expect("logout succeeds");

        let error = service
            .authenticate(&output.token)
            .await
            .expect_err("must fail");
        assert!(matches!(error, AppError::TokenRevoked));
    }

    #[tokio::test]
    async fn refresh_rotates_token_and_revokes_the_old_one() {
        let service = auth_service(default_members());
        let original = service.login("k1", "G1").await.expect("login succeeds");

        let refreshed = service.refresh(&original.token).await.expect("refresh succeeds");
        assert_ne!(refreshed.token, original.token);
        assert_eq!(refreshed.resource_count, 3);

        let error = service
            .authenticate(&original.token)
            .await
            .expect_err("old token must fail");
        assert!(matches!(error, AppError::TokenRevoked));

        service
            .authenticate(&refreshed.token)
            .await
            .expect("new token resolves");
    }

    #[tokio::test]
    async fn group_invalidation_leaves_tokens_scope_missing() {
        let service = auth_service(default_members());
        let output = service.login("k1", "G1").await.expect("login succeeds");

        let evicted = service
            .invalidate_group(&GroupId::new("g1").expect("valid group"))
            .await
            .expect("invalidation succeeds");
        assert_eq!(evicted, 1);

        let error = service
            .authenticate(&output.token)
            .await
            .expect_err("must fail");
        assert!(matches!(error, AppError::ScopeMissing(_)));
    }

    #[tokio::test]
    async fn empty_group_surfaces_typed_error() {
        let service = auth_service(vec![DirectoryMember {
            id: "u1".to_owned(),
            mail: None,
            display_name: Some("No Mail".to_owned()),
        }]);

        let error = service.login("k1", "G1").await.expect_err("must fail");
        assert!(matches!(error, AppError::EmptyScope(_)));
    }
}
