//! Session and store context: the single source of truth for "who is
//! logged in, with what credential, managing which store".
//!
//! ## Design
//! - `SessionContext` is a cheap-clone handle over shared inner state; it
//!   is the sole writer of the session. Callers get immutable snapshots.
//! - Every operation runs under a single in-flight guard. The original
//!   client relied on UI event handlers for serialization; here the
//!   exclusion is explicit so the context is safe off a single-threaded
//!   event loop.
//! - Error policy is asymmetric on purpose: the startup probe fails open
//!   on non-401 errors, a 401 during a later profile refresh forces
//!   logout, and a failed token refresh does nothing. Do not unify these
//!   without a product decision.

pub mod toggle;

use std::sync::Arc;

use crate::api::auth::AuthApi;
use crate::api::products::ProductApi;
use crate::api::stores::StoreApi;
use crate::api::{ApiClient, ApiError};
use crate::config::Config;
use crate::models::{AuthPayload, LoginCredentials, Store, User};
use crate::storage::CredentialStore;

/// Result alias for session operations.
pub type SessionResult<T> = Result<T, SessionError>;

/// Failure of a session operation.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The operation needs a logged-in session.
    #[error("not authenticated")]
    NotAuthenticated,

    /// The requested store is not in the cached store list. The context
    /// never re-fetches implicitly here; call `refresh_store_data` first.
    #[error("store {store_id} not found in the cached store list")]
    StoreNotFound { store_id: String },

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

impl SessionError {
    /// Message suitable for direct user display.
    pub fn user_message(&self) -> String {
        match self {
            Self::NotAuthenticated => "You are not logged in.".into(),
            Self::StoreNotFound { .. } => "Store not found.".into(),
            Self::Api(err) => err.user_message(),
            Self::Storage(_) => "Could not access local storage.".into(),
        }
    }
}

/// Immutable snapshot of the session state.
///
/// Invariants: `user` and `token` are both present or both absent;
/// `active_store`, when present, is an element of `all_stores` by id.
#[derive(Debug, Clone, Default)]
pub struct Session {
    pub user: Option<User>,
    pub token: Option<String>,
    pub active_store: Option<Store>,
    pub all_stores: Vec<Store>,
}

impl Session {
    pub fn is_authenticated(&self) -> bool {
        self.user.is_some() && self.token.is_some()
    }
}

struct Inner {
    auth: AuthApi,
    stores: StoreApi,
    products: ProductApi,
    creds: CredentialStore,
    /// Snapshot state; never held across an await.
    state: parking_lot::Mutex<Session>,
    /// Single in-flight guard serializing every operation.
    op_guard: tokio::sync::Mutex<()>,
}

/// Handle to the session and store context.
#[derive(Clone)]
pub struct SessionContext {
    inner: Arc<Inner>,
}

impl SessionContext {
    /// Build a context from configuration and a credential store.
    pub fn new(config: Config, creds: CredentialStore) -> anyhow::Result<Self> {
        let client = ApiClient::new(config)?;
        Ok(Self {
            inner: Arc::new(Inner {
                auth: AuthApi::new(client.clone()),
                stores: StoreApi::new(client.clone()),
                products: ProductApi::new(client),
                creds,
                state: parking_lot::Mutex::new(Session::default()),
                op_guard: tokio::sync::Mutex::new(()),
            }),
        })
    }

    // ── Accessors ────────────────────────────────────────────

    /// Snapshot of the current session state.
    pub fn session(&self) -> Session {
        self.inner.state.lock().clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.inner.state.lock().is_authenticated()
    }

    pub fn can_access_store(&self, store_slug: &str) -> bool {
        self.inner
            .state
            .lock()
            .user
            .as_ref()
            .is_some_and(|u| u.can_access_store(store_slug))
    }

    pub fn can_manage_store(&self, store_slug: &str) -> bool {
        self.inner
            .state
            .lock()
            .user
            .as_ref()
            .is_some_and(|u| u.can_manage_store(store_slug))
    }

    /// The remembered login email, if any.
    pub fn remembered_email(&self) -> Option<String> {
        self.inner.creds.remember_email()
    }

    /// Product endpoint wrapper sharing this context's HTTP client.
    pub fn products(&self) -> &ProductApi {
        &self.inner.products
    }

    /// Store endpoint wrapper sharing this context's HTTP client.
    pub fn stores(&self) -> &StoreApi {
        &self.inner.stores
    }

    /// Auth endpoint wrapper sharing this context's HTTP client.
    pub fn auth(&self) -> &AuthApi {
        &self.inner.auth
    }

    // ── Operations ───────────────────────────────────────────

    /// Restore a persisted session, if any. Runs once at process start.
    ///
    /// A 401 from the validity probe discards the persisted credentials
    /// (fail closed); any other probe failure assumes the token is still
    /// valid (fail open) so a flaky network cannot log the user out.
    /// Failure to load the store list is logged and swallowed; it must
    /// not block session restoration.
    pub async fn initialize(&self) -> SessionResult<()> {
        let _op = self.inner.op_guard.lock().await;
        tracing::info!("initializing session");

        let (Some(token), Some(user)) = (self.inner.creds.token(), self.inner.creds.profile())
        else {
            tracing::info!("no persisted session found");
            return Ok(());
        };

        if !self.inner.auth.validate_token(&token).await {
            tracing::info!("persisted token rejected; clearing credentials");
            self.inner.creds.clear();
            return Ok(());
        }

        self.adopt(user, token.clone());
        if let Err(err) = self.load_stores(&token).await {
            tracing::warn!(error = %err, "could not load stores during initialization; continuing");
        }
        tracing::info!("session restored");
        Ok(())
    }

    /// Log in with credentials. On success the token and profile are
    /// persisted and adopted; the store list is then loaded best-effort
    /// (its failure never fails the login). On failure the endpoint's
    /// error propagates unchanged and the session is untouched.
    pub async fn login(
        &self,
        credentials: &LoginCredentials,
        remember_email: bool,
    ) -> SessionResult<()> {
        let _op = self.inner.op_guard.lock().await;

        let payload = self.inner.auth.login(credentials).await?;
        self.persist_payload(&payload)?;
        if remember_email {
            self.inner.creds.set_remember_email(&credentials.email)?;
        } else {
            self.inner.creds.remove_remember_email();
        }

        let token = payload.token.clone();
        self.adopt(payload.user, payload.token);

        if let Err(err) = self.load_stores(&token).await {
            tracing::warn!(error = %err, "could not load stores after login; continuing");
        }
        tracing::info!("login complete");
        Ok(())
    }

    /// Clear the session. Purely local: memory state and the persisted
    /// token/profile are removed, no endpoint is called.
    pub async fn logout(&self) {
        let _op = self.inner.op_guard.lock().await;
        self.clear_session();
        tracing::info!("logged out");
    }

    /// Re-fetch the profile with the current token. A 401 forces logout
    /// before the error propagates; other failures propagate with no
    /// side effects.
    pub async fn refresh_user_data(&self) -> SessionResult<()> {
        let _op = self.inner.op_guard.lock().await;
        let token = self.current_token().ok_or(SessionError::NotAuthenticated)?;

        match self.inner.auth.me(&token).await {
            Ok(user) => {
                self.inner.creds.set_profile(&user)?;
                self.inner.state.lock().user = Some(user);
                Ok(())
            }
            Err(err @ ApiError::Unauthorized { .. }) => {
                tracing::info!("token rejected during profile refresh; logging out");
                self.clear_session();
                Err(err.into())
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Re-fetch the store list. Errors propagate; the caller decides
    /// recovery.
    pub async fn refresh_store_data(&self) -> SessionResult<()> {
        let _op = self.inner.op_guard.lock().await;
        let token = self.current_token().ok_or(SessionError::NotAuthenticated)?;
        self.load_stores(&token).await
    }

    /// Exchange the current token for a fresh one. Returns a success
    /// flag rather than an error so callers can decide fallback
    /// behavior; a failed refresh never logs the user out.
    pub async fn refresh_auth_token(&self) -> bool {
        let _op = self.inner.op_guard.lock().await;
        self.refresh_token_locked().await
    }

    /// Probe the current token and, if it is invalid, try a refresh.
    /// Returns whether the session ends up usable. Never forces logout:
    /// the next authenticated call surfaces the real error.
    pub async fn ensure_valid_token(&self) -> bool {
        let _op = self.inner.op_guard.lock().await;
        let Some(token) = self.current_token() else {
            tracing::warn!("no token available to validate");
            return false;
        };

        if self.inner.auth.validate_token(&token).await {
            return true;
        }

        tracing::info!("token invalid; attempting refresh");
        let refreshed = self.refresh_token_locked().await;
        if !refreshed {
            tracing::warn!("token refresh failed; leaving session in place");
        }
        refreshed
    }

    /// Select the active store from the cached list and persist the
    /// selection so later processes restore it. An unknown id fails with
    /// `StoreNotFound` and leaves the selection unchanged.
    pub async fn switch_store(&self, store_id: &str) -> SessionResult<()> {
        let _op = self.inner.op_guard.lock().await;
        {
            let mut state = self.inner.state.lock();
            let target = state
                .all_stores
                .iter()
                .find(|s| s.id == store_id)
                .cloned()
                .ok_or_else(|| SessionError::StoreNotFound {
                    store_id: store_id.to_string(),
                })?;
            tracing::info!(store = %target.name, "switching active store");
            state.active_store = Some(target);
        }
        self.inner.creds.set_active_store(store_id)?;
        Ok(())
    }

    // ── Internal helpers ─────────────────────────────────────

    fn current_token(&self) -> Option<String> {
        self.inner.state.lock().token.clone()
    }

    /// Adopt a user/token pair, upholding the both-or-neither invariant.
    fn adopt(&self, user: User, token: String) {
        let mut state = self.inner.state.lock();
        state.user = Some(user);
        state.token = Some(token);
    }

    fn clear_session(&self) {
        {
            let mut state = self.inner.state.lock();
            *state = Session::default();
        }
        self.inner.creds.clear();
    }

    fn persist_payload(&self, payload: &AuthPayload) -> SessionResult<()> {
        self.inner.creds.set_token(&payload.token)?;
        self.inner.creds.set_profile(&payload.user)?;
        Ok(())
    }

    /// Fetch the store list and re-derive the active store: keep the
    /// current selection when it survives, otherwise the persisted
    /// selection, otherwise prefer the first active store, otherwise the
    /// first store.
    async fn load_stores(&self, token: &str) -> SessionResult<()> {
        let stores = self.inner.stores.my_stores(token).await?;
        let persisted_id = self.inner.creds.active_store();

        let mut state = self.inner.state.lock();
        let current_id = state.active_store.as_ref().map(|s| s.id.clone());
        let active = current_id
            .and_then(|id| stores.iter().find(|s| s.id == id))
            .or_else(|| persisted_id.and_then(|id| stores.iter().find(|s| s.id == id)))
            .or_else(|| stores.iter().find(|s| s.is_active))
            .or_else(|| stores.first())
            .cloned();
        if let Some(store) = &active {
            tracing::debug!(store = %store.name, "active store selected");
        }
        state.all_stores = stores;
        state.active_store = active;
        Ok(())
    }

    /// Refresh while already holding the op guard.
    async fn refresh_token_locked(&self) -> bool {
        let Some(token) = self.current_token() else {
            tracing::warn!("cannot refresh without a token");
            return false;
        };

        let payload = match self.inner.auth.refresh(&token).await {
            Ok(payload) => payload,
            Err(err) => {
                tracing::error!(error = %err, "token refresh failed");
                return false;
            }
        };
        if let Err(err) = self.persist_payload(&payload) {
            tracing::error!(error = %err, "could not persist refreshed credentials");
            return false;
        }

        let token = payload.token.clone();
        self.adopt(payload.user, payload.token);

        // Reconcile the store list under the new grants; best-effort.
        if let Err(err) = self.load_stores(&token).await {
            tracing::warn!(error = %err, "could not reload stores after refresh; continuing");
        }
        tracing::info!("auth token refreshed");
        true
    }

    /// Replace the cached copy of a store wherever it appears.
    pub(crate) fn adopt_store(&self, store: Store) {
        let mut state = self.inner.state.lock();
        if let Some(slot) = state.all_stores.iter_mut().find(|s| s.id == store.id) {
            *slot = store.clone();
        }
        if state
            .active_store
            .as_ref()
            .is_some_and(|s| s.id == store.id)
        {
            state.active_store = Some(store);
        }
    }

    #[cfg(test)]
    pub(crate) fn seed_state(&self, session: Session) {
        *self.inner.state.lock() = session;
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PlatformRole;
    use tempfile::TempDir;

    fn test_context() -> (TempDir, SessionContext) {
        let tmp = TempDir::new().unwrap();
        let creds = CredentialStore::new(tmp.path().join("creds")).unwrap();
        let ctx = SessionContext::new(Config::with_base_url("http://127.0.0.1:1"), creds).unwrap();
        (tmp, ctx)
    }

    fn store(id: &str, active: bool) -> Store {
        Store {
            id: id.into(),
            name: format!("Store {id}"),
            slug: format!("store-{id}"),
            client_email: "c@b.c".into(),
            is_active: active,
            collections: Default::default(),
            settings: None,
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        }
    }

    fn seeded(ctx: &SessionContext, stores: Vec<Store>) {
        ctx.seed_state(Session {
            user: Some(User {
                id: "u1".into(),
                email: "a@b.c".into(),
                name: "A".into(),
                role: PlatformRole::StoreOwner,
                stores: vec![],
            }),
            token: Some("tok".into()),
            active_store: stores.first().cloned(),
            all_stores: stores,
        });
    }

    #[tokio::test]
    async fn switch_store_selects_cached_element() {
        let (_tmp, ctx) = test_context();
        seeded(&ctx, vec![store("s1", true), store("s2", true)]);

        ctx.switch_store("s2").await.unwrap();
        assert_eq!(ctx.session().active_store.unwrap().id, "s2");
    }

    #[tokio::test]
    async fn switch_to_unknown_store_fails_and_keeps_selection() {
        let (_tmp, ctx) = test_context();
        seeded(&ctx, vec![store("s1", true)]);

        let err = ctx.switch_store("s2").await.unwrap_err();
        assert!(matches!(err, SessionError::StoreNotFound { .. }));
        assert_eq!(ctx.session().active_store.unwrap().id, "s1");
    }

    #[tokio::test]
    async fn fresh_context_is_logged_out() {
        let (_tmp, ctx) = test_context();
        let session = ctx.session();
        assert!(!session.is_authenticated());
        assert!(session.user.is_none());
        assert!(session.token.is_none());
        assert!(session.all_stores.is_empty());
    }

    #[tokio::test]
    async fn logout_clears_everything() {
        let (_tmp, ctx) = test_context();
        seeded(&ctx, vec![store("s1", true)]);
        assert!(ctx.is_authenticated());

        ctx.logout().await;
        let session = ctx.session();
        assert!(session.user.is_none());
        assert!(session.token.is_none());
        assert!(session.active_store.is_none());
        assert!(session.all_stores.is_empty());
    }

    #[tokio::test]
    async fn refresh_ops_require_a_token() {
        let (_tmp, ctx) = test_context();
        assert!(matches!(
            ctx.refresh_user_data().await.unwrap_err(),
            SessionError::NotAuthenticated
        ));
        assert!(matches!(
            ctx.refresh_store_data().await.unwrap_err(),
            SessionError::NotAuthenticated
        ));
        assert!(!ctx.refresh_auth_token().await);
        assert!(!ctx.ensure_valid_token().await);
    }

    #[tokio::test]
    async fn adopt_store_updates_list_and_active() {
        let (_tmp, ctx) = test_context();
        seeded(&ctx, vec![store("s1", true), store("s2", true)]);

        let mut updated = store("s1", false);
        updated.name = "Renamed".into();
        ctx.adopt_store(updated);

        let session = ctx.session();
        assert_eq!(session.active_store.as_ref().unwrap().name, "Renamed");
        assert!(!session.all_stores[0].is_active);
        assert_eq!(session.all_stores[1].id, "s2");
    }
}
