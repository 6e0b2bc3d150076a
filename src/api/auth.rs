//! Remote auth endpoint wrappers: login, profile, token refresh, and the
//! admin-only platform-user management surface.

use super::{ApiClient, ApiError, ApiResult};
use crate::models::{
    AuthPayload, CreatePlatformUser, LoginCredentials, PlatformUser, PlatformUserPage,
    StoreAccessGrant, StoreAccessInfo, User,
};

const LOGIN: &str = "/platform-auth/login";
const ME: &str = "/platform-auth/me";
const REFRESH: &str = "/platform-auth/refresh";
const USERS: &str = "/platform-users";

/// Filter parameters for the admin platform-user listing.
#[derive(Debug, Clone, Default)]
pub struct UserListParams {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub search: Option<String>,
    pub role: Option<String>,
    pub is_active: Option<bool>,
}

impl UserListParams {
    fn to_query(&self) -> Vec<(&'static str, String)> {
        let mut query = Vec::new();
        if let Some(page) = self.page {
            query.push(("page", page.to_string()));
        }
        if let Some(limit) = self.limit {
            query.push(("limit", limit.to_string()));
        }
        if let Some(search) = &self.search {
            query.push(("search", search.clone()));
        }
        if let Some(role) = &self.role {
            query.push(("role", role.clone()));
        }
        if let Some(is_active) = self.is_active {
            query.push(("isActive", is_active.to_string()));
        }
        query
    }
}

/// Typed wrapper over the platform auth endpoints.
#[derive(Debug, Clone)]
pub struct AuthApi {
    client: ApiClient,
}

impl AuthApi {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// Exchange credentials for a bearer token and profile.
    pub async fn login(&self, credentials: &LoginCredentials) -> ApiResult<AuthPayload> {
        tracing::info!(email = %credentials.email, "logging in");
        self.client.post(LOGIN, credentials, None).await
    }

    /// Fetch the profile the token belongs to. Doubles as the token
    /// validity probe.
    pub async fn me(&self, token: &str) -> ApiResult<User> {
        self.client.get(ME, Some(token)).await
    }

    /// Exchange the current token for a fresh token and profile.
    pub async fn refresh(&self, token: &str) -> ApiResult<AuthPayload> {
        tracing::info!("refreshing auth token");
        self.client.get(REFRESH, Some(token)).await
    }

    /// Probe token validity via the profile endpoint.
    ///
    /// Only a 401 marks the token invalid; any other failure (network,
    /// timeout, 5xx) reports valid so a flaky connection cannot log the
    /// user out.
    pub async fn validate_token(&self, token: &str) -> bool {
        match self.me(token).await {
            Ok(_) => true,
            Err(ApiError::Unauthorized { .. }) => false,
            Err(err) => {
                tracing::warn!(error = %err, "token probe failed; assuming token still valid");
                true
            }
        }
    }

    // ── Platform users (admin) ───────────────────────────────

    pub async fn create_user(&self, user: &CreatePlatformUser, token: &str) -> ApiResult<PlatformUser> {
        tracing::info!(email = %user.email, "creating platform user");
        self.client.post(USERS, user, Some(token)).await
    }

    pub async fn list_users(&self, params: &UserListParams, token: &str) -> ApiResult<PlatformUserPage> {
        self.client
            .get_query(USERS, &params.to_query(), Some(token))
            .await
    }

    pub async fn get_user(&self, user_id: &str, token: &str) -> ApiResult<PlatformUser> {
        self.client
            .get(&format!("{USERS}/{user_id}"), Some(token))
            .await
    }

    pub async fn update_user(
        &self,
        user_id: &str,
        patch: &serde_json::Value,
        token: &str,
    ) -> ApiResult<PlatformUser> {
        self.client
            .patch(&format!("{USERS}/{user_id}"), patch, Some(token))
            .await
    }

    pub async fn delete_user(&self, user_id: &str, token: &str) -> ApiResult<()> {
        tracing::info!(user_id, "deleting platform user");
        self.client
            .delete(&format!("{USERS}/{user_id}"), Some(token))
            .await
    }

    // ── Store-access grants ──────────────────────────────────

    pub async fn grant_store_access(
        &self,
        user_id: &str,
        store_id: &str,
        grant: &StoreAccessGrant,
        token: &str,
    ) -> ApiResult<StoreAccessInfo> {
        tracing::info!(user_id, store_id, "granting store access");
        self.client
            .post(
                &format!("{USERS}/{user_id}/store-access/{store_id}"),
                grant,
                Some(token),
            )
            .await
    }

    pub async fn revoke_store_access(
        &self,
        user_id: &str,
        store_id: &str,
        token: &str,
    ) -> ApiResult<()> {
        tracing::info!(user_id, store_id, "revoking store access");
        self.client
            .delete(
                &format!("{USERS}/{user_id}/store-access/{store_id}"),
                Some(token),
            )
            .await
    }

    pub async fn list_store_access(&self, user_id: &str, token: &str) -> ApiResult<Vec<StoreAccessInfo>> {
        self.client
            .get(&format!("{USERS}/{user_id}/store-access"), Some(token))
            .await
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use wiremock::matchers::{bearer_token, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn user_json() -> serde_json::Value {
        serde_json::json!({
            "id": "u1",
            "email": "a@b.c",
            "name": "A",
            "role": "STORE_OWNER",
            "stores": []
        })
    }

    fn ok_envelope(data: serde_json::Value) -> serde_json::Value {
        serde_json::json!({"success": true, "statusCode": 200, "data": data})
    }

    async fn api(server: &MockServer) -> AuthApi {
        AuthApi::new(ApiClient::new(Config::with_base_url(server.uri())).unwrap())
    }

    #[tokio::test]
    async fn login_posts_credentials_and_decodes_payload() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/platform-auth/login"))
            .respond_with(ResponseTemplate::new(200).set_body_json(ok_envelope(
                serde_json::json!({"token": "tok-1", "user": user_json()}),
            )))
            .mount(&server)
            .await;

        let payload = api(&server)
            .await
            .login(&LoginCredentials {
                email: "a@b.c".into(),
                password: "secret".into(),
            })
            .await
            .unwrap();
        assert_eq!(payload.token, "tok-1");
        assert_eq!(payload.user.email, "a@b.c");
    }

    #[tokio::test]
    async fn me_sends_bearer_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/platform-auth/me"))
            .and(bearer_token("tok-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(ok_envelope(user_json())))
            .expect(1)
            .mount(&server)
            .await;

        let user = api(&server).await.me("tok-1").await.unwrap();
        assert_eq!(user.id, "u1");
    }

    #[tokio::test]
    async fn validate_token_is_false_only_on_401() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/platform-auth/me"))
            .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
                "success": false, "statusCode": 401, "message": "expired"
            })))
            .mount(&server)
            .await;
        assert!(!api(&server).await.validate_token("tok-1").await);
    }

    #[tokio::test]
    async fn validate_token_fails_open_on_server_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/platform-auth/me"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        assert!(api(&server).await.validate_token("tok-1").await);
    }
}
