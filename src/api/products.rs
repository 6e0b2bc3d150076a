//! Product CRUD wrappers.
//!
//! Mutating endpoints exist in two route families: `/platform/...` for
//! platform admins and `/store/...` for store staff. The mutation
//! methods pick the family from the caller's platform role, mirroring
//! how the backend scopes authorization.

use super::{ApiClient, ApiError, ApiResult};
use crate::models::{PlatformRole, Product, ProductDraft, ProductPage};

/// Filter parameters for product listings.
#[derive(Debug, Clone, Default)]
pub struct ProductListParams {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub collection_key: Option<String>,
    pub search: Option<String>,
    pub is_active: Option<bool>,
    pub featured: Option<bool>,
    pub min_price: Option<u64>,
    pub max_price: Option<u64>,
    pub tags: Vec<String>,
}

impl ProductListParams {
    fn to_query(&self) -> Vec<(&'static str, String)> {
        let mut query = Vec::new();
        if let Some(page) = self.page {
            query.push(("page", page.to_string()));
        }
        if let Some(limit) = self.limit {
            query.push(("limit", limit.to_string()));
        }
        if let Some(key) = &self.collection_key {
            query.push(("collectionKey", key.clone()));
        }
        if let Some(search) = &self.search {
            query.push(("search", search.clone()));
        }
        if let Some(is_active) = self.is_active {
            query.push(("isActive", is_active.to_string()));
        }
        if let Some(featured) = self.featured {
            query.push(("featured", featured.to_string()));
        }
        if let Some(min) = self.min_price {
            query.push(("minPrice", min.to_string()));
        }
        if let Some(max) = self.max_price {
            query.push(("maxPrice", max.to_string()));
        }
        if !self.tags.is_empty() {
            query.push(("tags", self.tags.join(",")));
        }
        query
    }
}

/// Typed wrapper over the per-store product endpoints.
#[derive(Debug, Clone)]
pub struct ProductApi {
    client: ApiClient,
}

impl ProductApi {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    fn items_path(store_slug: &str) -> String {
        format!("/collections/{store_slug}/items")
    }

    fn platform_path(store_slug: &str) -> String {
        format!("/collections/{store_slug}/platform/items")
    }

    fn store_path(store_slug: &str) -> String {
        format!("/collections/{store_slug}/store/items")
    }

    fn admin_path(store_slug: &str) -> String {
        format!("/collections/{store_slug}/admin/items")
    }

    fn mutation_root(store_slug: &str, role: PlatformRole) -> String {
        if role == PlatformRole::PlatformAdmin {
            Self::platform_path(store_slug)
        } else {
            Self::store_path(store_slug)
        }
    }

    /// List products of a store. Public route; a token widens visibility
    /// to inactive products.
    pub async fn list(
        &self,
        store_slug: &str,
        params: &ProductListParams,
        token: Option<&str>,
    ) -> ApiResult<ProductPage> {
        self.client
            .get_query(&Self::items_path(store_slug), &params.to_query(), token)
            .await
    }

    /// List every product of a store through the admin route, including
    /// ones the public listing hides. Always authenticated.
    pub async fn list_all(
        &self,
        store_slug: &str,
        params: &ProductListParams,
        token: &str,
    ) -> ApiResult<ProductPage> {
        self.client
            .get_query(&Self::admin_path(store_slug), &params.to_query(), Some(token))
            .await
    }

    pub async fn get(
        &self,
        store_slug: &str,
        product_id: &str,
        token: Option<&str>,
    ) -> ApiResult<Product> {
        self.client
            .get(&format!("{}/{product_id}", Self::items_path(store_slug)), token)
            .await
    }

    /// Create a product, picking the route family from the caller's role.
    pub async fn create(
        &self,
        store_slug: &str,
        draft: &ProductDraft,
        token: &str,
        role: PlatformRole,
    ) -> ApiResult<Product> {
        validate_draft(draft, true)?;
        tracing::info!(store_slug, name = draft.name.as_deref().unwrap_or(""), "creating product");
        self.client
            .post(&Self::mutation_root(store_slug, role), draft, Some(token))
            .await
    }

    /// Update a product, picking the route family from the caller's role.
    pub async fn update(
        &self,
        store_slug: &str,
        product_id: &str,
        draft: &ProductDraft,
        token: &str,
        role: PlatformRole,
    ) -> ApiResult<Product> {
        validate_draft(draft, false)?;
        tracing::info!(store_slug, product_id, "updating product");
        self.client
            .put(
                &format!("{}/{product_id}", Self::mutation_root(store_slug, role)),
                draft,
                Some(token),
            )
            .await
    }

    /// Delete a product, picking the route family from the caller's role.
    pub async fn delete(
        &self,
        store_slug: &str,
        product_id: &str,
        token: &str,
        role: PlatformRole,
    ) -> ApiResult<()> {
        tracing::info!(store_slug, product_id, "deleting product");
        self.client
            .delete(
                &format!("{}/{product_id}", Self::mutation_root(store_slug, role)),
                Some(token),
            )
            .await
    }
}

/// Client-side draft validation, applied before any bytes hit the wire.
/// `creating` requires the fields a new product cannot omit.
fn validate_draft(draft: &ProductDraft, creating: bool) -> ApiResult<()> {
    let fail = |message: &str| {
        Err(ApiError::Validation {
            message: message.into(),
        })
    };

    match &draft.name {
        Some(name) if name.trim().is_empty() => return fail("Product name must not be empty"),
        None if creating => return fail("Product name is required"),
        _ => {}
    }
    match draft.price {
        Some(0) => return fail("Price must be greater than zero"),
        None if creating => return fail("Price is required"),
        _ => {}
    }
    if let Some(discount) = draft.discount {
        if discount > 100 {
            return fail("Discount must be between 0 and 100%");
        }
    }
    match &draft.image_list {
        Some(images) if images.is_empty() => return fail("At least one image is required"),
        None if creating => return fail("At least one image is required"),
        _ => {}
    }
    Ok(())
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn draft() -> ProductDraft {
        ProductDraft {
            collection_key: Some("item-collection-fitness".into()),
            name: Some("Leggings".into()),
            price: Some(15900),
            image_list: Some(vec!["https://cdn.example/1.jpg".into()]),
            ..Default::default()
        }
    }

    fn product_json() -> serde_json::Value {
        serde_json::json!({
            "id": "p1",
            "type": "item-collection-fitness",
            "name": "Leggings",
            "price": 15900,
            "isActive": true,
            "createdAt": "2025-01-10T12:00:00Z",
            "updatedAt": "2025-01-10T12:00:00Z"
        })
    }

    fn ok_envelope(data: serde_json::Value) -> serde_json::Value {
        serde_json::json!({"success": true, "statusCode": 200, "data": data})
    }

    async fn api(server: &MockServer) -> ProductApi {
        ProductApi::new(ApiClient::new(Config::with_base_url(server.uri())).unwrap())
    }

    #[tokio::test]
    async fn admin_create_uses_platform_route() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/collections/beach/platform/items"))
            .respond_with(ResponseTemplate::new(200).set_body_json(ok_envelope(product_json())))
            .expect(1)
            .mount(&server)
            .await;

        api(&server)
            .await
            .create("beach", &draft(), "tok", PlatformRole::PlatformAdmin)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn owner_create_uses_store_route() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/collections/beach/store/items"))
            .respond_with(ResponseTemplate::new(200).set_body_json(ok_envelope(product_json())))
            .expect(1)
            .mount(&server)
            .await;

        api(&server)
            .await
            .create("beach", &draft(), "tok", PlatformRole::StoreOwner)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn list_builds_filter_query() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/collections/beach/items"))
            .and(query_param("collectionKey", "item-collection-fitness"))
            .and(query_param("featured", "true"))
            .and(query_param("tags", "summer,new"))
            .respond_with(ResponseTemplate::new(200).set_body_json(ok_envelope(
                serde_json::json!({"products": [], "total": 0, "page": 1, "totalPages": 0}),
            )))
            .expect(1)
            .mount(&server)
            .await;

        api(&server)
            .await
            .list(
                "beach",
                &ProductListParams {
                    collection_key: Some("item-collection-fitness".into()),
                    featured: Some(true),
                    tags: vec!["summer".into(), "new".into()],
                    ..Default::default()
                },
                None,
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn admin_listing_uses_admin_route_with_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/collections/beach/admin/items"))
            .and(wiremock::matchers::bearer_token("tok"))
            .respond_with(ResponseTemplate::new(200).set_body_json(ok_envelope(
                serde_json::json!({"products": [], "total": 0, "page": 1, "totalPages": 0}),
            )))
            .expect(1)
            .mount(&server)
            .await;

        api(&server)
            .await
            .list_all("beach", &ProductListParams::default(), "tok")
            .await
            .unwrap();
    }

    #[test]
    fn draft_validation_rejects_bad_payloads() {
        let missing_name = ProductDraft {
            price: Some(100),
            image_list: Some(vec!["x".into()]),
            ..Default::default()
        };
        assert!(matches!(
            validate_draft(&missing_name, true),
            Err(ApiError::Validation { .. })
        ));

        let zero_price = ProductDraft {
            price: Some(0),
            ..draft()
        };
        assert!(validate_draft(&zero_price, true).is_err());

        let bad_discount = ProductDraft {
            discount: Some(101),
            ..draft()
        };
        assert!(validate_draft(&bad_discount, true).is_err());

        let no_images = ProductDraft {
            image_list: Some(vec![]),
            ..draft()
        };
        assert!(validate_draft(&no_images, true).is_err());

        // Updates may omit anything, but present fields are still checked.
        assert!(validate_draft(&ProductDraft::default(), false).is_ok());
        assert!(validate_draft(&bad_discount, false).is_err());
    }
}
