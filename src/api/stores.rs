//! Remote store endpoint wrappers: listing, detail, creation with owner,
//! collection-map updates and the active toggle.

use std::collections::BTreeMap;

use super::{ApiClient, ApiResult};
use crate::models::{CreateStore, CreateStoreWithOwner, Store, StorePage, StoreWithOwner};

const STORES: &str = "/stores";
const MY_STORES: &str = "/stores/my-stores";
const WITH_OWNER: &str = "/stores/with-owner";

/// Filter parameters for the admin store listing.
#[derive(Debug, Clone, Default)]
pub struct StoreListParams {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub search: Option<String>,
    pub is_active: Option<bool>,
}

impl StoreListParams {
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
        if let Some(is_active) = self.is_active {
            query.push(("isActive", is_active.to_string()));
        }
        query
    }
}

/// Typed wrapper over the store endpoints.
#[derive(Debug, Clone)]
pub struct StoreApi {
    client: ApiClient,
}

impl StoreApi {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// Stores the token's user may access.
    pub async fn my_stores(&self, token: &str) -> ApiResult<Vec<Store>> {
        self.client.get(MY_STORES, Some(token)).await
    }

    /// Paginated admin listing of all stores.
    pub async fn list(&self, params: &StoreListParams, token: &str) -> ApiResult<StorePage> {
        self.client
            .get_query(STORES, &params.to_query(), Some(token))
            .await
    }

    pub async fn get(&self, store_id: &str, token: &str) -> ApiResult<Store> {
        self.client
            .get(&format!("{STORES}/{store_id}"), Some(token))
            .await
    }

    /// Create a store without binding an owner account (admin).
    pub async fn create(&self, data: &CreateStore, token: &str) -> ApiResult<Store> {
        tracing::info!(name = %data.name, "creating store");
        self.client.post(STORES, data, Some(token)).await
    }

    /// Create a store bound to an owner account. The response carries a
    /// fresh token because the creation widens the caller's grants.
    pub async fn create_with_owner(
        &self,
        data: &CreateStoreWithOwner,
        token: &str,
    ) -> ApiResult<StoreWithOwner> {
        tracing::info!(name = %data.name, "creating store with owner");
        self.client.post(WITH_OWNER, data, Some(token)).await
    }

    pub async fn update(
        &self,
        store_id: &str,
        patch: &serde_json::Value,
        token: &str,
    ) -> ApiResult<Store> {
        self.client
            .patch(&format!("{STORES}/{store_id}"), patch, Some(token))
            .await
    }

    pub async fn delete(&self, store_id: &str, token: &str) -> ApiResult<()> {
        tracing::info!(store_id, "deleting store");
        self.client
            .delete(&format!("{STORES}/{store_id}"), Some(token))
            .await
    }

    /// Replace the store's whole collection map. The server receives the
    /// full map, not a delta; concurrent writers are last-writer-wins.
    pub async fn update_collections(
        &self,
        store_id: &str,
        collections: &BTreeMap<String, bool>,
        token: &str,
    ) -> ApiResult<Store> {
        tracing::info!(store_id, "updating store collections");
        self.client
            .patch(
                &format!("{STORES}/{store_id}/collections"),
                collections,
                Some(token),
            )
            .await
    }

    /// Flip the store's active flag server-side; returns the updated store.
    pub async fn toggle_active(&self, store_id: &str, token: &str) -> ApiResult<Store> {
        tracing::info!(store_id, "toggling store active flag");
        self.client
            .patch(
                &format!("{STORES}/{store_id}/toggle-active"),
                &serde_json::json!({}),
                Some(token),
            )
            .await
    }
}

// ── Tests ────────────────────────────────────────────────────────
