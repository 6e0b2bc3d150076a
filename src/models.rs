//! Wire and domain types for the storefront platform API.
//!
//! Everything the backend serves is JSON wrapped in a common envelope:
//! `{success, statusCode, timestamp, path, method, data, message?}`.
//! Field names on the wire are camelCase; enums are SCREAMING_SNAKE_CASE.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

// ── Response envelope ────────────────────────────────────────────

/// Common response envelope used by every endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct Envelope<T> {
    pub success: bool,
    pub status_code: u16,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub data: Option<T>,
    #[serde(default)]
    pub message: Option<String>,
}

// ── Authentication ───────────────────────────────────────────────

/// Credentials for the platform login endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginCredentials {
    pub email: String,
    pub password: String,
}

/// Body of a successful login or token refresh: a fresh bearer token
/// plus the profile it was issued for.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthPayload {
    pub token: String,
    pub user: User,
}

/// Platform-wide role of an authenticated user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlatformRole {
    PlatformAdmin,
    StoreOwner,
    StoreEmployee,
    DefaultUser,
}

/// Role of a user within a single store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StoreRole {
    Owner,
    Manager,
    Employee,
    Viewer,
}

/// Permission bundle attached to a store-access grant.
///
/// The server may omit keys it has never set; missing keys read as false.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StorePermissions {
    pub can_manage_products: bool,
    pub can_manage_users: bool,
    pub can_manage_orders: bool,
    pub can_view_analytics: bool,
    pub can_manage_settings: bool,
    pub can_manage_finances: bool,
}

/// A (store, role, permissions) grant issued by the server.
/// Immutable on the client; re-fetched, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreAccess {
    pub store_id: String,
    pub store_slug: String,
    pub store_name: String,
    pub store_role: StoreRole,
    #[serde(default)]
    pub permissions: StorePermissions,
    pub is_active: bool,
}

/// An authenticated platform user with their store-access grants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: String,
    pub role: PlatformRole,
    #[serde(default)]
    pub stores: Vec<StoreAccess>,
}

impl User {
    /// Whether this user may access the store with the given slug.
    /// Platform admins may access any store.
    pub fn can_access_store(&self, store_slug: &str) -> bool {
        if self.role == PlatformRole::PlatformAdmin {
            return true;
        }
        self.stores
            .iter()
            .any(|s| s.store_slug == store_slug && s.is_active)
    }

    /// Whether this user may manage the store with the given slug.
    ///
    /// OWNER and MANAGER always manage; EMPLOYEE only with an explicit
    /// product- or user-management permission; VIEWER never.
    pub fn can_manage_store(&self, store_slug: &str) -> bool {
        if self.role == PlatformRole::PlatformAdmin {
            return true;
        }
        let Some(access) = self
            .stores
            .iter()
            .find(|s| s.store_slug == store_slug && s.is_active)
        else {
            return false;
        };
        match access.store_role {
            StoreRole::Owner | StoreRole::Manager => true,
            StoreRole::Employee => {
                access.permissions.can_manage_products || access.permissions.can_manage_users
            }
            StoreRole::Viewer => false,
        }
    }
}

// ── Stores ───────────────────────────────────────────────────────

/// A tenant-scoped store entity, cached client-side read-through.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Store {
    pub id: String,
    pub name: String,
    pub slug: String,
    pub client_email: String,
    pub is_active: bool,
    /// Collection key -> enabled flag. The server always receives the
    /// whole map on update (last-writer-wins), never a delta.
    #[serde(default)]
    pub collections: BTreeMap<String, bool>,
    #[serde(default)]
    pub settings: Option<serde_json::Value>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl Store {
    /// Count of (total, enabled) collections, for display.
    pub fn collection_counts(&self) -> (usize, usize) {
        let enabled = self.collections.values().filter(|v| **v).count();
        (self.collections.len(), enabled)
    }
}

/// One page of the admin store listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorePage {
    pub stores: Vec<Store>,
    pub total: u64,
    pub page: u32,
    pub total_pages: u32,
}

/// Request body for the plain admin store create; the server assigns no
/// owner account.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateStore {
    pub name: String,
    pub client_email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collections: Option<BTreeMap<String, bool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub settings: Option<serde_json::Value>,
}

/// Request body for creating a store bound to an owner account.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateStoreWithOwner {
    pub name: String,
    pub client_email: String,
    pub owner_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collections: Option<BTreeMap<String, bool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub settings: Option<serde_json::Value>,
}

/// Summary of the owner returned with a newly created store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OwnerSummary {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: PlatformRole,
}

/// Response of the create-store-with-owner operation. Includes a fresh
/// token for the caller because the creation widens their access grants.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreWithOwner {
    #[serde(flatten)]
    pub store: Store,
    pub owner: OwnerSummary,
    pub new_token: String,
}

// ── Platform users ───────────────────────────────────────────────

/// A store-access record as returned by the platform-user endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreAccessInfo {
    pub store_id: String,
    pub store_slug: String,
    pub store_name: String,
    #[serde(default)]
    pub permissions: StorePermissions,
    pub is_active: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// A platform user as seen by the admin user-management endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformUser {
    pub id: String,
    pub email: String,
    pub name: String,
    pub role: PlatformRole,
    pub is_active: bool,
    #[serde(default)]
    pub store_access: Vec<StoreAccessInfo>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

/// Request body for creating a platform user (admin only).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePlatformUser {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: PlatformRole,
}

/// One page of the admin platform-user listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformUserPage {
    pub users: Vec<PlatformUser>,
    pub total: u64,
    pub page: u32,
    pub total_pages: u32,
}

/// Body for granting a user access to a store.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreAccessGrant {
    pub store_role: StoreRole,
    pub permissions: StorePermissions,
}

// ── Products ─────────────────────────────────────────────────────

/// Physical dimension unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DimensionUnit {
    Cm,
    In,
}

impl Default for DimensionUnit {
    fn default() -> Self {
        Self::Cm
    }
}

/// Package dimensions of a product.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Dimensions {
    pub length: f64,
    pub width: f64,
    pub height: f64,
    #[serde(default)]
    pub unit: DimensionUnit,
}

/// Stock counters for the fixed set of named size buckets.
///
/// Buckets the backend has never written are omitted on the wire and
/// read as zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SizedStock {
    pub storage_p: u32,
    pub storage_m: u32,
    pub storage_g: u32,
    pub storage_u: u32,
    pub storage_pp: u32,
    pub storage_gg: u32,
    pub storage_exg: u32,
    pub storage_child: u32,
}

impl SizedStock {
    /// Display-time aggregate; never persisted.
    pub fn total(&self) -> u32 {
        self.storage_p
            + self.storage_m
            + self.storage_g
            + self.storage_u
            + self.storage_pp
            + self.storage_gg
            + self.storage_exg
            + self.storage_child
    }
}

/// Per-product analytics counters, owned by the server.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProductAnalytics {
    pub view_count: u64,
    pub sales_count: u64,
}

/// A catalog product. Created, updated and deleted entirely server-side;
/// the client only computes display aggregates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: String,
    /// Owning collection key, e.g. `item-collection-fitness`.
    #[serde(rename = "type")]
    pub collection_key: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image_list: Vec<String>,
    #[serde(default)]
    pub video_url: Vec<String>,
    #[serde(default)]
    pub tag: Vec<String>,
    /// Price in minor currency units (cents).
    pub price: u64,
    /// Discount percentage, 0..=100.
    #[serde(default)]
    pub discount: u8,
    #[serde(flatten)]
    pub stock: SizedStock,
    #[serde(default)]
    pub storage_location: String,
    pub is_active: bool,
    #[serde(default)]
    pub featured: bool,
    #[serde(default)]
    pub sponsor: String,
    #[serde(default)]
    pub weight: f64,
    #[serde(default)]
    pub dimensions: Dimensions,
    #[serde(default)]
    pub correlated: Vec<String>,
    #[serde(default)]
    pub market_affiliate_ids: Vec<String>,
    #[serde(flatten)]
    pub analytics: ProductAnalytics,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl Product {
    /// Effective price in minor units after applying the discount.
    pub fn discounted_price(&self) -> u64 {
        let discount = u64::from(self.discount.min(100));
        self.price - self.price * discount / 100
    }
}

/// Payload for creating or updating a product. Absent fields are left
/// unchanged by the server on update.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductDraft {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub collection_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_list: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_url: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discount: Option<u8>,
    #[serde(flatten)]
    pub stock: Option<SizedStock>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage_location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub featured: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sponsor: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<Dimensions>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correlated: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub market_affiliate_ids: Option<Vec<String>>,
}

/// One page of a product listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductPage {
    pub products: Vec<Product>,
    pub total: u64,
    pub page: u32,
    pub total_pages: u32,
}

// ── Price helpers ────────────────────────────────────────────────

pub mod price {
    //! Minor-unit price conversion and formatting.

    /// Convert a major-unit amount (e.g. 12.34) to minor units (1234).
    pub fn to_minor(major: f64) -> u64 {
        (major * 100.0).round().max(0.0) as u64
    }

    /// Convert minor units back to a major-unit amount.
    pub fn to_major(minor: u64) -> f64 {
        minor as f64 / 100.0
    }

    /// Format minor units as a currency string, e.g. `R$ 12.34`.
    pub fn format(minor: u64) -> String {
        format!("R$ {}.{:02}", minor / 100, minor % 100)
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn grant(slug: &str, role: StoreRole, perms: StorePermissions, active: bool) -> StoreAccess {
        StoreAccess {
            store_id: format!("id-{slug}"),
            store_slug: slug.into(),
            store_name: slug.to_uppercase(),
            store_role: role,
            permissions: perms,
            is_active: active,
        }
    }

    fn user_with(role: PlatformRole, stores: Vec<StoreAccess>) -> User {
        User {
            id: "u1".into(),
            email: "owner@example.com".into(),
            name: "Owner".into(),
            role,
            stores,
        }
    }

    #[test]
    fn admin_accesses_and_manages_any_store() {
        let user = user_with(PlatformRole::PlatformAdmin, vec![]);
        assert!(user.can_access_store("anything"));
        assert!(user.can_manage_store("anything"));
    }

    #[test]
    fn owner_manages_their_store_only() {
        let user = user_with(
            PlatformRole::StoreOwner,
            vec![grant("beach", StoreRole::Owner, StorePermissions::default(), true)],
        );
        assert!(user.can_access_store("beach"));
        assert!(user.can_manage_store("beach"));
        assert!(!user.can_access_store("other"));
        assert!(!user.can_manage_store("other"));
    }

    #[test]
    fn inactive_grant_gives_no_access() {
        let user = user_with(
            PlatformRole::StoreOwner,
            vec![grant("beach", StoreRole::Owner, StorePermissions::default(), false)],
        );
        assert!(!user.can_access_store("beach"));
        assert!(!user.can_manage_store("beach"));
    }

    #[test]
    fn employee_needs_explicit_permission_to_manage() {
        let without = user_with(
            PlatformRole::StoreEmployee,
            vec![grant("beach", StoreRole::Employee, StorePermissions::default(), true)],
        );
        assert!(without.can_access_store("beach"));
        assert!(!without.can_manage_store("beach"));

        let with = user_with(
            PlatformRole::StoreEmployee,
            vec![grant(
                "beach",
                StoreRole::Employee,
                StorePermissions {
                    can_manage_products: true,
                    ..Default::default()
                },
                true,
            )],
        );
        assert!(with.can_manage_store("beach"));
    }

    #[test]
    fn viewer_never_manages() {
        let user = user_with(
            PlatformRole::DefaultUser,
            vec![grant(
                "beach",
                StoreRole::Viewer,
                StorePermissions {
                    can_manage_products: true,
                    ..Default::default()
                },
                true,
            )],
        );
        assert!(!user.can_manage_store("beach"));
    }

    #[test]
    fn user_roundtrips_with_wire_role_names() {
        let json = r#"{
            "id": "u1",
            "email": "a@b.c",
            "name": "A",
            "role": "PLATFORM_ADMIN",
            "stores": [{
                "storeId": "s1",
                "storeSlug": "beach",
                "storeName": "Beach",
                "storeRole": "MANAGER",
                "permissions": {"canManageProducts": true},
                "isActive": true
            }]
        }"#;
        let user: User = serde_json::from_str(json).unwrap();
        assert_eq!(user.role, PlatformRole::PlatformAdmin);
        assert_eq!(user.stores[0].store_role, StoreRole::Manager);
        assert!(user.stores[0].permissions.can_manage_products);
        assert!(!user.stores[0].permissions.can_manage_finances);

        let back = serde_json::to_value(&user).unwrap();
        assert_eq!(back["role"], "PLATFORM_ADMIN");
        assert_eq!(back["stores"][0]["storeRole"], "MANAGER");
    }

    #[test]
    fn envelope_without_data_decodes() {
        let json = r#"{"success": false, "statusCode": 404, "message": "Store not found"}"#;
        let env: Envelope<Store> = serde_json::from_str(json).unwrap();
        assert!(!env.success);
        assert_eq!(env.status_code, 404);
        assert!(env.data.is_none());
        assert_eq!(env.message.as_deref(), Some("Store not found"));
    }

    #[test]
    fn store_decodes_collection_map() {
        let json = r#"{
            "id": "s1",
            "name": "Beach Store",
            "slug": "beach",
            "clientEmail": "c@b.c",
            "isActive": true,
            "collections": {"item-collection-fitness": true, "item-collection-bags": false},
            "createdAt": "2025-01-10T12:00:00Z",
            "updatedAt": "2025-02-01T08:30:00Z"
        }"#;
        let store: Store = serde_json::from_str(json).unwrap();
        assert_eq!(store.collections.len(), 2);
        assert_eq!(store.collections["item-collection-fitness"], true);
        assert_eq!(store.collection_counts(), (2, 1));
    }

    #[test]
    fn product_stock_total_and_discount() {
        let json = r#"{
            "id": "p1",
            "type": "item-collection-fitness",
            "name": "Leggings",
            "price": 15900,
            "discount": 25,
            "storageP": 3,
            "storageM": 5,
            "storageG": 2,
            "isActive": true,
            "createdAt": "2025-01-10T12:00:00Z",
            "updatedAt": "2025-01-10T12:00:00Z"
        }"#;
        let product: Product = serde_json::from_str(json).unwrap();
        assert_eq!(product.stock.total(), 10);
        assert_eq!(product.discounted_price(), 11925);
        assert_eq!(product.analytics.view_count, 0);
    }

    #[test]
    fn product_draft_skips_absent_fields() {
        let draft = ProductDraft {
            name: Some("Leggings".into()),
            price: Some(15900),
            ..Default::default()
        };
        let json = serde_json::to_value(&draft).unwrap();
        assert_eq!(json["name"], "Leggings");
        assert!(json.get("description").is_none());
        assert!(json.get("discount").is_none());
    }

    #[test]
    fn price_helpers_roundtrip() {
        assert_eq!(price::to_minor(12.34), 1234);
        assert_eq!(price::to_minor(0.999), 100);
        assert_eq!(price::to_major(1234), 12.34);
        assert_eq!(price::format(1234), "R$ 12.34");
        assert_eq!(price::format(5), "R$ 0.05");
    }
}
