//! Toggle operations over store state.
//!
//! Two different consistency strategies, matching how each toggle is
//! used:
//! - collection toggles are read-modify-write: fetch the current map,
//!   flip one key, send the whole map back, then re-fetch to reconcile.
//!   Nothing is shown as changed until the server confirms.
//! - the store active flag is optimistic: flip the cached value first
//!   so the change is visible immediately, then confirm with the
//!   server and roll back if the call fails.

use super::{SessionContext, SessionError, SessionResult};
use crate::models::Store;

/// Result of an optimistic store-active toggle.
#[derive(Debug)]
pub enum ToggleOutcome {
    /// The server accepted the toggle; the store is the reconciled copy.
    Reconciled(Store),
    /// The server rejected the toggle; the cached store was restored.
    RolledBack {
        error: SessionError,
        restored: Store,
    },
}

impl SessionContext {
    /// Flip one collection flag on a store.
    ///
    /// Reads the store fresh from the server first so the full-map write
    /// does not resurrect collections another writer already changed,
    /// then re-fetches to pick up any server-side normalization. The
    /// cache is only updated from confirmed server state; on error it is
    /// left untouched.
    pub async fn toggle_collection(
        &self,
        store_id: &str,
        collection_key: &str,
    ) -> SessionResult<Store> {
        let _op = self.inner.op_guard.lock().await;
        let token = self.current_token().ok_or(SessionError::NotAuthenticated)?;

        let current = self.inner.stores.get(store_id, &token).await?;
        let mut collections = current.collections;
        let flag = collections.entry(collection_key.to_string()).or_insert(false);
        *flag = !*flag;
        tracing::info!(store_id, collection_key, enabled = *flag, "toggling collection");

        self.inner
            .stores
            .update_collections(store_id, &collections, &token)
            .await?;

        // Reconcile: the server owns the canonical map.
        let confirmed = self.inner.stores.get(store_id, &token).await?;
        self.adopt_store(confirmed.clone());
        Ok(confirmed)
    }

    /// Flip a store's active flag optimistically.
    ///
    /// The cached copy is flipped before the request so callers observing
    /// the session see the change immediately. A failed request restores
    /// the previous cached copy and reports `RolledBack` instead of an
    /// error, so the caller can distinguish "rejected and undone" from
    /// "could not even try".
    pub async fn toggle_store_active(&self, store_id: &str) -> SessionResult<ToggleOutcome> {
        let _op = self.inner.op_guard.lock().await;
        let token = self.current_token().ok_or(SessionError::NotAuthenticated)?;

        let original = {
            let state = self.inner.state.lock();
            state
                .all_stores
                .iter()
                .find(|s| s.id == store_id)
                .cloned()
                .ok_or_else(|| SessionError::StoreNotFound {
                    store_id: store_id.to_string(),
                })?
        };

        let mut flipped = original.clone();
        flipped.is_active = !flipped.is_active;
        tracing::info!(store_id, active = flipped.is_active, "toggling store active flag");
        self.adopt_store(flipped);

        match self.inner.stores.toggle_active(store_id, &token).await {
            Ok(patched) => {
                // Prefer a reconciling re-fetch; fall back to the toggle
                // response when the re-fetch fails.
                let confirmed = match self.inner.stores.get(store_id, &token).await {
                    Ok(fresh) => fresh,
                    Err(err) => {
                        tracing::warn!(error = %err, "could not re-fetch store after toggle; using toggle response");
                        patched
                    }
                };
                self.adopt_store(confirmed.clone());
                Ok(ToggleOutcome::Reconciled(confirmed))
            }
            Err(err) => {
                tracing::warn!(error = %err, store_id, "store toggle rejected; rolling back");
                self.adopt_store(original.clone());
                Ok(ToggleOutcome::RolledBack {
                    error: err.into(),
                    restored: original,
                })
            }
        }
    }
}
