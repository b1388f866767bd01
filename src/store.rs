//! Entity store boundary.
//!
//! The host owns document storage; this crate only depends on the narrow
//! contract below. [`MemoryStore`] is the in-crate reference implementation:
//! it keeps raw `{type, data}` JSON blobs and decodes them at the boundary,
//! so every read and write exercises the wire format.

use crate::entity::{Entity, Ref};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;
use tokio::sync::RwLock;

/// Errors from store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("document not found: {0}")]
    NotFound(Ref),

    #[error("storage backend error: {0}")]
    Backend(String),
}

// ============================================================================
// External Leaves
// ============================================================================

/// Kinds of external leaf documents the graph can point at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExternalKind {
    Actor,
    Item,
    Scene,
}

impl ExternalKind {
    pub fn name(&self) -> &'static str {
        match self {
            ExternalKind::Actor => "Actor",
            ExternalKind::Item => "Item",
            ExternalKind::Scene => "Scene",
        }
    }
}

impl fmt::Display for ExternalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// The slice of an external leaf document the core reads: identity, name
/// (for import conflict policies) and base price (for inventory pricing).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalDoc {
    pub id: Ref,
    pub kind: ExternalKind,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_price: Option<f64>,
}

impl ExternalDoc {
    pub fn new(kind: ExternalKind, name: impl Into<String>) -> Self {
        Self {
            id: Ref::new(),
            kind,
            name: name.into(),
            base_price: None,
        }
    }

    pub fn with_base_price(mut self, price: f64) -> Self {
        self.base_price = Some(price);
        self
    }
}

// ============================================================================
// Store Contract
// ============================================================================

/// The host document API. Reads never fail — a missing or undecodable
/// document is `None`, which callers treat as a broken reference.
#[async_trait]
pub trait EntityStore: Send + Sync {
    /// Resolve an entity reference. `None` means dangling.
    async fn get(&self, reference: Ref) -> Option<Entity>;

    /// Create or overwrite an entity document (last write wins).
    async fn put(&self, entity: Entity) -> Result<(), StoreError>;

    /// Remove an entity document.
    async fn delete(&self, reference: Ref) -> Result<(), StoreError>;

    /// Every entity in the store. Used by the full-scan paths
    /// (cascade delete, reconciliation).
    async fn all(&self) -> Vec<Entity>;

    /// Resolve an external leaf reference.
    async fn get_external(&self, reference: Ref) -> Option<ExternalDoc>;

    /// Create or overwrite an external leaf document.
    async fn put_external(&self, doc: ExternalDoc) -> Result<(), StoreError>;

    /// Every external leaf in the store.
    async fn all_externals(&self) -> Vec<ExternalDoc>;

    /// Ensure a hierarchical grouping label exists in the destination.
    /// Idempotent; backends without folders may no-op.
    async fn ensure_folder(&self, label: &str) -> Result<(), StoreError>;

    /// Synchronous best-effort existence check. May report false negatives
    /// when no fast path is available; never blocks.
    fn exists_sync(&self, reference: Ref) -> bool;
}

// ============================================================================
// In-Memory Store
// ============================================================================

/// Reference store used by tests and demos. Entities round-trip through
/// their serialized blob on every access; malformed blobs resolve as
/// dangling with a warning, matching the recoverable-reference contract.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entities: RwLock<HashMap<Ref, serde_json::Value>>,
    externals: RwLock<HashMap<Ref, ExternalDoc>>,
    folders: RwLock<std::collections::HashSet<String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn entity_count(&self) -> usize {
        self.entities.read().await.len()
    }

    pub async fn external_count(&self) -> usize {
        self.externals.read().await.len()
    }

    pub async fn folder_count(&self) -> usize {
        self.folders.read().await.len()
    }

    /// Insert a raw blob without validation. Lets tests plant malformed
    /// documents the way a drifted host store would.
    pub async fn put_raw(&self, reference: Ref, blob: serde_json::Value) {
        self.entities.write().await.insert(reference, blob);
    }
}

#[async_trait]
impl EntityStore for MemoryStore {
    async fn get(&self, reference: Ref) -> Option<Entity> {
        let blob = self.entities.read().await.get(&reference).cloned()?;
        match serde_json::from_value::<Entity>(blob) {
            Ok(entity) => Some(entity),
            Err(err) => {
                log::warn!("undecodable entity blob at {reference}: {err}");
                None
            }
        }
    }

    async fn put(&self, entity: Entity) -> Result<(), StoreError> {
        let id = entity.id;
        let blob = serde_json::to_value(&entity)?;
        self.entities.write().await.insert(id, blob);
        Ok(())
    }

    async fn delete(&self, reference: Ref) -> Result<(), StoreError> {
        self.entities
            .write()
            .await
            .remove(&reference)
            .map(|_| ())
            .ok_or(StoreError::NotFound(reference))
    }

    async fn all(&self) -> Vec<Entity> {
        let blobs = self.entities.read().await;
        let mut entities = Vec::with_capacity(blobs.len());
        for (reference, blob) in blobs.iter() {
            match serde_json::from_value::<Entity>(blob.clone()) {
                Ok(entity) => entities.push(entity),
                Err(err) => log::warn!("skipping undecodable entity {reference}: {err}"),
            }
        }
        entities
    }

    async fn get_external(&self, reference: Ref) -> Option<ExternalDoc> {
        self.externals.read().await.get(&reference).cloned()
    }

    async fn put_external(&self, doc: ExternalDoc) -> Result<(), StoreError> {
        self.externals.write().await.insert(doc.id, doc);
        Ok(())
    }

    async fn all_externals(&self) -> Vec<ExternalDoc> {
        self.externals.read().await.values().cloned().collect()
    }

    async fn ensure_folder(&self, label: &str) -> Result<(), StoreError> {
        self.folders.write().await.insert(label.to_string());
        Ok(())
    }

    fn exists_sync(&self, reference: Ref) -> bool {
        match self.entities.try_read() {
            Ok(entities) => {
                entities.contains_key(&reference)
                    || self
                        .externals
                        .try_read()
                        .map(|e| e.contains_key(&reference))
                        .unwrap_or(false)
            }
            Err(_) => false,
        }
    }
}

// ============================================================================
// Resolver
// ============================================================================

/// Thin read-only view over a store. Resolution never errors; `None`
/// always means a broken reference, not a failure.
#[derive(Clone, Copy)]
pub struct Resolver<'a> {
    store: &'a dyn EntityStore,
}

impl<'a> Resolver<'a> {
    pub fn new(store: &'a dyn EntityStore) -> Self {
        Self { store }
    }

    pub async fn resolve(&self, reference: Ref) -> Option<Entity> {
        self.store.get(reference).await
    }

    pub async fn resolve_external(&self, reference: Ref) -> Option<ExternalDoc> {
        self.store.get_external(reference).await
    }

    pub fn exists_sync(&self, reference: Ref) -> bool {
        self.store.exists_sync(reference)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::InventoryEntry;

    #[tokio::test]
    async fn test_round_trip_through_blob() {
        let store = MemoryStore::new();
        let item = Ref::new();

        let mut shop = Entity::new_shop("Ironmonger").with_notes("Closed on festival days.");
        shop.as_shop_mut().unwrap().markup = 1.5;
        shop.as_shop_mut()
            .unwrap()
            .inventory
            .push(InventoryEntry::new(item, 2).with_custom_price(12.0));
        let id = shop.id;

        store.put(shop.clone()).await.unwrap();
        let loaded = store.get(id).await.expect("entity should resolve");
        assert_eq!(loaded, shop);
    }

    #[tokio::test]
    async fn test_malformed_blob_is_dangling() {
        let store = MemoryStore::new();
        let reference = Ref::new();
        store
            .put_raw(reference, serde_json::json!({"type": "shop", "data": 7}))
            .await;

        assert!(store.get(reference).await.is_none());
        // all() skips it rather than failing the sweep.
        assert!(store.all().await.is_empty());
    }

    #[tokio::test]
    async fn test_delete_missing_reports_not_found() {
        let store = MemoryStore::new();
        let missing = Ref::new();
        assert!(matches!(
            store.delete(missing).await,
            Err(StoreError::NotFound(r)) if r == missing
        ));
    }

    #[tokio::test]
    async fn test_exists_sync_fast_path() {
        let store = MemoryStore::new();
        let npc = Entity::new_npc("Brakus");
        let id = npc.id;
        store.put(npc).await.unwrap();

        let resolver = Resolver::new(&store);
        assert!(resolver.exists_sync(id));
        assert!(!resolver.exists_sync(Ref::new()));
    }

    #[tokio::test]
    async fn test_external_docs() {
        let store = MemoryStore::new();
        let sword = ExternalDoc::new(ExternalKind::Item, "Longsword").with_base_price(15.0);
        let id = sword.id;
        store.put_external(sword.clone()).await.unwrap();

        let resolver = Resolver::new(&store);
        assert_eq!(resolver.resolve_external(id).await, Some(sword));
        assert!(resolver.resolve_external(Ref::new()).await.is_none());
    }
}
