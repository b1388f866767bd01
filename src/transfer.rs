//! Subgraph export and import with reference remapping.
//!
//! Export discovers everything reachable from a root set and copies it into
//! a versioned archive. Import duplicates the archive's contents into a
//! destination store, building an old-reference → new-reference table and
//! rewriting every relationship field and every inline `@Link[...]` markup
//! occurrence through it. References outside the table are left alone: they
//! point outside the transferred subgraph or were already broken.

use crate::entity::{Entity, Ref, RelationField};
use crate::links::BatchFailure;
use crate::store::{EntityStore, ExternalDoc, ExternalKind, StoreError};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};
use std::path::Path;
use thiserror::Error;
use tokio::fs;

/// Errors from transfer operations.
#[derive(Debug, Error)]
pub enum TransferError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("archive version mismatch: expected {expected}, found {found}")]
    VersionMismatch { expected: u32, found: u32 },

    #[error("no exportable entities found under the given roots")]
    NoRoots,

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Current archive format version.
const ARCHIVE_VERSION: u32 = 1;

// ============================================================================
// Archive Format
// ============================================================================

/// A transferable snapshot of a campaign subgraph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Archive {
    /// Format version for compatibility checking.
    pub version: u32,

    /// Human-readable label for the archive.
    pub label: String,

    /// When the archive was created (epoch seconds).
    pub created_at: u64,

    /// Entity nodes, in discovery order.
    pub entities: Vec<Entity>,

    /// External leaves the entities point at.
    pub externals: Vec<ExternalDoc>,
}

impl Archive {
    /// Save to a JSON file.
    pub async fn save_json(&self, path: impl AsRef<Path>) -> Result<(), TransferError> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content).await?;
        Ok(())
    }

    /// Load from a JSON file, checking the format version.
    pub async fn load_json(path: impl AsRef<Path>) -> Result<Self, TransferError> {
        let content = fs::read_to_string(path).await?;
        let archive: Self = serde_json::from_str(&content)?;

        if archive.version != ARCHIVE_VERSION {
            return Err(TransferError::VersionMismatch {
                expected: ARCHIVE_VERSION,
                found: archive.version,
            });
        }

        Ok(archive)
    }

    /// Read just the label and counts without loading the full contents.
    pub async fn peek(path: impl AsRef<Path>) -> Result<ArchiveSummary, TransferError> {
        let content = fs::read_to_string(path).await?;

        #[derive(Deserialize)]
        struct Partial {
            version: u32,
            label: String,
            entities: Vec<serde_json::Value>,
            externals: Vec<serde_json::Value>,
        }

        let partial: Partial = serde_json::from_str(&content)?;
        if partial.version != ARCHIVE_VERSION {
            return Err(TransferError::VersionMismatch {
                expected: ARCHIVE_VERSION,
                found: partial.version,
            });
        }

        Ok(ArchiveSummary {
            label: partial.label,
            entity_count: partial.entities.len(),
            external_count: partial.externals.len(),
        })
    }
}

/// Summary of an archive file.
#[derive(Debug, Clone)]
pub struct ArchiveSummary {
    pub label: String,
    pub entity_count: usize,
    pub external_count: usize,
}

/// Epoch-seconds timestamp, avoiding a date-time dependency.
fn epoch_seconds() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

// ============================================================================
// Discovery
// ============================================================================

/// The reachable set under a root set, partitioned by kind.
#[derive(Debug, Clone, Default)]
pub struct Discovery {
    pub entities: Vec<Ref>,
    pub actors: Vec<Ref>,
    pub items: Vec<Ref>,
    pub scenes: Vec<Ref>,
}

impl Discovery {
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

/// Follow every relationship field (single, multi, nested inventory) from
/// the roots, visited-set guarded, partitioning what is found.
pub async fn discover<S: EntityStore + ?Sized>(store: &S, roots: &[Ref]) -> Discovery {
    let mut discovery = Discovery::default();
    let mut visited: HashSet<Ref> = HashSet::new();
    let mut seen_external: HashSet<Ref> = HashSet::new();
    let mut queue: VecDeque<Ref> = roots.iter().copied().collect();

    while let Some(reference) = queue.pop_front() {
        if !visited.insert(reference) {
            continue;
        }
        let Some(entity) = store.get(reference).await else {
            log::warn!("skipping unresolvable reference {reference} during discovery");
            continue;
        };

        discovery.entities.push(reference);

        for field in RelationField::fields_of(entity.kind()) {
            for target in field.refs_in(&entity.data) {
                if field.is_external() {
                    if seen_external.insert(target) {
                        match field {
                            RelationField::NpcLinkedActor => discovery.actors.push(target),
                            RelationField::ShopInventory => discovery.items.push(target),
                            RelationField::LocationLinkedScene => discovery.scenes.push(target),
                            _ => unreachable!("external fields are enumerated above"),
                        }
                    }
                } else {
                    queue.push_back(target);
                }
            }
        }
    }

    discovery
}

// ============================================================================
// Export
// ============================================================================

/// Copy the subgraph under `roots` into an archive. Entities keep their
/// identity inside the archive; identity is rewritten on import.
pub async fn export<S: EntityStore + ?Sized>(
    store: &S,
    roots: &[Ref],
    label: impl Into<String>,
) -> Result<Archive, TransferError> {
    let discovery = discover(store, roots).await;
    if discovery.is_empty() {
        return Err(TransferError::NoRoots);
    }

    let mut entities = Vec::with_capacity(discovery.entities.len());
    for reference in &discovery.entities {
        match store.get(*reference).await {
            Some(entity) => entities.push(entity),
            None => log::warn!("entity {reference} vanished during export, dropping"),
        }
    }

    // Leaves in duplication order: actors, items, scenes.
    let mut externals = Vec::new();
    for reference in discovery
        .actors
        .iter()
        .chain(discovery.items.iter())
        .chain(discovery.scenes.iter())
    {
        match store.get_external(*reference).await {
            Some(doc) => externals.push(doc),
            None => log::warn!("external {reference} does not resolve, dropping from export"),
        }
    }

    log::debug!(
        "exported {} entities and {} externals",
        entities.len(),
        externals.len()
    );

    Ok(Archive {
        version: ARCHIVE_VERSION,
        label: label.into(),
        created_at: epoch_seconds(),
        entities,
        externals,
    })
}

// ============================================================================
// Import
// ============================================================================

/// Conflict handling for an import run. Explicit caller input, never
/// inferred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportPolicy {
    /// Everything gets a fresh identity.
    AlwaysDuplicate,
    /// Reuse a same-named leaf of the same kind already in the destination
    /// instead of duplicating it. Entity nodes still duplicate.
    SkipExisting,
    /// Overwrite a same-identity entity node in place instead of
    /// duplicating it. Leaves still duplicate.
    ReplaceExisting,
}

/// Aggregate outcome of an import run.
#[derive(Debug, Clone, Default)]
pub struct ImportReport {
    pub created: usize,
    pub reused: usize,
    pub replaced: usize,
    pub failures: Vec<BatchFailure>,
    /// Old reference → new reference for everything that landed.
    pub remapped: HashMap<Ref, Ref>,
    /// Entity references now live in the destination.
    pub imported_entities: Vec<Ref>,
}

impl ImportReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Import an archive into a destination store, remapping every reference.
pub async fn import<S: EntityStore + ?Sized>(
    archive: &Archive,
    store: &S,
    policy: ImportPolicy,
) -> Result<ImportReport, TransferError> {
    if archive.entities.is_empty() {
        return Err(TransferError::NoRoots);
    }

    let mut report = ImportReport::default();

    // Leaf duplication first, so leaf remaps exist before entities rewrite.
    let existing_leaves = if policy == ImportPolicy::SkipExisting {
        let mut index: HashMap<(ExternalKind, String), Ref> = HashMap::new();
        for doc in store.all_externals().await {
            index.insert((doc.kind, doc.name.to_lowercase()), doc.id);
        }
        index
    } else {
        HashMap::new()
    };

    for doc in &archive.externals {
        if policy == ImportPolicy::SkipExisting {
            if let Some(existing) = existing_leaves.get(&(doc.kind, doc.name.to_lowercase())) {
                report.remapped.insert(doc.id, *existing);
                report.reused += 1;
                continue;
            }
        }

        let mut copy = doc.clone();
        let old = copy.id;
        copy.id = Ref::new();
        let new = copy.id;
        match store.put_external(copy).await {
            Ok(()) => {
                report.remapped.insert(old, new);
                report.created += 1;
            }
            Err(err) => {
                log::warn!("failed to import {} {}: {err}", doc.kind, doc.name);
                report.failures.push(BatchFailure {
                    entity: old,
                    error: err.to_string(),
                });
            }
        }
    }

    // Assign entity identities before any entity write, so the rewrite pass
    // sees the complete table regardless of write order.
    for entity in &archive.entities {
        let new_id = match policy {
            ImportPolicy::ReplaceExisting if store.get(entity.id).await.is_some() => entity.id,
            _ => Ref::new(),
        };
        report.remapped.insert(entity.id, new_id);
    }

    // Folder labels are preserved; creation in the destination is lazy and
    // memoized so repeated labels do not create duplicates.
    let mut folders_made: HashSet<String> = HashSet::new();

    for entity in &archive.entities {
        let old = entity.id;
        let new = report.remapped[&old];
        let replacing = new == old;

        let mut copy = entity.clone();
        copy.id = new;
        rewrite_entity_refs(&mut copy, &report.remapped);

        if let Some(label) = &copy.folder {
            if folders_made.insert(label.clone()) {
                if let Err(err) = store.ensure_folder(label).await {
                    log::warn!("failed to create folder {label}: {err}");
                }
            }
        }

        match store.put(copy).await {
            Ok(()) => {
                report.imported_entities.push(new);
                if replacing {
                    report.replaced += 1;
                } else {
                    report.created += 1;
                }
            }
            Err(err) => {
                log::warn!("failed to import entity {}: {err}", entity.name);
                report.failures.push(BatchFailure {
                    entity: new,
                    error: err.to_string(),
                });
            }
        }
    }

    Ok(report)
}

/// Rewrite every relationship field and every inline markup occurrence
/// through the remap table. References not in the table are left unchanged.
fn rewrite_entity_refs(entity: &mut Entity, map: &HashMap<Ref, Ref>) {
    for field in RelationField::fields_of(entity.kind()) {
        if *field == RelationField::ShopInventory {
            if let Some(shop) = entity.as_shop_mut() {
                for entry in &mut shop.inventory {
                    if let Some(new) = map.get(&entry.item) {
                        entry.item = *new;
                    }
                }
            }
        } else if let Some(list) = field.multi_mut(&mut entity.data) {
            for reference in list.iter_mut() {
                if let Some(new) = map.get(reference) {
                    *reference = *new;
                }
            }
        } else if let Some(slot) = field.single_mut(&mut entity.data) {
            if let Some(reference) = slot.as_mut() {
                if let Some(new) = map.get(reference) {
                    *reference = *new;
                }
            }
        }
    }

    for (old, new) in map {
        if old != new {
            entity.rewrite_text_refs(*old, *new);
        }
    }
}
