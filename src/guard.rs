//! Re-entrancy guards for overlapping async operations.
//!
//! A single logical actor still interleaves at await points, so a second
//! call can start while the first is suspended mid-persist. Three key sets
//! cover the races that matter: duplicate creation for one identity key,
//! overlapping sheet-level mutations on one owner, and cleanup re-observing
//! an entity mid-deletion. Flags release on drop, so early returns and
//! panics cannot leak them.

use crate::entity::{EntityKind, Ref};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

#[derive(Debug, Default)]
struct GuardSets {
    creations: HashSet<String>,
    busy_owners: HashSet<Ref>,
    pending_deletions: HashSet<Ref>,
}

/// Request-scoped guard registry. Cheap to clone; clones share state.
#[derive(Debug, Clone, Default)]
pub struct OpGuards {
    sets: Arc<Mutex<GuardSets>>,
}

impl OpGuards {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim an identity key for a creation in flight. `None` means another
    /// creation for the same key has not finished yet; the caller returns
    /// early without erroring.
    pub fn begin_creation(&self, key: impl Into<String>) -> Option<CreationGuard> {
        let key = key.into();
        let mut sets = self.sets.lock().expect("guard mutex poisoned");
        if sets.creations.insert(key.clone()) {
            Some(CreationGuard {
                sets: Arc::clone(&self.sets),
                key,
            })
        } else {
            None
        }
    }

    /// Claim exclusive mutation of one owning entity. `None` while a prior
    /// mutation on the same owner is still settling.
    pub fn begin_mutation(&self, owner: Ref) -> Option<MutationGuard> {
        let mut sets = self.sets.lock().expect("guard mutex poisoned");
        if sets.busy_owners.insert(owner) {
            Some(MutationGuard {
                sets: Arc::clone(&self.sets),
                owner,
            })
        } else {
            None
        }
    }

    /// Mark an entity as mid-deletion so cleanup passes skip it. `None`
    /// when a deletion of the same entity is already underway.
    pub fn begin_deletion(&self, reference: Ref) -> Option<DeletionGuard> {
        let mut sets = self.sets.lock().expect("guard mutex poisoned");
        if sets.pending_deletions.insert(reference) {
            Some(DeletionGuard {
                sets: Arc::clone(&self.sets),
                reference,
            })
        } else {
            None
        }
    }

    pub fn is_deleting(&self, reference: Ref) -> bool {
        self.sets
            .lock()
            .expect("guard mutex poisoned")
            .pending_deletions
            .contains(&reference)
    }
}

/// Identity key for kind+name creation de-duplication. Normalized the same
/// way names are indexed, so "Old Tom" and "old tom" collide.
pub fn creation_key(kind: EntityKind, name: &str) -> String {
    format!("{}:{}", kind.name(), name.trim().to_lowercase())
}

/// Identity key for creating an NPC from an external actor.
pub fn actor_creation_key(actor: Ref) -> String {
    format!("actor:{actor}")
}

/// Releases a creation key on drop.
#[derive(Debug)]
pub struct CreationGuard {
    sets: Arc<Mutex<GuardSets>>,
    key: String,
}

impl Drop for CreationGuard {
    fn drop(&mut self) {
        if let Ok(mut sets) = self.sets.lock() {
            sets.creations.remove(&self.key);
        }
    }
}

/// Releases an owner's busy flag on drop.
#[derive(Debug)]
pub struct MutationGuard {
    sets: Arc<Mutex<GuardSets>>,
    owner: Ref,
}

impl Drop for MutationGuard {
    fn drop(&mut self) {
        if let Ok(mut sets) = self.sets.lock() {
            sets.busy_owners.remove(&self.owner);
        }
    }
}

/// Clears the pending-deletion mark on drop.
#[derive(Debug)]
pub struct DeletionGuard {
    sets: Arc<Mutex<GuardSets>>,
    reference: Ref,
}

impl Drop for DeletionGuard {
    fn drop(&mut self) {
        if let Ok(mut sets) = self.sets.lock() {
            sets.pending_deletions.remove(&self.reference);
        }
    }
}
