//! Bidirectional link maintenance.
//!
//! Every relationship mutation flows through [`LinkMaintainer`], which keeps
//! both sides of a pair consistent: adding a shop to a location also points
//! the shop back at the location, relinking a shop detaches it from its old
//! location, and deleting an entity strips every reference to it from the
//! whole store. All operations are idempotent, and batch writes settle
//! collectively — one entity's persist failure never aborts its siblings.

use crate::entity::{add_unique, diff_relationships, Entity, EntityData, EntityKind, Ref, RelationField};
use crate::guard::OpGuards;
use crate::relation::{inverse_of, Relation};
use crate::store::{EntityStore, StoreError};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use thiserror::Error;

/// Errors from link operations. Only whole-operation setup failures land
/// here; per-entity write failures inside a batch are reported, not thrown.
#[derive(Debug, Error)]
pub enum LinkError {
    #[error("reference {0} does not resolve")]
    Dangling(Ref),

    #[error("{} link expects a {expected} here, found a {actual}", .relation.name())]
    WrongKind {
        relation: Relation,
        expected: EntityKind,
        actual: EntityKind,
    },

    #[error("{} has no single-valued side", .relation.name())]
    NotSingleValued { relation: Relation },

    #[error("adding {member} to group {group} would put the group inside itself")]
    CircularContainment { group: Ref, member: Ref },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// One failed write inside a batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchFailure {
    pub entity: Ref,
    pub error: String,
}

/// Outcome of a batch of independent per-entity writes. `affected` lists
/// every entity a write was attempted for, in mutation order; presentation
/// layers use it to decide what to refresh.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchReport {
    pub affected: Vec<Ref>,
    pub failures: Vec<BatchFailure>,
}

impl BatchReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn merge(&mut self, other: BatchReport) {
        for r in other.affected {
            if !self.affected.contains(&r) {
                self.affected.push(r);
            }
        }
        self.failures.extend(other.failures);
    }
}

/// Persist a set of entities as independent writes, awaiting collective
/// settlement. Failures are logged and collected, never short-circuited.
pub(crate) async fn persist_all<S: EntityStore + ?Sized>(
    store: &S,
    entities: Vec<Entity>,
) -> BatchReport {
    let affected: Vec<Ref> = entities.iter().map(|e| e.id).collect();
    let results = join_all(entities.into_iter().map(|e| store.put(e))).await;

    let mut failures = Vec::new();
    for (reference, result) in affected.iter().zip(results) {
        if let Err(err) = result {
            log::warn!("failed to persist {reference}: {err}");
            failures.push(BatchFailure {
                entity: *reference,
                error: err.to_string(),
            });
        }
    }
    BatchReport { affected, failures }
}

/// Read-modify-write working set for one operation. Entities load once,
/// mutate in memory, and the dirty subset persists in a single batch.
struct WorkingSet<'a, S: ?Sized> {
    store: &'a S,
    loaded: HashMap<Ref, Entity>,
    dirty: Vec<Ref>,
}

impl<'a, S: EntityStore + ?Sized> WorkingSet<'a, S> {
    fn new(store: &'a S) -> Self {
        Self {
            store,
            loaded: HashMap::new(),
            dirty: Vec::new(),
        }
    }

    async fn load(&mut self, reference: Ref) -> Option<&mut Entity> {
        if !self.loaded.contains_key(&reference) {
            let entity = self.store.get(reference).await?;
            self.loaded.insert(reference, entity);
        }
        self.loaded.get_mut(&reference)
    }

    fn mark_dirty(&mut self, reference: Ref) {
        if !self.dirty.contains(&reference) {
            self.dirty.push(reference);
        }
    }

    async fn commit(self) -> BatchReport {
        let entities: Vec<Entity> = self
            .dirty
            .iter()
            .filter_map(|r| self.loaded.get(r).cloned())
            .collect();
        persist_all(self.store, entities).await
    }
}

/// Applies relationship mutations against a store, keeping inverse fields
/// consistent.
pub struct LinkMaintainer<'a, S: EntityStore + ?Sized> {
    store: &'a S,
    guards: OpGuards,
}

impl<'a, S: EntityStore + ?Sized> LinkMaintainer<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self {
            store,
            guards: OpGuards::new(),
        }
    }

    /// Share guard state with a facade so deletion marks are visible to
    /// every path.
    pub fn with_guards(store: &'a S, guards: OpGuards) -> Self {
        Self { store, guards }
    }

    // ========================================================================
    // Link / Unlink
    // ========================================================================

    /// Add `other` to `owner`'s forward field and mirror it on the inverse
    /// side. Idempotent; self-links are a silent no-op.
    pub async fn link(
        &self,
        owner: Ref,
        other: Ref,
        relation: Relation,
    ) -> Result<BatchReport, LinkError> {
        if owner == other {
            return Ok(BatchReport::default());
        }

        let mut set = WorkingSet::new(self.store);

        let owner_kind = set.load(owner).await.ok_or(LinkError::Dangling(owner))?.kind();
        if owner_kind != relation.owner_kind() {
            return Err(LinkError::WrongKind {
                relation,
                expected: relation.owner_kind(),
                actual: owner_kind,
            });
        }

        let other_kind = set.load(other).await.ok_or(LinkError::Dangling(other))?.kind();
        if let Some(expected) = relation.target_kind() {
            if other_kind != expected {
                return Err(LinkError::WrongKind {
                    relation,
                    expected,
                    actual: other_kind,
                });
            }
        }

        // Group containment must stay acyclic; every other cycle shape is
        // legal and handled by traversal dedup instead.
        if relation == Relation::GroupMember && self.group_closure_contains(other, owner).await {
            return Err(LinkError::CircularContainment {
                group: owner,
                member: other,
            });
        }

        let changed = {
            let entity = set.load(owner).await.expect("owner cached");
            let list = relation
                .forward_field()
                .multi_mut(&mut entity.data)
                .expect("forward field is multi-valued");
            add_unique(list, other)
        };
        if changed {
            set.mark_dirty(owner);
        }

        match relation.inverse_field() {
            None => {}
            Some(inverse) if inverse.is_array() => {
                let changed = {
                    let target = set.load(other).await.expect("target cached");
                    let list = inverse
                        .multi_mut(&mut target.data)
                        .expect("array inverse field");
                    add_unique(list, owner)
                };
                if changed {
                    set.mark_dirty(other);
                }
            }
            Some(inverse) => {
                // Single-valued inverse: point `other` at `owner`, and if it
                // pointed somewhere else, detach it there.
                let previous = {
                    let target = set.load(other).await.expect("target cached");
                    let slot = inverse
                        .single_mut(&mut target.data)
                        .expect("single inverse field");
                    let previous = *slot;
                    if previous != Some(owner) {
                        *slot = Some(owner);
                    }
                    previous
                };
                if previous != Some(owner) {
                    set.mark_dirty(other);
                }
                if let Some(previous) = previous.filter(|p| *p != owner) {
                    self.detach_forward(&mut set, previous, other, relation).await;
                }
            }
        }

        Ok(set.commit().await)
    }

    /// Remove `other` from `owner`'s forward field and from the inverse
    /// side. No-op if absent; dangling participants are skipped quietly.
    pub async fn unlink(
        &self,
        owner: Ref,
        other: Ref,
        relation: Relation,
    ) -> Result<BatchReport, LinkError> {
        if owner == other {
            return Ok(BatchReport::default());
        }

        let mut set = WorkingSet::new(self.store);

        match set.load(owner).await {
            Some(entity) => {
                if entity.kind() != relation.owner_kind() {
                    let actual = entity.kind();
                    return Err(LinkError::WrongKind {
                        relation,
                        expected: relation.owner_kind(),
                        actual,
                    });
                }
            }
            None => {
                log::debug!("unlink: owner {owner} already gone");
                return Ok(BatchReport::default());
            }
        }

        let changed = {
            let entity = set.load(owner).await.expect("owner cached");
            relation.forward_field().strip(&mut entity.data, other)
        };
        if changed {
            set.mark_dirty(owner);
        }

        if let Some(inverse) = relation.inverse_field() {
            match set.load(other).await {
                Some(target) => {
                    let changed = inverse.strip(&mut target.data, owner);
                    if changed {
                        set.mark_dirty(other);
                    }
                }
                None => log::debug!("unlink: target {other} is dangling, forward side only"),
            }
        }

        Ok(set.commit().await)
    }

    /// Repoint a single-valued relation (shop → location, location →
    /// region). Detaches from the old target's list, sets the pointer, and
    /// attaches to the new target, as one batched settlement so the forward
    /// pointer is never silently lost to a partial failure.
    pub async fn set_single(
        &self,
        owner: Ref,
        relation: Relation,
        new_target: Option<Ref>,
    ) -> Result<BatchReport, LinkError> {
        let single = relation
            .single_side()
            .ok_or(LinkError::NotSingleValued { relation })?;
        if new_target == Some(owner) {
            return Ok(BatchReport::default());
        }

        let mut set = WorkingSet::new(self.store);

        let owner_kind = set.load(owner).await.ok_or(LinkError::Dangling(owner))?.kind();
        if owner_kind != single.kind() {
            return Err(LinkError::WrongKind {
                relation,
                expected: single.kind(),
                actual: owner_kind,
            });
        }

        if let Some(target) = new_target {
            let target_kind = set
                .load(target)
                .await
                .ok_or(LinkError::Dangling(target))?
                .kind();
            if target_kind != relation.owner_kind() {
                return Err(LinkError::WrongKind {
                    relation,
                    expected: relation.owner_kind(),
                    actual: target_kind,
                });
            }
        }

        let previous = {
            let entity = set.load(owner).await.expect("owner cached");
            let slot = single
                .single_mut(&mut entity.data)
                .expect("single-valued field");
            let previous = *slot;
            if previous != new_target {
                *slot = new_target;
            }
            previous
        };
        if previous != new_target {
            set.mark_dirty(owner);
        }

        if let Some(previous) = previous.filter(|p| Some(*p) != new_target) {
            self.detach_forward(&mut set, previous, owner, relation).await;
        }

        if let Some(target) = new_target {
            let changed = {
                let entity = set.load(target).await.expect("target cached");
                let list = relation
                    .forward_field()
                    .multi_mut(&mut entity.data)
                    .expect("forward field is multi-valued");
                add_unique(list, owner)
            };
            if changed {
                set.mark_dirty(target);
            }
        }

        Ok(set.commit().await)
    }

    /// Remove `member` from `holder`'s forward list for `relation`.
    /// Dangling holders are a quiet no-op.
    async fn detach_forward(
        &self,
        set: &mut WorkingSet<'a, S>,
        holder: Ref,
        member: Ref,
        relation: Relation,
    ) {
        match set.load(holder).await {
            Some(entity) => {
                if relation.forward_field().strip(&mut entity.data, member) {
                    set.mark_dirty(holder);
                }
            }
            None => log::debug!(
                "previous {} holder {holder} of {member} is dangling, nothing to detach",
                relation.name()
            ),
        }
    }

    // ========================================================================
    // Cascade Delete
    // ========================================================================

    /// Strip every reference to `target` from every entity in the store.
    /// Walks everyone rather than trusting back-references, so a pair that
    /// drifted out of sync still comes out clean.
    pub async fn cascade_delete(&self, target: Ref) -> BatchReport {
        let Some(_mark) = self.guards.begin_deletion(target) else {
            log::debug!("cascade delete of {target} already underway");
            return BatchReport::default();
        };

        let mut updated = Vec::new();
        for mut entity in self.store.all().await {
            if entity.id == target || self.guards.is_deleting(entity.id) {
                continue;
            }
            let mut changed = false;
            for field in RelationField::fields_of(entity.kind()) {
                changed |= field.strip(&mut entity.data, target);
            }
            if changed {
                updated.push(entity);
            }
        }

        log::debug!("cascade delete of {target}: {} entities to patch", updated.len());
        persist_all(self.store, updated).await
    }

    // ========================================================================
    // Reactive Diff Path
    // ========================================================================

    /// Apply the inverse-side consequences of a direct edit to one entity's
    /// relationship fields. The owning side already holds the new state, so
    /// only the other side of each changed pair is written.
    pub async fn react_to_field_change(
        &self,
        reference: Ref,
        old: &EntityData,
        new: &EntityData,
    ) -> BatchReport {
        let mut set = WorkingSet::new(self.store);

        for change in diff_relationships(old, new) {
            let Some(inverse) = inverse_of(change.field) else {
                continue;
            };

            for added in change.added {
                if added == reference || self.guards.is_deleting(added) {
                    continue;
                }
                self.apply_inverse_add(&mut set, reference, added, change.field, inverse)
                    .await;
            }

            for removed in change.removed {
                if removed == reference || self.guards.is_deleting(removed) {
                    continue;
                }
                match set.load(removed).await {
                    Some(target) => {
                        if inverse.strip(&mut target.data, reference) {
                            set.mark_dirty(removed);
                        }
                    }
                    None => log::debug!("removed reference {removed} is dangling, nothing to clean"),
                }
            }
        }

        set.commit().await
    }

    async fn apply_inverse_add(
        &self,
        set: &mut WorkingSet<'a, S>,
        owner: Ref,
        target: Ref,
        field: RelationField,
        inverse: RelationField,
    ) {
        if set.load(target).await.is_none() {
            log::warn!("added reference {target} does not resolve, skipping inverse update");
            return;
        }

        if inverse.is_array() {
            let changed = {
                let entity = set.load(target).await.expect("target cached");
                match inverse.multi_mut(&mut entity.data) {
                    Some(list) => add_unique(list, owner),
                    None => {
                        log::warn!(
                            "{} does not carry {}, skipping inverse update",
                            target,
                            inverse.name()
                        );
                        false
                    }
                }
            };
            if changed {
                set.mark_dirty(target);
            }
        } else {
            // Single-valued inverse: pointer move, detaching from the old
            // holder's list.
            let previous = {
                let entity = set.load(target).await.expect("target cached");
                match inverse.single_mut(&mut entity.data) {
                    Some(slot) => {
                        let previous = *slot;
                        if previous != Some(owner) {
                            *slot = Some(owner);
                        }
                        previous
                    }
                    None => {
                        log::warn!(
                            "{} does not carry {}, skipping inverse update",
                            target,
                            inverse.name()
                        );
                        return;
                    }
                }
            };
            if previous != Some(owner) {
                set.mark_dirty(target);
            }
            if let Some(previous) = previous.filter(|p| *p != owner) {
                match set.load(previous).await {
                    Some(entity) => {
                        if field.strip(&mut entity.data, target) {
                            set.mark_dirty(previous);
                        }
                    }
                    None => log::debug!("old holder {previous} is dangling, nothing to detach"),
                }
            }
        }
    }

    // ========================================================================
    // Containment
    // ========================================================================

    /// Whether `needle` appears in the transitive member closure rooted at
    /// `start`. Only recurses through groups; other kinds are leaves here.
    async fn group_closure_contains(&self, start: Ref, needle: Ref) -> bool {
        let mut visited = HashSet::new();
        let mut queue = vec![start];

        while let Some(reference) = queue.pop() {
            if !visited.insert(reference) {
                continue;
            }
            if reference == needle {
                return true;
            }
            if let Some(entity) = self.store.get(reference).await {
                if let Some(group) = entity.as_group() {
                    queue.extend(group.members.iter().copied());
                }
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    async fn seed(store: &MemoryStore, entity: Entity) -> Ref {
        let id = entity.id;
        store.put(entity).await.unwrap();
        id
    }

    #[tokio::test]
    async fn test_link_is_idempotent() {
        let store = MemoryStore::new();
        let links = LinkMaintainer::new(&store);
        let location = seed(&store, Entity::new_location("Dockside")).await;
        let npc = seed(&store, Entity::new_npc("Ferryman Ott")).await;

        links.link(location, npc, Relation::LocationNpc).await.unwrap();
        links.link(location, npc, Relation::LocationNpc).await.unwrap();

        let loc = store.get(location).await.unwrap();
        let ferryman = store.get(npc).await.unwrap();
        assert_eq!(loc.as_location().unwrap().linked_npcs, vec![npc]);
        assert_eq!(ferryman.as_npc().unwrap().linked_locations, vec![location]);
    }

    #[tokio::test]
    async fn test_link_moves_single_inverse() {
        let store = MemoryStore::new();
        let links = LinkMaintainer::new(&store);
        let l1 = seed(&store, Entity::new_location("Old Market")).await;
        let l2 = seed(&store, Entity::new_location("New Market")).await;
        let shop = seed(&store, Entity::new_shop("Spicer")).await;

        links.link(l1, shop, Relation::LocationShop).await.unwrap();
        links.link(l2, shop, Relation::LocationShop).await.unwrap();

        let old = store.get(l1).await.unwrap();
        let new = store.get(l2).await.unwrap();
        let spicer = store.get(shop).await.unwrap();
        assert!(old.as_location().unwrap().linked_shops.is_empty());
        assert_eq!(new.as_location().unwrap().linked_shops, vec![shop]);
        assert_eq!(spicer.as_shop().unwrap().linked_location, Some(l2));
    }

    #[tokio::test]
    async fn test_set_single_relinks() {
        let store = MemoryStore::new();
        let links = LinkMaintainer::new(&store);
        let l1 = seed(&store, Entity::new_location("Harbor Ward")).await;
        let l2 = seed(&store, Entity::new_location("Temple Ward")).await;
        let shop = seed(&store, Entity::new_shop("Candlewright")).await;

        links
            .set_single(shop, Relation::LocationShop, Some(l1))
            .await
            .unwrap();
        links
            .set_single(shop, Relation::LocationShop, Some(l2))
            .await
            .unwrap();

        assert!(store
            .get(l1)
            .await
            .unwrap()
            .as_location()
            .unwrap()
            .linked_shops
            .is_empty());
        assert_eq!(
            store.get(l2).await.unwrap().as_location().unwrap().linked_shops,
            vec![shop]
        );
        assert_eq!(
            store.get(shop).await.unwrap().as_shop().unwrap().linked_location,
            Some(l2)
        );
    }

    #[tokio::test]
    async fn test_set_single_to_none_detaches() {
        let store = MemoryStore::new();
        let links = LinkMaintainer::new(&store);
        let region = seed(&store, Entity::new_region("Westmarch")).await;
        let location = seed(&store, Entity::new_location("Millbrook")).await;

        links.link(region, location, Relation::RegionLocation).await.unwrap();
        links
            .set_single(location, Relation::RegionLocation, None)
            .await
            .unwrap();

        assert!(store
            .get(region)
            .await
            .unwrap()
            .as_region()
            .unwrap()
            .linked_locations
            .is_empty());
        assert!(store
            .get(location)
            .await
            .unwrap()
            .as_location()
            .unwrap()
            .parent_region
            .is_none());
    }

    #[tokio::test]
    async fn test_self_link_is_noop() {
        let store = MemoryStore::new();
        let links = LinkMaintainer::new(&store);
        let npc = seed(&store, Entity::new_npc("Vex")).await;

        let report = links.link(npc, npc, Relation::Associates).await.unwrap();
        assert!(report.affected.is_empty());
        assert!(store
            .get(npc)
            .await
            .unwrap()
            .as_npc()
            .unwrap()
            .associates
            .is_empty());
    }

    #[tokio::test]
    async fn test_associates_symmetric() {
        let store = MemoryStore::new();
        let links = LinkMaintainer::new(&store);
        let a = seed(&store, Entity::new_npc("Asha")).await;
        let b = seed(&store, Entity::new_npc("Bren")).await;

        links.link(a, b, Relation::Associates).await.unwrap();
        assert_eq!(store.get(a).await.unwrap().as_npc().unwrap().associates, vec![b]);
        assert_eq!(store.get(b).await.unwrap().as_npc().unwrap().associates, vec![a]);

        links.unlink(b, a, Relation::Associates).await.unwrap();
        assert!(store.get(a).await.unwrap().as_npc().unwrap().associates.is_empty());
        assert!(store.get(b).await.unwrap().as_npc().unwrap().associates.is_empty());
    }

    #[tokio::test]
    async fn test_group_containment_cycle_rejected() {
        let store = MemoryStore::new();
        let links = LinkMaintainer::new(&store);
        let outer = seed(&store, Entity::new_group("The Circle")).await;
        let inner = seed(&store, Entity::new_group("Inner Circle")).await;

        links.link(outer, inner, Relation::GroupMember).await.unwrap();
        let err = links.link(inner, outer, Relation::GroupMember).await.unwrap_err();
        assert!(matches!(err, LinkError::CircularContainment { .. }));

        // The rejected mutation must not have proceeded.
        let inner_group = store.get(inner).await.unwrap();
        assert!(inner_group.as_group().unwrap().members.is_empty());
    }

    #[tokio::test]
    async fn test_group_may_hold_non_group_cycles() {
        let store = MemoryStore::new();
        let links = LinkMaintainer::new(&store);
        let group = seed(&store, Entity::new_group("Wardens")).await;
        let npc = seed(&store, Entity::new_npc("Captain Hale")).await;
        let location = seed(&store, Entity::new_location("Gatehouse")).await;

        links.link(group, npc, Relation::GroupMember).await.unwrap();
        links.link(group, location, Relation::GroupMember).await.unwrap();

        let wardens = store.get(group).await.unwrap();
        assert_eq!(wardens.as_group().unwrap().members, vec![npc, location]);
    }

    #[tokio::test]
    async fn test_wrong_kind_rejected() {
        let store = MemoryStore::new();
        let links = LinkMaintainer::new(&store);
        let shop = seed(&store, Entity::new_shop("Tannery")).await;
        let region = seed(&store, Entity::new_region("North Vale")).await;

        let err = links.link(shop, region, Relation::ShopNpc).await.unwrap_err();
        assert!(matches!(err, LinkError::WrongKind { .. }));
    }

    #[tokio::test]
    async fn test_cascade_delete_strips_everywhere() {
        let store = MemoryStore::new();
        let links = LinkMaintainer::new(&store);
        let region = seed(&store, Entity::new_region("Highfell")).await;
        let location = seed(&store, Entity::new_location("Crag's Rest")).await;
        let shop = seed(&store, Entity::new_shop("Outfitter")).await;
        let npc = seed(&store, Entity::new_npc("Sella")).await;
        let group = seed(&store, Entity::new_group("Guides")).await;

        links.link(region, location, Relation::RegionLocation).await.unwrap();
        links.link(location, npc, Relation::LocationNpc).await.unwrap();
        links.link(location, shop, Relation::LocationShop).await.unwrap();
        links.link(shop, npc, Relation::ShopNpc).await.unwrap();
        links.link(group, npc, Relation::GroupMember).await.unwrap();

        let report = links.cascade_delete(npc).await;
        assert!(report.is_clean());
        store.delete(npc).await.unwrap();

        for entity in store.all().await {
            for field in RelationField::fields_of(entity.kind()) {
                assert!(
                    !field.refs_in(&entity.data).contains(&npc),
                    "{} still referenced from {} {}",
                    npc,
                    entity.kind(),
                    field.name()
                );
            }
        }
    }

    #[tokio::test]
    async fn test_react_applies_inverse_only() {
        let store = MemoryStore::new();
        let links = LinkMaintainer::new(&store);
        let location = seed(&store, Entity::new_location("Riverside")).await;
        let npc = seed(&store, Entity::new_npc("Mara")).await;

        // Simulate a direct sheet edit: the owning side already changed.
        let mut edited = store.get(location).await.unwrap();
        let old = edited.data.clone();
        if let EntityData::Location(d) = &mut edited.data {
            d.linked_npcs.push(npc);
        }
        store.put(edited.clone()).await.unwrap();

        let report = links
            .react_to_field_change(location, &old, &edited.data)
            .await;
        assert_eq!(report.affected, vec![npc]);
        assert_eq!(
            store.get(npc).await.unwrap().as_npc().unwrap().linked_locations,
            vec![location]
        );
    }

    #[tokio::test]
    async fn test_react_handles_parent_region_move() {
        let store = MemoryStore::new();
        let links = LinkMaintainer::new(&store);
        let r1 = seed(&store, Entity::new_region("Eastvale")).await;
        let r2 = seed(&store, Entity::new_region("Westvale")).await;
        let location = seed(&store, Entity::new_location("Fenwick")).await;

        links.link(r1, location, Relation::RegionLocation).await.unwrap();

        // User drags Fenwick into Westvale on the region sheet.
        let mut edited = store.get(r2).await.unwrap();
        let old = edited.data.clone();
        if let EntityData::Region(d) = &mut edited.data {
            d.linked_locations.push(location);
        }
        store.put(edited.clone()).await.unwrap();

        links.react_to_field_change(r2, &old, &edited.data).await;

        assert_eq!(
            store
                .get(location)
                .await
                .unwrap()
                .as_location()
                .unwrap()
                .parent_region,
            Some(r2)
        );
        assert!(store
            .get(r1)
            .await
            .unwrap()
            .as_region()
            .unwrap()
            .linked_locations
            .is_empty());
    }

    #[tokio::test]
    async fn test_react_skips_dangling_added_ref() {
        let store = MemoryStore::new();
        let links = LinkMaintainer::new(&store);
        let location = seed(&store, Entity::new_location("Hollow")).await;
        let ghost = Ref::new();

        let old = store.get(location).await.unwrap().data;
        let mut new = old.clone();
        if let EntityData::Location(d) = &mut new {
            d.linked_npcs.push(ghost);
        }

        let report = links.react_to_field_change(location, &old, &new).await;
        assert!(report.affected.is_empty());
        assert!(report.is_clean());
    }
}
