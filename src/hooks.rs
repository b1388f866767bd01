//! CampaignGraph - the primary public API for host integrations.
//!
//! Wraps the store handle, the guard registry, and the subsystem entry
//! points behind one object. The host-integration layer calls the factory
//! operations and the three lifecycle callbacks from its own document
//! hooks; the core never registers hooks or renders UI itself. Every
//! mutating call returns the affected references so the presentation layer
//! can decide what to refresh.

use crate::aggregate::{build_nested_view, NestedView};
use crate::entity::{Entity, EntityData, EntityKind, Ref};
use crate::guard::{actor_creation_key, creation_key, OpGuards};
use crate::links::{BatchReport, LinkError, LinkMaintainer};
use crate::reconcile::{scan_and_repair_all, RepairReport};
use crate::relation::Relation;
use crate::store::{EntityStore, Resolver, StoreError};
use crate::transfer::{export, import, Archive, ImportPolicy, ImportReport, TransferError};
use thiserror::Error;

/// Errors from facade operations.
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("reference {0} does not resolve")]
    Dangling(Ref),

    #[error(transparent)]
    Link(#[from] LinkError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Transfer(#[from] TransferError),
}

/// The campaign relationship graph over a host entity store.
pub struct CampaignGraph<S: EntityStore> {
    store: S,
    guards: OpGuards,
}

impl<S: EntityStore> CampaignGraph<S> {
    pub fn new(store: S) -> Self {
        Self::with_guards(store, OpGuards::new())
    }

    /// Build over a caller-supplied guard registry, for hosts that scope
    /// guard state themselves.
    pub fn with_guards(store: S, guards: OpGuards) -> Self {
        Self { store, guards }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// The guard registry behind this facade's de-duplication and
    /// exclusivity checks.
    pub fn guards(&self) -> &OpGuards {
        &self.guards
    }

    pub fn resolver(&self) -> Resolver<'_> {
        Resolver::new(&self.store)
    }

    /// Link maintainer sharing this facade's guard state.
    pub fn links(&self) -> LinkMaintainer<'_, S> {
        LinkMaintainer::with_guards(&self.store, self.guards.clone())
    }

    // ========================================================================
    // Factories
    // ========================================================================

    /// Create and persist a new entity of `kind`. Returns `None` when an
    /// identical creation is already in flight (the duplicate call is
    /// suppressed, not an error).
    pub async fn create(
        &self,
        kind: EntityKind,
        name: &str,
    ) -> Result<Option<Entity>, GraphError> {
        let Some(_guard) = self.guards.begin_creation(creation_key(kind, name)) else {
            log::debug!("creation of {kind} '{name}' already in flight");
            return Ok(None);
        };

        let entity = match kind {
            EntityKind::Region => Entity::new_region(name),
            EntityKind::Location => Entity::new_location(name),
            EntityKind::Shop => Entity::new_shop(name),
            EntityKind::Npc => Entity::new_npc(name),
            EntityKind::Group => Entity::new_group(name),
        };
        self.store.put(entity.clone()).await?;
        Ok(Some(entity))
    }

    pub async fn create_region(&self, name: &str) -> Result<Option<Entity>, GraphError> {
        self.create(EntityKind::Region, name).await
    }

    pub async fn create_location(&self, name: &str) -> Result<Option<Entity>, GraphError> {
        self.create(EntityKind::Location, name).await
    }

    pub async fn create_shop(&self, name: &str) -> Result<Option<Entity>, GraphError> {
        self.create(EntityKind::Shop, name).await
    }

    pub async fn create_npc(&self, name: &str) -> Result<Option<Entity>, GraphError> {
        self.create(EntityKind::Npc, name).await
    }

    pub async fn create_group(&self, name: &str) -> Result<Option<Entity>, GraphError> {
        self.create(EntityKind::Group, name).await
    }

    /// Create an NPC mirroring an external actor, named after it. Finds an
    /// already-mirroring NPC first, and suppresses a concurrent duplicate
    /// creation for the same actor.
    pub async fn create_npc_from_actor(&self, actor: Ref) -> Result<Option<Entity>, GraphError> {
        let Some(_guard) = self.guards.begin_creation(actor_creation_key(actor)) else {
            log::debug!("NPC creation for actor {actor} already in flight");
            return Ok(None);
        };

        for entity in self.store.all().await {
            if let Some(npc) = entity.as_npc() {
                if npc.linked_actor == Some(actor) {
                    return Ok(Some(entity));
                }
            }
        }

        let doc = self
            .store
            .get_external(actor)
            .await
            .ok_or(GraphError::Dangling(actor))?;

        let mut entity = Entity::new_npc(doc.name);
        if let Some(npc) = entity.as_npc_mut() {
            npc.linked_actor = Some(actor);
        }
        self.store.put(entity.clone()).await?;
        Ok(Some(entity))
    }

    // ========================================================================
    // Sheet-Driven Mutations
    // ========================================================================

    /// One drag-and-drop link with owner-level exclusivity: while a
    /// mutation on `owner` is still settling, an overlapping call returns
    /// `None` instead of starting a second one.
    pub async fn link_exclusive(
        &self,
        owner: Ref,
        other: Ref,
        relation: Relation,
    ) -> Result<Option<BatchReport>, GraphError> {
        let Some(_busy) = self.guards.begin_mutation(owner) else {
            log::debug!("mutation on {owner} already in progress, dropping overlap");
            return Ok(None);
        };
        let report = self.links().link(owner, other, relation).await?;
        Ok(Some(report))
    }

    /// Drag-and-drop unlink with the same owner-level exclusivity.
    pub async fn unlink_exclusive(
        &self,
        owner: Ref,
        other: Ref,
        relation: Relation,
    ) -> Result<Option<BatchReport>, GraphError> {
        let Some(_busy) = self.guards.begin_mutation(owner) else {
            log::debug!("mutation on {owner} already in progress, dropping overlap");
            return Ok(None);
        };
        let report = self.links().unlink(owner, other, relation).await?;
        Ok(Some(report))
    }

    // ========================================================================
    // Lifecycle Callbacks
    // ========================================================================

    /// The host created an entity document.
    pub async fn on_entity_created(&self, entity: Entity) -> Result<(), GraphError> {
        self.store.put(entity).await?;
        Ok(())
    }

    /// The host is about to delete an entity: strip every reference to it
    /// while it still resolves.
    pub async fn on_entity_will_be_deleted(&self, reference: Ref) -> BatchReport {
        self.links().cascade_delete(reference).await
    }

    /// The host observed a direct edit to an entity's fields: apply the
    /// inverse-side consequences of the relationship diff.
    pub async fn on_entity_fields_changed(
        &self,
        reference: Ref,
        old: &EntityData,
        new: &EntityData,
    ) -> BatchReport {
        self.links()
            .react_to_field_change(reference, old, new)
            .await
    }

    // ========================================================================
    // Bulk Operations
    // ========================================================================

    /// Build the aggregated nested view under a root set.
    pub async fn build_nested_view(&self, roots: &[Ref]) -> NestedView {
        build_nested_view(self.resolver(), roots).await
    }

    /// Run a full integrity scan and repair every broken link found.
    pub async fn scan_and_repair_all(&self) -> RepairReport {
        scan_and_repair_all(&self.store).await
    }

    /// Export the subgraph under `roots` into an archive.
    pub async fn export(
        &self,
        roots: &[Ref],
        label: impl Into<String>,
    ) -> Result<Archive, GraphError> {
        Ok(export(&self.store, roots, label).await?)
    }

    /// Import an archive under the given conflict policy.
    pub async fn import(
        &self,
        archive: &Archive,
        policy: ImportPolicy,
    ) -> Result<ImportReport, GraphError> {
        Ok(import(archive, &self.store, policy).await?)
    }
}
