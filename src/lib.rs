//! Relationship graph engine for a tabletop campaign organizer.
//!
//! This crate provides:
//! - A typed data model for campaign entities (regions, locations, shops,
//!   NPCs, groups) and their cross-reference fields
//! - Bidirectional link maintenance: every mutation keeps both sides of a
//!   relationship pair consistent, including cascade cleanup on delete
//! - Deduplicated graph aggregation for nested summary views
//! - A full-store reconciliation scanner that repairs broken links
//! - Subgraph export/import with reference remapping
//!
//! # Quick Start
//!
//! ```ignore
//! use campaign_core::{CampaignGraph, MemoryStore, Relation};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let graph = CampaignGraph::new(MemoryStore::new());
//!
//!     let town = graph.create_location("Bywater").await?.unwrap();
//!     let smith = graph.create_npc("Hendra").await?.unwrap();
//!     graph.link_exclusive(town.id, smith.id, Relation::LocationNpc).await?;
//!
//!     let view = graph.build_nested_view(&[town.id]).await;
//!     println!("{} NPCs in view", view.npcs.len());
//!     Ok(())
//! }
//! ```
//!
//! The host document system stays behind the [`EntityStore`] trait;
//! [`MemoryStore`] is the in-crate reference implementation.

pub mod aggregate;
pub mod entity;
pub mod guard;
pub mod hooks;
pub mod links;
pub mod reconcile;
pub mod relation;
pub mod store;
pub mod transfer;

// Primary public API
pub use aggregate::{build_nested_view, NestedView, NpcEntry, NpcSource, PricedItem};
pub use entity::{
    diff_relationships, Entity, EntityData, EntityKind, FieldChange, InventoryEntry, Ref,
    RelationField,
};
pub use guard::{actor_creation_key, creation_key, OpGuards};
pub use hooks::{CampaignGraph, GraphError};
pub use links::{BatchFailure, BatchReport, LinkError, LinkMaintainer};
pub use reconcile::{scan_and_repair_all, BrokenLink, RepairReport};
pub use relation::Relation;
pub use store::{EntityStore, ExternalDoc, ExternalKind, MemoryStore, Resolver, StoreError};
pub use transfer::{
    discover, export, import, Archive, ArchiveSummary, Discovery, ImportPolicy, ImportReport,
    TransferError,
};
