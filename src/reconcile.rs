//! From-scratch integrity reconciliation.
//!
//! The incremental link paths keep pairs consistent when they see every
//! mutation, but a host can delete documents behind the core's back. The
//! scanner walks every entity, validates every reference (including nested
//! inventory refs and external singles), and strips what no longer
//! resolves — read phase fully separated from write phase, so nothing
//! mutates while still being scanned.

use crate::entity::{Entity, Ref, RelationField};
use crate::links::{persist_all, BatchFailure};
use crate::store::EntityStore;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One reference that failed to resolve during a scan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrokenLink {
    /// Entity holding the bad reference.
    pub entity: Ref,
    pub field: RelationField,
    /// The reference that does not resolve.
    pub reference: Ref,
    /// Position within the field when it is array-valued.
    pub array_index: Option<usize>,
}

/// Aggregate outcome of a full reconciliation pass. Never an error: partial
/// write failures are collected, not thrown.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RepairReport {
    pub entities_scanned: usize,
    pub references_checked: usize,
    pub broken: Vec<BrokenLink>,
    pub documents_fixed: usize,
    pub write_failures: Vec<BatchFailure>,
}

impl RepairReport {
    pub fn broken_count(&self) -> usize {
        self.broken.len()
    }
}

/// Walk every entity, find every dangling reference, and repair them in one
/// batch of per-entity patches.
pub async fn scan_and_repair_all<S: EntityStore + ?Sized>(store: &S) -> RepairReport {
    let mut report = RepairReport::default();

    // Phase 1: read-only sweep.
    let everyone = store.all().await;
    report.entities_scanned = everyone.len();

    let mut entity_cache: HashMap<Ref, bool> = HashMap::new();
    let mut external_cache: HashMap<Ref, bool> = HashMap::new();

    for entity in &everyone {
        for field in RelationField::fields_of(entity.kind()) {
            for (index, reference) in field.refs_in(&entity.data).into_iter().enumerate() {
                report.references_checked += 1;

                let resolvable = if field.is_external() {
                    match external_cache.get(&reference) {
                        Some(known) => *known,
                        None => {
                            let ok = store.get_external(reference).await.is_some();
                            external_cache.insert(reference, ok);
                            ok
                        }
                    }
                } else {
                    match entity_cache.get(&reference) {
                        Some(known) => *known,
                        None => {
                            let ok = store.get(reference).await.is_some();
                            entity_cache.insert(reference, ok);
                            ok
                        }
                    }
                };

                if !resolvable {
                    log::debug!(
                        "broken link: {} {} holds dangling {reference}",
                        entity.id,
                        field.name()
                    );
                    report.broken.push(BrokenLink {
                        entity: entity.id,
                        field: *field,
                        reference,
                        array_index: field.is_array().then_some(index),
                    });
                }
            }
        }
    }

    if report.broken.is_empty() {
        log::debug!(
            "reconciliation clean: {} entities, {} references",
            report.entities_scanned,
            report.references_checked
        );
        return report;
    }

    // Phase 2: one patch per owning entity.
    let mut by_entity: HashMap<Ref, Vec<&BrokenLink>> = HashMap::new();
    for broken in &report.broken {
        by_entity.entry(broken.entity).or_default().push(broken);
    }

    let mut patched: Vec<Entity> = Vec::with_capacity(by_entity.len());
    for entity in everyone {
        let Some(broken_here) = by_entity.get(&entity.id) else {
            continue;
        };
        let mut entity = entity;
        for broken in broken_here {
            broken.field.strip(&mut entity.data, broken.reference);
        }
        patched.push(entity);
    }

    let outcome = persist_all(store, patched).await;
    report.documents_fixed = outcome.affected.len() - outcome.failures.len();
    report.write_failures = outcome.failures;

    log::debug!(
        "reconciliation repaired {} links across {} documents ({} write failures)",
        report.broken.len(),
        report.documents_fixed,
        report.write_failures.len()
    );
    report
}
