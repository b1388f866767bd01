//! Nested view aggregation.
//!
//! Builds the deduplicated, role-annotated summary the presentation layer
//! renders: every region, location, shop, NPC, and priced inventory line
//! reachable from a root set, with index maps so the tree renders without
//! re-traversing. Read-only; dangling references are skipped, cycles and
//! diamond shapes are handled by the visited set.

use crate::entity::{EntityData, Ref};
use crate::store::Resolver;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};

/// How an NPC entered the view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NpcSource {
    /// Listed directly in the root set or a group.
    Direct,
    /// Reached through a location's linked NPCs.
    Location,
    /// Reached through a shop's staff.
    Shop,
}

/// An NPC with provenance: where it stands and how the traversal found it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NpcEntry {
    pub reference: Ref,
    pub name: String,
    pub source: NpcSource,
    /// Nearest enclosing location on the path that found this NPC.
    pub location: Option<Ref>,
    /// Set when the NPC was reached through a shop.
    pub via_shop: Option<Ref>,
}

/// One priced inventory line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricedItem {
    pub item: Ref,
    pub name: String,
    pub shop: Ref,
    pub quantity: u32,
    /// Custom price when set, otherwise base price times the shop markup,
    /// rounded.
    pub final_price: f64,
}

/// Aggregated traversal result: flat deduplicated lists per kind plus the
/// index maps a tree view renders from.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NestedView {
    pub regions: Vec<Ref>,
    pub locations: Vec<Ref>,
    pub shops: Vec<Ref>,
    pub groups: Vec<Ref>,
    pub npcs: Vec<NpcEntry>,
    pub items: Vec<PricedItem>,
    pub locations_by_region: HashMap<Ref, Vec<Ref>>,
    pub shops_by_location: HashMap<Ref, Vec<Ref>>,
    pub npcs_by_location: HashMap<Ref, Vec<Ref>>,
    pub total_inventory_value: f64,
}

impl NestedView {
    pub fn contains_npc(&self, reference: Ref) -> bool {
        self.npcs.iter().any(|n| n.reference == reference)
    }
}

/// Per-path context threaded through the traversal so NPCs carry correct
/// provenance.
#[derive(Debug, Clone, Copy, Default)]
struct PathContext {
    region: Option<Ref>,
    location: Option<Ref>,
    shop: Option<Ref>,
    npc_source: Option<NpcSource>,
}

/// Build the nested view for a root set. Never fails: unresolvable
/// references are skipped with a warning and the partial result returned.
pub async fn build_nested_view(resolver: Resolver<'_>, roots: &[Ref]) -> NestedView {
    let mut view = NestedView::default();
    let mut visited: HashSet<Ref> = HashSet::new();
    let mut queue: VecDeque<(Ref, PathContext)> = roots
        .iter()
        .map(|r| (*r, PathContext::default()))
        .collect();

    while let Some((reference, context)) = queue.pop_front() {
        // First path to a node wins; later paths are duplicates or cycles.
        if !visited.insert(reference) {
            continue;
        }

        let Some(entity) = resolver.resolve(reference).await else {
            log::warn!("skipping unresolvable reference {reference} during aggregation");
            continue;
        };

        match &entity.data {
            EntityData::Region(region) => {
                view.regions.push(reference);
                for location in &region.linked_locations {
                    queue.push_back((
                        *location,
                        PathContext {
                            region: Some(reference),
                            ..PathContext::default()
                        },
                    ));
                }
            }

            EntityData::Location(location) => {
                view.locations.push(reference);
                if let Some(region) = context.region {
                    view.locations_by_region.entry(region).or_default().push(reference);
                }
                let here = PathContext {
                    region: context.region,
                    location: Some(reference),
                    ..PathContext::default()
                };
                for shop in &location.linked_shops {
                    queue.push_back((*shop, here));
                }
                for npc in &location.linked_npcs {
                    queue.push_back((
                        *npc,
                        PathContext {
                            npc_source: Some(NpcSource::Location),
                            ..here
                        },
                    ));
                }
            }

            EntityData::Shop(shop) => {
                view.shops.push(reference);
                // A shop reached directly still gets its own location as
                // context so its staff read as "at L via S".
                let location = context.location.or(shop.linked_location);
                if let Some(location) = location {
                    view.shops_by_location.entry(location).or_default().push(reference);
                }
                for npc in &shop.linked_npcs {
                    queue.push_back((
                        *npc,
                        PathContext {
                            region: context.region,
                            location,
                            shop: Some(reference),
                            npc_source: Some(NpcSource::Shop),
                        },
                    ));
                }
                for entry in &shop.inventory {
                    price_entry(&resolver, &mut view, reference, shop.markup, entry).await;
                }
            }

            EntityData::Npc(_) => {
                let source = context.npc_source.unwrap_or(NpcSource::Direct);
                if let Some(location) = context.location {
                    view.npcs_by_location.entry(location).or_default().push(reference);
                }
                view.npcs.push(NpcEntry {
                    reference,
                    name: entity.name.clone(),
                    source,
                    location: context.location,
                    via_shop: context.shop,
                });
            }

            EntityData::Group(group) => {
                view.groups.push(reference);
                // Group members restart with an empty context: a group is
                // an organizational container, not a place.
                for member in &group.members {
                    queue.push_back((*member, PathContext::default()));
                }
            }
        }
    }

    view
}

async fn price_entry(
    resolver: &Resolver<'_>,
    view: &mut NestedView,
    shop: Ref,
    markup: f64,
    entry: &crate::entity::InventoryEntry,
) {
    let doc = resolver.resolve_external(entry.item).await;

    let final_price = match (entry.custom_price, doc.as_ref().and_then(|d| d.base_price)) {
        (Some(custom), _) => custom,
        (None, Some(base)) => (base * markup).round(),
        (None, None) => {
            log::warn!(
                "inventory item {} in shop {shop} has no resolvable base price, skipping",
                entry.item
            );
            return;
        }
    };

    let name = doc
        .map(|d| d.name)
        .unwrap_or_else(|| "Unknown Item".to_string());

    view.total_inventory_value += final_price * f64::from(entry.quantity);
    view.items.push(PricedItem {
        item: entry.item,
        name,
        shop,
        quantity: entry.quantity,
        final_price,
    });
}
