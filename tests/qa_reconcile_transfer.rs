//! QA tests for reconciliation and subgraph transfer.
//!
//! These tests verify the two-phase repair scan and the export → import
//! round trip, including reference remapping and archive persistence
//! through a temporary directory.

use campaign_core::{
    Archive, CampaignGraph, Entity, EntityStore, ExternalDoc, ExternalKind, ImportPolicy,
    InventoryEntry, MemoryStore, Ref, Relation, RelationField,
};
use tempfile::TempDir;

// =============================================================================
// TEST 1: Reconciliation repairs exactly the dangling reference
// =============================================================================

#[tokio::test]
async fn test_repair_counts_and_precision() {
    let graph = CampaignGraph::new(MemoryStore::new());
    let location = graph.create_location("Beacon Hill").await.unwrap().unwrap();
    let keeper = graph.create_npc("Keeper Ilse").await.unwrap().unwrap();
    graph
        .links()
        .link(location.id, keeper.id, Relation::LocationNpc)
        .await
        .unwrap();

    // Delete an NPC behind the maintainer's back, leaving a dangling ref.
    let ghost = graph.create_npc("Forgotten Soul").await.unwrap().unwrap();
    graph
        .links()
        .link(location.id, ghost.id, Relation::LocationNpc)
        .await
        .unwrap();
    graph.store().delete(ghost.id).await.unwrap();

    let report = graph.scan_and_repair_all().await;
    assert_eq!(report.broken_count(), 1, "exactly one broken link");
    assert_eq!(report.documents_fixed, 1, "exactly one document fixed");
    assert!(report.write_failures.is_empty());
    assert_eq!(report.broken[0].reference, ghost.id);
    assert_eq!(report.broken[0].field, RelationField::LocationLinkedNpcs);

    // The resolvable reference is untouched; a second scan is clean.
    let repaired = graph.store().get(location.id).await.unwrap();
    assert_eq!(
        repaired.as_location().unwrap().linked_npcs,
        vec![keeper.id]
    );
    let second = graph.scan_and_repair_all().await;
    assert_eq!(second.broken_count(), 0);
}

// =============================================================================
// TEST 2: Repair covers scalars and nested inventory references
// =============================================================================

#[tokio::test]
async fn test_repair_reaches_every_field_shape() {
    let store = MemoryStore::new();
    let lantern = ExternalDoc::new(ExternalKind::Item, "Lantern").with_base_price(5.0);
    let lantern_id = lantern.id;
    store.put_external(lantern).await.unwrap();

    let mut shop = Entity::new_shop("Chandlery");
    {
        let data = shop.as_shop_mut().unwrap();
        data.linked_location = Some(Ref::new()); // dangling scalar
        data.inventory.push(InventoryEntry::new(lantern_id, 6));
        data.inventory.push(InventoryEntry::new(Ref::new(), 2)); // dangling item
    }
    let shop_id = shop.id;
    store.put(shop).await.unwrap();

    let graph = CampaignGraph::new(store);
    let report = graph.scan_and_repair_all().await;
    assert_eq!(report.broken_count(), 2);
    assert_eq!(report.documents_fixed, 1);

    let repaired = graph.store().get(shop_id).await.unwrap();
    let data = repaired.as_shop().unwrap();
    assert!(data.linked_location.is_none());
    assert_eq!(data.inventory.len(), 1);
    assert_eq!(data.inventory[0].quantity, 6);
}

// =============================================================================
// TEST 3: Export → import round trip is structurally isomorphic
// =============================================================================

#[tokio::test]
async fn test_transfer_round_trip() {
    let source_store = MemoryStore::new();
    let item = ExternalDoc::new(ExternalKind::Item, "Waybread").with_base_price(1.0);
    let item_id = item.id;
    source_store.put_external(item).await.unwrap();

    let source = CampaignGraph::new(source_store);
    let region = source.create_region("Duskmoor").await.unwrap().unwrap();
    let location = source.create_location("Pike's Hollow").await.unwrap().unwrap();
    let shop = source.create_shop("Wayfarer's Rest").await.unwrap().unwrap();
    let npc = source.create_npc("Granny Vale").await.unwrap().unwrap();

    let links = source.links();
    links.link(region.id, location.id, Relation::RegionLocation).await.unwrap();
    links.link(location.id, shop.id, Relation::LocationShop).await.unwrap();
    links.link(shop.id, npc.id, Relation::ShopNpc).await.unwrap();

    let mut edited = source.store().get(shop.id).await.unwrap();
    edited
        .as_shop_mut()
        .unwrap()
        .inventory
        .push(InventoryEntry::new(item_id, 2));
    source.store().put(edited).await.unwrap();

    // Export through an archive file, as a real transfer would.
    let dir = TempDir::new().expect("temp dir");
    let path = dir.path().join("duskmoor.json");
    let archive = source.export(&[region.id], "Duskmoor").await.unwrap();
    archive.save_json(&path).await.unwrap();

    let loaded = Archive::load_json(&path).await.unwrap();
    let dest = CampaignGraph::new(MemoryStore::new());
    let report = dest
        .import(&loaded, ImportPolicy::AlwaysDuplicate)
        .await
        .unwrap();
    assert!(report.is_clean());

    // Same shapes, new identities.
    let new_region = report.remapped[&region.id];
    let new_location = report.remapped[&location.id];
    let new_shop = report.remapped[&shop.id];
    let new_npc = report.remapped[&npc.id];
    let new_item = report.remapped[&item_id];

    let r = dest.store().get(new_region).await.unwrap();
    assert_eq!(r.as_region().unwrap().linked_locations, vec![new_location]);

    let l = dest.store().get(new_location).await.unwrap();
    assert_eq!(l.as_location().unwrap().parent_region, Some(new_region));
    assert_eq!(l.as_location().unwrap().linked_shops, vec![new_shop]);

    let s = dest.store().get(new_shop).await.unwrap();
    let shop_data = s.as_shop().unwrap();
    assert_eq!(shop_data.linked_location, Some(new_location));
    assert_eq!(shop_data.linked_npcs, vec![new_npc]);
    assert_eq!(shop_data.inventory.len(), 1);
    assert_eq!(shop_data.inventory[0].item, new_item);
    assert_eq!(shop_data.inventory[0].quantity, 2);

    let n = dest.store().get(new_npc).await.unwrap();
    assert_eq!(n.as_npc().unwrap().linked_shops, vec![new_shop]);

    // No reference in the destination points at a pre-export identity.
    let stale = [region.id, location.id, shop.id, npc.id, item_id];
    for entity in dest.store().all().await {
        for field in RelationField::fields_of(entity.kind()) {
            for reference in field.refs_in(&entity.data) {
                assert!(
                    !stale.contains(&reference),
                    "stale pre-export reference {reference} in {}",
                    entity.name
                );
            }
        }
    }
}

// =============================================================================
// TEST 4: A reconciled destination stays consistent after import
// =============================================================================

#[tokio::test]
async fn test_imported_graph_passes_reconciliation() {
    let source = CampaignGraph::new(MemoryStore::new());
    let location = source.create_location("Quay").await.unwrap().unwrap();
    let npc = source.create_npc("Harbormaster").await.unwrap().unwrap();
    source
        .links()
        .link(location.id, npc.id, Relation::LocationNpc)
        .await
        .unwrap();

    let archive = source.export(&[location.id], "Quay").await.unwrap();
    let dest = CampaignGraph::new(MemoryStore::new());
    dest.import(&archive, ImportPolicy::AlwaysDuplicate)
        .await
        .unwrap();

    let report = dest.scan_and_repair_all().await;
    assert_eq!(
        report.broken_count(),
        0,
        "import must not manufacture dangling references"
    );
}
