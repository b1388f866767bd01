//! Campaign entity types.
//!
//! Contains the five entity kinds (regions, locations, shops, NPCs, groups),
//! their relationship fields, and the field-level addressing used by the
//! link maintainer and the reconciliation scanner.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ============================================================================
// References
// ============================================================================

/// Opaque reference to an entity or an external leaf document (actor, item,
/// scene). Unique and immutable once created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Ref(Uuid);

impl Ref {
    /// Mint a fresh reference.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse a reference from its string form.
    pub fn parse(s: &str) -> Option<Self> {
        Uuid::parse_str(s).ok().map(Self)
    }
}

impl Default for Ref {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for Ref {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Entity Kinds
// ============================================================================

/// The closed set of entity kinds in the campaign graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    Region,
    Location,
    Shop,
    Npc,
    Group,
}

impl EntityKind {
    /// Display name for this kind.
    pub fn name(&self) -> &'static str {
        match self {
            EntityKind::Region => "Region",
            EntityKind::Location => "Location",
            EntityKind::Shop => "Shop",
            EntityKind::Npc => "NPC",
            EntityKind::Group => "Group",
        }
    }

    pub fn all() -> [EntityKind; 5] {
        [
            EntityKind::Region,
            EntityKind::Location,
            EntityKind::Shop,
            EntityKind::Npc,
            EntityKind::Group,
        ]
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

// ============================================================================
// Per-Kind Data
// ============================================================================

/// A shop inventory line: an external item reference with quantity and an
/// optional price override.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryEntry {
    pub item: Ref,
    pub quantity: u32,
    /// Overrides the markup-derived price when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_price: Option<f64>,
}

impl InventoryEntry {
    pub fn new(item: Ref, quantity: u32) -> Self {
        Self {
            item,
            quantity,
            custom_price: None,
        }
    }

    pub fn with_custom_price(mut self, price: f64) -> Self {
        self.custom_price = Some(price);
        self
    }
}

/// Region data: a container of locations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegionData {
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub linked_locations: Vec<Ref>,
}

/// Location data: sits inside at most one region, holds NPCs and shops,
/// and may point at an external scene.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationData {
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub parent_region: Option<Ref>,
    #[serde(default)]
    pub linked_npcs: Vec<Ref>,
    #[serde(default)]
    pub linked_shops: Vec<Ref>,
    #[serde(default)]
    pub linked_scene: Option<Ref>,
}

/// Shop data: belongs to at most one location, staffed by NPCs, and
/// carries a priced inventory of external items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShopData {
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub notes: String,
    /// Multiplier applied to an item's base price when no custom price is
    /// set on the inventory line.
    #[serde(default = "default_markup")]
    pub markup: f64,
    #[serde(default)]
    pub linked_location: Option<Ref>,
    #[serde(default)]
    pub linked_npcs: Vec<Ref>,
    #[serde(default)]
    pub inventory: Vec<InventoryEntry>,
}

fn default_markup() -> f64 {
    1.0
}

impl Default for ShopData {
    fn default() -> Self {
        Self {
            description: String::new(),
            notes: String::new(),
            markup: default_markup(),
            linked_location: None,
            linked_npcs: Vec::new(),
            inventory: Vec::new(),
        }
    }
}

/// NPC data: may stand in several locations and shops, mirror an external
/// actor, and keep mutual associates.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NpcData {
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub linked_actor: Option<Ref>,
    #[serde(default)]
    pub linked_locations: Vec<Ref>,
    #[serde(default)]
    pub linked_shops: Vec<Ref>,
    #[serde(default)]
    pub associates: Vec<Ref>,
}

/// Group data: a pure container whose members may be any entity kind,
/// including other groups.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupData {
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub members: Vec<Ref>,
}

/// The typed `{type, data}` metadata blob. This enum *is* the wire format:
/// serde's adjacent tagging produces exactly the persisted layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum EntityData {
    Region(RegionData),
    Location(LocationData),
    Shop(ShopData),
    Npc(NpcData),
    Group(GroupData),
}

impl EntityData {
    pub fn kind(&self) -> EntityKind {
        match self {
            EntityData::Region(_) => EntityKind::Region,
            EntityData::Location(_) => EntityKind::Location,
            EntityData::Shop(_) => EntityKind::Shop,
            EntityData::Npc(_) => EntityKind::Npc,
            EntityData::Group(_) => EntityKind::Group,
        }
    }

    pub fn description(&self) -> &str {
        match self {
            EntityData::Region(d) => &d.description,
            EntityData::Location(d) => &d.description,
            EntityData::Shop(d) => &d.description,
            EntityData::Npc(d) => &d.description,
            EntityData::Group(d) => &d.description,
        }
    }

    pub fn notes(&self) -> &str {
        match self {
            EntityData::Region(d) => &d.notes,
            EntityData::Location(d) => &d.notes,
            EntityData::Shop(d) => &d.notes,
            EntityData::Npc(d) => &d.notes,
            EntityData::Group(d) => &d.notes,
        }
    }

    fn text_fields_mut(&mut self) -> [&mut String; 2] {
        match self {
            EntityData::Region(d) => [&mut d.description, &mut d.notes],
            EntityData::Location(d) => [&mut d.description, &mut d.notes],
            EntityData::Shop(d) => [&mut d.description, &mut d.notes],
            EntityData::Npc(d) => [&mut d.description, &mut d.notes],
            EntityData::Group(d) => [&mut d.description, &mut d.notes],
        }
    }
}

// ============================================================================
// Entities
// ============================================================================

/// A node in the campaign graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub id: Ref,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// Hierarchical grouping label in the host, preserved across transfer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folder: Option<String>,
    #[serde(flatten)]
    pub data: EntityData,
}

impl Entity {
    fn new(name: impl Into<String>, data: EntityData) -> Self {
        Self {
            id: Ref::new(),
            name: name.into(),
            image: None,
            folder: None,
            data,
        }
    }

    /// Create a region with empty relationship fields.
    pub fn new_region(name: impl Into<String>) -> Self {
        Self::new(name, EntityData::Region(RegionData::default()))
    }

    /// Create a location with empty relationship fields.
    pub fn new_location(name: impl Into<String>) -> Self {
        Self::new(name, EntityData::Location(LocationData::default()))
    }

    /// Create a shop with empty relationship fields and markup 1.0.
    pub fn new_shop(name: impl Into<String>) -> Self {
        Self::new(name, EntityData::Shop(ShopData::default()))
    }

    /// Create an NPC with empty relationship fields.
    pub fn new_npc(name: impl Into<String>) -> Self {
        Self::new(name, EntityData::Npc(NpcData::default()))
    }

    /// Create a group with no members.
    pub fn new_group(name: impl Into<String>) -> Self {
        Self::new(name, EntityData::Group(GroupData::default()))
    }

    pub fn kind(&self) -> EntityKind {
        self.data.kind()
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        let [slot, _] = self.data.text_fields_mut();
        *slot = description.into();
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        let [_, slot] = self.data.text_fields_mut();
        *slot = notes.into();
        self
    }

    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = Some(image.into());
        self
    }

    pub fn with_folder(mut self, folder: impl Into<String>) -> Self {
        self.folder = Some(folder.into());
        self
    }

    pub fn as_region(&self) -> Option<&RegionData> {
        match &self.data {
            EntityData::Region(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_location(&self) -> Option<&LocationData> {
        match &self.data {
            EntityData::Location(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_shop(&self) -> Option<&ShopData> {
        match &self.data {
            EntityData::Shop(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_npc(&self) -> Option<&NpcData> {
        match &self.data {
            EntityData::Npc(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_group(&self) -> Option<&GroupData> {
        match &self.data {
            EntityData::Group(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_shop_mut(&mut self) -> Option<&mut ShopData> {
        match &mut self.data {
            EntityData::Shop(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_npc_mut(&mut self) -> Option<&mut NpcData> {
        match &mut self.data {
            EntityData::Npc(d) => Some(d),
            _ => None,
        }
    }

    /// Rewrite every occurrence of `old` with `new` in this entity's free
    /// text (inline cross-reference markup).
    pub fn rewrite_text_refs(&mut self, old: Ref, new: Ref) {
        let from = old.to_string();
        let to = new.to_string();
        for text in self.data.text_fields_mut() {
            if text.contains(&from) {
                *text = text.replace(&from, &to);
            }
        }
    }
}

// ============================================================================
// Field Addressing
// ============================================================================

/// Every relationship field in the data model, addressable for scanning,
/// stripping, and diffing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RelationField {
    RegionLinkedLocations,
    LocationParentRegion,
    LocationLinkedNpcs,
    LocationLinkedShops,
    LocationLinkedScene,
    ShopLinkedLocation,
    ShopLinkedNpcs,
    ShopInventory,
    NpcLinkedActor,
    NpcLinkedLocations,
    NpcLinkedShops,
    NpcAssociates,
    GroupMembers,
}

impl RelationField {
    /// The relationship fields carried by entities of `kind`.
    pub fn fields_of(kind: EntityKind) -> &'static [RelationField] {
        use RelationField::*;
        match kind {
            EntityKind::Region => &[RegionLinkedLocations],
            EntityKind::Location => &[
                LocationParentRegion,
                LocationLinkedNpcs,
                LocationLinkedShops,
                LocationLinkedScene,
            ],
            EntityKind::Shop => &[ShopLinkedLocation, ShopLinkedNpcs, ShopInventory],
            EntityKind::Npc => &[NpcLinkedActor, NpcLinkedLocations, NpcLinkedShops, NpcAssociates],
            EntityKind::Group => &[GroupMembers],
        }
    }

    /// Wire name of the field, for logs and reports.
    pub fn name(&self) -> &'static str {
        use RelationField::*;
        match self {
            RegionLinkedLocations => "linkedLocations",
            LocationParentRegion => "parentRegion",
            LocationLinkedNpcs => "linkedNpcs",
            LocationLinkedShops => "linkedShops",
            LocationLinkedScene => "linkedScene",
            ShopLinkedLocation => "linkedLocation",
            ShopLinkedNpcs => "linkedNpcs",
            ShopInventory => "inventory",
            NpcLinkedActor => "linkedActor",
            NpcLinkedLocations => "linkedLocations",
            NpcLinkedShops => "linkedShops",
            NpcAssociates => "associates",
            GroupMembers => "members",
        }
    }

    /// The entity kind that carries this field.
    pub fn kind(&self) -> EntityKind {
        use RelationField::*;
        match self {
            RegionLinkedLocations => EntityKind::Region,
            LocationParentRegion | LocationLinkedNpcs | LocationLinkedShops
            | LocationLinkedScene => EntityKind::Location,
            ShopLinkedLocation | ShopLinkedNpcs | ShopInventory => EntityKind::Shop,
            NpcLinkedActor | NpcLinkedLocations | NpcLinkedShops | NpcAssociates => EntityKind::Npc,
            GroupMembers => EntityKind::Group,
        }
    }

    /// Whether this field points at external leaf documents (actors,
    /// items, scenes) rather than entities.
    pub fn is_external(&self) -> bool {
        use RelationField::*;
        matches!(self, LocationLinkedScene | ShopInventory | NpcLinkedActor)
    }

    /// Whether this field holds a list of references.
    pub fn is_array(&self) -> bool {
        use RelationField::*;
        !matches!(
            self,
            LocationParentRegion | LocationLinkedScene | ShopLinkedLocation | NpcLinkedActor
        )
    }

    /// Every reference currently held in this field of `data`, in field
    /// order. Empty when the field does not belong to the entity's kind.
    pub fn refs_in(&self, data: &EntityData) -> Vec<Ref> {
        use RelationField::*;
        match (self, data) {
            (RegionLinkedLocations, EntityData::Region(d)) => d.linked_locations.clone(),
            (LocationParentRegion, EntityData::Location(d)) => d.parent_region.into_iter().collect(),
            (LocationLinkedNpcs, EntityData::Location(d)) => d.linked_npcs.clone(),
            (LocationLinkedShops, EntityData::Location(d)) => d.linked_shops.clone(),
            (LocationLinkedScene, EntityData::Location(d)) => d.linked_scene.into_iter().collect(),
            (ShopLinkedLocation, EntityData::Shop(d)) => d.linked_location.into_iter().collect(),
            (ShopLinkedNpcs, EntityData::Shop(d)) => d.linked_npcs.clone(),
            (ShopInventory, EntityData::Shop(d)) => d.inventory.iter().map(|e| e.item).collect(),
            (NpcLinkedActor, EntityData::Npc(d)) => d.linked_actor.into_iter().collect(),
            (NpcLinkedLocations, EntityData::Npc(d)) => d.linked_locations.clone(),
            (NpcLinkedShops, EntityData::Npc(d)) => d.linked_shops.clone(),
            (NpcAssociates, EntityData::Npc(d)) => d.associates.clone(),
            (GroupMembers, EntityData::Group(d)) => d.members.clone(),
            _ => Vec::new(),
        }
    }

    /// Remove every occurrence of `target` from this field. Returns true
    /// if anything changed.
    pub fn strip(&self, data: &mut EntityData, target: Ref) -> bool {
        use RelationField::*;
        match (self, data) {
            (RegionLinkedLocations, EntityData::Region(d)) => {
                remove_ref(&mut d.linked_locations, target)
            }
            (LocationParentRegion, EntityData::Location(d)) => {
                clear_if(&mut d.parent_region, target)
            }
            (LocationLinkedNpcs, EntityData::Location(d)) => remove_ref(&mut d.linked_npcs, target),
            (LocationLinkedShops, EntityData::Location(d)) => {
                remove_ref(&mut d.linked_shops, target)
            }
            (LocationLinkedScene, EntityData::Location(d)) => {
                clear_if(&mut d.linked_scene, target)
            }
            (ShopLinkedLocation, EntityData::Shop(d)) => clear_if(&mut d.linked_location, target),
            (ShopLinkedNpcs, EntityData::Shop(d)) => remove_ref(&mut d.linked_npcs, target),
            (ShopInventory, EntityData::Shop(d)) => {
                let before = d.inventory.len();
                d.inventory.retain(|e| e.item != target);
                d.inventory.len() != before
            }
            (NpcLinkedActor, EntityData::Npc(d)) => clear_if(&mut d.linked_actor, target),
            (NpcLinkedLocations, EntityData::Npc(d)) => remove_ref(&mut d.linked_locations, target),
            (NpcLinkedShops, EntityData::Npc(d)) => remove_ref(&mut d.linked_shops, target),
            (NpcAssociates, EntityData::Npc(d)) => remove_ref(&mut d.associates, target),
            (GroupMembers, EntityData::Group(d)) => remove_ref(&mut d.members, target),
            _ => false,
        }
    }

    /// Mutable access to the underlying list for array fields other than
    /// inventory (inventory lines carry more than a reference).
    pub fn multi_mut<'a>(&self, data: &'a mut EntityData) -> Option<&'a mut Vec<Ref>> {
        use RelationField::*;
        match (self, data) {
            (RegionLinkedLocations, EntityData::Region(d)) => Some(&mut d.linked_locations),
            (LocationLinkedNpcs, EntityData::Location(d)) => Some(&mut d.linked_npcs),
            (LocationLinkedShops, EntityData::Location(d)) => Some(&mut d.linked_shops),
            (ShopLinkedNpcs, EntityData::Shop(d)) => Some(&mut d.linked_npcs),
            (NpcLinkedLocations, EntityData::Npc(d)) => Some(&mut d.linked_locations),
            (NpcLinkedShops, EntityData::Npc(d)) => Some(&mut d.linked_shops),
            (NpcAssociates, EntityData::Npc(d)) => Some(&mut d.associates),
            (GroupMembers, EntityData::Group(d)) => Some(&mut d.members),
            _ => None,
        }
    }

    /// Mutable access to the pointer for single-valued fields.
    pub fn single_mut<'a>(&self, data: &'a mut EntityData) -> Option<&'a mut Option<Ref>> {
        use RelationField::*;
        match (self, data) {
            (LocationParentRegion, EntityData::Location(d)) => Some(&mut d.parent_region),
            (LocationLinkedScene, EntityData::Location(d)) => Some(&mut d.linked_scene),
            (ShopLinkedLocation, EntityData::Shop(d)) => Some(&mut d.linked_location),
            (NpcLinkedActor, EntityData::Npc(d)) => Some(&mut d.linked_actor),
            _ => None,
        }
    }
}

/// Remove `target` from `list`, returning true if it was present.
fn remove_ref(list: &mut Vec<Ref>, target: Ref) -> bool {
    let before = list.len();
    list.retain(|r| *r != target);
    list.len() != before
}

/// Null the pointer if it equals `target`.
fn clear_if(slot: &mut Option<Ref>, target: Ref) -> bool {
    if *slot == Some(target) {
        *slot = None;
        true
    } else {
        false
    }
}

/// Append `target` to `list` unless already present. Returns true if added.
pub(crate) fn add_unique(list: &mut Vec<Ref>, target: Ref) -> bool {
    if list.contains(&target) {
        false
    } else {
        list.push(target);
        true
    }
}

// ============================================================================
// Relationship Diffing
// ============================================================================

/// Added/removed references for one relationship field.
#[derive(Debug, Clone)]
pub struct FieldChange {
    pub field: RelationField,
    pub added: Vec<Ref>,
    pub removed: Vec<Ref>,
}

/// Compute the per-field relationship diff between two snapshots of the
/// same entity. Kind changes are not diffable and yield an empty result.
pub fn diff_relationships(old: &EntityData, new: &EntityData) -> Vec<FieldChange> {
    if old.kind() != new.kind() {
        return Vec::new();
    }

    let mut changes = Vec::new();
    for field in RelationField::fields_of(new.kind()) {
        let before = field.refs_in(old);
        let after = field.refs_in(new);

        let added: Vec<Ref> = after.iter().copied().filter(|r| !before.contains(r)).collect();
        let removed: Vec<Ref> = before.iter().copied().filter(|r| !after.contains(r)).collect();

        if !added.is_empty() || !removed.is_empty() {
            changes.push(FieldChange {
                field: *field,
                added,
                removed,
            });
        }
    }
    changes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_factories_start_unlinked() {
        let shop = Entity::new_shop("The Gilded Flagon");
        let data = shop.as_shop().unwrap();
        assert_eq!(shop.kind(), EntityKind::Shop);
        assert!(data.linked_location.is_none());
        assert!(data.linked_npcs.is_empty());
        assert!(data.inventory.is_empty());
        assert_eq!(data.markup, 1.0);
    }

    #[test]
    fn test_wire_format_shape() {
        let npc = Entity::new_npc("Mirena").with_description("Keeps the west gate.");
        let value = serde_json::to_value(&npc).unwrap();

        assert_eq!(value["type"], "npc");
        assert_eq!(value["data"]["description"], "Keeps the west gate.");
        assert!(value["data"]["associates"].as_array().unwrap().is_empty());

        let back: Entity = serde_json::from_value(value).unwrap();
        assert_eq!(back, npc);
    }

    #[test]
    fn test_wire_format_tolerates_missing_fields() {
        // A blob written before a field existed still decodes.
        let value = serde_json::json!({
            "id": Ref::new(),
            "name": "Old Town",
            "type": "location",
            "data": { "description": "The original quarter." }
        });
        let entity: Entity = serde_json::from_value(value).unwrap();
        let data = entity.as_location().unwrap();
        assert!(data.parent_region.is_none());
        assert!(data.linked_shops.is_empty());
    }

    #[test]
    fn test_refs_in_covers_inventory() {
        let mut shop = Entity::new_shop("Provisioner");
        let item = Ref::new();
        shop.as_shop_mut()
            .unwrap()
            .inventory
            .push(InventoryEntry::new(item, 3));

        let refs = RelationField::ShopInventory.refs_in(&shop.data);
        assert_eq!(refs, vec![item]);
    }

    #[test]
    fn test_strip_scalar_and_array() {
        let mut loc = Entity::new_location("Harborside");
        let region = Ref::new();
        let npc = Ref::new();
        if let EntityData::Location(d) = &mut loc.data {
            d.parent_region = Some(region);
            d.linked_npcs.push(npc);
        }

        assert!(RelationField::LocationParentRegion.strip(&mut loc.data, region));
        assert!(RelationField::LocationLinkedNpcs.strip(&mut loc.data, npc));
        // Second strip is a no-op.
        assert!(!RelationField::LocationLinkedNpcs.strip(&mut loc.data, npc));

        let d = loc.as_location().unwrap();
        assert!(d.parent_region.is_none());
        assert!(d.linked_npcs.is_empty());
    }

    #[test]
    fn test_diff_relationships() {
        let a = Ref::new();
        let b = Ref::new();
        let region = Ref::new();

        let mut old = LocationData::default();
        old.linked_npcs = vec![a];
        let mut new = old.clone();
        new.linked_npcs = vec![b];
        new.parent_region = Some(region);

        let changes = diff_relationships(
            &EntityData::Location(old),
            &EntityData::Location(new),
        );
        assert_eq!(changes.len(), 2);

        let parent = changes
            .iter()
            .find(|c| c.field == RelationField::LocationParentRegion)
            .unwrap();
        assert_eq!(parent.added, vec![region]);
        assert!(parent.removed.is_empty());

        let npcs = changes
            .iter()
            .find(|c| c.field == RelationField::LocationLinkedNpcs)
            .unwrap();
        assert_eq!(npcs.added, vec![b]);
        assert_eq!(npcs.removed, vec![a]);
    }

    #[test]
    fn test_rewrite_text_refs() {
        let old = Ref::new();
        let new = Ref::new();
        let mut entity = Entity::new_region("The Reach")
            .with_description(format!("See @Link[{old}] for the harbor."));

        entity.rewrite_text_refs(old, new);
        assert!(entity.data.description().contains(&new.to_string()));
        assert!(!entity.data.description().contains(&old.to_string()));
    }
}
