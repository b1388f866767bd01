//! Relationship shapes between entity kinds.
//!
//! Each [`Relation`] names one bidirectional (or container) edge type and
//! knows which field sits on which side. The link maintainer dispatches on
//! this metadata instead of hand-writing one routine per field pair.

use crate::entity::{EntityKind, RelationField};
use serde::{Deserialize, Serialize};

/// The relationship shapes in the data model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Relation {
    /// Location.linkedNpcs ↔ Npc.linkedLocations (multi ↔ multi).
    LocationNpc,
    /// Location.linkedShops ↔ Shop.linkedLocation (multi ↔ single).
    LocationShop,
    /// Region.linkedLocations ↔ Location.parentRegion (multi ↔ single).
    RegionLocation,
    /// Shop.linkedNpcs ↔ Npc.linkedShops (multi ↔ multi).
    ShopNpc,
    /// Npc.associates ↔ Npc.associates (symmetric).
    Associates,
    /// Group.members, heterogeneous container with no inverse.
    GroupMember,
}

impl Relation {
    /// Display name.
    pub fn name(&self) -> &'static str {
        match self {
            Relation::LocationNpc => "location-npc",
            Relation::LocationShop => "location-shop",
            Relation::RegionLocation => "region-location",
            Relation::ShopNpc => "shop-npc",
            Relation::Associates => "associates",
            Relation::GroupMember => "group-member",
        }
    }

    /// The multi-valued owning field `link`/`unlink` operate on.
    pub fn forward_field(&self) -> RelationField {
        match self {
            Relation::LocationNpc => RelationField::LocationLinkedNpcs,
            Relation::LocationShop => RelationField::LocationLinkedShops,
            Relation::RegionLocation => RelationField::RegionLinkedLocations,
            Relation::ShopNpc => RelationField::ShopLinkedNpcs,
            Relation::Associates => RelationField::NpcAssociates,
            Relation::GroupMember => RelationField::GroupMembers,
        }
    }

    /// The field on the target side, when the relation declares one.
    pub fn inverse_field(&self) -> Option<RelationField> {
        inverse_of(self.forward_field())
    }

    /// Kind that owns the forward field.
    pub fn owner_kind(&self) -> EntityKind {
        match self {
            Relation::LocationNpc | Relation::LocationShop => EntityKind::Location,
            Relation::RegionLocation => EntityKind::Region,
            Relation::ShopNpc => EntityKind::Shop,
            Relation::Associates => EntityKind::Npc,
            Relation::GroupMember => EntityKind::Group,
        }
    }

    /// Kind expected on the target side. `None` for the heterogeneous
    /// group container.
    pub fn target_kind(&self) -> Option<EntityKind> {
        match self {
            Relation::LocationNpc | Relation::ShopNpc | Relation::Associates => {
                Some(EntityKind::Npc)
            }
            Relation::LocationShop => Some(EntityKind::Shop),
            Relation::RegionLocation => Some(EntityKind::Location),
            Relation::GroupMember => None,
        }
    }

    /// Mutual relation where both sides share one field.
    pub fn is_symmetric(&self) -> bool {
        matches!(self, Relation::Associates)
    }

    /// The single-valued side, for the two multi ↔ single shapes.
    pub fn single_side(&self) -> Option<RelationField> {
        match self {
            Relation::LocationShop => Some(RelationField::ShopLinkedLocation),
            Relation::RegionLocation => Some(RelationField::LocationParentRegion),
            _ => None,
        }
    }
}

/// The field on the other side of a bidirectional pair. `None` for fields
/// with no inverse (external singles, inventory, group members).
pub fn inverse_of(field: RelationField) -> Option<RelationField> {
    use RelationField::*;
    match field {
        RegionLinkedLocations => Some(LocationParentRegion),
        LocationParentRegion => Some(RegionLinkedLocations),
        LocationLinkedNpcs => Some(NpcLinkedLocations),
        NpcLinkedLocations => Some(LocationLinkedNpcs),
        LocationLinkedShops => Some(ShopLinkedLocation),
        ShopLinkedLocation => Some(LocationLinkedShops),
        ShopLinkedNpcs => Some(NpcLinkedShops),
        NpcLinkedShops => Some(ShopLinkedNpcs),
        NpcAssociates => Some(NpcAssociates),
        LocationLinkedScene | ShopInventory | NpcLinkedActor | GroupMembers => None,
    }
}
