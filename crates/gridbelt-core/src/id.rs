use serde::{Serialize, Deserialize};
use slotmap::new_key_type;

new_key_type! {
    /// Identifies a placed machine instance.
    pub struct MachineId;

    /// Identifies a belt segment in the segment graph.
    pub struct SegmentId;

    /// Identifies an item currently in transit on a belt route.
    pub struct TransitId;
}

/// Identifies a machine prototype in the registry. Cheap to copy and compare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PrototypeId(pub u32);

/// Identifies an item kind in the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ItemKindId(pub u32);

/// Index of a port within its prototype's port list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PortIndex(pub u8);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn item_kind_id_equality() {
        let a = ItemKindId(0);
        let b = ItemKindId(0);
        let c = ItemKindId(1);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn prototype_id_copy() {
        let a = PrototypeId(5);
        let b = a; // Copy
        assert_eq!(a, b);
    }

    #[test]
    fn ids_are_map_keys() {
        use std::collections::BTreeMap;
        let mut map = BTreeMap::new();
        map.insert(ItemKindId(0), "iron_ore");
        map.insert(ItemKindId(1), "iron_plate");
        assert_eq!(map[&ItemKindId(0)], "iron_ore");
    }
}
