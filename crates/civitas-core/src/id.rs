use serde::{Deserialize, Serialize};

/// Identifies a resource in the catalog. Cheap to copy and compare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ResourceId(pub u32);

/// Identifies a building definition in the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BuildingId(pub u32);

/// Identifies a technology. Defined here (not in the tech crate) because the
/// serialized game state records the unlocked set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TechId(pub u32);

/// Identifies a great person.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GreatPersonId(pub u32);

/// Identifies one in-flight shipment. Unique for the lifetime of a game;
/// never reused, so consumers (rendering) can key shipment visuals by it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TransportId(pub u64);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_comparable_and_hashable() {
        use std::collections::HashMap;
        let mut map = HashMap::new();
        map.insert(ResourceId(0), "wheat");
        map.insert(ResourceId(1), "wood");
        assert_eq!(map[&ResourceId(0)], "wheat");
        assert!(BuildingId(1) > BuildingId(0));
    }
}
