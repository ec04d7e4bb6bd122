//! The full tick-addressable game state.
//!
//! Exactly one `GameState` is live. The tick orchestrator owns it exclusively
//! during a tick; external consumers (rendering, UI, persistence) read it
//! only between ticks, through shared references handed out by the engine.

use crate::building::{Building, BuildingStatus};
use crate::catalog::{BuildingSpecial, Catalog};
use crate::fixed::Fixed64;
use crate::grid::{HexGrid, TileXy};
use crate::id::{BuildingId, GreatPersonId, ResourceId, TechId, TransportId};
use crate::modifier::{BoostEntry, BoostOrigin};
use crate::rng::SimRng;
use crate::transport::Transport;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Probability that a given deposit resource appears on a given non-edge
/// tile at world generation.
const DEPOSIT_CHANCE_PERCENT: u32 = 5;

// ---------------------------------------------------------------------------
// Tile
// ---------------------------------------------------------------------------

/// One grid cell. The deposit is fixed at world generation and never
/// changes; the building slot is mutated by placement and demolition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tile {
    pub xy: TileXy,
    pub deposit: Option<ResourceId>,
    pub building: Option<Building>,
}

// ---------------------------------------------------------------------------
// GameState
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameState {
    pub(crate) tiles: BTreeMap<TileXy, Tile>,
    /// In-flight shipments keyed by destination tile, in creation order.
    pub(crate) transportation: BTreeMap<TileXy, Vec<Transport>>,
    pub(crate) unlocked_techs: BTreeSet<TechId>,
    pub(crate) great_people: BTreeSet<GreatPersonId>,
    pub(crate) boosts: Vec<BoostEntry>,
    pub cash: Fixed64,
    pub science: Fixed64,
    pub faith: Fixed64,
    /// Process-wide worker pool added to housing output each tick.
    pub base_workers: Fixed64,
    next_transport_id: u64,
    seed: u64,
}

impl GameState {
    /// Generate a fresh world: deposits scattered from the seed, the
    /// headquarter placed Active at the grid center.
    pub fn generate(grid: &HexGrid, catalog: &Catalog, seed: u64) -> Self {
        let mut rng = SimRng::new(seed);
        let deposit_resources = catalog.deposit_resources();
        let chance = Fixed64::from_num(DEPOSIT_CHANCE_PERCENT) / Fixed64::from_num(100);

        let mut tiles = BTreeMap::new();
        for xy in grid.tiles() {
            let mut deposit = None;
            if !grid.is_edge(xy) {
                for &resource in &deposit_resources {
                    if rng.chance(chance) {
                        deposit = Some(resource);
                        break;
                    }
                }
            }
            tiles.insert(
                xy,
                Tile {
                    xy,
                    deposit,
                    building: None,
                },
            );
        }

        let mut state = Self {
            tiles,
            transportation: BTreeMap::new(),
            unlocked_techs: BTreeSet::new(),
            great_people: BTreeSet::new(),
            boosts: Vec::new(),
            cash: Fixed64::ZERO,
            science: Fixed64::ZERO,
            faith: Fixed64::ZERO,
            base_workers: Fixed64::ZERO,
            next_transport_id: 0,
            seed,
        };

        if let Some(hq) = catalog
            .building_ids()
            .find(|&id| catalog.building(id).special == BuildingSpecial::Headquarter)
        {
            let center = grid.center();
            if let Some(tile) = state.tiles.get_mut(&center) {
                tile.building = Some(Building::new_active(hq));
            }
        }

        state
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    // -----------------------------------------------------------------------
    // Tiles and buildings
    // -----------------------------------------------------------------------

    pub fn tile(&self, xy: TileXy) -> Option<&Tile> {
        self.tiles.get(&xy)
    }

    pub fn tile_mut(&mut self, xy: TileXy) -> Option<&mut Tile> {
        self.tiles.get_mut(&xy)
    }

    pub fn tiles(&self) -> impl Iterator<Item = &Tile> {
        self.tiles.values()
    }

    pub fn building_at(&self, xy: TileXy) -> Option<&Building> {
        self.tiles.get(&xy).and_then(|t| t.building.as_ref())
    }

    pub fn building_at_mut(&mut self, xy: TileXy) -> Option<&mut Building> {
        self.tiles.get_mut(&xy).and_then(|t| t.building.as_mut())
    }

    /// All placed buildings in coordinate order.
    pub fn buildings(&self) -> impl Iterator<Item = (TileXy, &Building)> {
        self.tiles
            .iter()
            .filter_map(|(&xy, t)| t.building.as_ref().map(|b| (xy, b)))
    }

    /// Coordinates of all placed buildings sorted by production priority
    /// descending, tie-broken by coordinate order. This is the canonical
    /// iteration order for allocation, production, and logistics planning --
    /// never the iteration order of an unordered structure.
    pub fn buildings_by_priority(&self) -> Vec<TileXy> {
        let mut order: Vec<(u8, TileXy)> = self
            .buildings()
            .map(|(xy, b)| (b.priority, xy))
            .collect();
        order.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));
        order.into_iter().map(|(_, xy)| xy).collect()
    }

    /// Instances of a building kind across the map, any status. Used for
    /// unique-wonder placement validation.
    pub fn count_buildings(&self, kind: BuildingId) -> usize {
        self.buildings().filter(|(_, b)| b.kind == kind).count()
    }

    /// The headquarter tile, if one stands.
    pub fn headquarter_xy(&self, catalog: &Catalog) -> Option<TileXy> {
        self.buildings()
            .find(|(_, b)| catalog.building(b.kind).special == BuildingSpecial::Headquarter)
            .map(|(xy, _)| xy)
    }

    // -----------------------------------------------------------------------
    // Transports
    // -----------------------------------------------------------------------

    pub fn transportation(&self) -> &BTreeMap<TileXy, Vec<Transport>> {
        &self.transportation
    }

    pub(crate) fn alloc_transport_id(&mut self) -> TransportId {
        let id = TransportId(self.next_transport_id);
        self.next_transport_id += 1;
        id
    }

    /// Amount of `resource` currently in flight toward `dest`.
    pub fn inflight(&self, dest: TileXy, resource: ResourceId) -> Fixed64 {
        self.transportation
            .get(&dest)
            .map(|list| {
                list.iter()
                    .filter(|t| t.resource == resource)
                    .map(|t| t.amount)
                    .sum()
            })
            .unwrap_or(Fixed64::ZERO)
    }

    /// Total shipments currently in flight.
    pub fn transports_in_flight(&self) -> usize {
        self.transportation.values().map(Vec::len).sum()
    }

    // -----------------------------------------------------------------------
    // Unlocks and boosts
    // -----------------------------------------------------------------------

    pub fn boosts(&self) -> &[BoostEntry] {
        &self.boosts
    }

    pub(crate) fn push_boosts(&mut self, entries: impl IntoIterator<Item = BoostEntry>) {
        self.boosts.extend(entries);
    }

    /// Drop wonder-origin boosts anchored at a tile (wonder demolished).
    pub(crate) fn remove_wonder_boosts(&mut self, anchor: TileXy) {
        self.boosts.retain(|e| {
            !(matches!(e.origin, BoostOrigin::Wonder(_)) && e.anchor == Some(anchor))
        });
    }

    pub fn is_unlocked(&self, tech: TechId) -> bool {
        self.unlocked_techs.contains(&tech)
    }

    pub fn unlocked_techs(&self) -> &BTreeSet<TechId> {
        &self.unlocked_techs
    }

    pub(crate) fn record_tech(&mut self, tech: TechId) -> bool {
        self.unlocked_techs.insert(tech)
    }

    pub fn great_people(&self) -> &BTreeSet<GreatPersonId> {
        &self.great_people
    }

    pub(crate) fn record_great_person(&mut self, person: GreatPersonId) -> bool {
        self.great_people.insert(person)
    }

    /// Credit an amount to a global counter.
    pub(crate) fn credit(&mut self, counter: crate::catalog::GlobalCounter, amount: Fixed64) {
        match counter {
            crate::catalog::GlobalCounter::Cash => self.cash += amount,
            crate::catalog::GlobalCounter::Science => self.science += amount,
            crate::catalog::GlobalCounter::Faith => self.faith += amount,
        }
    }

    /// Whether any Active instance of the (wonder) kind stands on the map.
    pub fn wonder_standing(&self, kind: BuildingId) -> bool {
        self.buildings()
            .any(|(_, b)| b.kind == kind && b.status == BuildingStatus::Active)
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{BuildingDef, CatalogBuilder, ResourceDef, ResourceKind};
    use crate::fixed::f64_to_fixed64;

    fn test_catalog() -> Catalog {
        let mut builder = CatalogBuilder::new();
        builder
            .register_resource(ResourceDef {
                name: "Worker".into(),
                tier: 0,
                kind: ResourceKind::Worker,
                deposit: false,
            })
            .unwrap();
        builder
            .register_resource(ResourceDef {
                name: "Stone".into(),
                tier: 1,
                kind: ResourceKind::Material,
                deposit: true,
            })
            .unwrap();
        builder
            .register_building(BuildingDef {
                name: "Headquarter".into(),
                tier: 0,
                input: BTreeMap::new(),
                output: BTreeMap::new(),
                construction_cost: BTreeMap::new(),
                base_storage: f64_to_fixed64(1000.0),
                deposit: None,
                max: Some(1),
                wonder_boosts: Vec::new(),
                special: BuildingSpecial::Headquarter,
            })
            .unwrap();
        builder.build().unwrap()
    }

    #[test]
    fn generate_places_headquarter_at_center() {
        let grid = HexGrid::new(9, 9);
        let catalog = test_catalog();
        let state = GameState::generate(&grid, &catalog, 42);
        let hq = state.headquarter_xy(&catalog).expect("hq placed");
        assert_eq!(hq, grid.center());
        let b = state.building_at(hq).unwrap();
        assert_eq!(b.status, BuildingStatus::Active);
        assert_eq!(b.level, 1);
    }

    #[test]
    fn generation_is_seed_deterministic() {
        let grid = HexGrid::new(9, 9);
        let catalog = test_catalog();
        let a = GameState::generate(&grid, &catalog, 7);
        let b = GameState::generate(&grid, &catalog, 7);
        let deposits_a: Vec<_> = a.tiles().map(|t| t.deposit).collect();
        let deposits_b: Vec<_> = b.tiles().map(|t| t.deposit).collect();
        assert_eq!(deposits_a, deposits_b);
    }

    #[test]
    fn edge_tiles_never_carry_deposits() {
        let grid = HexGrid::new(9, 9);
        let catalog = test_catalog();
        let state = GameState::generate(&grid, &catalog, 3);
        for tile in state.tiles() {
            if grid.is_edge(tile.xy) {
                assert!(tile.deposit.is_none(), "edge tile {} has a deposit", tile.xy);
            }
        }
    }

    #[test]
    fn transport_ids_are_unique_and_monotonic() {
        let grid = HexGrid::new(5, 5);
        let catalog = test_catalog();
        let mut state = GameState::generate(&grid, &catalog, 1);
        let a = state.alloc_transport_id();
        let b = state.alloc_transport_id();
        assert!(b > a);
    }

    #[test]
    fn priority_order_is_descending_with_coordinate_tie_break() {
        let grid = HexGrid::new(5, 5);
        let catalog = test_catalog();
        let mut state = GameState::generate(&grid, &catalog, 1);
        let hq = state.headquarter_xy(&catalog).unwrap();
        let mut low = Building::new_active(BuildingId(0));
        low.priority = 2;
        let mut high = Building::new_active(BuildingId(0));
        high.priority = 9;
        state.tile_mut(TileXy::new(1, 1)).unwrap().building = Some(low);
        state.tile_mut(TileXy::new(3, 1)).unwrap().building = Some(high);

        let order = state.buildings_by_priority();
        assert_eq!(order[0], TileXy::new(3, 1));
        assert_eq!(order[1], hq); // default priority 5
        assert_eq!(order[2], TileXy::new(1, 1));
    }
}
