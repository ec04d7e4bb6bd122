//! Modifier aggregation: technologies, great people, and wonders contribute
//! additive boosts; the aggregator folds the matching contributions into one
//! resolved multiplier per building and kind.
//!
//! Contributions are commutative by construction -- additive values are
//! summed, never multiplied together -- so unlock order can never change a
//! resolved value. Resolution is recomputed per tick per building with no
//! cross-tick memoization, so it is deterministic given the unlocked set and
//! the tile layout.

use crate::catalog::Catalog;
use crate::fixed::Fixed64;
use crate::grid::{HexGrid, TileXy};
use crate::id::{BuildingId, GreatPersonId, ResourceId, TechId};
use crate::state::GameState;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Kinds and scopes
// ---------------------------------------------------------------------------

/// Which resolved value a boost contributes to.
///
/// The first four resolve from a base of the building's own multiplier
/// (default 1) and scale base amounts. `Builder` resolves globally from base
/// 1. The two science kinds are rates: they resolve from base 0 and are
/// credited per idle/busy worker each tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum MultiplierKind {
    Production,
    Consumption,
    Storage,
    WorkerCapacity,
    Builder,
    ScienceFromIdleWorkers,
    ScienceFromBusyWorkers,
}

/// Which buildings a boost applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BoostScope {
    /// Every building.
    Global,
    /// Buildings of one catalog kind.
    Building(BuildingId),
    /// Buildings that consume or produce the resource.
    TouchesResource(ResourceId),
    /// Buildings that produce the resource.
    ProducesResource(ResourceId),
    /// Buildings adjacent to the boost's anchor tile (wonder auras).
    Adjacent,
    /// Buildings at or above the given level.
    MinLevel(u32),
    /// Scales with level: contributes `value` once per `n` whole levels.
    PerLevels(u32),
}

/// One additive contribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Boost {
    pub kind: MultiplierKind,
    pub value: Fixed64,
    pub scope: BoostScope,
}

/// Where a boost came from. Wonder-origin entries carry the wonder's tile as
/// anchor and contribute only while that wonder stands Active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BoostOrigin {
    Technology(TechId),
    GreatPerson(GreatPersonId),
    Wonder(BuildingId),
}

/// A boost recorded in the game state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoostEntry {
    pub boost: Boost,
    pub origin: BoostOrigin,
    pub anchor: Option<TileXy>,
}

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

/// Resolved multipliers for one building, cached per tick in the summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedMultipliers {
    pub production: Fixed64,
    pub consumption: Fixed64,
    pub storage: Fixed64,
    pub worker_capacity: Fixed64,
}

impl ResolvedMultipliers {
    pub fn resolve_all(
        state: &GameState,
        catalog: &Catalog,
        grid: &HexGrid,
        xy: TileXy,
    ) -> Self {
        Self {
            production: resolve(state, catalog, grid, xy, MultiplierKind::Production),
            consumption: resolve(state, catalog, grid, xy, MultiplierKind::Consumption),
            storage: resolve(state, catalog, grid, xy, MultiplierKind::Storage),
            worker_capacity: resolve(state, catalog, grid, xy, MultiplierKind::WorkerCapacity),
        }
    }
}

/// Resolve one multiplier kind for the building at `xy`.
///
/// Starts from the building's own base multiplier and adds every matching
/// contribution. Returns 1 when the tile has no building.
pub fn resolve(
    state: &GameState,
    catalog: &Catalog,
    grid: &HexGrid,
    xy: TileXy,
    kind: MultiplierKind,
) -> Fixed64 {
    let one = Fixed64::from_num(1);
    let Some(building) = state.building_at(xy) else {
        return one;
    };
    let def = catalog.building(building.kind);

    let mut total = building.base_multiplier;
    for entry in state.boosts() {
        if entry.boost.kind != kind {
            continue;
        }
        if !wonder_is_standing(state, entry) {
            continue;
        }
        let applies = match entry.boost.scope {
            BoostScope::Global => true,
            BoostScope::Building(b) => building.kind == b,
            BoostScope::TouchesResource(r) => {
                def.input.contains_key(&r) || def.output.contains_key(&r)
            }
            BoostScope::ProducesResource(r) => def.output.contains_key(&r),
            BoostScope::Adjacent => entry
                .anchor
                .is_some_and(|anchor| anchor != xy && grid.neighbors(anchor).contains(&xy)),
            BoostScope::MinLevel(n) => building.level >= n,
            BoostScope::PerLevels(_) => true,
        };
        if !applies {
            continue;
        }
        match entry.boost.scope {
            BoostScope::PerLevels(n) if n > 0 => {
                total += entry.boost.value * Fixed64::from_num(building.level / n);
            }
            _ => total += entry.boost.value,
        }
    }
    total
}

/// Resolve a building-independent multiplier (base 1 plus global boosts).
pub fn resolve_global(state: &GameState, kind: MultiplierKind) -> Fixed64 {
    Fixed64::from_num(1) + resolve_rate(state, kind)
}

/// Resolve a building-independent rate (base 0 plus global boosts). Used for
/// the per-worker science kinds, which are zero until unlocked.
pub fn resolve_rate(state: &GameState, kind: MultiplierKind) -> Fixed64 {
    let mut total = Fixed64::ZERO;
    for entry in state.boosts() {
        if entry.boost.kind == kind
            && matches!(entry.boost.scope, BoostScope::Global)
            && wonder_is_standing(state, entry)
        {
            total += entry.boost.value;
        }
    }
    total
}

/// Wonder-origin boosts contribute only while the wonder is Active on its
/// anchor tile. Tech and great-person boosts are permanent.
fn wonder_is_standing(state: &GameState, entry: &BoostEntry) -> bool {
    let BoostOrigin::Wonder(kind) = entry.origin else {
        return true;
    };
    let Some(anchor) = entry.anchor else {
        return false;
    };
    state
        .building_at(anchor)
        .is_some_and(|b| b.kind == kind && b.status == crate::building::BuildingStatus::Active)
}

// ===========================================================================
// Tests live in the modules that exercise resolution against a built state
// (production, tick) and in tests/integration.rs; the pure folding rules are
// covered there with real catalogs.
// ===========================================================================
