//! Construction and upgrade progression.
//!
//! A site's bill is delivered by the transportation layer into the site's
//! storage; builders then consume delivered resources at a capacity derived
//! from the global builder multiplier and the site's worker staffing. Lack
//! of workers pauses progress without losing what was already delivered or
//! consumed. Ending construction early (sell) forfeits everything.

use crate::building::{Building, BuildingStatus};
use crate::catalog::{BuildingDef, Catalog};
use crate::event::{Event, EventBus};
use crate::fixed::{Fixed64, Ticks};
use crate::id::ResourceId;
use crate::modifier::{self, BoostEntry, BoostOrigin, MultiplierKind};
use crate::state::GameState;
use crate::workers::Allocation;
use std::collections::BTreeMap;

/// Workers a construction or upgrade site demands for full progress.
pub const BUILDER_CREW: u32 = 10;

/// Bill units a fully staffed crew consumes per tick before the builder
/// multiplier.
pub const BUILDER_BASE_CAPACITY: u32 = 2;

/// Upgrade cost growth per level, in percent (150% = 1.5x per level).
const UPGRADE_COST_GROWTH_PERCENT: u32 = 150;

// ---------------------------------------------------------------------------
// Bills
// ---------------------------------------------------------------------------

/// The total resource bill for the building's current transition: the base
/// construction cost for a new build, or the cost scaled by
/// `1.5^level` for an upgrade. Empty when no transition is in progress.
pub fn construction_bill(def: &BuildingDef, building: &Building) -> BTreeMap<ResourceId, Fixed64> {
    match building.status {
        BuildingStatus::UnderConstruction => def.construction_cost.clone(),
        BuildingStatus::Upgrading => {
            let growth = Fixed64::from_num(UPGRADE_COST_GROWTH_PERCENT) / Fixed64::from_num(100);
            let mut scale = Fixed64::from_num(1);
            for _ in 0..building.level {
                scale *= growth;
            }
            def.construction_cost
                .iter()
                .map(|(&r, &c)| (r, c * scale))
                .collect()
        }
        _ => BTreeMap::new(),
    }
}

/// Remaining amounts a site still needs delivered, given what is already in
/// its storage and what builders have consumed.
pub fn remaining_to_deliver(
    def: &BuildingDef,
    building: &Building,
) -> BTreeMap<ResourceId, Fixed64> {
    construction_bill(def, building)
        .into_iter()
        .filter_map(|(r, cost)| {
            let spent = building
                .construction_spent
                .get(&r)
                .copied()
                .unwrap_or(Fixed64::ZERO);
            let outstanding = cost - spent - building.stored(r);
            (outstanding > Fixed64::ZERO).then_some((r, outstanding))
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Progression pass
// ---------------------------------------------------------------------------

/// Advance every construction and upgrade site by one tick.
pub fn run(
    state: &mut GameState,
    catalog: &Catalog,
    allocation: &Allocation,
    events: &mut EventBus,
    tick: Ticks,
) {
    let builder_mult = modifier::resolve_global(state, MultiplierKind::Builder);

    for xy in state.buildings_by_priority() {
        let Some(building) = state.building_at(xy) else {
            continue;
        };
        if !matches!(
            building.status,
            BuildingStatus::UnderConstruction | BuildingStatus::Upgrading
        ) || building.construction_paused
        {
            continue;
        }

        let def = catalog.building(building.kind);
        let bill = construction_bill(def, building);

        if !bill.is_empty() {
            let assigned = allocation.assigned.get(&xy).copied().unwrap_or(0);
            if assigned == 0 {
                continue; // no workers: progress holds, nothing is lost
            }
            let factor = Fixed64::from_num(assigned) / Fixed64::from_num(BUILDER_CREW);
            let mut budget =
                Fixed64::from_num(BUILDER_BASE_CAPACITY) * builder_mult * factor.min(Fixed64::from_num(1));

            let Some(building) = state.building_at_mut(xy) else {
                continue;
            };
            for (&resource, &cost) in &bill {
                if budget <= Fixed64::ZERO {
                    break;
                }
                let spent = building
                    .construction_spent
                    .get(&resource)
                    .copied()
                    .unwrap_or(Fixed64::ZERO);
                let needed = cost - spent;
                if needed <= Fixed64::ZERO {
                    continue;
                }
                let take = needed.min(building.stored(resource)).min(budget);
                if take <= Fixed64::ZERO {
                    continue;
                }
                let removed = building.remove(resource, take);
                *building
                    .construction_spent
                    .entry(resource)
                    .or_insert(Fixed64::ZERO) += removed;
                budget -= removed;
            }
        }

        // Completion check against the full bill.
        let Some(building) = state.building_at(xy) else {
            continue;
        };
        let complete = bill.iter().all(|(&r, &cost)| {
            building
                .construction_spent
                .get(&r)
                .copied()
                .unwrap_or(Fixed64::ZERO)
                >= cost
        });
        if !complete {
            continue;
        }

        let kind = building.kind;
        let was_upgrade = building.status == BuildingStatus::Upgrading;
        let Some(building) = state.building_at_mut(xy) else {
            continue;
        };
        building.construction_spent.clear();
        building.status = BuildingStatus::Active;
        building.level = if was_upgrade { building.level + 1 } else { 1 };
        let new_level = building.level;

        if was_upgrade {
            events.emit(Event::UpgradeCompleted {
                xy,
                kind,
                level: new_level,
                tick,
            });
        } else {
            events.emit(Event::ConstructionCompleted { xy, kind, tick });
            let def = catalog.building(kind);
            if def.is_wonder() {
                state.push_boosts(def.wonder_boosts.iter().map(|&boost| BoostEntry {
                    boost,
                    origin: BoostOrigin::Wonder(kind),
                    anchor: Some(xy),
                }));
                events.emit(Event::WonderCompleted { xy, kind, tick });
            }
        }
    }
}

// ===========================================================================
// Tests
// ===========================================================================
