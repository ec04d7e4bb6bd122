//! Per-tick production and consumption.
//!
//! Each Active building is checked against the not-producing gates in a
//! fixed precedence, then its deltas are applied. A building only ever
//! touches its own storage here -- cross-building flow goes through the
//! transportation layer, one tick later at minimum -- and every gate is
//! evaluated against the amounts as they stood at the start of the
//! building's turn, so same-tick production across buildings is
//! order-independent.

use crate::building::BuildingStatus;
use crate::catalog::{Catalog, ResourceKind};
use crate::fixed::Fixed64;
use crate::grid::TileXy;
use crate::modifier::ResolvedMultipliers;
use crate::state::GameState;
use crate::workers::{Allocation, required_workers};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ---------------------------------------------------------------------------
// Gates
// ---------------------------------------------------------------------------

/// Why a building did not (fully) produce this tick. Not errors: recorded as
/// per-tick status, displayed by the UI, and retried automatically next tick.
///
/// Precedence when several hold at once, first wins:
/// `TurnedOff` > `NotOnDeposit` > `NotEnoughWorkers` > `NotEnoughResources`
/// > `StorageFull` > `StoragePartialFull`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NotProducingReason {
    /// Manually paused by the player.
    TurnedOff,
    /// The building requires a terrain deposit the tile lacks.
    NotOnDeposit,
    /// Understaffed. Output scales by `assigned / required`; only a fully
    /// unstaffed building produces nothing.
    NotEnoughWorkers,
    /// Some required input is below the per-cycle requirement.
    NotEnoughResources,
    /// Every output resource is at capacity.
    StorageFull,
    /// Some outputs are at capacity; the rest were still produced.
    StoragePartialFull,
}

// ---------------------------------------------------------------------------
// Engine pass
// ---------------------------------------------------------------------------

/// Run production for every building, in priority order. Returns the
/// recorded gate per producing-capable building (`None` = produced at full
/// strength).
pub fn run(
    state: &mut GameState,
    catalog: &Catalog,
    allocation: &Allocation,
    resolved: &BTreeMap<TileXy, ResolvedMultipliers>,
) -> BTreeMap<TileXy, Option<NotProducingReason>> {
    let mut reasons = BTreeMap::new();
    let one = Fixed64::from_num(1);

    for xy in state.buildings_by_priority() {
        let Some(building) = state.building_at(xy) else {
            continue;
        };
        match building.status {
            BuildingStatus::Active => {}
            BuildingStatus::Paused => {
                reasons.insert(xy, Some(NotProducingReason::TurnedOff));
                continue;
            }
            // Construction and upgrades are handled by their own phase.
            BuildingStatus::UnderConstruction | BuildingStatus::Upgrading => continue,
        }

        let def = catalog.building(building.kind);
        if def.input.is_empty() && def.output.is_empty() {
            continue; // nothing to simulate (pure wonders, statistics)
        }

        // Deposit gate.
        if let Some(required_deposit) = def.deposit {
            let on_deposit = state
                .tile(xy)
                .is_some_and(|t| t.deposit == Some(required_deposit));
            if !on_deposit {
                reasons.insert(xy, Some(NotProducingReason::NotOnDeposit));
                continue;
            }
        }

        let mults = resolved.get(&xy).copied().unwrap_or(ResolvedMultipliers {
            production: one,
            consumption: one,
            storage: one,
            worker_capacity: one,
        });

        // Worker gate: graded, not binary.
        let required = required_workers(catalog, building.kind, building.level, mults.worker_capacity);
        let assigned = allocation.assigned.get(&xy).copied().unwrap_or(0);
        let factor = if required == 0 {
            one
        } else {
            (Fixed64::from_num(assigned) / Fixed64::from_num(required)).min(one)
        };
        let understaffed = assigned < required;
        if required > 0 && assigned == 0 {
            reasons.insert(xy, Some(NotProducingReason::NotEnoughWorkers));
            continue;
        }

        let level = Fixed64::from_num(building.level);

        // Input gate.
        let mut to_consume: Vec<(crate::id::ResourceId, Fixed64)> = Vec::new();
        let mut short_on_inputs = false;
        for (&resource, &base) in &def.input {
            let need = base * level * mults.consumption * factor;
            if building.stored(resource) < need {
                short_on_inputs = true;
                break;
            }
            to_consume.push((resource, need));
        }
        if short_on_inputs {
            // Precedence: an understaffed building reports the worker gate.
            let reason = if understaffed {
                NotProducingReason::NotEnoughWorkers
            } else {
                NotProducingReason::NotEnoughResources
            };
            reasons.insert(xy, Some(reason));
            continue;
        }

        // Storage gates, material outputs only (worker output is supply,
        // global output is a counter -- neither can cap).
        let capacity = def.base_storage * mults.storage;
        let material_outputs: Vec<crate::id::ResourceId> = def
            .output
            .keys()
            .copied()
            .filter(|&r| catalog.resource(r).kind == ResourceKind::Material)
            .collect();
        let capped: Vec<bool> = material_outputs
            .iter()
            .map(|&r| building.stored(r) >= capacity)
            .collect();
        if !material_outputs.is_empty() && capped.iter().all(|&c| c) {
            let reason = if understaffed {
                NotProducingReason::NotEnoughWorkers
            } else {
                NotProducingReason::StorageFull
            };
            reasons.insert(xy, Some(reason));
            continue;
        }
        let partially_capped = capped.iter().any(|&c| c);

        // Gates cleared: apply deltas. Computed amounts above are all from
        // the pre-delta stored values.
        let outputs: Vec<(crate::id::ResourceId, Fixed64)> = def
            .output
            .iter()
            .map(|(&r, &base)| (r, base * level * mults.production * factor))
            .collect();

        let Some(building) = state.building_at_mut(xy) else {
            continue;
        };
        for (resource, amount) in to_consume {
            let _ = building.remove(resource, amount);
        }
        let mut credits: Vec<(crate::catalog::GlobalCounter, Fixed64)> = Vec::new();
        for (resource, amount) in outputs {
            match catalog.resource(resource).kind {
                ResourceKind::Material => {
                    // Capped outputs are skipped; overflow past capacity is
                    // discarded, never backpressured elsewhere.
                    if building.stored(resource) < capacity {
                        let _ = building.add_capped(resource, amount, capacity);
                    }
                }
                ResourceKind::Global(counter) => credits.push((counter, amount)),
                ResourceKind::Worker => {} // supply-side, handled by allocation
            }
        }
        for (counter, amount) in credits {
            state.credit(counter, amount);
        }

        let reason = if understaffed {
            Some(NotProducingReason::NotEnoughWorkers)
        } else if partially_capped {
            Some(NotProducingReason::StoragePartialFull)
        } else {
            None
        };
        reasons.insert(xy, reason);
    }

    reasons
}

// ===========================================================================
// Tests
// ===========================================================================
