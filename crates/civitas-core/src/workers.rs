//! Per-tick worker allocation.
//!
//! Supply comes from housing (buildings whose output is the worker resource)
//! plus the process-wide base pool. Demanders are producing buildings,
//! construction sites, and in-flight shipments. Allocation is greedy in
//! priority order with coordinate tie-breaks, so it is deterministic and
//! never depends on unordered-map iteration.
//!
//! Partially staffed buildings are not gated off: they receive a graded
//! `worker factor` in [0, 1] that scales both consumption and production.

use crate::building::BuildingStatus;
use crate::catalog::Catalog;
use crate::construction::BUILDER_CREW;
use crate::fixed::{Fixed64, ceil_u32};
use crate::grid::TileXy;
use crate::id::TransportId;
use crate::modifier::ResolvedMultipliers;
use crate::state::GameState;
use crate::transport::CARRY_PER_WORKER;
use std::collections::BTreeMap;

// ---------------------------------------------------------------------------
// Allocation result
// ---------------------------------------------------------------------------

/// The outcome of one allocation pass. Invariant: `busy <= supply`.
#[derive(Debug, Clone, Default)]
pub struct Allocation {
    /// Workers granted per building tile.
    pub assigned: BTreeMap<TileXy, u32>,
    /// Whether each in-flight shipment got its carriers this tick.
    pub fuel: BTreeMap<TransportId, bool>,
    /// Total workers available this tick.
    pub supply: u32,
    /// Workers granted across buildings, sites, and shipments.
    pub busy: u32,
}

impl Allocation {
    pub fn idle(&self) -> u32 {
        self.supply.saturating_sub(self.busy)
    }
}

// ---------------------------------------------------------------------------
// Demand
// ---------------------------------------------------------------------------

/// Workers a building needs for full output: total per-cycle throughput
/// (inputs plus outputs, scaled by level) divided by the resolved worker
/// capacity. Housing requires no workers -- a building that outputs the
/// worker resource would otherwise deadlock the bootstrap.
pub fn required_workers(
    catalog: &Catalog,
    kind: crate::id::BuildingId,
    level: u32,
    worker_capacity: Fixed64,
) -> u32 {
    let def = catalog.building(kind);
    if def.output.contains_key(&catalog.worker()) {
        return 0;
    }
    let throughput: Fixed64 = def
        .input
        .values()
        .chain(def.output.values())
        .copied()
        .sum::<Fixed64>()
        * Fixed64::from_num(level);
    if throughput == Fixed64::ZERO {
        return 0;
    }
    let capacity = worker_capacity.max(Fixed64::from_num(1) / Fixed64::from_num(1000));
    ceil_u32(throughput / capacity, 0)
}

/// Carriers an in-flight shipment needs each tick.
pub fn carriers_required(amount: Fixed64) -> u32 {
    ceil_u32(amount / Fixed64::from_num(CARRY_PER_WORKER), 1)
}

// ---------------------------------------------------------------------------
// Allocation pass
// ---------------------------------------------------------------------------

/// Run the allocation for this tick. Writes `workers_assigned` onto each
/// building and returns the full allocation.
pub fn allocate(
    state: &mut GameState,
    catalog: &Catalog,
    resolved: &BTreeMap<TileXy, ResolvedMultipliers>,
) -> Allocation {
    let mut allocation = Allocation::default();

    // Supply: base pool plus housing output at resolved production strength.
    let worker = catalog.worker();
    let mut supply_fixed = state.base_workers;
    for (xy, building) in state.buildings() {
        if building.status != BuildingStatus::Active {
            continue;
        }
        let def = catalog.building(building.kind);
        if let Some(&rate) = def.output.get(&worker) {
            let mult = resolved
                .get(&xy)
                .map(|r| r.production)
                .unwrap_or(Fixed64::from_num(1));
            supply_fixed += rate * Fixed64::from_num(building.level) * mult;
        }
    }
    allocation.supply = supply_fixed.max(Fixed64::ZERO).to_num::<i64>() as u32;

    let mut remaining = allocation.supply;

    // Buildings and construction sites, priority order.
    for xy in state.buildings_by_priority() {
        let Some(building) = state.building_at(xy) else {
            continue;
        };
        let demand = match building.status {
            BuildingStatus::Active => {
                let capacity = resolved
                    .get(&xy)
                    .map(|r| r.worker_capacity)
                    .unwrap_or(Fixed64::from_num(1));
                required_workers(catalog, building.kind, building.level, capacity)
            }
            BuildingStatus::UnderConstruction | BuildingStatus::Upgrading => {
                if building.construction_paused {
                    0
                } else {
                    BUILDER_CREW
                }
            }
            BuildingStatus::Paused => 0,
        };
        let granted = demand.min(remaining);
        remaining -= granted;
        allocation.assigned.insert(xy, granted);
        if let Some(b) = state.building_at_mut(xy) {
            b.workers_assigned = granted;
        }
    }

    // Shipments: destination coordinate order, then creation order. A
    // shipment is staffed all-or-nothing; a partial crew moves nothing.
    for transports in state.transportation.values() {
        for transport in transports {
            let crew = carriers_required(transport.amount);
            let staffed = crew <= remaining;
            if staffed {
                remaining -= crew;
            }
            allocation.fuel.insert(transport.id, staffed);
        }
    }

    allocation.busy = allocation.supply - remaining;
    allocation
}

// ===========================================================================
// Tests
// ===========================================================================
