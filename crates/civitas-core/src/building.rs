//! Runtime state of a placed building.

use crate::fixed::Fixed64;
use crate::id::{BuildingId, ResourceId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Lifecycle status. Transitions:
/// `UnderConstruction -> Active`, `Active -> Upgrading -> Active`,
/// `Active <-> Paused` (manual toggle). Removal (sell) is terminal and
/// forfeits stored resources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BuildingStatus {
    UnderConstruction,
    Active,
    Upgrading,
    Paused,
}

/// How far ahead a building pre-fetches an input, in production cycles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StockpileMax {
    Cycles(u32),
    Unlimited,
}

/// Default pre-fetch horizon.
pub const DEFAULT_STOCKPILE_CYCLES: u32 = 5;

/// Default production priority (valid range 1..=10).
pub const DEFAULT_PRIORITY: u8 = 5;

/// A building placed on a tile. Owned exclusively by its [`Tile`]
/// (`crate::state::Tile`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Building {
    pub kind: BuildingId,
    /// 0 while under initial construction; >= 1 once Active.
    pub level: u32,
    pub status: BuildingStatus,
    /// Stored amounts, each bounded by the resolved per-resource capacity.
    pub resources: BTreeMap<ResourceId, Fixed64>,
    /// Workers granted by the most recent allocation pass. Transient within
    /// a tick but serialized so a snapshot reflects the published state.
    pub workers_assigned: u32,
    /// Higher produces (and fetches inputs) first. 1..=10.
    pub priority: u8,
    /// Multiplier on the per-cycle input batch fetched by the planner.
    pub stockpile_capacity: Fixed64,
    pub stockpile_max: StockpileMax,
    /// Per-building override added into every resolved multiplier.
    pub base_multiplier: Fixed64,
    /// Construction/upgrade bill already consumed by builders, per resource.
    pub construction_spent: BTreeMap<ResourceId, Fixed64>,
    /// Manual hold on construction/upgrade progress. Delivered resources are
    /// retained.
    pub construction_paused: bool,
}

impl Building {
    /// A freshly placed building awaiting construction.
    pub fn new(kind: BuildingId) -> Self {
        Self {
            kind,
            level: 0,
            status: BuildingStatus::UnderConstruction,
            resources: BTreeMap::new(),
            workers_assigned: 0,
            priority: DEFAULT_PRIORITY,
            stockpile_capacity: Fixed64::from_num(1),
            stockpile_max: StockpileMax::Cycles(DEFAULT_STOCKPILE_CYCLES),
            base_multiplier: Fixed64::from_num(1),
            construction_spent: BTreeMap::new(),
            construction_paused: false,
        }
    }

    /// A building that starts life Active at level 1 (zero-cost placements,
    /// world generation).
    pub fn new_active(kind: BuildingId) -> Self {
        let mut b = Self::new(kind);
        b.level = 1;
        b.status = BuildingStatus::Active;
        b
    }

    pub fn stored(&self, resource: ResourceId) -> Fixed64 {
        self.resources.get(&resource).copied().unwrap_or(Fixed64::ZERO)
    }

    /// Add an amount, clamped to `capacity`. Returns the overflow that did
    /// not fit (the caller decides whether that overflow is lost).
    #[must_use = "overflow indicates amount that did not fit"]
    pub fn add_capped(&mut self, resource: ResourceId, amount: Fixed64, capacity: Fixed64) -> Fixed64 {
        let current = self.stored(resource);
        let space = (capacity - current).max(Fixed64::ZERO);
        let accepted = amount.min(space);
        if accepted > Fixed64::ZERO {
            *self.resources.entry(resource).or_insert(Fixed64::ZERO) += accepted;
        }
        amount - accepted
    }

    /// Remove up to `amount`. Returns the amount actually removed.
    #[must_use = "returns the amount actually removed, which may be less than requested"]
    pub fn remove(&mut self, resource: ResourceId, amount: Fixed64) -> Fixed64 {
        let current = self.stored(resource);
        let removed = amount.min(current);
        if removed > Fixed64::ZERO {
            let left = current - removed;
            if left > Fixed64::ZERO {
                self.resources.insert(resource, left);
            } else {
                self.resources.remove(&resource);
            }
        }
        removed
    }

    /// Total stored across all resources.
    pub fn total_stored(&self) -> Fixed64 {
        self.resources.values().copied().sum()
    }
}

// ===========================================================================
// Tests
// ===========================================================================
