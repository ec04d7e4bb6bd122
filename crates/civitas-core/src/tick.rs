//! The tick orchestrator: owns the game state and runs the fixed phase
//! pipeline once per simulation step.
//!
//! # Phase order
//!
//! 1. **Pre-tick** -- drain the command queue; each command is re-validated
//!    and applied, or dropped with a `CommandRejected` event.
//! 2. **Resolve** -- recompute every building's resolved multipliers into
//!    the tick summary cache.
//! 3. **Workers** -- allocate the worker supply across buildings, sites,
//!    and shipments.
//! 4. **Production** -- buildings consume inputs and produce outputs.
//! 5. **Transportation** -- advance in-flight shipments, then plan new ones.
//! 6. **Construction** -- sites consume delivered resources and complete.
//! 7. **Bookkeeping** -- credit worker science, bump the tick counter,
//!    compute the state hash, publish the summary.
//!
//! Each phase reads the previous phase's committed deltas; nothing observes
//! a partially-updated sibling. Between ticks the state is read-only to all
//! external consumers, and there is no blocking I/O inside a tick.

use crate::building::BuildingStatus;
use crate::catalog::Catalog;
use crate::command::{self, Command, CommandError, CommandQueue};
use crate::event::{Event, EventBus};
use crate::fixed::{Fixed64, Ticks};
use crate::grid::{HexGrid, TileXy};
use crate::id::{BuildingId, GreatPersonId, TechId};
use crate::modifier::{self, Boost, BoostEntry, BoostOrigin, MultiplierKind, ResolvedMultipliers};
use crate::production::{self, NotProducingReason};
use crate::state::GameState;
use crate::workers::{self, required_workers};
use crate::{construction, transport};
use std::collections::BTreeMap;

// ---------------------------------------------------------------------------
// Tick summary
// ---------------------------------------------------------------------------

/// Per-building slice of the published summary.
#[derive(Debug, Clone)]
pub struct BuildingSummary {
    pub kind: BuildingId,
    pub level: u32,
    pub status: BuildingStatus,
    pub resolved: ResolvedMultipliers,
    pub required_workers: u32,
    pub assigned_workers: u32,
    pub reason: Option<NotProducingReason>,
}

/// The resolved-definition cache published after every tick: what the UI
/// reads instead of re-deriving multipliers and worker stats itself.
#[derive(Debug, Clone, Default)]
pub struct TickSummary {
    pub tick: Ticks,
    pub buildings: BTreeMap<TileXy, BuildingSummary>,
    pub workers_available: u32,
    pub workers_busy: u32,
    pub transports_in_flight: usize,
    pub science_per_tick: Fixed64,
}

// ---------------------------------------------------------------------------
// State hash
// ---------------------------------------------------------------------------

/// A simple deterministic hash of simulation state for desync detection and
/// save/load verification. FNV-1a, not cryptographic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateHash(u64);

impl StateHash {
    const FNV_OFFSET: u64 = 0xcbf29ce484222325;
    const FNV_PRIME: u64 = 0x100000001b3;

    pub fn new() -> Self {
        Self(Self::FNV_OFFSET)
    }

    pub fn write(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.0 ^= b as u64;
            self.0 = self.0.wrapping_mul(Self::FNV_PRIME);
        }
    }

    pub fn write_u64(&mut self, v: u64) {
        self.write(&v.to_le_bytes());
    }

    pub fn write_u32(&mut self, v: u32) {
        self.write(&v.to_le_bytes());
    }

    pub fn write_fixed64(&mut self, v: Fixed64) {
        self.write(&v.to_bits().to_le_bytes());
    }

    pub fn finish(self) -> u64 {
        self.0
    }
}

impl Default for StateHash {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// The simulation engine. Owns the game state exclusively during a tick;
/// everything external reads the committed snapshot between ticks and
/// mutates through [`Engine::submit`].
#[derive(Debug)]
pub struct Engine {
    grid: HexGrid,
    catalog: Catalog,
    state: GameState,
    tick: Ticks,
    commands: CommandQueue,
    pub event_bus: EventBus,
    summary: TickSummary,
    last_state_hash: u64,
}

impl Engine {
    pub fn new(grid: HexGrid, catalog: Catalog, state: GameState) -> Self {
        let mut engine = Self {
            grid,
            catalog,
            state,
            tick: 0,
            commands: CommandQueue::with_max_history(256),
            event_bus: EventBus::new(),
            summary: TickSummary::default(),
            last_state_hash: 0,
        };
        engine.last_state_hash = engine.compute_state_hash();
        engine.publish_summary(&BTreeMap::new(), None, &BTreeMap::new());
        engine
    }

    /// Restore an engine from deserialized parts (see `crate::serialize`).
    pub(crate) fn from_parts(
        grid: HexGrid,
        catalog: Catalog,
        state: GameState,
        tick: Ticks,
    ) -> Self {
        let mut engine = Self {
            grid,
            catalog,
            state,
            tick,
            commands: CommandQueue::with_max_history(256),
            event_bus: EventBus::new(),
            summary: TickSummary::default(),
            last_state_hash: 0,
        };
        engine.last_state_hash = engine.compute_state_hash();
        engine.publish_summary(&BTreeMap::new(), None, &BTreeMap::new());
        engine
    }

    // -----------------------------------------------------------------------
    // Read-only access (between ticks)
    // -----------------------------------------------------------------------

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn grid(&self) -> &HexGrid {
        &self.grid
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn tick(&self) -> Ticks {
        self.tick
    }

    /// The resolved-definition cache from the most recent tick.
    pub fn current(&self) -> &TickSummary {
        &self.summary
    }

    pub fn state_hash(&self) -> u64 {
        self.last_state_hash
    }

    /// Direct mutable state access for test fixtures and world-gen tooling.
    /// Only compiled with the `test-utils` feature; game code mutates
    /// through commands.
    #[cfg(any(test, feature = "test-utils"))]
    pub fn state_mut(&mut self) -> &mut GameState {
        &mut self.state
    }

    /// Take all events buffered since the last drain.
    pub fn drain_events(&mut self) -> Vec<Event> {
        self.event_bus.drain()
    }

    // -----------------------------------------------------------------------
    // Commands
    // -----------------------------------------------------------------------

    /// Validate a command against the committed state and queue it for the
    /// next tick boundary. Rejection is synchronous and leaves the state
    /// untouched.
    pub fn submit(&mut self, command: Command) -> Result<(), CommandError> {
        command::validate(&command, &self.state, &self.catalog, &self.grid)?;
        self.commands.push(command);
        Ok(())
    }

    pub fn pending_commands(&self) -> usize {
        self.commands.pending_count()
    }

    // -----------------------------------------------------------------------
    // Unlocks (applied between ticks, i.e. at the tick boundary)
    // -----------------------------------------------------------------------

    /// Record a technology unlock and its boosts. Returns false if already
    /// unlocked (effects are idempotent; nothing is double-applied).
    pub fn unlock_tech(&mut self, tech: TechId, boosts: Vec<Boost>) -> bool {
        if !self.state.record_tech(tech) {
            return false;
        }
        self.state.push_boosts(boosts.into_iter().map(|boost| BoostEntry {
            boost,
            origin: BoostOrigin::Technology(tech),
            anchor: None,
        }));
        self.event_bus.emit(Event::TechUnlocked {
            tech,
            tick: self.tick,
        });
        true
    }

    /// Record a great person and their boosts. Idempotent like
    /// [`Engine::unlock_tech`].
    pub fn add_great_person(&mut self, person: GreatPersonId, boosts: Vec<Boost>) -> bool {
        if !self.state.record_great_person(person) {
            return false;
        }
        self.state.push_boosts(boosts.into_iter().map(|boost| BoostEntry {
            boost,
            origin: BoostOrigin::GreatPerson(person),
            anchor: None,
        }));
        self.event_bus.emit(Event::GreatPersonBorn {
            person,
            tick: self.tick,
        });
        true
    }

    /// Deduct research spending from the science counter. Returns false
    /// (and deducts nothing) when the balance is insufficient.
    pub fn spend_science(&mut self, amount: Fixed64) -> bool {
        if self.state.science < amount {
            return false;
        }
        self.state.science -= amount;
        true
    }

    // -----------------------------------------------------------------------
    // Step
    // -----------------------------------------------------------------------

    /// Advance the simulation by one tick.
    pub fn step(&mut self) {
        // Phase 1: pre-tick -- apply queued commands.
        for command in self.commands.drain(self.tick) {
            if let Err(reason) = command::apply(
                command,
                &mut self.state,
                &self.catalog,
                &self.grid,
                &mut self.event_bus,
                self.tick,
            ) {
                self.event_bus.emit(Event::CommandRejected {
                    reason,
                    tick: self.tick,
                });
            }
        }

        // Phase 2: resolve multipliers for every placed building.
        let resolved: BTreeMap<TileXy, ResolvedMultipliers> = self
            .state
            .buildings()
            .map(|(xy, _)| {
                (
                    xy,
                    ResolvedMultipliers::resolve_all(&self.state, &self.catalog, &self.grid, xy),
                )
            })
            .collect();

        // Phase 3: workers.
        let allocation = workers::allocate(&mut self.state, &self.catalog, &resolved);

        // Phase 4: production.
        let reasons = production::run(&mut self.state, &self.catalog, &allocation, &resolved);

        // Phase 5: transportation -- advance, then plan. New shipments never
        // move on the tick they are created.
        transport::advance(
            &mut self.state,
            &self.catalog,
            &allocation,
            &resolved,
            &mut self.event_bus,
            self.tick,
        );
        transport::plan(&mut self.state, &self.catalog, &self.grid, &resolved);

        // Phase 6: construction.
        construction::run(
            &mut self.state,
            &self.catalog,
            &allocation,
            &mut self.event_bus,
            self.tick,
        );

        // Phase 7: bookkeeping.
        let idle_rate = modifier::resolve_rate(&self.state, MultiplierKind::ScienceFromIdleWorkers);
        let busy_rate = modifier::resolve_rate(&self.state, MultiplierKind::ScienceFromBusyWorkers);
        let worker_science = Fixed64::from_num(allocation.idle()) * idle_rate
            + Fixed64::from_num(allocation.busy) * busy_rate;
        self.state.science += worker_science;

        self.tick += 1;
        self.last_state_hash = self.compute_state_hash();
        self.publish_summary(&resolved, Some(&allocation), &reasons);
        self.summary.science_per_tick = worker_science;
    }

    // -----------------------------------------------------------------------
    // Summary
    // -----------------------------------------------------------------------

    fn publish_summary(
        &mut self,
        resolved: &BTreeMap<TileXy, ResolvedMultipliers>,
        allocation: Option<&workers::Allocation>,
        reasons: &BTreeMap<TileXy, Option<NotProducingReason>>,
    ) {
        let mut buildings = BTreeMap::new();
        for (xy, building) in self.state.buildings() {
            let mults = resolved.get(&xy).copied().unwrap_or_else(|| {
                ResolvedMultipliers::resolve_all(&self.state, &self.catalog, &self.grid, xy)
            });
            buildings.insert(
                xy,
                BuildingSummary {
                    kind: building.kind,
                    level: building.level,
                    status: building.status,
                    resolved: mults,
                    required_workers: required_workers(
                        &self.catalog,
                        building.kind,
                        building.level,
                        mults.worker_capacity,
                    ),
                    assigned_workers: building.workers_assigned,
                    reason: reasons.get(&xy).copied().flatten(),
                },
            );
        }
        self.summary = TickSummary {
            tick: self.tick,
            buildings,
            workers_available: allocation.map(|a| a.supply).unwrap_or(0),
            workers_busy: allocation.map(|a| a.busy).unwrap_or(0),
            transports_in_flight: self.state.transports_in_flight(),
            science_per_tick: Fixed64::ZERO,
        };
    }

    // -----------------------------------------------------------------------
    // Hashing
    // -----------------------------------------------------------------------

    /// Deterministic hash over everything that defines simulation behavior.
    pub(crate) fn compute_state_hash(&self) -> u64 {
        let mut hasher = StateHash::new();
        hasher.write_u64(self.tick);
        hasher.write_fixed64(self.state.cash);
        hasher.write_fixed64(self.state.science);
        hasher.write_fixed64(self.state.faith);
        hasher.write_fixed64(self.state.base_workers);

        // Tiles iterate in BTreeMap (coordinate) order: deterministic.
        for tile in self.state.tiles() {
            if let Some(deposit) = tile.deposit {
                hasher.write_u32(deposit.0);
            }
            let Some(building) = &tile.building else {
                continue;
            };
            hasher.write_u32(building.kind.0);
            hasher.write_u32(building.level);
            hasher.write_u32(match building.status {
                BuildingStatus::UnderConstruction => 0,
                BuildingStatus::Active => 1,
                BuildingStatus::Upgrading => 2,
                BuildingStatus::Paused => 3,
            });
            hasher.write_u32(building.priority as u32);
            for (&resource, &amount) in &building.resources {
                hasher.write_u32(resource.0);
                hasher.write_fixed64(amount);
            }
            for (&resource, &amount) in &building.construction_spent {
                hasher.write_u32(resource.0);
                hasher.write_fixed64(amount);
            }
        }

        for transports in self.state.transportation().values() {
            for t in transports {
                hasher.write_u64(t.id.0);
                hasher.write_u32(t.resource.0);
                hasher.write_fixed64(t.amount);
                hasher.write_u32(t.ticks_spent);
                hasher.write_u32(t.ticks_required);
            }
        }

        for tech in self.state.unlocked_techs() {
            hasher.write_u32(tech.0);
        }
        for person in self.state.great_people() {
            hasher.write_u32(person.0);
        }
        hasher.write_u64(self.state.boosts().len() as u64);

        hasher.finish()
    }
}

// ===========================================================================
// Tests
// ===========================================================================
