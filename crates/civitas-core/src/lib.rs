//! Civitas Core -- the tick simulation engine for an idle city-building
//! game.
//!
//! A hex grid of tiles holds buildings that consume and produce resources
//! every discrete tick, ship goods to each other through a routed logistics
//! layer, and grow through construction, upgrades, and technology unlocks.
//! Rendering, UI, and networking are external consumers of the published
//! state; they issue commands and read snapshots, never mutating mid-tick.
//!
//! # Seven-Phase Tick Pipeline
//!
//! Each call to [`tick::Engine::step`] advances the simulation by one tick:
//!
//! 1. **Pre-tick** -- drain and apply the queued commands.
//! 2. **Resolve** -- fold technology/wonder/great-person boosts into per-
//!    building resolved multipliers.
//! 3. **Workers** -- allocate the worker supply by priority.
//! 4. **Production** -- buildings consume inputs and produce outputs.
//! 5. **Transportation** -- advance in-flight shipments, then plan new ones.
//! 6. **Construction** -- sites consume delivered resources and complete.
//! 7. **Bookkeeping** -- worker science, tick counter, state hash, summary.
//!
//! # Key Types
//!
//! - [`tick::Engine`] -- orchestrator owning the [`state::GameState`].
//! - [`grid::HexGrid`] -- pure hex geometry: neighbors, distance, pixels.
//! - [`catalog::Catalog`] -- immutable resource/building definitions
//!   (frozen at startup).
//! - [`modifier`] -- additive boost aggregation into resolved multipliers.
//! - [`transport::Transport`] -- one in-flight shipment with travel time.
//! - [`command::Command`] -- validated mutations applied at tick boundaries.
//! - [`serialize`] -- versioned bitcode snapshots.
//! - [`fixed::Fixed64`] -- Q32.32 fixed-point for deterministic math.

pub mod building;
pub mod catalog;
pub mod command;
pub mod construction;
pub mod event;
pub mod fixed;
pub mod grid;
pub mod id;
pub mod modifier;
pub mod production;
pub mod rng;
pub mod serialize;
pub mod state;
pub mod tick;
pub mod trade;
pub mod transport;
pub mod workers;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
