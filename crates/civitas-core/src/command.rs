//! Externally-submitted commands.
//!
//! UI, scripting, and network collaborators never mutate the game state
//! directly: they submit commands, which are validated synchronously against
//! the committed state and executed at the next tick boundary. Execution
//! re-validates -- a command invalidated by an earlier command in the same
//! drain is dropped with a [`CommandRejected`](crate::event::Event) event
//! rather than corrupting the tick.

use crate::building::{Building, BuildingStatus, StockpileMax};
use crate::catalog::{BuildingSpecial, Catalog};
use crate::event::{Event, EventBus};
use crate::fixed::{Fixed64, Ticks};
use crate::grid::{HexGrid, TileXy};
use crate::id::BuildingId;
use crate::state::GameState;
use crate::trade::{self, TradeOffer};

// ---------------------------------------------------------------------------
// Command enum
// ---------------------------------------------------------------------------

/// A single atomic operation on the simulation, applied at a tick boundary.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Place a new building. Zero-cost buildings activate immediately;
    /// everything else starts under construction.
    Build { xy: TileXy, kind: BuildingId },
    /// Demolish a building. Stored resources and in-flight deliveries are
    /// forfeited.
    Sell { xy: TileXy },
    /// Toggle an Active building to Paused and back.
    TogglePause { xy: TileXy },
    SetPriority { xy: TileXy, priority: u8 },
    SetStockpile {
        xy: TileXy,
        capacity: Fixed64,
        max: StockpileMax,
    },
    /// Begin upgrading an Active building.
    Upgrade { xy: TileXy },
    /// Abort an upgrade. Delivered-but-unconsumed resources stay in storage;
    /// resources builders already consumed are not returned.
    CancelUpgrade { xy: TileXy },
    /// Hold or resume a construction/upgrade site.
    ToggleConstructionPause { xy: TileXy },
    /// Fill a player trade offer through the headquarter.
    FillTrade { offer: TradeOffer },
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Typed rejection reasons. Surfaced synchronously to the issuing
/// collaborator; the state is never changed by a rejected command.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CommandError {
    #[error("tile {0} is outside the map")]
    OutOfBounds(TileXy),
    #[error("tile {0} is already occupied")]
    TileOccupied(TileXy),
    #[error("tile {0} has no building")]
    NoBuilding(TileXy),
    #[error("tile {0} lacks the deposit this building requires")]
    MissingDeposit(TileXy),
    /// Distinct from [`CommandError::BuildingLimitReached`]: a unique wonder
    /// already exists somewhere on the map (any status).
    #[error("this wonder has already been built")]
    WonderAlreadyExists,
    #[error("the building limit for this kind has been reached")]
    BuildingLimitReached,
    #[error("building at {0} is not active")]
    NotActive(TileXy),
    #[error("building at {0} is not upgrading")]
    NotUpgrading(TileXy),
    #[error("building at {0} is not under construction or upgrading")]
    NotUnderConstruction(TileXy),
    #[error("the headquarter cannot be sold")]
    CannotSellHeadquarter,
    #[error("wonders cannot be upgraded")]
    CannotUpgradeWonder,
    #[error("priority {0} is outside 1..=10")]
    InvalidPriority(u8),
    #[error("stockpile capacity {0} is outside 1..=5")]
    InvalidStockpileCapacity(Fixed64),
    #[error("stockpile max of {0} cycles is outside 1..=50")]
    InvalidStockpileMax(u32),
    #[error("no headquarter is standing")]
    NoHeadquarter,
    #[error("not enough of the wanted resource in headquarter storage")]
    NotEnoughResources,
    #[error("not enough storage for the trade proceeds")]
    NotEnoughStorage,
    #[error("tariff must be in [0, 1)")]
    InvalidTariff,
    #[error("only material resources can be traded")]
    NotTradeable,
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Check a command against the current state without changing anything.
pub fn validate(
    command: &Command,
    state: &GameState,
    catalog: &Catalog,
    grid: &HexGrid,
) -> Result<(), CommandError> {
    match command {
        Command::Build { xy, kind } => {
            if !grid.contains(*xy) {
                return Err(CommandError::OutOfBounds(*xy));
            }
            let tile = state.tile(*xy).ok_or(CommandError::OutOfBounds(*xy))?;
            if tile.building.is_some() {
                return Err(CommandError::TileOccupied(*xy));
            }
            let def = catalog.building(*kind);
            if let Some(required) = def.deposit
                && tile.deposit != Some(required)
            {
                return Err(CommandError::MissingDeposit(*xy));
            }
            if let Some(max) = def.max {
                let standing = state.count_buildings(*kind);
                if def.is_wonder() && standing >= 1 {
                    return Err(CommandError::WonderAlreadyExists);
                }
                if standing >= max as usize {
                    return Err(CommandError::BuildingLimitReached);
                }
            }
            Ok(())
        }
        Command::Sell { xy } => {
            let building = state
                .building_at(*xy)
                .ok_or(CommandError::NoBuilding(*xy))?;
            if catalog.building(building.kind).special == BuildingSpecial::Headquarter {
                return Err(CommandError::CannotSellHeadquarter);
            }
            Ok(())
        }
        Command::TogglePause { xy } => {
            let building = state
                .building_at(*xy)
                .ok_or(CommandError::NoBuilding(*xy))?;
            match building.status {
                BuildingStatus::Active | BuildingStatus::Paused => Ok(()),
                _ => Err(CommandError::NotActive(*xy)),
            }
        }
        Command::SetPriority { xy, priority } => {
            state
                .building_at(*xy)
                .ok_or(CommandError::NoBuilding(*xy))?;
            if !(1..=10).contains(priority) {
                return Err(CommandError::InvalidPriority(*priority));
            }
            Ok(())
        }
        Command::SetStockpile { xy, capacity, max } => {
            state
                .building_at(*xy)
                .ok_or(CommandError::NoBuilding(*xy))?;
            if *capacity < Fixed64::from_num(1) || *capacity > Fixed64::from_num(5) {
                return Err(CommandError::InvalidStockpileCapacity(*capacity));
            }
            if let StockpileMax::Cycles(cycles) = max
                && !(1..=50).contains(cycles)
            {
                return Err(CommandError::InvalidStockpileMax(*cycles));
            }
            Ok(())
        }
        Command::Upgrade { xy } => {
            let building = state
                .building_at(*xy)
                .ok_or(CommandError::NoBuilding(*xy))?;
            if catalog.building(building.kind).is_wonder() {
                return Err(CommandError::CannotUpgradeWonder);
            }
            if building.status != BuildingStatus::Active {
                return Err(CommandError::NotActive(*xy));
            }
            Ok(())
        }
        Command::CancelUpgrade { xy } => {
            let building = state
                .building_at(*xy)
                .ok_or(CommandError::NoBuilding(*xy))?;
            if building.status != BuildingStatus::Upgrading {
                return Err(CommandError::NotUpgrading(*xy));
            }
            Ok(())
        }
        Command::ToggleConstructionPause { xy } => {
            let building = state
                .building_at(*xy)
                .ok_or(CommandError::NoBuilding(*xy))?;
            match building.status {
                BuildingStatus::UnderConstruction | BuildingStatus::Upgrading => Ok(()),
                _ => Err(CommandError::NotUnderConstruction(*xy)),
            }
        }
        Command::FillTrade { offer } => trade::validate_fill(state, catalog, grid, offer),
    }
}

// ---------------------------------------------------------------------------
// Application
// ---------------------------------------------------------------------------

/// Re-validate and apply one command. Called at the tick boundary.
pub fn apply(
    command: Command,
    state: &mut GameState,
    catalog: &Catalog,
    grid: &HexGrid,
    events: &mut EventBus,
    tick: Ticks,
) -> Result<(), CommandError> {
    validate(&command, state, catalog, grid)?;
    match command {
        Command::Build { xy, kind } => {
            let def = catalog.building(kind);
            let building = if def.construction_cost.is_empty() {
                Building::new_active(kind)
            } else {
                Building::new(kind)
            };
            if let Some(tile) = state.tile_mut(xy) {
                tile.building = Some(building);
            }
            events.emit(Event::BuildingPlaced { xy, kind, tick });
        }
        Command::Sell { xy } => {
            let kind = state
                .building_at(xy)
                .map(|b| b.kind)
                .ok_or(CommandError::NoBuilding(xy))?;
            if let Some(tile) = state.tile_mut(xy) {
                tile.building = None;
            }
            state.remove_wonder_boosts(xy);
            events.emit(Event::BuildingSold { xy, kind, tick });
        }
        Command::TogglePause { xy } => {
            if let Some(building) = state.building_at_mut(xy) {
                building.status = match building.status {
                    BuildingStatus::Active => BuildingStatus::Paused,
                    _ => BuildingStatus::Active,
                };
            }
        }
        Command::SetPriority { xy, priority } => {
            if let Some(building) = state.building_at_mut(xy) {
                building.priority = priority;
            }
        }
        Command::SetStockpile { xy, capacity, max } => {
            if let Some(building) = state.building_at_mut(xy) {
                building.stockpile_capacity = capacity;
                building.stockpile_max = max;
            }
        }
        Command::Upgrade { xy } => {
            if let Some(building) = state.building_at_mut(xy) {
                building.status = BuildingStatus::Upgrading;
            }
        }
        Command::CancelUpgrade { xy } => {
            if let Some(building) = state.building_at_mut(xy) {
                building.status = BuildingStatus::Active;
                // Consumed bill is lost; delivered stock stays in storage.
                building.construction_spent.clear();
            }
        }
        Command::ToggleConstructionPause { xy } => {
            if let Some(building) = state.building_at_mut(xy) {
                building.construction_paused = !building.construction_paused;
            }
        }
        Command::FillTrade { offer } => {
            trade::apply_fill(state, catalog, grid, &offer, events, tick);
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// CommandQueue
// ---------------------------------------------------------------------------

/// Commands waiting for the next tick boundary, with optional history for
/// replay/debugging.
#[derive(Debug, Default)]
pub struct CommandQueue {
    pending: Vec<Command>,
    history: Vec<(Ticks, Command)>,
    max_history: usize,
}

impl CommandQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Retain up to `max_history` executed commands.
    pub fn with_max_history(max_history: usize) -> Self {
        Self {
            max_history,
            ..Self::default()
        }
    }

    pub fn push(&mut self, command: Command) {
        self.pending.push(command);
    }

    /// Drain all pending commands in submission order, recording them into
    /// history against the given tick.
    pub fn drain(&mut self, tick: Ticks) -> Vec<Command> {
        let commands: Vec<Command> = self.pending.drain(..).collect();
        if self.max_history > 0 {
            for command in &commands {
                self.history.push((tick, command.clone()));
            }
            let excess = self.history.len().saturating_sub(self.max_history);
            if excess > 0 {
                self.history.drain(..excess);
            }
        }
        commands
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn history(&self) -> &[(Ticks, Command)] {
        &self.history
    }
}

// ===========================================================================
// Tests
// ===========================================================================
