//! Game content for the Civitas engine: the serde schema for RON/JSON
//! content files, the loader that resolves name references into a frozen
//! catalog and tech tree, and the built-in bronze-age content set.

pub mod loader;
pub mod schema;

pub use loader::{DataLoadError, Format, GameContent, detect_format, load_game_data, parse_game_data, resolve};

use civitas_core::fixed::Fixed64;
use civitas_core::grid::HexGrid;
use civitas_core::state::GameState;
use civitas_core::tick::Engine;

/// The built-in bronze-age content file.
const BRONZE_AGE_RON: &str = include_str!("../data/bronze_age.ron");

/// Load and resolve the built-in bronze-age content set.
pub fn bronze_age() -> Result<GameContent, DataLoadError> {
    let data = parse_game_data(BRONZE_AGE_RON, Format::Ron)?;
    resolve(&data)
}

/// Starting stock seeded into the headquarter so a new city can bootstrap
/// its first construction sites.
const STARTING_STOCK: &[(&str, f64)] = &[("Wood", 40.0), ("Stone", 20.0), ("Wheat", 20.0)];

/// Starting process-wide worker pool.
const STARTING_WORKERS: u32 = 12;

/// A ready-to-run engine plus the tech tree over the built-in content.
pub struct NewGame {
    pub engine: Engine,
    pub tech_names: std::collections::BTreeMap<String, civitas_core::id::TechId>,
    pub tech_tree: civitas_tech::TechTree,
    pub person_names: std::collections::BTreeMap<String, civitas_core::id::GreatPersonId>,
}

/// Generate a fresh bronze-age city: deposits scattered from the seed, the
/// headquarter placed and stocked, the base worker pool filled.
pub fn new_game(width: u32, height: u32, seed: u64) -> Result<NewGame, DataLoadError> {
    let content = bronze_age()?;
    let grid = HexGrid::new(width, height);
    let mut state = GameState::generate(&grid, &content.catalog, seed);
    state.base_workers = Fixed64::from_num(STARTING_WORKERS);

    if let Some(hq) = state.headquarter_xy(&content.catalog)
        && let Some(kind) = state.building_at(hq).map(|b| b.kind)
    {
        let storage = content.catalog.building(kind).base_storage;
        for (name, amount) in STARTING_STOCK {
            if let Some(resource) = content.catalog.resource_id(name)
                && let Some(building) = state.building_at_mut(hq)
            {
                let _ = building.add_capped(resource, Fixed64::from_num(*amount), storage);
            }
        }
    }

    Ok(NewGame {
        engine: Engine::new(grid, content.catalog, state),
        tech_names: content.tech_names,
        tech_tree: content.tech_tree,
        person_names: content.person_names,
    })
}

// ===========================================================================
// Tests
// ===========================================================================
