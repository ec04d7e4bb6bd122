//! Snapshot persistence.
//!
//! Binary serialization via `bitcode` with a versioned header validated
//! before decode. The catalog is static content and is not part of the
//! snapshot: loading takes the catalog the game was built with. A
//! round-trip reproduces identical simulation behavior -- equal state
//! hashes after equal further ticks.

use crate::catalog::Catalog;
use crate::fixed::Ticks;
use crate::grid::HexGrid;
use crate::state::GameState;
use crate::tick::Engine;
use serde::{Deserialize, Serialize};

/// Magic number identifying a Civitas snapshot.
pub const SNAPSHOT_MAGIC: u32 = 0xC117_0001;

/// Current format version. Increment when breaking the wire format.
pub const FORMAT_VERSION: u32 = 1;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors that can occur during save.
#[derive(Debug, thiserror::Error)]
pub enum SaveError {
    #[error("bitcode encoding failed: {0}")]
    Encode(String),
}

/// Errors that can occur during load. Corrupted state fails here explicitly
/// rather than producing an inconsistent simulation.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("data too short for a snapshot header")]
    TooShort,
    #[error("invalid magic number: expected 0x{:08X}, got 0x{:08X}", SNAPSHOT_MAGIC, .0)]
    InvalidMagic(u32),
    #[error("snapshot from future version {0} (this build supports up to {FORMAT_VERSION})")]
    FutureVersion(u32),
    #[error("unsupported format version {0}")]
    UnsupportedVersion(u32),
    #[error("bitcode decoding failed: {0}")]
    Decode(String),
}

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// Header prepended to every snapshot, checked before the payload is used.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotHeader {
    pub magic: u32,
    pub version: u32,
    pub tick: Ticks,
}

impl SnapshotHeader {
    pub fn new(tick: Ticks) -> Self {
        Self {
            magic: SNAPSHOT_MAGIC,
            version: FORMAT_VERSION,
            tick,
        }
    }

    pub fn validate(&self) -> Result<(), LoadError> {
        if self.magic != SNAPSHOT_MAGIC {
            return Err(LoadError::InvalidMagic(self.magic));
        }
        if self.version > FORMAT_VERSION {
            return Err(LoadError::FutureVersion(self.version));
        }
        if self.version < FORMAT_VERSION {
            return Err(LoadError::UnsupportedVersion(self.version));
        }
        Ok(())
    }
}

/// The serializable portion of an engine. Excludes the event bus and the
/// command queue (both drained at boundaries) and the tick summary (rebuilt).
#[derive(Debug, Serialize, Deserialize)]
struct EngineSnapshot {
    header: SnapshotHeader,
    grid: HexGrid,
    state: GameState,
}

// ---------------------------------------------------------------------------
// Save / load
// ---------------------------------------------------------------------------

/// Serialize the engine into a snapshot.
pub fn save(engine: &Engine) -> Result<Vec<u8>, SaveError> {
    let snapshot = EngineSnapshot {
        header: SnapshotHeader::new(engine.tick()),
        grid: engine.grid().clone(),
        state: engine.state().clone(),
    };
    bitcode::serialize(&snapshot).map_err(|e| SaveError::Encode(e.to_string()))
}

/// Deserialize a snapshot into a fresh engine against the given catalog.
pub fn load(data: &[u8], catalog: Catalog) -> Result<Engine, LoadError> {
    if data.len() < 8 {
        return Err(LoadError::TooShort);
    }
    let snapshot: EngineSnapshot =
        bitcode::deserialize(data).map_err(|e| LoadError::Decode(e.to_string()))?;
    snapshot.header.validate()?;
    Ok(Engine::from_parts(
        snapshot.grid,
        catalog,
        snapshot.state,
        snapshot.header.tick,
    ))
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{
        BuildingDef, BuildingSpecial, CatalogBuilder, ResourceDef, ResourceKind,
    };
    use crate::command::Command;
    use crate::fixed::f64_to_fixed64;
    use crate::grid::TileXy;
    use crate::state::GameState;
    use std::collections::BTreeMap;

    fn catalog() -> Catalog {
        let mut builder = CatalogBuilder::new();
        let worker = builder
            .register_resource(ResourceDef {
                name: "Worker".into(),
                tier: 0,
                kind: ResourceKind::Worker,
                deposit: false,
            })
            .unwrap();
        let wheat = builder
            .register_resource(ResourceDef {
                name: "Wheat".into(),
                tier: 1,
                kind: ResourceKind::Material,
                deposit: false,
            })
            .unwrap();
        let blank = BuildingDef {
            name: String::new(),
            tier: 1,
            input: BTreeMap::new(),
            output: BTreeMap::new(),
            construction_cost: BTreeMap::new(),
            base_storage: f64_to_fixed64(100.0),
            deposit: None,
            max: None,
            wonder_boosts: Vec::new(),
            special: BuildingSpecial::None,
        };
        let mut hq = blank.clone();
        hq.name = "Headquarter".into();
        hq.special = BuildingSpecial::Headquarter;
        builder.register_building(hq).unwrap();
        let mut hut = blank.clone();
        hut.name = "Hut".into();
        hut.output.insert(worker, f64_to_fixed64(10.0));
        builder.register_building(hut).unwrap();
        let mut farm = blank.clone();
        farm.name = "Wheat Farm".into();
        farm.output.insert(wheat, f64_to_fixed64(2.0));
        builder.register_building(farm).unwrap();
        builder.build().unwrap()
    }

    fn running_engine() -> Engine {
        let catalog = catalog();
        let grid = HexGrid::new(9, 9);
        let state = GameState::generate(&grid, &catalog, 99);
        let mut engine = Engine::new(grid, catalog, state);
        engine
            .submit(Command::Build {
                xy: TileXy::new(1, 1),
                kind: engine.catalog().building_id("Hut").unwrap(),
            })
            .unwrap();
        engine
            .submit(Command::Build {
                xy: TileXy::new(2, 1),
                kind: engine.catalog().building_id("Wheat Farm").unwrap(),
            })
            .unwrap();
        for _ in 0..10 {
            engine.step();
        }
        engine
    }

    #[test]
    fn round_trip_preserves_state_hash() {
        let engine = running_engine();
        let bytes = save(&engine).unwrap();
        let loaded = load(&bytes, catalog()).unwrap();
        assert_eq!(loaded.tick(), engine.tick());
        assert_eq!(loaded.state_hash(), engine.state_hash());
    }

    #[test]
    fn round_trip_reproduces_identical_behavior() {
        let mut original = running_engine();
        let bytes = save(&original).unwrap();
        let mut loaded = load(&bytes, catalog()).unwrap();

        for _ in 0..20 {
            original.step();
            loaded.step();
        }
        assert_eq!(original.state_hash(), loaded.state_hash());
    }

    #[test]
    fn truncated_data_fails_explicitly() {
        let engine = running_engine();
        let bytes = save(&engine).unwrap();
        assert!(matches!(load(&bytes[..4], catalog()), Err(LoadError::TooShort)));
        assert!(load(&bytes[..bytes.len() / 2], catalog()).is_err());
    }

    #[test]
    fn corrupted_magic_fails_explicitly() {
        let engine = running_engine();
        let snapshot = EngineSnapshot {
            header: SnapshotHeader {
                magic: 0xDEAD_BEEF,
                version: FORMAT_VERSION,
                tick: 0,
            },
            grid: engine.grid().clone(),
            state: engine.state().clone(),
        };
        let bytes = bitcode::serialize(&snapshot).unwrap();
        assert!(matches!(
            load(&bytes, catalog()),
            Err(LoadError::InvalidMagic(0xDEAD_BEEF))
        ));
    }

    #[test]
    fn future_version_fails_explicitly() {
        let engine = running_engine();
        let snapshot = EngineSnapshot {
            header: SnapshotHeader {
                magic: SNAPSHOT_MAGIC,
                version: FORMAT_VERSION + 1,
                tick: 0,
            },
            grid: engine.grid().clone(),
            state: engine.state().clone(),
        };
        let bytes = bitcode::serialize(&snapshot).unwrap();
        assert!(matches!(
            load(&bytes, catalog()),
            Err(LoadError::FutureVersion(_))
        ));
    }
}
