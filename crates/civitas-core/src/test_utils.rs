//! Shared fixtures for integration tests and benches.
//!
//! Only compiled for tests or with the `test-utils` feature.

use crate::catalog::{
    BuildingDef, BuildingSpecial, Catalog, CatalogBuilder, GlobalCounter, ResourceDef,
    ResourceKind,
};
use crate::fixed::{Fixed64, f64_to_fixed64};
use crate::grid::HexGrid;
use crate::id::{BuildingId, ResourceId};
use crate::state::GameState;
use crate::tick::Engine;
use std::collections::BTreeMap;

/// Ids for the small-city fixture catalog.
pub struct SmallCity {
    pub worker: ResourceId,
    pub wheat: ResourceId,
    pub flour: ResourceId,
    pub wood: ResourceId,
    pub stone: ResourceId,
    pub science: ResourceId,
    pub hq: BuildingId,
    pub hut: BuildingId,
    pub wheat_farm: BuildingId,
    pub flour_mill: BuildingId,
    pub logging_camp: BuildingId,
    pub stone_quarry: BuildingId,
    pub school: BuildingId,
    pub colosseum: BuildingId,
}

fn material(name: &str, tier: u32, deposit: bool) -> ResourceDef {
    ResourceDef {
        name: name.to_string(),
        tier,
        kind: ResourceKind::Material,
        deposit,
    }
}

fn blank(name: &str, storage: f64) -> BuildingDef {
    BuildingDef {
        name: name.to_string(),
        tier: 1,
        input: BTreeMap::new(),
        output: BTreeMap::new(),
        construction_cost: BTreeMap::new(),
        base_storage: f64_to_fixed64(storage),
        deposit: None,
        max: None,
        wonder_boosts: Vec::new(),
        special: BuildingSpecial::None,
    }
}

/// A compact catalog exercising every mechanic: housing, a two-step food
/// chain, deposit-gated quarrying, science output, and construction costs.
pub fn small_city_catalog() -> (Catalog, SmallCity) {
    let mut builder = CatalogBuilder::new();
    let worker = builder
        .register_resource(ResourceDef {
            name: "Worker".into(),
            tier: 0,
            kind: ResourceKind::Worker,
            deposit: false,
        })
        .unwrap();
    let wheat = builder.register_resource(material("Wheat", 1, false)).unwrap();
    let flour = builder.register_resource(material("Flour", 2, false)).unwrap();
    let wood = builder.register_resource(material("Wood", 1, false)).unwrap();
    let stone = builder.register_resource(material("Stone", 1, true)).unwrap();
    let science = builder
        .register_resource(ResourceDef {
            name: "Science".into(),
            tier: 0,
            kind: ResourceKind::Global(GlobalCounter::Science),
            deposit: false,
        })
        .unwrap();

    let mut hq = blank("Headquarter", 4000.0);
    hq.max = Some(1);
    hq.special = BuildingSpecial::Headquarter;
    let hq = builder.register_building(hq).unwrap();

    let mut hut = blank("Hut", 100.0);
    hut.output.insert(worker, f64_to_fixed64(10.0));
    let hut = builder.register_building(hut).unwrap();

    let mut wheat_farm = blank("Wheat Farm", 200.0);
    wheat_farm.output.insert(wheat, f64_to_fixed64(2.0));
    let wheat_farm = builder.register_building(wheat_farm).unwrap();

    let mut flour_mill = blank("Flour Mill", 200.0);
    flour_mill.input.insert(wheat, f64_to_fixed64(2.0));
    flour_mill.output.insert(flour, f64_to_fixed64(1.0));
    flour_mill.construction_cost.insert(wood, f64_to_fixed64(4.0));
    let flour_mill = builder.register_building(flour_mill).unwrap();

    let mut logging_camp = blank("Logging Camp", 200.0);
    logging_camp.output.insert(wood, f64_to_fixed64(2.0));
    let logging_camp = builder.register_building(logging_camp).unwrap();

    let mut stone_quarry = blank("Stone Quarry", 200.0);
    stone_quarry.output.insert(stone, f64_to_fixed64(1.0));
    stone_quarry.deposit = Some(stone);
    let stone_quarry = builder.register_building(stone_quarry).unwrap();

    let mut school = blank("School", 200.0);
    school.input.insert(flour, f64_to_fixed64(1.0));
    school.output.insert(science, f64_to_fixed64(1.0));
    let school = builder.register_building(school).unwrap();

    let mut colosseum = blank("Colosseum", 200.0);
    colosseum.max = Some(1);
    colosseum.construction_cost.insert(stone, f64_to_fixed64(10.0));
    colosseum.wonder_boosts = vec![
        crate::modifier::Boost {
            kind: crate::modifier::MultiplierKind::Production,
            value: f64_to_fixed64(1.0),
            scope: crate::modifier::BoostScope::Adjacent,
        },
        crate::modifier::Boost {
            kind: crate::modifier::MultiplierKind::Storage,
            value: f64_to_fixed64(1.0),
            scope: crate::modifier::BoostScope::Adjacent,
        },
    ];
    let colosseum = builder.register_building(colosseum).unwrap();

    let catalog = builder.build().unwrap();
    (
        catalog,
        SmallCity {
            worker,
            wheat,
            flour,
            wood,
            stone,
            science,
            hq,
            hut,
            wheat_farm,
            flour_mill,
            logging_camp,
            stone_quarry,
            school,
            colosseum,
        },
    )
}

/// A fresh engine over the small-city catalog with a comfortable base
/// worker pool and a stocked headquarter for bootstrap construction.
pub fn small_city_engine(seed: u64) -> (Engine, SmallCity) {
    let (catalog, ids) = small_city_catalog();
    let grid = HexGrid::new(11, 11);
    let mut state = GameState::generate(&grid, &catalog, seed);
    state.base_workers = Fixed64::from_num(20);
    if let Some(hq) = state.headquarter_xy(&catalog) {
        let storage = catalog.building(ids.hq).base_storage;
        if let Some(building) = state.building_at_mut(hq) {
            let _ = building.add_capped(ids.wood, Fixed64::from_num(40), storage);
            let _ = building.add_capped(ids.stone, Fixed64::from_num(20), storage);
        }
    }
    (Engine::new(grid, catalog, state), ids)
}
