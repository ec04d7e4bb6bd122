//! Resolution pipeline: parses content files and resolves name references
//! into a frozen [`Catalog`] and [`TechTree`].

use crate::schema::*;
use civitas_core::catalog::{
    BuildingDef, BuildingSpecial, Catalog, CatalogBuilder, CatalogError, GlobalCounter,
    ResourceDef, ResourceKind,
};
use civitas_core::fixed::f64_to_fixed64;
use civitas_core::id::{GreatPersonId, TechId};
use civitas_core::modifier::{Boost, BoostScope, MultiplierKind};
use civitas_tech::{Age, GreatPerson, Technology, TechTree, TechTreeError};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

// ===========================================================================
// Errors
// ===========================================================================

/// Errors that can occur while loading content.
#[derive(Debug, thiserror::Error)]
pub enum DataLoadError {
    #[error("unsupported format for file: {file}")]
    UnsupportedFormat { file: PathBuf },

    #[error("parse error: {detail}")]
    Parse { detail: String },

    #[error("unresolved resource reference '{name}' in {context}")]
    UnresolvedResource { context: String, name: String },

    #[error("unresolved building reference '{name}' in {context}")]
    UnresolvedBuilding { context: String, name: String },

    #[error("unresolved technology reference '{name}' in {context}")]
    UnresolvedTech { context: String, name: String },

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Tech(#[from] TechTreeError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

// ===========================================================================
// Parsing
// ===========================================================================

/// Supported content file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Ron,
    Json,
}

/// Detect the format of a file from its extension.
pub fn detect_format(path: &Path) -> Result<Format, DataLoadError> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("ron") => Ok(Format::Ron),
        Some("json") => Ok(Format::Json),
        _ => Err(DataLoadError::UnsupportedFormat {
            file: path.to_path_buf(),
        }),
    }
}

/// Parse a content string in the given format.
pub fn parse_game_data(text: &str, format: Format) -> Result<GameData, DataLoadError> {
    match format {
        Format::Ron => ron::from_str(text).map_err(|e| DataLoadError::Parse {
            detail: e.to_string(),
        }),
        Format::Json => serde_json::from_str(text).map_err(|e| DataLoadError::Parse {
            detail: e.to_string(),
        }),
    }
}

/// Read and parse a content file, detecting the format from the extension.
pub fn load_game_data(path: &Path) -> Result<GameData, DataLoadError> {
    let format = detect_format(path)?;
    let text = std::fs::read_to_string(path)?;
    parse_game_data(&text, format)
}

// ===========================================================================
// Resolution
// ===========================================================================

/// Fully resolved content: the frozen catalog, the tech tree, and name maps
/// for callers that address technologies and great people by name.
#[derive(Debug)]
pub struct GameContent {
    pub catalog: Catalog,
    pub tech_tree: TechTree,
    pub tech_names: BTreeMap<String, TechId>,
    pub person_names: BTreeMap<String, GreatPersonId>,
}

/// Resolve parsed data into engine types, validating every cross-reference.
pub fn resolve(data: &GameData) -> Result<GameContent, DataLoadError> {
    let mut builder = CatalogBuilder::new();

    for resource in &data.resources {
        builder.register_resource(ResourceDef {
            name: resource.name.clone(),
            tier: resource.tier,
            kind: match resource.kind {
                ResourceKindData::Material => ResourceKind::Material,
                ResourceKindData::Worker => ResourceKind::Worker,
                ResourceKindData::Global(counter) => ResourceKind::Global(match counter {
                    CounterData::Cash => GlobalCounter::Cash,
                    CounterData::Science => GlobalCounter::Science,
                    CounterData::Faith => GlobalCounter::Faith,
                }),
            },
            deposit: resource.deposit,
        })?;
    }

    // Resources are registered; building defs can now resolve names.
    let resource_id = |context: &str, name: &str, builder: &CatalogBuilder| {
        builder
            .resource_id(name)
            .ok_or_else(|| DataLoadError::UnresolvedResource {
                context: context.to_string(),
                name: name.to_string(),
            })
    };

    for building in &data.buildings {
        let context = format!("building '{}'", building.name);
        let mut def = BuildingDef {
            name: building.name.clone(),
            tier: building.tier,
            input: BTreeMap::new(),
            output: BTreeMap::new(),
            construction_cost: BTreeMap::new(),
            base_storage: f64_to_fixed64(building.storage),
            deposit: None,
            max: building.max,
            wonder_boosts: Vec::new(),
            special: match building.special {
                SpecialData::None => BuildingSpecial::None,
                SpecialData::Headquarter => BuildingSpecial::Headquarter,
                SpecialData::Warehouse => BuildingSpecial::Warehouse,
                SpecialData::Statistics => BuildingSpecial::Statistics,
            },
        };
        for (name, amount) in &building.input {
            def.input
                .insert(resource_id(&context, name, &builder)?, f64_to_fixed64(*amount));
        }
        for (name, amount) in &building.output {
            def.output
                .insert(resource_id(&context, name, &builder)?, f64_to_fixed64(*amount));
        }
        for (name, amount) in &building.cost {
            def.construction_cost
                .insert(resource_id(&context, name, &builder)?, f64_to_fixed64(*amount));
        }
        if let Some(name) = &building.deposit {
            def.deposit = Some(resource_id(&context, name, &builder)?);
        }
        for boost in &building.boosts {
            def.wonder_boosts
                .push(resolve_boost(&context, boost, &builder)?);
        }
        builder.register_building(def)?;
    }

    // Boosts inside technologies/great people also resolve against the
    // builder before it is consumed.
    let mut tech_boosts = Vec::new();
    for tech in &data.technologies {
        let context = format!("technology '{}'", tech.name);
        let mut boosts = Vec::new();
        for boost in &tech.boosts {
            boosts.push(resolve_boost(&context, boost, &builder)?);
        }
        tech_boosts.push(boosts);
    }
    let mut person_boosts = Vec::new();
    for person in &data.great_people {
        let context = format!("great person '{}'", person.name);
        let mut boosts = Vec::new();
        for boost in &person.boosts {
            boosts.push(resolve_boost(&context, boost, &builder)?);
        }
        person_boosts.push(boosts);
    }

    // Tech unlock/reveal references resolve via the builder too.
    let mut tech_unlocks = Vec::new();
    let mut tech_reveals = Vec::new();
    {
        let building_id = |context: &str, name: &str| {
            builder
                .building_id(name)
                .ok_or_else(|| DataLoadError::UnresolvedBuilding {
                    context: context.to_string(),
                    name: name.to_string(),
                })
        };
        for tech in &data.technologies {
            let context = format!("technology '{}'", tech.name);
            let mut unlocks = Vec::new();
            for name in &tech.unlocks {
                unlocks.push(building_id(&context, name)?);
            }
            tech_unlocks.push(unlocks);
            let mut reveals = Vec::new();
            for name in &tech.reveals {
                reveals.push(resource_id(&context, name, &builder)?);
            }
            tech_reveals.push(reveals);
        }
    }

    let catalog = builder.build()?;

    // Technologies: assign ids in file order, then resolve prerequisites.
    let mut tech_names = BTreeMap::new();
    for (index, tech) in data.technologies.iter().enumerate() {
        tech_names.insert(tech.name.clone(), TechId(index as u32));
    }

    let mut tech_tree = TechTree::new();
    for (index, tech) in data.technologies.iter().enumerate() {
        let context = format!("technology '{}'", tech.name);
        let mut prerequisites = Vec::new();
        for name in &tech.prerequisites {
            prerequisites.push(*tech_names.get(name).ok_or_else(|| {
                DataLoadError::UnresolvedTech {
                    context: context.clone(),
                    name: name.clone(),
                }
            })?);
        }
        tech_tree.register(Technology {
            id: TechId(index as u32),
            name: tech.name.clone(),
            age: resolve_age(tech.age),
            prerequisites,
            science_cost: f64_to_fixed64(tech.cost),
            unlocks_buildings: tech_unlocks[index].clone(),
            reveals_deposits: tech_reveals[index].clone(),
            boosts: tech_boosts[index].clone(),
        })?;
    }
    tech_tree.validate()?;

    let mut person_names = BTreeMap::new();
    for (index, person) in data.great_people.iter().enumerate() {
        let id = GreatPersonId(index as u32);
        person_names.insert(person.name.clone(), id);
        tech_tree.register_person(GreatPerson {
            id,
            name: person.name.clone(),
            age: resolve_age(person.age),
            boosts: person_boosts[index].clone(),
        })?;
    }

    Ok(GameContent {
        catalog,
        tech_tree,
        tech_names,
        person_names,
    })
}

fn resolve_age(age: AgeData) -> Age {
    match age {
        AgeData::StoneAge => Age::StoneAge,
        AgeData::BronzeAge => Age::BronzeAge,
        AgeData::IronAge => Age::IronAge,
        AgeData::ClassicalAge => Age::ClassicalAge,
        AgeData::MiddleAge => Age::MiddleAge,
        AgeData::RenaissanceAge => Age::RenaissanceAge,
    }
}

fn resolve_boost(
    context: &str,
    boost: &BoostData,
    builder: &CatalogBuilder,
) -> Result<Boost, DataLoadError> {
    let resource = |name: &String| {
        builder
            .resource_id(name)
            .ok_or_else(|| DataLoadError::UnresolvedResource {
                context: context.to_string(),
                name: name.clone(),
            })
    };
    let scope = match &boost.scope {
        ScopeData::Global => BoostScope::Global,
        ScopeData::Building(name) => BoostScope::Building(
            builder
                .building_id(name)
                .ok_or_else(|| DataLoadError::UnresolvedBuilding {
                    context: context.to_string(),
                    name: name.clone(),
                })?,
        ),
        ScopeData::TouchesResource(name) => BoostScope::TouchesResource(resource(name)?),
        ScopeData::ProducesResource(name) => BoostScope::ProducesResource(resource(name)?),
        ScopeData::Adjacent => BoostScope::Adjacent,
        ScopeData::MinLevel(n) => BoostScope::MinLevel(*n),
        ScopeData::PerLevels(n) => BoostScope::PerLevels(*n),
    };
    Ok(Boost {
        kind: match boost.kind {
            MultiplierKindData::Production => MultiplierKind::Production,
            MultiplierKindData::Consumption => MultiplierKind::Consumption,
            MultiplierKindData::Storage => MultiplierKind::Storage,
            MultiplierKindData::WorkerCapacity => MultiplierKind::WorkerCapacity,
            MultiplierKindData::Builder => MultiplierKind::Builder,
            MultiplierKindData::ScienceFromIdleWorkers => MultiplierKind::ScienceFromIdleWorkers,
            MultiplierKindData::ScienceFromBusyWorkers => MultiplierKind::ScienceFromBusyWorkers,
        },
        value: f64_to_fixed64(boost.value),
        scope,
    })
}
