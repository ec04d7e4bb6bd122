//! Serde structs for game content files.
//!
//! These define the on-disk format (RON or JSON) for resources, buildings,
//! technologies, and great people. Everything references everything else by
//! name; the loader resolves names into engine ids.

use serde::Deserialize;

// ===========================================================================
// Resources
// ===========================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct ResourceData {
    pub name: String,
    #[serde(default)]
    pub tier: u32,
    #[serde(default)]
    pub kind: ResourceKindData,
    /// Scattered as a terrain deposit at world generation.
    #[serde(default)]
    pub deposit: bool,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKindData {
    #[default]
    Material,
    Worker,
    Global(CounterData),
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CounterData {
    Cash,
    Science,
    Faith,
}

// ===========================================================================
// Buildings
// ===========================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct BuildingData {
    pub name: String,
    #[serde(default = "default_tier")]
    pub tier: u32,
    /// Per-cycle inputs as (resource name, amount).
    #[serde(default)]
    pub input: Vec<(String, f64)>,
    #[serde(default)]
    pub output: Vec<(String, f64)>,
    /// Construction cost. Empty means the building activates on placement.
    #[serde(default)]
    pub cost: Vec<(String, f64)>,
    #[serde(default = "default_storage")]
    pub storage: f64,
    /// Required terrain deposit, by resource name.
    #[serde(default)]
    pub deposit: Option<String>,
    /// Maximum instances; 1 with a cost marks a unique wonder.
    #[serde(default)]
    pub max: Option<u32>,
    /// Boosts granted while the (wonder) building stands.
    #[serde(default)]
    pub boosts: Vec<BoostData>,
    #[serde(default)]
    pub special: SpecialData,
}

fn default_tier() -> u32 {
    1
}

fn default_storage() -> f64 {
    200.0
}

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SpecialData {
    #[default]
    None,
    Headquarter,
    Warehouse,
    Statistics,
}

// ===========================================================================
// Boosts
// ===========================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct BoostData {
    pub kind: MultiplierKindData,
    pub value: f64,
    #[serde(default)]
    pub scope: ScopeData,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MultiplierKindData {
    Production,
    Consumption,
    Storage,
    WorkerCapacity,
    Builder,
    ScienceFromIdleWorkers,
    ScienceFromBusyWorkers,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScopeData {
    #[default]
    Global,
    Building(String),
    TouchesResource(String),
    ProducesResource(String),
    Adjacent,
    MinLevel(u32),
    PerLevels(u32),
}

// ===========================================================================
// Technologies and great people
// ===========================================================================

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AgeData {
    StoneAge,
    BronzeAge,
    IronAge,
    ClassicalAge,
    MiddleAge,
    RenaissanceAge,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TechnologyData {
    pub name: String,
    pub age: AgeData,
    pub cost: f64,
    #[serde(default)]
    pub prerequisites: Vec<String>,
    /// Building names made available by this technology.
    #[serde(default)]
    pub unlocks: Vec<String>,
    /// Deposit resource names revealed by this technology.
    #[serde(default)]
    pub reveals: Vec<String>,
    #[serde(default)]
    pub boosts: Vec<BoostData>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GreatPersonData {
    pub name: String,
    pub age: AgeData,
    #[serde(default)]
    pub boosts: Vec<BoostData>,
}

// ===========================================================================
// Top level
// ===========================================================================

/// A complete content set as read from a data file.
#[derive(Debug, Clone, Deserialize)]
pub struct GameData {
    pub resources: Vec<ResourceData>,
    pub buildings: Vec<BuildingData>,
    #[serde(default)]
    pub technologies: Vec<TechnologyData>,
    #[serde(default)]
    pub great_people: Vec<GreatPersonData>,
}
