//! Immutable resource and building catalog.
//!
//! Definitions are registered through [`CatalogBuilder`] and frozen by
//! `build()`, which validates every cross-reference. Building "polymorphism"
//! is expressed as data: a [`BuildingId`] plus effect descriptors
//! ([`BuildingDef::wonder_boosts`], [`BuildingDef::special`]) -- the engine
//! never branches on concrete building types.

use crate::fixed::Fixed64;
use crate::id::{BuildingId, ResourceId};
use crate::modifier::Boost;
use std::collections::{BTreeMap, HashMap};

// ---------------------------------------------------------------------------
// Definitions
// ---------------------------------------------------------------------------

/// The global counters tracked on the game state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GlobalCounter {
    Cash,
    Science,
    Faith,
}

/// How a resource behaves in the economy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    /// Stored in building storage and moved by transports.
    Material,
    /// Produced into the per-tick worker supply; never stored or shipped.
    Worker,
    /// Credited to a global counter on production instead of storage.
    Global(GlobalCounter),
}

/// A resource definition.
#[derive(Debug, Clone)]
pub struct ResourceDef {
    pub name: String,
    pub tier: u32,
    pub kind: ResourceKind,
    /// Whether world generation scatters this resource as a terrain deposit.
    pub deposit: bool,
}

/// Engine-recognized special roles. Everything else a building does is
/// described by its inputs/outputs and boost descriptors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BuildingSpecial {
    #[default]
    None,
    /// The seat of the city: placed at world generation, cannot be sold,
    /// endpoint for player trade.
    Headquarter,
    /// Pure storage; holds any material resource.
    Warehouse,
    /// Publishes consumption/production statistics (data lives in the tick
    /// summary; the tag only gates placement limits).
    Statistics,
}

/// A building definition. Amounts are per production cycle (one tick) at
/// level 1 before multipliers.
#[derive(Debug, Clone)]
pub struct BuildingDef {
    pub name: String,
    pub tier: u32,
    pub input: BTreeMap<ResourceId, Fixed64>,
    pub output: BTreeMap<ResourceId, Fixed64>,
    pub construction_cost: BTreeMap<ResourceId, Fixed64>,
    /// Per-resource storage capacity before the storage multiplier.
    pub base_storage: Fixed64,
    /// Terrain deposit the building must sit on to produce.
    pub deposit: Option<ResourceId>,
    /// Maximum instances across the map. `Some(1)` with a construction cost
    /// marks a unique wonder.
    pub max: Option<u32>,
    /// Boosts granted while this building stands Active (wonder effects).
    pub wonder_boosts: Vec<Boost>,
    pub special: BuildingSpecial,
}

impl BuildingDef {
    /// A unique wonder: at most one instance, built at a cost.
    pub fn is_wonder(&self) -> bool {
        self.max == Some(1) && !self.construction_cost.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors raised when freezing a catalog.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("building '{building}' references unknown resource id {resource:?}")]
    InvalidResourceRef {
        building: String,
        resource: ResourceId,
    },
    #[error("catalog must define exactly one worker resource, found {0}")]
    WorkerResourceCount(usize),
    #[error("duplicate name '{0}'")]
    DuplicateName(String),
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Builder for constructing an immutable [`Catalog`].
#[derive(Debug, Default)]
pub struct CatalogBuilder {
    resources: Vec<ResourceDef>,
    resource_name_to_id: HashMap<String, ResourceId>,
    buildings: Vec<BuildingDef>,
    building_name_to_id: HashMap<String, BuildingId>,
}

impl CatalogBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a resource. Returns its id.
    pub fn register_resource(&mut self, def: ResourceDef) -> Result<ResourceId, CatalogError> {
        if self.resource_name_to_id.contains_key(&def.name) {
            return Err(CatalogError::DuplicateName(def.name));
        }
        let id = ResourceId(self.resources.len() as u32);
        self.resource_name_to_id.insert(def.name.clone(), id);
        self.resources.push(def);
        Ok(id)
    }

    /// Register a building. Returns its id.
    pub fn register_building(&mut self, def: BuildingDef) -> Result<BuildingId, CatalogError> {
        if self.building_name_to_id.contains_key(&def.name) {
            return Err(CatalogError::DuplicateName(def.name));
        }
        let id = BuildingId(self.buildings.len() as u32);
        self.building_name_to_id.insert(def.name.clone(), id);
        self.buildings.push(def);
        Ok(id)
    }

    /// Lookup a resource id by name during registration.
    pub fn resource_id(&self, name: &str) -> Option<ResourceId> {
        self.resource_name_to_id.get(name).copied()
    }

    /// Lookup a building id by name during registration.
    pub fn building_id(&self, name: &str) -> Option<BuildingId> {
        self.building_name_to_id.get(name).copied()
    }

    /// Freeze the catalog. Validates that every resource reference exists and
    /// that exactly one worker resource is defined.
    pub fn build(self) -> Result<Catalog, CatalogError> {
        let resource_count = self.resources.len() as u32;
        for building in &self.buildings {
            for &id in building
                .input
                .keys()
                .chain(building.output.keys())
                .chain(building.construction_cost.keys())
                .chain(building.deposit.iter())
            {
                if id.0 >= resource_count {
                    return Err(CatalogError::InvalidResourceRef {
                        building: building.name.clone(),
                        resource: id,
                    });
                }
            }
        }

        let workers: Vec<ResourceId> = self
            .resources
            .iter()
            .enumerate()
            .filter(|(_, r)| r.kind == ResourceKind::Worker)
            .map(|(i, _)| ResourceId(i as u32))
            .collect();
        if workers.len() != 1 {
            return Err(CatalogError::WorkerResourceCount(workers.len()));
        }

        Ok(Catalog {
            resources: self.resources,
            resource_name_to_id: self.resource_name_to_id,
            buildings: self.buildings,
            building_name_to_id: self.building_name_to_id,
            worker: workers[0],
        })
    }
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

/// Immutable catalog. Frozen after build; safe to share by reference.
#[derive(Debug)]
pub struct Catalog {
    resources: Vec<ResourceDef>,
    resource_name_to_id: HashMap<String, ResourceId>,
    buildings: Vec<BuildingDef>,
    building_name_to_id: HashMap<String, BuildingId>,
    worker: ResourceId,
}

impl Catalog {
    pub fn resource(&self, id: ResourceId) -> &ResourceDef {
        &self.resources[id.0 as usize]
    }

    pub fn building(&self, id: BuildingId) -> &BuildingDef {
        &self.buildings[id.0 as usize]
    }

    pub fn resource_id(&self, name: &str) -> Option<ResourceId> {
        self.resource_name_to_id.get(name).copied()
    }

    pub fn building_id(&self, name: &str) -> Option<BuildingId> {
        self.building_name_to_id.get(name).copied()
    }

    /// The single worker resource.
    pub fn worker(&self) -> ResourceId {
        self.worker
    }

    pub fn resource_count(&self) -> usize {
        self.resources.len()
    }

    pub fn building_count(&self) -> usize {
        self.buildings.len()
    }

    /// Ids of all resources scattered as terrain deposits, in id order.
    pub fn deposit_resources(&self) -> Vec<ResourceId> {
        self.resources
            .iter()
            .enumerate()
            .filter(|(_, r)| r.deposit)
            .map(|(i, _)| ResourceId(i as u32))
            .collect()
    }

    /// Ids of all building definitions, in id order.
    pub fn building_ids(&self) -> impl Iterator<Item = BuildingId> + '_ {
        (0..self.buildings.len() as u32).map(BuildingId)
    }
}

// ===========================================================================
// Tests
// ===========================================================================
