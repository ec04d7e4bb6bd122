//! Technology tree and great people for the Civitas engine.
//!
//! Technologies are registered at startup and frozen. Each has
//! prerequisites, a science-point cost, building unlocks, deposit reveals,
//! and a list of boosts. Unlocking is a pure check against the engine's
//! committed state: [`TechTree::unlock`] returns an [`UnlockOutcome`]
//! describing what to apply, and game code feeds it back to the engine
//! between ticks (`Engine::spend_science` + `Engine::unlock_tech`). The
//! tree itself holds no mutable progress -- the unlocked set lives in the
//! serialized game state.
//!
//! Great people are drawn per age with the engine's deterministic RNG, so a
//! given seed always produces the same sequence of births.

use civitas_core::fixed::Fixed64;
use civitas_core::id::{BuildingId, GreatPersonId, ResourceId, TechId};
use civitas_core::modifier::Boost;
use civitas_core::rng::SimRng;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

// ---------------------------------------------------------------------------
// Ages
// ---------------------------------------------------------------------------

/// Historical ages, in progression order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Age {
    StoneAge,
    BronzeAge,
    IronAge,
    ClassicalAge,
    MiddleAge,
    RenaissanceAge,
}

// ---------------------------------------------------------------------------
// Definitions
// ---------------------------------------------------------------------------

/// A technology. Immutable after registration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Technology {
    pub id: TechId,
    pub name: String,
    pub age: Age,
    pub prerequisites: Vec<TechId>,
    pub science_cost: Fixed64,
    pub unlocks_buildings: Vec<BuildingId>,
    /// Deposits of these resources become visible/buildable when unlocked.
    pub reveals_deposits: Vec<ResourceId>,
    pub boosts: Vec<Boost>,
}

/// A great person. Born at most once per game, drawn per age.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GreatPerson {
    pub id: GreatPersonId,
    pub name: String,
    pub age: Age,
    pub boosts: Vec<Boost>,
}

/// What an unlock grants. Game code applies this to the engine at a tick
/// boundary.
#[derive(Debug, Clone)]
pub struct UnlockOutcome {
    pub science_cost: Fixed64,
    pub boosts: Vec<Boost>,
    pub unlocks_buildings: Vec<BuildingId>,
    pub reveals_deposits: Vec<ResourceId>,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum TechTreeError {
    #[error("technology not found: {0:?}")]
    TechNotFound(TechId),

    #[error("duplicate technology id: {0:?}")]
    DuplicateId(TechId),

    #[error("duplicate great person id: {0:?}")]
    DuplicatePersonId(GreatPersonId),

    #[error("prerequisite not met: {0:?} requires {1:?}")]
    PrerequisiteNotMet(TechId, TechId),

    #[error("technology {0:?} is already unlocked")]
    AlreadyUnlocked(TechId),

    #[error("not enough science: need {required}, have {available}")]
    NotEnoughScience {
        required: Fixed64,
        available: Fixed64,
    },

    #[error("technology {tech:?} references unknown prerequisite {prerequisite:?}")]
    UnknownPrerequisite {
        tech: TechId,
        prerequisite: TechId,
    },
}

// ---------------------------------------------------------------------------
// TechTree
// ---------------------------------------------------------------------------

/// Immutable registry of technologies and great people.
#[derive(Debug, Default)]
pub struct TechTree {
    techs: BTreeMap<TechId, Technology>,
    people: BTreeMap<GreatPersonId, GreatPerson>,
}

impl TechTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a technology.
    pub fn register(&mut self, tech: Technology) -> Result<(), TechTreeError> {
        if self.techs.contains_key(&tech.id) {
            return Err(TechTreeError::DuplicateId(tech.id));
        }
        self.techs.insert(tech.id, tech);
        Ok(())
    }

    /// Register a great person.
    pub fn register_person(&mut self, person: GreatPerson) -> Result<(), TechTreeError> {
        if self.people.contains_key(&person.id) {
            return Err(TechTreeError::DuplicatePersonId(person.id));
        }
        self.people.insert(person.id, person);
        Ok(())
    }

    /// Check that every prerequisite reference resolves. Call once after
    /// registration.
    pub fn validate(&self) -> Result<(), TechTreeError> {
        for tech in self.techs.values() {
            for &prerequisite in &tech.prerequisites {
                if !self.techs.contains_key(&prerequisite) {
                    return Err(TechTreeError::UnknownPrerequisite {
                        tech: tech.id,
                        prerequisite,
                    });
                }
            }
        }
        Ok(())
    }

    pub fn get(&self, id: TechId) -> Option<&Technology> {
        self.techs.get(&id)
    }

    pub fn person(&self, id: GreatPersonId) -> Option<&GreatPerson> {
        self.people.get(&id)
    }

    pub fn tech_count(&self) -> usize {
        self.techs.len()
    }

    /// Technologies whose prerequisites are all met and which are not yet
    /// unlocked, in id order.
    pub fn available(&self, unlocked: &BTreeSet<TechId>) -> Vec<TechId> {
        self.techs
            .values()
            .filter(|t| !unlocked.contains(&t.id))
            .filter(|t| t.prerequisites.iter().all(|p| unlocked.contains(p)))
            .map(|t| t.id)
            .collect()
    }

    /// Check an unlock against the committed state and describe what it
    /// grants. Pure: nothing is recorded here.
    pub fn unlock(
        &self,
        id: TechId,
        unlocked: &BTreeSet<TechId>,
        science: Fixed64,
    ) -> Result<UnlockOutcome, TechTreeError> {
        let tech = self.techs.get(&id).ok_or(TechTreeError::TechNotFound(id))?;
        if unlocked.contains(&id) {
            return Err(TechTreeError::AlreadyUnlocked(id));
        }
        for &prerequisite in &tech.prerequisites {
            if !unlocked.contains(&prerequisite) {
                return Err(TechTreeError::PrerequisiteNotMet(id, prerequisite));
            }
        }
        if science < tech.science_cost {
            return Err(TechTreeError::NotEnoughScience {
                required: tech.science_cost,
                available: science,
            });
        }
        Ok(UnlockOutcome {
            science_cost: tech.science_cost,
            boosts: tech.boosts.clone(),
            unlocks_buildings: tech.unlocks_buildings.clone(),
            reveals_deposits: tech.reveals_deposits.clone(),
        })
    }

    /// Draw a great person of the given age who has not been born yet.
    /// Candidates are considered in id order, so the draw depends only on
    /// the RNG state.
    pub fn draw_great_person(
        &self,
        age: Age,
        born: &BTreeSet<GreatPersonId>,
        rng: &mut SimRng,
    ) -> Option<GreatPersonId> {
        let candidates: Vec<GreatPersonId> = self
            .people
            .values()
            .filter(|p| p.age == age && !born.contains(&p.id))
            .map(|p| p.id)
            .collect();
        if candidates.is_empty() {
            return None;
        }
        Some(candidates[rng.next_index(candidates.len())])
    }
}

// ===========================================================================
// Tests
// ===========================================================================
