//! Player trade interface.
//!
//! The networked trade collaborator lives outside the core: it presents
//! offers, and fills arrive here as commands. The core's responsibility is
//! validation against headquarter storage and applying the resource deltas
//! at a tick boundary -- never mid-tick.

use crate::catalog::{Catalog, ResourceKind};
use crate::command::CommandError;
use crate::event::{Event, EventBus};
use crate::fixed::{Fixed64, Ticks};
use crate::grid::HexGrid;
use crate::id::ResourceId;
use crate::modifier::{self, MultiplierKind};
use crate::state::GameState;
use serde::{Deserialize, Serialize};

/// A trade offer posted by another player: they give `offer_amount` of
/// `offer_resource` in exchange for `want_amount` of `want_resource`.
/// The tariff fraction is lost in transit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TradeOffer {
    pub offer_resource: ResourceId,
    pub offer_amount: Fixed64,
    pub want_resource: ResourceId,
    pub want_amount: Fixed64,
    pub tariff: Fixed64,
}

impl TradeOffer {
    /// Amount actually received after tariff.
    pub fn net_amount(&self) -> Fixed64 {
        self.offer_amount * (Fixed64::from_num(1) - self.tariff)
    }
}

/// Check that a fill can go through: a headquarter stands, both resources
/// are tradeable materials, the wanted amount is on hand, and the proceeds
/// fit in storage.
pub fn validate_fill(
    state: &GameState,
    catalog: &Catalog,
    grid: &HexGrid,
    offer: &TradeOffer,
) -> Result<(), CommandError> {
    if offer.tariff < Fixed64::ZERO || offer.tariff >= Fixed64::from_num(1) {
        return Err(CommandError::InvalidTariff);
    }
    for resource in [offer.offer_resource, offer.want_resource] {
        if catalog.resource(resource).kind != ResourceKind::Material {
            return Err(CommandError::NotTradeable);
        }
    }
    let hq = state
        .headquarter_xy(catalog)
        .ok_or(CommandError::NoHeadquarter)?;
    let building = state
        .building_at(hq)
        .ok_or(CommandError::NoHeadquarter)?;

    if building.stored(offer.want_resource) < offer.want_amount {
        return Err(CommandError::NotEnoughResources);
    }

    let capacity = catalog.building(building.kind).base_storage
        * modifier::resolve(state, catalog, grid, hq, MultiplierKind::Storage);
    let headroom = capacity - building.stored(offer.offer_resource);
    if headroom < offer.net_amount() {
        return Err(CommandError::NotEnoughStorage);
    }
    Ok(())
}

/// Apply a validated fill: pay the wanted resource out of headquarter
/// storage, receive the offered resource net of tariff.
pub fn apply_fill(
    state: &mut GameState,
    catalog: &Catalog,
    grid: &HexGrid,
    offer: &TradeOffer,
    events: &mut EventBus,
    tick: Ticks,
) {
    let Some(hq) = state.headquarter_xy(catalog) else {
        return;
    };
    let Some(kind) = state.building_at(hq).map(|b| b.kind) else {
        return;
    };
    let capacity = catalog.building(kind).base_storage
        * modifier::resolve(state, catalog, grid, hq, MultiplierKind::Storage);
    let net = offer.net_amount();
    let Some(building) = state.building_at_mut(hq) else {
        return;
    };
    let _ = building.remove(offer.want_resource, offer.want_amount);
    let _ = building.add_capped(offer.offer_resource, net, capacity);
    events.emit(Event::TradeFilled {
        resource: offer.offer_resource,
        amount: net,
        tick,
    });
}

// ===========================================================================
// Tests
// ===========================================================================
