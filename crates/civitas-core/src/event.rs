//! Typed simulation events.
//!
//! Events are emitted during the tick phases and buffered; consumers
//! (rendering, UI, audio) drain the buffer between ticks. Events are
//! read-only notifications -- external mutation goes through the command
//! queue, never through event handlers. Event kinds can be suppressed, which
//! skips buffering entirely.

use crate::command::CommandError;
use crate::fixed::{Fixed64, Ticks};
use crate::grid::TileXy;
use crate::id::{BuildingId, GreatPersonId, ResourceId, TechId, TransportId};
use std::collections::BTreeSet;

// ---------------------------------------------------------------------------
// Event types
// ---------------------------------------------------------------------------

/// A simulation event. All events carry the tick at which they occurred.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    // -- Buildings --
    BuildingPlaced {
        xy: TileXy,
        kind: BuildingId,
        tick: Ticks,
    },
    ConstructionCompleted {
        xy: TileXy,
        kind: BuildingId,
        tick: Ticks,
    },
    UpgradeCompleted {
        xy: TileXy,
        kind: BuildingId,
        level: u32,
        tick: Ticks,
    },
    WonderCompleted {
        xy: TileXy,
        kind: BuildingId,
        tick: Ticks,
    },
    BuildingSold {
        xy: TileXy,
        kind: BuildingId,
        tick: Ticks,
    },

    // -- Transport --
    TransportArrived {
        id: TransportId,
        to: TileXy,
        resource: ResourceId,
        /// Amount accepted into storage (overflow past capacity is lost).
        delivered: Fixed64,
        tick: Ticks,
    },
    TransportCancelled {
        id: TransportId,
        tick: Ticks,
    },

    // -- Unlocks --
    TechUnlocked {
        tech: TechId,
        tick: Ticks,
    },
    GreatPersonBorn {
        person: GreatPersonId,
        tick: Ticks,
    },

    // -- External interface --
    TradeFilled {
        resource: ResourceId,
        amount: Fixed64,
        tick: Ticks,
    },
    /// A queued command failed re-validation at the tick boundary.
    CommandRejected {
        reason: CommandError,
        tick: Ticks,
    },
}

/// Discriminant tag for event types, used for suppression and filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum EventKind {
    BuildingPlaced,
    ConstructionCompleted,
    UpgradeCompleted,
    WonderCompleted,
    BuildingSold,
    TransportArrived,
    TransportCancelled,
    TechUnlocked,
    GreatPersonBorn,
    TradeFilled,
    CommandRejected,
}

impl Event {
    /// Get the discriminant kind for this event.
    pub fn kind(&self) -> EventKind {
        match self {
            Event::BuildingPlaced { .. } => EventKind::BuildingPlaced,
            Event::ConstructionCompleted { .. } => EventKind::ConstructionCompleted,
            Event::UpgradeCompleted { .. } => EventKind::UpgradeCompleted,
            Event::WonderCompleted { .. } => EventKind::WonderCompleted,
            Event::BuildingSold { .. } => EventKind::BuildingSold,
            Event::TransportArrived { .. } => EventKind::TransportArrived,
            Event::TransportCancelled { .. } => EventKind::TransportCancelled,
            Event::TechUnlocked { .. } => EventKind::TechUnlocked,
            Event::GreatPersonBorn { .. } => EventKind::GreatPersonBorn,
            Event::TradeFilled { .. } => EventKind::TradeFilled,
            Event::CommandRejected { .. } => EventKind::CommandRejected,
        }
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Buffered event delivery. Not serialized; a loaded game starts with an
/// empty buffer.
#[derive(Debug, Default)]
pub struct EventBus {
    buffer: Vec<Event>,
    suppressed: BTreeSet<EventKind>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an event unless its kind is suppressed.
    pub fn emit(&mut self, event: Event) {
        if !self.suppressed.contains(&event.kind()) {
            self.buffer.push(event);
        }
    }

    /// Suppress an event kind. Suppressed events are never buffered.
    pub fn suppress(&mut self, kind: EventKind) {
        self.suppressed.insert(kind);
    }

    /// Re-enable a suppressed event kind.
    pub fn unsuppress(&mut self, kind: EventKind) {
        self.suppressed.remove(&kind);
    }

    /// Take all buffered events, in emission order.
    pub fn drain(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.buffer)
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn placed(tick: Ticks) -> Event {
        Event::BuildingPlaced {
            xy: TileXy::new(1, 1),
            kind: BuildingId(0),
            tick,
        }
    }

    #[test]
    fn emit_and_drain_preserves_order() {
        let mut bus = EventBus::new();
        bus.emit(placed(1));
        bus.emit(Event::TechUnlocked {
            tech: TechId(0),
            tick: 1,
        });
        let events = bus.drain();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].kind(), EventKind::BuildingPlaced);
        assert_eq!(events[1].kind(), EventKind::TechUnlocked);
        assert!(bus.is_empty());
    }

    #[test]
    fn suppressed_kinds_are_never_buffered() {
        let mut bus = EventBus::new();
        bus.suppress(EventKind::BuildingPlaced);
        bus.emit(placed(1));
        assert!(bus.is_empty());

        bus.unsuppress(EventKind::BuildingPlaced);
        bus.emit(placed(2));
        assert_eq!(bus.len(), 1);
    }
}
