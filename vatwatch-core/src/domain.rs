//! Subscriber-facing entities: controlled airports, radars, and change events.
//!
//! Every type here derives `PartialEq`, so change detection is plain
//! structural equality. Optional controller slots compare absent/absent as
//! equal and absent/present as different.

use std::fmt;

use serde::Serialize;

use crate::catalog::{Airport, Country, Fir};
use crate::live::Controller;

/// Facility code of an area (centre) controller.
pub const FACILITY_CENTER: i32 = 6;

// ---------------------------------------------------------------------------
// Airport controllers
// ---------------------------------------------------------------------------

/// Position a controller occupies at an airport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Delivery,
    Ground,
    Tower,
    Approach,
    Atis,
}

impl Role {
    pub const ALL: [Role; 5] = [
        Role::Approach,
        Role::Delivery,
        Role::Ground,
        Role::Tower,
        Role::Atis,
    ];

    /// Map a controller facility code to an airport role. ATIS has no
    /// facility code of its own; it comes from the feed's ATIS list.
    pub fn from_facility(code: i32) -> Option<Role> {
        match code {
            2 => Some(Role::Delivery),
            3 => Some(Role::Ground),
            4 => Some(Role::Tower),
            5 => Some(Role::Approach),
            _ => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Delivery => write!(f, "DEL"),
            Role::Ground => write!(f, "GND"),
            Role::Tower => write!(f, "TWR"),
            Role::Approach => write!(f, "APP"),
            Role::Atis => write!(f, "ATIS"),
        }
    }
}

/// A controller bound to one airport in one role.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AirportController {
    pub icao: String,
    pub role: Role,
    pub controller: Controller,
}

impl AirportController {
    pub fn callsign(&self) -> &str {
        &self.controller.callsign
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ControllerSet {
    pub approach: Option<AirportController>,
    pub delivery: Option<AirportController>,
    pub ground: Option<AirportController>,
    pub tower: Option<AirportController>,
    pub atis: Option<AirportController>,
}

impl ControllerSet {
    pub fn slot(&self, role: Role) -> &Option<AirportController> {
        match role {
            Role::Approach => &self.approach,
            Role::Delivery => &self.delivery,
            Role::Ground => &self.ground,
            Role::Tower => &self.tower,
            Role::Atis => &self.atis,
        }
    }

    pub fn slot_mut(&mut self, role: Role) -> &mut Option<AirportController> {
        match role {
            Role::Approach => &mut self.approach,
            Role::Delivery => &mut self.delivery,
            Role::Ground => &mut self.ground,
            Role::Tower => &mut self.tower,
            Role::Atis => &mut self.atis,
        }
    }

    /// True when no slot is occupied.
    pub fn is_empty(&self) -> bool {
        Role::ALL.iter().all(|&r| self.slot(r).is_none())
    }

    /// Occupied slots in `Role::ALL` order.
    pub fn iter(&self) -> impl Iterator<Item = &AirportController> {
        Role::ALL.into_iter().filter_map(|r| self.slot(r).as_ref())
    }
}

/// A catalog airport enriched with its online controllers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackedAirport {
    #[serde(flatten)]
    pub airport: Airport,
    pub controllers: ControllerSet,
}

impl TrackedAirport {
    pub fn new(airport: Airport) -> Self {
        TrackedAirport {
            airport,
            controllers: ControllerSet::default(),
        }
    }

    pub fn icao(&self) -> &str {
        &self.airport.icao
    }

    pub fn is_empty(&self) -> bool {
        self.controllers.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Radar
// ---------------------------------------------------------------------------

/// An area controller covering one or more FIRs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Radar {
    pub name: String,
    pub controller: Controller,
    pub firs: Vec<Fir>,
}

impl Radar {
    pub fn callsign(&self) -> &str {
        &self.controller.callsign
    }
}

// ---------------------------------------------------------------------------
// Change events
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Add,
    Modify,
    Remove,
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangeKind::Add => write!(f, "add"),
            ChangeKind::Modify => write!(f, "modify"),
            ChangeKind::Remove => write!(f, "remove"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Payload {
    Country(Country),
    Airport(TrackedAirport),
    Radar(Radar),
}

impl Payload {
    /// State key of the payload: prefix, ICAO code, or callsign.
    pub fn key(&self) -> &str {
        match self {
            Payload::Country(c) => &c.prefix,
            Payload::Airport(a) => a.icao(),
            Payload::Radar(r) => r.callsign(),
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Payload::Country(_) => "country",
            Payload::Airport(_) => "airport",
            Payload::Radar(_) => "radar",
        }
    }
}

/// One ordered change to a subscriber's view.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Change {
    pub kind: ChangeKind,
    pub payload: Payload,
}

impl Change {
    pub fn new(kind: ChangeKind, payload: Payload) -> Self {
        Change { kind, payload }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Point;

    fn controller(callsign: &str) -> Controller {
        Controller {
            cid: 1,
            callsign: callsign.into(),
            facility: 4,
            text_atis: vec!["a".into(), "b".into()],
            ..Default::default()
        }
    }

    fn airport() -> Airport {
        Airport {
            icao: "KJFK".into(),
            name: "Kennedy".into(),
            position: Point::new(40.6, -73.8),
            iata: "JFK".into(),
            fir_id: "KZNY".into(),
            is_pseudo: false,
        }
    }

    fn bound(role: Role, c: Controller) -> Option<AirportController> {
        Some(AirportController {
            icao: "KJFK".into(),
            role,
            controller: c,
        })
    }

    #[test]
    fn test_role_from_facility() {
        assert_eq!(Role::from_facility(2), Some(Role::Delivery));
        assert_eq!(Role::from_facility(5), Some(Role::Approach));
        assert_eq!(Role::from_facility(6), None);
        assert_eq!(Role::from_facility(1), None);
    }

    #[test]
    fn test_controller_set_empty() {
        let mut set = ControllerSet::default();
        assert!(set.is_empty());
        *set.slot_mut(Role::Ground) = bound(Role::Ground, controller("KJFK_GND"));
        assert!(!set.is_empty());
        assert_eq!(set.iter().count(), 1);
    }

    #[test]
    fn test_airport_equality_is_structural() {
        let mut a = TrackedAirport::new(airport());
        let mut b = TrackedAirport::new(airport());
        a.controllers.tower = bound(Role::Tower, controller("KJFK_TWR"));
        b.controllers.tower = bound(Role::Tower, controller("KJFK_TWR"));
        assert_eq!(a, b);

        // Text ATIS order matters.
        let mut reordered = controller("KJFK_TWR");
        reordered.text_atis.reverse();
        b.controllers.tower = bound(Role::Tower, reordered);
        assert_ne!(a, b);

        b.controllers.tower = None;
        assert_ne!(a, b);
    }

    #[test]
    fn test_payload_key() {
        let change = Change::new(
            ChangeKind::Modify,
            Payload::Airport(TrackedAirport::new(airport())),
        );
        assert_eq!(change.payload.key(), "KJFK");
        assert_eq!(change.payload.type_name(), "airport");
        assert_eq!(change.kind.to_string(), "modify");
    }

    #[test]
    fn test_change_serializes_tagged() {
        let change = Change::new(
            ChangeKind::Add,
            Payload::Country(Country {
                name: "Germany".into(),
                prefix: "ED".into(),
                control_custom_name: String::new(),
            }),
        );
        let json = serde_json::to_value(&change).unwrap();
        assert_eq!(json["kind"], "add");
        assert_eq!(json["payload"]["type"], "country");
        assert_eq!(json["payload"]["prefix"], "ED");
    }
}
