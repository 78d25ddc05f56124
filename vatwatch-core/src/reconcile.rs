//! Per-subscriber reconciliation of catalog and live snapshots.
//!
//! Pure logic, no I/O. A `Reconciler` owns the last materialized view
//! (`State`) for one subscriber and turns each new `Catalog` or
//! `LiveSnapshot` into an ordered list of `Change` events, mutating the view
//! as it goes. Callsigns that cannot be routed are reported as
//! `ResolutionMiss` records so the caller decides how to log them.
//!
//! Airports discovered in the catalog are announced with `Add`; airports that
//! first appear because a controller logged on are announced with `Modify`.

use std::collections::BTreeMap;
use std::fmt;

use crate::catalog::{Catalog, Country, Fir};
use crate::domain::{
    AirportController, Change, ChangeKind, Payload, Radar, Role, TrackedAirport, FACILITY_CENTER,
};
use crate::live::{Controller, LiveSnapshot};
use crate::types::{is_silent_suffix, split_callsign};

/// Control name used when a country has no custom one.
pub const DEFAULT_CONTROL_NAME: &str = "Centre";

// ---------------------------------------------------------------------------
// Outputs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MissKind {
    /// Callsign prefix is neither an ICAO nor an IATA code.
    Airport,
    /// Callsign prefix is neither a FIR nor a UIR id.
    Airspace,
    /// A UIR lists a FIR id that is not in the catalog.
    UirMember { uir: String, fir: String },
}

/// A live record that could not be mapped onto the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResolutionMiss {
    pub callsign: String,
    pub kind: MissKind,
}

impl fmt::Display for ResolutionMiss {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            MissKind::Airport => write!(f, "{}: no airport for callsign prefix", self.callsign),
            MissKind::Airspace => write!(f, "{}: no FIR or UIR for callsign prefix", self.callsign),
            MissKind::UirMember { uir, fir } => {
                write!(f, "{}: UIR {uir} lists unknown FIR {fir}", self.callsign)
            }
        }
    }
}

/// Result of one reconciliation pass.
#[derive(Debug, Default)]
pub struct Pass {
    pub changes: Vec<Change>,
    pub misses: Vec<ResolutionMiss>,
}

impl Pass {
    fn emit(&mut self, kind: ChangeKind, payload: Payload) {
        self.changes.push(Change::new(kind, payload));
    }

    fn miss(&mut self, callsign: &str, kind: MissKind) {
        self.misses.push(ResolutionMiss {
            callsign: callsign.to_string(),
            kind,
        });
    }
}

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

/// The last view materialized for one subscriber.
#[derive(Debug, Clone, Default)]
pub struct State {
    pub airports: BTreeMap<String, TrackedAirport>,
    pub countries: BTreeMap<String, Country>,
    pub radars: BTreeMap<String, Radar>,
}

// ---------------------------------------------------------------------------
// Reconciler
// ---------------------------------------------------------------------------

pub struct Reconciler {
    state: State,
    controlled_only: bool,
}

impl Reconciler {
    /// With `controlled_only`, airports without any controller are never
    /// surfaced and are removed once their last controller leaves.
    pub fn new(controlled_only: bool) -> Self {
        Reconciler {
            state: State::default(),
            controlled_only,
        }
    }

    pub fn state(&self) -> &State {
        &self.state
    }

    pub fn controlled_only(&self) -> bool {
        self.controlled_only
    }

    /// Diff a freshly parsed catalog against the current view.
    ///
    /// Duplicate catalog rows collapse the same way the catalog's indices do:
    /// the last row for a prefix or ICAO code is the one that counts.
    pub fn process_static(&mut self, catalog: &Catalog) -> Pass {
        let mut pass = Pass::default();
        self.sync_countries(catalog, &mut pass);
        self.sync_airports(catalog, &mut pass);
        pass
    }

    /// Diff a live roster against the current view, resolving callsigns
    /// through `catalog`.
    pub fn process_dynamic(&mut self, live: &LiveSnapshot, catalog: &Catalog) -> Pass {
        let mut pass = Pass::default();

        for controller in live.controllers() {
            if let Some(role) = Role::from_facility(controller.facility) {
                self.attach(catalog, controller, role, &mut pass);
            } else if controller.facility == FACILITY_CENTER {
                self.track_radar(catalog, controller, &mut pass);
            }
        }
        for atis in live.atis() {
            self.attach(catalog, atis, Role::Atis, &mut pass);
        }

        self.drop_offline(live, &mut pass);
        pass
    }

    // -- static ------------------------------------------------------------

    fn sync_countries(&mut self, catalog: &Catalog, pass: &mut Pass) {
        for country in catalog.countries() {
            if !is_indexed(catalog.find_country_by_prefix(&country.prefix), country) {
                continue;
            }
            match self.state.countries.get(&country.prefix) {
                Some(existing) if existing == country => {}
                Some(_) => {
                    self.state
                        .countries
                        .insert(country.prefix.clone(), country.clone());
                    pass.emit(ChangeKind::Modify, Payload::Country(country.clone()));
                }
                None => {
                    self.state
                        .countries
                        .insert(country.prefix.clone(), country.clone());
                    pass.emit(ChangeKind::Add, Payload::Country(country.clone()));
                }
            }
        }

        let gone: Vec<String> = self
            .state
            .countries
            .keys()
            .filter(|prefix| catalog.find_country_by_prefix(prefix).is_none())
            .cloned()
            .collect();
        for prefix in gone {
            if let Some(country) = self.state.countries.remove(&prefix) {
                pass.emit(ChangeKind::Remove, Payload::Country(country));
            }
        }
    }

    fn sync_airports(&mut self, catalog: &Catalog, pass: &mut Pass) {
        for airport in catalog.airports() {
            if !is_indexed(catalog.find_airport_by_icao(&airport.icao), airport) {
                continue;
            }
            let mut fresh = TrackedAirport::new(airport.clone());

            match self.state.airports.get(&airport.icao) {
                Some(existing) => {
                    // Controllers never come from the catalog.
                    fresh.controllers = existing.controllers.clone();
                    if fresh != *existing {
                        pass.emit(ChangeKind::Modify, Payload::Airport(fresh.clone()));
                        self.state.airports.insert(airport.icao.clone(), fresh);
                    }
                }
                None => {
                    if self.controlled_only && fresh.is_empty() {
                        continue;
                    }
                    pass.emit(ChangeKind::Add, Payload::Airport(fresh.clone()));
                    self.state.airports.insert(airport.icao.clone(), fresh);
                }
            }
        }

        let gone: Vec<String> = self
            .state
            .airports
            .keys()
            .filter(|icao| catalog.find_airport_by_icao(icao).is_none())
            .cloned()
            .collect();
        for icao in gone {
            if let Some(airport) = self.state.airports.remove(&icao) {
                pass.emit(ChangeKind::Remove, Payload::Airport(airport));
            }
        }
    }

    // -- dynamic -----------------------------------------------------------

    fn attach(&mut self, catalog: &Catalog, controller: &Controller, role: Role, pass: &mut Pass) {
        let (prefix, suffix) = split_callsign(&controller.callsign);

        let Some(airport) = catalog.find_airport(prefix) else {
            if !is_silent_suffix(suffix) {
                pass.miss(&controller.callsign, MissKind::Airport);
            }
            return;
        };

        let bound = AirportController {
            icao: airport.icao.clone(),
            role,
            controller: controller.clone(),
        };

        match self.state.airports.get_mut(&airport.icao) {
            Some(existing) => {
                let slot = existing.controllers.slot_mut(role);
                if slot.as_ref() != Some(&bound) {
                    *slot = Some(bound);
                    pass.emit(ChangeKind::Modify, Payload::Airport(existing.clone()));
                }
            }
            None => {
                let mut fresh = TrackedAirport::new(airport.clone());
                *fresh.controllers.slot_mut(role) = Some(bound);
                pass.emit(ChangeKind::Modify, Payload::Airport(fresh.clone()));
                self.state.airports.insert(airport.icao.clone(), fresh);
            }
        }
    }

    fn track_radar(&mut self, catalog: &Catalog, controller: &Controller, pass: &mut Pass) {
        let (prefix, suffix) = split_callsign(&controller.callsign);

        let firs = resolve_airspace(catalog, prefix, &controller.callsign, pass);
        let Some(first) = firs.first() else {
            if !is_silent_suffix(suffix) && !is_supervisor(controller) {
                pass.miss(&controller.callsign, MissKind::Airspace);
            }
            return;
        };

        let radar = Radar {
            name: format!("{} {}", first.name, control_name(catalog, first)),
            controller: controller.clone(),
            firs,
        };

        let kind = match self.state.radars.get(radar.callsign()) {
            Some(prev) if *prev == radar => return,
            Some(_) => ChangeKind::Modify,
            None => ChangeKind::Add,
        };
        pass.emit(kind, Payload::Radar(radar.clone()));
        self.state
            .radars
            .insert(controller.callsign.clone(), radar);
    }

    /// Clear controllers whose callsign left the roster and drop radars
    /// that went offline.
    fn drop_offline(&mut self, live: &LiveSnapshot, pass: &mut Pass) {
        let mut emptied = Vec::new();

        for (icao, airport) in self.state.airports.iter_mut() {
            let mut changed = false;
            for role in Role::ALL {
                let slot = airport.controllers.slot_mut(role);
                let offline = slot
                    .as_ref()
                    .is_some_and(|ac| !live.has_callsign(ac.callsign()));
                if offline {
                    *slot = None;
                    changed = true;
                }
            }
            if !changed {
                continue;
            }
            if self.controlled_only && airport.is_empty() {
                emptied.push(icao.clone());
                pass.emit(ChangeKind::Remove, Payload::Airport(airport.clone()));
            } else {
                pass.emit(ChangeKind::Modify, Payload::Airport(airport.clone()));
            }
        }
        for icao in emptied {
            self.state.airports.remove(&icao);
        }

        let offline: Vec<String> = self
            .state
            .radars
            .keys()
            .filter(|cs| !live.has_callsign(cs))
            .cloned()
            .collect();
        for callsign in offline {
            if let Some(radar) = self.state.radars.remove(&callsign) {
                pass.emit(ChangeKind::Remove, Payload::Radar(radar));
            }
        }
    }
}

/// FIRs covered by an area callsign prefix: a FIR id, or a UIR id expanded
/// to its members. Unknown UIR members are reported and skipped.
/// True when `row` is the record the catalog index returns for its key.
fn is_indexed<T>(indexed: Option<&T>, row: &T) -> bool {
    indexed.is_some_and(|found| std::ptr::eq(found, row))
}

fn resolve_airspace(catalog: &Catalog, prefix: &str, callsign: &str, pass: &mut Pass) -> Vec<Fir> {
    if let Some(fir) = catalog.find_fir(prefix) {
        return vec![fir.clone()];
    }

    let Some(uir) = catalog.find_uir(prefix) else {
        return Vec::new();
    };

    let mut firs = Vec::with_capacity(uir.fir_ids.len());
    for fir_id in &uir.fir_ids {
        match catalog.find_fir(fir_id) {
            Some(fir) => firs.push(fir.clone()),
            None => pass.miss(
                callsign,
                MissKind::UirMember {
                    uir: uir.id.clone(),
                    fir: fir_id.clone(),
                },
            ),
        }
    }
    firs
}

/// Country-specific name for area control ("Radar", "Control", ...), keyed
/// by the first two characters of the FIR id.
fn control_name<'a>(catalog: &'a Catalog, fir: &Fir) -> &'a str {
    let prefix = fir.id.get(..2).unwrap_or(fir.id.as_str());
    catalog
        .find_country_by_prefix(prefix)
        .map(|c| c.control_custom_name.as_str())
        .filter(|name| !name.is_empty())
        .unwrap_or(DEFAULT_CONTROL_NAME)
}

fn is_supervisor(controller: &Controller) -> bool {
    controller
        .text_atis
        .iter()
        .any(|line| line.to_lowercase().contains("supervisor"))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Airport, Uir};
    use crate::types::{Boundaries, Point};

    fn country(name: &str, prefix: &str, custom: &str) -> Country {
        Country {
            name: name.into(),
            prefix: prefix.into(),
            control_custom_name: custom.into(),
        }
    }

    fn airport(icao: &str, iata: &str) -> Airport {
        Airport {
            icao: icao.into(),
            name: format!("{icao} Intl"),
            position: Point::new(10.0, 20.0),
            iata: iata.into(),
            fir_id: String::new(),
            is_pseudo: false,
        }
    }

    fn fir(id: &str, name: &str) -> Fir {
        Fir {
            id: id.into(),
            name: name.into(),
            prefix: String::new(),
            parent_id: String::new(),
            boundaries: Boundaries::default(),
        }
    }

    fn catalog() -> Catalog {
        Catalog::new(
            vec![
                country("United States", "KZ", ""),
                country("Germany", "ED", "Radar"),
            ],
            vec![airport("KJFK", "JFK"), airport("EDDF", "FRA")],
            vec![fir("KZNY", "New York"), fir("EDGG", "Langen"), fir("EDMM", "Munich")],
            vec![Uir {
                id: "EDUU".into(),
                name: "Rhein".into(),
                fir_ids: vec!["EDGG".into(), "EDXX".into(), "EDMM".into()],
            }],
        )
    }

    fn ctl(callsign: &str, facility: i32) -> Controller {
        Controller {
            cid: 100,
            name: "Controller".into(),
            callsign: callsign.into(),
            frequency: "199.998".into(),
            facility,
            rating: 5,
            logon_time: "t0".into(),
            last_updated: "t1".into(),
            ..Default::default()
        }
    }

    fn live(controllers: Vec<Controller>) -> LiveSnapshot {
        LiveSnapshot::from_controllers(controllers, Vec::new())
    }

    fn kinds(pass: &Pass) -> Vec<(ChangeKind, &str)> {
        pass.changes
            .iter()
            .map(|c| (c.kind, c.payload.key()))
            .collect()
    }

    // -- static ------------------------------------------------------------

    #[test]
    fn test_static_adds_everything_when_not_controlled_only() {
        let mut rec = Reconciler::new(false);
        let pass = rec.process_static(&catalog());
        let adds = pass
            .changes
            .iter()
            .filter(|c| c.kind == ChangeKind::Add)
            .count();
        assert_eq!(adds, 4); // 2 countries + 2 airports
        assert_eq!(rec.state().airports.len(), 2);
        assert_eq!(rec.state().countries.len(), 2);
    }

    #[test]
    fn test_static_controlled_only_suppresses_new_airports() {
        let mut rec = Reconciler::new(true);
        let pass = rec.process_static(&catalog());
        assert!(pass
            .changes
            .iter()
            .all(|c| matches!(c.payload, Payload::Country(_))));
        assert!(rec.state().airports.is_empty());
    }

    #[test]
    fn test_static_rerun_is_silent() {
        let cat = catalog();
        let mut rec = Reconciler::new(false);
        rec.process_static(&cat);
        let pass = rec.process_static(&cat);
        assert!(pass.changes.is_empty());
    }

    #[test]
    fn test_static_rerun_keeps_controllers() {
        let cat = catalog();
        let mut rec = Reconciler::new(true);
        rec.process_static(&cat);
        rec.process_dynamic(&live(vec![ctl("KJFK_TWR", 4)]), &cat);

        let pass = rec.process_static(&cat);
        assert!(pass.changes.is_empty());
        assert!(rec.state().airports["KJFK"].controllers.tower.is_some());
    }

    #[test]
    fn test_static_modify_and_remove() {
        let mut rec = Reconciler::new(false);
        rec.process_static(&catalog());

        let mut renamed = airport("KJFK", "JFK");
        renamed.name = "Kennedy".into();
        let next = Catalog::new(
            vec![country("United States", "KZ", "Center")],
            vec![renamed],
            vec![],
            vec![],
        );
        let pass = rec.process_static(&next);
        assert_eq!(
            kinds(&pass),
            vec![
                (ChangeKind::Modify, "KZ"),
                (ChangeKind::Remove, "ED"),
                (ChangeKind::Modify, "KJFK"),
                (ChangeKind::Remove, "EDDF"),
            ]
        );
        assert!(!rec.state().airports.contains_key("EDDF"));
    }

    // -- airports ----------------------------------------------------------

    #[test]
    fn test_static_duplicate_rows_follow_index() {
        let mut second = airport("KJFK", "JFK");
        second.name = "Kennedy".into();
        let cat = Catalog::new(
            vec![country("A", "KZ", ""), country("B", "KZ", "Center")],
            vec![airport("KJFK", "JFK"), second],
            vec![],
            vec![],
        );
        let mut rec = Reconciler::new(false);

        let pass = rec.process_static(&cat);
        assert_eq!(
            kinds(&pass),
            vec![(ChangeKind::Add, "KZ"), (ChangeKind::Add, "KJFK")]
        );
        assert_eq!(rec.state().airports["KJFK"].airport.name, "Kennedy");
        assert_eq!(rec.state().countries["KZ"].name, "B");

        assert!(rec.process_static(&cat).changes.is_empty());
    }

    #[test]
    fn test_tower_attaches_and_emits_modify() {
        let cat = catalog();
        let mut rec = Reconciler::new(true);
        let pass = rec.process_dynamic(&live(vec![ctl("KJFK_TWR", 4)]), &cat);

        assert_eq!(kinds(&pass), vec![(ChangeKind::Modify, "KJFK")]);
        assert!(pass.misses.is_empty());
        let tower = rec.state().airports["KJFK"].controllers.tower.as_ref().unwrap();
        assert_eq!(tower.callsign(), "KJFK_TWR");
        assert_eq!(tower.role, Role::Tower);
    }

    #[test]
    fn test_iata_prefix_resolves() {
        let cat = catalog();
        let mut rec = Reconciler::new(true);
        let pass = rec.process_dynamic(&live(vec![ctl("FRA_GND", 3)]), &cat);
        assert_eq!(kinds(&pass), vec![(ChangeKind::Modify, "EDDF")]);
        assert!(rec.state().airports["EDDF"].controllers.ground.is_some());
    }

    #[test]
    fn test_unchanged_controller_is_silent() {
        let cat = catalog();
        let mut rec = Reconciler::new(true);
        let snap = live(vec![ctl("KJFK_TWR", 4), ctl("KJFK_DEL", 2)]);
        rec.process_dynamic(&snap, &cat);
        let pass = rec.process_dynamic(&snap, &cat);
        assert!(pass.changes.is_empty());
    }

    #[test]
    fn test_controller_field_change_emits_modify() {
        let cat = catalog();
        let mut rec = Reconciler::new(true);
        rec.process_dynamic(&live(vec![ctl("KJFK_APP", 5)]), &cat);

        let mut moved = ctl("KJFK_APP", 5);
        moved.frequency = "132.400".into();
        let pass = rec.process_dynamic(&live(vec![moved]), &cat);
        assert_eq!(kinds(&pass), vec![(ChangeKind::Modify, "KJFK")]);
        let app = rec.state().airports["KJFK"].controllers.approach.as_ref().unwrap();
        assert_eq!(app.controller.frequency, "132.400");
    }

    #[test]
    fn test_unresolved_observer_is_silent() {
        let cat = catalog();
        let mut rec = Reconciler::new(true);
        let pass = rec.process_dynamic(&live(vec![ctl("ZZZZ_OBS", 4)]), &cat);
        assert!(pass.changes.is_empty());
        assert!(pass.misses.is_empty());
    }

    #[test]
    fn test_unresolved_airport_reports_miss() {
        let cat = catalog();
        let mut rec = Reconciler::new(true);
        let pass = rec.process_dynamic(&live(vec![ctl("ZZZZ_TWR", 4)]), &cat);
        assert!(pass.changes.is_empty());
        assert_eq!(
            pass.misses,
            vec![ResolutionMiss {
                callsign: "ZZZZ_TWR".into(),
                kind: MissKind::Airport,
            }]
        );
    }

    #[test]
    fn test_unrouted_facility_ignored() {
        let cat = catalog();
        let mut rec = Reconciler::new(true);
        let pass = rec.process_dynamic(&live(vec![ctl("KJFK_FSS", 1), ctl("ZZZZ_X", 0)]), &cat);
        assert!(pass.changes.is_empty());
        assert!(pass.misses.is_empty());
    }

    #[test]
    fn test_atis_fills_atis_slot() {
        let cat = catalog();
        let mut rec = Reconciler::new(true);
        let mut atis = ctl("KJFK_ATIS", 4);
        atis.atis_code = Some("A".into());
        atis.text_atis = vec!["INFO A".into()];
        let snap = LiveSnapshot::from_controllers(vec![], vec![atis]);

        let pass = rec.process_dynamic(&snap, &cat);
        assert_eq!(kinds(&pass), vec![(ChangeKind::Modify, "KJFK")]);
        let slots = &rec.state().airports["KJFK"].controllers;
        assert!(slots.atis.is_some());
        assert!(slots.tower.is_none());
    }

    #[test]
    fn test_controller_logoff_controlled_only_removes() {
        let cat = catalog();
        let mut rec = Reconciler::new(true);
        rec.process_dynamic(&live(vec![ctl("KJFK_TWR", 4), ctl("KJFK_GND", 3)]), &cat);

        let pass = rec.process_dynamic(&live(vec![ctl("KJFK_GND", 3)]), &cat);
        assert_eq!(kinds(&pass), vec![(ChangeKind::Modify, "KJFK")]);

        let pass = rec.process_dynamic(&live(vec![]), &cat);
        assert_eq!(kinds(&pass), vec![(ChangeKind::Remove, "KJFK")]);
        assert!(rec.state().airports.is_empty());

        let pass = rec.process_dynamic(&live(vec![]), &cat);
        assert!(pass.changes.is_empty());
    }

    #[test]
    fn test_controller_logoff_keeps_catalog_airport() {
        let cat = catalog();
        let mut rec = Reconciler::new(false);
        rec.process_static(&cat);
        rec.process_dynamic(&live(vec![ctl("EDDF_TWR", 4)]), &cat);

        let pass = rec.process_dynamic(&live(vec![]), &cat);
        assert_eq!(kinds(&pass), vec![(ChangeKind::Modify, "EDDF")]);
        assert!(rec.state().airports["EDDF"].is_empty());
    }

    // -- radars ------------------------------------------------------------

    #[test]
    fn test_radar_from_fir_uses_default_control_name() {
        let cat = catalog();
        let mut rec = Reconciler::new(true);
        let pass = rec.process_dynamic(&live(vec![ctl("KZNY_CTR", 6)]), &cat);

        assert_eq!(kinds(&pass), vec![(ChangeKind::Add, "KZNY_CTR")]);
        let radar = &rec.state().radars["KZNY_CTR"];
        assert_eq!(radar.name, "New York Centre");
        assert_eq!(radar.firs.len(), 1);
    }

    #[test]
    fn test_radar_from_uir_expands_and_reports_missing_member() {
        let cat = catalog();
        let mut rec = Reconciler::new(true);
        let pass = rec.process_dynamic(&live(vec![ctl("EDUU_CTR", 6)]), &cat);

        assert_eq!(kinds(&pass), vec![(ChangeKind::Add, "EDUU_CTR")]);
        let radar = &rec.state().radars["EDUU_CTR"];
        let ids: Vec<_> = radar.firs.iter().map(|f| f.id.as_str()).collect();
        assert_eq!(ids, vec!["EDGG", "EDMM"]);
        assert_eq!(radar.name, "Langen Radar");
        assert_eq!(
            pass.misses,
            vec![ResolutionMiss {
                callsign: "EDUU_CTR".into(),
                kind: MissKind::UirMember {
                    uir: "EDUU".into(),
                    fir: "EDXX".into(),
                },
            }]
        );
    }

    fn orphan_uir_catalog() -> Catalog {
        Catalog::new(
            vec![],
            vec![],
            vec![],
            vec![Uir {
                id: "XXUU".into(),
                name: "Nowhere".into(),
                fir_ids: vec!["XX01".into(), "XX02".into()],
            }],
        )
    }

    fn member_miss(callsign: &str, fir: &str) -> ResolutionMiss {
        ResolutionMiss {
            callsign: callsign.into(),
            kind: MissKind::UirMember {
                uir: "XXUU".into(),
                fir: fir.into(),
            },
        }
    }

    #[test]
    fn test_uir_without_known_members_is_a_miss() {
        let cat = orphan_uir_catalog();
        let mut rec = Reconciler::new(true);
        let pass = rec.process_dynamic(&live(vec![ctl("XXUU_CTR", 6)]), &cat);

        assert!(pass.changes.is_empty());
        assert!(rec.state().radars.is_empty());
        assert_eq!(
            pass.misses,
            vec![
                member_miss("XXUU_CTR", "XX01"),
                member_miss("XXUU_CTR", "XX02"),
                ResolutionMiss {
                    callsign: "XXUU_CTR".into(),
                    kind: MissKind::Airspace,
                },
            ]
        );
    }

    #[test]
    fn test_uir_without_known_members_observer_skips_airspace_miss() {
        let cat = orphan_uir_catalog();
        let mut rec = Reconciler::new(true);
        let pass = rec.process_dynamic(&live(vec![ctl("XXUU_OBS", 6)]), &cat);

        assert!(pass.changes.is_empty());
        assert!(rec.state().radars.is_empty());
        assert_eq!(
            pass.misses,
            vec![member_miss("XXUU_OBS", "XX01"), member_miss("XXUU_OBS", "XX02")]
        );
    }

    #[test]
    fn test_radar_modify_on_change() {
        let cat = catalog();
        let mut rec = Reconciler::new(true);
        rec.process_dynamic(&live(vec![ctl("EDGG_CTR", 6)]), &cat);

        let pass = rec.process_dynamic(&live(vec![ctl("EDGG_CTR", 6)]), &cat);
        assert!(pass.changes.is_empty());

        let mut updated = ctl("EDGG_CTR", 6);
        updated.text_atis = vec!["Langen Radar".into()];
        let pass = rec.process_dynamic(&live(vec![updated]), &cat);
        assert_eq!(kinds(&pass), vec![(ChangeKind::Modify, "EDGG_CTR")]);
    }

    #[test]
    fn test_radar_removed_once() {
        let cat = catalog();
        let mut rec = Reconciler::new(true);
        rec.process_dynamic(&live(vec![ctl("KZNY_CTR", 6)]), &cat);

        let pass = rec.process_dynamic(&live(vec![]), &cat);
        assert_eq!(kinds(&pass), vec![(ChangeKind::Remove, "KZNY_CTR")]);

        let pass = rec.process_dynamic(&live(vec![]), &cat);
        assert!(pass.changes.is_empty());
    }

    #[test]
    fn test_radar_miss_suppression() {
        let cat = catalog();
        let mut rec = Reconciler::new(true);

        let mut supervisor = ctl("XXXX_CTR", 6);
        supervisor.text_atis = vec!["Network SUPERVISOR on duty".into()];
        let pass = rec.process_dynamic(
            &live(vec![ctl("XXXX_SUP", 6), ctl("XXXX_OBS", 6), supervisor]),
            &cat,
        );
        assert!(pass.changes.is_empty());
        assert!(pass.misses.is_empty());

        let pass = rec.process_dynamic(&live(vec![ctl("XXXX_CTR", 6)]), &cat);
        assert_eq!(pass.misses.len(), 1);
        assert_eq!(pass.misses[0].kind, MissKind::Airspace);
    }

    #[test]
    fn test_removals_follow_additions() {
        let cat = catalog();
        let mut rec = Reconciler::new(true);
        rec.process_dynamic(&live(vec![ctl("KZNY_CTR", 6)]), &cat);

        let pass = rec.process_dynamic(&live(vec![ctl("EDDF_DEL", 2)]), &cat);
        assert_eq!(
            kinds(&pass),
            vec![(ChangeKind::Modify, "EDDF"), (ChangeKind::Remove, "KZNY_CTR")]
        );
    }

    #[test]
    fn test_miss_display() {
        let miss = ResolutionMiss {
            callsign: "EDUU_CTR".into(),
            kind: MissKind::UirMember {
                uir: "EDUU".into(),
                fir: "EDXX".into(),
            },
        };
        assert_eq!(miss.to_string(), "EDUU_CTR: UIR EDUU lists unknown FIR EDXX");
    }
}
