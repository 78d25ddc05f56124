//! Live network roster: controllers, ATIS stations, and pilots.
//!
//! Decoded from the VATSIM v3 JSON data feed. A `LiveSnapshot` is immutable
//! once built and carries a callsign index over both controllers and ATIS
//! stations, which the reconciler uses for its removal pass.

use std::collections::HashMap;

use serde::{Deserialize, Deserializer, Serialize};

use crate::types::Result;

/// Default public location of the v3 data feed.
pub const VATSIM_DATA_URL: &str = "https://data.vatsim.net/v3/vatsim-data.json";

// ---------------------------------------------------------------------------
// Feed records
// ---------------------------------------------------------------------------

/// Feed header.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct General {
    pub version: i32,
    pub reload: i32,
    pub update: String,
    pub update_timestamp: String,
    pub connected_clients: i32,
    pub unique_users: i32,
}

/// A connected controller or ATIS station.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Controller {
    pub cid: i64,
    pub name: String,
    pub callsign: String,
    pub frequency: String,
    pub facility: i32,
    pub rating: i32,
    pub server: String,
    pub visual_range: i32,
    pub atis_code: Option<String>,
    #[serde(deserialize_with = "null_as_empty")]
    pub text_atis: Vec<String>,
    pub logon_time: String,
    pub last_updated: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlightPlan {
    pub flight_rules: String,
    pub aircraft: String,
    pub departure: String,
    pub arrival: String,
    pub alternate: String,
    pub cruise_tas: String,
    pub altitude: String,
    pub deptime: String,
    pub enroute_time: String,
    pub fuel_time: String,
    pub remarks: String,
    pub route: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Pilot {
    pub cid: i64,
    pub name: String,
    pub callsign: String,
    pub server: String,
    pub pilot_rating: i32,
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: i32,
    pub groundspeed: i32,
    pub transponder: String,
    pub heading: i32,
    pub qnh_i_hg: f64,
    pub qnh_mb: i32,
    pub flight_plan: Option<FlightPlan>,
    pub logon_time: String,
    pub last_updated: String,
}

/// Facility code descriptor published by the feed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Facility {
    pub id: i32,
    pub short: String,
    pub long: String,
}

fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Deserialize)]
struct Feed {
    #[serde(default)]
    general: General,
    #[serde(default)]
    pilots: Vec<Pilot>,
    #[serde(default)]
    controllers: Vec<Controller>,
    #[serde(default)]
    atis: Vec<Controller>,
    #[serde(default)]
    facilities: Vec<Facility>,
}

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
enum Slot {
    Controller(usize),
    Atis(usize),
}

/// Immutable decoded roster with lookup indices.
#[derive(Debug, Clone, Default)]
pub struct LiveSnapshot {
    pub general: General,
    pub pilots: Vec<Pilot>,
    controllers: Vec<Controller>,
    atis: Vec<Controller>,
    facilities: Vec<Facility>,
    by_callsign: HashMap<String, Slot>,
    facility_by_id: HashMap<i32, usize>,
}

impl LiveSnapshot {
    /// Build a snapshot and its indices. An ATIS callsign shadows a
    /// controller with the same callsign.
    pub fn new(
        general: General,
        controllers: Vec<Controller>,
        atis: Vec<Controller>,
        pilots: Vec<Pilot>,
        facilities: Vec<Facility>,
    ) -> Self {
        let mut by_callsign = HashMap::with_capacity(controllers.len() + atis.len());
        for (i, c) in controllers.iter().enumerate() {
            by_callsign.insert(c.callsign.clone(), Slot::Controller(i));
        }
        for (i, a) in atis.iter().enumerate() {
            by_callsign.insert(a.callsign.clone(), Slot::Atis(i));
        }

        let facility_by_id = facilities
            .iter()
            .enumerate()
            .map(|(i, f)| (f.id, i))
            .collect();

        LiveSnapshot {
            general,
            pilots,
            controllers,
            atis,
            facilities,
            by_callsign,
            facility_by_id,
        }
    }

    /// Snapshot holding only controllers and ATIS stations.
    pub fn from_controllers(controllers: Vec<Controller>, atis: Vec<Controller>) -> Self {
        Self::new(General::default(), controllers, atis, Vec::new(), Vec::new())
    }

    /// Decode a v3 JSON data feed.
    pub fn from_json(raw: &[u8]) -> Result<Self> {
        let feed: Feed = serde_json::from_slice(raw)?;
        Ok(Self::new(
            feed.general,
            feed.controllers,
            feed.atis,
            feed.pilots,
            feed.facilities,
        ))
    }

    pub fn controllers(&self) -> &[Controller] {
        &self.controllers
    }

    pub fn atis(&self) -> &[Controller] {
        &self.atis
    }

    pub fn facilities(&self) -> &[Facility] {
        &self.facilities
    }

    /// Find a controller or ATIS station by callsign.
    pub fn find_controller(&self, callsign: &str) -> Option<&Controller> {
        match self.by_callsign.get(callsign)? {
            Slot::Controller(i) => self.controllers.get(*i),
            Slot::Atis(i) => self.atis.get(*i),
        }
    }

    pub fn has_callsign(&self, callsign: &str) -> bool {
        self.by_callsign.contains_key(callsign)
    }

    pub fn find_facility(&self, id: i32) -> Option<&Facility> {
        self.facility_by_id.get(&id).map(|&i| &self.facilities[i])
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const FEED: &str = r#"{
        "general": {"version": 3, "reload": 1, "update": "20240101120000",
                    "update_timestamp": "2024-01-01T12:00:00Z",
                    "connected_clients": 3, "unique_users": 3},
        "pilots": [{"cid": 1, "name": "P", "callsign": "DLH400", "latitude": 50.0,
                    "longitude": 8.5, "altitude": 35000, "flight_plan": null}],
        "controllers": [
            {"cid": 10, "name": "Tower Guy", "callsign": "EDDF_TWR", "frequency": "119.900",
             "facility": 4, "rating": 3, "server": "GERMANY", "visual_range": 50,
             "text_atis": null, "last_updated": "t1", "logon_time": "t0"}
        ],
        "atis": [
            {"cid": 11, "name": "Atis", "callsign": "EDDF_ATIS", "frequency": "118.025",
             "facility": 4, "rating": 3, "server": "GERMANY", "visual_range": 0,
             "atis_code": "K", "text_atis": ["LINE ONE", "LINE TWO"],
             "last_updated": "t1", "logon_time": "t0"}
        ],
        "facilities": [{"id": 4, "short": "TWR", "long": "Tower"}],
        "servers": []
    }"#;

    #[test]
    fn test_decode_feed() {
        let snap = LiveSnapshot::from_json(FEED.as_bytes()).unwrap();
        assert_eq!(snap.general.version, 3);
        assert_eq!(snap.pilots.len(), 1);
        assert!(snap.pilots[0].flight_plan.is_none());
        assert_eq!(snap.controllers().len(), 1);
        assert!(snap.controllers()[0].text_atis.is_empty());
        assert_eq!(snap.atis()[0].atis_code.as_deref(), Some("K"));
        assert_eq!(snap.atis()[0].text_atis, vec!["LINE ONE", "LINE TWO"]);
    }

    #[test]
    fn test_find_controller_covers_atis() {
        let snap = LiveSnapshot::from_json(FEED.as_bytes()).unwrap();
        assert_eq!(snap.find_controller("EDDF_TWR").unwrap().cid, 10);
        assert_eq!(snap.find_controller("EDDF_ATIS").unwrap().cid, 11);
        assert!(snap.has_callsign("EDDF_ATIS"));
        assert!(!snap.has_callsign("EDDF_GND"));
    }

    #[test]
    fn test_find_facility() {
        let snap = LiveSnapshot::from_json(FEED.as_bytes()).unwrap();
        assert_eq!(snap.find_facility(4).unwrap().short, "TWR");
        assert!(snap.find_facility(6).is_none());
    }

    #[test]
    fn test_missing_sections_default_empty() {
        let snap = LiveSnapshot::from_json(b"{}").unwrap();
        assert!(snap.controllers().is_empty());
        assert!(snap.atis().is_empty());
        assert!(snap.pilots.is_empty());
    }

    #[test]
    fn test_malformed_json() {
        assert!(LiveSnapshot::from_json(b"{not json").is_err());
    }
}
