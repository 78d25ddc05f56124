//! Change filters: gate which events reach a subscriber's queue.
//!
//! Filters only affect visibility. A rejected change has still been applied
//! to the subscriber's view, so filtering never desynchronizes state.

use crate::domain::{Change, ChangeKind, Payload};

/// A predicate over change events.
pub trait ChangeFilter: Send + Sync {
    fn accept(&self, change: &Change) -> bool;
}

impl<F> ChangeFilter for F
where
    F: Fn(&Change) -> bool + Send + Sync,
{
    fn accept(&self, change: &Change) -> bool {
        self(change)
    }
}

pub type BoxedFilter = Box<dyn ChangeFilter>;

/// True when every filter in the chain accepts `change`. Filters run in
/// order and stop at the first rejection.
pub fn accepts_all(filters: &[BoxedFilter], change: &Change) -> bool {
    filters.iter().all(|f| f.accept(change))
}

// ---------------------------------------------------------------------------
// Built-in filters
// ---------------------------------------------------------------------------

/// Pass only the listed payload types.
#[derive(Debug, Clone, Default)]
pub struct PayloadFilter {
    pub countries: bool,
    pub airports: bool,
    pub radars: bool,
}

impl PayloadFilter {
    pub fn airports() -> Self {
        PayloadFilter {
            airports: true,
            ..Default::default()
        }
    }

    pub fn radars() -> Self {
        PayloadFilter {
            radars: true,
            ..Default::default()
        }
    }

    /// Parse a comma-separated list such as `airports,radars`.
    pub fn from_list(list: &str) -> Option<Self> {
        let mut filter = PayloadFilter::default();
        for item in list.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            match item.to_ascii_lowercase().as_str() {
                "country" | "countries" => filter.countries = true,
                "airport" | "airports" => filter.airports = true,
                "radar" | "radars" => filter.radars = true,
                _ => return None,
            }
        }
        Some(filter)
    }
}

impl ChangeFilter for PayloadFilter {
    fn accept(&self, change: &Change) -> bool {
        match change.payload {
            Payload::Country(_) => self.countries,
            Payload::Airport(_) => self.airports,
            Payload::Radar(_) => self.radars,
        }
    }
}

/// Pass only the listed change kinds.
#[derive(Debug, Clone)]
pub struct KindFilter(pub Vec<ChangeKind>);

impl ChangeFilter for KindFilter {
    fn accept(&self, change: &Change) -> bool {
        self.0.contains(&change.kind)
    }
}

/// Pass changes inside a region identified by an ICAO-style prefix.
///
/// Airports match on their ICAO code, radars on any covered FIR id,
/// countries on their own prefix.
#[derive(Debug, Clone)]
pub struct PrefixFilter {
    prefixes: Vec<String>,
}

impl PrefixFilter {
    pub fn new<I, S>(prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        PrefixFilter {
            prefixes: prefixes.into_iter().map(Into::into).collect(),
        }
    }

    fn matches(&self, id: &str) -> bool {
        self.prefixes.iter().any(|p| id.starts_with(p.as_str()))
    }
}

impl ChangeFilter for PrefixFilter {
    fn accept(&self, change: &Change) -> bool {
        match &change.payload {
            Payload::Country(c) => self.matches(&c.prefix),
            Payload::Airport(a) => self.matches(a.icao()),
            Payload::Radar(r) => r.firs.iter().any(|f| self.matches(&f.id)),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Airport, Country, Fir};
    use crate::domain::{Radar, TrackedAirport};
    use crate::live::Controller;
    use crate::types::{Boundaries, Point};

    fn airport_change(icao: &str) -> Change {
        Change::new(
            ChangeKind::Modify,
            Payload::Airport(TrackedAirport::new(Airport {
                icao: icao.into(),
                name: String::new(),
                position: Point::default(),
                iata: String::new(),
                fir_id: String::new(),
                is_pseudo: false,
            })),
        )
    }

    fn radar_change(fir_ids: &[&str]) -> Change {
        Change::new(
            ChangeKind::Add,
            Payload::Radar(Radar {
                name: "Test Centre".into(),
                controller: Controller::default(),
                firs: fir_ids
                    .iter()
                    .map(|id| Fir {
                        id: id.to_string(),
                        name: String::new(),
                        prefix: String::new(),
                        parent_id: String::new(),
                        boundaries: Boundaries::default(),
                    })
                    .collect(),
            }),
        )
    }

    fn country_change(prefix: &str) -> Change {
        Change::new(
            ChangeKind::Remove,
            Payload::Country(Country {
                name: String::new(),
                prefix: prefix.into(),
                control_custom_name: String::new(),
            }),
        )
    }

    #[test]
    fn test_payload_filter() {
        let f = PayloadFilter::airports();
        assert!(f.accept(&airport_change("EDDF")));
        assert!(!f.accept(&radar_change(&["EDGG"])));
        assert!(!f.accept(&country_change("ED")));
    }

    #[test]
    fn test_payload_filter_from_list() {
        let f = PayloadFilter::from_list("radars, countries").unwrap();
        assert!(f.radars && f.countries && !f.airports);
        assert!(PayloadFilter::from_list("pilots").is_none());
    }

    #[test]
    fn test_kind_filter() {
        let f = KindFilter(vec![ChangeKind::Add, ChangeKind::Remove]);
        assert!(f.accept(&radar_change(&["EDGG"])));
        assert!(!f.accept(&airport_change("EDDF")));
    }

    #[test]
    fn test_prefix_filter() {
        let f = PrefixFilter::new(["ED", "LF"]);
        assert!(f.accept(&airport_change("EDDF")));
        assert!(!f.accept(&airport_change("KJFK")));
        assert!(f.accept(&radar_change(&["KZNY", "LFFF"])));
        assert!(f.accept(&country_change("ED")));
    }

    #[test]
    fn test_chain_with_closure() {
        let filters: Vec<BoxedFilter> = vec![
            Box::new(PayloadFilter::airports()),
            Box::new(|c: &Change| c.payload.key() != "EDDM"),
        ];
        assert!(accepts_all(&filters, &airport_change("EDDF")));
        assert!(!accepts_all(&filters, &airport_change("EDDM")));
        assert!(!accepts_all(&filters, &radar_change(&["EDGG"])));
        assert!(accepts_all(&[], &radar_change(&["EDGG"])));
    }
}
