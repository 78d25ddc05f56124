//! Static facility/airspace catalog: countries, airports, FIRs, UIRs.
//!
//! A `Catalog` is built once per refresh by the parser and never mutated
//! afterwards. Every lookup index is rebuilt wholesale in `Catalog::new`, so
//! an `Arc<Catalog>` can be shared read-only by any number of subscribers.
//!
//! Cross references (UIR → FIR, airport → FIR) are kept as ids and resolved
//! through the indices at lookup time.

use std::collections::HashMap;
use std::path::Path;

use serde::Serialize;

use crate::parser;
use crate::types::{Boundaries, Point, Result};

// ---------------------------------------------------------------------------
// Entities
// ---------------------------------------------------------------------------

/// A country region. One record per callsign prefix, so several records may
/// share a display name.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Country {
    pub name: String,
    pub prefix: String,
    pub control_custom_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Airport {
    pub icao: String,
    pub name: String,
    pub position: Point,
    pub iata: String,
    pub fir_id: String,
    pub is_pseudo: bool,
}

/// Flight Information Region.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Fir {
    pub id: String,
    pub name: String,
    pub prefix: String,
    pub parent_id: String,
    pub boundaries: Boundaries,
}

/// Upper Information Region: a named group of FIR ids.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Uir {
    pub id: String,
    pub name: String,
    pub fir_ids: Vec<String>,
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

/// Immutable catalog snapshot with lookup indices.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    countries: Vec<Country>,
    airports: Vec<Airport>,
    firs: Vec<Fir>,
    uirs: Vec<Uir>,

    country_by_prefix: HashMap<String, usize>,
    countries_by_name: HashMap<String, Vec<usize>>,
    airport_by_icao: HashMap<String, usize>,
    airport_by_iata: HashMap<String, usize>,
    fir_by_id: HashMap<String, usize>,
    uir_by_id: HashMap<String, usize>,
}

impl Catalog {
    /// Assemble a catalog and build all indices in one pass.
    ///
    /// Single-valued indices keep the last record on key collision; the
    /// country-by-name index keeps every record in insertion order.
    pub fn new(
        countries: Vec<Country>,
        airports: Vec<Airport>,
        firs: Vec<Fir>,
        uirs: Vec<Uir>,
    ) -> Self {
        let mut catalog = Catalog {
            countries,
            airports,
            firs,
            uirs,
            ..Default::default()
        };

        for (i, country) in catalog.countries.iter().enumerate() {
            catalog.country_by_prefix.insert(country.prefix.clone(), i);
            catalog
                .countries_by_name
                .entry(country.name.clone())
                .or_default()
                .push(i);
        }

        for (i, airport) in catalog.airports.iter().enumerate() {
            catalog.airport_by_icao.insert(airport.icao.clone(), i);
            // Most airports have no IATA code; an empty key would make
            // `find_airport("")` resolve to whichever came last.
            if !airport.iata.is_empty() {
                catalog.airport_by_iata.insert(airport.iata.clone(), i);
            }
        }

        for (i, fir) in catalog.firs.iter().enumerate() {
            catalog.fir_by_id.insert(fir.id.clone(), i);
        }

        for (i, uir) in catalog.uirs.iter().enumerate() {
            catalog.uir_by_id.insert(uir.id.clone(), i);
        }

        catalog
    }

    /// Parse raw catalog and boundary text.
    pub fn parse(data: &[u8], boundaries: &[u8]) -> Result<Self> {
        parser::parse(data, boundaries)
    }

    /// Load and parse catalog and boundary files from disk.
    pub fn load(data_path: impl AsRef<Path>, boundaries_path: impl AsRef<Path>) -> Result<Self> {
        let data = std::fs::read(data_path)?;
        let boundaries = std::fs::read(boundaries_path)?;
        Self::parse(&data, &boundaries)
    }

    pub fn countries(&self) -> &[Country] {
        &self.countries
    }

    pub fn airports(&self) -> &[Airport] {
        &self.airports
    }

    pub fn firs(&self) -> &[Fir] {
        &self.firs
    }

    pub fn uirs(&self) -> &[Uir] {
        &self.uirs
    }

    /// All country records sharing a display name, in catalog order.
    pub fn find_countries_by_name(&self, name: &str) -> Vec<&Country> {
        self.countries_by_name
            .get(name)
            .map(|idx| idx.iter().map(|&i| &self.countries[i]).collect())
            .unwrap_or_default()
    }

    pub fn find_country_by_prefix(&self, prefix: &str) -> Option<&Country> {
        self.country_by_prefix
            .get(prefix)
            .map(|&i| &self.countries[i])
    }

    pub fn find_airport_by_icao(&self, icao: &str) -> Option<&Airport> {
        self.airport_by_icao.get(icao).map(|&i| &self.airports[i])
    }

    pub fn find_airport_by_iata(&self, iata: &str) -> Option<&Airport> {
        self.airport_by_iata.get(iata).map(|&i| &self.airports[i])
    }

    /// Look up an airport by ICAO code, falling back to IATA.
    pub fn find_airport(&self, id: &str) -> Option<&Airport> {
        self.find_airport_by_icao(id)
            .or_else(|| self.find_airport_by_iata(id))
    }

    pub fn find_fir(&self, id: &str) -> Option<&Fir> {
        self.fir_by_id.get(id).map(|&i| &self.firs[i])
    }

    pub fn find_uir(&self, id: &str) -> Option<&Uir> {
        self.uir_by_id.get(id).map(|&i| &self.uirs[i])
    }

    /// Resolve a UIR's member FIRs. Members missing from the catalog are
    /// skipped; returns `None` when the UIR itself is unknown.
    pub fn find_uir_firs(&self, id: &str) -> Option<Vec<&Fir>> {
        let uir = self.find_uir(id)?;
        Some(
            uir.fir_ids
                .iter()
                .filter_map(|fir_id| self.find_fir(fir_id))
                .collect(),
        )
    }

    pub fn airport_icao_codes(&self) -> Vec<&str> {
        self.airport_by_icao.keys().map(String::as_str).collect()
    }

    pub fn airport_iata_codes(&self) -> Vec<&str> {
        self.airport_by_iata.keys().map(String::as_str).collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
