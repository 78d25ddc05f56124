//! VATSpy catalog and FIR boundary parser.
//!
//! Catalog text is a sectioned, pipe-delimited format:
//!
//! ```text
//! ; comment
//! [Countries]
//! Germany|ED|Radar
//! [Airports]
//! EDDF|Frankfurt/Main|50.026|8.543|FRA|EDGG|0
//! ```
//!
//! A data line whose column count does not match the active section ends
//! that section and is re-read as a possible `[Header]`. Boundary text is a
//! sequence of 10-column headers each followed by `pointCount` `lat|lng`
//! lines. Any numeric failure aborts the whole parse.

use std::collections::HashMap;

use crate::catalog::{Airport, Catalog, Country, Fir, Uir};
use crate::types::{Boundaries, Point, Result, WatchError};

const COORD: &str = "lat/lng value";
const BOUNDARY_HEADER_COLUMNS: usize = 10;

/// Parse catalog and boundary text into an indexed `Catalog`.
pub fn parse(data: &[u8], boundaries: &[u8]) -> Result<Catalog> {
    let boundaries = parse_boundaries(&String::from_utf8_lossy(boundaries))?;
    parse_catalog(&String::from_utf8_lossy(data), &boundaries)
}

// ---------------------------------------------------------------------------
// Catalog sections
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    /// Between sections or inside an unrecognized one.
    Outside,
    Countries,
    Airports,
    Firs,
    Uirs,
}

impl Section {
    fn columns(self) -> usize {
        match self {
            Section::Outside => 0,
            Section::Countries => 3,
            Section::Airports => 7,
            Section::Firs => 4,
            Section::Uirs => 3,
        }
    }

    /// Section named by a `[Header]` line. Unknown names map to `Outside`.
    fn from_header(line: &str) -> Section {
        let name = line.trim_start_matches('[');
        let name = name.strip_suffix(']').unwrap_or(name);
        match name.trim().to_ascii_lowercase().as_str() {
            "countries" => Section::Countries,
            "airports" => Section::Airports,
            "firs" => Section::Firs,
            "uirs" => Section::Uirs,
            _ => Section::Outside,
        }
    }
}

fn parse_catalog(text: &str, boundaries: &HashMap<String, Boundaries>) -> Result<Catalog> {
    let mut countries = Vec::new();
    let mut airports = Vec::new();
    let mut firs = Vec::new();
    let mut uirs = Vec::new();

    let mut section = Section::Outside;

    for (idx, raw) in text.lines().enumerate() {
        let line_num = idx + 1;
        let line = raw.trim();
        if line.is_empty() || line.starts_with(';') {
            continue;
        }

        let tokens: Vec<&str> = line.split('|').collect();

        if section != Section::Outside && tokens.len() == section.columns() {
            match section {
                Section::Countries => countries.push(Country {
                    name: tokens[0].to_string(),
                    prefix: tokens[1].to_string(),
                    control_custom_name: tokens[2].to_string(),
                }),
                Section::Airports => airports.push(Airport {
                    icao: tokens[0].to_string(),
                    name: tokens[1].to_string(),
                    position: Point::new(
                        parse_f64(tokens[2], line_num, COORD)?,
                        parse_f64(tokens[3], line_num, COORD)?,
                    ),
                    iata: tokens[4].to_string(),
                    fir_id: tokens[5].to_string(),
                    is_pseudo: tokens[6] == "1",
                }),
                Section::Firs => {
                    let id = tokens[0].to_string();
                    // The same id may appear on several FIR lines, so the
                    // polygon is cloned rather than taken.
                    let bounds = boundaries.get(&id).cloned().unwrap_or_default();
                    firs.push(Fir {
                        id,
                        name: tokens[1].to_string(),
                        prefix: tokens[2].to_string(),
                        parent_id: tokens[3].to_string(),
                        boundaries: bounds,
                    });
                }
                Section::Uirs => uirs.push(Uir {
                    id: tokens[0].to_string(),
                    name: tokens[1].to_string(),
                    fir_ids: tokens[2]
                        .split(',')
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .map(String::from)
                        .collect(),
                }),
                Section::Outside => {}
            }
            continue;
        }

        // Wrong column count (or no active section): re-read as a header.
        if line.starts_with('[') {
            section = Section::from_header(line);
            if section == Section::Outside {
                tracing::debug!(line = line_num, header = line, "skipping unknown catalog section");
            }
        } else {
            if section != Section::Outside {
                tracing::debug!(line = line_num, "dropping line with unexpected column count");
            }
            section = Section::Outside;
        }
    }

    Ok(Catalog::new(countries, airports, firs, uirs))
}

// ---------------------------------------------------------------------------
// Boundaries
// ---------------------------------------------------------------------------

/// Parse FIR boundary blocks into an id → polygon map.
fn parse_boundaries(text: &str) -> Result<HashMap<String, Boundaries>> {
    let mut result = HashMap::new();

    let mut current: Option<(String, Boundaries)> = None;
    let mut points_left = 0usize;
    let mut last_line = 0usize;

    for (idx, raw) in text.lines().enumerate() {
        let line_num = idx + 1;
        last_line = line_num;
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }

        let tokens: Vec<&str> = line.split('|').collect();

        if points_left == 0 {
            if tokens.len() != BOUNDARY_HEADER_COLUMNS {
                return Err(WatchError::parse(line_num, line, "boundary header"));
            }

            let id = tokens[0].to_string();
            let count: usize = tokens[3]
                .trim()
                .parse()
                .map_err(|_| WatchError::parse(line_num, tokens[3], "point count value"))?;

            let bounds = Boundaries {
                is_oceanic: tokens[1] == "1",
                is_extension: tokens[2] == "1",
                min: Point::new(
                    parse_f64(tokens[4], line_num, COORD)?,
                    parse_f64(tokens[5], line_num, COORD)?,
                ),
                max: Point::new(
                    parse_f64(tokens[6], line_num, COORD)?,
                    parse_f64(tokens[7], line_num, COORD)?,
                ),
                center: Point::new(
                    parse_f64(tokens[8], line_num, COORD)?,
                    parse_f64(tokens[9], line_num, COORD)?,
                ),
                points: Vec::with_capacity(count),
            };

            if count == 0 {
                result.insert(id, bounds);
            } else {
                points_left = count;
                current = Some((id, bounds));
            }
        } else {
            if tokens.len() != 2 {
                return Err(WatchError::parse(line_num, line, "boundary point"));
            }
            let point = Point::new(
                parse_f64(tokens[0], line_num, COORD)?,
                parse_f64(tokens[1], line_num, COORD)?,
            );
            points_left -= 1;

            if let Some((_, bounds)) = current.as_mut() {
                bounds.points.push(point);
            }
            if points_left == 0 {
                if let Some((id, bounds)) = current.take() {
                    result.insert(id, bounds);
                }
            }
        }
    }

    if let Some((id, _)) = current {
        return Err(WatchError::parse(last_line, &id, "boundary block (truncated)"));
    }

    Ok(result)
}

fn parse_f64(token: &str, line: usize, what: &'static str) -> Result<f64> {
    token
        .trim()
        .parse()
        .map_err(|_| WatchError::parse(line, token, what))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
