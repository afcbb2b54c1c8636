//! Entity dataset loaders.
//!
//! # CSV format
//!
//! One row per entity.  The five columns below are required (in any order);
//! every other column is copied into `GeoEntity::attributes`, skipping empty
//! cells.
//!
//! ```csv
//! id,name,category,lon,lat,address
//! 1,Harbor Fuel,business,-88.043,30.694,12 Water St
//! 2,Northside Charger,station,-88.051,30.712,
//! 3,Dock 4 pickup,shipment-endpoint,-88.039,30.688,
//! ```
//!
//! # JSON format
//!
//! An array of objects; `coordinate` is a GeoJSON-style `[lon, lat]` pair and
//! `attributes` is optional.
//!
//! ```json
//! [{ "id": 2, "name": "Northside Charger", "category": "station",
//!    "coordinate": [-88.051, 30.712], "attributes": { "connector": "CCS" } }]
//! ```

use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

use serde::Deserialize;

use nav_core::{Coordinate, EntityCategory, EntityId, GeoEntity};

use crate::{EntityError, EntityResult};

// ── Public API ────────────────────────────────────────────────────────────────

/// Load entities from a CSV file.
pub fn load_entities_csv(path: &Path) -> EntityResult<Vec<GeoEntity>> {
    let file = std::fs::File::open(path)?;
    load_entities_reader(file)
}

/// Like [`load_entities_csv`] but accepts any `Read` source.
pub fn load_entities_reader<R: Read>(reader: R) -> EntityResult<Vec<GeoEntity>> {
    let mut csv_reader = csv::Reader::from_reader(reader);
    let headers = csv_reader.headers()?.clone();
    let columns = Columns::locate(&headers)?;

    let mut entities = Vec::new();
    for (row_no, record) in csv_reader.records().enumerate() {
        let record = record?;
        // Header is line 1.
        let line = row_no + 2;
        let field = |col: usize| record.get(col).unwrap_or("").trim();

        let id = field(columns.id)
            .parse::<u32>()
            .map_err(|_| EntityError::Parse(format!("line {line}: invalid id {:?}", field(columns.id))))?;
        let category = parse_category(field(columns.category), line)?;
        let coordinate = parse_coordinate(field(columns.lon), field(columns.lat), line)?;

        let attributes = headers
            .iter()
            .enumerate()
            .filter(|(col, _)| !columns.contains(*col))
            .filter_map(|(col, key)| {
                let value = field(col);
                (!value.is_empty()).then(|| (key.to_string(), value.to_string()))
            })
            .collect();

        entities.push(GeoEntity {
            id: EntityId(id),
            name: field(columns.name).to_string(),
            category,
            coordinate,
            attributes,
        });
    }

    Ok(entities)
}

/// Load entities from a JSON file.
pub fn load_entities_json(path: &Path) -> EntityResult<Vec<GeoEntity>> {
    let file = std::fs::File::open(path)?;
    load_entities_json_reader(file)
}

/// Like [`load_entities_json`] but accepts any `Read` source.
pub fn load_entities_json_reader<R: Read>(reader: R) -> EntityResult<Vec<GeoEntity>> {
    let records: Vec<EntityRecord> = serde_json::from_reader(reader)?;
    records
        .into_iter()
        .enumerate()
        .map(|(i, r)| {
            let coordinate = Coordinate::from(r.coordinate);
            if !coordinate.is_valid() {
                return Err(EntityError::Parse(format!(
                    "record {i}: coordinate {coordinate} is outside WGS-84 range"
                )));
            }
            Ok(GeoEntity {
                id: EntityId(r.id),
                name: r.name,
                category: r
                    .category
                    .parse()
                    .map_err(|e| EntityError::Parse(format!("record {i}: {e}")))?,
                coordinate,
                attributes: r.attributes,
            })
        })
        .collect()
}

// ── JSON record ───────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct EntityRecord {
    id:         u32,
    name:       String,
    category:   String,
    coordinate: [f64; 2],
    #[serde(default)]
    attributes: BTreeMap<String, String>,
}

// ── CSV helpers ───────────────────────────────────────────────────────────────

/// Column positions of the required CSV fields.
struct Columns {
    id:       usize,
    name:     usize,
    category: usize,
    lon:      usize,
    lat:      usize,
}

impl Columns {
    fn locate(headers: &csv::StringRecord) -> EntityResult<Self> {
        let find = |names: &[&str]| {
            headers
                .iter()
                .position(|h| names.iter().any(|n| h.trim().eq_ignore_ascii_case(n)))
                .ok_or_else(|| {
                    EntityError::Parse(format!("missing required column {:?}", names[0]))
                })
        };
        Ok(Self {
            id:       find(&["id"])?,
            name:     find(&["name"])?,
            category: find(&["category"])?,
            lon:      find(&["lon", "lng", "longitude"])?,
            lat:      find(&["lat", "latitude"])?,
        })
    }

    fn contains(&self, col: usize) -> bool {
        [self.id, self.name, self.category, self.lon, self.lat].contains(&col)
    }
}

fn parse_category(s: &str, line: usize) -> EntityResult<EntityCategory> {
    s.parse::<EntityCategory>()
        .map_err(|e| EntityError::Parse(format!("line {line}: {e}")))
}

fn parse_coordinate(lon: &str, lat: &str, line: usize) -> EntityResult<Coordinate> {
    let parse = |s: &str, what: &str| {
        s.parse::<f64>()
            .map_err(|_| EntityError::Parse(format!("line {line}: invalid {what} {s:?}")))
    };
    let c = Coordinate::new(parse(lon, "longitude")?, parse(lat, "latitude")?);
    if !c.is_valid() {
        return Err(EntityError::Parse(format!(
            "line {line}: coordinate {c} is outside WGS-84 range"
        )));
    }
    Ok(c)
}
