//! Point-of-interest entities shown on the map.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::{Coordinate, EntityId, NavError};

/// The kind of point of interest.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum EntityCategory {
    /// A business listed on the landing map.
    Business,
    /// A charging station.
    Station,
    /// A shipment pickup or drop-off point.
    ShipmentEndpoint,
}

impl EntityCategory {
    /// Dataset label, also used as a marker tag.
    pub fn as_str(self) -> &'static str {
        match self {
            EntityCategory::Business         => "business",
            EntityCategory::Station          => "station",
            EntityCategory::ShipmentEndpoint => "shipment-endpoint",
        }
    }
}

impl fmt::Display for EntityCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityCategory {
    type Err = NavError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "business"                            => Ok(EntityCategory::Business),
            "station"                             => Ok(EntityCategory::Station),
            "shipment-endpoint" | "shipment"      => Ok(EntityCategory::ShipmentEndpoint),
            other => Err(NavError::Parse(format!(
                "invalid category {other:?}: expected \"business\", \"station\", or \"shipment-endpoint\""
            ))),
        }
    }
}

/// A named point of interest with a location.
///
/// Entities are created from datasets at load time and never mutated in
/// place; a refresh replaces the whole collection.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GeoEntity {
    pub id:         EntityId,
    pub name:       String,
    pub category:   EntityCategory,
    pub coordinate: Coordinate,
    /// Free-form display attributes (address, phone, connector type…).
    pub attributes: BTreeMap<String, String>,
}

impl GeoEntity {
    pub fn new(
        id:         EntityId,
        name:       impl Into<String>,
        category:   EntityCategory,
        coordinate: Coordinate,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            category,
            coordinate,
            attributes: BTreeMap::new(),
        }
    }

    /// Builder-style attribute insertion.
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }
}
