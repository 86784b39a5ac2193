//! Location model: a resolved coordinate plus a human-readable label

use serde::{Deserialize, Serialize};

use super::grid;

/// Position understood by a forecast source
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Coordinate {
    /// KMA 5 km forecast grid cell
    Grid { nx: u16, ny: u16 },
    /// Latitude/longitude in decimal degrees
    LatLon { latitude: f64, longitude: f64 },
}

/// Location coordinates, immutable once resolved
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct LocationCoordinate {
    /// Location name shown to the user (e.g. "서울 강남구")
    pub label: String,
    pub coordinate: Coordinate,
}

impl LocationCoordinate {
    #[must_use]
    pub fn grid(label: impl Into<String>, nx: u16, ny: u16) -> Self {
        Self {
            label: label.into(),
            coordinate: Coordinate::Grid { nx, ny },
        }
    }

    #[must_use]
    pub fn lat_lon(label: impl Into<String>, latitude: f64, longitude: f64) -> Self {
        Self {
            label: label.into(),
            coordinate: Coordinate::LatLon {
                latitude,
                longitude,
            },
        }
    }

    /// Grid cell for this location, projecting lat/lon when needed
    #[must_use]
    pub fn grid_cell(&self) -> (u16, u16) {
        match self.coordinate {
            Coordinate::Grid { nx, ny } => (nx, ny),
            Coordinate::LatLon {
                latitude,
                longitude,
            } => grid::to_grid(latitude, longitude),
        }
    }

    /// Latitude/longitude, if the location carries them
    #[must_use]
    pub fn lat_lon_pair(&self) -> Option<(f64, f64)> {
        match self.coordinate {
            Coordinate::Grid { .. } => None,
            Coordinate::LatLon {
                latitude,
                longitude,
            } => Some((latitude, longitude)),
        }
    }

    /// Format location as coordinates string
    #[must_use]
    pub fn format_coordinates(&self) -> String {
        match self.coordinate {
            Coordinate::Grid { nx, ny } => format!("grid {nx},{ny}"),
            Coordinate::LatLon {
                latitude,
                longitude,
            } => format!("{latitude:.4}, {longitude:.4}"),
        }
    }
}

impl std::fmt::Display for LocationCoordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.label, self.format_coordinates())
    }
}
