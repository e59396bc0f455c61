use std::path::Path;

use glam::{DVec2, DVec3};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::envelope::Envelope;
use crate::error::{GeorefError, Result};

/// A closed outline in 2D world coordinates.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Ring {
    pub points: Vec<DVec2>,
}

impl Ring {
    pub fn new(points: Vec<DVec2>) -> Self {
        Self { points }
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// One horizontal surface of a building, e.g. ground plate or roof.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildingPart {
    pub outline: Vec<DVec3>,
}

impl BuildingPart {
    /// Height of the part, taken from its first vertex.
    pub fn elevation(&self) -> Option<f64> {
        self.outline.first().map(|p| p.z)
    }

    /// Moves every vertex in the plane, heights stay.
    pub fn map_xy(&self, map: &impl Fn(DVec2) -> DVec2) -> Self {
        Self {
            outline: self
                .outline
                .iter()
                .map(|p| map(p.truncate()).extend(p.z))
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Building {
    pub id: String,
    pub parts: Vec<BuildingPart>,
}

impl Building {
    /// The lowest horizontal part. On equal elevation the later part wins.
    pub fn ground_part(&self) -> Option<&BuildingPart> {
        let mut taken: Option<(&BuildingPart, f64)> = None;
        for part in &self.parts {
            let Some(z) = part.elevation() else {
                continue;
            };
            match taken {
                Some((_, minimal_z)) if minimal_z < z => {}
                _ => taken = Some((part, z)),
            }
        }
        taken.map(|(part, _)| part)
    }

    pub fn map_xy(&self, map: &impl Fn(DVec2) -> DVec2) -> Self {
        Self {
            id: self.id.clone(),
            parts: self.parts.iter().map(|part| part.map_xy(map)).collect(),
        }
    }
}

/// Reads a building model, YAML or JSON by extension.
pub fn load_buildings(path: impl AsRef<Path>) -> Result<Vec<Building>> {
    let path = path.as_ref();
    let format = common::FileFormat::from_path(path)?;
    let serialized = std::fs::read_to_string(path)?;
    let buildings: Vec<Building> = common::serde::deserialize(&serialized, format)?;

    info!(path = %path.display(), buildings = buildings.len(), "building model loaded");
    Ok(buildings)
}

pub fn save_buildings(path: impl AsRef<Path>, buildings: &[Building]) -> Result<()> {
    let path = path.as_ref();
    let format = common::FileFormat::from_path(path)?;
    let serialized = common::serde::serialize(&buildings, format)?;
    std::fs::write(path, serialized)?;

    info!(path = %path.display(), buildings = buildings.len(), "building model saved");
    Ok(())
}

/// 2D footprint geometry shown in the footprint viewport and snapped to on clicks.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Footprint {
    rings: Vec<Ring>,
}

impl Footprint {
    pub fn new(rings: Vec<Ring>) -> Self {
        Self {
            rings: rings.into_iter().filter(|r| !r.is_empty()).collect(),
        }
    }

    pub fn from_buildings(buildings: &[Building]) -> Self {
        let rings = buildings
            .iter()
            .filter_map(Building::ground_part)
            .map(|part| Ring::new(part.outline.iter().map(|p| p.truncate()).collect()))
            .collect();
        Self::new(rings)
    }

    pub fn rings(&self) -> &[Ring] {
        &self.rings
    }

    pub fn is_empty(&self) -> bool {
        self.rings.is_empty()
    }

    pub fn vertices(&self) -> impl Iterator<Item = DVec2> + '_ {
        self.rings.iter().flat_map(|r| r.points.iter().copied())
    }

    pub fn closest_vertex(&self, p: DVec2) -> Option<DVec2> {
        self.vertices().min_by(|a, b| {
            a.distance_squared(p)
                .total_cmp(&b.distance_squared(p))
        })
    }

    pub fn envelope(&self) -> Result<Envelope> {
        let mut vertices = self.vertices();
        let first = vertices
            .next()
            .ok_or_else(|| GeorefError::DegenerateEnvelope("footprint is empty".to_string()))?;
        let (min, max) = vertices.fold((first, first), |(min, max), p| (min.min(p), max.max(p)));
        Envelope::new(min, max)
    }
}
