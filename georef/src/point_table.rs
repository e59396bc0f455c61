use std::path::Path;

use glam::DVec2;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::envelope::Crs;
use crate::error::{GeorefError, Result};
use crate::mapper::CoordinateMapper;
use crate::point::{GrPoint, Point4Values, PointResidual, RowColumn, ViewportKind};
use crate::store::CorrespondenceStore;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointTableRow {
    pub footprint: DVec2,
    pub georeferenced: DVec2,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub residual: Option<PointResidual>,
}

/// Saved correspondence table in world coordinates.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PointTableFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crs: Option<Crs>,
    pub rows: Vec<PointTableRow>,
}

impl PointTableFile {
    pub fn from_store(store: &CorrespondenceStore, crs: Option<Crs>) -> Self {
        let rows = store
            .entries()
            .iter()
            .map(|e| PointTableRow {
                footprint: e.footprint.world_coords.pos,
                georeferenced: e.georeferenced.world_coords.pos,
                residual: e.residual,
            })
            .collect();
        Self { crs, rows }
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let format = common::FileFormat::from_path(path)?;
        let serialized = std::fs::read_to_string(path)?;
        let table: Self = common::serde::deserialize(&serialized, format)?;

        if let Some(row) = table
            .rows
            .iter()
            .position(|r| !r.footprint.is_finite() || !r.georeferenced.is_finite())
        {
            return Err(GeorefError::input(format!(
                "row {row} of {} holds a non-finite coordinate",
                path.display()
            )));
        }

        info!(path = %path.display(), rows = table.rows.len(), "point table loaded");
        Ok(table)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let format = common::FileFormat::from_path(path)?;
        let serialized = common::serde::serialize(self, format)?;
        std::fs::write(path, serialized)?;

        info!(path = %path.display(), rows = self.rows.len(), "point table saved");
        Ok(())
    }

    /// Rebuilds a store. Pixels of viewports without an envelope stay at zero.
    pub fn to_store(&self, mapper: &CoordinateMapper) -> Result<CorrespondenceStore> {
        let mut store = CorrespondenceStore::new();
        for (row, entry) in self.rows.iter().enumerate() {
            let footprint = point_values(mapper, ViewportKind::Footprint, entry.footprint, row);
            let georeferenced =
                point_values(mapper, ViewportKind::Georeferenced, entry.georeferenced, row);
            store.add(footprint, georeferenced)?;
        }
        Ok(store)
    }
}

fn point_values(
    mapper: &CoordinateMapper,
    kind: ViewportKind,
    world: DVec2,
    row: usize,
) -> Point4Values {
    let world = GrPoint::new(kind, world);
    let pixel = mapper
        .world_to_pixel(world)
        .unwrap_or_else(|_| GrPoint::new(kind, DVec2::ZERO));
    Point4Values::new(pixel, world, RowColumn::for_kind(row, kind))
}
