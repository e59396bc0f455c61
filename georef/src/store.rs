use glam::DVec2;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter};
use tracing::debug;

use crate::error::{GeorefError, Result};
use crate::mapper::CoordinateMapper;
use crate::point::{GrPoint, Point4Values, PointResidual, ViewportKind};

/// Columns of the correspondence table, in display order.
#[repr(usize)]
#[derive(Debug, Display, EnumIter, Clone, Copy, PartialEq, Eq)]
pub enum TableColumn {
    GeorefX = 0,
    GeorefY = 1,
    FootprintX = 2,
    FootprintY = 3,
    ResidualX = 4,
    ResidualY = 5,
}

impl TableColumn {
    pub fn from_index(index: usize) -> Result<Self> {
        Ok(match index {
            0 => TableColumn::GeorefX,
            1 => TableColumn::GeorefY,
            2 => TableColumn::FootprintX,
            3 => TableColumn::FootprintY,
            4 => TableColumn::ResidualX,
            5 => TableColumn::ResidualY,
            _ => return Err(GeorefError::input(format!("no table column {index}"))),
        })
    }

    /// Viewport of an editable coordinate column, `None` for residual columns.
    pub fn viewport(self) -> Option<ViewportKind> {
        match self {
            TableColumn::GeorefX | TableColumn::GeorefY => Some(ViewportKind::Georeferenced),
            TableColumn::FootprintX | TableColumn::FootprintY => Some(ViewportKind::Footprint),
            TableColumn::ResidualX | TableColumn::ResidualY => None,
        }
    }

    fn is_x(self) -> bool {
        matches!(
            self,
            TableColumn::GeorefX | TableColumn::FootprintX | TableColumn::ResidualX
        )
    }

    /// Replaces the coordinate this column shows. Residual columns are read only.
    pub fn apply(self, world: DVec2, value: f64) -> Result<DVec2> {
        if self.viewport().is_none() {
            return Err(GeorefError::input(format!("column {self} is read only")));
        }
        Ok(if self.is_x() {
            DVec2::new(value, world.y)
        } else {
            DVec2::new(world.x, value)
        })
    }
}

/// A matched footprint/georeferenced pair and its latest residual.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Correspondence {
    pub footprint: Point4Values,
    pub georeferenced: Point4Values,
    pub residual: Option<PointResidual>,
}

impl Correspondence {
    pub fn point(&self, kind: ViewportKind) -> &Point4Values {
        match kind {
            ViewportKind::Footprint => &self.footprint,
            ViewportKind::Georeferenced => &self.georeferenced,
        }
    }

    fn point_mut(&mut self, kind: ViewportKind) -> &mut Point4Values {
        match kind {
            ViewportKind::Footprint => &mut self.footprint,
            ViewportKind::Georeferenced => &mut self.georeferenced,
        }
    }

    pub fn row(&self) -> usize {
        self.footprint.rc.row
    }
}

/// Ordered correspondences. Position in the sequence is the table row.
#[derive(Debug, Clone, Default)]
pub struct CorrespondenceStore {
    entries: Vec<Correspondence>,
}

impl CorrespondenceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[Correspondence] {
        &self.entries
    }

    pub fn get(&self, row: usize) -> Option<&Correspondence> {
        self.entries.get(row)
    }

    /// Appends a completed pair and returns its row.
    pub fn add(&mut self, footprint: Point4Values, georeferenced: Point4Values) -> Result<usize> {
        footprint.world_coords.ensure_kind(ViewportKind::Footprint)?;
        georeferenced
            .world_coords
            .ensure_kind(ViewportKind::Georeferenced)?;

        let row = self.entries.len();
        let mut entry = Correspondence {
            footprint,
            georeferenced,
            residual: None,
        };
        entry.footprint.set_row(row);
        entry.georeferenced.set_row(row);
        self.entries.push(entry);

        debug!(row, "correspondence added");
        Ok(row)
    }

    /// Removes the given rows. Either all rows exist and are removed or nothing changes.
    pub fn remove_rows(&mut self, rows: &[usize]) -> Result<()> {
        if let Some(&missing) = rows.iter().find(|&&row| row >= self.entries.len()) {
            return Err(GeorefError::RowNotFound(missing));
        }

        let mut rows = rows.to_vec();
        rows.sort_unstable_by(|a, b| b.cmp(a));
        rows.dedup();
        for row in rows {
            self.entries.remove(row);
        }

        self.renumber();
        Ok(())
    }

    pub fn remove_all(&mut self) {
        self.entries.clear();
    }

    pub fn renumber(&mut self) {
        for (row, entry) in self.entries.iter_mut().enumerate() {
            entry.footprint.set_row(row);
            entry.georeferenced.set_row(row);
        }
    }

    /// Writes a table edit back into the entry at `row`. Returns whether anything changed.
    pub fn update_cell(
        &mut self,
        row: usize,
        column: TableColumn,
        value: f64,
        mapper: &CoordinateMapper,
    ) -> Result<bool> {
        if !value.is_finite() {
            return Err(GeorefError::input(format!("{value} is not a coordinate")));
        }
        let kind = column
            .viewport()
            .ok_or_else(|| GeorefError::input(format!("column {column} is read only")))?;
        let entry = self
            .entries
            .iter_mut()
            .find(|e| e.row() == row)
            .ok_or(GeorefError::RowNotFound(row))?;

        let point = entry.point_mut(kind);
        let world = column.apply(point.world_coords.pos, value)?;
        if world == point.world_coords.pos {
            return Ok(false);
        }

        let world = GrPoint::new(kind, world);
        let pixel = mapper.world_to_pixel(world).unwrap_or(point.new_value);
        point.relocate(pixel, world);
        entry.residual = None;

        debug!(row, %column, value, "cell updated");
        Ok(true)
    }

    /// Recomputes every stored pixel position from its world coordinate.
    pub fn reproject(&mut self, mapper: &CoordinateMapper) {
        for entry in &mut self.entries {
            for kind in [ViewportKind::Footprint, ViewportKind::Georeferenced] {
                let point = entry.point_mut(kind);
                if let Ok(pixel) = mapper.world_to_pixel(point.world_coords) {
                    point.new_value = pixel;
                }
            }
        }
    }

    pub fn set_residuals(&mut self, residuals: &[PointResidual]) -> Result<()> {
        if residuals.len() != self.entries.len() {
            return Err(GeorefError::input(format!(
                "{} residuals for {} correspondences",
                residuals.len(),
                self.entries.len()
            )));
        }
        for (entry, residual) in self.entries.iter_mut().zip(residuals) {
            entry.residual = Some(*residual);
        }
        Ok(())
    }

    pub fn clear_residuals(&mut self) {
        for entry in &mut self.entries {
            entry.residual = None;
        }
    }

    /// World coordinates of one side, in row order.
    pub fn world_points(&self, kind: ViewportKind) -> Vec<DVec2> {
        self.entries
            .iter()
            .map(|e| e.point(kind).world_coords.pos)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope::Envelope;
    use crate::point::RowColumn;

    fn p4(kind: ViewportKind, x: f64, y: f64) -> Point4Values {
        let world = GrPoint::new(kind, DVec2::new(x, y));
        Point4Values::new(world, world, RowColumn::for_kind(usize::MAX, kind))
    }

    fn store_of(n: usize) -> CorrespondenceStore {
        let mut store = CorrespondenceStore::new();
        for i in 0..n {
            let v = i as f64;
            store
                .add(
                    p4(ViewportKind::Footprint, v, v),
                    p4(ViewportKind::Georeferenced, 100.0 + v, 100.0 + v),
                )
                .unwrap();
        }
        store
    }

    fn assert_rows_match_positions(store: &CorrespondenceStore) {
        for (i, e) in store.entries().iter().enumerate() {
            assert_eq!(e.footprint.rc.row, i);
            assert_eq!(e.georeferenced.rc.row, i);
        }
    }

    #[test]
    fn add_assigns_rows_and_checks_kinds() {
        let mut store = store_of(2);
        assert_eq!(store.len(), 2);
        assert_rows_match_positions(&store);
        assert!(store.get(1).unwrap().residual.is_none());

        let err = store
            .add(
                p4(ViewportKind::Georeferenced, 0.0, 0.0),
                p4(ViewportKind::Georeferenced, 0.0, 0.0),
            )
            .unwrap_err();
        assert!(matches!(err, GeorefError::KindMismatch { .. }));
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn removing_rows_two_and_zero_keeps_row_one() {
        let mut store = store_of(3);
        store.remove_rows(&[2, 0]).unwrap();

        assert_eq!(store.len(), 1);
        let only = store.get(0).unwrap();
        assert_eq!(only.footprint.world_coords.pos, DVec2::new(1.0, 1.0));
        assert_rows_match_positions(&store);
    }

    #[test]
    fn remove_rows_is_all_or_nothing() {
        let mut store = store_of(3);
        let err = store.remove_rows(&[0, 7]).unwrap_err();
        assert!(matches!(err, GeorefError::RowNotFound(7)));
        assert_eq!(store.len(), 3);

        store.remove_rows(&[1, 1]).unwrap();
        assert_eq!(store.len(), 2);

        store.remove_all();
        assert!(store.is_empty());
    }

    #[test]
    fn renumber_is_idempotent() {
        let mut store = store_of(4);
        store.entries[2].footprint.set_row(9);
        store.renumber();
        let once = store.entries().to_vec();
        store.renumber();
        assert_eq!(store.entries(), once.as_slice());
        assert_rows_match_positions(&store);
    }

    #[test]
    fn update_cell_reports_change_and_recomputes_pixel() {
        let mut store = store_of(2);
        store
            .set_residuals(&[PointResidual::default(), PointResidual::default()])
            .unwrap();

        let mut mapper = CoordinateMapper::default();
        mapper
            .set_pixel_dimension(ViewportKind::Georeferenced, DVec2::new(100.0, 100.0))
            .unwrap();
        mapper
            .set_envelope(
                ViewportKind::Georeferenced,
                Envelope::new(DVec2::new(100.0, 100.0), DVec2::new(200.0, 200.0)).unwrap(),
            )
            .unwrap();

        let changed = store
            .update_cell(1, TableColumn::GeorefX, 150.0, &mapper)
            .unwrap();
        assert!(changed);
        let entry = store.get(1).unwrap();
        assert_eq!(entry.georeferenced.world_coords.pos, DVec2::new(150.0, 101.0));
        assert_eq!(entry.georeferenced.new_value.pos, DVec2::new(50.0, 99.0));
        assert!(entry.residual.is_none());
        assert!(store.get(0).unwrap().residual.is_some());

        let unchanged = store
            .update_cell(1, TableColumn::GeorefX, 150.0, &mapper)
            .unwrap();
        assert!(!unchanged);
    }

    #[test]
    fn update_cell_rejects_bad_targets() {
        let mut store = store_of(1);
        let mapper = CoordinateMapper::default();

        assert!(matches!(
            store.update_cell(3, TableColumn::FootprintY, 1.0, &mapper),
            Err(GeorefError::RowNotFound(3))
        ));
        assert!(matches!(
            store.update_cell(0, TableColumn::ResidualX, 1.0, &mapper),
            Err(GeorefError::InputValidation(_))
        ));
        assert!(store
            .update_cell(0, TableColumn::FootprintY, f64::NAN, &mapper)
            .is_err());

        // uninitialized viewport keeps the previous pixel
        assert!(store
            .update_cell(0, TableColumn::FootprintY, 5.0, &mapper)
            .unwrap());
        let fp = &store.get(0).unwrap().footprint;
        assert_eq!(fp.world_coords.pos, DVec2::new(0.0, 5.0));
        assert_eq!(fp.new_value.pos, DVec2::new(0.0, 0.0));
    }

    #[test]
    fn residual_count_must_match() {
        let mut store = store_of(2);
        assert!(store.set_residuals(&[PointResidual::default()]).is_err());
        assert!(store.entries().iter().all(|e| e.residual.is_none()));
    }

    #[test]
    fn column_indices() {
        assert_eq!(TableColumn::from_index(3).unwrap(), TableColumn::FootprintY);
        assert!(TableColumn::from_index(6).is_err());
        assert_eq!(TableColumn::ResidualY.viewport(), None);
    }
}
