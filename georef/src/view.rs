//! Seams to the UI toolkit. The controller only ever pushes state through these traits.

use glam::DVec2;

use crate::footprint::Ring;
use crate::mapper::CoordinateMapper;
use crate::point::{GrPoint, Point4Values, RowColumn, ViewportKind};
use crate::scene::SceneImage;

/// One drawable canvas.
pub trait Panel {
    /// Recompute marker positions after the envelope changed.
    fn update_points(&mut self, mapper: &CoordinateMapper);

    fn set_selected_points(&mut self, points: &[Point4Values], mapper: &CoordinateMapper);

    /// Polygons in this panel's world coordinates.
    fn set_polygon_list(&mut self, rings: &[Ring], mapper: &CoordinateMapper);

    fn set_image_to_draw(&mut self, image: Option<SceneImage>);

    /// Drag rectangle in pixels, `None` hides it.
    fn set_zoom_rect(&mut self, rect: Option<(DVec2, DVec2)>);

    /// Pending pick shown before it becomes part of a correspondence.
    fn set_last_point(&mut self, point: Option<Point4Values>);

    fn set_focus(&mut self, focus: bool);

    fn set_point_size(&mut self, size: u32);

    fn repaint(&mut self);
}

/// The correspondence table widget.
pub trait PointTable {
    fn add_row(&mut self);

    /// Writes a world coordinate into the last row and returns where it landed.
    fn set_coords(&mut self, world: GrPoint) -> RowColumn;

    fn remove_all_rows(&mut self);

    /// Rewrites the table from scratch: world coordinates and residuals per row.
    fn set_rows(&mut self, rows: &[TableRow]);
}

/// Display values of one table row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TableRow {
    pub georeferenced: DVec2,
    pub footprint: DVec2,
    pub residual: Option<DVec2>,
}

pub trait GeorefView {
    fn panel(&mut self, kind: ViewportKind) -> &mut dyn Panel;

    fn table(&mut self) -> &mut dyn PointTable;

    /// Modal error notification.
    fn report_error(&mut self, message: &str);
}
