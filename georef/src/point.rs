use glam::DVec2;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter};

use crate::error::{GeorefError, Result};

/// The two independently navigated canvases.
#[derive(Debug, Display, EnumIter, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ViewportKind {
    Footprint,
    Georeferenced,
}

impl ViewportKind {
    pub fn other(self) -> Self {
        match self {
            ViewportKind::Footprint => ViewportKind::Georeferenced,
            ViewportKind::Georeferenced => ViewportKind::Footprint,
        }
    }
}

/// A coordinate tagged with the viewport it belongs to. Whether it is a pixel or world
/// position depends on where it is stored.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GrPoint {
    pub kind: ViewportKind,
    pub pos: DVec2,
}

impl GrPoint {
    pub fn new(kind: ViewportKind, pos: DVec2) -> Self {
        Self { kind, pos }
    }

    pub fn footprint(x: f64, y: f64) -> Self {
        Self::new(ViewportKind::Footprint, DVec2::new(x, y))
    }

    pub fn georeferenced(x: f64, y: f64) -> Self {
        Self::new(ViewportKind::Georeferenced, DVec2::new(x, y))
    }

    pub fn ensure_kind(&self, expected: ViewportKind) -> Result<DVec2> {
        if self.kind == expected {
            Ok(self.pos)
        } else {
            Err(GeorefError::KindMismatch {
                expected,
                actual: self.kind,
            })
        }
    }

    pub fn with_pos(&self, pos: DVec2) -> Self {
        Self::new(self.kind, pos)
    }
}

/// Location of a point inside the correspondence table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowColumn {
    pub row: usize,
    pub column_x: usize,
    pub column_y: usize,
}

impl RowColumn {
    /// Table layout is georeferenced x/y, footprint x/y, residual x/y.
    pub fn for_kind(row: usize, kind: ViewportKind) -> Self {
        let (column_x, column_y) = match kind {
            ViewportKind::Georeferenced => (0, 1),
            ViewportKind::Footprint => (2, 3),
        };
        Self {
            row,
            column_x,
            column_y,
        }
    }
}

/// One clicked point with its pixel history and table location.
///
/// `old_value`, `initial_value` and `new_value` are pixel positions; `world_coords` is the
/// same point in the viewport's world space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point4Values {
    pub old_value: GrPoint,
    pub initial_value: GrPoint,
    pub new_value: GrPoint,
    pub world_coords: GrPoint,
    pub rc: RowColumn,
}

impl Point4Values {
    pub fn new(pixel: GrPoint, world_coords: GrPoint, rc: RowColumn) -> Self {
        Self {
            old_value: pixel,
            initial_value: pixel,
            new_value: pixel,
            world_coords,
            rc,
        }
    }

    pub fn kind(&self) -> ViewportKind {
        self.world_coords.kind
    }

    /// Moves the point, keeping the previous pixel as `old_value`.
    pub fn relocate(&mut self, pixel: GrPoint, world_coords: GrPoint) {
        self.old_value = self.new_value;
        self.new_value = pixel;
        self.world_coords = world_coords;
    }

    pub fn set_row(&mut self, row: usize) {
        self.rc.row = row;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PointResidual {
    pub dx: f64,
    pub dy: f64,
}

impl PointResidual {
    pub fn new(delta: DVec2) -> Self {
        Self {
            dx: delta.x,
            dy: delta.y,
        }
    }

    pub fn length(&self) -> f64 {
        self.dx.hypot(self.dy)
    }
}
