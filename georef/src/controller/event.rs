use std::path::PathBuf;

use glam::DVec2;

use super::state::NavigationMode;
use crate::point::ViewportKind;
use crate::scene::WmsLayerRequest;
use crate::transform::TransformationType;

/// Toolkit-independent user input. Pixel positions are relative to the viewport's top-left.
#[derive(Debug, Clone, PartialEq)]
pub enum InteractionEvent {
    DragStarted {
        viewport: ViewportKind,
        pixel: DVec2,
        ctrl: bool,
    },
    Dragged {
        viewport: ViewportKind,
        pixel: DVec2,
    },
    DragEnded {
        viewport: ViewportKind,
        pixel: DVec2,
    },
    PointPicked {
        viewport: ViewportKind,
        pixel: DVec2,
    },
    PointerMoved {
        viewport: ViewportKind,
        pixel: DVec2,
    },
    /// Negative rotation zooms in.
    WheelScrolled {
        viewport: ViewportKind,
        rotation: i32,
    },
    Resized {
        viewport: ViewportKind,
        size: DVec2,
    },
    ResetView {
        viewport: ViewportKind,
    },
    ModeToggled {
        viewport: ViewportKind,
        mode: NavigationMode,
    },
    CoordinateJumpEntered {
        viewport: ViewportKind,
        x: String,
        y: String,
        span: String,
    },
    CoordinateJumpCancelled {
        viewport: ViewportKind,
    },
    CellEdited {
        row: usize,
        column: usize,
        value: String,
    },
    DeleteRows {
        rows: Vec<usize>,
    },
    DeleteAll,
    Compute,
    SetTransformationType(TransformationType),
    SetPolynomialOrder(u32),
    ZoomFactorEdited(String),
    PointSizeEdited(String),
    SnappingToggled(bool),
    OptionsCommitted,
    OptionsCancelled,
    OpenWmsLayer(WmsLayerRequest),
    OpenShapefile(PathBuf),
    OpenBuildings(PathBuf),
    /// Writes the loaded buildings moved by the last computed transform.
    SaveBuildings(PathBuf),
    SavePointTable(PathBuf),
    LoadPointTable(PathBuf),
}
