use glam::DVec2;
use strum_macros::{Display, EnumIter};

use crate::point::ViewportKind;

/// What a drag in a viewport does.
#[derive(Debug, Display, EnumIter, Clone, Copy, PartialEq, Eq, Default)]
pub enum NavigationMode {
    #[default]
    Idle,
    Panning,
    ZoomIn,
    ZoomOut,
    CoordinateJump,
}

impl NavigationMode {
    /// Pressing the active mode button again switches back to `Idle`.
    pub fn toggled(self, requested: NavigationMode) -> NavigationMode {
        if self == requested {
            NavigationMode::Idle
        } else {
            requested
        }
    }
}

/// One value per viewport.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PerViewport<T> {
    pub footprint: T,
    pub georeferenced: T,
}

impl<T> PerViewport<T> {
    pub fn get(&self, kind: ViewportKind) -> &T {
        match kind {
            ViewportKind::Footprint => &self.footprint,
            ViewportKind::Georeferenced => &self.georeferenced,
        }
    }

    pub fn get_mut(&mut self, kind: ViewportKind) -> &mut T {
        match kind {
            ViewportKind::Footprint => &mut self.footprint,
            ViewportKind::Georeferenced => &mut self.georeferenced,
        }
    }
}

/// Button press that may turn into a drag.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct DragState {
    pub viewport: ViewportKind,
    pub pressed: DVec2,
    pub ctrl: bool,
}

impl DragState {
    /// Ctrl turns any drag into a rectangle zoom.
    pub fn effective_mode(&self, mode: NavigationMode) -> NavigationMode {
        if self.ctrl {
            NavigationMode::ZoomIn
        } else {
            mode
        }
    }
}
