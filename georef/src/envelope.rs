use std::fmt;

use glam::DVec2;
use serde::{Deserialize, Serialize};

use crate::error::{GeorefError, Result};

/// Coordinate reference system identifier, e.g. `EPSG:31467`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Crs(pub String);

impl Crs {
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Axis-aligned world box. Always satisfies `min < max` on both axes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    min: DVec2,
    max: DVec2,
    crs: Option<Crs>,
}

impl Envelope {
    pub fn new(min: DVec2, max: DVec2) -> Result<Self> {
        if !min.is_finite() || !max.is_finite() {
            return Err(GeorefError::DegenerateEnvelope(format!(
                "non-finite bounds {min} .. {max}"
            )));
        }
        if min.x >= max.x || min.y >= max.y {
            return Err(GeorefError::DegenerateEnvelope(format!(
                "min {min} is not below max {max}"
            )));
        }

        Ok(Self {
            min,
            max,
            crs: None,
        })
    }

    /// Bounding box of two opposite corners given in any order.
    pub fn from_points(a: DVec2, b: DVec2) -> Result<Self> {
        Self::new(a.min(b), a.max(b))
    }

    pub fn from_center(center: DVec2, span: DVec2) -> Result<Self> {
        let half = span * 0.5;
        Self::new(center - half, center + half)
    }

    pub fn with_crs(mut self, crs: Option<Crs>) -> Self {
        self.crs = crs;
        self
    }

    pub fn min(&self) -> DVec2 {
        self.min
    }

    pub fn max(&self) -> DVec2 {
        self.max
    }

    pub fn crs(&self) -> Option<&Crs> {
        self.crs.as_ref()
    }

    pub fn span(&self) -> DVec2 {
        self.max - self.min
    }

    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }

    pub fn center(&self) -> DVec2 {
        (self.min + self.max) * 0.5
    }

    pub fn contains(&self, p: DVec2) -> bool {
        p.cmpge(self.min).all() && p.cmple(self.max).all()
    }

    pub fn translated(&self, delta: DVec2) -> Self {
        Self {
            min: self.min + delta,
            max: self.max + delta,
            crs: self.crs.clone(),
        }
    }

    /// Same CRS, new bounds.
    pub fn with_bounds(&self, min: DVec2, max: DVec2) -> Result<Self> {
        Ok(Self::new(min, max)?.with_crs(self.crs.clone()))
    }
}
