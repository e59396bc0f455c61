use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{GeorefError, Result};
use crate::jump::parse_decimal;
use crate::mapper::DEFAULT_MIN_SPAN;
use crate::transform::{TransformationType, MAX_POLYNOMIAL_ORDER};

/// User settings, persisted as YAML or JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeorefOptions {
    /// Fraction of the span removed per zoom step, in (0, 1).
    pub zoom_factor: f64,
    pub point_size: u32,
    pub snapping: bool,
    pub transformation_type: TransformationType,
    pub polynomial_order: u32,
    pub min_span: f64,
    pub log_level: String,
}

impl Default for GeorefOptions {
    fn default() -> Self {
        Self {
            zoom_factor: 0.1,
            point_size: 5,
            snapping: true,
            transformation_type: TransformationType::default(),
            polynomial_order: 1,
            min_span: DEFAULT_MIN_SPAN,
            log_level: "info".to_string(),
        }
    }
}

impl GeorefOptions {
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        Self::load(path).unwrap_or_else(|err| {
            debug!(path = %path.display(), %err, "using default options");
            Self::default()
        })
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let format = common::FileFormat::from_path(path)?;
        let serialized = std::fs::read_to_string(path)?;
        let options: Self = common::serde::deserialize(&serialized, format)?;
        options.validate()?;
        Ok(options)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let format = common::FileFormat::from_path(path)?;
        let serialized = common::serde::serialize(self, format)?;
        std::fs::write(path, serialized)?;
        info!(path = %path.display(), "options saved");
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        validate_zoom_factor(self.zoom_factor)?;
        if self.point_size == 0 {
            return Err(GeorefError::input("point size must be positive"));
        }
        if !(1..=MAX_POLYNOMIAL_ORDER).contains(&self.polynomial_order) {
            return Err(GeorefError::input(format!(
                "polynomial order must be between 1 and {MAX_POLYNOMIAL_ORDER}"
            )));
        }
        if !(self.min_span.is_finite() && self.min_span > 0.0) {
            return Err(GeorefError::input("minimum span must be positive"));
        }
        Ok(())
    }
}

fn validate_zoom_factor(factor: f64) -> Result<()> {
    if factor > 0.0 && factor < 1.0 {
        Ok(())
    } else {
        Err(GeorefError::input(format!(
            "zoom factor must be between 0 and 1, got {factor}"
        )))
    }
}

/// Options dialog state: edits go to `pending` until committed or cancelled.
#[derive(Debug, Clone, Default)]
pub struct OptionsModel {
    committed: GeorefOptions,
    pending: GeorefOptions,
}

impl OptionsModel {
    pub fn new(options: GeorefOptions) -> Self {
        Self {
            pending: options.clone(),
            committed: options,
        }
    }

    pub fn committed(&self) -> &GeorefOptions {
        &self.committed
    }

    pub fn pending(&self) -> &GeorefOptions {
        &self.pending
    }

    pub fn set_zoom_factor_text(&mut self, text: &str) -> Result<()> {
        let factor = parse_decimal(text, "zoom factor")?;
        validate_zoom_factor(factor)?;
        self.pending.zoom_factor = factor;
        Ok(())
    }

    pub fn set_point_size_text(&mut self, text: &str) -> Result<()> {
        let text = text.trim();
        let size: u32 = text.parse().map_err(|_| {
            GeorefError::input(format!("point size: '{text}' is not a whole number"))
        })?;
        if size == 0 {
            return Err(GeorefError::input("point size must be positive"));
        }
        self.pending.point_size = size;
        Ok(())
    }

    pub fn set_snapping(&mut self, snapping: bool) {
        self.pending.snapping = snapping;
    }

    pub fn set_transformation_type(&mut self, kind: TransformationType) {
        self.pending.transformation_type = kind;
        self.committed.transformation_type = kind;
    }

    pub fn set_polynomial_order(&mut self, order: u32) -> Result<()> {
        if !(1..=MAX_POLYNOMIAL_ORDER).contains(&order) {
            return Err(GeorefError::input(format!(
                "polynomial order must be between 1 and {MAX_POLYNOMIAL_ORDER}, got {order}"
            )));
        }
        self.pending.polynomial_order = order;
        self.committed.polynomial_order = order;
        Ok(())
    }

    pub fn commit(&mut self) -> &GeorefOptions {
        self.committed = self.pending.clone();
        &self.committed
    }

    pub fn cancel(&mut self) {
        self.pending = self.committed.clone();
    }
}
