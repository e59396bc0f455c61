//! Transformation fitting from footprint to georeferenced world coordinates.
//!
//! Each strategy borrows the correspondence store and the footprint geometry for the
//! duration of one compute and keeps no state between calls.

mod affine;
mod helmert;
mod least_squares;
mod polynomial;

#[cfg(test)]
mod tests;

use glam::DVec2;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString};

use crate::error::{GeorefError, Result};
use crate::footprint::{Building, Footprint, Ring};
use crate::point::{PointResidual, ViewportKind};
use crate::store::CorrespondenceStore;

pub use affine::{Affine, AffineParams};
pub use helmert::{Helmert4, HelmertParams};
pub use polynomial::{Polynomial, PolynomialModel, MAX_POLYNOMIAL_ORDER};

#[derive(
    Debug,
    Display,
    EnumIter,
    EnumString,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
)]
#[strum(ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum TransformationType {
    #[strum(to_string = "polynomial")]
    Polynomial,
    #[default]
    #[strum(to_string = "helmert4")]
    Helmert4,
    #[strum(to_string = "affine")]
    Affine,
}

/// A solved transform, applicable to footprint world coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FittedTransform {
    Polynomial(PolynomialModel),
    Helmert4(HelmertParams),
    Affine(AffineParams),
}

impl FittedTransform {
    pub fn kind(&self) -> TransformationType {
        match self {
            FittedTransform::Polynomial(_) => TransformationType::Polynomial,
            FittedTransform::Helmert4(_) => TransformationType::Helmert4,
            FittedTransform::Affine(_) => TransformationType::Affine,
        }
    }

    pub fn apply(&self, p: DVec2) -> DVec2 {
        match self {
            FittedTransform::Polynomial(m) => m.apply(p),
            FittedTransform::Helmert4(h) => h.apply(p),
            FittedTransform::Affine(a) => a.apply(p),
        }
    }

    /// Georeferences a building model. Vertex heights are carried over unchanged.
    pub fn apply_to_buildings(&self, buildings: &[Building]) -> Vec<Building> {
        buildings
            .iter()
            .map(|building| building.map_xy(&|p| self.apply(p)))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TransformationResult {
    pub transform: FittedTransform,
    /// One residual per correspondence, in store order.
    pub residuals: Vec<PointResidual>,
    pub rmse: f64,
    /// Footprint rings mapped into georeferenced world space.
    pub rings: Vec<Ring>,
}

/// What a strategy reads while fitting.
#[derive(Debug, Clone, Copy)]
pub struct SolverInput<'a> {
    pub store: &'a CorrespondenceStore,
    pub footprint: &'a Footprint,
}

impl<'a> SolverInput<'a> {
    pub fn new(store: &'a CorrespondenceStore, footprint: &'a Footprint) -> Self {
        Self { store, footprint }
    }

    /// Footprint (source) and georeferenced (target) world points in row order.
    pub fn pairs(&self) -> (Vec<DVec2>, Vec<DVec2>) {
        (
            self.store.world_points(ViewportKind::Footprint),
            self.store.world_points(ViewportKind::Georeferenced),
        )
    }

    pub fn residuals(&self, transform: &FittedTransform) -> Vec<PointResidual> {
        let (src, dst) = self.pairs();
        src.iter()
            .zip(&dst)
            .map(|(s, d)| PointResidual::new(*d - transform.apply(*s)))
            .collect()
    }

    pub fn rings(&self, transform: &FittedTransform) -> Vec<Ring> {
        self.footprint
            .rings()
            .iter()
            .map(|ring| Ring::new(ring.points.iter().map(|p| transform.apply(*p)).collect()))
            .collect()
    }
}

pub trait TransformationMethod {
    fn kind(&self) -> TransformationType;

    fn input(&self) -> &SolverInput<'_>;

    /// Fewest correspondences that determine the transform.
    fn min_points(&self) -> usize;

    fn fit(&self) -> Result<FittedTransform>;

    fn compute_residuals(&self) -> Result<Vec<PointResidual>> {
        let transform = self.fit()?;
        Ok(self.input().residuals(&transform))
    }

    fn compute_ring_list(&self) -> Result<Vec<Ring>> {
        let transform = self.fit()?;
        Ok(self.input().rings(&transform))
    }

    fn solve(&self) -> Result<TransformationResult> {
        let transform = self.fit()?;
        let residuals = self.input().residuals(&transform);
        let rings = self.input().rings(&transform);

        Ok(TransformationResult {
            rmse: rmse(&residuals),
            transform,
            residuals,
            rings,
        })
    }
}

/// Builds a fresh strategy for one compute.
pub fn create_method<'a>(
    kind: TransformationType,
    polynomial_order: u32,
    input: SolverInput<'a>,
) -> Result<Box<dyn TransformationMethod + 'a>> {
    Ok(match kind {
        TransformationType::Polynomial => Box::new(Polynomial::new(input, polynomial_order)?),
        TransformationType::Helmert4 => Box::new(Helmert4::new(input)),
        TransformationType::Affine => Box::new(Affine::new(input)),
    })
}

pub fn rmse(residuals: &[PointResidual]) -> f64 {
    if residuals.is_empty() {
        return 0.0;
    }
    let sum: f64 = residuals
        .iter()
        .map(|r| r.dx * r.dx + r.dy * r.dy)
        .sum();
    (sum / residuals.len() as f64).sqrt()
}

fn ensure_enough_points(kind: TransformationType, points: usize, required: usize) -> Result<()> {
    if points < required {
        return Err(GeorefError::UnderdeterminedTransform {
            kind,
            points,
            required,
        });
    }
    Ok(())
}

/// Centers points on their centroid and scales the mean distance to sqrt(2).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Normalization {
    pub center: DVec2,
    pub scale: f64,
}

impl Normalization {
    pub fn identity() -> Self {
        Self {
            center: DVec2::ZERO,
            scale: 1.0,
        }
    }

    pub fn from_points(points: &[DVec2]) -> Self {
        if points.is_empty() {
            return Self::identity();
        }

        let n = points.len() as f64;
        let center = points.iter().copied().sum::<DVec2>() / n;
        let avg_dist = points.iter().map(|p| (*p - center).length()).sum::<f64>() / n;
        let scale = if avg_dist < 1e-12 {
            1.0
        } else {
            std::f64::consts::SQRT_2 / avg_dist
        };

        Self { center, scale }
    }

    pub fn forward(&self, p: DVec2) -> DVec2 {
        (p - self.center) * self.scale
    }

    pub fn inverse(&self, p: DVec2) -> DVec2 {
        p / self.scale + self.center
    }
}
