use glam::DVec2;
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

use super::{
    ensure_enough_points, least_squares, FittedTransform, Normalization, SolverInput,
    TransformationMethod, TransformationType,
};
use crate::error::Result;

/// Similarity transform `x' = a x - b y + tx`, `y' = b x + a y + ty`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HelmertParams {
    pub a: f64,
    pub b: f64,
    pub tx: f64,
    pub ty: f64,
}

impl HelmertParams {
    pub fn new(translation: DVec2, rotation: f64, scale: f64) -> Self {
        let (sin, cos) = rotation.sin_cos();
        Self {
            a: scale * cos,
            b: scale * sin,
            tx: translation.x,
            ty: translation.y,
        }
    }

    pub fn apply(&self, p: DVec2) -> DVec2 {
        DVec2::new(
            self.a * p.x - self.b * p.y + self.tx,
            self.b * p.x + self.a * p.y + self.ty,
        )
    }

    pub fn scale(&self) -> f64 {
        self.a.hypot(self.b)
    }

    /// Rotation in radians.
    pub fn rotation(&self) -> f64 {
        self.b.atan2(self.a)
    }

    pub fn translation(&self) -> DVec2 {
        DVec2::new(self.tx, self.ty)
    }

    /// Converts parameters fitted between normalized point sets back to world units.
    fn denormalize(&self, src: &Normalization, dst: &Normalization) -> Self {
        let k = src.scale / dst.scale;
        let (a, b) = (self.a * k, self.b * k);
        let rotated_center = DVec2::new(
            a * src.center.x - b * src.center.y,
            b * src.center.x + a * src.center.y,
        );
        let t = self.translation() / dst.scale + dst.center - rotated_center;

        Self {
            a,
            b,
            tx: t.x,
            ty: t.y,
        }
    }
}

/// Four-parameter Helmert strategy: scale, rotation and two translations.
pub struct Helmert4<'a> {
    input: SolverInput<'a>,
}

impl<'a> Helmert4<'a> {
    pub fn new(input: SolverInput<'a>) -> Self {
        Self { input }
    }
}

impl TransformationMethod for Helmert4<'_> {
    fn kind(&self) -> TransformationType {
        TransformationType::Helmert4
    }

    fn input(&self) -> &SolverInput<'_> {
        &self.input
    }

    fn min_points(&self) -> usize {
        2
    }

    fn fit(&self) -> Result<FittedTransform> {
        let (src, dst) = self.input.pairs();
        ensure_enough_points(self.kind(), src.len(), self.min_points())?;

        let src_norm = Normalization::from_points(&src);
        let dst_norm = Normalization::from_points(&dst);

        let n = src.len();
        let mut design = DMatrix::<f64>::zeros(2 * n, 4);
        let mut rhs = DMatrix::<f64>::zeros(2 * n, 1);
        for (i, (s, d)) in src.iter().zip(&dst).enumerate() {
            let s = src_norm.forward(*s);
            let d = dst_norm.forward(*d);
            let (rx, ry) = (2 * i, 2 * i + 1);

            design[(rx, 0)] = s.x;
            design[(rx, 1)] = -s.y;
            design[(rx, 2)] = 1.0;
            rhs[(rx, 0)] = d.x;

            design[(ry, 0)] = s.y;
            design[(ry, 1)] = s.x;
            design[(ry, 3)] = 1.0;
            rhs[(ry, 0)] = d.y;
        }

        let x = least_squares::solve(design, &rhs, self.kind())?;
        let normalized = HelmertParams {
            a: x[(0, 0)],
            b: x[(1, 0)],
            tx: x[(2, 0)],
            ty: x[(3, 0)],
        };

        Ok(FittedTransform::Helmert4(
            normalized.denormalize(&src_norm, &dst_norm),
        ))
    }
}
