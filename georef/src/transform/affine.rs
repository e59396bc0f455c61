use glam::DVec2;
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

use super::{
    ensure_enough_points, least_squares, FittedTransform, Normalization, SolverInput,
    TransformationMethod, TransformationType,
};
use crate::error::Result;

/// General affine transform stored as `[a, b, tx, c, d, ty]`:
/// `x' = a x + b y + tx`, `y' = c x + d y + ty`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AffineParams(pub [f64; 6]);

impl AffineParams {
    pub fn apply(&self, p: DVec2) -> DVec2 {
        let [a, b, tx, c, d, ty] = self.0;
        DVec2::new(a * p.x + b * p.y + tx, c * p.x + d * p.y + ty)
    }

    pub fn determinant(&self) -> f64 {
        let [a, b, _, c, d, _] = self.0;
        a * d - b * c
    }

    fn denormalize(&self, src: &Normalization, dst: &Normalization) -> Self {
        let k = src.scale / dst.scale;
        let [a, b, tx, c, d, ty] = self.0;
        let (a, b, c, d) = (a * k, b * k, c * k, d * k);
        let linear_center = DVec2::new(
            a * src.center.x + b * src.center.y,
            c * src.center.x + d * src.center.y,
        );
        let t = DVec2::new(tx, ty) / dst.scale + dst.center - linear_center;

        Self([a, b, t.x, c, d, t.y])
    }
}

/// Six-parameter affine strategy.
pub struct Affine<'a> {
    input: SolverInput<'a>,
}

impl<'a> Affine<'a> {
    pub fn new(input: SolverInput<'a>) -> Self {
        Self { input }
    }
}

impl TransformationMethod for Affine<'_> {
    fn kind(&self) -> TransformationType {
        TransformationType::Affine
    }

    fn input(&self) -> &SolverInput<'_> {
        &self.input
    }

    fn min_points(&self) -> usize {
        3
    }

    fn fit(&self) -> Result<FittedTransform> {
        let (src, dst) = self.input.pairs();
        ensure_enough_points(self.kind(), src.len(), self.min_points())?;

        let src_norm = Normalization::from_points(&src);
        let dst_norm = Normalization::from_points(&dst);

        // x and y share the design [x, y, 1]
        let n = src.len();
        let mut design = DMatrix::<f64>::zeros(n, 3);
        let mut rhs = DMatrix::<f64>::zeros(n, 2);
        for (i, (s, d)) in src.iter().zip(&dst).enumerate() {
            let s = src_norm.forward(*s);
            let d = dst_norm.forward(*d);
            design[(i, 0)] = s.x;
            design[(i, 1)] = s.y;
            design[(i, 2)] = 1.0;
            rhs[(i, 0)] = d.x;
            rhs[(i, 1)] = d.y;
        }

        let x = least_squares::solve(design, &rhs, self.kind())?;
        let normalized = AffineParams([
            x[(0, 0)],
            x[(1, 0)],
            x[(2, 0)],
            x[(0, 1)],
            x[(1, 1)],
            x[(2, 1)],
        ]);

        Ok(FittedTransform::Affine(
            normalized.denormalize(&src_norm, &dst_norm),
        ))
    }
}
