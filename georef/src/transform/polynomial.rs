use glam::DVec2;
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

use super::{
    ensure_enough_points, least_squares, FittedTransform, Normalization, SolverInput,
    TransformationMethod, TransformationType,
};
use crate::error::{GeorefError, Result};

pub const MAX_POLYNOMIAL_ORDER: u32 = 3;

/// Exponents `(p, q)` of every monomial `u^p v^q` with `p + q <= order`.
fn term_exponents(order: u32) -> Vec<(i32, i32)> {
    let mut terms = Vec::new();
    for total in 0..=order as i32 {
        for p in (0..=total).rev() {
            terms.push((p, total - p));
        }
    }
    terms
}

pub fn term_count(order: u32) -> usize {
    ((order + 1) * (order + 2) / 2) as usize
}

#[inline]
fn monomial(u: f64, v: f64, p: i32, q: i32) -> f64 {
    u.powi(p) * v.powi(q)
}

/// Polynomial fitted in normalized coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolynomialModel {
    pub order: u32,
    pub src: Normalization,
    pub dst: Normalization,
    pub coeffs_x: Vec<f64>,
    pub coeffs_y: Vec<f64>,
}

impl PolynomialModel {
    pub fn apply(&self, p: DVec2) -> DVec2 {
        let n = self.src.forward(p);
        let mut out = DVec2::ZERO;
        for (i, (exp_p, exp_q)) in term_exponents(self.order).into_iter().enumerate() {
            let basis = monomial(n.x, n.y, exp_p, exp_q);
            out.x += self.coeffs_x[i] * basis;
            out.y += self.coeffs_y[i] * basis;
        }
        self.dst.inverse(out)
    }
}

/// Polynomial strategy of order 1 to 3.
pub struct Polynomial<'a> {
    input: SolverInput<'a>,
    order: u32,
}

impl<'a> Polynomial<'a> {
    pub fn new(input: SolverInput<'a>, order: u32) -> Result<Self> {
        if !(1..=MAX_POLYNOMIAL_ORDER).contains(&order) {
            return Err(GeorefError::input(format!(
                "polynomial order must be between 1 and {MAX_POLYNOMIAL_ORDER}, got {order}"
            )));
        }
        Ok(Self { input, order })
    }

    pub fn order(&self) -> u32 {
        self.order
    }
}

impl TransformationMethod for Polynomial<'_> {
    fn kind(&self) -> TransformationType {
        TransformationType::Polynomial
    }

    fn input(&self) -> &SolverInput<'_> {
        &self.input
    }

    fn min_points(&self) -> usize {
        term_count(self.order)
    }

    fn fit(&self) -> Result<FittedTransform> {
        let (src, dst) = self.input.pairs();
        ensure_enough_points(self.kind(), src.len(), self.min_points())?;

        let src_norm = Normalization::from_points(&src);
        let dst_norm = Normalization::from_points(&dst);
        let terms = term_exponents(self.order);

        let n = src.len();
        let mut design = DMatrix::<f64>::zeros(n, terms.len());
        let mut rhs = DMatrix::<f64>::zeros(n, 2);
        for (i, (s, d)) in src.iter().zip(&dst).enumerate() {
            let s = src_norm.forward(*s);
            let d = dst_norm.forward(*d);
            for (j, &(p, q)) in terms.iter().enumerate() {
                design[(i, j)] = monomial(s.x, s.y, p, q);
            }
            rhs[(i, 0)] = d.x;
            rhs[(i, 1)] = d.y;
        }

        let x = least_squares::solve(design, &rhs, self.kind())?;

        Ok(FittedTransform::Polynomial(PolynomialModel {
            order: self.order,
            src: src_norm,
            dst: dst_norm,
            coeffs_x: x.column(0).iter().copied().collect(),
            coeffs_y: x.column(1).iter().copied().collect(),
        }))
    }
}
