use nalgebra::{DMatrix, SVD};

use super::TransformationType;
use crate::error::{GeorefError, Result};

/// Relative singular value below which a column is considered dependent.
const RANK_TOLERANCE: f64 = 1e-10;

/// Least-squares solution of `design * x = rhs` for every column of `rhs`.
///
/// Works on the design matrix directly instead of the normal equations, so the condition
/// number is not squared.
pub(super) fn solve(
    design: DMatrix<f64>,
    rhs: &DMatrix<f64>,
    kind: TransformationType,
) -> Result<DMatrix<f64>> {
    debug_assert_eq!(design.nrows(), rhs.nrows());

    let unknowns = design.ncols();
    let svd = SVD::new(design, true, true);

    let max_sv = svd.singular_values.iter().copied().fold(0.0, f64::max);
    if !(max_sv.is_finite() && max_sv > 0.0) {
        return Err(GeorefError::SingularConfiguration(kind));
    }
    let eps = max_sv * RANK_TOLERANCE;
    let rank = svd.singular_values.iter().filter(|&&s| s > eps).count();
    if rank < unknowns {
        return Err(GeorefError::SingularConfiguration(kind));
    }

    svd.solve(rhs, eps)
        .map_err(|_| GeorefError::SingularConfiguration(kind))
}
