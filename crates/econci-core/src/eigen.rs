//! Eigen-decomposition of general (non-symmetric) real matrices.
//!
//! Eigenvalues come from the real Schur form; the eigenvector of a chosen eigenvalue is
//! recovered by shifted inverse iteration in complex arithmetic, so complex spectra are
//! handled without assuming symmetry.

use crate::{EconCiError, Result};
use nalgebra::linalg::{Schur, LU};
use nalgebra::{Complex, DMatrix, DVector, Dyn};
use ndarray::Array2;
use tracing::debug;

const SCHUR_ITERATIONS_PER_DIM: usize = 200;
const SHIFT_OFFSET: f64 = 1e-10;
const MAX_SHIFT_ATTEMPTS: usize = 6;
const MAX_INVERSE_ITERATIONS: usize = 100;
const CONVERGENCE_TOLERANCE: f64 = 1e-13;

#[derive(Debug, Clone)]
pub struct Eigenpair {
    pub value: Complex<f64>,
    /// Unit-norm eigenvector, phase-aligned so its largest component is real and positive.
    pub vector: DVector<Complex<f64>>,
}

impl Eigenpair {
    pub fn real_vector(&self) -> Vec<f64> {
        self.vector.iter().map(|c| c.re).collect()
    }
}

/// Eigenvalues of a square matrix, in solver order.
pub fn eigenvalues(matrix: &DMatrix<f64>) -> Result<Vec<Complex<f64>>> {
    let n = matrix.nrows();
    let schur = Schur::try_new(
        matrix.clone(),
        f64::EPSILON,
        SCHUR_ITERATIONS_PER_DIM * n.max(1),
    )
    .ok_or_else(|| {
        EconCiError::Numerical(format!("Schur decomposition of a {}x{} matrix did not converge", n, n))
    })?;
    Ok(schur.complex_eigenvalues().iter().copied().collect())
}

/// Returns the eigenpair whose eigenvalue ranks `rank_from_top` when eigenvalues are sorted
/// by real part (0 is the largest). Ties keep solver order.
pub fn ranked_eigenpair(matrix: &Array2<f64>, rank_from_top: usize) -> Result<Eigenpair> {
    let (n, cols) = matrix.dim();
    if n != cols {
        return Err(EconCiError::Numerical(format!(
            "eigen-decomposition needs a square matrix, got {}x{}",
            n, cols
        )));
    }
    if n <= rank_from_top {
        return Err(EconCiError::Numerical(format!(
            "need at least {} eigenvalues, matrix is {}x{}",
            rank_from_top + 1,
            n,
            n
        )));
    }
    if matrix.iter().any(|v| !v.is_finite()) {
        return Err(EconCiError::Numerical(
            "matrix has non-finite entries".to_string(),
        ));
    }

    let dense = DMatrix::from_fn(n, n, |i, j| matrix[[i, j]]);
    let values = eigenvalues(&dense)?;

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| values[a].re.total_cmp(&values[b].re));
    let index = order[n - 1 - rank_from_top];
    let value = values[index];
    debug!("Selected eigenvalue {} (rank {} of {})", value, rank_from_top, n);

    let vector = inverse_iteration(&dense, value)?;
    Ok(Eigenpair { value, vector })
}

fn inverse_iteration(matrix: &DMatrix<f64>, eigenvalue: Complex<f64>) -> Result<DVector<Complex<f64>>> {
    let n = matrix.nrows();
    let complex = matrix.map(|v| Complex::new(v, 0.0));
    let scale = matrix.amax().max(eigenvalue.norm()).max(1.0);
    let mut offset = SHIFT_OFFSET * scale;

    for _ in 0..MAX_SHIFT_ATTEMPTS {
        let shift = eigenvalue + Complex::new(offset, 0.0);
        let shifted = &complex - DMatrix::from_diagonal_element(n, n, shift);
        if let Some(vector) = iterate(&shifted.lu(), n) {
            return Ok(vector);
        }
        offset *= 10.0;
    }

    Err(EconCiError::Numerical(format!(
        "inverse iteration failed for eigenvalue {}",
        eigenvalue
    )))
}

fn iterate(lu: &LU<Complex<f64>, Dyn, Dyn>, n: usize) -> Option<DVector<Complex<f64>>> {
    let mut current = DVector::from_fn(n, |i, _| Complex::new(1.0 / (i as f64 + 1.0), 0.0));
    current.normalize_mut();

    for _ in 0..MAX_INVERSE_ITERATIONS {
        let mut next = lu.solve(&current)?;
        let norm = next.normalize_mut();
        if !norm.is_finite() || norm == 0.0 {
            return None;
        }
        align_phase(&mut next);

        let delta = (&next - &current).norm();
        current = next;
        if delta < CONVERGENCE_TOLERANCE {
            break;
        }
    }
    Some(current)
}

fn align_phase(vector: &mut DVector<Complex<f64>>) {
    let pivot = vector
        .iter()
        .copied()
        .fold(Complex::new(0.0, 0.0), |best, c| {
            if c.norm() > best.norm() {
                c
            } else {
                best
            }
        });
    let magnitude = pivot.norm();
    if magnitude > 0.0 {
        let phase = pivot / magnitude;
        for c in vector.iter_mut() {
            *c /= phase;
        }
    }
}
