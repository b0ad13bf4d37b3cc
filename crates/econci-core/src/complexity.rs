use crate::eigen::ranked_eigenpair;
use crate::{LabeledMatrix, LabeledVector, Result};
use ndarray::{Array1, Array2, ArrayView2, Axis};
use tracing::{debug, warn};

/// Complexity indexes use the eigenvector of the second-largest eigenvalue; the dominant
/// one is uniform and carries no ranking information.
const COMPLEXITY_EIGEN_RANK: usize = 1;

/// Row-normalized co-occurrence matrix of a bipartite specialization matrix:
/// `T[i,j] = Σ_k m[i,k]·m[j,k] / (col_degree[k]·row_degree[i])`.
pub fn transition_matrix(
    m: ArrayView2<'_, f64>,
    row_degree: &Array1<f64>,
    col_degree: &Array1<f64>,
) -> Array2<f64> {
    let weighted = &m / col_degree;
    let overlap = m.dot(&weighted.t());
    overlap / &row_degree.view().insert_axis(Axis(1))
}

/// Economic Complexity Index over the entities of M_cp.
pub fn economic_complexity_index(
    m_cp: &LabeledMatrix,
    diversity: &LabeledVector,
    ubiquity: &LabeledVector,
) -> Result<LabeledVector> {
    let t_cc = transition_matrix(m_cp.values.view(), &diversity.values, &ubiquity.values);
    let eci = complexity_vector(&t_cc, &diversity.values)?;
    debug!("Computed ECI for {} entities", eci.len());
    Ok(LabeledVector::new(m_cp.rows.clone(), eci))
}

/// Product Complexity Index over the items of M_cp.
///
/// After the usual sign correction against ubiquity the vector is negated, so complex
/// items (low ubiquity) score high.
pub fn product_complexity_index(
    m_cp: &LabeledMatrix,
    diversity: &LabeledVector,
    ubiquity: &LabeledVector,
) -> Result<LabeledVector> {
    let t_pp = transition_matrix(m_cp.values.t(), &ubiquity.values, &diversity.values);
    let pci = complexity_vector(&t_pp, &ubiquity.values)? * -1.0;
    debug!("Computed PCI for {} items", pci.len());
    Ok(LabeledVector::new(m_cp.cols.clone(), pci))
}

fn complexity_vector(transition: &Array2<f64>, degree: &Array1<f64>) -> Result<Array1<f64>> {
    let pair = ranked_eigenpair(transition, COMPLEXITY_EIGEN_RANK)?;
    let index = standardize(&Array1::from(pair.real_vector()));
    Ok(align_sign(index, degree))
}

/// Centers to zero mean and scales to unit (population) standard deviation.
///
/// A constant input has zero deviation and standardizes to NaN.
pub fn standardize(values: &Array1<f64>) -> Array1<f64> {
    let n = values.len() as f64;
    let mean = values.sum() / n;
    let variance = values.mapv(|v| (v - mean).powi(2)).sum() / n;
    let std = variance.sqrt();
    if std == 0.0 {
        warn!("Complexity eigenvector has zero variance; index is undefined");
    }
    values.mapv(|v| (v - mean) / std)
}

/// Pearson correlation coefficient; NaN when either input is constant.
pub fn pearson_correlation(a: &Array1<f64>, b: &Array1<f64>) -> f64 {
    let n = a.len() as f64;
    let mean_a = a.sum() / n;
    let mean_b = b.sum() / n;
    let (mut cov, mut var_a, mut var_b) = (0.0, 0.0, 0.0);
    for (x, y) in a.iter().zip(b.iter()) {
        let (dx, dy) = (x - mean_a, y - mean_b);
        cov += dx * dy;
        var_a += dx * dx;
        var_b += dy * dy;
    }
    cov / (var_a.sqrt() * var_b.sqrt())
}

/// Eigenvectors have arbitrary sign; orient the index to correlate non-negatively with
/// the degree vector.
fn align_sign(index: Array1<f64>, degree: &Array1<f64>) -> Array1<f64> {
    if pearson_correlation(degree, &index) < 0.0 {
        index * -1.0
    } else {
        index
    }
}
