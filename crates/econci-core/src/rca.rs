use crate::LabeledMatrix;
use ndarray::{Array2, Axis};
use tracing::{debug, warn};

/// Balassa's revealed comparative advantage:
/// `RCA[c,p] = (M[c,p] / Σ_p M[c,p]) / (Σ_c M[c,p] / Σ M)`.
///
/// Entities or items with zero total flow yield NaN/inf cells; they are not guarded.
pub fn revealed_comparative_advantage(m: &LabeledMatrix) -> LabeledMatrix {
    let row_totals = m.values.sum_axis(Axis(1));
    let col_totals = m.values.sum_axis(Axis(0));
    let grand_total = row_totals.sum();

    let zero_rows = row_totals.iter().filter(|v| **v == 0.0).count();
    let zero_cols = col_totals.iter().filter(|v| **v == 0.0).count();
    if zero_rows > 0 || zero_cols > 0 {
        warn!(
            "RCA over degenerate totals: {} zero-flow entities, {} zero-flow items",
            zero_rows, zero_cols
        );
    }

    let rca = Array2::from_shape_fn(m.values.dim(), |(c, p)| {
        (m.values[[c, p]] / row_totals[c]) / (col_totals[p] / grand_total)
    });

    debug!("Computed RCA over {:?}", rca.dim());
    LabeledMatrix::new(m.rows.clone(), m.cols.clone(), rca)
}
