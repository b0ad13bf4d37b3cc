use crate::{LabeledMatrix, LabeledVector};
use ndarray::Axis;
use tracing::debug;

pub const DEFAULT_M_CP_THRESHOLD: f64 = 1.0;

/// Binarizes RCA into M_cp: cells with `RCA >= threshold` become 1, everything else
/// (NaN included) becomes 0.
///
/// All-zero rows are then dropped, followed by all-zero columns of what remains, in one
/// pass. Dropping an all-zero line never changes the sums of the others, so the pass
/// already leaves no empty row or column behind.
pub fn specialization_matrix(rca: &LabeledMatrix, threshold: f64) -> LabeledMatrix {
    let binary = rca
        .values
        .mapv(|v| if v >= threshold { 1.0 } else { 0.0 });

    let keep_rows: Vec<usize> = binary
        .axis_iter(Axis(0))
        .enumerate()
        .filter(|(_, row)| row.iter().any(|v| *v != 0.0))
        .map(|(i, _)| i)
        .collect();
    let binary = binary.select(Axis(0), &keep_rows);

    let keep_cols: Vec<usize> = binary
        .axis_iter(Axis(1))
        .enumerate()
        .filter(|(_, col)| col.iter().any(|v| *v != 0.0))
        .map(|(i, _)| i)
        .collect();
    let binary = binary.select(Axis(1), &keep_cols);

    let rows: Vec<String> = keep_rows.iter().map(|&i| rca.rows[i].clone()).collect();
    let cols: Vec<String> = keep_cols.iter().map(|&i| rca.cols[i].clone()).collect();

    debug!(
        "M_cp threshold {}: kept {}/{} entities, {}/{} items",
        threshold,
        rows.len(),
        rca.rows.len(),
        cols.len(),
        rca.cols.len()
    );
    LabeledMatrix::new(rows, cols, binary)
}

/// Number of items each entity is specialized in (row sums of M_cp).
pub fn diversity(m_cp: &LabeledMatrix) -> LabeledVector {
    m_cp.row_sums()
}

/// Number of entities specialized in each item (column sums of M_cp).
pub fn ubiquity(m_cp: &LabeledMatrix) -> LabeledVector {
    m_cp.col_sums()
}
