use crate::{LabeledMatrix, LabeledVector};
use ndarray::{Array2, Axis};
use tracing::{debug, warn};

/// Item-item proximity: the number of entities specialized in both items divided by the
/// larger of the two ubiquities. The diagonal is zero.
pub fn proximity(m_cp: &LabeledMatrix, ubiquity: &LabeledVector) -> LabeledMatrix {
    let co_occurrence = m_cp.values.t().dot(&m_cp.values);
    let k = &ubiquity.values;

    let phi = Array2::from_shape_fn(co_occurrence.dim(), |(p, q)| {
        if p == q {
            0.0
        } else {
            co_occurrence[[p, q]] / k[p].max(k[q])
        }
    });

    debug!("Computed proximity for {} items", phi.nrows());
    LabeledMatrix::new(m_cp.cols.clone(), m_cp.cols.clone(), phi)
}

/// Share of each item's proximity mass that an entity's current specializations cover:
/// `density[c,p] = (M_cp · φ)[c,p] / Σ_q φ[p,q]`.
///
/// Items with no proximity to anything yield NaN.
pub fn density(m_cp: &LabeledMatrix, proximity: &LabeledMatrix) -> LabeledMatrix {
    let mass = proximity.values.sum_axis(Axis(1));
    let isolated = mass.iter().filter(|v| **v == 0.0).count();
    if isolated > 0 {
        warn!("{} items have zero proximity mass; their density is undefined", isolated);
    }

    let density = m_cp.values.dot(&proximity.values) / &mass;
    LabeledMatrix::new(m_cp.rows.clone(), m_cp.cols.clone(), density)
}

/// `1 - density`, elementwise.
pub fn distance(density: &LabeledMatrix) -> LabeledMatrix {
    LabeledMatrix::new(
        density.rows.clone(),
        density.cols.clone(),
        density.values.mapv(|d| 1.0 - d),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::specialization::ubiquity;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    fn sample_m_cp() -> LabeledMatrix {
        LabeledMatrix::new(
            vec!["A".into(), "B".into(), "C".into(), "D".into()],
            vec!["P1".into(), "P2".into(), "P3".into()],
            array![
                [1.0, 1.0, 0.0],
                [1.0, 1.0, 1.0],
                [0.0, 1.0, 1.0],
                [1.0, 0.0, 0.0]
            ],
        )
    }

    #[test]
    fn test_proximity_values_and_shape() {
        let m_cp = sample_m_cp();
        let phi = proximity(&m_cp, &ubiquity(&m_cp));

        // P1 & P2 share A, B; ubiquities 3 and 3.
        assert_abs_diff_eq!(phi.get("P1", "P2").unwrap(), 2.0 / 3.0, epsilon = 1e-12);
        // P2 & P3 share B, C; ubiquities 3 and 2.
        assert_abs_diff_eq!(phi.get("P3", "P2").unwrap(), 2.0 / 3.0, epsilon = 1e-12);
        // P1 & P3 share B only.
        assert_abs_diff_eq!(phi.get("P1", "P3").unwrap(), 1.0 / 3.0, epsilon = 1e-12);

        for p in 0..3 {
            assert_eq!(phi.values[[p, p]], 0.0);
            for q in 0..3 {
                assert_eq!(phi.values[[p, q]], phi.values[[q, p]]);
                assert!((0.0..=1.0).contains(&phi.values[[p, q]]));
            }
        }
    }

    #[test]
    fn test_density_and_distance() {
        let m_cp = sample_m_cp();
        let phi = proximity(&m_cp, &ubiquity(&m_cp));
        let dens = density(&m_cp, &phi);
        let dist = distance(&dens);

        // D is specialized in P1 only: density of P3 is φ(P1,P3) / (φ(P3,P1) + φ(P3,P2)).
        let expected = (1.0 / 3.0) / (1.0 / 3.0 + 2.0 / 3.0);
        assert_abs_diff_eq!(dens.get("D", "P3").unwrap(), expected, epsilon = 1e-12);

        for (d, x) in dens.values.iter().zip(dist.values.iter()) {
            assert_abs_diff_eq!(d + x, 1.0, epsilon = 1e-15);
        }
        assert_eq!(dens.rows, m_cp.rows);
        assert_eq!(dist.cols, m_cp.cols);
    }
}
