use approx::assert_abs_diff_eq;
use econci_core::{
    build_flow_matrix, density, distance, diversity, economic_complexity_index,
    product_complexity_index, proximity, revealed_comparative_advantage, specialization_matrix,
    ubiquity, EconCiError, ObservationTable,
};
use ndarray::array;

fn reference_table() -> ObservationTable {
    ObservationTable::from_records(
        "country",
        "product",
        "export",
        vec![
            ("A", "P1", 10.0),
            ("A", "P2", 20.0),
            ("A", "P3", 30.0),
            ("B", "P1", 40.0),
            ("B", "P2", 50.0),
            ("C", "P1", 60.0),
        ],
    )
    .unwrap()
}

/// A denser table: six exporters over six products with a nested specialization pattern.
fn nested_table() -> ObservationTable {
    let flows = [
        ("c1", [90.0, 5.0, 4.0, 3.0, 2.0, 1.0]),
        ("c2", [40.0, 40.0, 5.0, 4.0, 3.0, 2.0]),
        ("c3", [30.0, 30.0, 30.0, 3.0, 2.0, 1.0]),
        ("c4", [20.0, 20.0, 20.0, 20.0, 2.0, 1.0]),
        ("c5", [15.0, 15.0, 15.0, 15.0, 15.0, 1.0]),
        ("c6", [10.0, 10.0, 10.0, 10.0, 10.0, 10.0]),
    ];
    let records = flows.iter().flat_map(|(c, row)| {
        row.iter()
            .enumerate()
            .map(move |(p, v)| (c.to_string(), format!("p{}", p + 1), *v))
    });
    ObservationTable::from_records("country", "product", "export", records).unwrap()
}

#[test]
fn test_reference_scenario_end_to_end() {
    let table = reference_table();
    let m = build_flow_matrix(&table, "country", "product", "export").unwrap();
    assert_eq!(
        m.values,
        array![[10.0, 20.0, 30.0], [40.0, 50.0, 0.0], [60.0, 0.0, 0.0]]
    );

    let rca = revealed_comparative_advantage(&m);
    assert_abs_diff_eq!(rca.get("B", "P2").unwrap(), 1.6667, epsilon = 1e-4);

    let m_cp = specialization_matrix(&rca, 1.0);
    assert_eq!(
        m_cp.values,
        array![[0.0, 1.0, 1.0], [0.0, 1.0, 0.0], [1.0, 0.0, 0.0]]
    );

    let k_c = diversity(&m_cp);
    let k_p = ubiquity(&m_cp);
    let eci = economic_complexity_index(&m_cp, &k_c, &k_p).unwrap();
    let pci = product_complexity_index(&m_cp, &k_c, &k_p).unwrap();

    let rounded = |v: f64| (v * 1000.0).round() / 1000.0;
    assert_eq!(
        eci.values.mapv(rounded).to_vec(),
        vec![0.707, 0.707, -1.414]
    );
    assert_eq!(
        pci.values.mapv(rounded).to_vec(),
        vec![1.414, -0.707, -0.707]
    );
}

#[test]
fn test_indexes_are_standardized_on_nested_data() {
    let table = nested_table();
    let m = build_flow_matrix(&table, "country", "product", "export").unwrap();
    let m_cp = specialization_matrix(&revealed_comparative_advantage(&m), 1.0);
    let k_c = diversity(&m_cp);
    let k_p = ubiquity(&m_cp);

    for v in k_c.values.iter() {
        assert_eq!(v.fract(), 0.0);
        assert!(*v >= 0.0 && *v <= m_cp.cols.len() as f64);
    }
    for v in k_p.values.iter() {
        assert_eq!(v.fract(), 0.0);
        assert!(*v >= 0.0 && *v <= m_cp.rows.len() as f64);
    }

    for index in [
        economic_complexity_index(&m_cp, &k_c, &k_p).unwrap(),
        product_complexity_index(&m_cp, &k_c, &k_p).unwrap(),
    ] {
        let n = index.len() as f64;
        let mean = index.values.sum() / n;
        let var = index.values.mapv(|v| (v - mean).powi(2)).sum() / n;
        assert_abs_diff_eq!(mean, 0.0, epsilon = 1e-9);
        assert_abs_diff_eq!(var, 1.0, epsilon = 1e-9);
    }
}

#[test]
fn test_proximity_density_invariants() {
    let table = nested_table();
    let m = build_flow_matrix(&table, "country", "product", "export").unwrap();
    let m_cp = specialization_matrix(&revealed_comparative_advantage(&m), 1.0);
    let phi = proximity(&m_cp, &ubiquity(&m_cp));
    let dens = density(&m_cp, &phi);
    let dist = distance(&dens);

    let n = phi.values.nrows();
    for p in 0..n {
        assert_eq!(phi.values[[p, p]], 0.0);
        for q in 0..n {
            assert_eq!(phi.values[[p, q]], phi.values[[q, p]]);
            assert!(phi.values[[p, q]] >= 0.0 && phi.values[[p, q]] <= 1.0);
        }
    }
    for (d, x) in dens.values.iter().zip(dist.values.iter()) {
        assert_abs_diff_eq!(d + x, 1.0, epsilon = 1e-12);
    }
}

#[test]
fn test_missing_column_is_input_error() {
    let table = reference_table();
    let err = build_flow_matrix(&table, "country", "product", "import").unwrap_err();
    assert!(matches!(err, EconCiError::InvalidTable(_)));
}

#[test]
fn test_csv_with_custom_roles_and_missing_values() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("trade.csv");
    std::fs::write(
        &path,
        "year,exporter,hs,usd\n\
         2020,A,10,10\n2020,A,20,20\n2020,A,30,30\n\
         2020,B,10,40\n2020,B,20,50\n2020,B,30,\n\
         2020,C,10,60\n",
    )
    .unwrap();

    let table = ObservationTable::from_csv_path(&path).unwrap();
    table.validate_roles("exporter", "hs", "usd").unwrap();
    let m = build_flow_matrix(&table, "exporter", "hs", "usd").unwrap();

    // Item codes keep their spelling; the empty cell counts as no flow.
    assert_eq!(m.cols, vec!["10", "20", "30"]);
    assert_eq!(m.get("B", "30"), Some(0.0));
    assert_eq!(m.row_sums().values.to_vec(), vec![60.0, 90.0, 60.0]);
}
