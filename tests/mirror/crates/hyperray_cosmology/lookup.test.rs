//! Cosmology table round trips: loading from a plain-text file, and the
//! forward/inverse lookup consistency a step's redshift accounting relies
//! on.

use std::io::Write;

use hyperray_cosmology::{CosmologyError, CosmologyTable};

fn matter_dominated_table() -> CosmologyTable {
    let t: Vec<f64> = (1..=200).map(|i| i as f64 / 200.0).collect();
    let a: Vec<f64> = t.iter().map(|&t| t * t).collect();
    let dadt: Vec<f64> = t.iter().map(|&t| 2.0 * t).collect();
    CosmologyTable::from_columns(t, a, dadt).unwrap()
}

#[test]
fn a_at_t_and_t_at_a_are_mutually_consistent() {
    let table = matter_dominated_table();
    for &t in &[0.1, 0.3, 0.55, 0.8] {
        let a = table.a_at_t(t);
        let back = table.t_at_a(a);
        assert!((back - t).abs() < 5e-3, "round trip failed at t={t}: got {back}");
    }
}

#[test]
fn dadt_at_t_tracks_the_tabulated_derivative() {
    let table = matter_dominated_table();
    let dadt = table.dadt_at_t(0.6);
    assert!((dadt - 1.2).abs() < 1e-2);
}

#[test]
fn conformal_time_at_a_agrees_with_t_at_a() {
    let table = matter_dominated_table();
    assert_eq!(table.conformal_time_at_a(0.25), table.t_at_a(0.25));
}

#[test]
fn load_parses_a_whitespace_separated_file_with_comments() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("evolution.txt");
    let mut file = std::fs::File::create(&path).unwrap();
    writeln!(file, "# conformal time, scale factor, da/dt").unwrap();
    writeln!(file, "0.1 0.01 0.2").unwrap();
    writeln!(file, "").unwrap();
    writeln!(file, "0.2 0.04 0.4").unwrap();
    writeln!(file, "0.3 0.09 0.6").unwrap();
    drop(file);

    let table = CosmologyTable::load(&path).unwrap();
    assert_eq!(table.len(), 3);
}

#[test]
fn load_reports_malformed_rows() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("evolution.txt");
    std::fs::write(&path, "0.1 0.01\n0.2 0.04 0.4\n").unwrap();

    let err = CosmologyTable::load(&path).unwrap_err();
    assert!(matches!(err, CosmologyError::MalformedRow(0, _)));
}
