//! Octree/cone binary reader round trip, and the trajectory/statistics
//! text writers' column layout.

use byteorder::{NativeEndian, WriteBytesExt};
use std::io::Cursor;

use hyperray_container::Photon;
use hyperray_driver::error::DriverError;
use hyperray_driver::io::{load_octree, write_statistics, write_trajectory, StatisticsRow};
use hyperray_index::OctreeIndex;

fn record_bytes(idx: OctreeIndex, phi: f64, grad: [f64; 3]) -> Vec<u8> {
    let mut buf = Vec::new();
    {
        let mut cursor = Cursor::new(&mut buf);
        cursor.write_u64::<NativeEndian>(idx.to_bits()).unwrap();
        cursor.write_f64::<NativeEndian>(phi).unwrap();
        for g in grad {
            cursor.write_f64::<NativeEndian>(g).unwrap();
        }
    }
    buf
}

#[test]
fn load_octree_reads_every_record_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cube.bin");

    let mut bytes = Vec::new();
    let root = OctreeIndex::ROOT;
    bytes.extend(record_bytes(root, 1.0, [0.1, 0.2, 0.3]));
    bytes.extend(record_bytes(root.child(2), 2.0, [0.4, 0.5, 0.6]));
    std::fs::write(&path, &bytes).unwrap();

    let tree = load_octree(&path, 0.0, 1.0, 0.5, 1.0).unwrap();
    assert_eq!(tree.len(), 2);
    let (idx0, g0) = tree.get(0).unwrap();
    assert_eq!(*idx0, root);
    assert_eq!(g0.phi, 1.0);
    assert_eq!(g0.rho, 0.5);
    let (idx1, g1) = tree.get(1).unwrap();
    assert_eq!(*idx1, root.child(2));
    assert_eq!(g1.grad_phi, [0.4, 0.5, 0.6]);
}

#[test]
fn load_octree_rejects_a_truncated_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cube.bin");
    let mut bytes = record_bytes(OctreeIndex::ROOT, 1.0, [0.0; 3]);
    bytes.truncate(bytes.len() - 3);
    std::fs::write(&path, &bytes).unwrap();

    let err = load_octree(&path, 0.0, 1.0, 1.0, 1.0).unwrap_err();
    assert!(matches!(err, DriverError::TruncatedRecord(_)));
}

#[test]
fn write_trajectory_emits_one_row_per_recorded_step() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("trajectory.txt");

    let mut p0 = Photon::default();
    p0.index = 0;
    p0.x = 1.0;
    let mut p1 = Photon::default();
    p1.index = 1;
    p1.x = 2.0;
    let rays = vec![vec![p0, p1]];

    write_trajectory(&path, " ", &rays).unwrap();
    let text = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with("0 "));
    assert!(lines[1].starts_with("1 "));
}

#[test]
fn write_statistics_emits_four_columns_per_row() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("statistics.txt");

    let rows = vec![StatisticsRow {
        abscissa: 0.5,
        homogeneous: 1.2,
        inhomogeneous_mean: 1.25,
        inhomogeneous_std: 0.01,
    }];
    write_statistics(&path, ",", &rows).unwrap();
    let text = std::fs::read_to_string(&path).unwrap();
    let cols: Vec<&str> = text.trim().split(',').collect();
    assert_eq!(cols.len(), 4);
}
