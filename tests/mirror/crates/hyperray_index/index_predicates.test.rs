//! Sentinel handling, `fix`, traversal order, and the level-0 merge case.

use hyperray_index::OctreeIndex;

#[test]
fn finest_level_child_is_the_invalid_sentinel() {
    let mut idx = OctreeIndex::ROOT;
    for _ in 0..OctreeIndex::LEVELS {
        idx = idx.child(2);
    }
    let finest = idx;
    assert!(finest.check());
    let overflowed = finest.child(0);
    assert!(overflowed.invalidated());
    assert!(!overflowed.check());
}

#[test]
fn fix_recovers_the_deepest_legal_ancestor() {
    let level3 = OctreeIndex::ROOT.child(1).child(2).child(3);
    let corrupted = OctreeIndex::from_bits(level3.to_bits() | (1 << 63));
    assert!(corrupted.invalidated());
    let fixed = corrupted.fix();
    assert!(fixed.check());
    assert_eq!(fixed, level3);
}

#[test]
fn previous_and_next_cycle_through_a_subtree_without_loss() {
    let start = OctreeIndex::ROOT.child(4);
    let width = 1u64 << (3 * 2); // two refinements, D = 3
    let mut cur = start.child(0).child(0);
    let mut seen = std::collections::HashSet::new();
    for _ in 0..width {
        seen.insert(cur.to_bits());
        cur = cur.next(1, 2);
    }
    assert_eq!(seen.len() as u64, width);
    assert_eq!(cur, start.child(0).child(0));
}

#[test]
fn previous_reverses_next() {
    let idx = OctreeIndex::ROOT.child(2).child(5);
    let forward = idx.next(0, 2);
    let back = forward.previous(0, 2);
    assert_eq!(back, idx);
}

#[test]
fn merge_of_a_single_index_is_itself() {
    let idx = OctreeIndex::ROOT.child(3).child(1);
    assert_eq!(OctreeIndex::merge([idx]), idx);
}

#[test]
fn merge_finds_the_lowest_common_ancestor() {
    let a = OctreeIndex::ROOT.child(2).child(0);
    let b = OctreeIndex::ROOT.child(2).child(7);
    let lca = OctreeIndex::merge([a, b]);
    assert_eq!(lca, OctreeIndex::ROOT.child(2));
    assert!(lca.containing(a));
    assert!(lca.containing(b));
}
