//! Integration tests for per-anchor averaging of correction vectors.

use approx::assert_relative_eq;
use ndarray::array;

use mnn_correct::{AverageMap, CorrectionError};

#[test]
fn averages_grouped_rows() {
    let vectors = array![[1.0, 1.0], [3.0, 3.0], [10.0, 10.0]];
    let map = AverageMap::build(&vectors, &[0, 0, 1], None).unwrap();

    assert_eq!(map.anchors(), &[0, 1]);
    assert_eq!(map.count(0), 2);
    assert_eq!(map.count(1), 1);
    assert_eq!(map.mean(0).unwrap().to_vec(), vec![2.0, 2.0]);
    assert_eq!(map.mean(1).unwrap().to_vec(), vec![10.0, 10.0]);
}

#[test]
fn missing_identifiers_are_absent_not_zero() {
    let vectors = array![[0.0, 0.0], [4.0, -2.0]];
    let map = AverageMap::build(&vectors, &[5, 2], Some(8)).unwrap();

    assert_eq!(map.anchors(), &[2, 5]);
    assert_eq!(map.capacity(), 8);
    assert!(map.contains(5));
    // anchor 5 has a genuine zero mean; anchor 3 has no anchor at all
    assert_eq!(map.mean(5).unwrap().to_vec(), vec![0.0, 0.0]);
    assert!(map.mean(3).is_none());
    assert!(map.mean(100).is_none());
    assert_eq!(map.count(3), 0);
}

#[test]
fn capacity_follows_largest_id_without_sample_count() {
    let vectors = array![[1.0], [2.0]];
    let map = AverageMap::build(&vectors, &[1, 6], None).unwrap();
    assert_eq!(map.capacity(), 7);
    assert_eq!(map.len(), 2);
}

#[test]
fn ids_beyond_sample_count_error() {
    let vectors = array![[1.0], [2.0]];
    let err = AverageMap::build(&vectors, &[1, 6], Some(3)).unwrap_err();
    assert_eq!(
        err,
        CorrectionError::IndexOutOfBounds {
            what: "anchor",
            index: 6,
            len: 3
        }
    );
}

#[test]
fn huge_ids_error_instead_of_allocating() {
    let vectors = array![[1.0]];
    let err = AverageMap::build(&vectors, &[usize::MAX], None).unwrap_err();
    assert!(matches!(
        err,
        CorrectionError::IndexOutOfBounds {
            index: usize::MAX,
            ..
        }
    ));

    let wide = ndarray::Array2::<f64>::zeros((1, 4096));
    let err = AverageMap::build(&wide, &[1usize << 32], Some(2)).unwrap_err();
    assert!(matches!(err, CorrectionError::IndexOutOfBounds { len: 2, .. }));
}

#[test]
fn iteration_is_ascending() {
    let vectors = array![[1.0], [2.0], [3.0], [5.0]];
    let map = AverageMap::build(&vectors, &[4, 1, 4, 0], None).unwrap();

    let seen: Vec<(usize, f64, usize)> = map.iter().map(|(a, m, n)| (a, m[0], n)).collect();
    assert_eq!(seen.len(), 3);
    assert_eq!((seen[0].0, seen[0].2), (0, 1));
    assert_eq!((seen[1].0, seen[1].2), (1, 1));
    assert_eq!((seen[2].0, seen[2].2), (4, 2));
    assert_relative_eq!(seen[2].1, 2.0);
}

#[test]
fn index_length_mismatch_errors() {
    let vectors = array![[1.0, 1.0], [3.0, 3.0]];
    let err = AverageMap::build(&vectors, &[0, 0, 1], None).unwrap_err();
    assert!(matches!(
        err,
        CorrectionError::DimensionMismatch {
            expected: 2,
            got: 3,
            ..
        }
    ));
}

#[test]
fn empty_input_builds_empty_map() {
    let vectors = ndarray::Array2::<f64>::zeros((0, 3));
    let map = AverageMap::build(&vectors, &[], None).unwrap();
    assert!(map.is_empty());
    assert_eq!(map.ngenes(), 3);
}
