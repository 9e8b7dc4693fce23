//! Integration tests for quantile-matching variance adjustment.

use approx::assert_relative_eq;
use ndarray::{array, Array2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use mnn_correct::{adjust_shift_variance, CorrectionError, VarianceAdjuster};

fn random_matrix(rng: &mut StdRng, rows: usize, cols: usize) -> Array2<f64> {
    Array2::from_shape_fn((rows, cols), |_| rng.gen_range(-1.0..1.0))
}

// ---------------------------------------------------------------------------
// Quantile matching
// ---------------------------------------------------------------------------

#[test]
fn identical_symmetric_populations_need_no_shift() {
    let data = array![[-2.0, -1.0, 0.0, 1.0, 2.0]];
    let gradients = Array2::from_elem((5, 1), 1.0);

    let out = adjust_shift_variance(&data, &data, &gradients, 1.0).unwrap();
    assert_eq!(out.len(), 5);
    for v in out.iter() {
        assert_relative_eq!(*v, 0.0, epsilon = 1e-12);
    }
}

#[test]
fn shifted_reference_is_recovered_in_gradient_units() {
    let query = array![[-2.0, -1.0, 0.0, 1.0, 2.0]];
    let reference = query.mapv(|v| v + 3.0);
    let gradients = Array2::from_elem((5, 1), 2.0);

    let out = adjust_shift_variance(&reference, &query, &gradients, 1.0).unwrap();
    for v in out.iter() {
        assert_relative_eq!(*v, 1.5, epsilon = 1e-12);
    }
}

#[test]
fn line_distance_controls_weights() {
    // query samples (0,0), (1,0), (0.5,5); reference (3,0), (4,0), (10,100);
    // every direction points along the x axis with length 2
    let query = array![[0.0, 1.0, 0.5], [0.0, 0.0, 5.0]];
    let reference = array![[3.0, 4.0, 10.0], [0.0, 0.0, 100.0]];
    let gradients = array![[2.0, 0.0], [2.0, 0.0], [2.0, 0.0]];

    let out = adjust_shift_variance(&reference, &query, &gradients, 1.0).unwrap();
    assert_relative_eq!(out[0], 1.5, epsilon = 1e-12);
    assert_relative_eq!(out[1], 1.5, epsilon = 1e-12);
    assert_relative_eq!(out[2], 1.75, epsilon = 1e-12);
}

#[test]
fn scaling_a_gradient_rescales_its_factor() {
    let mut rng = StdRng::seed_from_u64(3);
    let reference = random_matrix(&mut rng, 3, 40);
    let query = random_matrix(&mut rng, 3, 25);
    let gradients = random_matrix(&mut rng, 25, 3);

    let base = adjust_shift_variance(&reference, &query, &gradients, 0.5).unwrap();

    let k = 4.0;
    let mut scaled = gradients.clone();
    scaled.row_mut(7).mapv_inplace(|v| v * k);
    let out = adjust_shift_variance(&reference, &query, &scaled, 0.5).unwrap();

    assert_relative_eq!(out[7] * k, base[7], epsilon = 1e-10);
    for c in (0..25).filter(|&c| c != 7) {
        assert_relative_eq!(out[c], base[c], epsilon = 1e-12);
    }
}

#[test]
fn parallel_matches_sequential() {
    let mut rng = StdRng::seed_from_u64(9);
    let reference = random_matrix(&mut rng, 4, 50);
    let query = random_matrix(&mut rng, 4, 35);
    let gradients = random_matrix(&mut rng, 35, 4);

    let seq = VarianceAdjuster::new(0.3).unwrap();
    let a = seq.adjust(&reference, &query, &gradients).unwrap();
    let b = seq.with_parallel(true).adjust(&reference, &query, &gradients).unwrap();
    assert_eq!(a, b);
}

// ---------------------------------------------------------------------------
// Degenerate input
// ---------------------------------------------------------------------------

#[test]
fn zero_gradient_yields_nan_for_that_sample_only() {
    let data = array![[-1.0, 0.0, 1.0]];
    let gradients = array![[1.0], [0.0], [1.0]];

    let out = adjust_shift_variance(&data, &data, &gradients, 1.0).unwrap();
    assert!(out[1].is_nan());
    assert!(out[0].is_finite());
    assert!(out[2].is_finite());
}

#[test]
fn empty_reference_yields_nan() {
    let reference = Array2::<f64>::zeros((2, 0));
    let query = array![[0.0, 1.0], [1.0, 0.0]];
    let gradients = array![[1.0, 0.0], [0.0, 1.0]];

    let out = adjust_shift_variance(&reference, &query, &gradients, 1.0).unwrap();
    assert!(out.iter().all(|v| v.is_nan()));
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[test]
fn feature_mismatch_errors() {
    let reference = Array2::<f64>::zeros((3, 4));
    let query = Array2::<f64>::zeros((2, 5));
    let gradients = Array2::<f64>::zeros((5, 3));
    let err = adjust_shift_variance(&reference, &query, &gradients, 1.0).unwrap_err();
    assert!(matches!(
        err,
        CorrectionError::DimensionMismatch {
            expected: 3,
            got: 2,
            ..
        }
    ));
}

#[test]
fn gradient_length_mismatch_errors() {
    let reference = Array2::<f64>::zeros((3, 4));
    let query = Array2::<f64>::zeros((3, 5));
    let gradients = Array2::<f64>::zeros((5, 2));
    let err = adjust_shift_variance(&reference, &query, &gradients, 1.0).unwrap_err();
    assert!(matches!(err, CorrectionError::DimensionMismatch { .. }));
}

#[test]
fn gradient_rows_mismatch_errors() {
    let reference = Array2::<f64>::zeros((3, 4));
    let query = Array2::<f64>::zeros((3, 5));
    let gradients = Array2::<f64>::zeros((4, 3));
    let err = adjust_shift_variance(&reference, &query, &gradients, 1.0).unwrap_err();
    assert!(matches!(
        err,
        CorrectionError::DimensionMismatch {
            expected: 5,
            got: 4,
            ..
        }
    ));
}

#[test]
fn invalid_sigma_errors() {
    let data = array![[0.0, 1.0]];
    let gradients = array![[1.0], [1.0]];
    let err = adjust_shift_variance(&data, &data, &gradients, -0.5).unwrap_err();
    assert!(matches!(err, CorrectionError::InvalidArgument(_)));
}
