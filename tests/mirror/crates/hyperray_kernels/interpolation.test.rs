//! Interpolation and finite-difference kernel checks: exactness on linear
//! and cubic data, Fornberg consistency with a known derivative, and basic
//! properties of the trapezoidal integrator and Savitzky-Golay filter.

use hyperray_kernels::{
    derive, fornberg_derivative, hermite_cubic, integrate_trapezoidal, linear_interpolate,
    savitzky_golay,
};
use proptest::prelude::*;

#[test]
fn linear_interpolate_is_exact_on_a_line() {
    let xs: Vec<f64> = (0..10).map(|i| i as f64).collect();
    let ys: Vec<f64> = xs.iter().map(|&x| 3.0 * x + 1.0).collect();
    let y = linear_interpolate(&xs, &ys, 4.5);
    assert!((y - (3.0 * 4.5 + 1.0)).abs() < 1e-12);
}

#[test]
fn hermite_cubic_is_exact_on_a_cubic_with_exact_derivatives() {
    let f = |x: f64| x * x * x - 2.0 * x * x + x;
    let df = |x: f64| 3.0 * x * x - 4.0 * x + 1.0;
    let xs: Vec<f64> = (0..8).map(|i| i as f64 * 0.5).collect();
    let ys: Vec<f64> = xs.iter().map(|&x| f(x)).collect();
    let dys: Vec<f64> = xs.iter().map(|&x| df(x)).collect();
    let y = hermite_cubic(&xs, &ys, &dys, 1.75);
    assert!((y - f(1.75)).abs() < 1e-9);
}

#[test]
fn fornberg_derivative_matches_a_known_second_derivative() {
    let xs: Vec<f64> = (-4..4).map(|i| i as f64 * 0.1).collect();
    let ys: Vec<f64> = xs.iter().map(|&x| x * x * x).collect();
    // d^2/dx^2 (x^3) = 6x, evaluated at each sample's own x.
    for i in 0..xs.len() {
        let d2 = fornberg_derivative(&xs, &ys, i, 2);
        assert!((d2 - 6.0 * xs[i]).abs() < 1e-6, "mismatch at sample {i}");
    }
}

#[test]
fn savitzky_golay_smoothing_is_unbiased_on_a_straight_line() {
    let dx = 1.0;
    let ys: Vec<f64> = (0..21).map(|i| 2.0 * i as f64 + 5.0).collect();
    for i in 5..ys.len() - 5 {
        let smoothed = savitzky_golay(&ys, i, dx, 5, 0);
        assert!((smoothed - ys[i]).abs() < 1e-8, "mismatch at sample {i}");
    }
}

#[test]
fn savitzky_golay_first_derivative_matches_the_constant_slope() {
    let dx = 0.5;
    let ys: Vec<f64> = (0..21).map(|i| 2.0 * (i as f64 * dx)).collect();
    let slope = savitzky_golay(&ys, 10, dx, 5, 1);
    assert!((slope - 2.0).abs() < 1e-6);
}

#[test]
fn integrate_trapezoidal_matches_the_analytic_area_under_a_parabola() {
    let xs: Vec<f64> = (0..=100).map(|i| i as f64 / 100.0).collect();
    let ys: Vec<f64> = xs.iter().map(|&x| x * x).collect();
    let cumulative = integrate_trapezoidal(&xs, &ys);
    assert_eq!(cumulative[0], 0.0);
    assert!((cumulative[cumulative.len() - 1] - 1.0 / 3.0).abs() < 1e-4);
}

#[test]
fn derive_approximates_the_slope_of_a_quadratic() {
    let xs: Vec<f64> = (0..=200).map(|i| i as f64 / 100.0).collect();
    let ys: Vec<f64> = xs.iter().map(|&x| x * x).collect();
    let dydx = derive(&xs, &ys);
    let mid = dydx.len() / 2;
    assert!((dydx[mid] - 2.0 * xs[mid]).abs() < 1e-2);
}

proptest! {
    #[test]
    fn linear_interpolate_is_exact_for_any_line(
        slope in -10.0f64..10.0,
        intercept in -10.0f64..10.0,
        probe in 0.0f64..9.0,
    ) {
        let xs: Vec<f64> = (0..10).map(|i| i as f64).collect();
        let ys: Vec<f64> = xs.iter().map(|&x| slope * x + intercept).collect();
        let y = linear_interpolate(&xs, &ys, probe);
        prop_assert!((y - (slope * probe + intercept)).abs() < 1e-9);
    }

    #[test]
    fn trapezoidal_cumulative_is_nondecreasing_for_a_nonnegative_integrand(
        offset in 0.0f64..5.0,
    ) {
        let xs: Vec<f64> = (0..=50).map(|i| i as f64 / 50.0).collect();
        let ys: Vec<f64> = xs.iter().map(|&x| (x + offset).abs()).collect();
        let cumulative = integrate_trapezoidal(&xs, &ys);
        for pair in cumulative.windows(2) {
            prop_assert!(pair[1] >= pair[0] - 1e-12);
        }
    }
}
