//! Scenario 5: a flat-FLRW null geodesic with no potentials travels in a
//! straight line and keeps the null-constraint residual near zero.

use hyperray_container::Gravity;
use hyperray_cosmology::CosmologyTable;
use hyperray_integrator::{integrate_ray, Scheme, StepperConfig};
use proptest::prelude::*;

fn flat_static_cosmology() -> CosmologyTable {
    let t: Vec<f64> = (0..=1000).map(|i| i as f64 / 100.0).collect();
    let a = vec![1.0; t.len()];
    let dadt = vec![0.0; t.len()];
    CosmologyTable::from_columns(t, a, dadt).unwrap()
}

#[test]
fn straight_line_travel_with_vanishing_error() {
    let cosmology = flat_static_cosmology();
    let config = StepperConfig {
        scheme: Scheme::Rk4,
        nsteps: 50.0,
        c: 1.0,
        amin: 0.0,
        domain_min: -10.0,
        domain_extent: 20.0,
        reference_level: Some(4),
        schwarzschild: None,
    };

    // a, t, x, y, z, dt, dx, dy, dz
    let initial = [1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 0.0, 0.0];
    let octree: Option<&hyperray_container::Octree<Gravity>> = None;

    let trajectory = integrate_ray(initial, 200, octree, &cosmology, &config).unwrap();
    assert!(trajectory.len() > 10);

    for p in &trajectory {
        assert!((p.y).abs() < 1e-9, "ray drifted off the x-axis: y={}", p.y);
        assert!((p.z).abs() < 1e-9, "ray drifted off the x-axis: z={}", p.z);
        assert!(p.error.abs() < 1e-6, "null constraint violated: error={}", p.error);
    }

    let last = trajectory.last().unwrap();
    let first = trajectory.first().unwrap();
    assert!(last.x > first.x, "ray should have advanced along +x");
}

proptest! {
    #[test]
    fn null_constraint_stays_small_for_any_initial_direction(
        theta in 0.0f64..std::f64::consts::PI,
        psi in 0.0f64..std::f64::consts::TAU,
    ) {
        let cosmology = flat_static_cosmology();
        let config = StepperConfig {
            scheme: Scheme::Rk4,
            nsteps: 50.0,
            c: 1.0,
            amin: 0.0,
            domain_min: -10.0,
            domain_extent: 20.0,
            reference_level: Some(4),
            schwarzschild: None,
        };

        let dx = theta.sin() * psi.cos();
        let dy = theta.sin() * psi.sin();
        let dz = theta.cos();
        let initial = [1.0, 0.0, 0.0, 0.0, 0.0, 1.0, dx, dy, dz];
        let octree: Option<&hyperray_container::Octree<Gravity>> = None;

        let trajectory = integrate_ray(initial, 50, octree, &cosmology, &config).unwrap();
        for p in &trajectory {
            prop_assert!(p.error.abs() < 1e-5, "null constraint violated: error={}", p.error);
        }
    }
}
