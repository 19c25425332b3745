//! Geodesic derivative, stepper, and bundle-launch/angular-diameter
//! reduction for null rays through a perturbed FLRW metric.

pub mod bundle;
pub mod derivative;
pub mod error;
pub mod stepper;

pub use bundle::{
    angular_diameter_distance, angular_diameter_distance_dispersion, launch_bundle, passes_caustic_check,
    Abscissa, BundleConfig,
};
pub use derivative::CoreState;
pub use error::IntegratorError;
pub use stepper::{RayState, Scheme, SchwarzschildParams, StepOutcome, Stepper, StepperConfig, Termination};

use hyperray_container::{Gravity, Octree, Photon};
use hyperray_cosmology::CosmologyTable;
use tracing::instrument;

/// Integrates one ray from `initial` until a termination predicate holds,
/// returning its full recorded trajectory. The last recorded step is
/// dropped if its redshift or scale factor came out negative, per §4.5.
#[instrument(skip(octree, cosmology, config))]
pub fn integrate_ray(
    initial: CoreState,
    max_steps: usize,
    octree: Option<&Octree<Gravity>>,
    cosmology: &CosmologyTable,
    config: &StepperConfig,
) -> Result<Vec<Photon>, IntegratorError> {
    let mut state = Stepper::init(initial, octree, config)?;
    let mut trajectory = Vec::with_capacity(max_steps.min(1024));

    let mut seed = Photon::default();
    seed.index = 0;
    seed.set_core(state.core);
    trajectory.push(seed);
    let mut next_index = 1u64;

    for _ in 0..max_steps {
        let mut recorded: Option<Photon> = None;
        let outcome = Stepper::step(
            &mut state,
            octree,
            cosmology,
            config,
            |level, phi, local_a, rho, grad_phi, dphi_dlambda, laplacian, redshift, ds2, error, _dl| {
                let mut p = Photon::default();
                p.index = next_index;
                p.level = level;
                p.local_a = local_a;
                p.rho = rho;
                p.phi = phi;
                p.grad_phi = grad_phi;
                p.dphi_dlambda = dphi_dlambda;
                p.laplacian = laplacian;
                p.redshift = redshift;
                p.ds2_dlambda2 = ds2;
                p.error = error;
                recorded = Some(p);
            },
        )?;

        if let Some(mut p) = recorded {
            p.set_core(state.core);
            trajectory.push(p);
            next_index += 1;
        }

        if matches!(outcome, StepOutcome::Terminated(_)) {
            break;
        }
    }

    if let Some(last) = trajectory.last() {
        if last.redshift < 0.0 || last.a < 0.0 {
            trajectory.pop();
        }
    }

    Ok(trajectory)
}
