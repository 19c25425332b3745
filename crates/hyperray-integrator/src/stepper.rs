//! Fixed (Euler) and classical fourth-order Runge-Kutta stepper, with a
//! cell-extent-adaptive step length.

use hyperray_container::{Gravity, Octree};
use hyperray_cosmology::CosmologyTable;
use tracing::instrument;

use crate::derivative::{derivative, schwarzschild_potential, CoreState};
use crate::error::IntegratorError;

/// Forward Euler or classical fourth-order Runge-Kutta.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Scheme {
    Euler,
    Rk4,
}

/// Parameters the Schwarzschild-at-centre diagnostic mode needs in place
/// of an octree lookup.
#[derive(Clone, Copy, Debug)]
pub struct SchwarzschildParams {
    pub g: f64,
    pub m: f64,
}

/// Configuration shared by every ray a stepper integrates.
#[derive(Clone, Copy, Debug)]
pub struct StepperConfig {
    pub scheme: Scheme,
    /// Divides the cell-extent-derived step length; larger values take
    /// more, finer steps per cell crossing.
    pub nsteps: f64,
    pub c: f64,
    /// Floor on the scale factor; integration stops once `a` drops below
    /// it (§4.5 termination condition (b), generalised from the literal
    /// `a < 0` check to a configurable floor).
    pub amin: f64,
    pub domain_min: f64,
    pub domain_extent: f64,
    /// When set, use this fixed level's cell extent for the step-length
    /// formula instead of locating the actual cell — the homogeneous /
    /// test / Schwarzschild driver modes run without an octree at all.
    pub reference_level: Option<u32>,
    pub schwarzschild: Option<SchwarzschildParams>,
}

/// Why a ray's integration ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Termination {
    LeftContainer,
    ScaleFactorBelowFloor,
    OutOfDomainBounds,
}

/// Outcome of a single call to [`Stepper::step`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StepOutcome {
    Continue,
    Terminated(Termination),
}

/// Per-ray integration state threaded across calls: the core state vector
/// plus the bookkeeping the one-step-back `dphi/dlambda` estimate and the
/// redshift reference need.
#[derive(Clone, Copy, Debug)]
pub struct RayState {
    pub core: CoreState,
    pub phi_prev: f64,
    pub dl_prev: f64,
    pub gref: f64,
}

/// Samples potential, gradient and density at `(x, y, z)`: either from the
/// octree (inhomogeneous mode) or analytically (Schwarzschild diagnostic).
/// `Ok(None)` means the point is outside the container and the ray should
/// terminate; a dirty container is a programmer error and is propagated as
/// [`IntegratorError::DirtyContainer`] rather than folded into that.
fn sample_gravity(
    octree: Option<&Octree<Gravity>>,
    schwarzschild: Option<SchwarzschildParams>,
    x: f64,
    y: f64,
    z: f64,
    a: f64,
) -> Result<Option<(f64, [f64; 3], f64, f64)>, IntegratorError> {
    if let Some(params) = schwarzschild {
        let (phi, grad, rho) = schwarzschild_potential(x, y, z, params.g, params.m);
        return Ok(Some((phi, grad, rho, a)));
    }
    let octree = match octree {
        Some(tree) => tree,
        None => return Ok(None),
    };
    if octree.locate(x, y, z).map_err(|_| IntegratorError::DirtyContainer)?.is_none() {
        return Ok(None);
    }
    let g = octree.cic(x, y, z).map_err(|_| IntegratorError::DirtyContainer)?;
    Ok(Some((g.phi, g.grad_phi, g.rho, g.a)))
}

/// Cell edge length to use in the step-length formula: either the actual
/// located cell's extent, or a fixed reference level's extent when running
/// without an octree.
fn local_cell_extent(
    octree: Option<&Octree<Gravity>>,
    config: &StepperConfig,
    x: f64,
    y: f64,
    z: f64,
) -> Result<f64, IntegratorError> {
    if let Some(level) = config.reference_level {
        return Ok(config.domain_extent / (2.0_f64).powi(level as i32));
    }
    let entry = match octree {
        Some(tree) => tree
            .locate(x, y, z)
            .map_err(|_| IntegratorError::DirtyContainer)?
            .and_then(|pos| tree.get(pos)),
        None => None,
    };
    Ok(match entry {
        Some((idx, _)) => idx.extent(config.domain_extent),
        None => config.domain_extent,
    })
}

pub struct Stepper;

impl Stepper {
    /// Rescales the initial spatial velocity so the null constraint holds
    /// exactly at the starting point, and fixes the redshift reference
    /// `gref`.
    #[instrument(skip(octree, config))]
    pub fn init(
        mut core: CoreState,
        octree: Option<&Octree<Gravity>>,
        config: &StepperConfig,
    ) -> Result<RayState, IntegratorError> {
        let [a, _t, x, y, z, dt, dx, dy, dz] = core;
        let speed2 = dx * dx + dy * dy + dz * dz;
        if speed2 <= 0.0 {
            return Err(IntegratorError::ZeroInitialVelocity);
        }
        let (phi, _grad, _rho, _local_a) =
            sample_gravity(octree, config.schwarzschild, x, y, z, a)?.unwrap_or((0.0, [0.0; 3], 0.0, a));

        let c2 = config.c * config.c;
        let target_speed2 = c2 * (1.0 + 2.0 * phi / c2) / (1.0 - 2.0 * phi / c2);
        let rescale = (target_speed2 / speed2).sqrt();

        core[6] = dx * rescale;
        core[7] = dy * rescale;
        core[8] = dz * rescale;

        let gref = -a * config.c * dt * (1.0 + phi / c2);

        Ok(RayState {
            core,
            phi_prev: phi,
            dl_prev: local_cell_extent(octree, config, x, y, z)?,
            gref,
        })
    }

    /// Advances `state` by one step, recording diagnostics into `photon`.
    /// Returns whether the ray should keep going.
    #[instrument(skip(state, octree, cosmology, config, on_step))]
    pub fn step(
        state: &mut RayState,
        octree: Option<&Octree<Gravity>>,
        cosmology: &CosmologyTable,
        config: &StepperConfig,
        mut on_step: impl FnMut(u32, f64, f64, f64, [f64; 3], f64, f64, f64, f64, f64, f64),
    ) -> Result<StepOutcome, IntegratorError> {
        let [a, t, x, y, z, _dt, _dx, _dy, _dz] = state.core;

        if a < config.amin {
            return Ok(StepOutcome::Terminated(Termination::ScaleFactorBelowFloor));
        }
        if x < config.domain_min
            || x > config.domain_min + config.domain_extent
            || y < config.domain_min
            || y > config.domain_min + config.domain_extent
            || z < config.domain_min
            || z > config.domain_min + config.domain_extent
        {
            return Ok(StepOutcome::Terminated(Termination::OutOfDomainBounds));
        }

        let sample = sample_gravity(octree, config.schwarzschild, x, y, z, a)?;
        let (phi, grad_phi, _rho, _local_a) = match sample {
            Some(v) => v,
            None => return Ok(StepOutcome::Terminated(Termination::LeftContainer)),
        };

        let h = local_cell_extent(octree, config, x, y, z)?;
        let scale = config.domain_extent;
        let dl = h * a * a * (scale / config.c) / config.nsteps;

        let dphi_dlambda = (phi - state.phi_prev) / state.dl_prev.max(f64::EPSILON);

        let dadt = cosmology.dadt_at_t(t);

        let next = match config.scheme {
            Scheme::Euler => {
                let k1 = derivative(state.core, phi, grad_phi, dphi_dlambda, dadt, scale, config.c);
                let mut out = [0.0; 9];
                for i in 0..9 {
                    out[i] = state.core[i] + dl * k1[i];
                }
                out
            }
            Scheme::Rk4 => {
                let k1 = derivative(state.core, phi, grad_phi, dphi_dlambda, dadt, scale, config.c);
                let mid1 = add_scaled(state.core, k1, dl / 2.0);
                let k2 = derivative(mid1, phi, grad_phi, dphi_dlambda, dadt, scale, config.c);
                let mid2 = add_scaled(state.core, k2, dl / 2.0);
                let k3 = derivative(mid2, phi, grad_phi, dphi_dlambda, dadt, scale, config.c);
                let endpoint = add_scaled(state.core, k3, dl);
                let k4 = derivative(endpoint, phi, grad_phi, dphi_dlambda, dadt, scale, config.c);
                let mut out = [0.0; 9];
                for i in 0..9 {
                    out[i] = state.core[i] + (dl / 6.0) * (k1[i] + 2.0 * k2[i] + 2.0 * k3[i] + k4[i]);
                }
                out
            }
        };

        // Every diagnostic below describes the photon at its new position,
        // not the one the step started from; only `dphi_dlambda` above is
        // deliberately the one-step look-back value.
        let [next_a, _next_t, next_x, next_y, next_z, ..] = next;
        let post_sample = sample_gravity(octree, config.schwarzschild, next_x, next_y, next_z, next_a)?;
        let (post_phi, post_grad_phi, post_rho, post_local_a) = match post_sample {
            Some(v) => v,
            None => (phi, grad_phi, _rho, _local_a),
        };

        let level = match config.reference_level {
            Some(l) => l,
            None => match octree {
                Some(tree) => tree
                    .locate(next_x, next_y, next_z)
                    .map_err(|_| IntegratorError::DirtyContainer)?
                    .and_then(|pos| tree.get(pos))
                    .map(|(idx, _)| idx.level())
                    .unwrap_or(0),
                None => 0,
            },
        };

        let post_h = local_cell_extent(octree, config, next_x, next_y, next_z)?;

        let redshift =
            -next[0] * config.c * next[5] * (1.0 + post_phi / (config.c * config.c)) / state.gref - 1.0;

        let spatial2 = next[6] * next[6] + next[7] * next[7] + next[8] * next[8];
        let temporal2 = next[5] * next[5];
        let c2 = config.c * config.c;
        let metric_factor = (1.0 - 2.0 * post_phi / c2) / (1.0 + 2.0 * post_phi / c2);
        let error = 1.0 - spatial2 * metric_factor / (c2 * temporal2.max(f64::EPSILON));

        let ds2 = next[0] * next[0]
            * (-c2 * (1.0 + 2.0 * post_phi / c2) * temporal2 + (1.0 - 2.0 * post_phi / c2) * spatial2);

        let laplacian =
            estimate_laplacian(octree, config.schwarzschild, next_x, next_y, next_z, next_a, post_h)?;

        on_step(
            level, post_phi, post_local_a, post_rho, post_grad_phi, dphi_dlambda, laplacian, redshift, ds2,
            error, dl,
        );

        state.core = next;
        state.phi_prev = phi;
        state.dl_prev = dl;

        Ok(StepOutcome::Continue)
    }
}

fn add_scaled(base: CoreState, delta: CoreState, factor: f64) -> CoreState {
    let mut out = [0.0; 9];
    for i in 0..9 {
        out[i] = base[i] + factor * delta[i];
    }
    out
}

/// Second-difference estimate of the Laplacian of `phi` around `(x, y, z)`
/// at cell-extent spacing `h`, sampled through `cic` (or the Schwarzschild
/// analytic potential, in diagnostic mode).
fn estimate_laplacian(
    octree: Option<&Octree<Gravity>>,
    schwarzschild: Option<SchwarzschildParams>,
    x: f64,
    y: f64,
    z: f64,
    a: f64,
    h: f64,
) -> Result<f64, IntegratorError> {
    let phi_at = |x: f64, y: f64, z: f64| -> Result<f64, IntegratorError> {
        Ok(sample_gravity(octree, schwarzschild, x, y, z, a)?
            .map(|(phi, ..)| phi)
            .unwrap_or(0.0))
    };
    let phi0 = phi_at(x, y, z)?;
    let h2 = h * h;
    let dxx = phi_at(x + h, y, z)? + phi_at(x - h, y, z)? - 2.0 * phi0;
    let dyy = phi_at(x, y + h, z)? + phi_at(x, y - h, z)? - 2.0 * phi0;
    let dzz = phi_at(x, y, z + h)? + phi_at(x, y, z - h)? - 2.0 * phi0;
    Ok((dxx + dyy + dzz) / h2)
}
