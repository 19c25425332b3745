//! Bundle launch (a central ray plus a rotated ring of neighbours) and the
//! angular-diameter distance reduction derived from their geometry.

use hyperray_container::Photon;
use hyperray_kernels::linear_interpolate;

use crate::derivative::CoreState;
use crate::error::IntegratorError;

/// The caustic-rejection calibration constant (§9 Open Questions): a
/// bundle is discarded if the ratio of the ring's minimum to maximum
/// final travelled radius drops below this value. Documented as a magic
/// constant rather than re-derived.
pub const CAUSTIC_REJECTION_RATIO: f64 = 0.125;

/// Which sampled quantity trajectories are resampled onto before computing
/// the angular-diameter distance.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Abscissa {
    Redshift,
    ScaleFactor,
    ConformalTime,
    Radius,
}

#[derive(Clone, Copy, Debug)]
pub struct BundleConfig {
    /// Number of rays on the ring, not counting the central ray. Must be
    /// at least 3.
    pub count: usize,
    pub half_angle: f64,
    pub phase: f64,
}

/// Builds the central ray's initial state plus `config.count` ring rays,
/// each tilted by `config.half_angle` from the central direction and
/// spread evenly in azimuth starting at `config.phase`.
pub fn launch_bundle(central: CoreState, config: &BundleConfig) -> Result<Vec<CoreState>, IntegratorError> {
    if config.count < 3 {
        return Err(IntegratorError::DegenerateBundle(config.count));
    }

    let v = [central[6], central[7], central[8]];
    let speed = (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt();
    if speed <= 0.0 {
        return Err(IntegratorError::ZeroInitialVelocity);
    }
    let v_hat = [v[0] / speed, v[1] / speed, v[2] / speed];

    let theta = (v_hat[2]).clamp(-1.0, 1.0).acos();
    let phi = v_hat[1].atan2(v_hat[0]);
    let e_theta = [theta.cos() * phi.cos(), theta.cos() * phi.sin(), -theta.sin()];
    let e_phi = [-phi.sin(), phi.cos(), 0.0];

    let mut states = Vec::with_capacity(config.count + 1);
    states.push(central);

    let (sin_a, cos_a) = config.half_angle.sin_cos();
    for k in 0..config.count {
        let psi = config.phase + 2.0 * std::f64::consts::PI * (k as f64) / (config.count as f64);
        let (sin_psi, cos_psi) = psi.sin_cos();
        let dir = [
            cos_a * v_hat[0] + sin_a * (cos_psi * e_theta[0] + sin_psi * e_phi[0]),
            cos_a * v_hat[1] + sin_a * (cos_psi * e_theta[1] + sin_psi * e_phi[1]),
            cos_a * v_hat[2] + sin_a * (cos_psi * e_theta[2] + sin_psi * e_phi[2]),
        ];
        let mut state = central;
        state[6] = dir[0] * speed;
        state[7] = dir[1] * speed;
        state[8] = dir[2] * speed;
        states.push(state);
    }

    Ok(states)
}

/// True if the ring's final travelled radii are consistent with a single
/// coherent bundle, i.e. not evidence of a caustic crossing.
pub fn passes_caustic_check(ring_trajectories: &[Vec<Photon>]) -> bool {
    let radii: Vec<f64> = ring_trajectories
        .iter()
        .filter_map(|traj| traj.last())
        .map(|p| (p.x * p.x + p.y * p.y + p.z * p.z).sqrt())
        .collect();
    if radii.len() < 2 {
        return true;
    }
    let min = radii.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = radii.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    if max <= 0.0 {
        return true;
    }
    (min / max) >= CAUSTIC_REJECTION_RATIO
}

fn abscissa_of(p: &Photon, kind: Abscissa) -> f64 {
    match kind {
        Abscissa::Redshift => p.redshift,
        Abscissa::ScaleFactor => p.a,
        Abscissa::ConformalTime => p.t,
        Abscissa::Radius => (p.x * p.x + p.y * p.y + p.z * p.z).sqrt(),
    }
}

/// Resamples every ring trajectory onto the central ray's abscissa samples
/// and returns, for each, `(abscissa, angular_diameter_distance)`.
///
/// `homogeneous_a` supplies a separately computed `a(r)` to use instead of
/// the locally sampled scale factor, for the homogeneous-universe driver
/// mode; `None` uses each sample's own `local_a`.
pub fn angular_diameter_distance(
    central: &[Photon],
    ring: &[Vec<Photon>],
    kind: Abscissa,
    half_angle: f64,
    homogeneous_a: Option<&dyn Fn(f64) -> f64>,
) -> Vec<(f64, f64)> {
    angular_diameter_distance_dispersion(central, ring, kind, half_angle, homogeneous_a)
        .into_iter()
        .map(|(abscissa, mean, _std)| (abscissa, mean))
        .collect()
}

/// Like [`angular_diameter_distance`], but also returns the standard
/// deviation of the ring's individual displacement-derived distances
/// around the mean at each abscissa sample, for the driver's statistics
/// writer.
pub fn angular_diameter_distance_dispersion(
    central: &[Photon],
    ring: &[Vec<Photon>],
    kind: Abscissa,
    half_angle: f64,
    homogeneous_a: Option<&dyn Fn(f64) -> f64>,
) -> Vec<(f64, f64, f64)> {
    let mut out = Vec::with_capacity(central.len());
    for sample in central {
        let abscissa = abscissa_of(sample, kind);

        let mut displacements = Vec::with_capacity(ring.len());
        for traj in ring {
            if traj.len() < 2 {
                continue;
            }
            let xs: Vec<f64> = traj.iter().map(|p| abscissa_of(p, kind)).collect();
            let (lo, hi) = (
                xs.iter().cloned().fold(f64::INFINITY, f64::min),
                xs.iter().cloned().fold(f64::NEG_INFINITY, f64::max),
            );
            let clamped = abscissa.clamp(lo.min(hi), lo.max(hi));
            let resample = |field: fn(&Photon) -> f64| -> f64 {
                let ys: Vec<f64> = traj.iter().map(field).collect();
                if xs[0] <= xs[xs.len() - 1] {
                    linear_interpolate(&xs, &ys, clamped)
                } else {
                    let mut rxs = xs.clone();
                    let mut rys = ys.clone();
                    rxs.reverse();
                    rys.reverse();
                    linear_interpolate(&rxs, &rys, clamped)
                }
            };
            let rx = resample(|p| p.x);
            let ry = resample(|p| p.y);
            let rz = resample(|p| p.z);
            let dx = rx - sample.x;
            let dy = ry - sample.y;
            let dz = rz - sample.z;
            displacements.push((dx * dx + dy * dy + dz * dz).sqrt());
        }

        if displacements.is_empty() {
            continue;
        }
        let scale_factor = match homogeneous_a {
            Some(f) => f(abscissa_of(sample, Abscissa::Radius)),
            None => sample.local_a,
        };
        let distances: Vec<f64> = displacements.iter().map(|d| d * scale_factor / half_angle).collect();
        let mean_distance: f64 = distances.iter().sum::<f64>() / distances.len() as f64;
        let variance: f64 = distances.iter().map(|d| (d - mean_distance).powi(2)).sum::<f64>()
            / distances.len() as f64;
        out.push((abscissa, mean_distance, variance.sqrt()));
    }
    out
}
