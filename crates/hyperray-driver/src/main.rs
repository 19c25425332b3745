//! Command-line entry point: parses a parameter file, builds the
//! background cosmology and (when needed) cone-local octree, then
//! integrates every ray/bundle in parallel across a rank-local thread
//! pool and writes trajectory and statistics output.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use rayon::prelude::*;
use tracing::{info, warn};

use hyperray_container::{Gravity, Octree, Photon};
use hyperray_cosmology::CosmologyTable;
use hyperray_integrator::{
    angular_diameter_distance, angular_diameter_distance_dispersion, launch_bundle, passes_caustic_check,
    Abscissa, BundleConfig, Scheme, SchwarzschildParams, StepperConfig,
};
use hyperray_kernels::linear_interpolate;

use hyperray_driver::config::{InterpolationSelector, ParameterFile, RunConfig, StatisticSelector};
use hyperray_driver::io::{self, StatisticsRow};
use hyperray_driver::reduce::{CollectiveReducer, LocalReducer};
#[cfg(feature = "mpi")]
use hyperray_driver::reduce::MpiReducer;

/// Command-line directives for one rank of a ray-tracing run.
#[derive(Parser, Debug)]
#[command(version, about = "Parallel geodesic ray tracer through a discretely-sampled cosmological potential")]
struct Cli {
    /// Path to the key=value parameter file.
    #[arg(long, default_value = "parameters.txt")]
    paramfile: PathBuf,

    /// Which cone this rank is responsible for, 0-indexed.
    #[arg(long, default_value_t = 0)]
    cone: usize,
}

/// Builds an `a(r)` lookup for the homogeneous-universe reference distance:
/// inverts the central ray's own comoving radius onto its conformal time
/// (the two are monotone along one ray) and reads the unperturbed scale
/// factor off the background table at that time.
fn homogeneous_a_lookup<'a>(
    central: &'a [Photon],
    cosmology: &'a CosmologyTable,
) -> impl Fn(f64) -> f64 + 'a {
    let radii: Vec<f64> = central.iter().map(|p| (p.x * p.x + p.y * p.y + p.z * p.z).sqrt()).collect();
    let times: Vec<f64> = central.iter().map(|p| p.t).collect();
    move |r: f64| cosmology.a_at_t(linear_interpolate(&radii, &times, r))
}

fn abscissa_from_selector(sel: InterpolationSelector) -> Abscissa {
    match sel {
        InterpolationSelector::Redshift => Abscissa::Redshift,
        InterpolationSelector::ScaleFactor => Abscissa::ScaleFactor,
        InterpolationSelector::ConformalTime => Abscissa::ConformalTime,
        InterpolationSelector::Radius => Abscissa::Radius,
        InterpolationSelector::All => Abscissa::Redshift,
    }
}

fn stepper_config(cfg: &RunConfig, octree: &Option<Octree<Gravity>>) -> StepperConfig {
    let reference_level = if octree.is_some() { None } else { Some(cfg.ncoarse) };
    let schwarzschild = if cfg.mode.schwarzschild {
        Some(SchwarzschildParams {
            g: 6.674_30e-11,
            m: cfg.massmsun,
        })
    } else {
        None
    };
    StepperConfig {
        scheme: Scheme::Rk4,
        nsteps: cfg.nsteps as f64,
        c: 2.997_924_58e8,
        amin: cfg.amin,
        domain_min: 0.0,
        domain_extent: cfg.domain_extent_si(),
        reference_level,
        schwarzschild,
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    #[cfg(feature = "mpi")]
    let universe = mpi::initialize().context("initializing MPI")?;
    #[cfg(feature = "mpi")]
    let world = universe.world();
    #[cfg(feature = "mpi")]
    let reducer: Box<dyn CollectiveReducer> = Box::new(MpiReducer::new(&world));
    #[cfg(not(feature = "mpi"))]
    let reducer: Box<dyn CollectiveReducer> = Box::new(LocalReducer);

    let cli = Cli::parse();
    info!(paramfile = %cli.paramfile.display(), cone = cli.cone, "starting run");

    let pf = ParameterFile::load(&cli.paramfile).context("loading parameter file")?;
    let cfg = RunConfig::from_parameter_file(&pf);

    let cosmology = CosmologyTable::load(&cfg.evolfile).context("loading cosmology table")?;

    let octree = if cfg.mode.homogeneous || cfg.mode.schwarzschild || cfg.mode.test {
        None
    } else {
        let cube_path = cfg.cubedir.join(cfg.cubefmt.replace("%d", &cli.cone.to_string()));
        let domain_extent = cfg.domain_extent_si();
        let mut tree = io::load_octree(&cube_path, 0.0, domain_extent, cfg.rhoch2, 1.0)
            .context("loading octree binary")?;
        tree.update();
        Some(tree)
    };

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(num_cpus::get())
        .build()
        .context("building thread pool")?;

    let scfg = stepper_config(&cfg, &octree);
    let bundle_config = BundleConfig {
        count: cfg.nbundlecnt.max(3),
        half_angle: cfg.openingmin,
        phase: 0.0,
    };
    let abscissa = abscissa_from_selector(cfg.interpolation);

    info!(ntrajectories = cfg.ntrajectories, "integrating bundles");

    let results: Vec<(Vec<hyperray_container::Photon>, Vec<Vec<hyperray_container::Photon>>)> =
        pool.install(|| {
            (0..cfg.ntrajectories)
                .into_par_iter()
                .filter_map(|ray_index| {
                    let initial = initial_state_for(&cfg, ray_index);
                    let states = launch_bundle(initial, &bundle_config).ok()?;

                    let mut trajectories = Vec::with_capacity(states.len());
                    for state in &states {
                        match hyperray_integrator::integrate_ray(
                            *state,
                            cfg.nsteps,
                            octree.as_ref(),
                            &cosmology,
                            &scfg,
                        ) {
                            Ok(t) => trajectories.push(t),
                            Err(e) => {
                                warn!(ray_index, error = %e, "ray integration failed");
                                return None;
                            }
                        }
                    }

                    let central = trajectories[0].clone();
                    let ring = trajectories[1..].to_vec();
                    if !passes_caustic_check(&ring) {
                        warn!(ray_index, "bundle rejected for caustic crossing");
                        return None;
                    }
                    Some((central, ring))
                })
                .collect()
        });

    std::fs::create_dir_all(&cfg.outputdir).context("creating output directory")?;

    let all_trajectories: Vec<Vec<hyperray_container::Photon>> = results
        .iter()
        .flat_map(|(central, ring)| std::iter::once(central.clone()).chain(ring.iter().cloned()))
        .collect();
    let trajectory_path = cfg
        .outputdir
        .join(format!("{}{}{}", cfg.outputprefix, cli.cone, cfg.outputsuffix));
    io::write_trajectory(&trajectory_path, &cfg.outputsep, &all_trajectories)
        .context("writing trajectory output")?;

    let want_homogeneous = matches!(
        cfg.statistic,
        StatisticSelector::Homogeneous | StatisticSelector::All
    );
    let want_inhomogeneous = matches!(
        cfg.statistic,
        StatisticSelector::Distance | StatisticSelector::Distance2 | StatisticSelector::Inhomogeneous
            | StatisticSelector::All
    );

    let mut rows = Vec::new();
    for (central, ring) in &results {
        let homogeneous_lookup = homogeneous_a_lookup(central, &cosmology);

        let homogeneous_by_abscissa: Vec<(f64, f64)> = if want_homogeneous {
            angular_diameter_distance(
                central,
                ring,
                abscissa,
                bundle_config.half_angle,
                Some(&homogeneous_lookup as &dyn Fn(f64) -> f64),
            )
        } else {
            Vec::new()
        };
        let inhomogeneous_by_abscissa: Vec<(f64, f64, f64)> = if want_inhomogeneous {
            angular_diameter_distance_dispersion(central, ring, abscissa, bundle_config.half_angle, None)
        } else {
            Vec::new()
        };

        let n = inhomogeneous_by_abscissa.len().max(homogeneous_by_abscissa.len());
        for i in 0..n {
            let (abscissa_value, homogeneous) = homogeneous_by_abscissa
                .get(i)
                .copied()
                .unwrap_or((inhomogeneous_by_abscissa.get(i).map(|(a, ..)| *a).unwrap_or(0.0), 0.0));
            let (inhomogeneous_mean, inhomogeneous_std) = inhomogeneous_by_abscissa
                .get(i)
                .map(|(_, mean, std)| (*mean, *std))
                .unwrap_or((0.0, 0.0));
            rows.push(StatisticsRow {
                abscissa: abscissa_value,
                homogeneous,
                inhomogeneous_mean,
                inhomogeneous_std,
            });
        }
    }

    let local_bundle_count = [results.len() as f64];
    let global_bundle_count = reducer.reduce_sum_f64(&local_bundle_count)[0];

    let statistics_path = cfg.outputdir.join(format!("statistics_{}{}", cli.cone, cfg.outputsuffix));
    io::write_statistics(&statistics_path, &cfg.outputsep, &rows).context("writing statistics output")?;

    info!(
        bundles = results.len(),
        bundles_across_ranks = global_bundle_count,
        ranks = reducer.world_size(),
        "run complete"
    );
    Ok(())
}

/// Initial state for one of `ntrajectories` rays launched from the
/// observer at the domain centre toward evenly spaced directions on the
/// sky, one ray per call.
fn initial_state_for(cfg: &RunConfig, ray_index: usize) -> [f64; 9] {
    let extent = cfg.domain_extent_si();
    let center = extent / 2.0;
    let n = cfg.ntrajectories.max(1) as f64;
    let golden_angle = std::f64::consts::PI * (3.0 - 5.0_f64.sqrt());
    let i = ray_index as f64;
    let z = 1.0 - 2.0 * (i + 0.5) / n;
    let radius = (1.0 - z * z).max(0.0).sqrt();
    let theta = golden_angle * i;
    let (dx, dy, dz) = (radius * theta.cos(), radius * theta.sin(), z);

    [1.0, 0.0, center, center, center, 1.0, dx, dy, dz]
}
