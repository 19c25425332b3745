//! Line-oriented key=value parameter file, and the typed [`RunConfig`]
//! built from it. Unrecognised keys are ignored — there is no strict
//! schema, per §6.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::DriverError;

/// The raw key=value pairs read from a parameter file.
#[derive(Clone, Debug, Default)]
pub struct ParameterFile {
    entries: HashMap<String, String>,
}

impl ParameterFile {
    pub fn load(path: &Path) -> Result<Self, DriverError> {
        let text = fs::read_to_string(path)?;
        let mut entries = HashMap::new();
        for (lineno, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let mut parts = line.splitn(2, '=');
            let key = parts.next().map(str::trim);
            let value = parts.next().map(str::trim);
            match (key, value) {
                (Some(k), Some(v)) if !k.is_empty() => {
                    entries.insert(k.to_string(), v.to_string());
                }
                _ => return Err(DriverError::MalformedParameter(lineno, line.to_string())),
            }
        }
        Ok(ParameterFile { entries })
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    fn parsed<T: FromStr>(&self, key: &str, default: T) -> T {
        self.get(key).and_then(|v| v.parse().ok()).unwrap_or(default)
    }

    fn flag(&self, key: &str, default: bool) -> bool {
        match self.get(key) {
            Some(v) => matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"),
            None => default,
        }
    }
}

/// Which of the mutually-informative driver modes (§6) are active. More
/// than one may be set; the driver layer, not this crate, decides how
/// they combine.
#[derive(Clone, Copy, Debug, Default)]
pub struct ModeSwitches {
    pub propagation: bool,
    pub homogeneous: bool,
    pub schwarzschild: bool,
    pub test: bool,
    pub visualization: bool,
}

/// `interpolation` selector: the common abscissa trajectories are
/// resampled onto before the angular-diameter reduction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InterpolationSelector {
    Redshift,
    ScaleFactor,
    ConformalTime,
    Radius,
    All,
}

impl FromStr for InterpolationSelector {
    type Err = ();
    fn from_str(s: &str) -> Result<Self, ()> {
        match s.to_ascii_lowercase().as_str() {
            "redshift" => Ok(Self::Redshift),
            "a" => Ok(Self::ScaleFactor),
            "t" => Ok(Self::ConformalTime),
            "r" => Ok(Self::Radius),
            "all" => Ok(Self::All),
            _ => Err(()),
        }
    }
}

/// `statistic` selector: which post-processed quantity the statistics
/// writer emits.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StatisticSelector {
    Distance,
    Distance2,
    Homogeneous,
    Inhomogeneous,
    All,
}

impl FromStr for StatisticSelector {
    type Err = ();
    fn from_str(s: &str) -> Result<Self, ()> {
        match s.to_ascii_lowercase().as_str() {
            "distance" => Ok(Self::Distance),
            "distance2" => Ok(Self::Distance2),
            "homogeneous" => Ok(Self::Homogeneous),
            "inhomogeneous" => Ok(Self::Inhomogeneous),
            "all" => Ok(Self::All),
            _ => Err(()),
        }
    }
}

/// The typed configuration the driver runs against, built from a
/// [`ParameterFile`] with defaults filled in for every recognised key the
/// file omits.
#[derive(Clone, Debug)]
pub struct RunConfig {
    pub mode: ModeSwitches,

    pub cubedir: PathBuf,
    pub conedir: PathBuf,
    pub outputdir: PathBuf,
    pub evolfile: PathBuf,

    pub cubefmt: String,
    pub conefmt: String,
    pub outputprefix: String,
    pub outputsuffix: String,
    pub outputsep: String,

    pub ncones: usize,
    pub ntrajectories: usize,
    pub nsteps: usize,
    pub ncoarse: u32,
    pub nreference: u32,
    pub nbundlemin: usize,
    pub nbundlecnt: usize,
    pub openingmin: f64,
    pub openingcnt: usize,
    pub levelmin: u32,
    pub levelmax: u32,
    pub criterion: f64,
    pub seed: u64,
    pub allocation: usize,
    pub amin: f64,

    pub mpc: f64,
    pub rhoch2: f64,
    pub lboxmpch0: f64,
    pub h: f64,
    pub omegam: f64,
    pub massmsun: f64,

    pub interpolation: InterpolationSelector,
    pub statistic: StatisticSelector,
}

impl RunConfig {
    pub fn from_parameter_file(pf: &ParameterFile) -> Self {
        RunConfig {
            mode: ModeSwitches {
                propagation: pf.flag("propagation", true),
                homogeneous: pf.flag("homogeneous", false),
                schwarzschild: pf.flag("schwarzschild", false),
                test: pf.flag("test", false),
                visualization: pf.flag("visualization", false),
            },

            cubedir: PathBuf::from(pf.get("cubedir").unwrap_or(".")),
            conedir: PathBuf::from(pf.get("conedir").unwrap_or(".")),
            outputdir: PathBuf::from(pf.get("outputdir").unwrap_or(".")),
            evolfile: PathBuf::from(pf.get("evolfile").unwrap_or("evolution.txt")),

            cubefmt: pf.get("cubefmt").unwrap_or("cube_%d.bin").to_string(),
            conefmt: pf.get("conefmt").unwrap_or("cone_%d.bin").to_string(),
            outputprefix: pf.get("outputprefix").unwrap_or("ray_").to_string(),
            outputsuffix: pf.get("outputsuffix").unwrap_or(".txt").to_string(),
            outputsep: pf.get("outputsep").unwrap_or(" ").to_string(),

            ncones: pf.parsed("ncones", 1),
            ntrajectories: pf.parsed("ntrajectories", 8),
            nsteps: pf.parsed("nsteps", 100),
            ncoarse: pf.parsed("ncoarse", 6),
            nreference: pf.parsed("nreference", 6),
            nbundlemin: pf.parsed("nbundlemin", 8),
            nbundlecnt: pf.parsed("nbundlecnt", 8),
            openingmin: pf.parsed("openingmin", 1e-4),
            openingcnt: pf.parsed("openingcnt", 1),
            levelmin: pf.parsed("levelmin", 0),
            levelmax: pf.parsed("levelmax", hyperray_index::OctreeIndex::LEVELS),
            criterion: pf.parsed("criterion", 0.0),
            seed: pf.parsed("seed", 42),
            allocation: pf.parsed("allocation", 1 << 20),
            amin: pf.parsed("amin", 1e-3),

            mpc: pf.parsed("mpc", 3.0856775814913673e22),
            rhoch2: pf.parsed("rhoch2", 1.878e-26),
            lboxmpch0: pf.parsed("lboxmpch0", 100.0),
            h: pf.parsed("h", 0.7),
            omegam: pf.parsed("omegam", 0.3),
            massmsun: pf.parsed("massmsun", 1.989e30),

            interpolation: pf
                .get("interpolation")
                .and_then(|v| v.parse().ok())
                .unwrap_or(InterpolationSelector::Redshift),
            statistic: pf
                .get("statistic")
                .and_then(|v| v.parse().ok())
                .unwrap_or(StatisticSelector::Distance),
        }
    }

    /// The box's physical extent in metres: `lboxmpch0 / h * mpc`.
    pub fn domain_extent_si(&self) -> f64 {
        self.lboxmpch0 / self.h * self.mpc
    }
}
