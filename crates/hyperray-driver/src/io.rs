//! Cone/cube binary readers and the trajectory/statistics text writers.
//!
//! Octree records are fixed-width and native-endian: a `u64` index
//! followed by `D + 1 = 4` `f64`s (`phi`, then `grad_phi[0..3]`) — density
//! and scale factor are supplied per-cone rather than per-cell, so they
//! are not part of the record.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use byteorder::{NativeEndian, ReadBytesExt};
use memmap2::Mmap;

use hyperray_container::{Gravity, Octree, Photon};
use hyperray_index::OctreeIndex;

use crate::error::DriverError;

const RECORD_BYTES: usize = 8 + 4 * 8;

/// Reads a fixed-record octree binary file into a dirty [`Octree<Gravity>`]
/// ready for [`Octree::update`]. `rho` and `a` are applied uniformly from
/// the caller, since the file itself carries only index/phi/grad_phi.
pub fn load_octree(
    path: &Path,
    domain_min: f64,
    domain_extent: f64,
    rho: f64,
    a: f64,
) -> Result<Octree<Gravity>, DriverError> {
    let file = File::open(path)?;
    let mmap = unsafe { Mmap::map(&file)? };
    let bytes = &mmap[..];

    if bytes.len() % RECORD_BYTES != 0 {
        return Err(DriverError::TruncatedRecord(bytes.len() % RECORD_BYTES));
    }

    let mut entries = Vec::with_capacity(bytes.len() / RECORD_BYTES);
    for chunk in bytes.chunks_exact(RECORD_BYTES) {
        let mut cursor = chunk;
        let bits = cursor.read_u64::<NativeEndian>()?;
        let phi = cursor.read_f64::<NativeEndian>()?;
        let grad_phi = [
            cursor.read_f64::<NativeEndian>()?,
            cursor.read_f64::<NativeEndian>()?,
            cursor.read_f64::<NativeEndian>()?,
        ];
        let idx = OctreeIndex::from_bits(bits);
        entries.push((idx, Gravity::new(rho, phi, grad_phi, a)));
    }

    Ok(Octree::from_raw(domain_min, domain_extent, entries))
}

/// Column order for one trajectory row, per §6: index, core state, level,
/// scale factor at the cell, density, potential, gradient, its
/// look-back derivative, Laplacian, redshift, constraint residuals,
/// distance/shape diagnostics.
pub fn write_trajectory(path: &Path, sep: &str, rays: &[Vec<Photon>]) -> Result<(), DriverError> {
    let file = File::create(path)?;
    let mut w = BufWriter::new(file);

    for trajectory in rays {
        for p in trajectory {
            write!(
                w,
                "{idx}{s}{a}{s}{t}{s}{x}{s}{y}{s}{z}{s}{dt}{s}{dx}{s}{dy}{s}{dz}{s}{level}{s}{la}{s}{rho}{s}{phi}{s}{gx}{s}{gy}{s}{gz}{s}{dphidl}{s}{lap}{s}{z_red}{s}{ds2}{s}{err}{s}{dist}{s}{maj}{s}{min}{s}{rot}\n",
                idx = p.index,
                a = p.a,
                t = p.t,
                x = p.x,
                y = p.y,
                z = p.z,
                dt = p.dt,
                dx = p.dx,
                dy = p.dy,
                dz = p.dz,
                level = p.level,
                la = p.local_a,
                rho = p.rho,
                phi = p.phi,
                gx = p.grad_phi[0],
                gy = p.grad_phi[1],
                gz = p.grad_phi[2],
                dphidl = p.dphi_dlambda,
                lap = p.laplacian,
                z_red = p.redshift,
                ds2 = p.ds2_dlambda2,
                err = p.error,
                dist = p.distance,
                maj = p.major,
                min = p.minor,
                rot = p.rotation,
                s = sep,
            )?;
        }
    }
    Ok(())
}

/// One row of the statistics file: the common abscissa value, the
/// homogeneous reference, and the inhomogeneous mean/std across bundles.
pub struct StatisticsRow {
    pub abscissa: f64,
    pub homogeneous: f64,
    pub inhomogeneous_mean: f64,
    pub inhomogeneous_std: f64,
}

pub fn write_statistics(path: &Path, sep: &str, rows: &[StatisticsRow]) -> Result<(), DriverError> {
    let file = File::create(path)?;
    let mut w = BufWriter::new(file);
    for row in rows {
        writeln!(
            w,
            "{a}{s}{h}{s}{m}{s}{sd}",
            a = row.abscissa,
            h = row.homogeneous,
            m = row.inhomogeneous_mean,
            sd = row.inhomogeneous_std,
            s = sep,
        )?;
    }
    Ok(())
}
