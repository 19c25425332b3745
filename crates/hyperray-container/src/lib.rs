//! Flat, Z-order-sorted hyperoctree container: a sequence of
//! `(OctreeIndex, payload)` pairs supporting locate, refine/coarsen with
//! deferred compaction, and cloud-in-cell / nearest-grid-point
//! interpolation.

pub mod error;
pub mod payload;

pub use error::ContainerError;
pub use payload::{Gravity, Interpolable, Photon};

use hyperray_index::OctreeIndex;

/// Whether a container's invariants currently hold.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContainerState {
    /// Sorted, duplicate-free, sentinel-free: queries are well defined.
    Clean,
    /// A `refine`/`coarsen` call has not yet been followed by `update`.
    Dirty,
}

/// A flat hyperoctree: `(index, payload)` pairs stored in a `Vec`, sorted
/// by index when [`Octree::state`] is [`ContainerState::Clean`].
#[derive(Clone, Debug)]
pub struct Octree<P> {
    entries: Vec<(OctreeIndex, P)>,
    state: ContainerState,
    domain_min: f64,
    domain_extent: f64,
}

impl<P: Interpolable> Octree<P> {
    /// An empty container over a cubic domain
    /// `[domain_min, domain_min + domain_extent)`.
    pub fn new(domain_min: f64, domain_extent: f64) -> Self {
        Octree {
            entries: Vec::new(),
            state: ContainerState::Clean,
            domain_min,
            domain_extent,
        }
    }

    /// Builds a container from raw entries, without assuming they are
    /// sorted or duplicate-free. The container starts dirty; call
    /// [`Octree::update`] before querying it.
    pub fn from_raw(domain_min: f64, domain_extent: f64, entries: Vec<(OctreeIndex, P)>) -> Self {
        Octree {
            entries,
            state: ContainerState::Dirty,
            domain_min,
            domain_extent,
        }
    }

    pub fn state(&self) -> ContainerState {
        self.state
    }

    pub fn domain_min(&self) -> f64 {
        self.domain_min
    }

    pub fn domain_extent(&self) -> f64 {
        self.domain_extent
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.entries.capacity()
    }

    pub fn reserve(&mut self, additional: usize) {
        self.entries.reserve(additional);
    }

    pub fn shrink_to_fit(&mut self) {
        self.entries.shrink_to_fit();
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.state = ContainerState::Clean;
    }

    pub fn append(&mut self, other: &mut Vec<(OctreeIndex, P)>) {
        self.entries.append(other);
        self.state = ContainerState::Dirty;
    }

    pub fn pop(&mut self) -> Option<(OctreeIndex, P)> {
        self.entries.pop()
    }

    pub fn resize(&mut self, new_len: usize, payload: P) {
        self.entries.resize(new_len, (OctreeIndex::invalid(), payload));
        self.state = ContainerState::Dirty;
    }

    pub fn get(&self, i: usize) -> Option<&(OctreeIndex, P)> {
        self.entries.get(i)
    }

    pub fn at(&self, i: usize) -> Result<&(OctreeIndex, P), ContainerError> {
        self.entries.get(i).ok_or(ContainerError::OutOfRange(i))
    }

    pub fn front(&self) -> Option<&(OctreeIndex, P)> {
        self.entries.first()
    }

    pub fn back(&self) -> Option<&(OctreeIndex, P)> {
        self.entries.last()
    }

    /// Modular indexing: `cycle(i)` wraps `i` into `[0, len)`.
    pub fn cycle(&self, i: usize) -> &(OctreeIndex, P) {
        &self.entries[i % self.entries.len()]
    }

    fn ensure_clean(&self) -> Result<(), ContainerError> {
        match self.state {
            ContainerState::Clean => Ok(()),
            ContainerState::Dirty => Err(ContainerError::NotClean),
        }
    }

    /// Finds the entry position whose index is the most-refined cell
    /// containing `probe`: an `upper_bound` on the deepest representable
    /// index of the probe point, stepped back one position, per §4.2's
    /// locate algorithm.
    fn locate_position(&self, probe: OctreeIndex) -> Result<Option<usize>, ContainerError> {
        self.ensure_clean()?;
        if self.entries.is_empty() {
            return Ok(None);
        }
        let upper = self.entries.partition_point(|(idx, _)| *idx <= probe);
        if upper == 0 {
            return Ok(None);
        }
        let candidate = upper - 1;
        if self.entries[candidate].0.containing(probe) {
            Ok(Some(candidate))
        } else {
            Ok(None)
        }
    }

    /// Returns the position of, and level of, the most-refined stored cell
    /// containing real-valued coordinates `(x, y, z)`.
    fn locate_with_level(&self, x: f64, y: f64, z: f64) -> Result<Option<(usize, u32)>, ContainerError> {
        let probe = OctreeIndex::cipher(x, y, z, self.domain_min, self.domain_extent);
        match self.locate_position(probe)? {
            Some(pos) => Ok(Some((pos, self.entries[pos].0.level()))),
            None => Ok(None),
        }
    }

    /// Locates the most-refined stored cell containing `(x, y, z)`.
    /// Returns `None` if the point is outside the covered region.
    pub fn locate(&self, x: f64, y: f64, z: f64) -> Result<Option<usize>, ContainerError> {
        Ok(self.locate_with_level(x, y, z)?.map(|(pos, _)| pos))
    }

    /// Finds the most-refined stored cell containing `idx` (which need not
    /// itself be a stored index).
    pub fn find(&self, idx: OctreeIndex) -> Result<Option<usize>, ContainerError> {
        self.locate_position(idx)
    }

    /// Splits the cell at position `i` into `2^D` children carrying copies
    /// of its payload, appended to the tail, and invalidates the parent
    /// entry. Leaves the container dirty; call [`Octree::update`] once per
    /// batch of refine/coarsen calls.
    pub fn refine(&mut self, i: usize) -> Result<(), ContainerError> {
        let (idx, payload) = *self.at(i)?;
        if idx.level() >= OctreeIndex::LEVELS {
            return Err(ContainerError::AlreadyFinest);
        }
        for k in 0..OctreeIndex::CHILDREN {
            self.entries.push((idx.child(k), payload));
        }
        self.entries[i].0 = OctreeIndex::invalid();
        self.state = ContainerState::Dirty;
        Ok(())
    }

    /// Collapses the region covered by `parent` into a single cell carrying
    /// `payload`: every currently stored strict descendant of `parent` is
    /// invalidated and `parent` itself is appended. Leaves the container
    /// dirty.
    pub fn coarsen(&mut self, parent: OctreeIndex, payload: P) {
        for entry in self.entries.iter_mut() {
            if !entry.0.invalidated() && entry.0 != parent && parent.containing(entry.0) {
                entry.0 = OctreeIndex::invalid();
            }
        }
        self.entries.push((parent, payload));
        self.state = ContainerState::Dirty;
    }

    /// Restores the clean invariants: removes invalidated entries, sorts by
    /// index, and drops exact duplicates (keeping the first occurrence).
    /// A full re-sort rather than a merge of only the dirty tail — the
    /// postcondition is identical and the container is not large enough,
    /// per cell, for the distinction to matter.
    pub fn update(&mut self) {
        self.entries.retain(|(idx, _)| !idx.invalidated());
        self.entries.sort_unstable_by_key(|(idx, _)| *idx);
        self.entries.dedup_by_key(|(idx, _)| *idx);
        self.state = ContainerState::Clean;
    }

    /// Nearest-grid-point interpolation: the payload of the cell containing
    /// `(x, y, z)`, or `P::default()` if outside the covered region.
    pub fn ngp(&self, x: f64, y: f64, z: f64) -> Result<P, ContainerError> {
        match self.locate(x, y, z)? {
            Some(pos) => Ok(self.entries[pos].1),
            None => Ok(P::default()),
        }
    }

    /// Cloud-in-cell trilinear interpolation at `(x, y, z)`, restarting at a
    /// coarser level whenever any of the eight corner lookups resolves to a
    /// cell coarser than the current evaluation level, until the level
    /// stops rising. Returns `P::default()` if the probe point itself is
    /// outside the covered region.
    pub fn cic(&self, x: f64, y: f64, z: f64) -> Result<P, ContainerError> {
        self.ensure_clean()?;
        let base = OctreeIndex::cipher(x, y, z, self.domain_min, self.domain_extent);
        let (probe_pos, mut level) = match self.locate_with_level(x, y, z)? {
            Some(v) => v,
            None => return Ok(P::default()),
        };
        let _ = probe_pos;

        loop {
            let cell = base.ancestor_at(level);
            let h = cell.extent(self.domain_extent);
            let center = [
                cell.center(0, self.domain_min, self.domain_extent),
                cell.center(1, self.domain_min, self.domain_extent),
                cell.center(2, self.domain_min, self.domain_extent),
            ];
            let probe = [x, y, z];
            let mut frac = [0.0f64; 3];
            let mut sign = [1.0f64; 3];
            for axis in 0..3 {
                let d = probe[axis] - center[axis];
                sign[axis] = if d < 0.0 { -1.0 } else { 1.0 };
                frac[axis] = (d.abs() / h).min(1.0);
            }

            let mut min_level = level;
            let mut corner_payload = [P::default(); 8];
            let mut weights = [0.0f64; 8];

            for corner in 0..8u32 {
                let mut weight = 1.0;
                let mut pos = [0.0f64; 3];
                for axis in 0..3 {
                    let use_neighbor = (corner >> axis) & 1 == 1;
                    if use_neighbor {
                        weight *= frac[axis];
                        pos[axis] = center[axis] + sign[axis] * h;
                    } else {
                        weight *= 1.0 - frac[axis];
                        pos[axis] = center[axis];
                    }
                }
                weights[corner as usize] = weight;

                match self.locate_with_level(pos[0], pos[1], pos[2])? {
                    Some((pos_idx, found_level)) => {
                        corner_payload[corner as usize] = self.entries[pos_idx].1;
                        min_level = min_level.min(found_level);
                    }
                    None => {
                        corner_payload[corner as usize] = P::default();
                    }
                }
            }

            if min_level < level {
                level = min_level;
                continue;
            }

            return Ok(P::blend(weights, corner_payload));
        }
    }
}
