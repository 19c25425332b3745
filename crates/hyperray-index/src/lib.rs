//! Bit-packed hyperoctree index.
//!
//! An [`OctreeIndex`] packs the position and refinement level of one cell of
//! a three-dimensional hyperoctree into a single `u64`. Bit 63 is reserved
//! for the invalid sentinel; the remaining 63 bits hold up to
//! [`OctreeIndex::LEVELS`] four-bit instructions, one opcode bit (is this
//! level active) followed by three operand bits (which of the eight
//! children), packed from the most significant end. Three bits at the
//! bottom are never used.

use std::fmt;

/// Number of spatial dimensions this index is packed for.
pub const DIMENSION: u32 = 3;

/// Bits per instruction: one opcode bit plus one operand bit per dimension.
const INSTRUCTION_BITS: u32 = DIMENSION + 1;

/// Bit reserved exclusively for the invalid sentinel (never part of an
/// instruction slot).
const INVALID_BIT: u64 = 1 << 63;

/// A single cell of a bit-packed hyperoctree, `D = 3`, stored in a `u64`.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct OctreeIndex(u64);

impl OctreeIndex {
    /// Maximum representable refinement level: `(64 - 1) / 4 = 15`.
    pub const LEVELS: u32 = (64 - 1) / INSTRUCTION_BITS;

    /// The root index, covering the whole domain at level 0.
    pub const ROOT: OctreeIndex = OctreeIndex(0);

    /// Number of children any non-finest cell has: `2^D`.
    pub const CHILDREN: u32 = 1 << DIMENSION;

    /// Builds an index directly from its packed representation. Does not
    /// validate; use [`OctreeIndex::check`] if the source is untrusted.
    pub const fn from_bits(bits: u64) -> Self {
        OctreeIndex(bits)
    }

    /// Returns the packed representation.
    pub const fn to_bits(self) -> u64 {
        self.0
    }

    /// Parses an index from a string of `'0'`/`'1'`/space characters filled
    /// from the most significant bit. Spaces are ignored; the remaining
    /// characters are read left to right into bits 63 down to 0.
    pub fn from_bit_string(s: &str) -> Option<Self> {
        let mut bits = 0u64;
        let mut count = 0u32;
        for c in s.chars() {
            match c {
                ' ' => continue,
                '0' => {
                    bits <<= 1;
                    count += 1;
                }
                '1' => {
                    bits = (bits << 1) | 1;
                    count += 1;
                }
                _ => return None,
            }
        }
        if count > 64 {
            return None;
        }
        bits <<= 64 - count;
        Some(OctreeIndex(bits))
    }

    const fn opcode_bit_pos(slot: u32) -> u32 {
        62 - INSTRUCTION_BITS * slot
    }

    const fn operand_base(slot: u32) -> u32 {
        Self::opcode_bit_pos(slot) - DIMENSION
    }

    /// Mask covering the top `n` instruction slots (opcode + operand bits),
    /// leaving bit 63 and the bottom remainder bits untouched.
    const fn prefix_mask(n: u32) -> u64 {
        if n == 0 {
            0
        } else {
            ((1u64 << (INSTRUCTION_BITS * n)) - 1) << (63 - INSTRUCTION_BITS * n)
        }
    }

    /// The invalid sentinel: bit 63 set, nothing else.
    pub const fn invalid() -> Self {
        OctreeIndex(INVALID_BIT)
    }

    /// True if this value carries the invalid sentinel bit.
    pub const fn invalidated(self) -> bool {
        self.0 & INVALID_BIT != 0
    }

    /// The refinement level: the number of active instructions counted from
    /// the most significant end until the first all-zero instruction.
    pub fn level(self) -> u32 {
        for slot in 0..Self::LEVELS {
            if self.0 & (1 << Self::opcode_bit_pos(slot)) == 0 {
                return slot;
            }
        }
        Self::LEVELS
    }

    /// True if this cell is the whole domain: level 0.
    pub fn coarsest(self) -> bool {
        self.level() == 0
    }

    /// True if this cell cannot be refined any further.
    pub fn finest(self) -> bool {
        self.level() == Self::LEVELS
    }

    /// True if `self` is a valid index: not the invalid sentinel, and every
    /// bit below the level boundary is zero.
    pub fn check(self) -> bool {
        if self.invalidated() {
            return false;
        }
        let level = self.level();
        self.0 & !Self::prefix_mask(level) == 0
    }

    /// Coerces an invalid value to its deepest legal ancestor: the level
    /// boundary it would have had, with the invalid bit and any unreachable
    /// trailing bits cleared.
    pub fn fix(self) -> Self {
        if !self.invalidated() && self.check() {
            return self;
        }
        let mut probe = OctreeIndex(self.0 & !INVALID_BIT);
        let level = probe.level();
        probe.0 &= Self::prefix_mask(level);
        probe
    }

    /// Bit-deinterleaved coordinate along `axis` in `[0, 2^level)`.
    pub fn coordinate(self, axis: usize) -> u64 {
        assert!(axis < DIMENSION as usize);
        let level = self.level();
        let mut out = 0u64;
        for slot in 0..level {
            let bit_pos = Self::operand_base(slot) + (DIMENSION - 1 - axis as u32);
            let bit = (self.0 >> bit_pos) & 1;
            out = (out << 1) | bit;
        }
        out
    }

    /// The operand (child selector, `0..2^D`) stored at instruction `slot`.
    fn operand_at(self, slot: u32) -> u64 {
        (self.0 >> Self::operand_base(slot)) & ((1 << DIMENSION) - 1)
    }

    /// Returns the ancestor of `self` at `level`, or `self` unchanged if
    /// `level >= self.level()` (nothing to mask off).
    pub fn ancestor_at(self, level: u32) -> Self {
        let own = self.level();
        if level >= own {
            self
        } else {
            OctreeIndex(self.0 & Self::prefix_mask(level))
        }
    }

    /// The parent of this cell. Root's parent is root.
    pub fn parent(self) -> Self {
        let level = self.level();
        if level == 0 {
            self
        } else {
            self.ancestor_at(level - 1)
        }
    }

    /// The `k`-th child of this cell. `k` is taken modulo `2^D`, so an
    /// out-of-range operand wraps rather than producing the invalid
    /// sentinel. Returns the invalid sentinel only if this cell is already
    /// at the finest level.
    pub fn child(self, k: u32) -> Self {
        let level = self.level();
        if level >= Self::LEVELS {
            return Self::invalid();
        }
        let k = k & (Self::CHILDREN - 1);
        let slot = level;
        let bits = self.0
            | (1 << Self::opcode_bit_pos(slot))
            | ((k as u64) << Self::operand_base(slot));
        OctreeIndex(bits)
    }

    /// The sibling `k` of this cell under the same parent. `k` is taken
    /// modulo `2^D`. Returns the invalid sentinel only if `self` is at
    /// level 0 and so has no parent to share siblings under.
    pub fn brother(self, k: u32) -> Self {
        let level = self.level();
        if level == 0 {
            return Self::invalid();
        }
        let k = k & (Self::CHILDREN - 1);
        let slot = level - 1;
        let operand_mask = ((1u64 << DIMENSION) - 1) << Self::operand_base(slot);
        let bits = (self.0 & !operand_mask) | ((k as u64) << Self::operand_base(slot));
        OctreeIndex(bits)
    }

    /// The sibling preceding this one in child order, cycling modulo `2^D`.
    pub fn preceding(self) -> Self {
        let level = self.level();
        if level == 0 {
            return Self::invalid();
        }
        let k = self.operand_at(level - 1) as u32;
        self.brother((k + Self::CHILDREN - 1) % Self::CHILDREN)
    }

    /// The sibling following this one in child order, cycling modulo `2^D`.
    pub fn following(self) -> Self {
        let level = self.level();
        if level == 0 {
            return Self::invalid();
        }
        let k = self.operand_at(level - 1) as u32;
        self.brother((k + 1) % Self::CHILDREN)
    }

    /// Concatenated operand bits of slots `[start, start + count)`, packed
    /// into the low `count * D` bits with `start`'s operand as the most
    /// significant chunk.
    fn raw_span(self, start: u32, count: u32) -> u64 {
        let mut out = 0u64;
        for slot in start..start + count {
            out = (out << DIMENSION) | self.operand_at(slot);
        }
        out
    }

    /// Writes `value` (the low `count * D` bits) back into the operand
    /// fields of slots `[start, start + count)`, activating their opcode
    /// bits.
    fn with_raw_span(self, start: u32, count: u32, value: u64) -> Self {
        let mut bits = self.0;
        let operand_bits = (1u64 << DIMENSION) - 1;
        for i in 0..count {
            let slot = start + i;
            let shift = (count - 1 - i) * DIMENSION;
            let chunk = (value >> shift) & operand_bits;
            bits |= 1 << Self::opcode_bit_pos(slot);
            bits &= !(operand_bits << Self::operand_base(slot));
            bits |= chunk << Self::operand_base(slot);
        }
        OctreeIndex(bits)
    }

    /// Depth-first predecessor within the subtree rooted at `start_level`
    /// spanning `n_refinements` further levels, cycling at the subtree
    /// boundary.
    pub fn previous(self, start_level: u32, n_refinements: u32) -> Self {
        if n_refinements == 0 {
            return self;
        }
        let span = self.raw_span(start_level, n_refinements);
        let width = 1u64 << (DIMENSION * n_refinements);
        let next_span = (span + width - 1) % width;
        self.with_raw_span(start_level, n_refinements, next_span)
    }

    /// Depth-first successor within the subtree rooted at `start_level`
    /// spanning `n_refinements` further levels, cycling at the subtree
    /// boundary.
    pub fn next(self, start_level: u32, n_refinements: u32) -> Self {
        if n_refinements == 0 {
            return self;
        }
        let span = self.raw_span(start_level, n_refinements);
        let width = 1u64 << (DIMENSION * n_refinements);
        let next_span = (span + 1) % width;
        self.with_raw_span(start_level, n_refinements, next_span)
    }

    /// Z-order (Morton) key of this cell's own level: the concatenated
    /// operand bits of its active instructions.
    pub fn zcurve(self) -> u64 {
        let level = self.level();
        self.raw_span(0, level)
    }

    /// Z-order key truncated to an explicit `level <= self.level()`.
    pub fn site(self, level: u32) -> u64 {
        let own = self.level();
        let level = level.min(own);
        self.raw_span(0, level)
    }

    /// The packed representation of this cell's ancestor at `level`, usable
    /// directly for lexicographic (depth-first Z-order) comparison with
    /// other indices at the same level.
    pub fn linear(self, level: u32) -> u64 {
        self.ancestor_at(level).0
    }

    /// Cell centre along `axis`, given the domain's minimum coordinate and
    /// full extent along that axis.
    pub fn center(self, axis: usize, domain_min: f64, domain_extent: f64) -> f64 {
        let level = self.level();
        let k = self.coordinate(axis) as f64;
        domain_min + domain_extent * (2.0 * k + 1.0) / (2.0_f64).powi(level as i32 + 1)
    }

    /// Cell minimum coordinate along `axis`.
    pub fn minimum(self, axis: usize, domain_min: f64, domain_extent: f64) -> f64 {
        let level = self.level();
        let k = self.coordinate(axis) as f64;
        domain_min + domain_extent * k / (2.0_f64).powi(level as i32)
    }

    /// Cell maximum coordinate along `axis`.
    pub fn maximum(self, axis: usize, domain_min: f64, domain_extent: f64) -> f64 {
        let level = self.level();
        let k = self.coordinate(axis) as f64;
        domain_min + domain_extent * (k + 1.0) / (2.0_f64).powi(level as i32)
    }

    /// Edge length of this cell (cubic: identical along every axis).
    pub fn extent(self, domain_extent: f64) -> f64 {
        domain_extent / (2.0_f64).powi(self.level() as i32)
    }

    /// Alias for [`OctreeIndex::extent`].
    pub fn length(self, domain_extent: f64) -> f64 {
        self.extent(domain_extent)
    }

    /// Cell volume: `extent^D`.
    pub fn volume(self, domain_extent: f64) -> f64 {
        self.extent(domain_extent).powi(DIMENSION as i32)
    }

    /// Builds the index at level `level` whose cell contains real-valued
    /// coordinates `(x, y, z)` within a cubic domain
    /// `[domain_min, domain_min + domain_extent)` along every axis.
    pub fn compute(level: u32, x: f64, y: f64, z: f64, domain_min: f64, domain_extent: f64) -> Self {
        let level = level.min(Self::LEVELS);
        let scale = (1u64 << level) as f64;
        let to_int = |c: f64| -> u64 {
            let u = ((c - domain_min) / domain_extent).clamp(0.0, 1.0 - f64::EPSILON);
            (u * scale).floor() as u64
        };
        let (xi, yi, zi) = (to_int(x), to_int(y), to_int(z));
        let mut bits = 0u64;
        for slot in 0..level {
            let shift = level - 1 - slot;
            let xb = (xi >> shift) & 1;
            let yb = (yi >> shift) & 1;
            let zb = (zi >> shift) & 1;
            let k = (xb << 2) | (yb << 1) | zb;
            bits |= 1 << Self::opcode_bit_pos(slot);
            bits |= k << Self::operand_base(slot);
        }
        OctreeIndex(bits)
    }

    /// Builds the index at the finest level from real-valued coordinates.
    pub fn cipher(x: f64, y: f64, z: f64, domain_min: f64, domain_extent: f64) -> Self {
        Self::compute(Self::LEVELS, x, y, z, domain_min, domain_extent)
    }

    /// True if `self` contains `other`: `self` is an ancestor of, or equal
    /// to, `other`.
    pub fn containing(self, other: Self) -> bool {
        let (sl, ol) = (self.level(), other.level());
        sl <= ol && other.ancestor_at(sl) == self
    }

    /// True if `self` is contained in `other`.
    pub fn contained(self, other: Self) -> bool {
        other.containing(self)
    }

    /// True if `self` and `other` overlap: one is an ancestor (or equal) of
    /// the other.
    pub fn intersecting(self, other: Self) -> bool {
        self.containing(other) || other.containing(self)
    }

    /// True if `self` and `other` are distinct siblings: same level, same
    /// parent.
    pub fn adjoining(self, other: Self) -> bool {
        self != other && self.level() == other.level() && self.parent() == other.parent()
    }

    /// Lowest common ancestor of a non-empty set of indices.
    pub fn merge(indices: impl IntoIterator<Item = Self>) -> Self {
        let mut iter = indices.into_iter();
        let first = match iter.next() {
            Some(v) => v,
            None => return Self::ROOT,
        };
        let mut level = first.level();
        let mut candidate = first.ancestor_at(level);
        for idx in iter {
            level = level.min(idx.level());
            candidate = candidate.ancestor_at(level);
            while !candidate.containing(idx) {
                if level == 0 {
                    break;
                }
                level -= 1;
                candidate = candidate.ancestor_at(level);
            }
        }
        candidate
    }
}

impl fmt::Debug for OctreeIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OctreeIndex(level={}, bits={:064b})", self.level(), self.0)
    }
}

impl fmt::Display for OctreeIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:064b}", self.0)
    }
}
