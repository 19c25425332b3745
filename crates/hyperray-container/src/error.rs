use thiserror::Error;

/// Errors signalled by [`crate::Octree`] for precondition violations. Domain
/// conditions (probe outside the covered region, interpolation outside the
/// domain) are not represented here — they are absorbed in-band as `None`
/// or a default-constructed payload per the container's error-handling
/// design.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerError {
    /// `at` was called with a position beyond the stored sequence.
    #[error("index {0} out of range")]
    OutOfRange(usize),

    /// A query (`locate`, `find`, `ngp`, `cic`) was issued while the
    /// container holds unresolved refine/coarsen operations.
    #[error("container is dirty; call update() before querying")]
    NotClean,

    /// `refine` was called on a cell already at the finest representable
    /// level.
    #[error("cannot refine a cell already at the finest level")]
    AlreadyFinest,
}
