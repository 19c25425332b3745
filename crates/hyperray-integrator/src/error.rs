use thiserror::Error;

/// Errors signalled by the integrator for precondition violations. Ordinary
/// ray termination (leaving the domain, unphysical `a`) is not an error —
/// it is reported in-band as a [`crate::stepper::Termination`] so the
/// driver can keep processing the rest of the bundle.
#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum IntegratorError {
    #[error("container is dirty; cannot integrate against it")]
    DirtyContainer,

    #[error("initial photon state has zero spatial velocity")]
    ZeroInitialVelocity,

    #[error("bundle ring count must be at least 3, got {0}")]
    DegenerateBundle(usize),
}
