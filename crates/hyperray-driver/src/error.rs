use thiserror::Error;

/// Errors surfaced to the user at the binary boundary. Per §7, input
/// errors abort the rank; domain/numeric conditions inside a single ray's
/// integration are absorbed and never reach here.
#[derive(Error, Debug)]
pub enum DriverError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed parameter file line {0}: {1:?}")]
    MalformedParameter(usize, String),

    #[error("octree binary file has a truncated trailing record ({0} bytes left over)")]
    TruncatedRecord(usize),

    #[error("container error: {0}")]
    Container(#[from] hyperray_container::ContainerError),

    #[error("integrator error: {0}")]
    Integrator(#[from] hyperray_integrator::IntegratorError),

    #[error("cosmology error: {0}")]
    Cosmology(#[from] hyperray_cosmology::CosmologyError),

    #[error("unrecognised value {1:?} for key {0:?}")]
    BadEnumValue(String, String),
}
