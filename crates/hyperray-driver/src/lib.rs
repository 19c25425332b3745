//! Parameter file, cone binary I/O, and cross-rank reduction shared by the
//! `hyperray` binary. Kept as a library so the driver's input/output layer
//! can be exercised from integration tests without spawning the binary.

pub mod config;
pub mod error;
pub mod io;
pub mod reduce;
