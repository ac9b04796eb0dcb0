//! Core data types, validation and summary statistics for TimeScale
//!
//! Everything here is pure: no I/O and no clock reads. Callers pass the
//! current time into the validator.

pub mod filter;
pub mod summary;
pub mod types;
pub mod validate;

pub use filter::*;
pub use summary::*;
pub use types::*;
pub use validate::*;
