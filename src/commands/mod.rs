//! CLI command implementations.

pub mod calibrate;
pub mod migrate;
pub mod serve;
