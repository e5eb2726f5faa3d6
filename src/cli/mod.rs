//! Command-line interface: `serve`, `migrate` and `calibrate`.

pub mod args;

pub use args::{Cli, Commands};
