//! Command-line interface module.

mod args;
pub mod build;
pub mod hook;
pub mod serve;

pub use args::{Cli, Commands};
