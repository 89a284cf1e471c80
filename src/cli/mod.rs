//! CLI argument definitions and parsing.

pub mod args;
pub mod types;

#[cfg(test)]
mod tests;

pub use args::{Commands, MlbPitchers, RangeArgs};
