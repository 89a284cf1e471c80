//! Command implementations for the mlb-pitchers CLI

pub mod common;
pub mod query;
pub mod update;

#[cfg(test)]
mod tests;

pub use common::CommandContext;
