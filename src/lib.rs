//! trademo: web dashboard for browsing companies and running backtests
//! against a remote market-data backend.
//!
//! Hexagonal architecture: view-state and transformations in [`domain`],
//! port traits in [`ports`], concrete implementations in [`adapters`].

pub mod domain;
pub mod ports;
pub mod adapters;
pub mod settings;
pub mod cli;
