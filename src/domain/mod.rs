//! Dashboard view-state types and the pure transformations over them.

pub mod company;
pub mod price;
pub mod fundamental;
pub mod strategy;
pub mod backtest;
pub mod news;
pub mod chart;
pub mod export;
pub mod error;
