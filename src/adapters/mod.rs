//! Concrete adapter implementations for ports.

pub mod chart_svg;
pub mod file_config_adapter;
pub mod http_api_adapter;
pub mod web;
