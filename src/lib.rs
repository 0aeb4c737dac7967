//! Home PV + battery sizing from hourly production and consumption history.

pub mod config;
pub mod io;
pub mod readings;
pub mod render;
/// Energy-flow simulation, indicators and scenario search.
pub mod sim;
/// Hourly reading providers.
pub mod sources;
pub mod tables;
