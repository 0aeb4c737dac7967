/// Battery template and off-peak charging rules.
pub mod battery;
pub mod daily;
/// Hourly energy-flow simulator.
pub mod flow;
/// Scenario search over PV factors and battery sizes.
pub mod search;
pub mod stats;
pub mod types;
