/// Detail CSV reader.
pub mod detail;
/// CSV writers for the report and search tables.
pub mod export;
