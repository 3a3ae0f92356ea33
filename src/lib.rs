pub mod telemetry;
pub mod version;
