// Public API - the runner facade plus the pieces the CLI consumes
pub mod error;
pub mod mutect2;
pub mod runner;
pub mod scatter;
pub mod vcf;

// Internal modules - organized by subsystem
mod config;
mod intervals;
mod telemetry;
