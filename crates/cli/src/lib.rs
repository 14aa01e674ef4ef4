//! Public library modules for the CLI crate
pub mod confirm;
pub mod report;
