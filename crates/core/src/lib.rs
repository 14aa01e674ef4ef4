//! Core library: case-file triage, PDF truncation, and near-duplicate resolution.

pub mod config;
pub mod error;
pub mod extractor;
pub mod fs_apply;
pub mod indexer;
pub mod models;
pub mod paths;
pub mod pipeline;
pub mod resolver;
pub mod rules;
pub mod runlog;
pub mod scanner;
pub mod shingle;
pub mod triage;
pub mod truncator;

pub use error::{Error, Result};
