//! Report module - evaluation tables and the run summary

pub mod evaluation;
pub mod summary;

pub use evaluation::*;
pub use summary::*;
