//! Terminal feedback helpers

pub mod progress;
pub mod styling;
