//! Pipeline module - load, split, scale, train and select

pub mod config;
pub mod error;
pub mod loader;
pub mod metrics;
pub mod scaler;
pub mod split;
pub mod trainer;

pub use config::*;
pub use error::TrainingError;
pub use loader::*;
pub use metrics::*;
pub use scaler::StandardScaler;
pub use split::*;
pub use trainer::*;
