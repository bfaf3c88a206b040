//! fraudtrain: Fraud Model Training Library
//!
//! A library for training a binary fraud classifier from a labelled CSV export,
//! selecting the best candidate by ROC-AUC and exporting it as an ONNX graph
//! plus a native serialized bundle.

pub mod cli;
pub mod export;
pub mod models;
pub mod pipeline;
pub mod report;
pub mod utils;
