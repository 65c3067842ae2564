//! tunekit-classifiers: hyperparameter-searched classifiers fed by batched loaders.
//!
//! This crate provides two classifier wrappers (k-NN and SVM) that share one
//! `init → train → eval` lifecycle. Training materializes batched training and
//! validation data, pools it, and runs a cross-validated hyperparameter search
//! whose fit/predict calls are delegated to the `linfa` family of crates.
//!
//! Supporting modules cover configuration, CSV loading, synthetic data and
//! HTML reporting of search results.
pub mod config;
pub mod data_handling;
pub mod error;
pub mod io;
pub mod metrics;
pub mod models;
pub mod report;
pub mod search;
pub mod synthetic;

pub use error::{ClassifierError, Result};
