//! Command line plumbing for running tunekit classifier experiments.
pub mod classifiers;
