//! # twin-test
//!
//! Integration tests for TwinDB.
//!
//! This crate contains:
//! - A two-site cluster harness: a REMOTE site daemon on a real socket and
//!   LOCAL databases pointed at it
//! - End-to-end tests under `tests/`

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Two-site test cluster.
pub mod cluster;

pub use cluster::TwoSiteCluster;
