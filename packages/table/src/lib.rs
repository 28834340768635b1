#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Table plumbing shared by every stage of the ub-explorer pipeline.
//!
//! Stages exchange flat CSV files and join strongly-typed rows on explicit
//! keys. This crate holds the pieces they all need: reading and writing
//! CSV tables ([`io`]), keyed left joins that keep the unmatched partition
//! visible ([`join`]), the handful of statistics the pipeline uses
//! ([`stats`]), non-fatal [`DataIntegrityWarning`]s, and the
//! [`progress::ProgressCallback`] trait for long-running loops.

pub mod io;
pub mod join;
pub mod progress;
pub mod stats;
mod warnings;

use std::path::PathBuf;

use thiserror::Error;

pub use warnings::DataIntegrityWarning;

/// Errors raised while reading, writing or binning tables.
#[derive(Debug, Error)]
pub enum TableError {
    /// An input file is missing or cannot be parsed. Fatal for the stage.
    #[error("Malformed input {}: {message}", path.display())]
    InputFormat {
        /// The offending file.
        path: PathBuf,
        /// What went wrong.
        message: String,
    },

    /// Writing an output file failed.
    #[error("Failed to write {}: {source}", path.display())]
    Write {
        /// The output file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// CSV serialization failed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Quantile binning produced repeated edges, so bins are ambiguous.
    #[error("Quantile bin edges are not unique: {edges:?}")]
    DuplicateBinEdges {
        /// The computed edges.
        edges: Vec<f64>,
    },

    /// Quantile binning was asked for an impossible number of bins.
    #[error("Cannot split {len} values into {bins} quantile bins")]
    InvalidBinning {
        /// Number of values.
        len: usize,
        /// Requested number of bins.
        bins: usize,
    },
}
