//! Non-fatal data-integrity conditions.
//!
//! The pipeline narrows data silently by design (threshold filtering,
//! left joins, fill policies). Each narrowing that loses or invents
//! information is surfaced as a [`DataIntegrityWarning`] so that runs
//! stay debuggable without aborting.

use std::fmt;

/// A non-fatal condition observed while transforming a table.
#[derive(Debug, Clone, PartialEq)]
pub enum DataIntegrityWarning {
    /// A location vanished entirely from the incidence table.
    LocationDropped {
        /// Location name.
        location: String,
    },
    /// A category vanished entirely from the incidence table.
    CategoryDropped {
        /// Category label.
        category: String,
    },
    /// Min-max normalization had a zero-width range (or no values).
    DegenerateNormalization {
        /// Column being normalized.
        column: String,
    },
    /// ECI/PCI could not be computed for a period.
    UndefinedComplexity {
        /// Period label.
        period: String,
        /// Why the eigenproblem was skipped.
        reason: String,
    },
    /// Missing values were replaced by a fill policy.
    FillApplied {
        /// Column that was filled.
        column: String,
        /// Number of filled rows.
        rows: usize,
        /// Fill value.
        value: f64,
    },
}

impl DataIntegrityWarning {
    /// Logs the warning and hands it back so callers can also collect it.
    #[must_use]
    pub fn emit(self) -> Self {
        log::warn!("DataIntegrityWarning: {self}");
        self
    }
}

impl fmt::Display for DataIntegrityWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LocationDropped { location } => {
                write!(f, "location '{location}' dropped by incidence thresholds")
            }
            Self::CategoryDropped { category } => {
                write!(f, "category '{category}' dropped by incidence thresholds")
            }
            Self::DegenerateNormalization { column } => {
                write!(f, "cannot min-max normalize '{column}': max equals min")
            }
            Self::UndefinedComplexity { period, reason } => {
                write!(f, "complexity undefined for period {period}: {reason}")
            }
            Self::FillApplied {
                column,
                rows,
                value,
            } => write!(f, "filled {rows} missing '{column}' values with {value}"),
        }
    }
}
