//! Column statistics used across the pipeline.
//!
//! Missing values are `None` (or NaN for raw float columns) and are skipped
//! by every aggregate, matching the usual dataframe conventions.

use crate::{DataIntegrityWarning, TableError};

/// Arithmetic mean of the finite values, `None` when there are none.
#[must_use]
pub fn mean<I: IntoIterator<Item = f64>>(values: I) -> Option<f64> {
    let (sum, count) = values
        .into_iter()
        .filter(|v| v.is_finite())
        .fold((0.0, 0_usize), |(sum, count), v| (sum + v, count + 1));

    #[allow(clippy::cast_precision_loss)]
    let mean = (count > 0).then(|| sum / count as f64);
    mean
}

/// Sample standard deviation (one delta degree of freedom).
///
/// Undefined, hence `None`, for fewer than two values.
#[must_use]
pub fn sample_std(values: &[f64]) -> Option<f64> {
    spread(values, 1)
}

/// Population standard deviation (zero delta degrees of freedom).
#[must_use]
pub fn population_std(values: &[f64]) -> Option<f64> {
    spread(values, 0)
}

fn spread(values: &[f64], ddof: usize) -> Option<f64> {
    if values.len() <= ddof {
        return None;
    }
    let m = mean(values.iter().copied())?;
    let squares: f64 = values.iter().map(|v| (v - m).powi(2)).sum();

    #[allow(clippy::cast_precision_loss)]
    let denominator = (values.len() - ddof) as f64;
    Some((squares / denominator).sqrt())
}

/// Min-max normalizes a column to `[0, 1]`.
///
/// Missing inputs stay missing. When the column has no values or its
/// maximum equals its minimum the normalization is undefined: every output
/// is `None` and a [`DataIntegrityWarning::DegenerateNormalization`] is
/// emitted.
#[must_use]
pub fn min_max_normalize(
    values: &[Option<f64>],
    column: &str,
) -> (Vec<Option<f64>>, Option<DataIntegrityWarning>) {
    let defined = values.iter().flatten().copied().filter(|v| !v.is_nan());
    let bounds = defined.fold(None, |acc: Option<(f64, f64)>, v| match acc {
        None => Some((v, v)),
        Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
    });

    match bounds {
        Some((lo, hi)) if hi > lo => {
            let normalized = values
                .iter()
                .map(|v| v.filter(|v| !v.is_nan()).map(|v| (v - lo) / (hi - lo)))
                .collect();
            (normalized, None)
        }
        _ => {
            let warning = DataIntegrityWarning::DegenerateNormalization {
                column: column.to_string(),
            }
            .emit();
            (vec![None; values.len()], Some(warning))
        }
    }
}

/// Linear-interpolated quantile of already sorted values.
fn quantile_sorted(sorted: &[f64], q: f64) -> f64 {
    #[allow(clippy::cast_precision_loss)]
    let pos = q * (sorted.len() - 1) as f64;

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let lo = pos.floor() as usize;
    let hi = (lo + 1).min(sorted.len() - 1);

    #[allow(clippy::cast_precision_loss)]
    let frac = pos - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

/// Equal-frequency binning: assigns each value the index (`0..bins`) of
/// its quantile bin.
///
/// Bin edges are linear-interpolated quantiles; the first bin is closed on
/// both sides and every other bin is `(lower, upper]`.
///
/// # Errors
///
/// Returns [`TableError::InvalidBinning`] for an empty column or zero
/// bins, and [`TableError::DuplicateBinEdges`] when ties make two edges
/// equal.
pub fn quantile_bins(values: &[f64], bins: usize) -> Result<Vec<usize>, TableError> {
    if values.is_empty() || bins == 0 || values.iter().any(|v| v.is_nan()) {
        return Err(TableError::InvalidBinning {
            len: values.len(),
            bins,
        });
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    #[allow(clippy::cast_precision_loss)]
    let edges: Vec<f64> = (0..=bins)
        .map(|i| quantile_sorted(&sorted, i as f64 / bins as f64))
        .collect();

    if edges.windows(2).any(|w| w[0] >= w[1]) {
        return Err(TableError::DuplicateBinEdges { edges });
    }

    Ok(values
        .iter()
        .map(|&v| {
            edges[1..]
                .iter()
                .position(|&upper| v <= upper)
                .unwrap_or(bins - 1)
        })
        .collect())
}
