//! Economic-complexity indices over a location × category count matrix.
//!
//! For one period the sparse incidence cells are expanded into a dense,
//! zero-filled count matrix `X`. From it:
//!
//! * `RCA(l, c) = (X[l,c] / X[l,·]) / (X[·,c] / X[·,·])`
//! * presence `M[l, c] = RCA(l, c) >= 1`
//! * diversity `k_l = Σ_c M[l, c]`, ubiquity `k_c = Σ_l M[l, c]`
//! * ECI / PCI by the eigenvector method: `kp` is the eigenvector of the
//!   second-largest eigenvalue of `U⁻¹ Mᵀ D⁻¹ M` (`D`, `U` the diagonal
//!   diversity and ubiquity matrices), `kc = D⁻¹ M kp`. The sign is chosen
//!   so that `kc` correlates positively with diversity, and both are
//!   standardized with the mean and population standard deviation of `kc`.
//!
//! The eigenproblem is solved on the symmetric matrix
//! `U^{-1/2} Mᵀ D⁻¹ M U^{-1/2}`, which has the same eigenvalues.

use std::collections::BTreeMap;

use nalgebra::{DMatrix, DVector};
use ub_complexity_models::{ComplexityRecord, IncidenceCell};
use ub_table::DataIntegrityWarning;
use ub_table::stats::{mean, population_std};

/// Spread below which standardizing ECI is meaningless.
const MIN_ECI_SPREAD: f64 = 1e-12;

/// Engine output for one or more periods.
#[derive(Debug, Clone, Default)]
pub struct ComplexityRun {
    /// One record per input cell, periods in input order.
    pub records: Vec<ComplexityRecord>,
    /// Periods whose ECI/PCI were undefined.
    pub warnings: Vec<DataIntegrityWarning>,
}

/// Computes RCA, presence, diversity, ubiquity, ECI and PCI for one period.
#[must_use]
pub fn compute_period(period: &str, cells: &[IncidenceCell]) -> ComplexityRun {
    let matrix = CountMatrix::from_cells(cells);
    let (rca, presence) = matrix.rca_and_presence();

    let diversity: Vec<f64> = (0..presence.nrows()).map(|l| presence.row(l).sum()).collect();
    let ubiquity: Vec<f64> = (0..presence.ncols())
        .map(|c| presence.column(c).sum())
        .collect();

    let mut warnings = Vec::new();
    let (eci, pci) = match eigen_indices(&presence, &diversity, &ubiquity) {
        Ok(indices) => indices,
        Err(reason) => {
            warnings.push(
                DataIntegrityWarning::UndefinedComplexity {
                    period: period.to_string(),
                    reason,
                }
                .emit(),
            );
            (
                vec![None; matrix.locations.len()],
                vec![None; matrix.categories.len()],
            )
        }
    };

    let records = cells
        .iter()
        .map(|cell| {
            let l = matrix.location_index[cell.location_name.as_str()];
            let c = matrix.category_index[cell.category.as_str()];
            ComplexityRecord {
                period: period.to_string(),
                location_name: cell.location_name.clone(),
                category: cell.category.clone(),
                poi_count: cell.poi_count,
                rca: rca[(l, c)],
                presence: presence[(l, c)] > 0.0,
                diversity: as_count(diversity[l]),
                ubiquity: as_count(ubiquity[c]),
                eci: eci[l],
                pci: pci[c],
            }
        })
        .collect();

    log::info!(
        "Computed complexity for period {period}: {} locations, {} categories",
        matrix.locations.len(),
        matrix.categories.len()
    );

    ComplexityRun { records, warnings }
}

/// Runs [`compute_period`] for each period and concatenates the results in
/// the given order.
#[must_use]
pub fn compute_panel<'a, I>(panel: I) -> ComplexityRun
where
    I: IntoIterator<Item = (&'a str, &'a [IncidenceCell])>,
{
    panel
        .into_iter()
        .fold(ComplexityRun::default(), |mut run, (period, cells)| {
            let period_run = compute_period(period, cells);
            run.records.extend(period_run.records);
            run.warnings.extend(period_run.warnings);
            run
        })
}

/// Dense, zero-filled count matrix with its row and column labels.
struct CountMatrix<'a> {
    locations: Vec<&'a str>,
    categories: Vec<&'a str>,
    location_index: BTreeMap<&'a str, usize>,
    category_index: BTreeMap<&'a str, usize>,
    counts: DMatrix<f64>,
}

impl<'a> CountMatrix<'a> {
    #[allow(clippy::cast_precision_loss)]
    fn from_cells(cells: &'a [IncidenceCell]) -> Self {
        let location_index = label_index(cells.iter().map(|c| c.location_name.as_str()));
        let category_index = label_index(cells.iter().map(|c| c.category.as_str()));

        let mut counts = DMatrix::zeros(location_index.len(), category_index.len());
        for cell in cells {
            let l = location_index[cell.location_name.as_str()];
            let c = category_index[cell.category.as_str()];
            counts[(l, c)] += cell.poi_count as f64;
        }

        Self {
            locations: location_index.keys().copied().collect(),
            categories: category_index.keys().copied().collect(),
            location_index,
            category_index,
            counts,
        }
    }

    /// RCA matrix and its binarized presence matrix. A zero total makes
    /// the ratio NaN, which is never present.
    fn rca_and_presence(&self) -> (DMatrix<f64>, DMatrix<f64>) {
        let x = &self.counts;
        let row_totals: Vec<f64> = (0..x.nrows()).map(|l| x.row(l).sum()).collect();
        let col_totals: Vec<f64> = (0..x.ncols()).map(|c| x.column(c).sum()).collect();
        let total: f64 = row_totals.iter().sum();

        let rca = DMatrix::from_fn(x.nrows(), x.ncols(), |l, c| {
            if row_totals[l] == 0.0 || col_totals[c] == 0.0 || total == 0.0 {
                f64::NAN
            } else {
                (x[(l, c)] / row_totals[l]) / (col_totals[c] / total)
            }
        });
        let presence = rca.map(|r| if r >= 1.0 { 1.0 } else { 0.0 });

        (rca, presence)
    }
}

fn label_index<'a>(labels: impl Iterator<Item = &'a str>) -> BTreeMap<&'a str, usize> {
    let mut index: BTreeMap<&str, usize> = labels.map(|label| (label, 0)).collect();
    for (i, position) in index.values_mut().enumerate() {
        *position = i;
    }
    index
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn as_count(value: f64) -> u32 {
    value as u32
}

type Indices = (Vec<Option<f64>>, Vec<Option<f64>>);

/// ECI per location and PCI per category, `None` outside the connected
/// support (zero diversity or zero ubiquity).
#[allow(clippy::many_single_char_names)]
fn eigen_indices(
    presence: &DMatrix<f64>,
    diversity: &[f64],
    ubiquity: &[f64],
) -> Result<Indices, String> {
    let locs: Vec<usize> = (0..diversity.len()).filter(|&l| diversity[l] > 0.0).collect();
    let cats: Vec<usize> = (0..ubiquity.len()).filter(|&c| ubiquity[c] > 0.0).collect();

    if locs.len() < 2 || cats.len() < 2 {
        return Err(format!(
            "need at least two locations and two categories with a comparative advantage, \
             got {} and {}",
            locs.len(),
            cats.len()
        ));
    }

    let m = DMatrix::from_fn(locs.len(), cats.len(), |i, j| presence[(locs[i], cats[j])]);
    let k_loc = DVector::from_iterator(locs.len(), locs.iter().map(|&l| diversity[l]));
    let k_cat = DVector::from_iterator(cats.len(), cats.iter().map(|&c| ubiquity[c]));

    let d_inv = DMatrix::from_diagonal(&k_loc.map(|k| 1.0 / k));
    let u_inv_sqrt = k_cat.map(|k| 1.0 / k.sqrt());

    let cooccurrence = m.transpose() * &d_inv * &m;
    let symmetric = DMatrix::from_fn(cats.len(), cats.len(), |a, b| {
        u_inv_sqrt[a] * cooccurrence[(a, b)] * u_inv_sqrt[b]
    });

    let eigen = symmetric.symmetric_eigen();
    let mut order: Vec<usize> = (0..eigen.eigenvalues.len()).collect();
    order.sort_by(|&a, &b| eigen.eigenvalues[b].total_cmp(&eigen.eigenvalues[a]));
    let second = eigen.eigenvectors.column(order[1]);

    let kp = DVector::from_fn(cats.len(), |j, _| second[j] * u_inv_sqrt[j]);
    let kc = &d_inv * &m * &kp;

    let sign = if correlation(k_loc.as_slice(), kc.as_slice()).is_some_and(|r| r < 0.0) {
        -1.0
    } else {
        1.0
    };
    let eci_raw: Vec<f64> = kc.iter().map(|v| sign * v).collect();
    let pci_raw: Vec<f64> = kp.iter().map(|v| sign * v).collect();

    let center = mean(eci_raw.iter().copied()).unwrap_or(0.0);
    let spread = population_std(&eci_raw).unwrap_or(0.0);
    if !spread.is_finite() || spread < MIN_ECI_SPREAD {
        return Err("ECI has no spread across locations".to_string());
    }

    let mut eci = vec![None; diversity.len()];
    for (i, &l) in locs.iter().enumerate() {
        eci[l] = Some((eci_raw[i] - center) / spread);
    }
    let mut pci = vec![None; ubiquity.len()];
    for (j, &c) in cats.iter().enumerate() {
        pci[c] = Some((pci_raw[j] - center) / spread);
    }

    Ok((eci, pci))
}

/// Pearson correlation, `None` when either side is constant.
fn correlation(a: &[f64], b: &[f64]) -> Option<f64> {
    let mean_a = mean(a.iter().copied())?;
    let mean_b = mean(b.iter().copied())?;
    let (cov, var_a, var_b) = a.iter().zip(b).fold((0.0, 0.0, 0.0), |(cov, va, vb), (x, y)| {
        let (dx, dy) = (x - mean_a, y - mean_b);
        (cov + dx * dy, va + dx * dx, vb + dy * dy)
    });
    (var_a > 0.0 && var_b > 0.0).then(|| cov / (var_a * var_b).sqrt())
}
