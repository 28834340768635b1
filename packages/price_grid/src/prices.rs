//! Block-level price predictions and their join onto census blocks.

use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

use geo::MultiPolygon;
use serde::Deserialize;
use ub_config::{FillPolicy, PriceGridConfig};
use ub_table::join::left_join;
use ub_table::stats::{mean, quantile_bins};
use ub_table::{DataIntegrityWarning, TableError};

use crate::PriceGridError;
use crate::blocks::Block;

/// A prediction row as it appears in the file; numbers are still text.
#[derive(Debug, Deserialize)]
struct RawPrediction {
    #[serde(rename = "TNev")]
    tnev: String,
    #[serde(rename = "SZLOKID")]
    szlok_id: String,
    #[serde(rename = "mean_r_slope_pred")]
    pred_price: String,
}

/// The modelled log unit price of one block.
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    /// Settlement name.
    pub tnev: String,
    /// Block key (trailing digits of `SZLOKID`).
    pub szlok: String,
    /// Predicted log unit price.
    pub pred_price: f64,
    /// `exp(pred_price)`.
    pub full_price: f64,
}

/// A block with its price attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct PricedBlock {
    /// Settlement name.
    pub tnev: String,
    /// Block number.
    pub szlok: String,
    /// District name.
    pub district: Option<String>,
    /// Predicted log unit price (possibly filled).
    pub pred_price: f64,
    /// Unit price (possibly filled).
    pub full_price: f64,
    /// `trunc(exp(pred_price))`.
    pub pred_real_price: i64,
    /// Equal-frequency price group of `pred_real_price`.
    pub price_group: usize,
    /// Block outline.
    pub geometry: MultiPolygon<f64>,
}

/// Parses a number that may use a decimal comma.
#[must_use]
pub fn parse_decimal(raw: &str, decimal_comma: bool) -> Option<f64> {
    let raw = raw.trim();
    if decimal_comma {
        raw.replace(',', ".").parse().ok()
    } else {
        raw.parse().ok()
    }
}

/// The block key: the last `digits` digits of the integer part of `SZLOKID`.
#[must_use]
pub fn block_key(szlok_id: &str, decimal_comma: bool, digits: usize) -> Option<String> {
    let id = parse_decimal(szlok_id, decimal_comma)?;
    if !id.is_finite() {
        return None;
    }
    #[allow(clippy::cast_possible_truncation)]
    let id = (id.trunc() as i64).to_string();
    let start = id.len().saturating_sub(digits);
    Some(id[start..].to_string())
}

/// Loads the prediction file.
///
/// # Errors
///
/// Returns [`TableError::InputFormat`] if the file is missing, is not
/// delimited as configured, or holds a malformed number.
pub fn load_predictions(
    path: &Path,
    config: &PriceGridConfig,
) -> Result<Vec<Prediction>, PriceGridError> {
    let file = std::fs::File::open(path).map_err(|e| TableError::InputFormat {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    let predictions = read_predictions(file, config).map_err(|message| TableError::InputFormat {
        path: path.to_path_buf(),
        message,
    })?;
    log::info!("Read {} price predictions from {}", predictions.len(), path.display());
    Ok(predictions)
}

/// Parses predictions from a reader.
///
/// Rows with an empty prediction carry no price and are skipped.
///
/// # Errors
///
/// Returns a description of the first malformed row.
pub fn read_predictions<R: Read>(
    reader: R,
    config: &PriceGridConfig,
) -> Result<Vec<Prediction>, String> {
    let delimiter = u8::try_from(config.delimiter)
        .map_err(|_| format!("delimiter {:?} is not a single byte", config.delimiter))?;
    let rows: Vec<RawPrediction> =
        ub_table::io::read_csv_from(reader, delimiter).map_err(|e| e.to_string())?;

    let mut predictions = Vec::with_capacity(rows.len());
    let mut empty = 0_usize;
    for (line, row) in rows.into_iter().enumerate() {
        if row.pred_price.trim().is_empty() {
            empty += 1;
            continue;
        }
        let pred_price = parse_decimal(&row.pred_price, config.decimal_comma)
            .ok_or_else(|| format!("row {}: bad mean_r_slope_pred {:?}", line + 1, row.pred_price))?;
        let szlok = block_key(&row.szlok_id, config.decimal_comma, config.block_id_digits)
            .ok_or_else(|| format!("row {}: bad SZLOKID {:?}", line + 1, row.szlok_id))?;
        predictions.push(Prediction {
            tnev: row.tnev,
            szlok,
            pred_price,
            full_price: pred_price.exp(),
        });
    }

    if empty > 0 {
        log::warn!("{empty} prediction rows had no value and were skipped");
    }
    Ok(predictions)
}

/// Left-joins predictions onto blocks on (`TNev`, `szlok`) and resolves
/// blocks without a prediction according to `policy`.
///
/// With [`FillPolicy::GlobalMean`], missing `pred_price` and `full_price`
/// each get the mean of the matched values, reported as
/// [`DataIntegrityWarning::FillApplied`]. Exact duplicate rows are removed.
///
/// # Errors
///
/// Returns [`PriceGridError::NoPredictions`] if a fill is needed but no
/// block matched a prediction.
pub fn attach_predictions(
    blocks: Vec<Block>,
    predictions: &[Prediction],
    policy: FillPolicy,
) -> Result<(Vec<PricedBlock>, Vec<DataIntegrityWarning>), PriceGridError> {
    let rows = left_join(
        blocks,
        predictions,
        |block| Some((block.tnev.clone(), block.szlok.clone())),
        |p| (p.tnev.clone(), p.szlok.clone()),
    )
    .log_mismatch("blocks -> price predictions")
    .into_left_rows();

    let matched: Vec<&Prediction> = rows.iter().filter_map(|(_, p)| p.as_ref()).collect();
    let unmatched = rows.len() - matched.len();
    let mut warnings = Vec::new();

    let fill = match policy {
        FillPolicy::Drop => None,
        FillPolicy::GlobalMean if unmatched == 0 => None,
        FillPolicy::GlobalMean => {
            let (Some(pred), Some(full)) = (
                mean(matched.iter().map(|p| p.pred_price)),
                mean(matched.iter().map(|p| p.full_price)),
            ) else {
                return Err(PriceGridError::NoPredictions);
            };
            for (column, value) in [("pred_price", pred), ("full_price", full)] {
                warnings.push(
                    DataIntegrityWarning::FillApplied {
                        column: column.to_string(),
                        rows: unmatched,
                        value,
                    }
                    .emit(),
                );
            }
            Some((pred, full))
        }
    };

    let priced: Vec<PricedBlock> = rows
        .into_iter()
        .filter_map(|(block, prediction)| {
            let (pred_price, full_price) = prediction
                .map(|p| (p.pred_price, p.full_price))
                .or(fill)?;
            Some(PricedBlock {
                tnev: block.tnev,
                szlok: block.szlok,
                district: block.district,
                pred_price,
                full_price,
                pred_real_price: real_price(pred_price),
                price_group: 0,
                geometry: block.geometry,
            })
        })
        .collect();

    if policy == FillPolicy::Drop && unmatched > 0 {
        log::warn!("Dropped {unmatched} blocks without a price prediction");
    }

    Ok((drop_duplicates(priced), warnings))
}

#[allow(clippy::cast_possible_truncation)]
fn real_price(pred_price: f64) -> i64 {
    pred_price.exp().trunc() as i64
}

fn drop_duplicates(blocks: Vec<PricedBlock>) -> Vec<PricedBlock> {
    let mut seen: BTreeMap<(String, String, Option<String>, u64, u64), Vec<usize>> =
        BTreeMap::new();
    let mut kept: Vec<PricedBlock> = Vec::with_capacity(blocks.len());

    for block in blocks {
        let key = (
            block.tnev.clone(),
            block.szlok.clone(),
            block.district.clone(),
            block.pred_price.to_bits(),
            block.full_price.to_bits(),
        );
        let positions = seen.entry(key).or_default();
        if positions.iter().any(|&i| kept[i].geometry == block.geometry) {
            continue;
        }
        positions.push(kept.len());
        kept.push(block);
    }
    kept
}

/// Sets `price_group` to the equal-frequency bin of `pred_real_price`.
///
/// # Errors
///
/// Returns a [`TableError`] if the prices cannot be split into `bins`
/// distinct bins.
pub fn assign_price_groups(blocks: &mut [PricedBlock], bins: usize) -> Result<(), TableError> {
    #[allow(clippy::cast_precision_loss)]
    let prices: Vec<f64> = blocks.iter().map(|b| b.pred_real_price as f64).collect();
    let groups = quantile_bins(&prices, bins)?;
    for (block, group) in blocks.iter_mut().zip(groups) {
        block.price_group = group;
    }
    Ok(())
}
