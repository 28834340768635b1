//! Priced blocks rasterized onto H3 cells.

use std::collections::BTreeSet;

use h3o::Resolution;
use serde::{Deserialize, Serialize};
use ub_spatial::hex::polyfill;

use crate::prices::PricedBlock;

/// Price attributes of one hex cell (`bp_hex_price.csv`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HexPrice {
    /// H3 cell index.
    pub h3_polyfill: String,
    /// Predicted log unit price of the covering block.
    pub pred_price: f64,
    /// Price group of the covering block.
    pub price_group: usize,
    /// `trunc(exp(pred_price))`.
    pub pred_real_price: i64,
}

/// Block attributes of one hex cell (`block_hex_price.csv`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockHexPrice {
    /// H3 cell index.
    pub h3_polyfill: String,
    /// Settlement name.
    #[serde(rename = "TNev")]
    pub tnev: String,
    /// Block number.
    pub szlok: String,
    /// District name.
    pub district: Option<String>,
    /// Predicted log unit price.
    pub pred_price: f64,
    /// Unit price.
    pub full_price: f64,
    /// Price group.
    pub price_group: usize,
    /// `trunc(exp(pred_price))`.
    pub pred_real_price: i64,
}

/// Fills every block polygon with H3 cells.
///
/// Multipolygons are split into their parts; parts too small to hold a
/// cell centre contribute nothing and are counted in the log.
#[must_use]
pub fn fill_blocks(blocks: &[PricedBlock], res: Resolution) -> Vec<BlockHexPrice> {
    let mut rows = Vec::new();
    let mut parts = 0_usize;
    let mut empty_parts = 0_usize;

    for block in blocks {
        for polygon in &block.geometry.0 {
            parts += 1;
            let cells = polyfill(polygon, res);
            if cells.is_empty() {
                empty_parts += 1;
                continue;
            }
            rows.extend(cells.into_iter().map(|cell| BlockHexPrice {
                h3_polyfill: cell.to_string(),
                tnev: block.tnev.clone(),
                szlok: block.szlok.clone(),
                district: block.district.clone(),
                pred_price: block.pred_price,
                full_price: block.full_price,
                price_group: block.price_group,
                pred_real_price: block.pred_real_price,
            }));
        }
    }

    if empty_parts > 0 {
        log::warn!("{empty_parts} of {parts} block polygons hold no hex cell centre and were dropped");
    }
    log::info!("Filled {} blocks with {} hex cells", blocks.len(), rows.len());
    rows
}

/// Reduces block hex rows to distinct hex price rows, first occurrence
/// first.
#[must_use]
pub fn hex_prices(rows: &[BlockHexPrice]) -> Vec<HexPrice> {
    let mut seen = BTreeSet::new();
    rows.iter()
        .filter(|row| {
            seen.insert((
                row.h3_polyfill.clone(),
                row.pred_price.to_bits(),
                row.price_group,
                row.pred_real_price,
            ))
        })
        .map(|row| HexPrice {
            h3_polyfill: row.h3_polyfill.clone(),
            pred_price: row.pred_price,
            price_group: row.price_group,
            pred_real_price: row.pred_real_price,
        })
        .collect()
}
