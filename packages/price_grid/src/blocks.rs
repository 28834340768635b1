//! Census blocks and the districts they lie within.

use std::path::Path;

use geo::MultiPolygon;
use ub_spatial::BoundaryIndex;
use ub_spatial::features::{Feature, read_features};

use crate::PriceGridError;

/// A census block (számlálókörzet).
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    /// Settlement name (`TNev`).
    pub tnev: String,
    /// Block number within the settlement (`szlok`).
    pub szlok: String,
    /// Name of the district containing the block.
    pub district: Option<String>,
    /// Block outline.
    pub geometry: MultiPolygon<f64>,
}

/// A named district polygon.
#[derive(Debug, Clone, PartialEq)]
pub struct District {
    /// District name.
    pub name: String,
    /// District outline.
    pub geometry: MultiPolygon<f64>,
}

/// Loads census blocks; features missing `TNev`, `szlok` or a polygon are
/// skipped.
///
/// # Errors
///
/// Returns an error if the file cannot be read or is not `GeoJSON`.
pub fn load_blocks(path: &Path) -> Result<Vec<Block>, PriceGridError> {
    let features = read_features(path)?;
    let total = features.len();
    let blocks: Vec<Block> = features.into_iter().filter_map(block_from_feature).collect();
    if blocks.len() < total {
        log::warn!(
            "Skipped {} of {total} block features without TNev, szlok or polygon geometry",
            total - blocks.len()
        );
    }
    Ok(blocks)
}

fn block_from_feature(feature: Feature) -> Option<Block> {
    Some(Block {
        tnev: feature.property("TNev")?.to_string(),
        szlok: feature.property("szlok")?.to_string(),
        district: None,
        geometry: feature.multi_polygon()?,
    })
}

/// Loads district polygons named by their `name` property.
///
/// # Errors
///
/// Returns an error if the file cannot be read or is not `GeoJSON`.
pub fn load_districts(path: &Path) -> Result<Vec<District>, PriceGridError> {
    let districts: Vec<District> = read_features(path)?
        .into_iter()
        .filter_map(|feature| {
            Some(District {
                name: feature.property("name")?.to_string(),
                geometry: feature.multi_polygon()?,
            })
        })
        .collect();
    log::info!("Loaded {} districts", districts.len());
    Ok(districts)
}

/// Keeps the blocks lying within a district and records its name.
#[must_use]
pub fn within_districts(blocks: Vec<Block>, districts: &[District]) -> Vec<Block> {
    let index = BoundaryIndex::new(districts.iter().map(|d| d.geometry.clone()));
    let total = blocks.len();

    let kept: Vec<Block> = blocks
        .into_iter()
        .filter_map(|mut block| {
            let district = index.containing(&block.geometry)?;
            block.district = Some(districts[district].name.clone());
            Some(block)
        })
        .collect();

    if kept.len() < total {
        log::warn!(
            "Dropped {} of {total} blocks outside every district",
            total - kept.len()
        );
    }
    kept
}
