//! Third places annotated with location complexity and home block prices.

use ub_mobility::tables::ThirdRow;
use ub_price_grid::hexes::BlockHexPrice;
use ub_table::io::format_optional;
use ub_table::join::left_join;

use crate::location_hexes::LocationHex;

/// A third-place row with everything the figures need
/// (`third_places_figures.csv`).
#[derive(Debug, Clone, PartialEq)]
pub struct ThirdFigureRow {
    /// The mobility row.
    pub third: ThirdRow,
    /// Location of the third-place cell.
    pub location_third: Option<LocationHex>,
    /// Location of the home cell.
    pub location_home: Option<LocationHex>,
    /// Census block covering the home cell.
    pub home_block: Option<BlockHexPrice>,
}

/// Attaches the hex location complexity of the third-place cell and of the
/// home cell. Every third place is kept.
#[must_use]
pub fn third_places_with_locations(
    thirds: Vec<ThirdRow>,
    location_hexes: &[LocationHex],
) -> Vec<ThirdFigureRow> {
    let with_third = left_join(
        thirds,
        location_hexes,
        |t| Some(t.h3_third.clone()),
        |hex| hex.h3_part.clone(),
    )
    .log_mismatch("third places -> third-place location")
    .into_left_rows();

    left_join(
        with_third,
        location_hexes,
        |(t, _)| Some(t.h3_home.clone()),
        |hex| hex.h3_part.clone(),
    )
    .log_mismatch("third places -> home location")
    .into_left_rows()
    .into_iter()
    .map(|((third, location_third), location_home)| ThirdFigureRow {
        third,
        location_third,
        location_home,
        home_block: None,
    })
    .collect()
}

/// Attaches the census block attributes of each row's home cell.
#[must_use]
pub fn home_block_prices(rows: Vec<ThirdFigureRow>, blocks: &[BlockHexPrice]) -> Vec<ThirdFigureRow> {
    left_join(
        rows,
        blocks,
        |row| Some(row.third.h3_home.clone()),
        |block| block.h3_polyfill.clone(),
    )
    .log_mismatch("homes -> census blocks")
    .into_left_rows()
    .into_iter()
    .map(|(row, home_block)| ThirdFigureRow { home_block, ..row })
    .collect()
}

const THIRD_COLUMNS: [&str; 26] = [
    "device_id",
    "year_month",
    "place_label",
    "nr_visits",
    "nr_days",
    "mean_lon_third",
    "mean_lat_third",
    "std_lon_third",
    "std_lat_third",
    "mean_duration",
    "h3_third",
    "h3_polyfill_third",
    "pred_price_third",
    "price_group_third",
    "pred_real_price_third",
    "mean_lon_home",
    "mean_lat_home",
    "std_lon_home",
    "std_lat_home",
    "nr_stops",
    "h3_home",
    "h3_polyfill_home",
    "pred_price_home",
    "price_group_home",
    "pred_real_price_home",
    "distance",
];

const BLOCK_COLUMNS: [&str; 8] = [
    "h3_polyfill",
    "TNev",
    "szlok",
    "district",
    "pred_price",
    "full_price",
    "price_group",
    "pred_real_price",
];

fn third_fields(t: &ThirdRow) -> Vec<String> {
    vec![
        t.device_id.clone(),
        t.year_month.clone(),
        t.place_label.to_string(),
        t.nr_visits.to_string(),
        t.nr_days.to_string(),
        t.mean_lon_third.to_string(),
        t.mean_lat_third.to_string(),
        format_optional(t.std_lon_third),
        format_optional(t.std_lat_third),
        t.mean_duration.to_string(),
        t.h3_third.clone(),
        t.h3_polyfill_third.clone(),
        t.pred_price_third.to_string(),
        t.price_group_third.to_string(),
        t.pred_real_price_third.to_string(),
        t.mean_lon_home.to_string(),
        t.mean_lat_home.to_string(),
        t.std_lon_home.to_string(),
        t.std_lat_home.to_string(),
        t.nr_stops.to_string(),
        t.h3_home.clone(),
        t.h3_polyfill_home.clone(),
        t.pred_price_home.to_string(),
        t.price_group_home.to_string(),
        t.pred_real_price_home.to_string(),
        t.distance.to_string(),
    ]
}

fn block_fields(block: Option<&BlockHexPrice>) -> Vec<String> {
    let Some(b) = block else {
        return vec![String::new(); BLOCK_COLUMNS.len()];
    };
    vec![
        b.h3_polyfill.clone(),
        b.tnev.clone(),
        b.szlok.clone(),
        b.district.clone().unwrap_or_default(),
        b.pred_price.to_string(),
        b.full_price.to_string(),
        b.price_group.to_string(),
        b.pred_real_price.to_string(),
    ]
}

/// Header and rows of the third-place figure table.
///
/// Columns are the mobility row, the third-place location (`_third`), the
/// home location (`_home`) and the home block.
#[must_use]
pub fn third_records(rows: &[ThirdFigureRow]) -> (Vec<String>, Vec<Vec<String>>) {
    let mut headers: Vec<String> = THIRD_COLUMNS.iter().map(ToString::to_string).collect();
    headers.extend(LocationHex::columns("_third"));
    headers.extend(LocationHex::columns("_home"));
    headers.extend(BLOCK_COLUMNS.iter().map(ToString::to_string));

    let records = rows
        .iter()
        .map(|row| {
            let mut fields = third_fields(&row.third);
            fields.extend(LocationHex::fields(row.location_third.as_ref()));
            fields.extend(LocationHex::fields(row.location_home.as_ref()));
            fields.extend(block_fields(row.home_block.as_ref()));
            fields
        })
        .collect();

    (headers, records)
}
