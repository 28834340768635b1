//! Priced home and third-place tables.

use serde::{Deserialize, Serialize};
use ub_price_grid::hexes::HexPrice;
use ub_spatial::haversine_km;
use ub_table::join::left_join;

use crate::places::{AnchorPlace, ThirdPlace};

/// A monthly home with the price attributes of its hex cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HomeRow {
    /// Device identifier.
    pub device_id: String,
    /// Month.
    pub year_month: String,
    /// Mean home longitude.
    pub mean_lon: f64,
    /// Mean home latitude.
    pub mean_lat: f64,
    /// Sample std of home longitudes.
    pub std_lon: f64,
    /// Sample std of home latitudes.
    pub std_lat: f64,
    /// Number of home stops.
    pub nr_stops: usize,
    /// H3 cell of the home.
    pub h3: String,
    /// Matching hex of the price grid.
    pub h3_polyfill: String,
    /// Predicted log unit price.
    pub pred_price: f64,
    /// Price group.
    pub price_group: usize,
    /// Unit price.
    pub pred_real_price: i64,
}

/// A third place joined with its price and the device's home of the month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThirdRow {
    /// Device identifier.
    pub device_id: String,
    /// Month.
    pub year_month: String,
    /// Place cluster label.
    pub place_label: i64,
    /// Number of stops at the place.
    pub nr_visits: usize,
    /// Distinct days with a stop at the place.
    pub nr_days: usize,
    /// Mean longitude of the place's stops.
    pub mean_lon_third: f64,
    /// Mean latitude of the place's stops.
    pub mean_lat_third: f64,
    /// Sample std of the place's longitudes; `None` for a single stop.
    pub std_lon_third: Option<f64>,
    /// Sample std of the place's latitudes; `None` for a single stop.
    pub std_lat_third: Option<f64>,
    /// Mean stop duration at the place.
    pub mean_duration: f64,
    /// H3 cell of the place.
    pub h3_third: String,
    /// Matching hex of the price grid for the place.
    pub h3_polyfill_third: String,
    /// Predicted log unit price at the place.
    pub pred_price_third: f64,
    /// Price group at the place.
    pub price_group_third: usize,
    /// Unit price at the place.
    pub pred_real_price_third: i64,
    /// Mean home longitude.
    pub mean_lon_home: f64,
    /// Mean home latitude.
    pub mean_lat_home: f64,
    /// Sample std of home longitudes.
    pub std_lon_home: f64,
    /// Sample std of home latitudes.
    pub std_lat_home: f64,
    /// Number of home stops.
    pub nr_stops: usize,
    /// H3 cell of the home.
    pub h3_home: String,
    /// Matching hex of the price grid for the home.
    pub h3_polyfill_home: String,
    /// Predicted log unit price at the home.
    pub pred_price_home: f64,
    /// Price group at the home.
    pub price_group_home: usize,
    /// Unit price at the home.
    pub pred_real_price_home: i64,
    /// Great-circle distance from home to the place, in kilometres.
    pub distance: f64,
}

/// Attaches hex prices to homes; homes in unpriced cells are dropped.
#[must_use]
pub fn price_homes(homes: Vec<AnchorPlace>, prices: &[HexPrice]) -> Vec<HomeRow> {
    left_join(homes, prices, |h| Some(h.h3.clone()), |p| p.h3_polyfill.clone())
        .log_mismatch("homes -> hex prices")
        .into_matched()
        .into_iter()
        .map(|(home, price)| HomeRow {
            device_id: home.device_id,
            year_month: home.year_month,
            mean_lon: home.mean_lon,
            mean_lat: home.mean_lat,
            std_lon: home.std_lon,
            std_lat: home.std_lat,
            nr_stops: home.nr_stops,
            h3: home.h3,
            h3_polyfill: price.h3_polyfill,
            pred_price: price.pred_price,
            price_group: price.price_group,
            pred_real_price: price.pred_real_price,
        })
        .collect()
}

/// Attaches hex prices and the device's priced home to third places.
///
/// Third places in unpriced cells, and those of devices without a priced
/// home in the same month, are dropped.
#[must_use]
pub fn price_third_places(thirds: Vec<ThirdPlace>, prices: &[HexPrice], homes: &[HomeRow]) -> Vec<ThirdRow> {
    let priced = left_join(thirds, prices, |t| Some(t.h3.clone()), |p| p.h3_polyfill.clone())
        .log_mismatch("third places -> hex prices")
        .into_matched();

    left_join(
        priced,
        homes,
        |(third, _)| Some((third.device_id.clone(), third.year_month.clone())),
        |home| (home.device_id.clone(), home.year_month.clone()),
    )
    .log_mismatch("third places -> homes of the month")
    .into_matched()
    .into_iter()
    .map(|((third, price), home)| {
        let distance = haversine_km(
            (home.mean_lon, home.mean_lat),
            (third.mean_lon, third.mean_lat),
        );
        ThirdRow {
            device_id: third.device_id,
            year_month: third.year_month,
            place_label: third.place_label,
            nr_visits: third.nr_visits,
            nr_days: third.nr_days,
            mean_lon_third: third.mean_lon,
            mean_lat_third: third.mean_lat,
            std_lon_third: third.std_lon,
            std_lat_third: third.std_lat,
            mean_duration: third.mean_duration,
            h3_third: third.h3,
            h3_polyfill_third: price.h3_polyfill,
            pred_price_third: price.pred_price,
            price_group_third: price.price_group,
            pred_real_price_third: price.pred_real_price,
            mean_lon_home: home.mean_lon,
            mean_lat_home: home.mean_lat,
            std_lon_home: home.std_lon,
            std_lat_home: home.std_lat,
            nr_stops: home.nr_stops,
            h3_home: home.h3,
            h3_polyfill_home: home.h3_polyfill,
            pred_price_home: home.pred_price,
            price_group_home: home.price_group,
            pred_real_price_home: home.pred_real_price,
            distance,
        }
    })
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::places::tests::{home_stops, res, rules, stop};
    use crate::places::{PlaceKind, place_of_the_month, third_places_table};
    use ub_spatial::hex::point_to_cell;

    fn price_for(lon: f64, lat: f64, group: usize) -> HexPrice {
        HexPrice {
            h3_polyfill: point_to_cell(lon, lat, res()).unwrap().to_string(),
            pred_price: 7.0,
            price_group: group,
            pred_real_price: 1096,
        }
    }

    fn homes() -> Vec<AnchorPlace> {
        let mut stops = home_stops("d1", 19.05, 47.5);
        stops.extend(home_stops("d2", 19.30, 47.3));
        place_of_the_month(&stops, PlaceKind::Home, rules(), res()).unwrap()
    }

    #[test]
    fn unpriced_homes_are_dropped() {
        let homes = homes();
        assert_eq!(homes.len(), 2);
        let price = price_for(homes[0].mean_lon, homes[0].mean_lat, 4);

        let priced = price_homes(homes, &[price]);
        assert_eq!(priced.len(), 1);
        assert_eq!(priced[0].device_id, "d1");
        assert_eq!(priced[0].price_group, 4);
        assert_eq!(priced[0].h3, priced[0].h3_polyfill);
    }

    #[test]
    fn third_places_get_home_and_distance() {
        let homes = homes();
        let mut prices = vec![price_for(homes[0].mean_lon, homes[0].mean_lat, 4)];
        let priced_homes = price_homes(homes, &prices);

        let visits = vec![
            stop("d1", false, 7, 19.05, 47.51, 2),
            stop("d1", false, 8, 19.40, 47.60, 2),
            stop("d2", false, 7, 19.05, 47.51, 2),
        ];
        let thirds = third_places_table(&visits, res()).unwrap();
        prices.push(price_for(19.05, 47.51, 9));

        let rows = price_third_places(thirds, &prices, &priced_homes);
        assert_eq!(rows.len(), 1, "unpriced place and homeless device are dropped");

        let row = &rows[0];
        assert_eq!((row.device_id.as_str(), row.place_label), ("d1", 7));
        assert_eq!((row.price_group_third, row.price_group_home), (9, 4));
        let expected = haversine_km((row.mean_lon_home, row.mean_lat_home), (19.05, 47.51));
        assert!((row.distance - expected).abs() < 1e-12);
        assert!(row.distance > 1.0 && row.distance < 1.2, "about 1.1 km north, got {}", row.distance);
    }
}
