//! Monthly anchor places (home, work) and third places of each device.

use std::collections::{BTreeMap, BTreeSet};

use chrono::Datelike;
use h3o::Resolution;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use ub_spatial::SpatialError;
use ub_spatial::hex::point_to_cell;
use ub_table::stats::{mean, sample_std};

use crate::stops::StopRecord;

/// Which identified anchor place to aggregate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum PlaceKind {
    /// Stops flagged `home__identified`.
    Home,
    /// Stops flagged `work__identified`.
    Work,
}

impl PlaceKind {
    const fn matches(self, stop: &StopRecord) -> bool {
        match self {
            Self::Home => matches!(stop.home, Some(true)),
            Self::Work => matches!(stop.work, Some(true)),
        }
    }
}

/// Thresholds an anchor place must meet.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnchorRules {
    /// Minimum number of stops behind the mean location.
    pub min_stops: usize,
    /// Maximum sample standard deviation of either coordinate (degrees).
    pub max_coord_std: f64,
}

/// Mean location of a device's home or work place in one month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnchorPlace {
    /// Device identifier.
    pub device_id: String,
    /// Month.
    pub year_month: String,
    /// Mean stop longitude.
    pub mean_lon: f64,
    /// Mean stop latitude.
    pub mean_lat: f64,
    /// Sample standard deviation of stop longitudes.
    pub std_lon: f64,
    /// Sample standard deviation of stop latitudes.
    pub std_lat: f64,
    /// Number of stops.
    pub nr_stops: usize,
    /// H3 cell of the mean location.
    pub h3: String,
}

/// A place a device visited in one month that is neither home nor work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThirdPlace {
    /// Device identifier.
    pub device_id: String,
    /// Month.
    pub year_month: String,
    /// Place cluster label.
    pub place_label: i64,
    /// Number of stops.
    pub nr_visits: usize,
    /// Number of distinct days of the month with a stop.
    pub nr_days: usize,
    /// Mean stop longitude.
    pub mean_lon: f64,
    /// Mean stop latitude.
    pub mean_lat: f64,
    /// Sample standard deviation of stop longitudes (undefined for one stop).
    pub std_lon: Option<f64>,
    /// Sample standard deviation of stop latitudes (undefined for one stop).
    pub std_lat: Option<f64>,
    /// Mean stop duration.
    pub mean_duration: f64,
    /// H3 cell of the mean location.
    pub h3: String,
}

#[derive(Default)]
struct Coordinates {
    lons: Vec<f64>,
    lats: Vec<f64>,
}

impl Coordinates {
    fn push(&mut self, stop: &StopRecord) {
        self.lons.push(stop.lon);
        self.lats.push(stop.lat);
    }

    fn means(&self) -> Option<(f64, f64)> {
        Some((mean(self.lons.iter().copied())?, mean(self.lats.iter().copied())?))
    }

    fn stds(&self) -> (Option<f64>, Option<f64>) {
        (sample_std(&self.lons), sample_std(&self.lats))
    }
}

/// Aggregates a device's home or work stops per month.
///
/// Only identified stops at a place count. A group is kept when it has
/// at least `rules.min_stops` stops and both coordinate standard
/// deviations are defined and within `rules.max_coord_std`.
///
/// # Errors
///
/// Returns [`SpatialError::InvalidCoordinate`] if a mean location cannot
/// be indexed.
pub fn place_of_the_month(
    stops: &[StopRecord],
    kind: PlaceKind,
    rules: AnchorRules,
    res: Resolution,
) -> Result<Vec<AnchorPlace>, SpatialError> {
    let mut groups: BTreeMap<(&str, &str), Coordinates> = BTreeMap::new();
    for stop in stops.iter().filter(|s| kind.matches(s) && s.at_place()) {
        groups
            .entry((stop.device_id.as_str(), stop.year_month.as_str()))
            .or_default()
            .push(stop);
    }

    let total = groups.len();
    let mut places = Vec::new();
    for ((device_id, year_month), coords) in groups {
        let nr_stops = coords.lons.len();
        let (Some(std_lon), Some(std_lat)) = coords.stds() else {
            continue;
        };
        if nr_stops < rules.min_stops || std_lon > rules.max_coord_std || std_lat > rules.max_coord_std
        {
            continue;
        }
        let Some((mean_lon, mean_lat)) = coords.means() else {
            continue;
        };
        places.push(AnchorPlace {
            device_id: device_id.to_string(),
            year_month: year_month.to_string(),
            mean_lon,
            mean_lat,
            std_lon,
            std_lat,
            nr_stops,
            h3: point_to_cell(mean_lon, mean_lat, res)?.to_string(),
        });
    }

    log::info!("{kind} places: {} of {total} device-months kept", places.len());
    Ok(places)
}

#[derive(Default)]
struct Visits {
    coords: Coordinates,
    days: BTreeSet<u32>,
    durations: Vec<f64>,
}

/// Aggregates stops that are neither home nor work per (device, month,
/// place label). A stop with an empty home or work flag is skipped.
///
/// # Errors
///
/// Returns [`SpatialError::InvalidCoordinate`] if a mean location cannot
/// be indexed.
pub fn third_places_table(
    stops: &[StopRecord],
    res: Resolution,
) -> Result<Vec<ThirdPlace>, SpatialError> {
    let mut groups: BTreeMap<(&str, &str, i64), Visits> = BTreeMap::new();
    for stop in stops.iter().filter(|s| s.off_anchor() && s.at_place()) {
        let visits = groups
            .entry((stop.device_id.as_str(), stop.year_month.as_str(), stop.place_label))
            .or_default();
        visits.coords.push(stop);
        visits.days.insert(stop.start.day());
        visits.durations.push(stop.duration);
    }

    let mut places = Vec::with_capacity(groups.len());
    for ((device_id, year_month, place_label), visits) in groups {
        let Some((mean_lon, mean_lat)) = visits.coords.means() else {
            continue;
        };
        let (std_lon, std_lat) = visits.coords.stds();
        places.push(ThirdPlace {
            device_id: device_id.to_string(),
            year_month: year_month.to_string(),
            place_label,
            nr_visits: visits.coords.lons.len(),
            nr_days: visits.days.len(),
            mean_lon,
            mean_lat,
            std_lon,
            std_lat,
            mean_duration: mean(visits.durations.iter().copied()).unwrap_or(f64::NAN),
            h3: point_to_cell(mean_lon, mean_lat, res)?.to_string(),
        });
    }

    log::info!("Third places: {}", places.len());
    Ok(places)
}
