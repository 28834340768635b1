//! Per-location and per-category summaries of the engine output.

use std::collections::BTreeMap;

use ub_complexity_models::{CategoryComplexity, ComplexityRecord, LocationComplexity};
use ub_table::DataIntegrityWarning;
use ub_table::join::left_join;
use ub_table::io::format_optional;
use ub_table::stats::{mean, min_max_normalize};

/// Original properties of each location polygon, keyed by location name.
pub type LocationAttributes = BTreeMap<String, BTreeMap<String, String>>;

/// Location and category summary tables.
#[derive(Debug, Clone, Default)]
pub struct ComplexityTables {
    /// One row per scored location, sorted by name.
    pub locations: Vec<LocationComplexity>,
    /// One row per category, sorted by label.
    pub categories: Vec<CategoryComplexity>,
    /// Normalizations that were undefined.
    pub warnings: Vec<DataIntegrityWarning>,
}

/// Builds both summary tables from the records of a single period.
#[must_use]
pub fn assemble(records: &[ComplexityRecord], attributes: &LocationAttributes) -> ComplexityTables {
    let (locations, mut warnings) = location_table(records, attributes);
    let (categories, category_warnings) = category_table(records);
    warnings.extend(category_warnings);

    ComplexityTables {
        locations,
        categories,
        warnings,
    }
}

/// One row per location that has at least one record.
///
/// `avg_ubiquity` averages the ubiquity of the categories the location has
/// a comparative advantage in. ECI and diversity are min-max normalized
/// across the table. A location absent from `attributes` is kept with empty
/// attributes and reported as a join mismatch.
#[must_use]
pub fn location_table(
    records: &[ComplexityRecord],
    attributes: &LocationAttributes,
) -> (Vec<LocationComplexity>, Vec<DataIntegrityWarning>) {
    let mut per_location: BTreeMap<&str, (Option<f64>, u32, Vec<f64>)> = BTreeMap::new();
    for record in records {
        let entry = per_location
            .entry(record.location_name.as_str())
            .or_insert_with(|| (record.eci, record.diversity, Vec::new()));
        if record.presence {
            entry.2.push(f64::from(record.ubiquity));
        }
    }

    let summaries: Vec<LocationComplexity> = per_location
        .into_iter()
        .map(|(name, (eci, diversity, ubiquities))| LocationComplexity {
            location_name: name.to_string(),
            eci,
            diversity,
            avg_ubiquity: mean(ubiquities),
            eci_norm: None,
            div_norm: None,
            attributes: BTreeMap::new(),
        })
        .collect();

    let polygons: Vec<(&String, &BTreeMap<String, String>)> = attributes.iter().collect();
    let mut rows: Vec<LocationComplexity> = left_join(
        summaries,
        &polygons,
        |row| Some(row.location_name.clone()),
        |(name, _)| (*name).clone(),
    )
    .log_mismatch("location complexity -> location polygons")
    .into_left_rows()
    .into_iter()
    .map(|(mut row, polygon)| {
        if let Some((_, attrs)) = polygon {
            row.attributes = attrs.clone();
        }
        row
    })
    .collect();

    let eci: Vec<Option<f64>> = rows.iter().map(|r| r.eci).collect();
    let diversity: Vec<Option<f64>> = rows.iter().map(|r| Some(f64::from(r.diversity))).collect();
    let (eci_norm, eci_warning) = min_max_normalize(&eci, "eci");
    let (div_norm, div_warning) = min_max_normalize(&diversity, "diversity");

    for ((row, eci_norm), div_norm) in rows.iter_mut().zip(eci_norm).zip(div_norm) {
        row.eci_norm = eci_norm;
        row.div_norm = div_norm;
    }

    (rows, eci_warning.into_iter().chain(div_warning).collect())
}

/// One row per category with PCI, ubiquity and min-max normalized ubiquity.
#[must_use]
pub fn category_table(
    records: &[ComplexityRecord],
) -> (Vec<CategoryComplexity>, Vec<DataIntegrityWarning>) {
    let mut per_category: BTreeMap<&str, (Option<f64>, u32)> = BTreeMap::new();
    for record in records {
        per_category
            .entry(record.category.as_str())
            .or_insert((record.pci, record.ubiquity));
    }

    let ubiquity: Vec<Option<f64>> = per_category
        .values()
        .map(|(_, u)| Some(f64::from(*u)))
        .collect();
    let (ubi_norm, warning) = min_max_normalize(&ubiquity, "ubiquity");

    let rows = per_category
        .into_iter()
        .zip(ubi_norm)
        .map(|((category, (pci, ubiquity)), ubi_norm)| CategoryComplexity {
            category: category.to_string(),
            pci,
            ubiquity,
            ubi_norm,
        })
        .collect();

    (rows, warning.into_iter().collect())
}

/// Leading columns of the flattened location table.
const LOCATION_COLUMNS: [&str; 6] = [
    "location_name",
    "eci",
    "diversity",
    "avg_ubiquity",
    "eci_norm",
    "div_norm",
];

/// Flattens the location table into CSV headers and rows.
///
/// The fixed columns come first, followed by the union of every polygon
/// attribute in name order. A location lacking an attribute gets an empty
/// field.
#[must_use]
pub fn location_records(rows: &[LocationComplexity]) -> (Vec<String>, Vec<Vec<String>>) {
    let attribute_names: std::collections::BTreeSet<&String> =
        rows.iter().flat_map(|r| r.attributes.keys()).collect();

    let headers = LOCATION_COLUMNS
        .into_iter()
        .map(str::to_string)
        .chain(
            attribute_names
                .iter()
                .filter(|name| !LOCATION_COLUMNS.contains(&name.as_str()))
                .map(|name| (*name).clone()),
        )
        .collect::<Vec<_>>();

    let records = rows
        .iter()
        .map(|row| {
            let mut record = vec![
                row.location_name.clone(),
                format_optional(row.eci),
                row.diversity.to_string(),
                format_optional(row.avg_ubiquity),
                format_optional(row.eci_norm),
                format_optional(row.div_norm),
            ];
            record.extend(headers[LOCATION_COLUMNS.len()..].iter().map(|name| {
                row.attributes.get(name).cloned().unwrap_or_default()
            }));
            record
        })
        .collect();

    (headers, records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::compute_period;
    use crate::incidence::build_incidence_table;
    use ub_complexity_models::{CategorizedPoi, IncidenceCell, IncidenceThresholds};

    const TOL: f64 = 1e-9;

    fn cell(location: &str, category: &str, poi_count: u64) -> IncidenceCell {
        IncidenceCell {
            location_name: location.to_string(),
            category: category.to_string(),
            poi_count,
            nr_categories: 0,
        }
    }

    fn neighborhoods() -> Vec<IncidenceCell> {
        [
            ("Alpha", "bakery", 4),
            ("Alpha", "cafe", 6),
            ("Alpha", "gallery", 5),
            ("Alpha", "museum", 5),
            ("Alpha", "pub", 2),
            ("Beta", "bakery", 6),
            ("Beta", "cafe", 6),
            ("Beta", "gallery", 3),
            ("Beta", "pub", 2),
            ("Gamma", "bakery", 8),
            ("Gamma", "cafe", 4),
            ("Gamma", "pub", 2),
            ("Delta", "bakery", 9),
            ("Delta", "pub", 3),
        ]
        .into_iter()
        .map(|(l, c, n)| cell(l, c, n))
        .collect()
    }

    fn attributes() -> LocationAttributes {
        ["Alpha", "Beta", "Gamma", "Delta", "Omega"]
            .into_iter()
            .map(|name| {
                (
                    name.to_string(),
                    BTreeMap::from([("district".to_string(), format!("{name}-district"))]),
                )
            })
            .collect()
    }

    fn tables() -> ComplexityTables {
        let run = compute_period("2020", &neighborhoods());
        assemble(&run.records, &attributes())
    }

    #[test]
    fn one_row_per_location_and_category() {
        let tables = tables();
        let names: Vec<_> = tables.locations.iter().map(|l| l.location_name.as_str()).collect();
        assert_eq!(names, vec!["Alpha", "Beta", "Delta", "Gamma"]);
        let categories: Vec<_> = tables.categories.iter().map(|c| c.category.as_str()).collect();
        assert_eq!(categories, vec!["bakery", "cafe", "gallery", "museum", "pub"]);
    }

    #[test]
    fn unscored_location_is_absent() {
        let tables = tables();
        assert!(
            tables.locations.iter().all(|l| l.location_name != "Omega"),
            "a polygon without surviving cells must not get a row"
        );
    }

    #[test]
    fn average_ubiquity_covers_present_categories_only() {
        let tables = tables();
        let avg: BTreeMap<&str, f64> = tables
            .locations
            .iter()
            .map(|l| (l.location_name.as_str(), l.avg_ubiquity.unwrap()))
            .collect();
        assert!((avg["Alpha"] - 2.0).abs() < TOL);
        assert!((avg["Beta"] - 2.5).abs() < TOL);
        assert!((avg["Gamma"] - 7.0 / 3.0).abs() < TOL);
        assert!((avg["Delta"] - 2.0).abs() < TOL);
    }

    #[test]
    fn normalized_columns_span_unit_interval() {
        let tables = tables();
        let eci_norm: Vec<f64> = tables.locations.iter().map(|l| l.eci_norm.unwrap()).collect();
        assert!(eci_norm.iter().all(|v| (0.0..=1.0).contains(v)));

        let top = tables
            .locations
            .iter()
            .max_by(|a, b| a.eci.unwrap().total_cmp(&b.eci.unwrap()))
            .unwrap();
        let bottom = tables
            .locations
            .iter()
            .min_by(|a, b| a.eci.unwrap().total_cmp(&b.eci.unwrap()))
            .unwrap();
        assert_eq!(top.location_name, "Alpha");
        assert_eq!(top.eci_norm, Some(1.0));
        assert_eq!(bottom.location_name, "Delta");
        assert_eq!(bottom.eci_norm, Some(0.0));

        let div_norm: BTreeMap<&str, Option<f64>> = tables
            .locations
            .iter()
            .map(|l| (l.location_name.as_str(), l.div_norm))
            .collect();
        assert_eq!(div_norm["Alpha"], Some(1.0));
        assert_eq!(div_norm["Beta"], Some(0.0));
    }

    #[test]
    fn ubiquity_is_normalized_per_category() {
        let tables = tables();
        let ubi_norm: BTreeMap<&str, Option<f64>> = tables
            .categories
            .iter()
            .map(|c| (c.category.as_str(), c.ubi_norm))
            .collect();
        assert_eq!(ubi_norm["cafe"], Some(1.0));
        assert_eq!(ubi_norm["museum"], Some(0.0));
        assert_eq!(ubi_norm["bakery"], Some(0.5));
        assert!(tables.warnings.is_empty());
    }

    #[test]
    fn attributes_are_carried_over() {
        let tables = tables();
        let alpha = &tables.locations[0];
        assert_eq!(
            alpha.attributes.get("district").map(String::as_str),
            Some("Alpha-district")
        );
    }

    #[test]
    fn location_records_append_attribute_columns() {
        let mut tables = tables();
        tables.locations[1]
            .attributes
            .insert("area_km2".to_string(), "3.5".to_string());

        let (headers, rows) = location_records(&tables.locations);
        assert_eq!(
            headers,
            vec![
                "location_name",
                "eci",
                "diversity",
                "avg_ubiquity",
                "eci_norm",
                "div_norm",
                "area_km2",
                "district"
            ]
        );
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[0][0], "Alpha");
        assert_eq!(rows[0][6], "");
        assert_eq!(rows[1][6], "3.5");
        assert_eq!(rows[1][7], "Beta-district");
    }

    #[test]
    fn fixed_column_names_are_not_repeated_as_attributes() {
        let mut tables = tables();
        for name in ["avg_ubiquity", "eci_norm", "div_norm", "eci"] {
            tables.locations[0]
                .attributes
                .insert(name.to_string(), "clash".to_string());
        }

        let (headers, rows) = location_records(&tables.locations);
        assert_eq!(
            headers,
            vec![
                "location_name",
                "eci",
                "diversity",
                "avg_ubiquity",
                "eci_norm",
                "div_norm",
                "district"
            ]
        );
        assert!(rows.iter().all(|r| r.len() == headers.len()));
        assert_eq!(rows[0][4], "1");
        assert_eq!(rows[0][6], "Alpha-district");
    }

    #[test]
    fn location_without_advantage_keeps_a_zero_diversity_row() {
        let mut cells = neighborhoods();
        cells.push(cell("Zeta", "bakery", 0));
        cells.push(cell("Zeta", "atm", 0));
        let run = compute_period("2020", &cells);
        let (rows, _) = location_table(&run.records, &LocationAttributes::new());

        assert_eq!(rows.len(), 5);
        let zeta = rows.iter().find(|r| r.location_name == "Zeta").unwrap();
        assert_eq!(zeta.diversity, 0);
        assert!(zeta.eci.is_none());
        assert!(zeta.eci_norm.is_none());
        assert!(zeta.avg_ubiquity.is_none());
        assert_eq!(zeta.div_norm, Some(0.0));

        let alpha = rows.iter().find(|r| r.location_name == "Alpha").unwrap();
        assert_eq!(alpha.div_norm, Some(1.0));
    }

    #[test]
    fn location_missing_from_polygons_keeps_empty_attributes() {
        let run = compute_period("2020", &neighborhoods());
        let (rows, _) = location_table(&run.records, &LocationAttributes::new());
        assert_eq!(rows.len(), 4);
        assert!(rows.iter().all(|r| r.attributes.is_empty()));
    }

    #[test]
    fn constant_diversity_normalizes_to_none() {
        let cells = vec![cell("A", "X", 4), cell("A", "Y", 1), cell("B", "Y", 4), cell("B", "X", 1)];
        let run = compute_period("2020", &cells);
        let (rows, warnings) = location_table(&run.records, &LocationAttributes::new());

        assert!(rows.iter().all(|r| r.div_norm.is_none()));
        assert!(warnings.contains(&DataIntegrityWarning::DegenerateNormalization {
            column: "diversity".into()
        }));
    }

    #[test]
    fn location_with_every_cell_filtered_gets_no_row() {
        let mut pois = Vec::new();
        for (location, category, n) in [
            ("A", "X", 3),
            ("A", "Y", 3),
            ("B", "X", 2),
            ("B", "Z", 2),
            ("Sparse", "X", 1),
            ("Sparse", "Y", 1),
        ] {
            for i in 0..n {
                pois.push(CategorizedPoi {
                    location_name: Some(location.to_string()),
                    category: Some(category.to_string()),
                    place_id: Some(format!("{location}{category}{i}")),
                });
            }
        }

        let incidence = build_incidence_table(&pois, IncidenceThresholds::default());
        let run = compute_period("2020", &incidence.cells);
        let (rows, _) = location_table(&run.records, &LocationAttributes::new());

        assert!(rows.iter().any(|r| r.location_name == "A"));
        assert!(rows.iter().all(|r| r.location_name != "Sparse"));
        assert!(incidence.warnings.contains(&DataIntegrityWarning::LocationDropped {
            location: "Sparse".into()
        }));
    }
}
