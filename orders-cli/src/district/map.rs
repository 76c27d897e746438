//! Per-district case counts with map coordinates

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;
use serde_json::json;

use super::geocoder::Geocoder;
use super::postal::canonical_postal_code;
use crate::records::{Parasite, Table, is_blank};

/// One map point: a district with its case count and mean position
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DistrictCases {
    pub district: String,
    pub cases: u64,
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Default)]
struct Accumulator {
    cases: u64,
    lat_sum: f64,
    lon_sum: f64,
    rows: usize,
}

/// Aggregate positive results for `parasite` by district.
///
/// Only rows with a five-digit postal code the geocoder can place and a
/// non-blank district take part. Coordinates are averaged over those rows.
/// Results are sorted by district name.
pub fn aggregate_cases(
    table: &Table,
    parasite: Parasite,
    geocoder: &dyn Geocoder,
    drop_zero: bool,
) -> Vec<DistrictCases> {
    let codes: Vec<Option<String>> = table
        .records
        .iter()
        .map(|r| canonical_postal_code(&r.postal_code))
        .collect();

    // One batched lookup over the distinct codes
    let mut unique: Vec<String> = codes.iter().flatten().cloned().collect();
    unique.sort();
    unique.dedup();
    let coordinates: HashMap<String, (f64, f64)> = unique
        .iter()
        .zip(geocoder.lookup_many(&unique))
        .filter_map(|(code, place)| Some((code.clone(), place?.coordinates()?)))
        .collect();

    if coordinates.is_empty() {
        log::info!("No coordinates found for any postal code");
    }

    let mut groups: BTreeMap<String, Accumulator> = BTreeMap::new();
    for (record, code) in table.records.iter().zip(&codes) {
        let Some((lat, lon)) = code.as_ref().and_then(|c| coordinates.get(c)) else {
            continue;
        };
        let district = record.district.trim();
        if is_blank(district) {
            continue;
        }

        let acc = groups.entry(district.to_string()).or_default();
        acc.cases += u64::from(record.flag(parasite));
        acc.lat_sum += lat;
        acc.lon_sum += lon;
        acc.rows += 1;
    }

    groups
        .into_iter()
        .filter(|(_, acc)| !drop_zero || acc.cases > 0)
        .map(|(district, acc)| DistrictCases {
            district,
            cases: acc.cases,
            latitude: acc.lat_sum / acc.rows as f64,
            longitude: acc.lon_sum / acc.rows as f64,
        })
        .collect()
}

/// GeoJSON FeatureCollection of district points
pub fn to_geojson(points: &[DistrictCases], parasite: Parasite) -> serde_json::Value {
    let features: Vec<serde_json::Value> = points
        .iter()
        .map(|p| {
            json!({
                "type": "Feature",
                "geometry": {
                    "type": "Point",
                    "coordinates": [p.longitude, p.latitude],
                },
                "properties": {
                    "district": p.district,
                    "cases": p.cases,
                    "parasite": parasite.to_string(),
                },
            })
        })
        .collect();

    json!({
        "type": "FeatureCollection",
        "features": features,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::district::testing::StubGeocoder;
    use crate::records::Record;

    fn record(postal: &str, district: &str, oxyuris: u8) -> Record {
        let mut r = Record {
            postal_code: postal.into(),
            district: district.into(),
            ..Record::default()
        };
        r.set_flag(Parasite::Oxyuris, oxyuris);
        r
    }

    fn geocoder() -> StubGeocoder {
        StubGeocoder::with_districts(&[])
            .with_coordinates("00-950", 52.0, 21.0)
            .with_coordinates("00-001", 52.2, 21.2)
            .with_coordinates("31-042", 50.0, 19.9)
    }

    #[test]
    fn test_groups_and_averages_by_district() {
        let table = Table::new(vec![
            record("00950", "Warszawa", 1),
            record("00-001", "Warszawa", 1),
            record("31-042", "Kraków", 0),
            record("12-345", "Nieznany", 1),
            record("00-950", "", 1),
            record("123", "Warszawa", 1),
        ]);

        let points = aggregate_cases(&table, Parasite::Oxyuris, &geocoder(), false);
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].district, "Kraków");
        assert_eq!(points[0].cases, 0);
        assert_eq!(points[1].district, "Warszawa");
        assert_eq!(points[1].cases, 2);
        assert!((points[1].latitude - 52.1).abs() < 1e-9);
        assert!((points[1].longitude - 21.1).abs() < 1e-9);

        let points = aggregate_cases(&table, Parasite::Oxyuris, &geocoder(), true);
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].district, "Warszawa");
    }

    #[test]
    fn test_distinct_codes_are_looked_up_once() {
        let table = Table::new(vec![
            record("00950", "Warszawa", 1),
            record("00-950", "Warszawa", 0),
        ]);
        let stub = geocoder();
        let seen = stub.seen();
        aggregate_cases(&table, Parasite::Oxyuris, &stub, true);
        assert_eq!(*seen.borrow(), vec!["00-950".to_string()]);
    }

    #[test]
    fn test_geojson_shape() {
        let points = vec![DistrictCases {
            district: "Kraków".into(),
            cases: 3,
            latitude: 50.0,
            longitude: 19.9,
        }];
        let geojson = to_geojson(&points, Parasite::Parascaris);
        assert_eq!(geojson["type"], "FeatureCollection");
        let feature = &geojson["features"][0];
        assert_eq!(feature["geometry"]["coordinates"][0], 19.9);
        assert_eq!(feature["properties"]["cases"], 3);
        assert_eq!(feature["properties"]["parasite"], "Parascaris equorum");
    }
}
