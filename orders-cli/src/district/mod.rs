//! District (powiat) resolution from Polish postal codes
//!
//! - `postal`: code normalization (`DD-DDD`)
//! - `geocoder`: the reference dataset and the `Geocoder` seam
//! - `resolver`: single code -> district name
//! - `backfill`: fill blank districts across a table
//! - `map`: per-district case counts for plotting

pub mod backfill;
pub mod geocoder;
pub mod map;
pub mod postal;
pub mod resolver;

#[cfg(test)]
pub mod testing;

pub use backfill::{BackfillOutcome, DEFAULT_POSTAL_CANDIDATES, backfill};
pub use geocoder::{GeoNamesIndex, Geocoder, PostalPlace, UnavailableGeocoder};
pub use map::{DistrictCases, aggregate_cases, to_geojson};
pub use postal::{canonical_postal_code, is_missing_code, normalize_postal_code};
pub use resolver::DistrictResolver;

use crate::config::GeocoderConfig;

/// Build a resolver over the configured dataset. When the dataset cannot be
/// loaded, resolution degrades to empty results instead of failing.
pub async fn load_resolver(config: &GeocoderConfig, http: &reqwest::Client) -> DistrictResolver {
    match GeoNamesIndex::load(config, http).await {
        Ok(index) => {
            if index.is_empty() {
                log::warn!("Geocoding reference is empty, districts will not resolve");
            }
            log::debug!("Loaded geocoding reference with {} codes", index.len());
            DistrictResolver::new(index)
        }
        Err(e) => {
            log::warn!("Geocoding reference unavailable: {:#}", e);
            DistrictResolver::new(UnavailableGeocoder::new(format!("{:#}", e)))
        }
    }
}
