//! Postal code -> district resolution

use super::geocoder::Geocoder;
use super::postal::{is_missing_code, normalize_postal_code};

/// Resolves postal codes to district (powiat) names through a geocoder.
///
/// Resolution never fails: missing codes, unknown codes and geocoder errors
/// all yield an empty string.
pub struct DistrictResolver {
    geocoder: Box<dyn Geocoder>,
}

impl DistrictResolver {
    pub fn new(geocoder: impl Geocoder + 'static) -> Self {
        Self {
            geocoder: Box::new(geocoder),
        }
    }

    pub fn geocoder(&self) -> &dyn Geocoder {
        self.geocoder.as_ref()
    }

    pub fn resolve(&self, postal_code: &str) -> String {
        let code = normalize_postal_code(postal_code);
        if is_missing_code(&code) {
            return String::new();
        }

        match self.geocoder.lookup(&code) {
            Ok(Some(place)) => place.district().map(str::to_string).unwrap_or_default(),
            Ok(None) => {
                log::debug!("Postal code '{}' not found in geocoding reference", code);
                String::new()
            }
            Err(e) => {
                log::warn!("District lookup for '{}' failed: {:#}", code, e);
                String::new()
            }
        }
    }
}

impl std::fmt::Debug for DistrictResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DistrictResolver").finish_non_exhaustive()
    }
}
