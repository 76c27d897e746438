//! Postal code geocoding reference
//!
//! The production source is the GeoNames postal-code dump for Poland. The
//! file is tab-separated without a header:
//!
//! | # | Field          | Notes                         |
//! |---|----------------|-------------------------------|
//! | 0 | country code   | always `PL`                   |
//! | 1 | postal code    | `DD-DDD`                      |
//! | 2 | place name     |                               |
//! | 3 | admin1 name    | voivodeship                   |
//! | 4 | admin1 code    |                               |
//! | 5 | admin2 name    | county (powiat)               |
//! | 6 | admin2 code    |                               |
//! | 7 | admin3 name    | community (gmina)             |
//! | 8 | admin3 code    |                               |
//! | 9 | latitude       |                               |
//! |10 | longitude      |                               |
//! |11 | accuracy       |                               |
//!
//! A postal code appears once per place it serves. Entries are merged per
//! code: names from the first row, mean coordinates, joined place names.

use std::collections::HashMap;
use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};

use crate::config::GeocoderConfig;

/// Everything the reference knows about one postal code
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PostalPlace {
    pub postal_code: String,
    pub place_name: String,
    pub state_name: String,
    pub county_name: String,
    pub community_name: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl PostalPlace {
    /// County when known, otherwise the community
    pub fn district(&self) -> Option<&str> {
        [self.county_name.as_str(), self.community_name.as_str()]
            .into_iter()
            .map(str::trim)
            .find(|name| !name.is_empty())
    }

    pub fn coordinates(&self) -> Option<(f64, f64)> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lon)) if lat.is_finite() && lon.is_finite() => Some((lat, lon)),
            _ => None,
        }
    }
}

/// Lookup of normalized (`DD-DDD`) postal codes
pub trait Geocoder {
    fn lookup(&self, postal_code: &str) -> Result<Option<PostalPlace>>;

    /// Batched lookup; the output is aligned with `postal_codes`.
    /// A failed lookup yields `None` for its slot.
    fn lookup_many(&self, postal_codes: &[String]) -> Vec<Option<PostalPlace>> {
        postal_codes
            .iter()
            .map(|code| match self.lookup(code) {
                Ok(place) => place,
                Err(e) => {
                    log::warn!("Geocoding '{}' failed: {:#}", code, e);
                    None
                }
            })
            .collect()
    }
}

/// Stand-in used when the reference dataset could not be loaded
#[derive(Debug, Clone)]
pub struct UnavailableGeocoder {
    reason: String,
}

impl UnavailableGeocoder {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl Geocoder for UnavailableGeocoder {
    fn lookup(&self, _postal_code: &str) -> Result<Option<PostalPlace>> {
        bail!("geocoding reference unavailable: {}", self.reason)
    }
}

/// In-memory index over the GeoNames postal-code dump
#[derive(Debug, Default)]
pub struct GeoNamesIndex {
    places: HashMap<String, PostalPlace>,
}

/// Running merge of all rows for one postal code
struct PlaceAccumulator {
    place: PostalPlace,
    place_names: Vec<String>,
    lat_sum: f64,
    lon_sum: f64,
    coord_count: usize,
}

impl GeoNamesIndex {
    /// Parse the tab-separated dump
    pub fn from_reader(reader: impl Read) -> Result<Self> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .has_headers(false)
            .flexible(true)
            .quoting(false)
            .from_reader(reader);

        let mut order: Vec<String> = Vec::new();
        let mut merged: HashMap<String, PlaceAccumulator> = HashMap::new();

        for (line, result) in csv_reader.records().enumerate() {
            let row = result.with_context(|| format!("Malformed geocoding row {}", line + 1))?;
            let field = |idx: usize| row.get(idx).unwrap_or("").trim().to_string();

            let postal_code = field(1);
            if postal_code.is_empty() {
                continue;
            }
            let latitude = field(9).parse::<f64>().ok();
            let longitude = field(10).parse::<f64>().ok();

            let acc = merged.entry(postal_code.clone()).or_insert_with(|| {
                order.push(postal_code.clone());
                PlaceAccumulator {
                    place: PostalPlace {
                        postal_code: postal_code.clone(),
                        place_name: String::new(),
                        state_name: field(3),
                        county_name: field(5),
                        community_name: field(7),
                        latitude: None,
                        longitude: None,
                    },
                    place_names: Vec::new(),
                    lat_sum: 0.0,
                    lon_sum: 0.0,
                    coord_count: 0,
                }
            });

            let place_name = field(2);
            if !place_name.is_empty() {
                acc.place_names.push(place_name);
            }
            if let (Some(lat), Some(lon)) = (latitude, longitude) {
                acc.lat_sum += lat;
                acc.lon_sum += lon;
                acc.coord_count += 1;
            }
        }

        let places = order
            .into_iter()
            .filter_map(|code| merged.remove(&code))
            .map(|acc| {
                let mut place = acc.place;
                place.place_name = acc.place_names.join(", ");
                if acc.coord_count > 0 {
                    place.latitude = Some(acc.lat_sum / acc.coord_count as f64);
                    place.longitude = Some(acc.lon_sum / acc.coord_count as f64);
                }
                (place.postal_code.clone(), place)
            })
            .collect::<HashMap<_, _>>();

        log::debug!("Geocoding index holds {} postal codes", places.len());
        Ok(Self { places })
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path)
            .with_context(|| format!("Failed to open geocoding dataset: {}", path.display()))?;
        Self::from_reader(file)
            .with_context(|| format!("Failed to parse geocoding dataset: {}", path.display()))
    }

    /// Load the dataset named by the config, downloading it into the cache
    /// directory first when no local copy exists
    pub async fn load(config: &GeocoderConfig, http: &reqwest::Client) -> Result<Self> {
        if let Some(ref path) = config.dataset_path {
            return Self::from_path(path);
        }

        let cached = cached_dataset_path(&config.country);
        if !cached.exists() {
            download_dataset(&config.dataset_url(), &cached, http).await?;
        } else {
            log::debug!("Using cached geocoding dataset {}", cached.display());
        }
        Self::from_path(&cached)
    }

    pub fn len(&self) -> usize {
        self.places.len()
    }

    pub fn is_empty(&self) -> bool {
        self.places.is_empty()
    }
}

impl Geocoder for GeoNamesIndex {
    fn lookup(&self, postal_code: &str) -> Result<Option<PostalPlace>> {
        Ok(self.places.get(postal_code.trim()).cloned())
    }
}

/// `<cache_dir>/orders-cli/geonames/<COUNTRY>.txt`
pub fn cached_dataset_path(country: &str) -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("orders-cli")
        .join("geonames")
        .join(format!("{}.txt", country.to_uppercase()))
}

async fn download_dataset(url: &str, target: &Path, http: &reqwest::Client) -> Result<()> {
    log::info!("Downloading geocoding dataset from {}", url);

    let response = http
        .get(url)
        .send()
        .await
        .with_context(|| format!("Failed to download geocoding dataset: {}", url))?;
    if !response.status().is_success() {
        bail!(
            "Geocoding dataset download failed with HTTP {}: {}",
            response.status(),
            url
        );
    }
    let body = response
        .bytes()
        .await
        .context("Failed to read geocoding dataset body")?;

    if let Some(parent) = target.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create cache directory: {}", parent.display()))?;
    }
    // Write then rename so an interrupted download never leaves a partial cache
    let partial = target.with_extension("part");
    std::fs::write(&partial, &body)
        .with_context(|| format!("Failed to write {}", partial.display()))?;
    std::fs::rename(&partial, target)
        .with_context(|| format!("Failed to move dataset into {}", target.display()))?;

    log::info!("Cached {} bytes at {}", body.len(), target.display());
    Ok(())
}
