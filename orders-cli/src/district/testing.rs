//! In-memory geocoder for tests

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use anyhow::{Result, bail};

use super::geocoder::{Geocoder, PostalPlace};

/// Geocoder over a fixed map that records every code it is asked for
#[derive(Debug, Default)]
pub struct StubGeocoder {
    places: HashMap<String, PostalPlace>,
    failing: HashSet<String>,
    seen: Rc<RefCell<Vec<String>>>,
}

impl StubGeocoder {
    pub fn with_districts(entries: &[(&str, &str)]) -> Self {
        let mut stub = Self::default();
        for (code, county) in entries {
            stub.places.insert(
                code.to_string(),
                PostalPlace {
                    postal_code: code.to_string(),
                    county_name: county.to_string(),
                    ..PostalPlace::default()
                },
            );
        }
        stub
    }

    pub fn with_community(mut self, code: &str, community: &str) -> Self {
        self.places.insert(
            code.to_string(),
            PostalPlace {
                postal_code: code.to_string(),
                community_name: community.to_string(),
                ..PostalPlace::default()
            },
        );
        self
    }

    pub fn with_coordinates(mut self, code: &str, latitude: f64, longitude: f64) -> Self {
        let place = self
            .places
            .entry(code.to_string())
            .or_insert_with(|| PostalPlace {
                postal_code: code.to_string(),
                ..PostalPlace::default()
            });
        place.latitude = Some(latitude);
        place.longitude = Some(longitude);
        self
    }

    pub fn failing_on(mut self, code: &str) -> Self {
        self.failing.insert(code.to_string());
        self
    }

    /// Shared log of looked-up codes
    pub fn seen(&self) -> Rc<RefCell<Vec<String>>> {
        Rc::clone(&self.seen)
    }
}

impl Geocoder for StubGeocoder {
    fn lookup(&self, postal_code: &str) -> Result<Option<PostalPlace>> {
        self.seen.borrow_mut().push(postal_code.to_string());
        if self.failing.contains(postal_code) {
            bail!("simulated lookup failure for {}", postal_code);
        }
        Ok(self.places.get(postal_code).cloned())
    }
}
