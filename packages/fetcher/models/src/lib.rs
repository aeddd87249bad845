#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! The canonical normalized trash-bin record.
//!
//! The dataset fetcher converts raw open-data records into [`TrashBin`]
//! values; everything downstream (map annotation, JSON export) consumes
//! this type and never sees the raw API payloads.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A public trash bin at a known street location.
///
/// Coordinates are guaranteed finite: records whose coordinate fields do
/// not parse to finite numbers are dropped during normalization and never
/// reach this type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrashBin {
    /// Opaque identity, generated locally at normalization time. Carries
    /// no meaning beyond list/map-key identity; it is not derived from
    /// the remote data.
    pub id: Uuid,
    /// Latitude (WGS84), always finite.
    pub latitude: f64,
    /// Longitude (WGS84), always finite.
    pub longitude: f64,
    /// Street name plus section/number annotation, concatenated. Either
    /// part may be empty when the source record lacks it.
    pub address: String,
}

impl TrashBin {
    /// Creates a record with a freshly generated id.
    #[must_use]
    pub fn new(latitude: f64, longitude: f64, address: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            latitude,
            longitude,
            address,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_records_get_distinct_ids() {
        let a = TrashBin::new(25.03, 121.56, "中正路100號".to_string());
        let b = TrashBin::new(25.03, 121.56, "中正路100號".to_string());
        assert_ne!(a.id, b.id);
    }
}
