//! Config-driven dataset definition.
//!
//! [`DatasetDefinition`] captures everything unique about one open-data
//! dataset — where it lives, how it paginates, and which raw field names
//! carry the coordinates and address fragments — in a serializable
//! config struct. Definitions are TOML documents embedded at compile
//! time (see [`crate::registry`]).

use serde::Deserialize;

use crate::FetchError;
use crate::districts::is_taipei_district;

/// A complete, config-driven dataset definition.
#[derive(Debug, Clone, Deserialize)]
pub struct DatasetDefinition {
    /// Unique identifier (e.g., `"taipei_trash"`).
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// How to locate and page through the dataset.
    pub fetcher: FetcherConfig,
    /// Raw field names used during normalization.
    pub fields: FieldMapping,
}

/// How to locate and page through a dataset.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FetcherConfig {
    /// Fixed datastore endpoint, sequential `limit`/`offset` paging.
    Direct {
        /// Datastore endpoint URL.
        api_url: String,
        /// Records per page.
        page_size: u64,
    },
    /// The endpoint URL is discovered through a small info document
    /// (`{ "url": "<string>" }`) once per session, then paged
    /// sequentially.
    Discovered {
        /// URL of the info document.
        info_url: String,
        /// Records per page.
        page_size: u64,
    },
    /// One single-page request per district sub-dataset, issued
    /// concurrently and merged.
    Districts {
        /// Page limit for each sub-dataset request.
        page_size: u64,
        /// Per-district datastore resources.
        resources: Vec<DistrictResource>,
    },
}

impl FetcherConfig {
    /// Records per page for this strategy.
    #[must_use]
    pub const fn page_size(&self) -> u64 {
        match self {
            Self::Direct { page_size, .. }
            | Self::Discovered { page_size, .. }
            | Self::Districts { page_size, .. } => *page_size,
        }
    }
}

/// One district's sub-dataset endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct DistrictResource {
    /// District name; must belong to the closed Taipei district set.
    pub district: String,
    /// Datastore endpoint URL for this district's records.
    pub api_url: String,
}

/// Raw field names consumed during normalization. The open-data records
/// use locale-specific keys, so these are plain opaque strings.
#[derive(Debug, Clone, Deserialize)]
pub struct FieldMapping {
    /// Latitude field.
    pub lat: String,
    /// Longitude field.
    pub lng: String,
    /// Street-name field.
    pub street: String,
    /// Section/number annotation field.
    pub annotation: String,
}

/// Parses and validates a dataset definition from TOML.
///
/// # Errors
///
/// Returns [`FetchError::Config`] if the TOML is malformed, the page
/// size is zero, or a district resource names an unknown or duplicated
/// district.
pub fn parse_dataset_toml(content: &str) -> Result<DatasetDefinition, FetchError> {
    let definition: DatasetDefinition = toml::from_str(content).map_err(|e| FetchError::Config {
        message: e.to_string(),
    })?;
    validate(&definition)?;
    Ok(definition)
}

fn validate(definition: &DatasetDefinition) -> Result<(), FetchError> {
    if definition.fetcher.page_size() == 0 {
        return Err(FetchError::Config {
            message: format!("{}: page_size must be positive", definition.id),
        });
    }

    if let FetcherConfig::Districts { resources, .. } = &definition.fetcher {
        if resources.is_empty() {
            return Err(FetchError::Config {
                message: format!("{}: districts fetcher has no resources", definition.id),
            });
        }
        let mut seen: Vec<&str> = Vec::new();
        for resource in resources {
            if !is_taipei_district(&resource.district) {
                return Err(FetchError::Config {
                    message: format!("{}: unknown district {}", definition.id, resource.district),
                });
            }
            if seen.contains(&resource.district.as_str()) {
                return Err(FetchError::Config {
                    message: format!(
                        "{}: duplicate district {}",
                        definition.id, resource.district
                    ),
                });
            }
            seen.push(&resource.district);
        }
    }

    Ok(())
}
