//! Dataset registry — loads all dataset definitions from embedded TOML
//! configs.
//!
//! Each `.toml` file in `packages/fetcher/datasets/` is baked into the
//! binary at compile time via [`include_str!`]. Adding a dataset is as
//! simple as creating a new TOML file and adding it to the list below.

use crate::dataset_def::{DatasetDefinition, parse_dataset_toml};

/// TOML configs embedded at compile time.
const DATASET_TOMLS: &[(&str, &str)] = &[(
    "taipei_trash",
    include_str!("../datasets/taipei_trash.toml"),
)];

/// Total number of configured datasets (used in tests).
#[cfg(test)]
const EXPECTED_DATASET_COUNT: usize = 1;

/// Returns all configured dataset definitions, parsed from embedded TOML.
///
/// # Panics
///
/// Panics if any TOML config is malformed (this is a compile-time
/// guarantee since the configs are embedded).
#[must_use]
pub fn all_datasets() -> Vec<DatasetDefinition> {
    DATASET_TOMLS
        .iter()
        .map(|(name, toml)| {
            parse_dataset_toml(toml).unwrap_or_else(|e| panic!("Failed to parse {name}.toml: {e}"))
        })
        .collect()
}

/// Looks up a dataset definition by id.
#[must_use]
pub fn find_dataset(id: &str) -> Option<DatasetDefinition> {
    all_datasets().into_iter().find(|d| d.id == id)
}
