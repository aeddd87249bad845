#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Shared CLI utilities for the trash map toolchain.
//!
//! Provides fraction-scaled `indicatif` progress bars for rendering the
//! fetcher's `[0, 1]` progress stream, plus [`init_logger`] which sets up
//! `indicatif-log-bridge` so that `log::info!` and friends are suspended
//! while progress bars redraw.
//!
//! Any binary that calls [`init_logger()`] at startup gets full progress
//! bar support for free.

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

pub use indicatif::MultiProgress;

/// Bar resolution: progress fractions are mapped onto this many
/// positions so percentages render smoothly.
const FRACTION_SCALE: u64 = 1000;

/// Creates a progress bar that renders a `[0, 1]` fraction as a
/// percentage. Drive it with [`set_fraction`].
#[must_use]
pub fn fraction_bar(multi: &MultiProgress, message: &str) -> ProgressBar {
    let bar = multi.add(ProgressBar::new(FRACTION_SCALE));
    bar.enable_steady_tick(Duration::from_millis(100));
    bar.set_style(
        ProgressStyle::with_template("{msg} {wide_bar:.cyan/dim} {percent}% [{elapsed_precise}]")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("##-"),
    );
    bar.set_message(message.to_string());
    bar
}

/// Positions a [`fraction_bar`] at `fraction` of its full length.
/// Values outside `[0, 1]` are clamped.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    clippy::cast_sign_loss
)]
pub fn set_fraction(bar: &ProgressBar, fraction: f64) {
    let clamped = fraction.clamp(0.0, 1.0);
    bar.set_position((clamped * FRACTION_SCALE as f64).round() as u64);
}

/// Initializes the global logger wrapped in `indicatif-log-bridge` so
/// that `log::info!` and friends are suspended while progress bars
/// redraw.
///
/// Returns the [`MultiProgress`] that all progress bars must be added to.
#[must_use]
pub fn init_logger() -> MultiProgress {
    let multi = MultiProgress::new();

    // The logger has to be built by hand so the bridge can wrap it
    // before registration.
    let logger = pretty_env_logger::formatted_builder()
        .parse_env("RUST_LOG")
        .build();
    let level = logger.filter();

    indicatif_log_bridge::LogWrapper::new(multi.clone(), logger)
        .try_init()
        .ok(); // A logger may already be registered (e.g., in tests).

    log::set_max_level(level);

    multi
}
