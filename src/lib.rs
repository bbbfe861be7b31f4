//! Appraisal of urban and agricultural investments at a geographic site.
//!
//! A request describes an area, an investment and any samples of activity in the area. The
//! [`analysis::Analyser`] turns it into scores, yield forecasts, return-on-investment scenarios,
//! risks and recommendations.
#![warn(missing_docs)]
use std::path::PathBuf;

pub mod agriculture;
pub mod analysis;
pub mod calibration;
pub mod cli;
pub mod error;
pub mod estimator;
pub mod finance;
pub mod geometry;
pub mod id;
pub mod input;
pub mod log;
pub mod output;
pub mod risk;
pub mod sample;
pub mod settings;
pub mod synthetic;
pub mod units;
pub mod urban;

#[cfg(test)]
mod fixture;

/// Get the folder where program configuration files are stored
pub fn get_config_dir() -> PathBuf {
    let Some(mut config_dir) = dirs::config_dir() else {
        // No config dir on this platform, so fall back to the working directory
        return PathBuf::new();
    };
    config_dir.push("siteval");
    config_dir
}
