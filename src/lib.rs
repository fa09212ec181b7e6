//! Capacity-expansion optimisation for hybrid electric and thermal micro-energy systems.
//!
//! A model describes the candidate technologies of a system, the demand it must serve and the
//! renewable yield it can draw on, over several equally structured scenarios. The optimiser sizes
//! every technology so that the probability-weighted net present cost is minimal.
#![warn(missing_docs)]
use dirs::config_dir;
use std::path::PathBuf;

pub mod cli;
pub mod finance;
pub mod index;
pub mod input;
pub mod log;
pub mod model;
pub mod optimisation;
pub mod output;
pub mod settings;
pub mod units;

#[cfg(test)]
mod fixture;

/// Get config dir for program.
///
/// This is a subfolder of the user's standard configuration directory.
pub fn get_config_dir() -> PathBuf {
    let mut path = config_dir().unwrap_or_default();
    path.push("mes-sizing");
    path
}
