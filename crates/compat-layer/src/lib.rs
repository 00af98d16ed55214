//! # Configuration Compatibility Layer
//!
//! Holds the printer's persisted configuration overlay: a runtime option
//! table addressed by name (`M925`/`M926`/`M561`/`M937`) and an EEPROM-backed
//! store for it (`M500`/`M501`/`M502`/`M503`). Both are `std`-only host/build
//! tooling concerns that sit above the `no_std` core, the way the teacher's
//! own compatibility crate sat above its motion/thermal core.

pub mod eeprom;
pub mod runtime_config;

pub use eeprom::{EepromConfigStore, EepromError};
pub use runtime_config::{OptionDecl, OptionValue, RuntimeConfigError, RuntimeConfigManager};
