//! Runtime configuration overlay.
//!
//! The firmware's tuning values are resolved into concrete types at compile
//! time (per-axis steps-per-unit, limits, PID gains, ...), but a handful of
//! G-codes (`M925`/`M926` to get/set a runtime option, `M561` to reset bed
//! correction, `M937` to report it) need to read and mutate a subset of that
//! tree at runtime, addressed by name rather than by field access. This
//! module is that overlay: a flat, case-insensitive name -> value table that
//! starts out populated with the compile-time defaults and can be persisted
//! through [`crate::eeprom::EepromConfigStore`].

use std::collections::BTreeMap;

use thiserror::Error;

/// A single overlay-able option value. Kept intentionally small: the
/// runtime surface only ever needs floats (speeds, distances, PID gains),
/// integers (step counts, pin numbers already resolved to indices) and
/// flags (invert_dir, enabled).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OptionValue {
    F32(f32),
    U32(u32),
    Bool(bool),
}

impl OptionValue {
    /// A single-byte tag identifying the variant, used both for the wire
    /// encoding in [`crate::eeprom`] and for the format hash.
    pub fn type_tag(&self) -> u8 {
        match self {
            OptionValue::F32(_) => 0,
            OptionValue::U32(_) => 1,
            OptionValue::Bool(_) => 2,
        }
    }

    pub fn as_f32(&self) -> Option<f32> {
        match self {
            OptionValue::F32(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_u32(&self) -> Option<u32> {
        match self {
            OptionValue::U32(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            OptionValue::Bool(v) => Some(*v),
            _ => None,
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum RuntimeConfigError {
    #[error("unknown runtime option '{0}'")]
    UnknownOption(String),
    #[error("option '{name}' is a {expected:?}, not compatible with the supplied value")]
    TypeMismatch { name: String, expected: u8 },
}

/// A declaration of one option's name and default value, as produced by the
/// compile-time configuration tree. Option names are matched
/// case-insensitively; they're declared upper/lower as written in firmware
/// source for readability, but stored normalized to lowercase.
#[derive(Debug, Clone, Copy)]
pub struct OptionDecl {
    pub name: &'static str,
    pub default: OptionValue,
}

/// The runtime configuration overlay: a name-addressed table of mutable
/// values, seeded from the declarative option tree and optionally restored
/// from an `EepromConfigStore` snapshot.
#[derive(Debug, Clone)]
pub struct RuntimeConfigManager {
    // Declaration order is preserved (BTreeMap sorts by key, which is the
    // lowercase name; `declared` keeps the original order for format-hash
    // and EEPROM offset computation).
    declared: Vec<OptionDecl>,
    values: BTreeMap<String, OptionValue>,
}

impl RuntimeConfigManager {
    /// Builds a manager from the compile-time option tree, each entry's
    /// current value initialized to its default.
    pub fn new(declared: &[OptionDecl]) -> Self {
        let declared: Vec<OptionDecl> = declared.to_vec();
        let values = declared
            .iter()
            .map(|d| (d.name.to_ascii_lowercase(), d.default))
            .collect();
        Self { declared, values }
    }

    /// The options in their compile-time declaration order, used to compute
    /// the EEPROM format hash and packed-value offsets.
    pub fn declared(&self) -> &[OptionDecl] {
        &self.declared
    }

    /// `M925` — get a runtime option by name (case-insensitive).
    pub fn get(&self, name: &str) -> Result<OptionValue, RuntimeConfigError> {
        self.values
            .get(&name.to_ascii_lowercase())
            .copied()
            .ok_or_else(|| RuntimeConfigError::UnknownOption(name.to_string()))
    }

    /// `M926` — set a runtime option by name (case-insensitive). The new
    /// value must be the same variant as the option's declared default.
    pub fn set(&mut self, name: &str, value: OptionValue) -> Result<(), RuntimeConfigError> {
        let key = name.to_ascii_lowercase();
        let current = self
            .values
            .get(&key)
            .ok_or_else(|| RuntimeConfigError::UnknownOption(name.to_string()))?;
        if current.type_tag() != value.type_tag() {
            return Err(RuntimeConfigError::TypeMismatch {
                name: name.to_string(),
                expected: current.type_tag(),
            });
        }
        self.values.insert(key, value);
        Ok(())
    }

    /// `M502` — discard the overlay and restore every option to its
    /// compile-time default.
    pub fn reset_to_defaults(&mut self) {
        self.values = self
            .declared
            .iter()
            .map(|d| (d.name.to_ascii_lowercase(), d.default))
            .collect();
    }

    /// `M503` — dump the current values in declaration order, e.g. for a
    /// human-readable report or before handing off to `EepromConfigStore`.
    pub fn dump(&self) -> Vec<(&'static str, OptionValue)> {
        self.declared
            .iter()
            .map(|d| (d.name, self.values[&d.name.to_ascii_lowercase()]))
            .collect()
    }

    /// `M561` — reset the subset of options whose names start with the
    /// given prefix (used for the bed-correction coefficients `bed.c0`,
    /// `bed.cx`, `bed.cy`, `bed.cxx`, `bed.cxy`, `bed.cyy`) to their
    /// defaults, without touching the rest of the overlay.
    pub fn reset_prefixed(&mut self, prefix: &str) {
        let prefix = prefix.to_ascii_lowercase();
        for decl in &self.declared {
            let key = decl.name.to_ascii_lowercase();
            if key.starts_with(&prefix) {
                self.values.insert(key, decl.default);
            }
        }
    }
}
