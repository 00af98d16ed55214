//! Persisted `RuntimeConfigManager` snapshots (`M500`/`M501`/`M502`/`M503`).
//!
//! Layout: block 0 is a header `{ magic: u32 = 0xB3CF9267, format_hash: u32 }`
//! where `format_hash` is a CRC-32 over the declared option
//! name+type sequence; blocks 1..K are the packed option values in
//! declaration order, each stored as a 4-byte little-endian word (the
//! variant tag isn't stored per-value — it's implied by declaration order,
//! which is what `format_hash` guards against drifting). A `format_hash`
//! mismatch means the firmware image's option tree no longer matches what
//! was saved, so the whole store is treated as invalid and the caller resets
//! to compile-time defaults rather than risk misinterpreting bytes.
//!
//! This module only deals with the in-memory byte layout; the physical
//! flash/EEPROM read/write is a board-level concern outside this crate.

use thiserror::Error;

use crate::runtime_config::{OptionDecl, OptionValue, RuntimeConfigManager};

pub const EEPROM_MAGIC: u32 = 0xB3CF_9267;

#[derive(Debug, Error, PartialEq)]
pub enum EepromError {
    #[error("store is shorter than the header")]
    Truncated,
    #[error("bad magic: expected {EEPROM_MAGIC:#010x}, found {0:#010x}")]
    BadMagic(u32),
    #[error("format hash mismatch: expected {expected:#010x}, found {found:#010x}")]
    FormatHashMismatch { expected: u32, found: u32 },
    #[error("store does not contain enough option words for the current format")]
    ShortStore,
}

/// Computes the CRC-32 (IEEE 802.3 polynomial, reflected, bit-by-bit) over
/// the declared option name+type sequence. A `const fn` so a board's
/// compile-time option tree can assert its own format hash as a constant if
/// desired.
pub const fn format_hash(declared: &[OptionDecl]) -> u32 {
    let mut crc: u32 = 0xFFFF_FFFF;
    let mut i = 0;
    while i < declared.len() {
        let name = declared[i].name.as_bytes();
        let mut j = 0;
        while j < name.len() {
            crc = crc32_update(crc, name[j]);
            j += 1;
        }
        crc = crc32_update(crc, declared[i].default.type_tag());
        i += 1;
    }
    !crc
}

const fn crc32_update(mut crc: u32, byte: u8) -> u32 {
    crc ^= byte as u32;
    let mut k = 0;
    while k < 8 {
        let mask = 0u32.wrapping_sub(crc & 1);
        crc = (crc >> 1) ^ (0xEDB8_8320 & mask);
        k += 1;
    }
    crc
}

/// An in-memory EEPROM image: a header followed by packed option words.
#[derive(Debug, Clone, Default)]
pub struct EepromConfigStore {
    bytes: Vec<u8>,
}

impl EepromConfigStore {
    /// Serializes a `RuntimeConfigManager`'s current values into a fresh
    /// store image (`M500`).
    pub fn save(manager: &RuntimeConfigManager) -> Self {
        let mut bytes = Vec::with_capacity(8 + manager.declared().len() * 4);
        bytes.extend_from_slice(&EEPROM_MAGIC.to_le_bytes());
        bytes.extend_from_slice(&format_hash(manager.declared()).to_le_bytes());
        for decl in manager.declared() {
            let value = manager.get(decl.name).expect("declared option must exist");
            bytes.extend_from_slice(&encode_word(value));
        }
        Self { bytes }
    }

    /// The raw bytes, as would be written to physical EEPROM/flash.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self { bytes: bytes.to_vec() }
    }

    /// Restores a `RuntimeConfigManager` from this store (`M501`). The
    /// manager's declared option tree must match what produced the store,
    /// verified by `format_hash`; a mismatch resets to compile-time
    /// defaults and returns the error (never silently drops values).
    pub fn load(&self, declared: &[OptionDecl]) -> Result<RuntimeConfigManager, EepromError> {
        if self.bytes.len() < 8 {
            return Err(EepromError::Truncated);
        }
        let magic = u32::from_le_bytes(self.bytes[0..4].try_into().unwrap());
        if magic != EEPROM_MAGIC {
            return Err(EepromError::BadMagic(magic));
        }
        let found_hash = u32::from_le_bytes(self.bytes[4..8].try_into().unwrap());
        let expected_hash = format_hash(declared);
        if found_hash != expected_hash {
            return Err(EepromError::FormatHashMismatch {
                expected: expected_hash,
                found: found_hash,
            });
        }
        if self.bytes.len() < 8 + declared.len() * 4 {
            return Err(EepromError::ShortStore);
        }

        let mut manager = RuntimeConfigManager::new(declared);
        for (i, decl) in declared.iter().enumerate() {
            let offset = 8 + i * 4;
            let word = u32::from_le_bytes(self.bytes[offset..offset + 4].try_into().unwrap());
            let value = decode_word(decl.default, word);
            manager
                .set(decl.name, value)
                .expect("decoded value must match declared type");
        }
        Ok(manager)
    }
}

fn encode_word(value: OptionValue) -> [u8; 4] {
    match value {
        OptionValue::F32(v) => v.to_le_bytes(),
        OptionValue::U32(v) => v.to_le_bytes(),
        OptionValue::Bool(v) => (v as u32).to_le_bytes(),
    }
}

fn decode_word(template: OptionValue, word: u32) -> OptionValue {
    match template {
        OptionValue::F32(_) => OptionValue::F32(f32::from_le_bytes(word.to_le_bytes())),
        OptionValue::U32(_) => OptionValue::U32(word),
        OptionValue::Bool(_) => OptionValue::Bool(word != 0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn declared() -> Vec<OptionDecl> {
        vec![
            OptionDecl { name: "x.max_speed", default: OptionValue::F32(300.0) },
            OptionDecl { name: "x.steps_per_unit", default: OptionValue::U32(80) },
            OptionDecl { name: "x.invert_dir", default: OptionValue::Bool(false) },
        ]
    }

    #[test]
    fn round_trips_bit_exactly() {
        let decl = declared();
        let mut manager = RuntimeConfigManager::new(&decl);
        manager.set("x.max_speed", OptionValue::F32(275.5)).unwrap();
        manager.set("x.steps_per_unit", OptionValue::U32(160)).unwrap();
        manager.set("x.invert_dir", OptionValue::Bool(true)).unwrap();

        let store = EepromConfigStore::save(&manager);
        let restored = store.load(&decl).unwrap();

        assert_eq!(restored.dump(), manager.dump());
    }

    #[test]
    fn format_hash_mismatch_is_detected() {
        let decl = declared();
        let manager = RuntimeConfigManager::new(&decl);
        let store = EepromConfigStore::save(&manager);

        let mut other_decl = decl.clone();
        other_decl.push(OptionDecl { name: "y.max_speed", default: OptionValue::F32(300.0) });

        let err = store.load(&other_decl).unwrap_err();
        assert!(matches!(err, EepromError::FormatHashMismatch { .. }));
    }

    #[test]
    fn bad_magic_is_rejected() {
        let store = EepromConfigStore::from_bytes(&[0u8; 16]);
        let err = store.load(&declared()).unwrap_err();
        assert!(matches!(err, EepromError::BadMagic(0)));
    }

    #[test]
    fn truncated_store_is_rejected() {
        let store = EepromConfigStore::from_bytes(&[1, 2, 3]);
        assert_eq!(store.load(&declared()).unwrap_err(), EepromError::Truncated);
    }
}
