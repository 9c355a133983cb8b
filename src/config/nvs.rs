//! NVS persistence for decoder thresholds with schema versioning.
//!
//! Implements versioned schema with automatic migration for forward compatibility.
//!
//! # Version History
//!
//! - **v1**: debounce, pulse and gap thresholds, sequence timeout,
//!   letter and buffer lengths
//! - **v2** (current): adds input polarity; v1 records migrate to active-low
//!
//! # Adding a Version
//!
//! 1. Increment `CURRENT_SCHEMA_VERSION`
//! 2. Write `migrate_vN_to_vN1()`
//! 3. Extend `read_current()` and `save_config()`
//! 4. Route the new step in `migrate()`
//!
//! Storage goes through [`ParamStore`] so the schema logic runs on the
//! host against an in-memory map.

use core::cmp::Ordering;

use super::{ConfigError, DecoderConfig, KnockConfig};
use crate::edge::Polarity;
use crate::pattern::Pattern;

#[cfg(target_os = "espidf")]
use esp_idf_svc::nvs::{EspDefaultNvsPartition, EspNvs, NvsDefault};
#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::EspError;

/// Current NVS schema version for decoder thresholds
pub const CURRENT_SCHEMA_VERSION: u32 = 2;

/// NVS namespace for decoder configuration
pub const NVS_NAMESPACE: &str = "knock_cfg";

const VERSION_KEY: &str = "schema_ver";
const DEBOUNCE_KEY: &str = "debounce";
const DOT_MAX_KEY: &str = "dot_max";
const DASH_MAX_KEY: &str = "dash_max";
const INTRA_GAP_KEY: &str = "intra_max";
const LETTER_GAP_KEY: &str = "letter_max";
const WORD_GAP_KEY: &str = "word_max";
const TIMEOUT_KEY: &str = "seq_timeout";
const MAX_CODE_KEY: &str = "max_code";
const MAX_BUFFER_KEY: &str = "max_buf";
const POLARITY_KEY: &str = "polarity";

/// Migration result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationResult {
    /// Fresh install, no migration needed (using defaults)
    FreshInstall,
    /// Schema up-to-date, loaded successfully
    UpToDate,
    /// Migrated from older version
    Migrated { from_version: u32, to_version: u32 },
}

/// NVS operation errors
#[derive(Debug)]
pub enum NvsError {
    /// NVS initialization failed
    #[cfg(target_os = "espidf")]
    InitFailed(EspError),
    /// Schema version too new (downgrade not supported)
    TooNew { stored_version: u32 },
    /// NVS read/write error
    #[cfg(target_os = "espidf")]
    IoError(EspError),
    /// Unsupported migration path
    UnsupportedMigration { from: u32, to: u32 },
    /// Stored value outside its encoding
    InvalidValue { key: &'static str, value: u32 },
    /// Feature not available on this platform
    #[cfg(not(target_os = "espidf"))]
    NotAvailable,
}

#[cfg(target_os = "espidf")]
impl From<EspError> for NvsError {
    fn from(e: EspError) -> Self {
        NvsError::IoError(e)
    }
}

/// Key/value storage the schema is written to.
pub trait ParamStore {
    fn get_u32(&self, key: &str) -> Result<Option<u32>, NvsError>;
    fn set_u32(&mut self, key: &str, value: u32) -> Result<(), NvsError>;
    fn get_u8(&self, key: &str) -> Result<Option<u8>, NvsError>;
    fn set_u8(&mut self, key: &str, value: u8) -> Result<(), NvsError>;
}

#[cfg(target_os = "espidf")]
impl ParamStore for EspNvs<NvsDefault> {
    fn get_u32(&self, key: &str) -> Result<Option<u32>, NvsError> {
        Ok(EspNvs::get_u32(self, key)?)
    }

    fn set_u32(&mut self, key: &str, value: u32) -> Result<(), NvsError> {
        Ok(EspNvs::set_u32(self, key, value)?)
    }

    fn get_u8(&self, key: &str) -> Result<Option<u8>, NvsError> {
        Ok(EspNvs::get_u8(self, key)?)
    }

    fn set_u8(&mut self, key: &str, value: u8) -> Result<(), NvsError> {
        Ok(EspNvs::set_u8(self, key, value)?)
    }
}

/// Open the decoder namespace on the default NVS partition.
#[cfg(target_os = "espidf")]
pub fn open_default_store() -> Result<EspNvs<NvsDefault>, NvsError> {
    let partition = EspDefaultNvsPartition::take().map_err(NvsError::InitFailed)?;
    EspNvs::new(partition, NVS_NAMESPACE, true).map_err(NvsError::InitFailed)
}

/// Stub for non-ESP platforms
#[cfg(not(target_os = "espidf"))]
pub fn open_default_store() -> Result<NoStore, NvsError> {
    Err(NvsError::NotAvailable)
}

/// Placeholder store type on platforms without NVS. Never constructed.
#[cfg(not(target_os = "espidf"))]
pub enum NoStore {}

#[cfg(not(target_os = "espidf"))]
impl ParamStore for NoStore {
    fn get_u32(&self, _key: &str) -> Result<Option<u32>, NvsError> {
        match *self {}
    }

    fn set_u32(&mut self, _key: &str, _value: u32) -> Result<(), NvsError> {
        match *self {}
    }

    fn get_u8(&self, _key: &str) -> Result<Option<u8>, NvsError> {
        match *self {}
    }

    fn set_u8(&mut self, _key: &str, _value: u8) -> Result<(), NvsError> {
        match *self {}
    }
}

/// Load thresholds with automatic migration.
///
/// Values are returned as stored; they are not validated here. Keys
/// missing from an otherwise valid record keep their default.
///
/// # Returns
///
/// - `Ok((config, MigrationResult))`: load successful (may have migrated)
/// - `Err(NvsError::TooNew)`: schema version too new (downgrade not supported)
/// - `Err(NvsError)`: other NVS errors
pub fn load_config<S: ParamStore + ?Sized>(
    store: &mut S,
) -> Result<(DecoderConfig, MigrationResult), NvsError> {
    let stored_version = store.get_u32(VERSION_KEY)?.unwrap_or(0);

    match stored_version.cmp(&CURRENT_SCHEMA_VERSION) {
        Ordering::Equal => Ok((read_current(store)?, MigrationResult::UpToDate)),
        Ordering::Less if stored_version == 0 => {
            Ok((DecoderConfig::default(), MigrationResult::FreshInstall))
        }
        Ordering::Less => {
            migrate(store, stored_version, CURRENT_SCHEMA_VERSION)?;
            Ok((
                read_current(store)?,
                MigrationResult::Migrated {
                    from_version: stored_version,
                    to_version: CURRENT_SCHEMA_VERSION,
                },
            ))
        }
        Ordering::Greater => Err(NvsError::TooNew { stored_version }),
    }
}

/// Save thresholds with the current version stamp.
pub fn save_config<S: ParamStore + ?Sized>(
    store: &mut S,
    config: &DecoderConfig,
) -> Result<(), NvsError> {
    store.set_u32(VERSION_KEY, CURRENT_SCHEMA_VERSION)?;
    write_v1_fields(store, config)?;
    store.set_u8(POLARITY_KEY, encode_polarity(config.polarity))?;
    Ok(())
}

/// Where the configuration handed to the decoder came from.
#[derive(Debug)]
pub enum LoadReport {
    /// Stored values loaded and valid.
    Stored(MigrationResult),
    /// Storage unreadable; defaults used.
    StorageFailed(NvsError),
    /// Stored values inconsistent; defaults used.
    InvalidStored(ConfigError),
}

/// Load, re-validate against `patterns`, and fall back to defaults.
///
/// Fails only when the defaults themselves are rejected, i.e. the
/// pattern list is unusable.
pub fn load_or_default<'p, S: ParamStore + ?Sized>(
    store: &mut S,
    patterns: &'p [Pattern],
) -> Result<(KnockConfig<'p>, LoadReport), ConfigError> {
    let (stored, result) = match load_config(store) {
        Ok(loaded) => loaded,
        Err(e) => {
            let config = KnockConfig::new(DecoderConfig::default(), patterns)?;
            return Ok((config, LoadReport::StorageFailed(e)));
        }
    };

    match KnockConfig::new(stored, patterns) {
        Ok(config) => Ok((config, LoadReport::Stored(result))),
        Err(e) => {
            let config = KnockConfig::new(DecoderConfig::default(), patterns)?;
            Ok((config, LoadReport::InvalidStored(e)))
        }
    }
}

// ========================================
// Current Schema Load/Save
// ========================================

fn read_current<S: ParamStore + ?Sized>(store: &S) -> Result<DecoderConfig, NvsError> {
    let mut config = read_v1_fields(store)?;
    if let Some(raw) = store.get_u8(POLARITY_KEY)? {
        config.polarity = decode_polarity(raw)?;
    }
    Ok(config)
}

fn read_v1_fields<S: ParamStore + ?Sized>(store: &S) -> Result<DecoderConfig, NvsError> {
    let mut config = DecoderConfig::default();

    let u32_fields = [
        (DEBOUNCE_KEY, &mut config.debounce_ms),
        (DOT_MAX_KEY, &mut config.dot_max_ms),
        (DASH_MAX_KEY, &mut config.dash_max_ms),
        (INTRA_GAP_KEY, &mut config.intra_symbol_gap_max_ms),
        (LETTER_GAP_KEY, &mut config.letter_gap_max_ms),
        (WORD_GAP_KEY, &mut config.word_gap_max_ms),
        (TIMEOUT_KEY, &mut config.sequence_timeout_ms),
    ];
    for (key, field) in u32_fields {
        if let Some(value) = store.get_u32(key)? {
            *field = value;
        }
    }

    if let Some(value) = store.get_u8(MAX_CODE_KEY)? {
        config.max_letter_code_length = value;
    }
    if let Some(value) = store.get_u8(MAX_BUFFER_KEY)? {
        config.max_buffer_length = value;
    }

    Ok(config)
}

fn write_v1_fields<S: ParamStore + ?Sized>(
    store: &mut S,
    config: &DecoderConfig,
) -> Result<(), NvsError> {
    store.set_u32(DEBOUNCE_KEY, config.debounce_ms)?;
    store.set_u32(DOT_MAX_KEY, config.dot_max_ms)?;
    store.set_u32(DASH_MAX_KEY, config.dash_max_ms)?;
    store.set_u32(INTRA_GAP_KEY, config.intra_symbol_gap_max_ms)?;
    store.set_u32(LETTER_GAP_KEY, config.letter_gap_max_ms)?;
    store.set_u32(WORD_GAP_KEY, config.word_gap_max_ms)?;
    store.set_u32(TIMEOUT_KEY, config.sequence_timeout_ms)?;
    store.set_u8(MAX_CODE_KEY, config.max_letter_code_length)?;
    store.set_u8(MAX_BUFFER_KEY, config.max_buffer_length)?;
    Ok(())
}

fn encode_polarity(polarity: Polarity) -> u8 {
    match polarity {
        Polarity::ActiveHigh => 0,
        Polarity::ActiveLow => 1,
    }
}

fn decode_polarity(raw: u8) -> Result<Polarity, NvsError> {
    match raw {
        0 => Ok(Polarity::ActiveHigh),
        1 => Ok(Polarity::ActiveLow),
        _ => Err(NvsError::InvalidValue {
            key: POLARITY_KEY,
            value: raw as u32,
        }),
    }
}

// ========================================
// Migration Logic
// ========================================

fn migrate<S: ParamStore + ?Sized>(
    store: &mut S,
    from_version: u32,
    to_version: u32,
) -> Result<(), NvsError> {
    match (from_version, to_version) {
        (1, 2) => migrate_v1_to_v2(store)?,
        _ => {
            return Err(NvsError::UnsupportedMigration {
                from: from_version,
                to: to_version,
            });
        }
    }

    store.set_u32(VERSION_KEY, to_version)?;
    Ok(())
}

/// v1 boards were all wired with a pull-up and an open-collector bell output.
fn migrate_v1_to_v2<S: ParamStore + ?Sized>(store: &mut S) -> Result<(), NvsError> {
    store.set_u8(POLARITY_KEY, encode_polarity(Polarity::ActiveLow))
}
