// src/utils/status_vocabulary.rs
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::LazyLock;
use thiserror::Error;

use crate::models::status::{
    BookingStatus, ParsedStatus, PaymentStatus, RideStatus, normalize_status,
};

/// Vocabulary version shipped with the crate.
pub const BUILTIN_VERSION: u32 = 1;

const BUILTIN_RIDE: &[(&str, RideStatus)] = &[
    ("scheduled", RideStatus::Scheduled),
    ("created", RideStatus::Scheduled),
    ("in_progress", RideStatus::InProgress),
    ("ongoing", RideStatus::InProgress),
    ("started", RideStatus::InProgress),
    ("payment_pending", RideStatus::PaymentPending),
    ("completed", RideStatus::Completed),
    ("cancelled", RideStatus::Cancelled),
    ("canceled", RideStatus::Cancelled),
];

const BUILTIN_BOOKING: &[(&str, BookingStatus)] = &[
    ("pending", BookingStatus::Pending),
    ("confirmed", BookingStatus::Confirmed),
    ("accepted", BookingStatus::Accepted),
    ("rejected", BookingStatus::Rejected),
    ("declined", BookingStatus::Rejected),
    ("cancelled", BookingStatus::Cancelled),
    ("canceled", BookingStatus::Cancelled),
    ("completed", BookingStatus::Completed),
];

const BUILTIN_PAYMENT: &[(&str, PaymentStatus)] = &[
    ("pending", PaymentStatus::Pending),
    ("partial", PaymentStatus::Partial),
    ("partially_paid", PaymentStatus::Partial),
    ("failed", PaymentStatus::Failed),
    ("paid", PaymentStatus::Paid),
    ("completed", PaymentStatus::Completed),
    ("refunded", PaymentStatus::Refunded),
];

static BUILTIN: LazyLock<StatusVocabulary> = LazyLock::new(StatusVocabulary::builtin);

#[derive(Debug, Error)]
pub enum VocabularyError {
    #[error("failed to read vocabulary file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse vocabulary: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("unsupported vocabulary version {0}")]
    UnsupportedVersion(u32),

    #[error("blank status key in {table} table")]
    BlankKey { table: &'static str },

    #[error("status '{key}' maps to two different values in {table} table")]
    Conflict { table: &'static str, key: String },
}

/// Wire form of a vocabulary file.
#[derive(Debug, Serialize, Deserialize)]
struct VocabularyFile {
    version: u32,
    #[serde(default)]
    ride: HashMap<String, RideStatus>,
    #[serde(default)]
    booking: HashMap<String, BookingStatus>,
    #[serde(default)]
    payment: HashMap<String, PaymentStatus>,
}

/// Versioned mapping from raw backend status strings to canonical enums.
///
/// Keys are stored normalized (see [`normalize_status`]), so lookups are
/// insensitive to case, surrounding whitespace and `-`/space separators.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusVocabulary {
    version: u32,
    ride: HashMap<String, RideStatus>,
    booking: HashMap<String, BookingStatus>,
    payment: HashMap<String, PaymentStatus>,
}

impl Default for StatusVocabulary {
    fn default() -> Self {
        BUILTIN.clone()
    }
}

impl StatusVocabulary {
    pub fn builtin() -> Self {
        fn table<T: Copy>(entries: &[(&str, T)]) -> HashMap<String, T> {
            entries.iter().map(|(k, v)| (k.to_string(), *v)).collect()
        }

        Self {
            version: BUILTIN_VERSION,
            ride: table(BUILTIN_RIDE),
            booking: table(BUILTIN_BOOKING),
            payment: table(BUILTIN_PAYMENT),
        }
    }

    /// Shared instance of the built-in vocabulary.
    pub fn builtin_ref() -> &'static StatusVocabulary {
        &BUILTIN
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    /// Parse a vocabulary document. Tables the document omits fall back to
    /// the built-in entries; tables it provides replace them entirely.
    pub fn from_json_str(json: &str) -> Result<Self, VocabularyError> {
        let file: VocabularyFile = serde_json::from_str(json)?;
        if file.version == 0 || file.version > BUILTIN_VERSION {
            return Err(VocabularyError::UnsupportedVersion(file.version));
        }

        let builtin = Self::builtin();
        Ok(Self {
            version: file.version,
            ride: normalize_table("ride", file.ride)?.unwrap_or(builtin.ride),
            booking: normalize_table("booking", file.booking)?.unwrap_or(builtin.booking),
            payment: normalize_table("payment", file.payment)?.unwrap_or(builtin.payment),
        })
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, VocabularyError> {
        let path = path.as_ref();
        tracing::info!("Loading status vocabulary from {}", path.display());
        let json = std::fs::read_to_string(path)?;
        let vocabulary = Self::from_json_str(&json)?;
        tracing::debug!(
            "Status vocabulary v{} loaded: {} ride, {} booking, {} payment entries",
            vocabulary.version,
            vocabulary.ride.len(),
            vocabulary.booking.len(),
            vocabulary.payment.len()
        );
        Ok(vocabulary)
    }

    pub fn ride_status(&self, raw: Option<&str>) -> ParsedStatus<RideStatus> {
        lookup(&self.ride, raw)
    }

    pub fn booking_status(&self, raw: Option<&str>) -> ParsedStatus<BookingStatus> {
        lookup(&self.booking, raw)
    }

    pub fn payment_status(&self, raw: Option<&str>) -> ParsedStatus<PaymentStatus> {
        lookup(&self.payment, raw)
    }
}

fn lookup<T: Copy>(table: &HashMap<String, T>, raw: Option<&str>) -> ParsedStatus<T> {
    match raw.and_then(normalize_status) {
        None => ParsedStatus::Missing,
        Some(key) => match table.get(&key) {
            Some(status) => ParsedStatus::Known(*status),
            None => ParsedStatus::Unrecognized(key),
        },
    }
}

fn normalize_table<T: Copy + PartialEq>(
    table: &'static str,
    raw: HashMap<String, T>,
) -> Result<Option<HashMap<String, T>>, VocabularyError> {
    if raw.is_empty() {
        return Ok(None);
    }

    let mut normalized = HashMap::with_capacity(raw.len());
    for (key, value) in raw {
        let key = normalize_status(&key).ok_or(VocabularyError::BlankKey { table })?;
        if let Some(previous) = normalized.insert(key.clone(), value) {
            if previous != value {
                return Err(VocabularyError::Conflict { table, key });
            }
        }
    }
    Ok(Some(normalized))
}
