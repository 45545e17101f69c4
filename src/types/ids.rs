//! Document identifiers.
//!
//! A [`DocumentId`] is 12 bytes laid out like a document-database object id:
//! 4 bytes of big-endian Unix seconds, 5 bytes chosen once per process, and a
//! 3-byte big-endian counter. The wire form is 24 lowercase hex characters.

use once_cell::sync::Lazy;
use rand::Rng;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Byte length of a [`DocumentId`]
pub const DOCUMENT_ID_LENGTH: usize = 12;

/// Length of the hex wire form
pub const DOCUMENT_ID_HEX_LENGTH: usize = DOCUMENT_ID_LENGTH * 2;

static PROCESS_UNIQUE: Lazy<[u8; 5]> = Lazy::new(|| {
    let mut bytes = [0u8; 5];
    rand::rng().fill(&mut bytes[..]);
    bytes
});

static COUNTER: Lazy<AtomicU32> = Lazy::new(|| AtomicU32::new(rand::rng().random_range(0..0x00ff_ffff)));

/// Store-assigned document identifier
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DocumentId([u8; DOCUMENT_ID_LENGTH]);

/// Why a string was rejected as a [`DocumentId`]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseIdError {
    /// Wrong number of characters
    #[error("document id must be 24 hex characters, got {0}")]
    Length(usize),
    /// Non-hex characters
    #[error("document id must be hexadecimal")]
    NotHex,
}

impl DocumentId {
    /// Create an id from raw bytes
    pub fn from_bytes(bytes: [u8; DOCUMENT_ID_LENGTH]) -> Self {
        DocumentId(bytes)
    }

    /// Get the underlying bytes
    pub fn as_bytes(&self) -> &[u8; DOCUMENT_ID_LENGTH] {
        &self.0
    }

    /// Generate a fresh id. Ids generated by one process never repeat until
    /// the 24-bit counter wraps within a single second.
    pub fn generate() -> Self {
        let secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as u32)
            .unwrap_or(0);
        let count = COUNTER.fetch_add(1, Ordering::Relaxed) & 0x00ff_ffff;

        let mut bytes = [0u8; DOCUMENT_ID_LENGTH];
        bytes[0..4].copy_from_slice(&secs.to_be_bytes());
        bytes[4..9].copy_from_slice(&*PROCESS_UNIQUE);
        bytes[9..12].copy_from_slice(&count.to_be_bytes()[1..]);
        DocumentId(bytes)
    }

    /// Seconds since the epoch at which this id was generated
    pub fn timestamp(&self) -> u32 {
        u32::from_be_bytes([self.0[0], self.0[1], self.0[2], self.0[3]])
    }

    /// Hex wire form
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for DocumentId {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != DOCUMENT_ID_HEX_LENGTH {
            return Err(ParseIdError::Length(s.len()));
        }

        let mut bytes = [0u8; DOCUMENT_ID_LENGTH];
        hex::decode_to_slice(s, &mut bytes).map_err(|_| ParseIdError::NotHex)?;
        Ok(DocumentId(bytes))
    }
}

impl Serialize for DocumentId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for DocumentId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
