//! GST identification number (GSTIN).
//!
//! A GSTIN is 15 characters: a two digit state code, the holder's 10
//! character PAN, an entity number, the literal `Z` and a mod-36 check
//! character.

use core::fmt;

use serde::{Deserialize, Serialize};

const ALPHABET: &[u8; 36] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Errors that can occur when parsing a [`Gstin`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum GstinError {
    #[error("GSTIN must be exactly 15 characters (got {0})")]
    Length(usize),
    #[error("GSTIN state code must be two digits between 01 and 38 or 97")]
    StateCode,
    #[error("GSTIN PAN segment is malformed")]
    Pan,
    #[error("GSTIN entity number must be alphanumeric")]
    EntityNumber,
    #[error("GSTIN 14th character must be 'Z'")]
    MissingZ,
    #[error("GSTIN check character mismatch (expected {expected})")]
    Checksum { expected: char },
}

/// A validated GSTIN, stored upper-cased.
///
/// ```
/// use bazaar_core::Gstin;
///
/// let gstin = Gstin::parse("27aapfu0939f1zv").unwrap();
/// assert_eq!(gstin.state_code(), "27");
/// assert!(Gstin::parse("27AAPFU0939F1ZA").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Gstin(String);

impl Gstin {
    /// Parse and validate a GSTIN, including its check character.
    ///
    /// # Errors
    ///
    /// Returns a [`GstinError`] naming the first segment that fails validation.
    pub fn parse(s: &str) -> Result<Self, GstinError> {
        let value = s.trim().to_ascii_uppercase();
        let bytes = value.as_bytes();
        if bytes.len() != 15 {
            return Err(GstinError::Length(value.chars().count()));
        }

        let state: u8 = value
            .get(0..2)
            .filter(|code| code.bytes().all(|b| b.is_ascii_digit()))
            .and_then(|code| code.parse().ok())
            .ok_or(GstinError::StateCode)?;
        if !(1..=38).contains(&state) && state != 97 {
            return Err(GstinError::StateCode);
        }

        let pan_ok = bytes.get(2..7).is_some_and(|s| s.iter().all(u8::is_ascii_uppercase))
            && bytes.get(7..11).is_some_and(|s| s.iter().all(u8::is_ascii_digit))
            && bytes.get(11).is_some_and(u8::is_ascii_uppercase);
        if !pan_ok {
            return Err(GstinError::Pan);
        }

        if !bytes.get(12).is_some_and(u8::is_ascii_alphanumeric) {
            return Err(GstinError::EntityNumber);
        }

        if bytes.get(13) != Some(&b'Z') {
            return Err(GstinError::MissingZ);
        }

        let expected = check_character(bytes.get(..14).unwrap_or_default())
            .ok_or(GstinError::Checksum { expected: '?' })?;
        if bytes.get(14).copied() != Some(expected) {
            return Err(GstinError::Checksum {
                expected: char::from(expected),
            });
        }

        Ok(Self(value))
    }

    /// The two digit state code, used to decide intra- vs inter-state supply.
    #[must_use]
    pub fn state_code(&self) -> &str {
        self.0.get(0..2).unwrap_or_default()
    }

    /// The embedded PAN of the registered holder.
    #[must_use]
    pub fn pan(&self) -> &str {
        self.0.get(2..12).unwrap_or_default()
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Compute the mod-36 check character over the first 14 characters.
fn check_character(body: &[u8]) -> Option<u8> {
    let mut sum = 0usize;
    for (i, byte) in body.iter().enumerate() {
        let value = ALPHABET.iter().position(|c| c == byte)?;
        let factor = if i % 2 == 0 { 1 } else { 2 };
        let product = value * factor;
        sum += product / 36 + product % 36;
    }
    ALPHABET.get((36 - sum % 36) % 36).copied()
}

impl fmt::Display for Gstin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for Gstin {
    type Err = GstinError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Gstin {
    type Error = GstinError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Gstin> for String {
    fn from(gstin: Gstin) -> Self {
        gstin.0
    }
}
