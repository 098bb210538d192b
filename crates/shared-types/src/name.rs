//! # Names
//!
//! Account and action names are packed into a `u64`: up to 12 characters of
//! 5 bits each, plus a 13th character of 4 bits.
//!
//! ## Charset
//!
//! `.12345abcdefghijklmnopqrstuvwxyz`, where `.` is the zero symbol. The 13th
//! character is limited to `.12345abcdefghij`.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Maximum number of characters in a name.
pub const MAX_NAME_LEN: usize = 13;

const CHARMAP: &[u8; 32] = b".12345abcdefghijklmnopqrstuvwxyz";

/// Errors produced while parsing a name from text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NameError {
    /// More than 13 characters.
    #[error("name {0:?} is longer than 13 characters")]
    TooLong(String),

    /// A character outside the name charset.
    #[error("invalid character {ch:?} in name {name:?}")]
    InvalidCharacter { name: String, ch: char },

    /// The 13th character does not fit in 4 bits.
    #[error("13th character of name {0:?} must be one of .12345abcdefghij")]
    InvalidThirteenthChar(String),

    /// Text does not round-trip (e.g. trailing dots).
    #[error("name {0:?} is not normalized")]
    NotNormalized(String),
}

/// A packed account or action name.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Name(u64);

impl Name {
    /// The empty name (value 0).
    pub const EMPTY: Name = Name(0);

    /// Wrap a raw packed value.
    pub const fn from_u64(value: u64) -> Self {
        Self(value)
    }

    /// The raw packed value.
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// True for the empty name.
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

fn char_to_symbol(ch: char) -> Option<u64> {
    match ch {
        'a'..='z' => Some(ch as u64 - 'a' as u64 + 6),
        '1'..='5' => Some(ch as u64 - '1' as u64 + 1),
        '.' => Some(0),
        _ => None,
    }
}

impl FromStr for Name {
    type Err = NameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() > MAX_NAME_LEN {
            return Err(NameError::TooLong(s.to_string()));
        }

        let mut value = 0u64;
        for (i, ch) in s.chars().enumerate() {
            let symbol = char_to_symbol(ch).ok_or_else(|| NameError::InvalidCharacter {
                name: s.to_string(),
                ch,
            })?;

            if i < MAX_NAME_LEN - 1 {
                value |= (symbol & 0x1f) << (64 - 5 * (i + 1));
            } else {
                if symbol > 0x0f {
                    return Err(NameError::InvalidThirteenthChar(s.to_string()));
                }
                value |= symbol;
            }
        }

        let name = Name(value);
        if name.to_string() != s {
            return Err(NameError::NotNormalized(s.to_string()));
        }
        Ok(name)
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut text = [b'.'; MAX_NAME_LEN];
        let mut tmp = self.0;
        for i in 0..MAX_NAME_LEN {
            let (mask, shift) = if i == 0 { (0x0f, 4) } else { (0x1f, 5) };
            text[MAX_NAME_LEN - 1 - i] = CHARMAP[(tmp & mask) as usize];
            tmp >>= shift;
        }

        let rendered: String = text.iter().map(|&b| b as char).collect();
        f.write_str(rendered.trim_end_matches('.'))
    }
}

impl fmt::Debug for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Name({:?})", self.to_string())
    }
}

impl Serialize for Name {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Name {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}
