//! Feature levels.
//!
//! A feature level is a monotonically increasing capability tier. An engine is
//! created for exactly one level, and only node kinds and file contents of that
//! level are accepted by it.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The capability tier an engine or a saved file was created for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum FeatureLevel {
    #[default]
    Level01,
    Level02,
}

impl FeatureLevel {
    /// All known levels, ascending.
    pub const ALL: [FeatureLevel; 2] = [FeatureLevel::Level01, FeatureLevel::Level02];

    /// Returns the highest level this build understands.
    pub fn latest() -> Self {
        FeatureLevel::Level02
    }

    /// Returns the numeric value (1, 2, ...).
    pub fn as_u8(self) -> u8 {
        match self {
            FeatureLevel::Level01 => 1,
            FeatureLevel::Level02 => 2,
        }
    }

    /// Maps a numeric value back to a known level.
    pub fn from_raw(raw: u32) -> Option<Self> {
        match raw {
            1 => Some(FeatureLevel::Level01),
            2 => Some(FeatureLevel::Level02),
            _ => None,
        }
    }

    /// The two ASCII digits used as the tag in a file identifier.
    pub fn tag(self) -> [u8; 2] {
        let n = self.as_u8();
        [b'0' + n / 10, b'0' + n % 10]
    }

    /// Parses a two-digit tag into its numeric value, known or not.
    ///
    /// Returns `None` if either byte is not an ASCII digit.
    pub fn parse_tag(tag: [u8; 2]) -> Option<u8> {
        if tag.iter().all(u8::is_ascii_digit) {
            Some((tag[0] - b'0') * 10 + (tag[1] - b'0'))
        } else {
            None
        }
    }
}

impl fmt::Display for FeatureLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}", self.as_u8())
    }
}
