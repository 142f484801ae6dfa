//! The container descriptor at the front of every saved file.
//!
//! ```text
//! [2-byte product prefix "rl"][2 ASCII digits: feature-level tag]
//! [host-engine version][engine-of-record version]
//! [u8 feature-level enumerator]
//! ```
//!
//! A version is `major`, `minor`, `patch` as `u32` followed by a
//! length-prefixed label. The tag and the enumerator both encode the feature
//! level; load checks each of them on its own.

use std::fmt;

use serde::{Deserialize, Serialize};

use relogic_core::FeatureLevel;

use crate::bytes::{ByteReader, ByteWriter};
use crate::error::StorageError;

/// Leading bytes of every container this product writes.
pub const PRODUCT_PREFIX: [u8; 2] = *b"rl";

/// Length of the identifier: product prefix plus the two-digit tag.
pub const IDENTIFIER_LEN: usize = 4;

/// A `major.minor.patch` triple with a free-form label.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Version {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
    #[serde(default)]
    pub label: String,
}

impl Version {
    pub fn new(major: u32, minor: u32, patch: u32, label: impl Into<String>) -> Self {
        Version {
            major,
            minor,
            patch,
            label: label.into(),
        }
    }

    pub(crate) fn write(&self, w: &mut ByteWriter) -> Result<(), StorageError> {
        w.u32(self.major);
        w.u32(self.minor);
        w.u32(self.patch);
        w.str(&self.label)
    }

    pub(crate) fn read(r: &mut ByteReader<'_>) -> Result<Self, StorageError> {
        Ok(Version {
            major: r.u32()?,
            minor: r.u32()?,
            patch: r.u32()?,
            label: r.str()?.to_string(),
        })
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;
        if !self.label.is_empty() {
            write!(f, "-{}", self.label)?;
        }
        Ok(())
    }
}

/// Decoded container descriptor.
///
/// Fields hold what the file says, not what it should say; the load pipeline
/// decides whether they are acceptable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    /// The two bytes following the product prefix.
    pub level_tag: [u8; 2],
    pub host_version: Version,
    pub engine_version: Version,
    /// Raw feature-level enumerator from the payload.
    pub feature_level: u8,
    /// Offset of the enumerator byte, for error reports.
    pub feature_level_offset: usize,
}

impl Header {
    /// Descriptor for a file written at `level`.
    pub fn new(level: FeatureLevel, host_version: Version, engine_version: Version) -> Self {
        Header {
            level_tag: level.tag(),
            host_version,
            engine_version,
            feature_level: level.as_u8(),
            feature_level_offset: 0,
        }
    }

    pub fn write(&self, w: &mut ByteWriter) -> Result<(), StorageError> {
        w.raw(&PRODUCT_PREFIX);
        w.raw(&self.level_tag);
        self.host_version.write(w)?;
        self.engine_version.write(w)?;
        w.u8(self.feature_level);
        Ok(())
    }

    /// Reads the descriptor. The product prefix is skipped, not checked.
    pub fn read(r: &mut ByteReader<'_>) -> Result<Self, StorageError> {
        let identifier = r.take(IDENTIFIER_LEN)?;
        let level_tag = [identifier[2], identifier[3]];
        let host_version = Version::read(r)?;
        let engine_version = Version::read(r)?;
        let feature_level_offset = r.offset();
        let feature_level = r.u8()?;
        Ok(Header {
            level_tag,
            host_version,
            engine_version,
            feature_level,
            feature_level_offset,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_display() {
        assert_eq!(Version::new(27, 0, 130, "").to_string(), "27.0.130");
        assert_eq!(Version::new(10, 20, 900, "suffix").to_string(), "10.20.900-suffix");
    }

    #[test]
    fn version_deserializes_without_label() {
        let v: Version = serde_json::from_str(r#"{"major":1,"minor":2,"patch":3}"#).unwrap();
        assert_eq!(v, Version::new(1, 2, 3, ""));
        let json = serde_json::to_string(&Version::new(1, 2, 3, "rc")).unwrap();
        assert_eq!(serde_json::from_str::<Version>(&json).unwrap().label, "rc");
    }

    #[test]
    fn header_layout() {
        let header = Header::new(
            FeatureLevel::Level02,
            Version::new(27, 0, 130, ""),
            Version::new(0, 1, 0, "dev"),
        );
        let mut w = ByteWriter::new();
        header.write(&mut w).unwrap();
        let bytes = w.into_inner();

        assert_eq!(&bytes[..4], b"rl02");
        assert_eq!(&bytes[4..8], &27u32.to_le_bytes());

        let mut r = ByteReader::new(&bytes);
        let decoded = Header::read(&mut r).unwrap();
        assert_eq!(decoded.feature_level, 2);
        assert_eq!(decoded.feature_level_offset, bytes.len() - 1);
        assert_eq!(decoded.engine_version.label, "dev");
        r.finish().unwrap();
    }
}
