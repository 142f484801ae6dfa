//! Load-time compatibility checks.
//!
//! Each check is an independent stage. [`crate::codec::decode`] runs them in
//! this order and stops at the first failure:
//!
//! 1. [`check_identifier`]: product prefix
//! 2. [`crate::verify::verify`]: structural integrity
//! 3. [`check_host_version`]: host-engine major version
//! 4. [`check_feature_level`]: the identifier's feature-level tag
//! 5. [`check_payload_level`]: the stored enumerator agrees with the tag

use relogic_core::FeatureLevel;

use crate::error::{FileAge, StorageError};
use crate::header::{Header, Version, PRODUCT_PREFIX};

/// The file must start with the product prefix.
pub fn check_identifier(bytes: &[u8]) -> Result<(), StorageError> {
    let prefix = &bytes[..bytes.len().min(PRODUCT_PREFIX.len())];
    if prefix != PRODUCT_PREFIX {
        return Err(StorageError::NotThisProduct {
            found: String::from_utf8_lossy(prefix).into_owned(),
        });
    }
    Ok(())
}

/// The file's host-engine major version must equal the runtime's.
pub fn check_host_version(header: &Header, host: &Version) -> Result<(), StorageError> {
    if header.host_version.major != host.major {
        return Err(StorageError::IncompatibleHostVersion {
            expected_major: host.major,
            found_major: header.host_version.major,
            found: header.host_version.clone(),
        });
    }
    Ok(())
}

/// The identifier's tag must name the level the engine runs with.
pub fn check_feature_level(header: &Header, engine: FeatureLevel) -> Result<FeatureLevel, StorageError> {
    let file = FeatureLevel::parse_tag(header.level_tag).ok_or_else(|| {
        StorageError::corrupt_at(
            2,
            format!(
                "feature-level tag '{}' is not two digits",
                String::from_utf8_lossy(&header.level_tag)
            ),
        )
    })?;
    let running = engine.as_u8();
    if file != running {
        let age = if file < running {
            FileAge::Older
        } else {
            FileAge::Newer
        };
        return Err(StorageError::FeatureLevelMismatch { file, engine, age });
    }
    Ok(engine)
}

/// The enumerator stored after the versions must match the accepted tag.
pub fn check_payload_level(header: &Header, accepted: FeatureLevel) -> Result<(), StorageError> {
    if header.feature_level != accepted.as_u8() {
        return Err(StorageError::corrupt_at(
            header.feature_level_offset,
            format!(
                "stored feature level {:02} disagrees with identifier tag {accepted}",
                header.feature_level
            ),
        ));
    }
    Ok(())
}
