//! Engine configuration.
//!
//! An engine is configured with the feature level it runs at and the host
//! engine version it is built against. Both are fixed for the engine's
//! lifetime. Feature levels are given as plain numbers (`1`, `2`); an
//! unknown number falls back to level 01.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use relogic_core::FeatureLevel;
use relogic_storage::Version;

use crate::error::ConfigError;

/// Environment variable read by [`EngineConfig::from_env`].
pub const FEATURE_LEVEL_ENV: &str = "RELOGIC_FEATURE_LEVEL";

/// Host-engine version this build is made for.
pub const HOST_VERSION: (u32, u32, u32) = (27, 0, 130);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    #[serde(serialize_with = "level_as_number", deserialize_with = "level_from_number")]
    pub feature_level: FeatureLevel,
    pub host_version: Version,
}

impl Default for EngineConfig {
    fn default() -> Self {
        let (major, minor, patch) = HOST_VERSION;
        EngineConfig {
            feature_level: FeatureLevel::Level01,
            host_version: Version::new(major, minor, patch, ""),
        }
    }
}

impl EngineConfig {
    pub fn with_feature_level(feature_level: FeatureLevel) -> Self {
        EngineConfig {
            feature_level,
            ..Self::default()
        }
    }

    /// Configuration for a numeric feature level, falling back to level 01
    /// if the number is not a known level.
    pub fn with_raw_feature_level(raw: u32) -> Self {
        Self::with_feature_level(resolve_level(raw))
    }

    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads [`FEATURE_LEVEL_ENV`]; anything missing or unparsable yields the
    /// default configuration.
    pub fn from_env() -> Self {
        match std::env::var(FEATURE_LEVEL_ENV) {
            Ok(raw) => match raw.trim().parse::<u32>() {
                Ok(n) => Self::with_raw_feature_level(n),
                Err(_) => {
                    tracing::warn!(value = %raw, "{FEATURE_LEVEL_ENV} is not a number, using feature level 01");
                    Self::default()
                }
            },
            Err(_) => Self::default(),
        }
    }
}

fn resolve_level(raw: u32) -> FeatureLevel {
    FeatureLevel::from_raw(raw).unwrap_or_else(|| {
        tracing::warn!(requested = raw, "unknown feature level requested, falling back to feature level 01");
        FeatureLevel::Level01
    })
}

fn level_as_number<S: Serializer>(level: &FeatureLevel, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u8(level.as_u8())
}

fn level_from_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<FeatureLevel, D::Error> {
    u32::deserialize(deserializer).map(resolve_level)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.feature_level, FeatureLevel::Level01);
        assert_eq!(config.host_version.to_string(), "27.0.130");
    }

    #[test]
    fn unknown_level_falls_back_to_01() {
        assert_eq!(EngineConfig::with_raw_feature_level(999).feature_level, FeatureLevel::Level01);
        assert_eq!(EngineConfig::with_raw_feature_level(2).feature_level, FeatureLevel::Level02);
    }

    #[test]
    fn json_with_partial_fields() {
        let config = EngineConfig::from_json_str(r#"{"feature_level": 2}"#).unwrap();
        assert_eq!(config.feature_level, FeatureLevel::Level02);
        assert_eq!(config.host_version, EngineConfig::default().host_version);

        let config = EngineConfig::from_json_str(r#"{"feature_level": 7}"#).unwrap();
        assert_eq!(config.feature_level, FeatureLevel::Level01);
    }

    #[test]
    fn json_roundtrip() {
        let config = EngineConfig {
            feature_level: FeatureLevel::Level02,
            host_version: Version::new(28, 1, 0, "beta"),
        };
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains(r#""feature_level":2"#));
        assert_eq!(EngineConfig::from_json_str(&json).unwrap(), config);
    }

    #[test]
    fn malformed_json_is_an_error() {
        let err = EngineConfig::from_json_str("{feature_level").unwrap_err();
        assert!(err.to_string().starts_with("invalid engine configuration"));
    }
}
