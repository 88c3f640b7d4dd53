//! Facade configuration and its validation rules (spec.md §3, §4.5).

use serde::Deserialize;

use crate::error::CartoError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LidarConfig {
    TwoD,
    ThreeD,
}

impl LidarConfig {
    fn from_str(s: &str) -> Result<Self, CartoError> {
        match s {
            "2d" => Ok(LidarConfig::TwoD),
            "3d" => Ok(LidarConfig::ThreeD),
            _ => Err(CartoError::LidarConfigInvalid),
        }
    }
}

#[derive(Clone, Debug)]
pub struct CartoConfig {
    pub camera: String,
    pub movement_sensor: String,
    pub lidar_config: LidarConfig,
    pub enable_mapping: bool,
    pub existing_map: String,
    pub use_imu_data: bool,
}

/// Mirrors the JSON shape of `CartoConfig`, but keeps `lidar_config` as a raw
/// string so [`CartoConfig::from_json`] can reject an unrecognized value with
/// the specific `LIDAR_CONFIG_INVALID` taxonomy member (spec.md §4.5) instead
/// of a generic deserialization error — `LidarConfig` itself has no invalid
/// representation once constructed, so this check has to happen here, at the
/// JSON boundary.
#[derive(Deserialize)]
struct RawCartoConfig {
    camera: String,
    #[serde(default)]
    movement_sensor: String,
    lidar_config: String,
    enable_mapping: bool,
    #[serde(default)]
    existing_map: String,
    #[serde(default)]
    use_imu_data: bool,
}

/// Validates the rules spec.md §4.5 lists. Does not check filesystem state
/// (`existing_map` readability is checked by the facade during `IOInit`,
/// since it needs I/O and a distinct error kind,
/// `INTERNAL_STATE_FILE_SYSTEM_ERROR`, rather than a config-shape error).
pub fn validate_config(config: &CartoConfig) -> Result<(), CartoError> {
    if config.camera.trim().is_empty() {
        return Err(CartoError::ComponentReferenceInvalid);
    }
    if config.use_imu_data != !config.movement_sensor.trim().is_empty() {
        return Err(CartoError::ImuProvidedAndImuEnabledMismatch);
    }
    Ok(())
}

impl CartoConfig {
    /// Parses a `CartoConfig` from the JSON attributes blob a caller would
    /// load from a component config, in the same spirit as the teacher's
    /// `ConfigType`/attribute-map deserialization. Validation is a separate
    /// step ([`validate_config`]) so a caller can distinguish a malformed
    /// blob from a structurally valid but semantically invalid one.
    pub fn from_json(attributes: &str) -> Result<Self, CartoError> {
        let raw: RawCartoConfig =
            serde_json::from_str(attributes).map_err(|e| CartoError::UnknownError(e.to_string()))?;
        Ok(CartoConfig {
            camera: raw.camera,
            movement_sensor: raw.movement_sensor,
            lidar_config: LidarConfig::from_str(&raw.lidar_config)?,
            enable_mapping: raw.enable_mapping,
            existing_map: raw.existing_map,
            use_imu_data: raw.use_imu_data,
        })
    }
}
