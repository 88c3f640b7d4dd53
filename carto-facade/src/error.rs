//! The error taxonomy returned by every facade entry point.
//!
//! Mirrors the `VIAM_CARTO_*` return codes of the original C ABI. Callers
//! that need the legacy integer for logging or wire compatibility can use
//! [`CartoError::code`]; everything else should match on the variant.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CartoError {
    // -- Handle/lifetime --
    #[error("viam_carto handle is invalid")]
    VcInvalid,
    #[error("viam_carto_lib handle is invalid")]
    LibInvalid,
    #[error("viam_carto_lib is already initialized")]
    LibAlreadyInitialized,
    #[error("viam_carto_lib is not initialized")]
    LibNotInitialized,
    #[error("viam_carto_lib platform is invalid")]
    LibPlatformInvalid,
    #[error("facade is not in the initialized state")]
    NotInInitializedState,
    #[error("facade is not in the io-initialized state")]
    NotInIoInitializedState,
    #[error("facade is not in the started state")]
    NotInStartedState,
    #[error("facade is not in a terminatable state")]
    NotInTerminatableState,

    // -- Config --
    #[error("component reference is invalid")]
    ComponentReferenceInvalid,
    #[error("lidar config is invalid")]
    LidarConfigInvalid,
    #[error("slam mode is invalid")]
    SlamModeInvalid,
    #[error("use_imu_data and movement_sensor presence disagree")]
    ImuProvidedAndImuEnabledMismatch,
    #[error("lua config file not found")]
    LuaConfigNotFound,

    // -- Resource --
    #[error("out of memory")]
    OutOfMemory,
    #[error("unable to acquire lock")]
    UnableToAcquireLock,

    // -- Sensor ingest --
    #[error("unknown sensor name")]
    UnknownSensorName,
    #[error("lidar reading is empty")]
    LidarReadingEmpty,
    #[error("lidar reading is invalid")]
    LidarReadingInvalid,
    #[error("imu reading is empty")]
    ImuReadingEmpty,
    #[error("imu reading is invalid")]
    ImuReadingInvalid,
    #[error("odometer reading is invalid")]
    OdometerReadingInvalid,

    // -- Reads --
    #[error("get_position response is invalid")]
    GetPositionResponseInvalid,
    #[error("get_position called before slam has produced a pose")]
    GetPositionNotInitialized,
    #[error("get_point_cloud_map response is invalid")]
    GetPointCloudMapResponseInvalid,
    #[error("no submaps to paint")]
    PointcloudMapEmpty,
    #[error("get_internal_state response is invalid")]
    GetInternalStateResponseInvalid,
    #[error("failed to write internal state to file")]
    GetInternalStateFileWriteIoError,
    #[error("failed to read internal state from file")]
    GetInternalStateFileReadIoError,

    // -- SLAM integration --
    #[error("map creation error")]
    MapCreationError,
    #[error("internal state file system error")]
    InternalStateFileSystemError,
    #[error("destructor error")]
    DestructorError,
    #[error("unknown error: {0}")]
    UnknownError(String),
}

impl CartoError {
    /// The legacy `VIAM_CARTO_*` integer code, kept for parity with the
    /// original C ABI and for compact logging.
    pub fn code(&self) -> i32 {
        use CartoError::*;
        match self {
            UnableToAcquireLock => 1,
            VcInvalid => 2,
            OutOfMemory => 3,
            DestructorError => 4,
            LibPlatformInvalid => 5,
            LibInvalid => 6,
            UnknownError(_) => 8,
            SlamModeInvalid => 9,
            LidarConfigInvalid => 10,
            ComponentReferenceInvalid => 11,
            LuaConfigNotFound => 12,
            InternalStateFileSystemError => 13,
            MapCreationError => 14,
            UnknownSensorName => 15,
            LidarReadingEmpty => 16,
            LidarReadingInvalid => 17,
            GetPositionResponseInvalid => 18,
            GetPositionNotInitialized => 19,
            PointcloudMapEmpty => 20,
            GetPointCloudMapResponseInvalid => 21,
            LibAlreadyInitialized => 22,
            GetInternalStateResponseInvalid => 23,
            GetInternalStateFileWriteIoError => 24,
            GetInternalStateFileReadIoError => 25,
            NotInInitializedState => 26,
            NotInIoInitializedState => 27,
            NotInStartedState => 28,
            NotInTerminatableState => 29,
            ImuProvidedAndImuEnabledMismatch => 30,
            ImuReadingEmpty => 31,
            ImuReadingInvalid => 32,
            OdometerReadingInvalid => 33,
            LibNotInitialized => 7,
        }
    }
}

pub type CartoResult<T> = Result<T, CartoError>;
