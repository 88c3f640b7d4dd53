//! Facade exposing a graph-based SLAM engine as a sensor-ingestion and
//! map-extraction library. See `SPEC_FULL.md` at the workspace root for the
//! full requirements this crate implements.

pub mod bstr;
pub mod config;
pub mod error;
pub mod facade;
pub mod geometry;
pub mod lib_state;
pub mod map_builder;
pub mod paint;
pub mod pcd;
pub mod sensor;
pub mod state;
pub mod time;

pub use bstr::BString;
pub use config::{CartoConfig, LidarConfig};
pub use error::{CartoError, CartoResult};
pub use facade::{CartoFacade, GetInternalStateResponse, GetPointCloudMapResponse, GetPositionResponse};
pub use geometry::Rigid3;
pub use lib_state::LibState;
pub use map_builder::{AlgoConfig, InitialTrajectoryPose, MapBuilder, TrajectoryId};
#[cfg(feature = "fake-map-builder")]
pub use map_builder::FakeMapBuilder;
pub use paint::PaintedMap;
pub use pcd::{TimedPointCloud, TimedRangefinderPoint};
pub use sensor::{ImuReading, ImuSample, LidarReading, OdometerReading, OdometrySample};
pub use state::{CartoFacadeState, SlamMode};
pub use time::EngineTime;
