//! The `MapBuilder` capability: a thin adapter over whatever pose-graph SLAM
//! engine is doing the actual work (spec.md §4.4, §6.4).
//!
//! The real cartographer integration is an external collaborator and out of
//! scope here (spec.md §1). This module defines the trait surface and ships
//! one concrete, deterministic implementation, [`FakeMapBuilder`], in the
//! style of the teacher repo's `Fake*` components
//! (`FakeBase`/`FakeMovementSensor` in `micro-rdk/src/common/{base,movement_sensor}.rs`)
//! so the facade above it is fully exercisable without a real engine linked
//! in.

use std::path::Path;
use std::sync::Mutex;

use serde::Deserialize;
use uuid::Uuid;

use crate::error::{CartoError, CartoResult};
use crate::geometry::Rigid3;
use crate::paint::PaintedMap;
use crate::pcd::TimedPointCloud;
use crate::sensor::{ImuSample, OdometrySample};
use crate::state::SlamMode;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TrajectoryId(pub Uuid);

/// Hyperparameters applied to the engine before `build()`, exactly the
/// surface spec.md §4.4 lists (ported from `viam_carto_algo_config` /
/// `map_builder.h`'s `Overwrite*` setters).
#[derive(Clone, Copy, Debug, Deserialize)]
pub struct AlgoConfig {
    pub optimize_on_start: bool,
    pub optimize_every_n_nodes: i32,
    pub num_range_data: i32,
    pub missing_data_ray_length: f32,
    pub max_range: f32,
    pub min_range: f32,
    pub use_imu_data: bool,
    /// LOCALIZING only.
    pub max_submaps_to_keep: i32,
    /// UPDATING only.
    pub fresh_submaps_count: i32,
    /// UPDATING only.
    pub min_covered_area: f64,
    /// UPDATING only.
    pub min_added_submaps_count: i32,
    pub occupied_space_weight: f64,
    pub translation_weight: f64,
    pub rotation_weight: f64,
    pub initial_trajectory_pose: Option<InitialTrajectoryPose>,
}

#[derive(Clone, Copy, Debug, Deserialize)]
pub struct InitialTrajectoryPose {
    pub x: f64,
    pub y: f64,
    pub theta: f64,
}

impl Default for AlgoConfig {
    fn default() -> Self {
        AlgoConfig {
            optimize_on_start: false,
            optimize_every_n_nodes: 3,
            num_range_data: 100,
            missing_data_ray_length: 25.0,
            max_range: 25.0,
            min_range: 0.2,
            use_imu_data: false,
            max_submaps_to_keep: 3,
            fresh_submaps_count: 3,
            min_covered_area: 1.0,
            min_added_submaps_count: 1,
            occupied_space_weight: 20.0,
            translation_weight: 10.0,
            rotation_weight: 1.0,
            initial_trajectory_pose: None,
        }
    }
}

/// Capability exposed by the underlying SLAM engine, as spec.md §4.4 /
/// §6.4 describe it. `Send` because it lives behind `map_builder_mutex` and
/// is accessed from whichever thread holds the lock.
pub trait MapBuilder: Send {
    fn configure(&mut self, directory: &Path, config_basename: &str) -> CartoResult<()>;
    fn apply_hyperparameters(&mut self, algo_config: &AlgoConfig, slam_mode: SlamMode) -> CartoResult<()>;
    fn build(&mut self) -> CartoResult<()>;
    fn load_state(&mut self, path: &Path, frozen: bool, optimize_on_load: bool) -> CartoResult<()>;
    fn serialize_to_file(&self, include_unfinished: bool, path: &Path) -> CartoResult<()>;
    fn start_trajectory(&mut self, use_imu: bool) -> CartoResult<TrajectoryId>;
    fn add_lidar(&mut self, points: TimedPointCloud) -> CartoResult<()>;
    fn add_imu(&mut self, sample: ImuSample) -> CartoResult<()>;
    fn add_odometer(&mut self, sample: OdometrySample) -> CartoResult<()>;
    fn global_pose(&self) -> Rigid3;
    fn run_final_optimization(&mut self) -> CartoResult<()>;
    fn finish_trajectory(&mut self) -> CartoResult<()>;
    /// A read-only snapshot of the current submap collection, painted onto
    /// a single pixel surface, or `None` if no submaps exist yet.
    fn painted_map_slices(&self) -> Option<PaintedMap>;
}

/// Deterministic stand-in for a real scan-matching engine. Accumulates a
/// trivial pose (translation and rotation nudge away from identity starting
/// on the 3rd lidar reading, not the 2nd — matching spec.md §8 scenario 1 /
/// the original `carto_facade_test.cc`'s `kmag == 0` after the 2nd reading
/// and `kmag != 0` only after the 3rd) so the facade's
/// `GET_POSITION_NOT_INITIALIZED` gating (spec.md §4.6, "fewer than two
/// successful lidar ingestions") has something real to observe, and paints a
/// one-pixel-per-lidar-reading surface once any data has landed.
#[cfg(any(test, feature = "fake-map-builder"))]
pub struct FakeMapBuilder {
    lidar_reading_count: u32,
    local_slam_result_pose: Mutex<Rigid3>,
    trajectory_id: Option<TrajectoryId>,
    painted_pixels: u32,
}

#[cfg(any(test, feature = "fake-map-builder"))]
impl FakeMapBuilder {
    pub fn new() -> Self {
        FakeMapBuilder {
            lidar_reading_count: 0,
            local_slam_result_pose: Mutex::new(Rigid3::identity()),
            trajectory_id: None,
            painted_pixels: 0,
        }
    }
}

#[cfg(any(test, feature = "fake-map-builder"))]
impl Default for FakeMapBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(any(test, feature = "fake-map-builder"))]
impl MapBuilder for FakeMapBuilder {
    fn configure(&mut self, _directory: &Path, _config_basename: &str) -> CartoResult<()> {
        Ok(())
    }

    fn apply_hyperparameters(&mut self, _algo_config: &AlgoConfig, _slam_mode: SlamMode) -> CartoResult<()> {
        Ok(())
    }

    fn build(&mut self) -> CartoResult<()> {
        Ok(())
    }

    fn load_state(&mut self, path: &Path, _frozen: bool, _optimize_on_load: bool) -> CartoResult<()> {
        if !path.exists() {
            return Err(CartoError::InternalStateFileSystemError);
        }
        // A fake engine has nothing meaningful to restore, but pretend a
        // handful of submaps already exist so a cache-priming paint in
        // LOCALIZING/UPDATING mode has something to sample.
        self.painted_pixels = self.painted_pixels.max(4);
        Ok(())
    }

    fn serialize_to_file(&self, _include_unfinished: bool, path: &Path) -> CartoResult<()> {
        std::fs::write(path, b"fake-internal-state")
            .map_err(|_| CartoError::GetInternalStateFileWriteIoError)
    }

    fn start_trajectory(&mut self, _use_imu: bool) -> CartoResult<TrajectoryId> {
        let id = TrajectoryId(Uuid::new_v4());
        self.trajectory_id = Some(id);
        Ok(id)
    }

    fn add_lidar(&mut self, points: TimedPointCloud) -> CartoResult<()> {
        self.lidar_reading_count += 1;
        self.painted_pixels += 1;
        // Stays identity through the 2nd reading; only the 3rd (and later)
        // moves the pose, matching spec.md §8 scenario 1.
        if self.lidar_reading_count >= 3 {
            let step = self.lidar_reading_count as f64 * 0.1;
            let mut pose = self.local_slam_result_pose.lock().unwrap();
            *pose = Rigid3::new(
                nalgebra::Vector3::new(step, step * 0.5, 0.0),
                nalgebra::UnitQuaternion::from_axis_angle(
                    &nalgebra::Vector3::z_axis(),
                    step * 0.05,
                ),
            );
        }
        let _ = points;
        Ok(())
    }

    fn add_imu(&mut self, _sample: ImuSample) -> CartoResult<()> {
        Ok(())
    }

    fn add_odometer(&mut self, _sample: OdometrySample) -> CartoResult<()> {
        Ok(())
    }

    fn global_pose(&self) -> Rigid3 {
        *self.local_slam_result_pose.lock().unwrap()
    }

    fn run_final_optimization(&mut self) -> CartoResult<()> {
        Ok(())
    }

    fn finish_trajectory(&mut self) -> CartoResult<()> {
        self.trajectory_id = None;
        Ok(())
    }

    fn painted_map_slices(&self) -> Option<PaintedMap> {
        if self.painted_pixels == 0 {
            return None;
        }
        let width = self.painted_pixels.max(1);
        let pixels = (0..width)
            .map(|i| {
                // green=255 (observed), red decreasing so probability
                // climbs as more readings accumulate -> non-trivial PCD.
                let r = 255u32.saturating_sub(i * 10);
                (255 << 24) | (r << 16) | (255 << 8)
            })
            .collect();
        Some(PaintedMap {
            width,
            height: 1,
            pixels,
            origin_x: 0.0,
            origin_y: 0.0,
        })
    }
}

#[cfg(all(test, feature = "fake-map-builder"))]
mod tests {
    use super::*;
    use crate::pcd;

    #[test]
    fn pose_stays_identity_through_two_lidar_readings() {
        let mut mb = FakeMapBuilder::new();
        assert!(mb.global_pose().is_identity());
        for _ in 0..2 {
            let cloud = pcd::decode(pcd_fixture().as_bytes(), 1_629_037_851_000).unwrap();
            mb.add_lidar(cloud).unwrap();
        }
        assert!(mb.global_pose().is_identity());
    }

    fn pcd_fixture() -> String {
        "VERSION .7\nFIELDS x y z\nSIZE 4 4 4\nTYPE F F F\nCOUNT 1 1 1\nWIDTH 1\nHEIGHT 1\nVIEWPOINT 0 0 0 1 0 0 0\nPOINTS 1\nDATA ascii\n0 0 0\n".to_string()
    }

    #[test]
    fn pose_becomes_non_identity_after_three_lidar_readings() {
        let mut mb = FakeMapBuilder::new();
        for _ in 0..3 {
            let cloud = pcd::decode(pcd_fixture().as_bytes(), 0).unwrap();
            mb.add_lidar(cloud).unwrap();
        }
        assert!(!mb.global_pose().is_identity());
    }
}
