//! The public facade core: init, io-init, start, sensor ingestion, reads,
//! final optimization, stop, terminate (spec.md §4.6).

use std::path::{Path, PathBuf};
use std::sync::{Mutex, RwLock};
use std::thread::JoinHandle;

use log::{debug, info, warn};

use crate::bstr::BString;
use crate::config::{validate_config, CartoConfig};
use crate::error::{CartoError, CartoResult};
use crate::geometry::Rigid3;
use crate::map_builder::{AlgoConfig, MapBuilder};
use crate::paint;
use crate::pcd;
use crate::sensor::{ImuReading, ImuSample, LidarReading, OdometerReading, OdometrySample};
use crate::state::{AtomicFacadeState, CartoFacadeState, SlamMode};

const MAPPING_BASENAME: &str = "mapping_new_map.lua";
const LOCALIZATION_BASENAME: &str = "locating_in_map.lua";
const UPDATE_BASENAME: &str = "updating_a_map.lua";

#[derive(Clone, Debug)]
pub struct GetPositionResponse {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub real: f64,
    pub imag: f64,
    pub jmag: f64,
    pub kmag: f64,
    pub component_reference: String,
}

#[derive(Clone, Debug)]
pub struct GetPointCloudMapResponse {
    pub point_cloud_pcd: BString,
}

#[derive(Clone, Debug)]
pub struct GetInternalStateResponse {
    pub internal_state: BString,
}

struct ViamResponseCache {
    latest_global_pose: Rigid3,
    latest_pointcloud_map: BString,
}

/// A mapping instance. See spec.md §3/§4.6 for the full contract of each
/// operation.
pub struct CartoFacade {
    state: AtomicFacadeState,
    slam_mode: SlamMode,
    config: CartoConfig,
    algo_config: AlgoConfig,
    configuration_directory: PathBuf,
    path_to_internal_state_file: PathBuf,

    // Lock order: optimization_shared_mutex before map_builder_mutex. No
    // other combination may be held concurrently (spec.md §5).
    optimization_shared_mutex: RwLock<()>,
    map_builder_mutex: Mutex<Box<dyn MapBuilder>>,
    viam_response_mutex: Mutex<ViamResponseCache>,

    background_thread: Mutex<Option<JoinHandle<CartoResult<()>>>>,
    lidar_reading_count: std::sync::atomic::AtomicU32,
    trajectory_started: std::sync::atomic::AtomicBool,
}

impl CartoFacade {
    /// `init`: validates config, derives the SLAM mode, then synchronously
    /// runs `IOInit` (configure → apply_hyperparameters → build, optional
    /// `load_state`, `start_trajectory`). Returns `IO_INITIALIZED` on
    /// success; on any failure no facade is constructed.
    pub fn init(
        mut map_builder: Box<dyn MapBuilder>,
        config: CartoConfig,
        algo_config: AlgoConfig,
        configuration_directory: PathBuf,
        path_to_internal_state_file: PathBuf,
    ) -> CartoResult<Self> {
        validate_config(&config)?;

        let existing_map_empty = config.existing_map.trim().is_empty();
        let slam_mode = crate::state::determine_slam_mode(existing_map_empty, config.enable_mapping)?;

        if !existing_map_empty && !Path::new(&config.existing_map).exists() {
            return Err(CartoError::InternalStateFileSystemError);
        }

        let basename = match slam_mode {
            SlamMode::Mapping => MAPPING_BASENAME,
            SlamMode::Localizing => LOCALIZATION_BASENAME,
            SlamMode::Updating => UPDATE_BASENAME,
        };

        map_builder.configure(&configuration_directory, basename)?;
        map_builder.apply_hyperparameters(&algo_config, slam_mode)?;
        map_builder.build()?;

        if !matches!(slam_mode, SlamMode::Mapping) {
            let frozen = matches!(slam_mode, SlamMode::Localizing);
            map_builder.load_state(
                Path::new(&config.existing_map),
                frozen,
                algo_config.optimize_on_start,
            )?;
        }

        map_builder.start_trajectory(config.use_imu_data)?;

        // Caching policy (spec.md §4.6): in LOCALIZING mode, eagerly snapshot
        // the map now so get_point_cloud_map is serviceable immediately,
        // without contending with the optimizer once Started.
        let initial_pointcloud_map = if matches!(slam_mode, SlamMode::Localizing) {
            paint::sample_to_pcd(map_builder.painted_map_slices().as_ref()).unwrap_or_else(|_| BString::empty())
        } else {
            BString::empty()
        };

        info!(
            "carto-facade initialized in {:?} mode for camera {:?}",
            slam_mode, config.camera
        );

        Ok(CartoFacade {
            state: AtomicFacadeState::new(CartoFacadeState::IoInitialized),
            slam_mode,
            config,
            algo_config,
            configuration_directory,
            path_to_internal_state_file,
            optimization_shared_mutex: RwLock::new(()),
            map_builder_mutex: Mutex::new(map_builder),
            viam_response_mutex: Mutex::new(ViamResponseCache {
                latest_global_pose: Rigid3::identity(),
                latest_pointcloud_map: initial_pointcloud_map,
            }),
            background_thread: Mutex::new(None),
            lidar_reading_count: std::sync::atomic::AtomicU32::new(0),
            trajectory_started: std::sync::atomic::AtomicBool::new(true),
        })
    }

    pub fn slam_mode(&self) -> SlamMode {
        self.slam_mode
    }

    pub fn start(&self) -> CartoResult<()> {
        self.state.transition(
            CartoFacadeState::IoInitialized,
            CartoFacadeState::Started,
            CartoError::NotInIoInitializedState,
        )
    }

    pub fn stop(&self) -> CartoResult<()> {
        self.state.transition(
            CartoFacadeState::Started,
            CartoFacadeState::IoInitialized,
            CartoError::NotInStartedState,
        )
    }

    fn require_started(&self) -> CartoResult<()> {
        self.state.require(CartoFacadeState::Started, CartoError::NotInStartedState)
    }

    /// Acquires `optimization_shared_mutex` as a shared reader then
    /// `map_builder_mutex` exclusively, both via try-lock and in the
    /// documented order (spec.md §5: ingestion is a shared reader of the
    /// optimization lock; `optimization_shared_mutex` before
    /// `map_builder_mutex`). Returns `UnableToAcquireLock` if either is
    /// contended, before any input validation — matching spec.md §4.6's
    /// stated sequence for `add_*_reading` ("acquires a try-lock ...
    /// validates sensor name ... validates payload ... decodes").
    fn try_lock_for_ingest(
        &self,
    ) -> CartoResult<(
        std::sync::RwLockReadGuard<'_, ()>,
        std::sync::MutexGuard<'_, Box<dyn MapBuilder>>,
    )> {
        let read_guard = self
            .optimization_shared_mutex
            .try_read()
            .map_err(|_| CartoError::UnableToAcquireLock)?;
        let map_builder = self
            .map_builder_mutex
            .try_lock()
            .map_err(|_| CartoError::UnableToAcquireLock)?;
        Ok((read_guard, map_builder))
    }

    pub fn add_lidar_reading(&self, reading: LidarReading) -> CartoResult<()> {
        self.require_started()?;
        let (_read_guard, mut map_builder) = self.try_lock_for_ingest()?;

        if reading.sensor_name != self.config.camera {
            return Err(CartoError::UnknownSensorName);
        }
        if reading.payload.is_empty() {
            return Err(CartoError::LidarReadingEmpty);
        }

        let cloud = pcd::decode(reading.payload.as_bytes(), reading.timestamp_unix_millis)
            .map_err(|_| CartoError::LidarReadingInvalid)?;
        debug!(
            "ingesting lidar scan from {:?} at {}",
            reading.sensor_name,
            cloud.time.to_utc()
        );

        map_builder.add_lidar(cloud)?;
        self.lidar_reading_count
            .fetch_add(1, std::sync::atomic::Ordering::AcqRel);
        let pose = map_builder.global_pose();
        drop(map_builder);

        self.viam_response_mutex.lock().unwrap().latest_global_pose = pose;
        Ok(())
    }

    pub fn add_imu_reading(&self, reading: ImuReading) -> CartoResult<()> {
        self.require_started()?;
        let (_read_guard, mut map_builder) = self.try_lock_for_ingest()?;

        if reading.sensor_name != self.config.movement_sensor {
            return Err(CartoError::UnknownSensorName);
        }
        map_builder
            .add_imu(ImuSample::from(&reading))
            .map_err(|_| CartoError::ImuReadingInvalid)
    }

    pub fn add_odometer_reading(&self, reading: OdometerReading) -> CartoResult<()> {
        self.require_started()?;
        let (_read_guard, mut map_builder) = self.try_lock_for_ingest()?;

        if reading.sensor_name != self.config.movement_sensor {
            return Err(CartoError::UnknownSensorName);
        }
        map_builder
            .add_odometer(OdometrySample::from(&reading))
            .map_err(|_| CartoError::OdometerReadingInvalid)
    }

    /// `get_position`: reads the atomically cached pose. Fails
    /// `GET_POSITION_NOT_INITIALIZED` until at least two lidar readings have
    /// landed (spec.md §4.6 rationale: the engine's motion tracker needs two
    /// scans before its pose is distinguishable from a truly-computed
    /// origin).
    pub fn get_position(&self) -> CartoResult<GetPositionResponse> {
        self.require_started()?;
        if self.lidar_reading_count.load(std::sync::atomic::Ordering::Acquire) < 2 {
            return Err(CartoError::GetPositionNotInitialized);
        }
        let cache = self.viam_response_mutex.lock().unwrap();
        let pose = cache.latest_global_pose;
        let translation = pose.translation();
        let rotation = pose.rotation();
        Ok(GetPositionResponse {
            x: translation.x,
            y: translation.y,
            z: translation.z,
            real: rotation.w,
            imag: rotation.i,
            jmag: rotation.j,
            kmag: rotation.k,
            component_reference: self.config.camera.clone(),
        })
    }

    /// `get_point_cloud_map`: paints fresh when not LOCALIZING and the
    /// optimizer's shared lock is acquirable read-only; otherwise serves
    /// the cache (spec.md §4.6).
    pub fn get_point_cloud_map(&self) -> CartoResult<GetPointCloudMapResponse> {
        self.require_started()?;

        let fresh = if !matches!(self.slam_mode, SlamMode::Localizing) {
            self.optimization_shared_mutex.try_read().ok()
        } else {
            None
        };

        if let Some(_guard) = fresh {
            // spec.md §4.6 names only two outcomes for this operation (paint
            // fresh, or serve the cache) and never UNABLE_TO_ACQUIRE_LOCK —
            // unlike add_*_reading, whose contract names it explicitly. A
            // contended map_builder_mutex here falls through to the cache,
            // same as a contended optimization_shared_mutex does.
            if let Ok(map_builder) = self.map_builder_mutex.try_lock() {
                let snapshot = map_builder.painted_map_slices();
                drop(map_builder);
                if let Ok(pcd) = paint::sample_to_pcd(snapshot.as_ref()) {
                    self.viam_response_mutex.lock().unwrap().latest_pointcloud_map = pcd.clone();
                    return Ok(GetPointCloudMapResponse { point_cloud_pcd: pcd });
                }
                debug!("paint snapshot empty, falling back to cache");
            } else {
                debug!("map_builder_mutex contended, falling back to cache");
            }
        }

        let cached = self.viam_response_mutex.lock().unwrap().latest_pointcloud_map.clone();
        if cached.is_empty() {
            return Err(CartoError::PointcloudMapEmpty);
        }
        Ok(GetPointCloudMapResponse { point_cloud_pcd: cached })
    }

    /// `get_internal_state`: serializes the graph to a temp file, then
    /// reads and deletes it (spec.md §4.6, ported from `util.cc`'s
    /// `read_and_delete_file`).
    pub fn get_internal_state(&self) -> CartoResult<GetInternalStateResponse> {
        self.require_started()?;

        let tmp = tempfile::NamedTempFile::new_in(
            self.path_to_internal_state_file
                .parent()
                .unwrap_or_else(|| Path::new(".")),
        )
        .map_err(|_| CartoError::GetInternalStateFileWriteIoError)?;
        let path = tmp.path().to_path_buf();

        {
            let map_builder = self
                .map_builder_mutex
                .lock()
                .map_err(|_| CartoError::UnableToAcquireLock)?;
            map_builder.serialize_to_file(true, &path)?;
        }

        let bytes =
            std::fs::read(&path).map_err(|_| CartoError::GetInternalStateFileReadIoError)?;
        drop(tmp); // removes the temp file

        Ok(GetInternalStateResponse {
            internal_state: BString::from_vec(bytes),
        })
    }

    /// `run_final_optimization`: blocks under the exclusive optimization
    /// lock, then refreshes the cached global pose.
    pub fn run_final_optimization(&self) -> CartoResult<()> {
        self.require_started()?;
        let _write_guard = self
            .optimization_shared_mutex
            .write()
            .map_err(|_| CartoError::UnableToAcquireLock)?;
        let mut map_builder = self
            .map_builder_mutex
            .lock()
            .map_err(|_| CartoError::UnableToAcquireLock)?;
        map_builder.run_final_optimization()?;
        let pose = map_builder.global_pose();
        drop(map_builder);
        self.viam_response_mutex.lock().unwrap().latest_global_pose = pose;
        Ok(())
    }

    /// Supplements spec.md's explicit synchronous `run_final_optimization`
    /// with an async variant, grounded on the background-thread member the
    /// original `CartoFacade` carries (`carto_facade.h`'s
    /// `thread_save_internal_state`) but which spec.md's distillation never
    /// exposes its own entry point for. `terminate` joins it unconditionally.
    pub fn run_final_optimization_background(self: &std::sync::Arc<Self>) -> CartoResult<()> {
        self.require_started()?;
        let mut slot = self.background_thread.lock().unwrap();
        if slot.is_some() {
            return Err(CartoError::UnableToAcquireLock);
        }
        let this = std::sync::Arc::clone(self);
        *slot = Some(std::thread::spawn(move || this.run_final_optimization()));
        Ok(())
    }

    /// `terminate`: joins any background thread, finishes the trajectory.
    /// Legal only from IO_INITIALIZED; transitions to a one-way `Terminated`
    /// sink so a repeat call fails `NOT_IN_TERMINATABLE_STATE` instead of
    /// silently re-running teardown (spec.md §8 P5/R2).
    pub fn terminate(&self) -> CartoResult<()> {
        self.state.transition(
            CartoFacadeState::IoInitialized,
            CartoFacadeState::Terminated,
            CartoError::NotInTerminatableState,
        )?;

        if let Some(handle) = self.background_thread.lock().unwrap().take() {
            match handle.join() {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!("background final optimization failed: {e}"),
                Err(_) => warn!("background final optimization thread panicked"),
            }
        }

        if self
            .trajectory_started
            .swap(false, std::sync::atomic::Ordering::AcqRel)
        {
            let mut map_builder = self
                .map_builder_mutex
                .lock()
                .map_err(|_| CartoError::UnableToAcquireLock)?;
            map_builder.finish_trajectory()?;
        }
        Ok(())
    }
}

#[cfg(any(test, feature = "fake-map-builder"))]
impl CartoFacade {
    /// Test-only accessor exposing `map_builder_mutex` directly so a test can
    /// hold it externally and exercise `UNABLE_TO_ACQUIRE_LOCK` under genuine
    /// contention (spec.md §8 scenario 6), rather than only through the
    /// background-optimization path.
    pub fn lock_map_builder_for_test(&self) -> std::sync::MutexGuard<'_, Box<dyn MapBuilder>> {
        self.map_builder_mutex.lock().unwrap()
    }
}

impl Drop for CartoFacade {
    fn drop(&mut self) {
        if self.trajectory_started.load(std::sync::atomic::Ordering::Acquire) {
            if let Ok(mut map_builder) = self.map_builder_mutex.lock() {
                if let Err(e) = map_builder.finish_trajectory() {
                    warn!("finish_trajectory on drop failed: {e}");
                }
            }
        }
    }
}
