//! Exercises a full mapping session against `FakeMapBuilder`: library init,
//! facade init/start, a handful of lidar readings, a position and map read,
//! then an orderly stop/terminate/lib-terminate.
//!
//! Usage: `carto-facade-demo [configuration-directory]`. No flag parsing —
//! the one optional argument is read positionally.

use std::path::PathBuf;

use carto_facade::{
    CartoConfig, CartoFacade, FakeMapBuilder, LibState, LidarConfig, LidarReading,
};
use log::info;

fn pcd_payload(n_points: usize) -> String {
    let mut out = format!(
        "VERSION .7\nFIELDS x y z\nSIZE 4 4 4\nTYPE F F F\nCOUNT 1 1 1\nWIDTH {n_points}\nHEIGHT 1\nVIEWPOINT 0 0 0 1 0 0 0\nPOINTS {n_points}\nDATA ascii\n"
    );
    for i in 0..n_points {
        out.push_str(&format!("{i} {i} 0\n"));
    }
    out
}

fn main() {
    env_logger::init();

    let configuration_directory = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| std::env::temp_dir().join("carto-facade-demo"));
    std::fs::create_dir_all(&configuration_directory).expect("create configuration directory");

    let lib = LibState::init(0, 0).expect("lib init");

    let config = CartoConfig {
        camera: "rplidar".to_string(),
        movement_sensor: String::new(),
        lidar_config: LidarConfig::TwoD,
        enable_mapping: true,
        existing_map: String::new(),
        use_imu_data: false,
    };

    let facade = CartoFacade::init(
        Box::new(FakeMapBuilder::new()),
        config,
        Default::default(),
        configuration_directory.clone(),
        configuration_directory.join("internal_state.pbstream"),
    )
    .expect("facade init");

    facade.start().expect("start");
    info!("started in {:?} mode", facade.slam_mode());

    for i in 0..3 {
        let reading = LidarReading {
            sensor_name: "rplidar".to_string(),
            payload: pcd_payload(5).into(),
            timestamp_unix_millis: 1_700_000_000_000 + i * 100,
        };
        facade.add_lidar_reading(reading).expect("add_lidar_reading");
    }

    let position = facade.get_position().expect("get_position");
    info!(
        "pose: translation=({:.3}, {:.3}, {:.3})",
        position.x, position.y, position.z
    );

    match facade.get_point_cloud_map() {
        Ok(map) => info!("painted map: {} bytes", map.point_cloud_pcd.len()),
        Err(e) => info!("no map yet: {e}"),
    }

    facade.stop().expect("stop");
    facade.terminate().expect("terminate");
    lib.terminate().expect("lib terminate");
}
