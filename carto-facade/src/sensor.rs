//! The three sensor reading variants the facade accepts (spec.md §3), plus
//! the stripped-down samples the [`crate::map_builder::MapBuilder`] adapter
//! forwards into the SLAM engine once the sensor name has been validated.

use crate::bstr::BString;

#[derive(Clone, Debug)]
pub struct LidarReading {
    pub sensor_name: String,
    pub payload: BString,
    pub timestamp_unix_millis: i64,
}

#[derive(Clone, Debug)]
pub struct ImuReading {
    pub sensor_name: String,
    pub lin_acc: (f64, f64, f64),
    pub ang_vel: (f64, f64, f64),
    pub timestamp_unix_millis: i64,
}

#[derive(Clone, Debug)]
pub struct OdometerReading {
    pub sensor_name: String,
    pub translation: (f64, f64, f64),
    pub rotation: (f64, f64, f64, f64),
    pub timestamp_unix_millis: i64,
}

/// Adapter-facing IMU sample: identical to [`ImuReading`] minus the sensor
/// name, which the facade has already validated by the time it reaches the
/// [`crate::map_builder::MapBuilder`].
#[derive(Clone, Copy, Debug)]
pub struct ImuSample {
    pub lin_acc: (f64, f64, f64),
    pub ang_vel: (f64, f64, f64),
    pub timestamp_unix_millis: i64,
}

/// Adapter-facing odometry sample, analogous to [`ImuSample`].
#[derive(Clone, Copy, Debug)]
pub struct OdometrySample {
    pub translation: (f64, f64, f64),
    pub rotation: (f64, f64, f64, f64),
    pub timestamp_unix_millis: i64,
}

impl From<&ImuReading> for ImuSample {
    fn from(r: &ImuReading) -> Self {
        ImuSample {
            lin_acc: r.lin_acc,
            ang_vel: r.ang_vel,
            timestamp_unix_millis: r.timestamp_unix_millis,
        }
    }
}

impl From<&OdometerReading> for OdometrySample {
    fn from(r: &OdometerReading) -> Self {
        OdometrySample {
            translation: r.translation,
            rotation: r.rotation,
            timestamp_unix_millis: r.timestamp_unix_millis,
        }
    }
}
