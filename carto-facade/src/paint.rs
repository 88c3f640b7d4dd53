//! Map-paint / sampling engine: turns a snapshot of the optimizer's submap
//! collection into a PCD byte buffer with per-point occupancy probability.
//!
//! Grounded on the compositing algorithm in spec.md §4.3 and the binary-PCD
//! header/body writing style of `util.cc`'s `pcd_header` /
//! `write_float_to_buffer_in_bytes` / `write_int_to_buffer_in_bytes`, with
//! the little-endian float+int32 byte layout also seen in the
//! `wyzdwdz-ouster-parser` PCD writer.

use crate::bstr::BString;
use crate::error::{CartoError, CartoResult};

/// Area each pixel of a painted submap surface represents, in meters.
pub const RESOLUTION_METERS: f64 = 0.05;

/// A single composited ARGB32 pixel surface plus the pixel coordinates of
/// the map origin, snapshotted from the optimizer under `map_builder_mutex`.
#[derive(Clone, Debug)]
pub struct PaintedMap {
    pub width: u32,
    pub height: u32,
    /// Little-endian ARGB32 pixels, row-major, `width * height` entries.
    pub pixels: Vec<u32>,
    pub origin_x: f64,
    pub origin_y: f64,
}

impl PaintedMap {
    fn pixel(&self, x: u32, y: u32) -> u32 {
        self.pixels[(y * self.width + x) as usize]
    }
}

struct Pcd3dPoint {
    x: f32,
    y: f32,
    z: f32,
    probability: i32,
}

/// Composites `map` into a sequence of `(x, y, z, probability)` points, per
/// the 6-step algorithm in spec.md §4.3. A green channel of 0 marks an
/// unobserved pixel and is skipped, as is any pixel whose derived
/// probability is 0.
fn sample_points(map: &PaintedMap) -> Vec<Pcd3dPoint> {
    let mut points = Vec::new();
    for py in 0..map.height {
        for px in 0..map.width {
            let argb = map.pixel(px, py);
            let a = (argb >> 24) & 0xFF;
            let r = (argb >> 16) & 0xFF;
            let g = (argb >> 8) & 0xFF;
            let _b = argb & 0xFF;
            let _ = a;
            if g == 0 {
                continue;
            }
            let probability = ((255 - r as i32) * 100) / 255;
            if probability == 0 {
                continue;
            }
            let x = (px as f64 - map.origin_x) * RESOLUTION_METERS;
            let y = -(py as f64 - map.origin_y) * RESOLUTION_METERS;
            points.push(Pcd3dPoint {
                x: x as f32,
                y: y as f32,
                z: 0.0,
                probability,
            });
        }
    }
    points
}

fn pcd_header(point_count: usize) -> String {
    format!(
        "VERSION .7\n\
         FIELDS x y z rgb\n\
         SIZE 4 4 4 4\n\
         TYPE F F F I\n\
         COUNT 1 1 1 1\n\
         WIDTH {point_count}\n\
         HEIGHT 1\n\
         VIEWPOINT 0 0 0 1 0 0 0\n\
         POINTS {point_count}\n\
         DATA binary\n"
    )
}

/// Produces a binary PCD (`x y z rgb` fields, probability packed into the
/// `rgb` int32 slot) from a painted map snapshot. Fails with
/// [`CartoError::PointcloudMapEmpty`] if the snapshot carries no submaps —
/// the engine never synthesizes an empty PCD (spec.md §4.3 step 2).
pub fn sample_to_pcd(map: Option<&PaintedMap>) -> CartoResult<BString> {
    let map = map.ok_or(CartoError::PointcloudMapEmpty)?;
    let points = sample_points(map);
    if points.is_empty() {
        return Err(CartoError::PointcloudMapEmpty);
    }

    let mut buffer = pcd_header(points.len()).into_bytes();
    for point in &points {
        buffer.extend_from_slice(&point.x.to_le_bytes());
        buffer.extend_from_slice(&point.y.to_le_bytes());
        buffer.extend_from_slice(&point.z.to_le_bytes());
        buffer.extend_from_slice(&point.probability.to_le_bytes());
    }
    Ok(BString::from_vec(buffer))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argb(a: u8, r: u8, g: u8, b: u8) -> u32 {
        ((a as u32) << 24) | ((r as u32) << 16) | ((g as u32) << 8) | b as u32
    }

    #[test]
    fn no_snapshot_is_pointcloud_map_empty() {
        assert_eq!(
            sample_to_pcd(None).unwrap_err(),
            CartoError::PointcloudMapEmpty
        );
    }

    #[test]
    fn unobserved_pixels_are_skipped() {
        let map = PaintedMap {
            width: 1,
            height: 1,
            pixels: vec![argb(255, 0, 0, 0)], // green == 0 -> unobserved
            origin_x: 0.0,
            origin_y: 0.0,
        };
        assert_eq!(
            sample_to_pcd(Some(&map)).unwrap_err(),
            CartoError::PointcloudMapEmpty
        );
    }

    #[test]
    fn occupied_pixel_is_sampled_with_expected_probability() {
        let map = PaintedMap {
            width: 1,
            height: 1,
            pixels: vec![argb(255, 0, 255, 0)], // r=0 -> probability 100
            origin_x: 0.0,
            origin_y: 0.0,
        };
        let pcd = sample_to_pcd(Some(&map)).unwrap();
        assert!(pcd.as_bytes().ends_with(&100i32.to_le_bytes()));
    }

    #[test]
    fn pixel_coordinates_invert_y_and_scale_by_resolution() {
        let map = PaintedMap {
            width: 2,
            height: 2,
            pixels: vec![
                argb(255, 0, 0, 0),
                argb(255, 0, 0, 0),
                argb(255, 0, 255, 0),
                argb(255, 0, 0, 0),
            ],
            origin_x: 0.0,
            origin_y: 0.0,
        };
        // only pixel (0,1) is observed -> x = 0, y = -(1)*0.05
        let pcd = sample_to_pcd(Some(&map)).unwrap();
        let bytes = pcd.as_bytes();
        let body = &bytes[bytes.len() - 16..];
        let x = f32::from_le_bytes(body[0..4].try_into().unwrap());
        let y = f32::from_le_bytes(body[4..8].try_into().unwrap());
        assert_eq!(x, 0.0);
        assert_eq!(y, -0.05);
    }
}
