//! PCD (Point Cloud Data) decoder.
//!
//! Accepts the uncompressed-PCD grammar described in spec.md §6.2: a text
//! header with lines `VERSION`, `FIELDS`, `SIZE`, `TYPE`, `COUNT`, `WIDTH`,
//! `HEIGHT`, `VIEWPOINT`, `POINTS N`, `DATA ascii|binary`, followed by an
//! ASCII or little-endian binary body whose first three fields are `x y z`
//! floats (binary_compressed is rejected). Ported from the header-then-body
//! split in `examples/original_source/viam-cartographer/src/carto_facade/util.cc`'s
//! `read_pcd`, minus the PCL dependency — this is a from-scratch reader
//! sized to exactly the grammar the facade needs to accept.

use crate::time::EngineTime;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PcdError {
    #[error("pcd payload is empty")]
    Empty,
    #[error("pcd header could not be parsed: {0}")]
    HeaderParse(String),
    #[error("pcd declares fewer points than required or body is shorter than declared")]
    TooFewPoints,
    #[error("compressed pcd bodies are not supported")]
    CompressedUnsupported,
}

/// A single range point carried with an intra-scan relative time, matching
/// `cartographer::sensor::TimedRangefinderPoint`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TimedRangefinderPoint {
    pub position: (f32, f32, f32),
    /// Seconds relative to the scan's nominal time; strictly decreasing
    /// across the scan (`-i * 1e-4` for the i-th point).
    pub time: f64,
}

#[derive(Clone, Debug)]
pub struct TimedPointCloud {
    pub time: EngineTime,
    pub points: Vec<TimedRangefinderPoint>,
}

enum DataType {
    Ascii,
    Binary,
}

struct Header {
    fields: Vec<String>,
    sizes: Vec<usize>,
    points: usize,
    data_type: DataType,
    /// Byte offset of the body, valid only for `DataType::Binary`.
    body_offset: usize,
}

const REQUIRED_HEADER_LINES: &[&str] = &[
    "VERSION", "FIELDS", "SIZE", "TYPE", "COUNT", "WIDTH", "HEIGHT", "VIEWPOINT", "POINTS", "DATA",
];

fn parse_header(payload: &[u8]) -> Result<Header, PcdError> {
    let mut fields: Option<Vec<String>> = None;
    let mut sizes: Option<Vec<usize>> = None;
    let mut points: Option<usize> = None;
    let mut data_type: Option<DataType> = None;
    let mut seen = Vec::new();

    let mut offset = 0usize;
    while offset < payload.len() {
        let rest = &payload[offset..];
        let newline = rest.iter().position(|&b| b == b'\n').unwrap_or(rest.len());
        let line_bytes = &rest[..newline];
        let consumed = offset + newline + if newline < rest.len() { 1 } else { 0 };
        let line = std::str::from_utf8(line_bytes)
            .map_err(|e| PcdError::HeaderParse(e.to_string()))?
            .trim();

        if !line.is_empty() && !line.starts_with('#') {
            let mut tokens = line.split_whitespace();
            let keyword = tokens.next().unwrap_or("");
            match keyword {
                "FIELDS" => fields = Some(tokens.map(|s| s.to_string()).collect()),
                "SIZE" => {
                    sizes = Some(
                        tokens
                            .map(|s| {
                                s.parse::<usize>()
                                    .map_err(|e| PcdError::HeaderParse(e.to_string()))
                            })
                            .collect::<Result<Vec<_>, _>>()?,
                    )
                }
                "POINTS" => {
                    let n = tokens
                        .next()
                        .ok_or_else(|| PcdError::HeaderParse("POINTS missing value".into()))?;
                    points = Some(
                        n.parse::<usize>()
                            .map_err(|e| PcdError::HeaderParse(e.to_string()))?,
                    );
                }
                "DATA" => {
                    let kind = tokens
                        .next()
                        .ok_or_else(|| PcdError::HeaderParse("DATA missing value".into()))?;
                    data_type = Some(match kind {
                        "ascii" => DataType::Ascii,
                        "binary" => DataType::Binary,
                        _ => return Err(PcdError::CompressedUnsupported),
                    });
                    seen.push(keyword.to_string());
                    offset = consumed;
                    break;
                }
                _ => {}
            }
            seen.push(keyword.to_string());
        }
        offset = consumed;
        if offset >= payload.len() {
            break;
        }
    }

    for required in REQUIRED_HEADER_LINES {
        if !seen.iter().any(|k| k == required) {
            return Err(PcdError::HeaderParse(format!("missing {required} line")));
        }
    }

    let fields = fields.ok_or_else(|| PcdError::HeaderParse("missing FIELDS".into()))?;
    let sizes = sizes.ok_or_else(|| PcdError::HeaderParse("missing SIZE".into()))?;
    let points = points.ok_or_else(|| PcdError::HeaderParse("missing POINTS".into()))?;
    let data_type = data_type.ok_or_else(|| PcdError::HeaderParse("missing DATA".into()))?;

    if fields.len() < 3 || &fields[0..3] != ["x", "y", "z"] {
        return Err(PcdError::HeaderParse("FIELDS must start with x y z".into()));
    }
    if sizes.len() != fields.len() {
        return Err(PcdError::HeaderParse(
            "SIZE/FIELDS column count mismatch".into(),
        ));
    }

    Ok(Header {
        fields,
        sizes,
        points,
        data_type,
        body_offset: offset,
    })
}

/// Decodes a PCD payload into a timed point cloud, per spec.md §4.2.
///
/// Per-point intra-scan time is `-i * 1e-4` seconds, strictly decreasing.
/// The scan time is `timestamp_unix_millis` translated via [`EngineTime`].
pub fn decode(payload: &[u8], timestamp_unix_millis: i64) -> Result<TimedPointCloud, PcdError> {
    if payload.is_empty() {
        return Err(PcdError::Empty);
    }

    let header = parse_header(payload)?;
    let point_stride: usize = header.sizes.iter().sum();

    let raw_points: Vec<(f32, f32, f32)> = match header.data_type {
        DataType::Ascii => {
            let body = std::str::from_utf8(&payload[header.body_offset..])
                .map_err(|e| PcdError::HeaderParse(e.to_string()))?;
            let mut out = Vec::new();
            for line in body.lines() {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                let tokens: Vec<&str> = line.split_whitespace().collect();
                // A row must carry at least as many numbers as FIELDS
                // declares columns; a row short of the declared rgb column
                // (or any trailing column) is a malformed body, not a
                // tolerated overflow.
                if tokens.len() < header.fields.len() {
                    return Err(PcdError::TooFewPoints);
                }
                let x: f32 = tokens[0].parse().map_err(|_| PcdError::TooFewPoints)?;
                let y: f32 = tokens[1].parse().map_err(|_| PcdError::TooFewPoints)?;
                let z: f32 = tokens[2].parse().map_err(|_| PcdError::TooFewPoints)?;
                out.push((x, y, z));
                if out.len() == header.points {
                    break;
                }
            }
            out
        }
        DataType::Binary => {
            let body = &payload[header.body_offset..];
            let needed = header.points.checked_mul(point_stride).ok_or(PcdError::TooFewPoints)?;
            if body.len() < needed {
                return Err(PcdError::TooFewPoints);
            }
            let mut out = Vec::with_capacity(header.points);
            for i in 0..header.points {
                let base = i * point_stride;
                let x = f32::from_le_bytes(body[base..base + 4].try_into().unwrap());
                let y = f32::from_le_bytes(body[base + 4..base + 8].try_into().unwrap());
                let z = f32::from_le_bytes(body[base + 8..base + 12].try_into().unwrap());
                out.push((x, y, z));
            }
            out
        }
    };

    if raw_points.len() < header.points {
        return Err(PcdError::TooFewPoints);
    }

    let points = raw_points
        .into_iter()
        .enumerate()
        .map(|(i, position)| TimedRangefinderPoint {
            position,
            time: 0.0 - (i as f64) * 1e-4,
        })
        .collect();

    Ok(TimedPointCloud {
        time: EngineTime::from_unix_millis(timestamp_unix_millis),
        points,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ascii_header(points: usize, fields: &str, sizes: &str) -> String {
        format!(
            "VERSION .7\nFIELDS {fields}\nSIZE {sizes}\nTYPE F F F\nCOUNT 1 1 1\nWIDTH {points}\nHEIGHT 1\nVIEWPOINT 0 0 0 1 0 0 0\nPOINTS {points}\nDATA ascii\n"
        )
    }

    #[test]
    fn b1_empty_payload_is_empty() {
        assert_eq!(decode(&[], 0).unwrap_err(), PcdError::Empty);
    }

    #[test]
    fn decodes_ascii_points_with_decreasing_intra_scan_time() {
        let mut payload = ascii_header(3, "x y z", "4 4 4").into_bytes();
        payload.extend_from_slice(b"0 0 0\n1 1 1\n2 2 2\n");
        let cloud = decode(&payload, 1_629_037_851_000).unwrap();
        assert_eq!(cloud.points.len(), 3);
        assert!(cloud.points.windows(2).all(|w| w[0].time > w[1].time));
        assert_eq!(cloud.points[0].time, 0.0);
        assert_eq!(cloud.points[1].time, -1e-4);
    }

    #[test]
    fn b2_one_fewer_point_than_declared_is_invalid() {
        let mut payload = ascii_header(3, "x y z", "4 4 4").into_bytes();
        payload.extend_from_slice(b"0 0 0\n1 1 1\n");
        assert_eq!(decode(&payload, 0).unwrap_err(), PcdError::TooFewPoints);
    }

    #[test]
    fn b3_one_extra_point_is_truncated_to_declared_count() {
        let mut payload = ascii_header(2, "x y z", "4 4 4").into_bytes();
        payload.extend_from_slice(b"0 0 0\n1 1 1\n2 2 2\n");
        let cloud = decode(&payload, 0).unwrap();
        assert_eq!(cloud.points.len(), 2);
    }

    #[test]
    fn b5_compressed_binary_is_rejected() {
        let payload = b"VERSION .7\nFIELDS x y z\nSIZE 4 4 4\nTYPE F F F\nCOUNT 1 1 1\nWIDTH 1\nHEIGHT 1\nVIEWPOINT 0 0 0 1 0 0 0\nPOINTS 1\nDATA binary_compressed\n".to_vec();
        assert_eq!(
            decode(&payload, 0).unwrap_err(),
            PcdError::CompressedUnsupported
        );
    }

    #[test]
    fn decodes_binary_points() {
        let header = ascii_header(2, "x y z rgb", "4 4 4 4").replace("DATA ascii", "DATA binary");
        let mut payload = header.into_bytes();
        for (x, y, z) in [(0.0f32, 0.0, 0.0), (1.0, 2.0, 3.0)] {
            payload.extend_from_slice(&x.to_le_bytes());
            payload.extend_from_slice(&y.to_le_bytes());
            payload.extend_from_slice(&z.to_le_bytes());
            payload.extend_from_slice(&0i32.to_le_bytes());
        }
        let cloud = decode(&payload, 0).unwrap();
        assert_eq!(cloud.points.len(), 2);
        assert_eq!(cloud.points[1].position, (1.0, 2.0, 3.0));
    }

    #[test]
    fn b4_rows_missing_the_declared_rgb_column_are_invalid() {
        // Header declares 4 columns (x y z rgb) but the body rows only
        // carry 3 numbers — a malformed body, not a tolerated overflow.
        let mut payload = ascii_header(1, "x y z rgb", "4 4 4 4").into_bytes();
        payload.extend_from_slice(b"1 2 3\n");
        assert_eq!(decode(&payload, 0).unwrap_err(), PcdError::TooFewPoints);
    }

    #[test]
    fn three_number_points_without_a_declared_rgb_field_decode_fine() {
        let mut payload = ascii_header(1, "x y z", "4 4 4").into_bytes();
        payload.extend_from_slice(b"1 2 3\n");
        assert!(decode(&payload, 0).is_ok());
    }
}
