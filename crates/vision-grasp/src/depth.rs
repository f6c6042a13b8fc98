//! Depth sampling with a bounded nearest-valid search.

use crate::DepthFrame;

/// Readings at or above this are out of range for a tabletop grasp.
pub const MAX_VALID_DEPTH_MM: f64 = 10_000.0;

pub fn is_valid_depth(d: f64) -> bool {
    d > 0.0 && d < MAX_VALID_DEPTH_MM
}

/// Depth at `(u, v)`, or the nearest nonzero reading in square rings of growing radius.
///
/// Within a ring the reading closest to the center (Euclidean) wins. Gives up past
/// `max_radius` or when `(u, v)` lies outside the frame.
pub fn nearest_valid_depth(frame: &DepthFrame, u: u32, v: u32, max_radius: u32) -> Option<u16> {
    let center = frame.at(u, v)?;
    if center > 0 {
        return Some(center);
    }
    let (cu, cv) = (u as i64, v as i64);
    for r in 1..=max_radius as i64 {
        let mut best: Option<(i64, u16)> = None;
        for dv in -r..=r {
            for du in -r..=r {
                if du.abs() != r && dv.abs() != r {
                    continue;
                }
                let (x, y) = (cu + du, cv + dv);
                if !frame.contains(x, y) {
                    continue;
                }
                let Some(d) = frame.at(x as u32, y as u32) else {
                    continue;
                };
                if d == 0 {
                    continue;
                }
                let dist2 = du * du + dv * dv;
                if best.map_or(true, |(b, _)| dist2 < b) {
                    best = Some((dist2, d));
                }
            }
        }
        if let Some((_, d)) = best {
            return Some(d);
        }
    }
    None
}
