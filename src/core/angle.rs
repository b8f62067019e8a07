//! Orientation helpers for heading checks
//!
//! Orientations are measured in radians against the x-axis (east), counter
//! clockwise, in `[-PI, PI]`. Azimuths are degrees clockwise from north.

use std::f64::consts::PI;

/// Orientation of the segment `(lat1, lon1) -> (lat2, lon2)` in the shrunk plane
pub fn calc_orientation(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let shrink = ((lat1 + lat2) / 2.0).to_radians().cos();
    let d_lat = lat2 - lat1;
    let d_lon = (lon2 - lon1) * shrink;
    d_lat.atan2(d_lon)
}

/// Convert a north-based clockwise azimuth in degrees to an x-axis angle
pub fn convert_azimuth_to_xaxis_angle(azimuth: f64) -> f64 {
    let angle = PI / 2.0 - azimuth.to_radians();
    if angle < -PI {
        angle + 2.0 * PI
    } else if angle > PI {
        angle - 2.0 * PI
    } else {
        angle
    }
}

/// Shift `orientation` by a full turn so it lies within half a turn of `base`
pub fn align_orientation(base: f64, orientation: f64) -> f64 {
    if base >= 0.0 {
        if orientation < -PI + base {
            return orientation + 2.0 * PI;
        }
    } else if orientation > PI + base {
        return orientation - 2.0 * PI;
    }
    orientation
}
