//! Scale bar length and label for the current view.

use geo::Coord;

use super::map_tile::{point_resolution, EARTH_RADIUS};
use crate::config::ScaleUnit;

const MIN_WIDTH: f64 = 64.0;
const LEADING_DIGITS: [f64; 3] = [1.0, 2.0, 5.0];
const METERS_PER_DEGREE: f64 = 2.0 * std::f64::consts::PI * EARTH_RADIUS / 360.0;

#[derive(Debug, Clone, PartialEq)]
pub struct ScaleBar {
    pub width: f32,
    pub label: String,
}

/// Pick the shortest round length (1, 2 or 5 times a power of ten) that is
/// at least [`MIN_WIDTH`] pixels wide at `center`.
pub fn scale_bar(resolution: f64, center: Coord<f64>, unit: ScaleUnit) -> Option<ScaleBar> {
    let meters_per_pixel = point_resolution(resolution, center);
    let nominal = MIN_WIDTH * meters_per_pixel;
    if !nominal.is_finite() || nominal <= 0.0 {
        return None;
    }

    let (per_pixel, suffix) = match unit {
        ScaleUnit::Degrees => {
            let degrees = meters_per_pixel / METERS_PER_DEGREE;
            if nominal < METERS_PER_DEGREE / 60.0 {
                (degrees * 3600.0, "\u{2033}")
            } else if nominal < METERS_PER_DEGREE {
                (degrees * 60.0, "\u{2032}")
            } else {
                (degrees, "\u{00b0}")
            }
        }
        ScaleUnit::Imperial => {
            if nominal < 0.9144 {
                (meters_per_pixel / 0.0254, "in")
            } else if nominal < 1609.344 {
                (meters_per_pixel / 0.3048, "ft")
            } else {
                (meters_per_pixel / 1609.344, "mi")
            }
        }
        ScaleUnit::Us => {
            if nominal < 0.9144 {
                (meters_per_pixel * 39.37, "in")
            } else if nominal < 1609.344 {
                (meters_per_pixel / 0.304_800_61, "ft")
            } else {
                (meters_per_pixel / 1609.3472, "mi")
            }
        }
        ScaleUnit::Nautical => (meters_per_pixel / 1852.0, "NM"),
        ScaleUnit::Metric => {
            if nominal < 1e-3 {
                (meters_per_pixel * 1e6, "\u{03bc}m")
            } else if nominal < 1.0 {
                (meters_per_pixel * 1e3, "mm")
            } else if nominal < 1000.0 {
                (meters_per_pixel, "m")
            } else {
                (meters_per_pixel / 1000.0, "km")
            }
        }
    };

    let mut i = 3 * (MIN_WIDTH * per_pixel).log10().floor() as i32;
    loop {
        let decimals = i.div_euclid(3);
        let count = LEADING_DIGITS[i.rem_euclid(3) as usize] * 10_f64.powi(decimals);
        let width = (count / per_pixel).round();
        if width >= MIN_WIDTH {
            let precision = if decimals < 0 { (-decimals) as usize } else { 0 };
            return Some(ScaleBar {
                width: width as f32,
                label: format!("{:.*} {}", precision, count, suffix),
            });
        }
        i += 1;
    }
}
