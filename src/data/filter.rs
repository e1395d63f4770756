//! Density threshold filtering and search-box number parsing.

use super::feature::FeatureCollection;

/// Keep the features whose density is strictly greater than `threshold`,
/// in their original order.
///
/// Features without a density never qualify, and a NaN threshold yields an
/// empty collection since no comparison against NaN holds. The input is left
/// untouched; the result shares its feature handles.
pub fn filter_by_density(collection: &FeatureCollection, threshold: f64) -> FeatureCollection {
    collection.iter()
        .filter(|feature| feature.properties.density.is_some_and(|density| density > threshold))
        .cloned()
        .collect()
}

/// Convert raw search-box text into a threshold the way a browser's
/// `Number(text)` would: blank input is zero and anything unparseable is NaN.
pub fn parse_threshold(raw: &str) -> f64 {
    let text = raw.trim();
    if text.is_empty() {
        return 0.0;
    }

    match text {
        "Infinity" | "+Infinity" => return f64::INFINITY,
        "-Infinity" => return f64::NEG_INFINITY,
        _ => {}
    }

    for (prefix, radix) in [("0x", 16), ("0X", 16), ("0o", 8), ("0O", 8), ("0b", 2), ("0B", 2)] {
        if let Some(digits) = text.strip_prefix(prefix) {
            // from_str_radix takes a leading sign, Number() does not
            if !digits.chars().all(|c| c.is_digit(radix)) {
                return f64::NAN;
            }
            return u128::from_str_radix(digits, radix).map_or(f64::NAN, |n| n as f64);
        }
    }

    // Rust also accepts "inf", "infinity" and "nan" in any case; browsers do not.
    let unsigned = text.trim_start_matches(['+', '-']);
    if unsigned.starts_with(|c: char| c.is_ascii_alphabetic()) {
        return f64::NAN;
    }

    text.parse::<f64>().unwrap_or(f64::NAN)
}
