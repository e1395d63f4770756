//! Density color scale used to shade the state polygons.

use std::fmt;

use egui::Color32;

/// One of the seven shading tiers. Variants are declared from the lowest
/// density tier to the highest, so the derived ordering follows density.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ColorBucket {
    AtMost5,
    Above5,
    Above10,
    Above20,
    Above50,
    Above100,
    Above200,
}

/// (exclusive lower bound, bucket), evaluated top-down.
const LADDER: &[(f64, ColorBucket)] = &[
    (200.0, ColorBucket::Above200),
    (100.0, ColorBucket::Above100),
    ( 50.0, ColorBucket::Above50),
    ( 20.0, ColorBucket::Above20),
    ( 10.0, ColorBucket::Above10),
    (  5.0, ColorBucket::Above5),
];

/// Map a density value onto its color bucket.
///
/// The ladder is strict at every edge: `classify(100.0)` lands in the `> 50`
/// tier. NaN never compares greater than anything and falls through to the
/// lowest tier.
pub fn classify(density: f64) -> ColorBucket {
    LADDER.iter()
        .find(|&&(lower, _)| density > lower)
        .map(|&(_, bucket)| bucket)
        .unwrap_or(ColorBucket::AtMost5)
}

/// Same as [`classify`], with a missing density treated as the lowest tier.
pub fn classify_opt(density: Option<f64>) -> ColorBucket {
    density.map_or(ColorBucket::AtMost5, classify)
}

impl ColorBucket {
    /// All buckets, highest density first (legend order).
    pub const ALL: [ColorBucket; 7] = [
        ColorBucket::Above200,
        ColorBucket::Above100,
        ColorBucket::Above50,
        ColorBucket::Above20,
        ColorBucket::Above10,
        ColorBucket::Above5,
        ColorBucket::AtMost5,
    ];

    pub fn hex(self) -> &'static str {
        match self {
            ColorBucket::Above200 => "#13202D",
            ColorBucket::Above100 => "#14293D",
            ColorBucket::Above50  => "#16304D",
            ColorBucket::Above20  => "#1D365C",
            ColorBucket::Above10  => "#243A6B",
            ColorBucket::Above5   => "#2A417B",
            ColorBucket::AtMost5  => "#2B448C",
        }
    }

    pub fn color(self) -> Color32 {
        match self {
            ColorBucket::Above200 => Color32::from_rgb(0x13, 0x20, 0x2D),
            ColorBucket::Above100 => Color32::from_rgb(0x14, 0x29, 0x3D),
            ColorBucket::Above50  => Color32::from_rgb(0x16, 0x30, 0x4D),
            ColorBucket::Above20  => Color32::from_rgb(0x1D, 0x36, 0x5C),
            ColorBucket::Above10  => Color32::from_rgb(0x24, 0x3A, 0x6B),
            ColorBucket::Above5   => Color32::from_rgb(0x2A, 0x41, 0x7B),
            ColorBucket::AtMost5  => Color32::from_rgb(0x2B, 0x44, 0x8C),
        }
    }

    /// Exclusive lower bound of the tier, `None` for the catch-all tier.
    pub fn lower_bound(self) -> Option<f64> {
        LADDER.iter().find(|&&(_, bucket)| bucket == self).map(|&(lower, _)| lower)
    }

    /// Legend text, e.g. `> 200` or `0 - 5`.
    pub fn label(self) -> String {
        match self.lower_bound() {
            Some(lower) => format!("> {}", lower),
            None => "0 - 5".to_string(),
        }
    }
}

impl fmt::Display for ColorBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.hex())
    }
}
