//! Color assignment for sequence overlays and the capture-year legend.

use std::fmt;

use serde::{Serialize, Serializer};

/// Simple RGB color.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self { Self { r, g, b } }

    /// Scale every channel by `factor` in [0, 1].
    pub fn darken(self, factor: f64) -> Self {
        let f = factor.clamp(0.0, 1.0);
        let scale = |c: u8| (c as f64 * f).round() as u8;
        Self { r: scale(self.r), g: scale(self.g), b: scale(self.b) }
    }
}

impl fmt::Display for Rgb {
    /// Format as CSS hex: #rrggbb
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", hex::encode([self.r, self.g, self.b]))
    }
}

impl Serialize for Rgb {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Base palette for sequence overlays.
const SEQUENCE_PALETTE: &[Rgb] = &[
    Rgb::new(  5, 203,  99),
    Rgb::new( 53, 175, 246),
    Rgb::new(255, 111,  89),
    Rgb::new(255, 196,  38),
    Rgb::new(176, 107, 255),
    Rgb::new(255,  92, 191),
    Rgb::new( 32, 212, 205),
    Rgb::new(140, 200,  60),
];

/// Each full pass through the palette darkens by this factor.
const CYCLE_DARKEN: f64 = 0.75;

/// Color for the `index`-th sequence. Indices past the palette reuse it, darkened
/// once per completed cycle, so repeated hues stay distinguishable.
pub fn sequence_color(index: usize) -> Rgb {
    let base = SEQUENCE_PALETTE[index % SEQUENCE_PALETTE.len()];
    let cycle = (index / SEQUENCE_PALETTE.len()) as i32;
    base.darken(CYCLE_DARKEN.powi(cycle))
}

/// Sequential ramp from oldest (cool) to newest (warm) capture year.
const YEAR_RAMP: &[Rgb] = &[
    Rgb::new( 49,  54, 149),
    Rgb::new( 69, 117, 180),
    Rgb::new(116, 173, 209),
    Rgb::new(171, 217, 233),
    Rgb::new(254, 224, 144),
    Rgb::new(253, 174,  97),
    Rgb::new(244, 109,  67),
    Rgb::new(215,  48,  39),
];

/// Color for position `rank` of `count` distinct years (0 = oldest).
pub fn year_color(rank: usize, count: usize) -> Rgb {
    if count <= 1 { return YEAR_RAMP[YEAR_RAMP.len() - 1] }
    let last = YEAR_RAMP.len() - 1;
    let pos = (rank.min(count - 1) as f64 / (count - 1) as f64 * last as f64).round() as usize;
    YEAR_RAMP[pos.min(last)]
}

/// Fallback color for features whose capture year is unknown.
pub const UNKNOWN_COLOR: Rgb = Rgb::new(150, 150, 150);
