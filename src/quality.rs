//! Quality-driven encoder parameters (ANSI/NIST-ITL 1-2007).
//!
//! A single 1..=100 quality value selects a base compression rate of
//! `(100 / quality)^2`. The layer rate ladder runs from ten times that base down to
//! the base itself in nine equal steps; highest compression first, because the codec
//! expects layer rates in decreasing order. A base rate of 1.0 or less requests the
//! reversible (lossless) path.

use crate::constants::{
    CODE_BLOCK_SIZE, CODESTREAM_COMMENT, COMPRESSION_RATE_COUNT, DEFAULT_QUALITY,
    MAXIMUM_QUALITY, MINIMUM_QUALITY, MINIMUM_RESOLUTION_LEVELS, MINIMUM_RESOLUTION_TILE_SIZE,
    PREVIEW_COMPRESSION_RATE_MULTIPLIER,
};
use crate::plane_image::PlaneImage;
use num_enum::{IntoPrimitive, TryFromPrimitive};

/// Encoding quality, always within 1..=100.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Quality(u8);

impl Quality {
    /// Raw value meaning "not set by the caller".
    pub const UNSET: i32 = -1;
    pub const BEST: Quality = Quality(MAXIMUM_QUALITY);

    /// Clamps `value` into 1..=100. Negative values are the unset sentinel and map to 100.
    pub fn new(value: i32) -> Self {
        if value < 0 {
            return Self::default();
        }
        Self(value.clamp(MINIMUM_QUALITY as i32, MAXIMUM_QUALITY as i32) as u8)
    }

    pub fn value(self) -> u8 {
        self.0
    }

    /// `(100 / quality)^2`; 1.0 at quality 100.
    pub fn base_rate(self) -> f64 {
        let ratio = 100.0 / self.0 as f64;
        ratio * ratio
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(DEFAULT_QUALITY)
    }
}

impl From<Option<i32>> for Quality {
    fn from(value: Option<i32>) -> Self {
        value.map(Self::new).unwrap_or_default()
    }
}

/// Ten compression-rate targets, strictly descending.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompressionRateLadder {
    rates: [f64; COMPRESSION_RATE_COUNT],
    base: f64,
}

impl CompressionRateLadder {
    pub fn from_quality(quality: Quality) -> Self {
        let base = quality.base_rate();
        let max = base * PREVIEW_COMPRESSION_RATE_MULTIPLIER;
        let step = (max - base) / (COMPRESSION_RATE_COUNT - 1) as f64;

        let mut rates = [0.0; COMPRESSION_RATE_COUNT];
        for (i, rate) in rates.iter_mut().enumerate() {
            *rate = max - step * i as f64;
        }
        // Pin the endpoints so they do not pick up rounding from the steps.
        rates[0] = max;
        rates[COMPRESSION_RATE_COUNT - 1] = base;
        Self { rates, base }
    }

    pub fn rates(&self) -> &[f64; COMPRESSION_RATE_COUNT] {
        &self.rates
    }

    pub fn base_rate(&self) -> f64 {
        self.base
    }

    /// Most aggressive target (first layer).
    pub fn max_rate(&self) -> f64 {
        self.rates[0]
    }

    /// Least aggressive target (last layer).
    pub fn min_rate(&self) -> f64 {
        self.rates[COMPRESSION_RATE_COUNT - 1]
    }

    /// Decided from the base rate only.
    pub fn is_reversible(&self) -> bool {
        self.base <= 1.0
    }
}

/// Number of resolution levels for an image whose longer side is `longer_dimension`.
pub fn resolution_levels(longer_dimension: u32) -> u32 {
    let mut size = longer_dimension;
    let mut count = 1;
    while size > MINIMUM_RESOLUTION_TILE_SIZE {
        count += 1;
        size /= 2;
    }
    count.max(MINIMUM_RESOLUTION_LEVELS)
}

/// Packet progression order, numbered as in the COD marker (ISO/IEC 15444-1, Table A.16).
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum ProgressionOrder {
    Lrcp = 0,
    Rlcp = 1,
    Rpcl = 2,
    Pcrl = 3,
    Cprl = 4,
}

/// Everything the codec needs to configure one compression.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodeParameters {
    pub rates: CompressionRateLadder,
    pub layer_count: usize,
    pub irreversible: bool,
    pub multi_component_transform: bool,
    pub resolution_levels: u32,
    pub progression_order: ProgressionOrder,
    pub code_block_width: u32,
    pub code_block_height: u32,
    pub comment: String,
}

impl EncodeParameters {
    pub fn derive(quality: Quality, image: &PlaneImage) -> Self {
        let rates = CompressionRateLadder::from_quality(quality);
        let (width, height) = image.dimensions();
        Self {
            rates,
            layer_count: COMPRESSION_RATE_COUNT,
            irreversible: !rates.is_reversible(),
            multi_component_transform: image.component_count() >= 3,
            resolution_levels: resolution_levels(width.max(height)),
            progression_order: ProgressionOrder::Rpcl,
            code_block_width: CODE_BLOCK_SIZE,
            code_block_height: CODE_BLOCK_SIZE,
            comment: CODESTREAM_COMMENT.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plane_image::{ColorSpace, ComponentPlane};

    fn image(width: u32, height: u32, components: usize) -> PlaneImage {
        let plane = ComponentPlane::new(width, height, 8).unwrap();
        PlaneImage {
            color_space: if components == 1 {
                ColorSpace::Gray
            } else {
                ColorSpace::Srgb
            },
            planes: vec![plane; components],
        }
    }

    #[test]
    fn test_quality_clamping() {
        assert_eq!(Quality::new(0).value(), 1);
        assert_eq!(Quality::new(250).value(), 100);
        assert_eq!(Quality::new(Quality::UNSET).value(), 100);
        assert_eq!(Quality::new(37).value(), 37);
        assert_eq!(Quality::from(None).value(), 100);
        assert_eq!(Quality::from(Some(5)).value(), 5);
    }

    #[test]
    fn test_ladder_for_every_quality() {
        for q in 1..=100 {
            let ladder = CompressionRateLadder::from_quality(Quality::new(q));
            let rates = ladder.rates();
            assert_eq!(rates.len(), 10);
            for pair in rates.windows(2) {
                assert!(pair[0] > pair[1], "quality {q}: {rates:?}");
            }
            let ratio = rates[0] / rates[9];
            assert!((ratio - 10.0).abs() < 1e-9, "quality {q}: ratio {ratio}");
        }
    }

    #[test]
    fn test_ladder_is_evenly_spaced() {
        let ladder = CompressionRateLadder::from_quality(Quality::new(50));
        // base 4, max 40, step 4
        let expected = [40.0, 36.0, 32.0, 28.0, 24.0, 20.0, 16.0, 12.0, 8.0, 4.0];
        for (got, want) in ladder.rates().iter().zip(expected) {
            assert!((got - want).abs() < 1e-9);
        }
    }

    #[test]
    fn test_lowest_quality_is_lossy() {
        let ladder = CompressionRateLadder::from_quality(Quality::new(1));
        assert_eq!(ladder.base_rate(), 10_000.0);
        assert_eq!(ladder.max_rate(), 100_000.0);
        assert_eq!(ladder.min_rate(), 10_000.0);
        assert!(!ladder.is_reversible());
    }

    #[test]
    fn test_best_quality_is_lossless() {
        let ladder = CompressionRateLadder::from_quality(Quality::BEST);
        assert_eq!(ladder.base_rate(), 1.0);
        assert!(ladder.is_reversible());
        assert!(!CompressionRateLadder::from_quality(Quality::new(99)).is_reversible());
    }

    #[test]
    fn test_resolution_levels_floor_and_growth() {
        assert_eq!(resolution_levels(1), 6);
        assert_eq!(resolution_levels(64), 6);
        assert_eq!(resolution_levels(65), 6);
        assert_eq!(resolution_levels(1024), 6);
        assert_eq!(resolution_levels(2048), 6);
        assert_eq!(resolution_levels(4096), 7);
        assert_eq!(resolution_levels(8192), 8);

        let mut previous = resolution_levels(1);
        for size in 1..20_000 {
            let levels = resolution_levels(size);
            assert!(levels >= 6);
            assert!(levels >= previous, "size {size}");
            previous = levels;
        }
    }

    #[test]
    fn test_parameters_for_small_monochrome() {
        let params = EncodeParameters::derive(Quality::BEST, &image(64, 64, 1));
        assert_eq!(params.resolution_levels, 6);
        assert!(!params.irreversible);
        assert!(!params.multi_component_transform);
        assert_eq!(params.layer_count, 10);
        assert_eq!(params.progression_order, ProgressionOrder::Rpcl);
        assert_eq!((params.code_block_width, params.code_block_height), (32, 32));
    }

    #[test]
    fn test_parameters_for_large_rgb_at_lowest_quality() {
        let params = EncodeParameters::derive(Quality::new(1), &image(1024, 512, 3));
        assert!(params.irreversible);
        assert!(params.multi_component_transform);
        assert_eq!(params.rates.max_rate(), 100_000.0);
        assert_eq!(params.rates.min_rate(), 10_000.0);
        assert_eq!(params.resolution_levels, 6);
    }

    #[test]
    fn test_progression_order_numbering() {
        assert_eq!(u8::from(ProgressionOrder::Rpcl), 2);
        assert_eq!(ProgressionOrder::try_from(1).unwrap(), ProgressionOrder::Rlcp);
    }
}
