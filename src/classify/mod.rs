//! Symbol classification of sampled screen regions.
//!
//! A region is converted to HSV and each chromatic role in the
//! [`ChannelMap`] is scored by the fraction of its pixels falling inside
//! the role's ranges. The first role, in precedence order, whose fraction
//! strictly exceeds the majority threshold wins:
//!
//! ```text
//! START → ZERO → ONE → END → luminance fallback → NONE
//! ```
//!
//! When no chromatic role wins and the map carries luminance roles
//! (`Dark`/`Bright`), the mean over all color channels is split at the
//! configured threshold. Lines-mode bands are split on Rec. 601 luma
//! instead, as a grayscale camera image would be.

mod hsv;
mod symbol;

pub use hsv::{luminance, rgb_to_hsv, Hsv, HsvRange};
pub use symbol::{ChannelMap, ColorSpec, Symbol};

use crate::capture::Frame;
use crate::locate::Roi;

/// Maps pixel regions to [`Symbol`]s according to a [`ChannelMap`].
#[derive(Debug, Clone, Default)]
pub struct SymbolClassifier {
    map: ChannelMap,
}

impl SymbolClassifier {
    pub fn new(map: ChannelMap) -> Self {
        Self { map }
    }

    /// Returns the channel map in use.
    pub fn map(&self) -> &ChannelMap {
        &self.map
    }

    /// Classifies a region of a frame.
    pub fn classify_region(&self, frame: &Frame, roi: &Roi) -> Symbol {
        self.classify(&frame.region(roi))
    }

    /// Classifies a set of RGB pixels.
    pub fn classify(&self, pixels: &[[u8; 3]]) -> Symbol {
        if pixels.is_empty() {
            return Symbol::None;
        }

        let hsv: Vec<Hsv> = pixels.iter().map(|&p| rgb_to_hsv(p)).collect();
        for (symbol, spec) in self.map.precedence() {
            if spec.is_chromatic() && Self::fraction(&hsv, spec) > self.map.majority {
                return symbol;
            }
        }

        let mean = mean_intensity(pixels);
        let wanted = if mean < self.map.luminance_threshold {
            ColorSpec::Dark
        } else {
            ColorSpec::Bright
        };
        self.map
            .precedence()
            .into_iter()
            .find(|(_, spec)| **spec == wanted)
            .map(|(symbol, _)| symbol)
            .unwrap_or(Symbol::None)
    }

    /// Luminance-only classification: `Zero` below the threshold, `One`
    /// otherwise.
    pub fn classify_luminance(&self, pixels: &[[u8; 3]]) -> Symbol {
        if pixels.is_empty() {
            return Symbol::None;
        }
        if mean_luminance(pixels) < self.map.luminance_threshold {
            Symbol::Zero
        } else {
            Symbol::One
        }
    }

    /// Fraction of pixels matching a chromatic spec, 0.0 for luminance
    /// specs.
    pub fn role_fraction(&self, pixels: &[[u8; 3]], spec: &ColorSpec) -> f64 {
        let hsv: Vec<Hsv> = pixels.iter().map(|&p| rgb_to_hsv(p)).collect();
        Self::fraction(&hsv, spec)
    }

    /// Per-pixel match mask of a whole frame, row-major.
    pub fn mask(&self, frame: &Frame, spec: &ColorSpec) -> Vec<bool> {
        frame
            .pixels()
            .chunks_exact(crate::capture::CHANNELS)
            .map(|p| spec.matches(rgb_to_hsv([p[0], p[1], p[2]])))
            .collect()
    }

    fn fraction(hsv: &[Hsv], spec: &ColorSpec) -> f64 {
        if hsv.is_empty() {
            return 0.0;
        }
        let hits = hsv.iter().filter(|&&p| spec.matches(p)).count();
        hits as f64 / hsv.len() as f64
    }
}

/// Mean of every channel value over a pixel set.
pub fn mean_intensity(pixels: &[[u8; 3]]) -> f32 {
    if pixels.is_empty() {
        return 0.0;
    }
    let sum: u64 = pixels
        .iter()
        .flat_map(|p| p.iter())
        .map(|&c| u64::from(c))
        .sum();
    sum as f32 / (pixels.len() * 3) as f32
}

/// Mean Rec. 601 luma over a pixel set.
pub fn mean_luminance(pixels: &[[u8; 3]]) -> f32 {
    if pixels.is_empty() {
        return 0.0;
    }
    let sum: f32 = pixels.iter().map(|&p| luminance(p)).sum();
    sum / pixels.len() as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled(rgb: [u8; 3], n: usize) -> Vec<[u8; 3]> {
        vec![rgb; n]
    }

    fn split(a: [u8; 3], b: [u8; 3], n: usize) -> Vec<[u8; 3]> {
        let mut pixels = filled(a, n / 2);
        pixels.extend(filled(b, n - n / 2));
        pixels
    }

    #[test]
    fn test_uniform_reference_colors() {
        let classifier = SymbolClassifier::default();
        let map = classifier.map().clone();

        for symbol in [Symbol::Start, Symbol::End, Symbol::Zero, Symbol::One] {
            let rgb = map.spec_for(symbol).unwrap().reference_rgb();
            assert_eq!(classifier.classify(&filled(rgb, 100)), symbol, "{symbol}");
        }
    }

    #[test]
    fn test_chromatic_bit_map() {
        let classifier = SymbolClassifier::new(ChannelMap::chromatic_bits());
        let map = classifier.map().clone();

        for symbol in [Symbol::Start, Symbol::End, Symbol::Zero, Symbol::One] {
            let rgb = map.spec_for(symbol).unwrap().reference_rgb();
            assert_eq!(classifier.classify(&filled(rgb, 64)), symbol);
        }
        // No luminance roles: gray matches nothing
        assert_eq!(classifier.classify(&filled([128, 128, 128], 64)), Symbol::None);
    }

    #[test]
    fn test_even_split_is_not_a_majority() {
        // Neither half strictly exceeds 50%, so intensity decides.
        // Green averages 85 and orange ~128 over channels: ~106, dark.
        let classifier = SymbolClassifier::default();
        let pixels = split([0, 255, 0], [255, 128, 0], 100);
        assert_eq!(classifier.classify(&pixels), Symbol::Zero);
    }

    #[test]
    fn test_precedence_breaks_ties() {
        let map = ChannelMap {
            majority: 0.4,
            ..Default::default()
        };
        let classifier = SymbolClassifier::new(map);

        // Both START and END exceed 40%; START is checked first.
        let pixels = split([255, 128, 0], [0, 255, 0], 100);
        assert_eq!(classifier.classify(&pixels), Symbol::Start);

        let chromatic = SymbolClassifier::new(ChannelMap {
            majority: 0.4,
            ..ChannelMap::chromatic_bits()
        });
        // ZERO before ONE, ONE before END
        let pixels = split([255, 0, 255], [0, 0, 255], 100);
        assert_eq!(chromatic.classify(&pixels), Symbol::Zero);
        let pixels = split([255, 128, 0], [255, 0, 255], 100);
        assert_eq!(chromatic.classify(&pixels), Symbol::One);
    }

    #[test]
    fn test_majority_must_be_strict() {
        let classifier = SymbolClassifier::default();
        let mut pixels = filled([0, 255, 0], 51);
        pixels.extend(filled([0, 0, 0], 49));
        assert_eq!(classifier.classify(&pixels), Symbol::Start);

        let mut pixels = filled([0, 255, 0], 50);
        pixels.extend(filled([0, 0, 0], 50));
        // Half green (85) and half black (0) average ~42: dark
        assert_eq!(classifier.classify(&pixels), Symbol::Zero);
    }

    #[test]
    fn test_luminance_split() {
        let classifier = SymbolClassifier::default();
        assert_eq!(classifier.classify_luminance(&filled([120, 120, 120], 10)), Symbol::Zero);
        assert_eq!(classifier.classify_luminance(&filled([135, 135, 135], 10)), Symbol::One);
        assert_eq!(classifier.classify_luminance(&[]), Symbol::None);
    }

    #[test]
    fn test_fallback_averages_channels_not_luma() {
        let classifier = SymbolClassifier::default();
        // Olive sits at hue 30, between the orange and green ranges.
        // Luma ~136 would read bright; the channel mean of 110 reads dark.
        let olive = [150, 150, 30];
        assert!(mean_luminance(&[olive]) > 127.0);
        assert!(mean_intensity(&[olive]) < 127.0);
        assert_eq!(classifier.classify(&filled(olive, 10)), Symbol::Zero);
        assert_eq!(classifier.classify_luminance(&filled(olive, 10)), Symbol::One);
    }

    #[test]
    fn test_empty_region_is_none() {
        let classifier = SymbolClassifier::default();
        assert_eq!(classifier.classify(&[]), Symbol::None);
    }

    #[test]
    fn test_role_fraction() {
        let classifier = SymbolClassifier::default();
        let pixels = split([255, 0, 0], [0, 0, 0], 10);
        let fraction = classifier.role_fraction(&pixels, &ColorSpec::red());
        assert!((fraction - 0.5).abs() < 1e-9);
        assert_eq!(classifier.role_fraction(&pixels, &ColorSpec::Dark), 0.0);
    }
}
