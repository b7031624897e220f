//! Symbols, logical roles and the color-to-role channel map.

use serde::{Deserialize, Serialize};

use super::hsv::{Hsv, HsvRange};

/// Classification result for a sampled region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Symbol {
    /// Start-of-transmission marker.
    Start,
    /// End-of-transmission marker.
    End,
    /// Data bit 0.
    Zero,
    /// Data bit 1.
    One,
    /// Nothing recognizable.
    None,
}

impl Symbol {
    /// Returns the data bit carried by this symbol, if any.
    #[inline]
    pub fn bit(self) -> Option<u8> {
        match self {
            Symbol::Zero => Some(0),
            Symbol::One => Some(1),
            _ => None,
        }
    }

    /// Maps a data bit to its symbol.
    #[inline]
    pub fn from_bit(bit: u8) -> Self {
        if bit == 0 {
            Symbol::Zero
        } else {
            Symbol::One
        }
    }
}

impl std::fmt::Display for Symbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Symbol::Start => "start",
            Symbol::End => "end",
            Symbol::Zero => "0",
            Symbol::One => "1",
            Symbol::None => "none",
        };
        f.write_str(name)
    }
}

/// How a logical role is recognized on screen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ColorSpec {
    /// A saturated color matched by one or more HSV boxes.
    Chromatic {
        name: String,
        /// Color the sender displays for this role.
        rgb: [u8; 3],
        ranges: Vec<HsvRange>,
    },
    /// Mean luminance below the split threshold.
    Dark,
    /// Mean luminance at or above the split threshold.
    Bright,
}

impl ColorSpec {
    fn chromatic(name: &str, rgb: [u8; 3], ranges: &[HsvRange]) -> Self {
        ColorSpec::Chromatic {
            name: name.to_string(),
            rgb,
            ranges: ranges.to_vec(),
        }
    }

    pub fn green() -> Self {
        Self::chromatic("green", [0, 255, 0], &[HsvRange::new([35, 100, 100], [85, 255, 255])])
    }

    pub fn orange() -> Self {
        Self::chromatic("orange", [255, 128, 0], &[HsvRange::new([10, 100, 100], [25, 255, 255])])
    }

    pub fn blue() -> Self {
        Self::chromatic("blue", [0, 0, 255], &[HsvRange::new([100, 100, 100], [130, 255, 255])])
    }

    pub fn magenta() -> Self {
        Self::chromatic("magenta", [255, 0, 255], &[HsvRange::new([140, 100, 100], [159, 255, 255])])
    }

    /// Red wraps around hue zero and needs two boxes.
    pub fn red() -> Self {
        Self::chromatic(
            "red",
            [255, 0, 0],
            &[
                HsvRange::new([0, 100, 100], [9, 255, 255]),
                HsvRange::new([160, 100, 100], [179, 255, 255]),
            ],
        )
    }

    /// Returns true for roles matched by hue rather than luminance.
    pub fn is_chromatic(&self) -> bool {
        matches!(self, ColorSpec::Chromatic { .. })
    }

    /// Returns true if a single HSV sample matches a chromatic spec.
    #[inline]
    pub fn matches(&self, hsv: Hsv) -> bool {
        match self {
            ColorSpec::Chromatic { ranges, .. } => ranges.iter().any(|r| r.contains(hsv)),
            _ => false,
        }
    }

    /// Color a sender shows to signal this role.
    pub fn reference_rgb(&self) -> [u8; 3] {
        match self {
            ColorSpec::Chromatic { rgb, .. } => *rgb,
            ColorSpec::Dark => [0, 0, 0],
            ColorSpec::Bright => [255, 255, 255],
        }
    }

    /// Short name for log output.
    pub fn name(&self) -> &str {
        match self {
            ColorSpec::Chromatic { name, .. } => name,
            ColorSpec::Dark => "black",
            ColorSpec::Bright => "white",
        }
    }
}

/// Assignment of physical colors to the four logical roles, plus the
/// calibration marker used to find the screen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelMap {
    /// Fraction of pixels a chromatic role must strictly exceed to win.
    pub majority: f64,
    /// Mean luminance split between dark and bright, 0-255.
    pub luminance_threshold: f32,
    pub start: ColorSpec,
    pub end: ColorSpec,
    pub zero: ColorSpec,
    pub one: ColorSpec,
    pub marker: ColorSpec,
}

impl Default for ChannelMap {
    fn default() -> Self {
        Self {
            majority: 0.5,
            luminance_threshold: 127.0,
            start: ColorSpec::green(),
            end: ColorSpec::orange(),
            zero: ColorSpec::Dark,
            one: ColorSpec::Bright,
            marker: ColorSpec::red(),
        }
    }
}

impl ChannelMap {
    /// A map carrying bits as colors instead of black and white.
    pub fn chromatic_bits() -> Self {
        Self {
            end: ColorSpec::orange(),
            zero: ColorSpec::blue(),
            one: ColorSpec::magenta(),
            ..Default::default()
        }
    }

    /// Roles in the order ties are resolved.
    pub fn precedence(&self) -> [(Symbol, &ColorSpec); 4] {
        [
            (Symbol::Start, &self.start),
            (Symbol::Zero, &self.zero),
            (Symbol::One, &self.one),
            (Symbol::End, &self.end),
        ]
    }

    /// Returns the spec a sender shows for a symbol.
    pub fn spec_for(&self, symbol: Symbol) -> Option<&ColorSpec> {
        match symbol {
            Symbol::Start => Some(&self.start),
            Symbol::End => Some(&self.end),
            Symbol::Zero => Some(&self.zero),
            Symbol::One => Some(&self.one),
            Symbol::None => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::hsv::rgb_to_hsv;

    #[test]
    fn test_reference_colors_match_their_ranges() {
        for spec in [
            ColorSpec::green(),
            ColorSpec::orange(),
            ColorSpec::blue(),
            ColorSpec::magenta(),
            ColorSpec::red(),
        ] {
            assert!(spec.matches(rgb_to_hsv(spec.reference_rgb())), "{}", spec.name());
        }
    }

    #[test]
    fn test_palette_is_disjoint() {
        let specs = [
            ColorSpec::green(),
            ColorSpec::orange(),
            ColorSpec::blue(),
            ColorSpec::magenta(),
            ColorSpec::red(),
        ];
        for a in &specs {
            for b in &specs {
                if a != b {
                    assert!(!b.matches(rgb_to_hsv(a.reference_rgb())));
                }
            }
        }
    }

    #[test]
    fn test_symbol_bits() {
        assert_eq!(Symbol::Zero.bit(), Some(0));
        assert_eq!(Symbol::One.bit(), Some(1));
        assert_eq!(Symbol::Start.bit(), None);
        assert_eq!(Symbol::from_bit(1), Symbol::One);
    }

    #[test]
    fn test_channel_map_toml_roundtrip() {
        let map = ChannelMap::chromatic_bits();
        let text = toml::to_string(&map).unwrap();
        let parsed: ChannelMap = toml::from_str(&text).unwrap();
        assert_eq!(parsed, map);
    }
}
