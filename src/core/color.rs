use serde::{Deserialize, Serialize};

use crate::error::{ChartError, ChartResult};

/// RGBA color in normalized 0..=1 channel values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub red: f64,
    pub green: f64,
    pub blue: f64,
    #[serde(default = "default_alpha")]
    pub alpha: f64,
}

fn default_alpha() -> f64 {
    1.0
}

impl Color {
    pub const BLACK: Self = Self::rgb(0.0, 0.0, 0.0);
    pub const GRAY: Self = Self::rgb(0.75, 0.75, 0.75);
    pub const ACCENT: Self = Self::rgb(0.86, 0.15, 0.15);

    #[must_use]
    pub const fn rgba(red: f64, green: f64, blue: f64, alpha: f64) -> Self {
        Self {
            red,
            green,
            blue,
            alpha,
        }
    }

    #[must_use]
    pub const fn rgb(red: f64, green: f64, blue: f64) -> Self {
        Self::rgba(red, green, blue, 1.0)
    }

    /// Color from 8-bit channels.
    #[must_use]
    pub fn from_rgb8(red: u8, green: u8, blue: u8) -> Self {
        Self::rgb(
            f64::from(red) / 255.0,
            f64::from(green) / 255.0,
            f64::from(blue) / 255.0,
        )
    }

    #[must_use]
    pub fn with_alpha(self, alpha: f64) -> Self {
        Self { alpha, ..self }
    }

    /// Linear blend; `t` is clamped to `0..=1`.
    #[must_use]
    pub fn lerp(self, other: Self, t: f64) -> Self {
        let t = t.clamp(0.0, 1.0);
        let mix = |a: f64, b: f64| a + (b - a) * t;
        Self::rgba(
            mix(self.red, other.red),
            mix(self.green, other.green),
            mix(self.blue, other.blue),
            mix(self.alpha, other.alpha),
        )
    }

    pub fn validate(self) -> ChartResult<()> {
        for (channel, value) in [
            ("red", self.red),
            ("green", self.green),
            ("blue", self.blue),
            ("alpha", self.alpha),
        ] {
            if !value.is_finite() || !(0.0..=1.0).contains(&value) {
                return Err(ChartError::InvalidStyle(format!(
                    "color channel `{channel}` must be finite and in [0, 1]"
                )));
            }
        }
        Ok(())
    }
}

/// Default categorical palette.
#[must_use]
pub fn default_palette() -> Vec<Color> {
    [
        (0x51, 0x8D, 0xB9),
        (0xB1, 0xDC, 0xEE),
        (0xFE, 0xAA, 0x30),
        (0xFF, 0xE3, 0x97),
        (0x60, 0xB5, 0x55),
        (0xB2, 0xDE, 0x94),
        (0xC3, 0x54, 0x55),
        (0xFF, 0x9E, 0x9A),
        (0x8D, 0x6A, 0xB8),
        (0xC9, 0xB3, 0xD6),
    ]
    .into_iter()
    .map(|(red, green, blue)| Color::from_rgb8(red, green, blue))
    .collect()
}

#[cfg(test)]
mod tests {
    use super::Color;

    #[test]
    fn lerp_clamps_parameter() {
        let from = Color::rgb(0.0, 0.0, 0.0);
        let to = Color::rgb(1.0, 1.0, 1.0);
        assert_eq!(from.lerp(to, 2.0), to);
        assert_eq!(from.lerp(to, 0.5), Color::rgb(0.5, 0.5, 0.5));
    }

    #[test]
    fn out_of_range_channel_is_rejected() {
        assert!(Color::rgba(0.0, 0.0, 0.0, 1.5).validate().is_err());
        assert!(Color::GRAY.validate().is_ok());
    }
}
