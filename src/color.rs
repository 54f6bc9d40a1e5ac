//! Named button colors and RGB helpers

use serde::{Deserialize, Serialize};
use std::fmt;

/// Brightness of an inactive button in `OffMode::Dim`, in percent
pub const DIM_PERCENT: u8 = 15;

/// 24-bit RGB value sent to the LED driver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub const BLACK: Rgb = Rgb(0, 0, 0);

    /// Scale every channel by `percent`/100, rounding down
    pub fn scale(self, percent: u8) -> Rgb {
        let f = |c: u8| ((c as u16 * percent.min(100) as u16) / 100) as u8;
        Rgb(f(self.0), f(self.1), f(self.2))
    }

    /// Dimmed version used for the "off" state
    pub fn dim(self) -> Rgb {
        self.scale(DIM_PERCENT)
    }

    /// 0xRRGGBB
    pub fn to_hex(self) -> u32 {
        ((self.0 as u32) << 16) | ((self.1 as u32) << 8) | self.2 as u32
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:06X}", self.to_hex())
    }
}

/// Button palette
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    Red,
    Green,
    Blue,
    Yellow,
    Cyan,
    Magenta,
    Orange,
    Purple,
    #[default]
    White,
}

impl Color {
    pub const ALL: [Color; 9] = [
        Color::Red,
        Color::Green,
        Color::Blue,
        Color::Yellow,
        Color::Cyan,
        Color::Magenta,
        Color::Orange,
        Color::Purple,
        Color::White,
    ];

    /// Case-insensitive lookup by name
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(name))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Color::Red => "red",
            Color::Green => "green",
            Color::Blue => "blue",
            Color::Yellow => "yellow",
            Color::Cyan => "cyan",
            Color::Magenta => "magenta",
            Color::Orange => "orange",
            Color::Purple => "purple",
            Color::White => "white",
        }
    }

    pub fn rgb(&self) -> Rgb {
        match self {
            Color::Red => Rgb(255, 0, 0),
            Color::Green => Rgb(0, 255, 0),
            Color::Blue => Rgb(0, 0, 255),
            Color::Yellow => Rgb(255, 255, 0),
            Color::Cyan => Rgb(0, 255, 255),
            Color::Magenta => Rgb(255, 0, 255),
            Color::Orange => Rgb(255, 128, 0),
            Color::Purple => Rgb(128, 0, 255),
            Color::White => Rgb(255, 255, 255),
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_is_case_insensitive() {
        assert_eq!(Color::from_name("RED"), Some(Color::Red));
        assert_eq!(Color::from_name("Cyan"), Some(Color::Cyan));
        assert_eq!(Color::from_name("fuschia"), None);
        assert_eq!(Color::from_name(""), None);
    }

    #[test]
    fn test_dim_rounds_down() {
        assert_eq!(Rgb(255, 0, 0).dim(), Rgb(38, 0, 0));
        assert_eq!(Rgb(255, 255, 255).dim(), Rgb(38, 38, 38));
        assert_eq!(Rgb(10, 10, 10).dim(), Rgb(1, 1, 1));
        assert_eq!(Rgb(200, 100, 50).scale(50), Rgb(100, 50, 25));
    }

    #[test]
    fn test_hex() {
        assert_eq!(Color::Orange.rgb().to_hex(), 0xFF8000);
        assert_eq!(Rgb(1, 2, 3).to_string(), "#010203");
    }
}
