//! Stroke styling: colours, the drawing palette, tools and background themes.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::{CanvasError, CanvasResult};

/// An 8-bit RGBA colour, persisted as `#RRGGBBAA`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgba {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
    /// Alpha channel (255 = opaque).
    pub a: u8,
}

impl Rgba {
    /// Create a colour from its four channels.
    #[must_use]
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Create an opaque colour.
    #[must_use]
    pub const fn opaque(r: u8, g: u8, b: u8) -> Self {
        Self::new(r, g, b, 255)
    }

    /// Normalised `[r, g, b, a]` in `0.0..=1.0`, for renderers.
    #[must_use]
    pub fn to_f32_array(self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a].map(|c| f32::from(c) / 255.0)
    }

    /// Parse `#RRGGBBAA` or `#RRGGBB` (alpha defaults to opaque).
    ///
    /// # Errors
    ///
    /// Returns [`CanvasError::InvalidColor`] for any other shape.
    pub fn parse_hex(s: &str) -> CanvasResult<Self> {
        let invalid = || CanvasError::InvalidColor(s.to_string());
        let hex = s.strip_prefix('#').ok_or_else(invalid)?;
        if !hex.is_ascii() || !(hex.len() == 6 || hex.len() == 8) {
            return Err(invalid());
        }
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| invalid());
        let a = if hex.len() == 8 { channel(6)? } else { 255 };
        Ok(Self::new(channel(0)?, channel(2)?, channel(4)?, a))
    }
}

impl fmt::Display for Rgba {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#{:02X}{:02X}{:02X}{:02X}",
            self.r, self.g, self.b, self.a
        )
    }
}

impl FromStr for Rgba {
    type Err = CanvasError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_hex(s)
    }
}

impl Serialize for Rgba {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Rgba {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// The named drawing colours offered to learners.
pub mod palette {
    use super::Rgba;

    /// Soft near-black, the default pen colour.
    pub const CHARCOAL: Rgba = Rgba::opaque(38, 38, 46);
    /// Red.
    pub const CRIMSON: Rgba = Rgba::opaque(219, 51, 69);
    /// Blue.
    pub const AZURE: Rgba = Rgba::opaque(51, 153, 219);
    /// Green.
    pub const EMERALD: Rgba = Rgba::opaque(46, 204, 112);
    /// Yellow.
    pub const AMBER: Rgba = Rgba::opaque(245, 194, 18);
    /// Purple.
    pub const ORCHID: Rgba = Rgba::opaque(186, 84, 212);
    /// Pink.
    pub const CORAL: Rgba = Rgba::opaque(250, 128, 115);
    /// Blue-green.
    pub const TEAL: Rgba = Rgba::opaque(33, 176, 171);

    /// All palette entries in toolbar order.
    pub const ALL: [(&str, Rgba); 8] = [
        ("charcoal", CHARCOAL),
        ("crimson", CRIMSON),
        ("azure", AZURE),
        ("emerald", EMERALD),
        ("amber", AMBER),
        ("orchid", ORCHID),
        ("coral", CORAL),
        ("teal", TEAL),
    ];

    /// Look up a palette colour by name.
    #[must_use]
    pub fn by_name(name: &str) -> Option<Rgba> {
        ALL.iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, c)| *c)
    }
}

/// Drawing tool a stroke was made with.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tool {
    /// Regular ink.
    #[default]
    Pen,
    /// Eraser.
    Eraser,
}

/// Canvas background theme.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackgroundTheme {
    /// Warm paper.
    #[default]
    Cream,
    /// Dark chalkboard.
    Slate,
    /// Soft mint.
    Mint,
}

impl BackgroundTheme {
    /// Identifier used in persisted documents.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Cream => "cream",
            Self::Slate => "slate",
            Self::Mint => "mint",
        }
    }

    /// Fill colour renderers paint the background with.
    #[must_use]
    pub const fn fill(self) -> Rgba {
        match self {
            Self::Cream => Rgba::opaque(250, 245, 232),
            Self::Slate => Rgba::opaque(46, 51, 64),
            Self::Mint => Rgba::opaque(230, 250, 237),
        }
    }
}

impl fmt::Display for BackgroundTheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackgroundTheme {
    type Err = CanvasError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cream" => Ok(Self::Cream),
            "slate" => Ok(Self::Slate),
            "mint" => Ok(Self::Mint),
            other => Err(CanvasError::UnknownTheme(other.to_string())),
        }
    }
}
