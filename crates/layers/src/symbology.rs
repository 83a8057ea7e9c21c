use std::fmt;

use dataset::{Category, Node};

use crate::emoji::is_emoji_presentation;

const FNV_OFFSET_BASIS: u32 = 0x811c_9dc5;
const FNV_PRIME: u32 = 0x0100_0193;

pub const DEFAULT_SATURATION: u8 = 60;
pub const DEFAULT_LIGHTNESS: u8 = 50;

/// CSS `hsl()` color. Displays as e.g. `hsl(143deg, 60%, 50%)`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct HslColor {
    pub hue: u16,
    pub saturation: u8,
    pub lightness: u8,
}

impl fmt::Display for HslColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "hsl({}deg, {}%, {}%)",
            self.hue, self.saturation, self.lightness
        )
    }
}

/// 32-bit FNV-1a over the UTF-16 code units of `s`.
///
/// Arithmetic wraps at 32 bits so hues match the ones browsers compute for the
/// same names.
pub fn fnv1a_utf16(s: &str) -> u32 {
    s.encode_utf16().fold(FNV_OFFSET_BASIS, |hash, unit| {
        (hash ^ u32::from(unit)).wrapping_mul(FNV_PRIME)
    })
}

pub fn color(name: &str) -> HslColor {
    color_with(name, DEFAULT_SATURATION, DEFAULT_LIGHTNESS)
}

pub fn color_with(name: &str, saturation: u8, lightness: u8) -> HslColor {
    HslColor {
        hue: (fnv1a_utf16(name) % 360) as u16,
        saturation,
        lightness,
    }
}

/// Short badge text for a node name.
///
/// The first pictograph in the name wins. Otherwise the initial of a single
/// word, or the initials of the first and last space-separated words.
pub fn label(name: &str) -> String {
    if name.is_empty() {
        return String::new();
    }
    if let Some(symbol) = name.chars().find(|c| is_emoji_presentation(*c)) {
        return symbol.to_string();
    }

    let trimmed = name.trim();
    let segments: Vec<&str> = trimmed.split(' ').collect();
    let initial = |s: &str| s.chars().next();
    match segments.as_slice() {
        [only] => initial(*only).map(String::from).unwrap_or_default(),
        [first, .., last] => initial(*first).into_iter().chain(initial(*last)).collect(),
        [] => String::new(),
    }
}

/// How a marker is drawn.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Glyph {
    /// Category icon image.
    Icon { url: String },
    /// Colored circle with a short text label, derived from the node name.
    Badge { text: String, color: HslColor },
    /// Used for categories this build does not know.
    Fallback { url: String },
}

/// Per-node drawing parameters handed to the backend.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MarkerStyle {
    pub glyph: Glyph,
    pub title: String,
}

pub fn icon_url(category: Category) -> String {
    format!("img/node_types/{}.svg", category.code())
}

pub const FALLBACK_ICON_URL: &str = "img/node_types/unknown.svg";

/// Pure per-node style. Clients get a name badge; the other known categories
/// use their icon.
pub fn marker_style(node: &Node) -> MarkerStyle {
    let glyph = match node.category() {
        Category::Client => Glyph::Badge {
            text: label(node.name()),
            color: color(node.name()),
        },
        Category::Unknown(_) => Glyph::Fallback {
            url: FALLBACK_ICON_URL.to_string(),
        },
        known => Glyph::Icon {
            url: icon_url(known),
        },
    };
    MarkerStyle {
        glyph,
        title: node.name().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_vectors() {
        assert_eq!(label("Alice Example"), "AE");
        assert_eq!(label("Bob"), "B");
        assert_eq!(label(""), "");
        assert_eq!(label("  Zed  "), "Z");
        assert_eq!(label("Ann  de Lee"), "AL");
        assert_eq!(label("📡 Relay"), "📡");
        assert_eq!(label("Base 🚀 Camp ⚡"), "🚀");
        assert_eq!(label("   "), "");
        assert_eq!(label("Žilina Node"), "ŽN");
    }

    #[test]
    fn hash_golden_vectors() {
        assert_eq!(fnv1a_utf16(""), 0x811c_9dc5);
        assert_eq!(fnv1a_utf16("a"), 0xe40c_292c);
        assert_eq!(fnv1a_utf16("Alice"), 0x2cdd_8587);
        assert_eq!(fnv1a_utf16("📡 Relay"), 0xbe00_4756);
        assert_eq!(fnv1a_utf16("Zürich Hub"), 0x4ebe_0a4e);
    }

    #[test]
    fn color_is_deterministic() {
        assert_eq!(color("Alice").hue, 143);
        assert_eq!(color("Bob").hue, 220);
        assert_eq!(color("").hue, 61);
        assert_eq!(color("Alice"), color("Alice"));
        assert_eq!(color("Alice").to_string(), "hsl(143deg, 60%, 50%)");
        assert_eq!(color_with("Alice", 40, 30).to_string(), "hsl(143deg, 40%, 30%)");
    }
}
