//! Colors, Text Attributes, and Sigils
//!
//! The toolkit does not interpret color values. An [`Attribute`] is an
//! opaque integer handed through to the terminal backend unchanged; the
//! named palette below and the [`TextAttr`] bits are symbolic names over
//! backend-defined values. A [`Sigil`] bundles one glyph with its color
//! pair and represents a single visual state of a widget.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

/// An opaque color/attribute value passed through to the backend.
///
/// The low bits carry a palette color; [`TextAttr`] bits can be or-ed in
/// with [`Attribute::with`]. The backend owns the actual meaning.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Attribute(pub u16);

impl Attribute {
    /// Terminal default color.
    pub const DEFAULT: Attribute = Attribute(0x00);
    /// Black.
    pub const BLACK: Attribute = Attribute(0x01);
    /// Red.
    pub const RED: Attribute = Attribute(0x02);
    /// Green.
    pub const GREEN: Attribute = Attribute(0x03);
    /// Yellow.
    pub const YELLOW: Attribute = Attribute(0x04);
    /// Blue.
    pub const BLUE: Attribute = Attribute(0x05);
    /// Magenta.
    pub const MAGENTA: Attribute = Attribute(0x06);
    /// Cyan.
    pub const CYAN: Attribute = Attribute(0x07);
    /// White.
    pub const WHITE: Attribute = Attribute(0x08);

    /// Combine this attribute with text attribute bits.
    #[must_use]
    pub fn with(self, attrs: TextAttr) -> Attribute {
        Attribute(self.0 | attrs.bits())
    }

    /// The raw backend value.
    #[must_use]
    pub fn raw(self) -> u16 {
        self.0
    }
}

bitflags! {
    /// Text rendering attributes, or-able into an [`Attribute`].
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct TextAttr: u16 {
        /// Bold / bright.
        const BOLD = 0x0100;
        /// Underlined.
        const UNDERLINE = 0x0200;
        /// Reverse video.
        const REVERSE = 0x0400;
    }
}

/// A foreground/background color pair.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color {
    /// Foreground attribute.
    pub fg: Attribute,
    /// Background attribute.
    pub bg: Attribute,
}

impl Color {
    /// Create a color pair.
    #[must_use]
    pub fn new(fg: Attribute, bg: Attribute) -> Self {
        Self { fg, bg }
    }
}

/// One rendered appearance of a widget: a glyph plus its color pair.
///
/// A widget's state machine carries one sigil per state so that each
/// state can present the widget with different characters or colors.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sigil {
    /// The character drawn for this state.
    pub glyph: char,
    /// Foreground attribute.
    pub fg: Attribute,
    /// Background attribute.
    pub bg: Attribute,
}

impl Sigil {
    /// Create a sigil.
    #[must_use]
    pub fn new(glyph: char, fg: Attribute, bg: Attribute) -> Self {
        Self { glyph, fg, bg }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attribute_with_text_attrs() {
        let a = Attribute::RED.with(TextAttr::BOLD | TextAttr::UNDERLINE);
        assert_eq!(a.raw(), 0x02 | 0x0100 | 0x0200);
    }

    #[test]
    fn test_attribute_passthrough_is_opaque() {
        // Values outside the named palette survive untouched.
        let a = Attribute(0x00ff);
        assert_eq!(a.raw(), 0x00ff);
    }

    #[test]
    fn test_sigil_holds_glyph_and_colors() {
        let s = Sigil::new('#', Attribute::GREEN, Attribute::BLACK);
        assert_eq!(s.glyph, '#');
        assert_eq!(s.fg, Attribute::GREEN);
        assert_eq!(s.bg, Attribute::BLACK);
    }
}
