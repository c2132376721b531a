//! Glyph widths for the base-14 Helvetica family.
//!
//! Export documents use the PDF standard fonts, which every viewer ships, so
//! no font program is embedded. Layout still needs real advance widths to
//! wrap lines and place styled runs. The tables below are the AFM widths
//! (1/1000 em) for printable ASCII. Helvetica-Oblique shares the regular
//! widths.

/// Font face of a run of text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FontStyle {
    Regular,
    Bold,
    Italic,
}

impl FontStyle {
    /// PDF base font name.
    pub fn base_font(self) -> &'static str {
        match self {
            FontStyle::Regular => "Helvetica",
            FontStyle::Bold => "Helvetica-Bold",
            FontStyle::Italic => "Helvetica-Oblique",
        }
    }

    /// Resource name used in page content streams.
    pub fn resource_name(self) -> &'static str {
        match self {
            FontStyle::Regular => "F1",
            FontStyle::Bold => "F2",
            FontStyle::Italic => "F3",
        }
    }
}

/// Width of anything outside the tables.
const DEFAULT_WIDTH: u16 = 556;

#[rustfmt::skip]
const HELVETICA: [u16; 95] = [
    // space ! " # $ % & ' ( ) * + , - . /
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278,
    // 0-9
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556,
    // : ; < = > ? @
    278, 278, 584, 584, 584, 556, 1015,
    // A-Z
    667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833,
    722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611,
    // [ \ ] ^ _ `
    278, 278, 278, 469, 556, 333,
    // a-z
    556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833,
    556, 556, 556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500,
    // { | } ~
    334, 260, 334, 584,
];

#[rustfmt::skip]
const HELVETICA_BOLD: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556,
    333, 333, 584, 584, 584, 611, 975,
    722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833,
    722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611,
    333, 278, 333, 584, 556, 333,
    556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889,
    611, 611, 611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500,
    389, 280, 389, 584,
];

/// Advance width of one character in 1/1000 em.
pub fn char_width(c: char, style: FontStyle) -> u16 {
    let bold = style == FontStyle::Bold;
    let code = c as u32;
    if (32..=126).contains(&code) {
        let idx = (code - 32) as usize;
        return if bold {
            HELVETICA_BOLD[idx]
        } else {
            HELVETICA[idx]
        };
    }
    match c {
        '\u{2018}' | '\u{2019}' => if bold { 278 } else { 222 },
        '\u{201C}' | '\u{201D}' => if bold { 500 } else { 333 },
        '\u{2013}' => 556,
        '\u{2014}' | '\u{2026}' => 1000,
        '\u{2022}' => 350,
        '\u{00A0}' => 278,
        _ => DEFAULT_WIDTH,
    }
}

/// Rendered width of `text` at `size` points.
pub fn text_width(text: &str, style: FontStyle, size: f32) -> f32 {
    let units: u32 = text.chars().map(|c| u32::from(char_width(c, style))).sum();
    units as f32 * size / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_widths() {
        assert_eq!(char_width(' ', FontStyle::Regular), 278);
        assert_eq!(char_width('i', FontStyle::Regular), 222);
        assert_eq!(char_width('W', FontStyle::Regular), 944);
        assert_eq!(char_width('b', FontStyle::Bold), 611);
        assert_eq!(char_width('~', FontStyle::Bold), 584);
    }

    #[test]
    fn oblique_matches_regular() {
        for c in ' '..='~' {
            assert_eq!(
                char_width(c, FontStyle::Italic),
                char_width(c, FontStyle::Regular)
            );
        }
    }

    #[test]
    fn bold_is_never_narrower() {
        for c in ' '..='~' {
            assert!(char_width(c, FontStyle::Bold) >= char_width(c, FontStyle::Regular) || c == '@');
        }
    }

    #[test]
    fn width_scales_with_size() {
        let w10 = text_width("Appeal", FontStyle::Regular, 10.0);
        let w20 = text_width("Appeal", FontStyle::Regular, 20.0);
        assert!((w20 - 2.0 * w10).abs() < 1e-3);
        // A=667 p=556 p=556 e=556 a=556 l=222
        assert!((w10 - 31.13).abs() < 1e-3);
    }

    #[test]
    fn unknown_chars_use_default() {
        assert_eq!(char_width('€', FontStyle::Regular), DEFAULT_WIDTH);
        assert_eq!(text_width("", FontStyle::Bold, 12.0), 0.0);
    }
}
