//! Inline emphasis markup: `**bold**` and `_italic_`.
//!
//! Generated appeals use a deliberately tiny markup subset. Each line is
//! parsed on its own into styled [`Segment`]s; no style carries over to the
//! next line.
//!
//! ## Interleaved (default)
//!
//! A per-line state machine with three mutually exclusive states:
//!
//! ```text
//!            "**"                    "_"
//!   InBold ◀──────▶ Normal ◀──────▶ InItalic
//! ```
//!
//! * `**` is matched before `_` at the same position.
//! * A delimiter of the other style while inside bold or italic is literal
//!   text (no nesting).
//! * An opening delimiter with no closing partner later on the line is
//!   literal text, so `file_name` or a stray `**` do not restyle the rest of
//!   the line.
//!
//! ## First marker
//!
//! [`MarkupMode::FirstMarker`] classifies the whole line by whichever
//! delimiter type occurs first and honours only that type; the other one is
//! kept as literal text.

use crate::render::metrics::FontStyle;

/// How emphasis delimiters are interpreted on a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MarkupMode {
    /// Bold and italic runs may alternate within one line.
    #[default]
    Interleaved,
    /// Only the first delimiter type found on a line is honoured.
    FirstMarker,
}

/// A run of text with one style.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub text: String,
    pub bold: bool,
    pub italic: bool,
}

impl Segment {
    fn new(text: String, state: State) -> Self {
        Self {
            text,
            bold: state == State::InBold,
            italic: state == State::InItalic,
        }
    }

    /// Font face for this segment.
    pub fn style(&self) -> FontStyle {
        if self.bold {
            FontStyle::Bold
        } else if self.italic {
            FontStyle::Italic
        } else {
            FontStyle::Regular
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Normal,
    InBold,
    InItalic,
}

/// Which delimiters the scanner may act on.
#[derive(Debug, Clone, Copy)]
struct Delimiters {
    bold: bool,
    italic: bool,
}

const BOLD: &str = "**";
const ITALIC: &str = "_";

/// Split one line into styled segments.
///
/// Empty segments are dropped and neighbours with equal style are merged, so
/// the concatenated segment text is the line with honoured delimiters removed.
pub fn parse_line(line: &str, mode: MarkupMode) -> Vec<Segment> {
    let delimiters = match mode {
        MarkupMode::Interleaved => Delimiters {
            bold: true,
            italic: true,
        },
        MarkupMode::FirstMarker => match (line.find(BOLD), line.find(ITALIC)) {
            (Some(b), Some(i)) if i < b => Delimiters {
                bold: false,
                italic: true,
            },
            (Some(_), _) => Delimiters {
                bold: true,
                italic: false,
            },
            (None, Some(_)) => Delimiters {
                bold: false,
                italic: true,
            },
            (None, None) => Delimiters {
                bold: false,
                italic: false,
            },
        },
    };
    scan(line, delimiters)
}

fn scan(line: &str, delimiters: Delimiters) -> Vec<Segment> {
    let mut segments: Vec<Segment> = Vec::new();
    let mut state = State::Normal;
    let mut current = String::new();
    let mut pos = 0;

    while pos < line.len() {
        let rest = &line[pos..];

        if delimiters.bold && rest.starts_with(BOLD) && state != State::InItalic {
            let closes = state == State::InBold;
            if closes || rest[BOLD.len()..].contains(BOLD) {
                flush(&mut segments, &mut current, state);
                state = if closes { State::Normal } else { State::InBold };
                pos += BOLD.len();
                continue;
            }
        } else if delimiters.italic && rest.starts_with(ITALIC) && state != State::InBold {
            let closes = state == State::InItalic;
            if closes || rest[ITALIC.len()..].contains(ITALIC) {
                flush(&mut segments, &mut current, state);
                state = if closes { State::Normal } else { State::InItalic };
                pos += ITALIC.len();
                continue;
            }
        }

        // Literal character (possibly a delimiter that was not honoured).
        let ch = rest.chars().next().unwrap_or(' ');
        current.push(ch);
        pos += ch.len_utf8();
    }
    flush(&mut segments, &mut current, state);
    segments
}

fn flush(segments: &mut Vec<Segment>, current: &mut String, state: State) {
    if current.is_empty() {
        return;
    }
    let text = std::mem::take(current);
    if let Some(last) = segments.last_mut() {
        if Segment::new(String::new(), state).style() == last.style() {
            last.text.push_str(&text);
            return;
        }
    }
    segments.push(Segment::new(text, state));
}

/// The line with markup removed.
pub fn plain_text(segments: &[Segment]) -> String {
    segments.iter().map(|s| s.text.as_str()).collect()
}
