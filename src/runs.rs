//! Style runs to inline markdown emphasis.

use crate::cell::{slice_chars, Cell, TextStyle};

pub const BOLD_ITALIC_MARKER: &str = "***";
pub const BOLD_MARKER: &str = "**";
pub const ITALIC_MARKER: &str = "*";

/// Renders one cell as markdown, wrapping every styled span in its emphasis
/// marker. Leading and trailing whitespace of a span stays outside the
/// markers; whitespace-only spans are emitted as-is.
#[must_use]
pub fn merge_cell(cell: &Cell) -> String {
    let mut out = String::with_capacity(cell.text.len() + 8);
    for span in cell.spans() {
        let segment = slice_chars(&cell.text, span.start, span.end);
        push_wrapped(&mut out, segment, span.style);
    }
    out
}

/// Wraps `text` in the marker matching `style`.
#[must_use]
pub fn wrap(text: &str, style: TextStyle) -> String {
    let mut out = String::with_capacity(text.len() + 6);
    push_wrapped(&mut out, text, style);
    out
}

fn marker_for(style: TextStyle) -> Option<&'static str> {
    match (style.bold, style.italic) {
        (true, true) => Some(BOLD_ITALIC_MARKER),
        (true, false) => Some(BOLD_MARKER),
        (false, true) => Some(ITALIC_MARKER),
        (false, false) => None,
    }
}

fn push_wrapped(out: &mut String, text: &str, style: TextStyle) {
    let Some(marker) = marker_for(style) else {
        out.push_str(text);
        return;
    };

    let core = text.trim();
    if core.is_empty() {
        out.push_str(text);
        return;
    }

    let lead = &text[..text.len() - text.trim_start().len()];
    let trail = &text[text.trim_end().len()..];
    out.push_str(lead);
    out.push_str(marker);
    out.push_str(core);
    out.push_str(marker);
    out.push_str(trail);
}
