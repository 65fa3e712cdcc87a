//! Markdown emphasis to chat-client emphasis.
//!
//! Substitution order matters: the triple-marker pattern runs first, then the
//! double, then the single. Each pass consumes marker characters that a looser
//! later pattern would otherwise re-match, and the text a pass emits is sealed
//! off from the passes after it (WhatsApp bold reuses the markdown italic star).

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;

use crate::flatten::Document;

/// Target emphasis syntax of the chat client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatDialect {
    pub bold_italic_open: &'static str,
    pub bold_italic_close: &'static str,
    pub bold: &'static str,
    pub italic: &'static str,
}

impl ChatDialect {
    /// WhatsApp: `*bold*`, `_italic_`, `*_both_*`.
    pub const WHATSAPP: Self = Self {
        bold_italic_open: "*_",
        bold_italic_close: "_*",
        bold: "*",
        italic: "_",
    };
}

impl Default for ChatDialect {
    fn default() -> Self {
        Self::WHATSAPP
    }
}

/// Markdown awaiting translation. [`ChatText`] has no conversion into it, so
/// translated text cannot be fed back by accident.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Markdown(String);

impl Markdown {
    #[must_use]
    pub fn new(markdown: impl Into<String>) -> Self {
        Self(markdown.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<Document> for Markdown {
    fn from(document: Document) -> Self {
        Self(document.into_string())
    }
}

impl From<&Document> for Markdown {
    fn from(document: &Document) -> Self {
        Self(document.as_str().to_owned())
    }
}

/// Text already rewritten into a chat dialect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatText(String);

impl ChatText {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_string(self) -> String {
        self.0
    }
}

impl AsRef<str> for ChatText {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChatText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn bold_italic_regex() -> &'static Regex {
    static CACHED: OnceLock<Regex> = OnceLock::new();
    CACHED.get_or_init(|| {
        Regex::new(r"\*\*\*([^*]+)\*\*\*").expect("bold-italic regex must compile")
    })
}

fn bold_regex() -> &'static Regex {
    static CACHED: OnceLock<Regex> = OnceLock::new();
    CACHED.get_or_init(|| Regex::new(r"\*\*([^*]+)\*\*").expect("bold regex must compile"))
}

/// Translates markdown emphasis into `dialect`.
#[must_use]
pub fn translate_with(markdown: &Markdown, dialect: &ChatDialect) -> ChatText {
    let markdown = markdown.as_str();
    if !markdown.contains('*') {
        return ChatText(markdown.to_owned());
    }

    let pieces = vec![Piece::Raw(markdown.to_owned())];
    let pieces = run_pass(pieces, |text, out| {
        wrap_matches(
            bold_italic_regex(),
            dialect.bold_italic_open,
            dialect.bold_italic_close,
            text,
            out,
        );
    });
    let pieces = run_pass(pieces, |text, out| {
        wrap_matches(bold_regex(), dialect.bold, dialect.bold, text, out);
    });
    let pieces = run_pass(pieces, |text, out| {
        wrap_single_markers(dialect, text, out);
    });

    let mut translated = String::with_capacity(markdown.len());
    for piece in &pieces {
        match piece {
            Piece::Raw(text) | Piece::Translated(text) => translated.push_str(text),
        }
    }
    ChatText(translated)
}

/// Translates markdown emphasis into WhatsApp syntax.
#[must_use]
pub fn markdown_to_whatsapp(markdown: &Markdown) -> ChatText {
    translate_with(markdown, &ChatDialect::WHATSAPP)
}

/// Output of an earlier pass is never rescanned by a later one.
enum Piece {
    Raw(String),
    Translated(String),
}

fn run_pass<F>(pieces: Vec<Piece>, pass: F) -> Vec<Piece>
where
    F: Fn(&str, &mut Vec<Piece>),
{
    let mut out = Vec::with_capacity(pieces.len());
    for piece in pieces {
        match piece {
            Piece::Raw(text) => pass(&text, &mut out),
            translated @ Piece::Translated(_) => out.push(translated),
        }
    }
    out
}

fn push_raw(out: &mut Vec<Piece>, text: &str) {
    if !text.is_empty() {
        out.push(Piece::Raw(text.to_owned()));
    }
}

fn wrap_matches(regex: &Regex, open: &str, close: &str, text: &str, out: &mut Vec<Piece>) {
    let mut copied = 0;
    for captures in regex.captures_iter(text) {
        let (Some(whole), Some(inner)) = (captures.get(0), captures.get(1)) else {
            continue;
        };
        push_raw(out, &text[copied..whole.start()]);
        out.push(Piece::Translated(format!("{open}{}{close}", inner.as_str())));
        copied = whole.end();
    }
    push_raw(out, &text[copied..]);
}

/// Wraps `*x*` in italic markers when neither star touches another star.
///
/// The content may not contain `*`, so the closing marker is always the first
/// star after the opener. A candidate that fails the adjacency check is kept
/// verbatim and scanning resumes at the next character. A span that is already
/// a bold-italic wrap of `dialect` is kept verbatim as a whole.
fn wrap_single_markers(dialect: &ChatDialect, text: &str, out: &mut Vec<Piece>) {
    let italic = dialect.italic;
    let bytes = text.as_bytes();
    let mut copied = 0;
    let mut index = 0;

    while index < bytes.len() {
        if bytes[index] != b'*' || (index > 0 && bytes[index - 1] == b'*') {
            index += 1;
            continue;
        }

        let Some(offset) = text[index + 1..].find('*') else {
            break;
        };
        let close = index + 1 + offset;
        let touches_next = bytes.get(close + 1) == Some(&b'*');
        if close == index + 1 || touches_next {
            index += 1;
            continue;
        }

        if is_bold_italic_wrap(&text[index..=close], dialect) {
            index = close + 1;
            continue;
        }

        push_raw(out, &text[copied..index]);
        out.push(Piece::Translated(format!(
            "{italic}{}{italic}",
            &text[index + 1..close]
        )));
        copied = close + 1;
        index = close + 1;
    }

    push_raw(out, &text[copied..]);
}

fn is_bold_italic_wrap(span: &str, dialect: &ChatDialect) -> bool {
    let (open, close) = (dialect.bold_italic_open, dialect.bold_italic_close);
    span.len() > open.len() + close.len() && span.starts_with(open) && span.ends_with(close)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn md(text: &str) -> Markdown {
        Markdown::new(text)
    }

    #[test]
    fn precedence_scopes_each_marker_kind() {
        assert_eq!(
            markdown_to_whatsapp(&md("***x*** **y** *z*")).as_str(),
            "*_x_* *y* _z_"
        );
    }

    #[test]
    fn text_without_markers_passes_through() {
        let input = "Plain notes_with_underscores and 3 > 2";
        assert_eq!(markdown_to_whatsapp(&md(input)).as_str(), input);
        let again = markdown_to_whatsapp(&md(markdown_to_whatsapp(&md(input)).as_str()));
        assert_eq!(again.as_str(), input);
    }

    #[test]
    fn italic_only_output_is_stable_under_second_pass() {
        let once = markdown_to_whatsapp(&md("an *aside* here"));
        assert_eq!(once.as_str(), "an _aside_ here");
        assert_eq!(markdown_to_whatsapp(&md(once.as_str())), once);
    }

    #[test]
    fn second_pass_keeps_bold_italic_wrap() {
        let once = markdown_to_whatsapp(&md("***x*** **y** *z*"));
        assert_eq!(once.as_str(), "*_x_* *y* _z_");

        let twice = markdown_to_whatsapp(&md(once.as_str()));
        assert!(twice.as_str().starts_with("*_x_* "));
        assert!(twice.as_str().ends_with(" _z_"));
        assert!(!twice.as_str().contains("__"));
    }

    #[test]
    fn bold_italic_wrap_is_kept_beside_a_real_italic() {
        assert_eq!(
            markdown_to_whatsapp(&md("*_done_* and *next*")).as_str(),
            "*_done_* and _next_"
        );
    }

    #[test]
    fn single_marker_next_to_another_star_is_left_alone() {
        assert_eq!(markdown_to_whatsapp(&md("a ** b")).as_str(), "a ** b");
        assert_eq!(markdown_to_whatsapp(&md("x **y")).as_str(), "x **y");
    }

    #[test]
    fn adjacent_runs_from_one_cell_translate_separately() {
        assert_eq!(
            markdown_to_whatsapp(&md("**Hello***World*")).as_str(),
            "*Hello*_World_"
        );
    }

    #[test]
    fn lone_stars_are_preserved() {
        assert_eq!(markdown_to_whatsapp(&md("5 * 3 = 15")).as_str(), "5 * 3 = 15");
    }

    #[test]
    fn multiline_and_multibyte_content_translates() {
        assert_eq!(
            markdown_to_whatsapp(&md("**Résumé**\n*naïve* café")).as_str(),
            "*Résumé*\n_naïve_ café"
        );
    }

    #[test]
    fn custom_dialect_uses_its_tokens() {
        let dialect = ChatDialect {
            bold_italic_open: "<bi>",
            bold_italic_close: "</bi>",
            bold: "%",
            italic: "~",
        };
        assert_eq!(
            translate_with(&md("***a*** **b** *c*"), &dialect).as_str(),
            "<bi>a</bi> %b% ~c~"
        );
    }
}
