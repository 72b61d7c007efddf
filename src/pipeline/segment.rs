//! Description text segmentation: markdown → summary, contents and the four
//! physical-side sections of an item.
//!
//! Description documents follow a loose house style:
//!
//! ```text
//! One-paragraph summary of the item, possibly
//! wrapped over several lines.
//!
//! Contents: what the folder holds.
//!
//! **Recto**: front side text
//! **Verso**: back side text  Photo: photo notes  Institutional stamp: …
//! ```
//!
//! Sections are found by a small state machine over a token stream of plain
//! text runs and section markers. A marker only opens a section when the
//! transition table allows it from the current state; otherwise it is literal
//! text of the section it appears in. Running out of input in any state is
//! fine, so a document without `**Verso**:` simply never reaches the verso,
//! photo or stamp sections.
//!
//! ```text
//! Preamble ──Recto──▶ Recto ──Verso──▶ Verso ──Photo──▶ Photo
//!    │                                   │                │
//!    └──────────────Verso───────────────▶│                │
//!                                        └────Stamp──▶ Stamp ◀──Stamp──┘
//! ```

use once_cell::sync::Lazy;
use pulldown_cmark::{html, Options, Parser};
use regex::Regex;
use serde::{Deserialize, Serialize};

// ── Summary ──────────────────────────────────────────────────────────────────

/// Summary paragraph as an HTML fragment.
///
/// Lines are stripped and joined with a space up to (not including) the first
/// blank line. Literal `\n` escapes left by the document converter are
/// dropped before rendering. Returns `None` when nothing precedes the first
/// blank line.
pub fn extract_summary(markdown: &str) -> Option<String> {
    let mut summary = String::new();
    for line in markdown.lines() {
        let line = line.trim();
        if line.is_empty() {
            break;
        }
        summary.push_str(line);
        summary.push(' ');
    }
    let summary = summary.replace("\\n", "");
    render_fragment(&summary)
}

// ── Contents ─────────────────────────────────────────────────────────────────

static RE_CONTENTS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^Contents: (.*)\.\r?$").unwrap());

/// Text of the first `Contents: <text>.` line, verbatim (not rendered).
pub fn extract_contents(markdown: &str) -> Option<String> {
    RE_CONTENTS
        .captures(markdown)
        .map(|caps| caps[1].to_string())
}

// ── Rendering ────────────────────────────────────────────────────────────────

/// Render a markdown span to a sanitised HTML fragment.
///
/// Never invokes the renderer on blank input; returns `None` instead.
pub fn render_fragment(markdown: &str) -> Option<String> {
    if markdown.trim().is_empty() {
        return None;
    }
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_FOOTNOTES);
    options.insert(Options::ENABLE_TASKLISTS);

    let mut out = String::with_capacity(markdown.len() + 16);
    html::push_html(&mut out, Parser::new_ext(markdown, options));
    let fragment = sanitize_fragment(&out);
    (!fragment.is_empty()).then_some(fragment)
}

/// Strip paragraph tags, unescape `&amp;`, trim.
pub fn sanitize_fragment(html: &str) -> String {
    html.replace("<p>", "")
        .replace("</p>", "")
        .replace("&amp;", "&")
        .trim()
        .to_string()
}

// ── Section state machine ────────────────────────────────────────────────────

/// A section-opening marker in the description body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marker {
    /// `**Recto**:`
    Recto,
    /// `**Verso**:`
    Verso,
    /// `Photo:`
    Photo,
    /// `Institutional stamp:` or `Institutional label:`, any case.
    InstitutionalStamp,
}

/// Where the scanner currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    /// Summary and contents; not captured here.
    Preamble,
    Recto,
    Verso,
    Photo,
    InstitutionalStamp,
}

impl Section {
    /// Transition table. `None` means the marker is literal text here.
    pub fn on_marker(self, marker: Marker) -> Option<Section> {
        use Marker as M;
        use Section as S;
        match (self, marker) {
            (S::Preamble, M::Recto) => Some(S::Recto),
            (S::Preamble | S::Recto, M::Verso) => Some(S::Verso),
            (S::Verso, M::Photo) => Some(S::Photo),
            (S::Verso | S::Photo, M::InstitutionalStamp) => Some(S::InstitutionalStamp),
            _ => None,
        }
    }
}

/// One lexical unit of the description body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token<'a> {
    Text(&'a str),
    Marker { marker: Marker, text: &'a str },
}

static RE_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?P<recto>\*\*Recto\*\*:)|(?P<verso>\*\*Verso\*\*:)|(?P<photo>Photo:)|(?P<stamp>(?i:institutional (?:stamp|label)):)")
        .unwrap()
});

/// Split the body into text runs and markers, in document order.
pub fn tokenize(markdown: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    let mut last = 0;
    for caps in RE_MARKER.captures_iter(markdown) {
        let Some(whole) = caps.get(0) else { continue };
        if whole.start() > last {
            tokens.push(Token::Text(&markdown[last..whole.start()]));
        }
        let marker = if caps.name("recto").is_some() {
            Marker::Recto
        } else if caps.name("verso").is_some() {
            Marker::Verso
        } else if caps.name("photo").is_some() {
            Marker::Photo
        } else {
            Marker::InstitutionalStamp
        };
        tokens.push(Token::Marker {
            marker,
            text: whole.as_str(),
        });
        last = whole.end();
    }
    if last < markdown.len() {
        tokens.push(Token::Text(&markdown[last..]));
    }
    tokens
}

/// Raw markdown of each captured section. Empty means "not present".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sections {
    pub recto: String,
    pub verso: String,
    pub photo: String,
    pub institutional_stamp: String,
}

impl Sections {
    fn buffer(&mut self, section: Section) -> Option<&mut String> {
        match section {
            Section::Preamble => None,
            Section::Recto => Some(&mut self.recto),
            Section::Verso => Some(&mut self.verso),
            Section::Photo => Some(&mut self.photo),
            Section::InstitutionalStamp => Some(&mut self.institutional_stamp),
        }
    }

    /// Render every non-empty section to an HTML fragment.
    pub fn render(&self) -> RenderedSections {
        RenderedSections {
            recto: render_fragment(&self.recto),
            verso: render_fragment(&self.verso),
            photo: render_fragment(&self.photo),
            institutional_stamp: render_fragment(&self.institutional_stamp),
        }
    }
}

/// Rendered sections; `None` for sections that were absent or blank.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderedSections {
    pub recto: Option<String>,
    pub verso: Option<String>,
    pub photo: Option<String>,
    pub institutional_stamp: Option<String>,
}

/// Run the section state machine over a description body.
pub fn segment(markdown: &str) -> Sections {
    let mut sections = Sections::default();
    let mut state = Section::Preamble;

    for token in tokenize(markdown) {
        match token {
            Token::Text(text) => {
                if let Some(buf) = sections.buffer(state) {
                    buf.push_str(text);
                }
            }
            Token::Marker { marker, text } => match state.on_marker(marker) {
                Some(next) => state = next,
                None => {
                    if let Some(buf) = sections.buffer(state) {
                        buf.push_str(text);
                    }
                }
            },
        }
    }

    sections
}
