//! Link and Image Scanner
//!
//! Splits free text into ordered [`Segment`]s: literal text and detected
//! links. Three link shapes are recognised, tried in this order at each
//! position:
//!
//! - explicit `http://` / `https://` URLs
//! - `www.` prefixed hosts
//! - bare domains ending in a whitelisted TLD, with an optional `/path`
//!
//! Matching is greedy, case-insensitive and non-overlapping. Scanning is a
//! total function: nothing is validated, and whatever matched becomes a link.
//!
//! [`scan_document`] adds line-oriented handling for long-form content: blank
//! lines become explicit spacing markers and a leading `![alt](src)`
//! directive turns a line into an image.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Top-level domains accepted for bare (protocol-less) domains.
///
/// Two-label suffixes are listed before the single labels they overlap with.
pub const TLD_WHITELIST: &[&str] = &[
    "com", "org", "net", "edu", "gov", "io", "ai", "app", "dev", "tech", "info", "co.uk", "co.in",
    "in", "ly", "me", "cc", "tv", "fm", "tk", "ml", "ga", "cf",
];

static LINK_RE: Lazy<Regex> = Lazy::new(|| {
    let tlds = TLD_WHITELIST
        .iter()
        .map(|tld| regex::escape(tld))
        .collect::<Vec<_>>()
        .join("|");
    let pattern = format!(
        r"(?i)https?://\S+|www\.\S+|(?:[a-z0-9-]+\.)+(?:{tlds})\b(?:/\S*)?"
    );
    Regex::new(&pattern).expect("link regex pattern is valid")
});

static IMAGE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*!\[(.*?)\]\((.*?)\)").expect("image directive pattern is valid")
});

/// One atomic unit of scanned text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Segment {
    /// Literal text between links
    Text { value: String },
    /// A detected link; `display_text` is exactly what appeared in the source
    Link { display_text: String, href: String },
}

impl Segment {
    pub fn text(value: impl Into<String>) -> Self {
        Segment::Text {
            value: value.into(),
        }
    }

    /// Build a link segment from a raw match, normalising the href
    pub fn link(matched: impl Into<String>) -> Self {
        let display_text = matched.into();
        let href = normalize_href(&display_text);
        Segment::Link { display_text, href }
    }

    /// The source text this segment was produced from
    pub fn display_text(&self) -> &str {
        match self {
            Segment::Text { value } => value,
            Segment::Link { display_text, .. } => display_text,
        }
    }

    pub fn is_link(&self) -> bool {
        matches!(self, Segment::Link { .. })
    }
}

/// An image reference from a `![alt](src)` directive
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRef {
    pub alt: String,
    pub src: String,
}

/// One line of a scanned document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DocumentLine {
    /// Empty or whitespace-only line, kept to preserve paragraph breaks
    Blank,
    /// Line starting with an image directive; text after it is scanned normally
    Image {
        image: ImageRef,
        trailing: Vec<Segment>,
    },
    /// Regular line of text and links
    Inline { segments: Vec<Segment> },
}

/// Scan text for links.
///
/// Returns an empty sequence for empty input and a single `Text` segment when
/// nothing link-like is present. Joining the display text of the result
/// reproduces the input.
pub fn scan(text: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut last_end = 0;

    for m in LINK_RE.find_iter(text) {
        if m.start() > last_end {
            segments.push(Segment::text(&text[last_end..m.start()]));
        }
        segments.push(Segment::link(m.as_str()));
        last_end = m.end();
    }

    if last_end < text.len() {
        segments.push(Segment::text(&text[last_end..]));
    }

    segments
}

/// Scan a multi-line document, one [`DocumentLine`] per input line.
///
/// Only a directive at the start of a line (after leading whitespace) is an
/// image, and only the first one on that line.
pub fn scan_document(text: &str) -> Vec<DocumentLine> {
    if text.is_empty() {
        return Vec::new();
    }

    text.split('\n')
        .map(|line| scan_line(line.strip_suffix('\r').unwrap_or(line)))
        .collect()
}

fn scan_line(line: &str) -> DocumentLine {
    if line.trim().is_empty() {
        return DocumentLine::Blank;
    }

    if let Some(caps) = IMAGE_RE.captures(line) {
        let directive_end = caps.get(0).map(|m| m.end()).unwrap_or(0);
        let image = ImageRef {
            alt: caps[1].to_string(),
            src: caps[2].to_string(),
        };
        let rest = &line[directive_end..];
        let trailing = if rest.trim().is_empty() {
            Vec::new()
        } else {
            scan(rest)
        };
        return DocumentLine::Image { image, trailing };
    }

    DocumentLine::Inline {
        segments: scan(line),
    }
}

/// Resolve the href for a matched link.
///
/// Matches carrying an explicit protocol are used as-is; `www.` and bare
/// domains are opened over https.
pub fn normalize_href(matched: &str) -> String {
    let lower = matched.to_ascii_lowercase();
    if lower.starts_with("http://") || lower.starts_with("https://") {
        matched.to_string()
    } else {
        format!("https://{}", matched)
    }
}
