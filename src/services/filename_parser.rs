//! Filename parser for release-style movie filenames
//!
//! Parses filenames like:
//! - "The.Matrix.1999.1080p.mkv"
//! - "Inception (2010) BluRay x264.mkv"
//! - "Parasite.2019.KOREAN.1080p.WEBRip.mp4"

use regex::Regex;
use tracing::debug;

/// Title and year extracted from a filename
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedRelease {
    pub title: String,
    /// Four-digit release year, kept as text for the search query
    pub year: String,
}

/// Parse a filename into a candidate title and release year.
///
/// Separator punctuation is normalized to spaces, then the first run of four
/// consecutive digits that follows a non-empty leading span is taken as the
/// year and the trimmed leading span as the title. Returns None when no such
/// run exists - the parser never guesses a year.
pub fn parse_release(filename: &str) -> Option<ParsedRelease> {
    let separators = Regex::new(r"[.\[\]()]").unwrap();
    let cleaned = separators.replace_all(filename, " ");

    let title_year = Regex::new(r"^(.*?)\s*(\d{4})").unwrap();
    let caps = title_year.captures(&cleaned)?;

    let title = caps.get(1).unwrap().as_str().trim().to_string();
    if title.is_empty() {
        return None;
    }
    let year = caps.get(2).unwrap().as_str().to_string();

    debug!(filename = filename, title = %title, year = %year, "Parsed filename");

    Some(ParsedRelease { title, year })
}
