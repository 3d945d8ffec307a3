//! Outlook-compatible HTML framing
//!
//! Mail clients in the Outlook family render loose HTML with erratic
//! spacing. Every personalized body is tidied and wrapped in a Word-
//! namespace document frame with the client's expected font stack before
//! it goes on the wire.

use askama::Template;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::mail::MailError;

static EMPTY_PARAGRAPHS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)<p>\s*<br\s*/?>\s*</p>").expect("empty paragraph pattern is valid"));

static LINE_BREAK_RUNS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\r\n|\n){2,}").expect("line break run pattern is valid"));

static BLANK_LINES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n\s*\n").expect("blank line pattern is valid"));

#[derive(Template)]
#[template(path = "outlook_frame.html")]
struct OutlookFrame<'a> {
    content: &'a str,
}

/// Wrap rendered body content in the Outlook-styled document frame
///
/// The content is inserted as-is (it is already HTML); only whitespace
/// noise is cleaned up first: editor-emitted `<p><br></p>` placeholders
/// collapse to a single `<br>`, and runs of blank lines collapse to one
/// newline.
///
/// # Errors
///
/// Returns an error if the frame template fails to render.
pub fn frame_html(content: &str) -> Result<String, MailError> {
    let cleaned = tidy(content);
    Ok(OutlookFrame { content: &cleaned }.render()?)
}

fn tidy(content: &str) -> String {
    let collapsed = EMPTY_PARAGRAPHS.replace_all(content, "<br>");
    let collapsed = LINE_BREAK_RUNS.replace_all(&collapsed, "\n");
    BLANK_LINES.replace_all(&collapsed, "\n").into_owned()
}
