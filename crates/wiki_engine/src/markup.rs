//! `[[Label]]` wiki-link syntax.
//!
//! Each occurrence becomes a standard markdown link whose target is the
//! label, percent-encoded, under the reserved `#wiki/` prefix. Matching is
//! non-greedy and never crosses a line break, so `[[A]] and [[B]]` yields two
//! links. Everything outside the brackets is left untouched.

use std::borrow::Cow;
use std::sync::LazyLock;

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use regex::{Captures, Regex};

/// Link-target prefix that marks in-app navigation.
pub const WIKI_LINK_PREFIX: &str = "#wiki/";

/// Characters kept verbatim, mirroring `encodeURIComponent` minus the
/// parentheses, which would end a markdown link destination early.
const LABEL_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'');

static WIKI_LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[\[(.*?)\]\]").expect("wiki link pattern is valid"));

/// Rewrites every `[[Label]]` into `[Label](#wiki/Label)`.
pub fn transform_wiki_links(text: &str) -> Cow<'_, str> {
    WIKI_LINK.replace_all(text, |caps: &Captures<'_>| {
        let label = &caps[1];
        if label.trim().is_empty() {
            return caps[0].to_string();
        }
        format!("[{}]({})", escape_link_text(label), wiki_href(label))
    })
}

/// Internal link target for `label`.
pub fn wiki_href(label: &str) -> String {
    format!(
        "{WIKI_LINK_PREFIX}{}",
        utf8_percent_encode(label, LABEL_ENCODE_SET)
    )
}

/// Recovers the label from an internal link target; `None` for any other link.
pub fn decode_wiki_href(href: &str) -> Option<String> {
    let encoded = href.strip_prefix(WIKI_LINK_PREFIX)?;
    Some(percent_decode_str(encoded).decode_utf8_lossy().into_owned())
}

fn escape_link_text(label: &str) -> String {
    let mut escaped = String::with_capacity(label.len());
    for ch in label.chars() {
        if matches!(ch, '\\' | '[' | ']') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}
