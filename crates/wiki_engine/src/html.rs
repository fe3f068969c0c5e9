//! HTML output for rendered documents.
//!
//! All text and attribute values are escaped, so generated content can never
//! introduce markup or scripts. Wiki links become `<button>` controls carrying
//! the topic in `data-topic`; the host page routes their clicks to its
//! navigation callback. External links open in a new browsing context.

use std::fmt::Write;

use crate::render::{Block, Document, Inline, LinkTarget};
use crate::GroundingSource;

pub fn to_html(document: &Document) -> String {
    let mut out = String::new();
    for block in &document.blocks {
        write_block(&mut out, block);
    }
    out
}

/// The "References & Sources" footer; empty when there are no sources.
pub fn sources_to_html(sources: &[GroundingSource]) -> String {
    if sources.is_empty() {
        return String::new();
    }
    let mut out = String::from("<section class=\"sources\"><h3>References &amp; Sources</h3><ol>");
    for (index, source) in sources.iter().enumerate() {
        out.push_str("<li>");
        let label = format!("[{}] {}", index + 1, source.title);
        match LinkTarget::classify(&source.uri) {
            Some(LinkTarget::External { href }) => {
                let _ = write!(
                    out,
                    "<a href=\"{}\" target=\"_blank\" rel=\"noopener noreferrer\" class=\"external-link\">{}</a> <span class=\"source-uri\">{}</span>",
                    escape(&href),
                    escape(&label),
                    escape(&href)
                );
            }
            _ => out.push_str(&escape(&label)),
        }
        out.push_str("</li>");
    }
    out.push_str("</ol></section>");
    out
}

fn write_block(out: &mut String, block: &Block) {
    match block {
        Block::Heading { level, content } => {
            let level = (*level).clamp(1, 6);
            let _ = write!(out, "<h{level}>");
            write_inlines(out, content);
            let _ = write!(out, "</h{level}>");
        }
        Block::Paragraph(content) => {
            out.push_str("<p>");
            write_inlines(out, content);
            out.push_str("</p>");
        }
        Block::List { start, items } => {
            let close = match start {
                Some(1) => {
                    out.push_str("<ol>");
                    "</ol>"
                }
                Some(first) => {
                    let _ = write!(out, "<ol start=\"{first}\">");
                    "</ol>"
                }
                None => {
                    out.push_str("<ul>");
                    "</ul>"
                }
            };
            for item in items {
                out.push_str("<li>");
                for block in item {
                    write_block(out, block);
                }
                out.push_str("</li>");
            }
            out.push_str(close);
        }
        Block::Quote(blocks) => {
            out.push_str("<blockquote>");
            for block in blocks {
                write_block(out, block);
            }
            out.push_str("</blockquote>");
        }
        Block::Code { language, text } => {
            match language {
                Some(language) => {
                    let _ = write!(out, "<pre><code class=\"language-{}\">", escape(language));
                }
                None => out.push_str("<pre><code>"),
            }
            out.push_str(&escape(text));
            out.push_str("</code></pre>");
        }
        Block::Rule => out.push_str("<hr />"),
    }
}

fn write_inlines(out: &mut String, inlines: &[Inline]) {
    for inline in inlines {
        write_inline(out, inline);
    }
}

fn write_inline(out: &mut String, inline: &Inline) {
    match inline {
        Inline::Text(text) => out.push_str(&escape(text)),
        Inline::Code(code) => {
            out.push_str("<code>");
            out.push_str(&escape(code));
            out.push_str("</code>");
        }
        Inline::Emphasis(children) => wrap(out, "em", children),
        Inline::Strong(children) => wrap(out, "strong", children),
        Inline::Strikethrough(children) => wrap(out, "del", children),
        Inline::Link {
            target: LinkTarget::Wiki { topic },
            content,
        } => {
            let topic = escape(topic);
            let _ = write!(
                out,
                "<button type=\"button\" class=\"wiki-link\" data-topic=\"{topic}\" title=\"Go to {topic}\">"
            );
            write_inlines(out, content);
            out.push_str("</button>");
        }
        Inline::Link {
            target: LinkTarget::External { href },
            content,
        } => {
            let _ = write!(
                out,
                "<a href=\"{}\" target=\"_blank\" rel=\"noopener noreferrer\" class=\"external-link\">",
                escape(href)
            );
            write_inlines(out, content);
            out.push_str("<span class=\"external-marker\" aria-hidden=\"true\">↗</span></a>");
        }
        Inline::SoftBreak => out.push('\n'),
        Inline::LineBreak => out.push_str("<br />"),
    }
}

fn wrap(out: &mut String, tag: &str, children: &[Inline]) {
    let _ = write!(out, "<{tag}>");
    write_inlines(out, children);
    let _ = write!(out, "</{tag}>");
}

fn escape(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}
