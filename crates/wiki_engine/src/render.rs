use pulldown_cmark::{CodeBlockKind, Event, HeadingLevel, Options, Parser, Tag, TagEnd};

use crate::markup::{decode_wiki_href, transform_wiki_links};

/// Schemes rendered as links; any other scheme degrades to plain text.
const SAFE_SCHEMES: &[&str] = &["http", "https", "mailto"];

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Document {
    pub blocks: Vec<Block>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Heading { level: u8, content: Vec<Inline> },
    Paragraph(Vec<Inline>),
    List {
        /// First number of an ordered list; `None` for bullets.
        start: Option<u64>,
        items: Vec<Vec<Block>>,
    },
    Quote(Vec<Block>),
    Code {
        language: Option<String>,
        text: String,
    },
    Rule,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inline {
    Text(String),
    Code(String),
    Emphasis(Vec<Inline>),
    Strong(Vec<Inline>),
    Strikethrough(Vec<Inline>),
    Link {
        target: LinkTarget,
        content: Vec<Inline>,
    },
    SoftBreak,
    LineBreak,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkTarget {
    /// In-app navigation to a generated article.
    Wiki { topic: String },
    /// Ordinary hyperlink, opened outside the app.
    External { href: String },
}

impl LinkTarget {
    /// Classifies a link destination; `None` for schemes that must not be followed.
    ///
    /// The destination is normalized the way a browser reads it (tab, CR and
    /// LF removed anywhere, C0 controls and spaces trimmed at both ends)
    /// before the scheme is checked.
    pub fn classify(href: &str) -> Option<Self> {
        let href = normalize_href(href);
        if let Some(topic) = decode_wiki_href(&href) {
            return Some(Self::Wiki { topic });
        }
        if !has_safe_scheme(&href) {
            return None;
        }
        Some(Self::External { href })
    }
}

fn normalize_href(href: &str) -> String {
    href.chars()
        .filter(|c| !matches!(c, '\t' | '\r' | '\n'))
        .collect::<String>()
        .trim_matches(|c: char| c <= ' ')
        .to_string()
}

/// Relative references (no scheme before the first `/`, `?` or `#`) pass;
/// absolute ones only with an allowed scheme.
fn has_safe_scheme(href: &str) -> bool {
    let path_start = href.find(['/', '?', '#']).unwrap_or(href.len());
    match href[..path_start].find(':') {
        None => true,
        Some(colon) => SAFE_SCHEMES
            .iter()
            .any(|scheme| href[..colon].eq_ignore_ascii_case(scheme)),
    }
}

/// One activatable link, in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkControl {
    pub target: LinkTarget,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Activation {
    /// The navigation callback was invoked with this topic.
    Navigated(String),
    /// External link; the caller opens it in a separate browsing context.
    OpenExternal(String),
    Missing,
}

impl Inline {
    pub fn plain_text(inlines: &[Inline]) -> String {
        let mut out = String::new();
        for inline in inlines {
            inline.push_plain_text(&mut out);
        }
        out
    }

    fn push_plain_text(&self, out: &mut String) {
        match self {
            Inline::Text(text) | Inline::Code(text) => out.push_str(text),
            Inline::Emphasis(children)
            | Inline::Strong(children)
            | Inline::Strikethrough(children)
            | Inline::Link {
                content: children, ..
            } => {
                for child in children {
                    child.push_plain_text(out);
                }
            }
            Inline::SoftBreak | Inline::LineBreak => out.push(' '),
        }
    }
}

impl Document {
    /// All link controls in the order a reader meets them.
    pub fn links(&self) -> Vec<LinkControl> {
        let mut links = Vec::new();
        for block in &self.blocks {
            collect_block_links(block, &mut links);
        }
        links
    }

    /// Activates link `index`. Wiki links call `navigate` with the decoded
    /// topic; external links are handed back without calling it.
    pub fn activate(&self, index: usize, navigate: impl FnOnce(&str)) -> Activation {
        match self.links().into_iter().nth(index) {
            Some(LinkControl {
                target: LinkTarget::Wiki { topic },
                ..
            }) => {
                navigate(&topic);
                Activation::Navigated(topic)
            }
            Some(LinkControl {
                target: LinkTarget::External { href },
                ..
            }) => Activation::OpenExternal(href),
            None => Activation::Missing,
        }
    }
}

fn collect_block_links(block: &Block, links: &mut Vec<LinkControl>) {
    match block {
        Block::Heading { content, .. } | Block::Paragraph(content) => {
            collect_inline_links(content, links);
        }
        Block::List { items, .. } => {
            for item in items {
                for block in item {
                    collect_block_links(block, links);
                }
            }
        }
        Block::Quote(blocks) => {
            for block in blocks {
                collect_block_links(block, links);
            }
        }
        Block::Code { .. } | Block::Rule => {}
    }
}

fn collect_inline_links(inlines: &[Inline], links: &mut Vec<LinkControl>) {
    for inline in inlines {
        match inline {
            Inline::Link { target, content } => links.push(LinkControl {
                target: target.clone(),
                label: Inline::plain_text(content),
            }),
            Inline::Emphasis(children)
            | Inline::Strong(children)
            | Inline::Strikethrough(children) => collect_inline_links(children, links),
            Inline::Text(_) | Inline::Code(_) | Inline::SoftBreak | Inline::LineBreak => {}
        }
    }
}

/// Parses article markdown, with `[[Label]]` links, into a [`Document`].
///
/// Raw HTML in the input is kept as literal text.
pub fn render_document(markdown: &str) -> Document {
    let transformed = transform_wiki_links(markdown);
    let parser = Parser::new_ext(&transformed, Options::ENABLE_STRIKETHROUGH);
    let mut builder = DocumentBuilder::default();
    for event in parser {
        builder.event(event);
    }
    builder.finish()
}

#[derive(Debug)]
enum InlineKind {
    Paragraph,
    /// Paragraph opened for inline content directly inside a tight list item
    /// or block quote.
    Implicit,
    Heading(u8),
    Emphasis,
    Strong,
    Strikethrough,
    /// `None` keeps only the content (unsafe link, image alt text).
    Link(Option<LinkTarget>),
}

#[derive(Debug)]
enum Frame {
    Quote(Vec<Block>),
    Item(Vec<Block>),
    List {
        start: Option<u64>,
        items: Vec<Vec<Block>>,
    },
    Inlines {
        kind: InlineKind,
        inlines: Vec<Inline>,
    },
    Code {
        language: Option<String>,
        text: String,
    },
}

#[derive(Debug, Default)]
struct DocumentBuilder {
    root: Vec<Block>,
    stack: Vec<Frame>,
}

impl DocumentBuilder {
    fn event(&mut self, event: Event<'_>) {
        match event {
            Event::Start(tag) => self.start(tag),
            Event::End(tag) => self.end(tag),
            Event::Text(text) => {
                if let Some(Frame::Code { text: code, .. }) = self.stack.last_mut() {
                    code.push_str(&text);
                } else {
                    self.push_inline(Inline::Text(text.into_string()));
                }
            }
            Event::Code(code) => self.push_inline(Inline::Code(code.into_string())),
            Event::Html(html) | Event::InlineHtml(html) => {
                self.push_inline(Inline::Text(html.into_string()));
            }
            Event::SoftBreak => self.push_inline(Inline::SoftBreak),
            Event::HardBreak => self.push_inline(Inline::LineBreak),
            Event::Rule => {
                self.close_implicit();
                self.push_block(Block::Rule);
            }
            Event::FootnoteReference(label) => {
                self.push_inline(Inline::Text(format!("[^{label}]")));
            }
            Event::TaskListMarker(checked) => {
                let marker = if checked { "[x] " } else { "[ ] " };
                self.push_inline(Inline::Text(marker.to_string()));
            }
            Event::InlineMath(math) | Event::DisplayMath(math) => {
                self.push_inline(Inline::Text(math.into_string()));
            }
        }
    }

    fn start(&mut self, tag: Tag<'_>) {
        match tag {
            Tag::Paragraph | Tag::HtmlBlock => self.open_block_inlines(InlineKind::Paragraph),
            Tag::Heading { level, .. } => {
                self.open_block_inlines(InlineKind::Heading(heading_level(level)));
            }
            Tag::BlockQuote(_) => {
                self.close_implicit();
                self.stack.push(Frame::Quote(Vec::new()));
            }
            Tag::CodeBlock(kind) => {
                self.close_implicit();
                let language = match kind {
                    CodeBlockKind::Fenced(info) => info
                        .split_whitespace()
                        .next()
                        .map(str::to_string),
                    CodeBlockKind::Indented => None,
                };
                self.stack.push(Frame::Code {
                    language,
                    text: String::new(),
                });
            }
            Tag::List(start) => {
                self.close_implicit();
                self.stack.push(Frame::List {
                    start,
                    items: Vec::new(),
                });
            }
            Tag::Item => self.stack.push(Frame::Item(Vec::new())),
            Tag::Emphasis => self.open_inline(InlineKind::Emphasis),
            Tag::Strong => self.open_inline(InlineKind::Strong),
            Tag::Strikethrough => self.open_inline(InlineKind::Strikethrough),
            Tag::Link { dest_url, .. } => {
                self.open_inline(InlineKind::Link(LinkTarget::classify(&dest_url)));
            }
            // Tables, footnotes and the like are not enabled; keep their text.
            _ => self.open_inline(InlineKind::Link(None)),
        }
    }

    fn end(&mut self, _tag: TagEnd) {
        // Implicit paragraphs have no start tag of their own, so any end tag
        // seen while one is open belongs to the frame beneath it.
        self.close_implicit();
        let Some(frame) = self.stack.pop() else {
            return;
        };
        match frame {
            Frame::Quote(blocks) => self.push_block(Block::Quote(blocks)),
            Frame::Item(blocks) => {
                if let Some(Frame::List { items, .. }) = self.stack.last_mut() {
                    items.push(blocks);
                } else {
                    for block in blocks {
                        self.push_block(block);
                    }
                }
            }
            Frame::List { start, items } => self.push_block(Block::List { start, items }),
            Frame::Code { language, text } => self.push_block(Block::Code { language, text }),
            Frame::Inlines { kind, inlines } => self.finish_inlines(kind, inlines),
        }
    }

    fn finish_inlines(&mut self, kind: InlineKind, inlines: Vec<Inline>) {
        match kind {
            InlineKind::Paragraph | InlineKind::Implicit => {
                if !inlines.is_empty() {
                    self.push_block(Block::Paragraph(inlines));
                }
            }
            InlineKind::Heading(level) => self.push_block(Block::Heading {
                level,
                content: inlines,
            }),
            InlineKind::Emphasis => self.push_inline(Inline::Emphasis(inlines)),
            InlineKind::Strong => self.push_inline(Inline::Strong(inlines)),
            InlineKind::Strikethrough => self.push_inline(Inline::Strikethrough(inlines)),
            InlineKind::Link(Some(target)) => self.push_inline(Inline::Link {
                target,
                content: inlines,
            }),
            InlineKind::Link(None) => {
                for inline in inlines {
                    self.push_inline(inline);
                }
            }
        }
    }

    fn open_block_inlines(&mut self, kind: InlineKind) {
        self.close_implicit();
        self.stack.push(Frame::Inlines {
            kind,
            inlines: Vec::new(),
        });
    }

    fn open_inline(&mut self, kind: InlineKind) {
        self.ensure_inline_context();
        self.stack.push(Frame::Inlines {
            kind,
            inlines: Vec::new(),
        });
    }

    fn ensure_inline_context(&mut self) {
        if !matches!(self.stack.last(), Some(Frame::Inlines { .. })) {
            self.stack.push(Frame::Inlines {
                kind: InlineKind::Implicit,
                inlines: Vec::new(),
            });
        }
    }

    fn close_implicit(&mut self) {
        if matches!(
            self.stack.last(),
            Some(Frame::Inlines {
                kind: InlineKind::Implicit,
                ..
            })
        ) {
            if let Some(Frame::Inlines { kind, inlines }) = self.stack.pop() {
                self.finish_inlines(kind, inlines);
            }
        }
    }

    fn push_inline(&mut self, inline: Inline) {
        self.ensure_inline_context();
        if let Some(Frame::Inlines { inlines, .. }) = self.stack.last_mut() {
            match (inlines.last_mut(), inline) {
                (Some(Inline::Text(previous)), Inline::Text(text)) => previous.push_str(&text),
                (_, inline) => inlines.push(inline),
            }
        }
    }

    fn push_block(&mut self, block: Block) {
        match self.stack.last_mut() {
            Some(Frame::Quote(blocks)) | Some(Frame::Item(blocks)) => blocks.push(block),
            Some(Frame::List { items, .. }) => items.push(vec![block]),
            Some(Frame::Inlines { .. }) | Some(Frame::Code { .. }) | None => self.root.push(block),
        }
    }

    fn finish(mut self) -> Document {
        while !self.stack.is_empty() {
            self.end(TagEnd::Paragraph);
        }
        Document { blocks: self.root }
    }
}

fn heading_level(level: HeadingLevel) -> u8 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}
