//! Terminal rendering of the view model.
//!
//! Every link control in the article gets a number, in the order
//! `Document::links` reports them, so typing that number activates it.
//! Generated text is stripped of control characters before it is printed.

use std::fmt::Write;

use chrono::{Local, TimeZone};
use crossterm::style::Stylize;
use wiki_core::{AppViewModel, HistoryRowView, PageView, Source};
use wiki_engine::{Block, Document, Inline, LinkTarget};

const APP_TITLE: &str = "Infinite Wiki";
const EXTERNAL_MARKER: &str = "↗";
const RULE: &str = "────────────────────────────────────────";

/// Secondary panel shown in place of the article.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Panel {
    History,
    Sources,
    Help,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderOptions {
    /// Emit ANSI styling.
    pub styled: bool,
    pub history_limit: usize,
}

/// Everything that goes on one screen.
pub struct Frame<'a> {
    pub view: &'a AppViewModel,
    pub document: Option<&'a Document>,
    pub panel: Option<Panel>,
    pub notice: Option<&'a str>,
}

pub fn render_frame(frame: &Frame<'_>, options: &RenderOptions) -> String {
    let painter = Painter {
        styled: options.styled,
    };
    let mut out = String::new();
    write_header(&mut out, frame.view, &painter);

    match frame.panel {
        Some(Panel::History) => write_history(
            &mut out,
            &frame.view.history,
            options.history_limit,
            &painter,
        ),
        Some(Panel::Sources) => write_sources_panel(&mut out, frame.view, &painter),
        Some(Panel::Help) => out.push_str(HELP_TEXT),
        None => write_page(&mut out, frame, options, &painter),
    }

    if let Some(notice) = frame.notice {
        out.push('\n');
        out.push_str(&painter.dim(&sanitize(notice)));
        out.push('\n');
    }
    out
}

fn write_header(out: &mut String, view: &AppViewModel, painter: &Painter) {
    let mut header = painter.bold(APP_TITLE);
    if let Some(article) = &view.article {
        if !matches!(view.page, PageView::Home { .. }) {
            let _ = write!(header, " · {}", sanitize(&article.topic));
        }
    }
    if view.streaming {
        header.push_str(&painter.dim(" (writing...)"));
    }
    out.push_str(&header);
    out.push('\n');
    out.push_str(&painter.dim(RULE));
    out.push_str("\n\n");
}

fn write_page(out: &mut String, frame: &Frame<'_>, options: &RenderOptions, painter: &Painter) {
    match &frame.view.page {
        PageView::Home { resume_topic } => {
            out.push_str("The encyclopedia that writes itself as you read.\n\n");
            out.push_str("Type any topic to open its article, or :random for a surprise.\n");
            if let Some(topic) = resume_topic {
                let _ = writeln!(
                    out,
                    "Resume reading {} with :resume",
                    painter.bold(&sanitize(topic))
                );
            }
            if !frame.view.history.is_empty() {
                out.push('\n');
                write_history(out, &frame.view.history, options.history_limit, painter);
            }
        }
        PageView::Loading { topic } => {
            let _ = writeln!(out, "Loading {} ...", painter.bold(&sanitize(topic)));
        }
        PageView::Error { message } => {
            let _ = writeln!(out, "{}", painter.error(&sanitize(message)));
            out.push_str("\nType :retry to try again or :home to go back.\n");
        }
        PageView::Viewing => {
            if let Some(document) = frame.document {
                out.push_str(&render_document(document, painter));
            }
            if let Some(article) = &frame.view.article {
                if !frame.view.streaming && !article.sources.is_empty() {
                    out.push('\n');
                    write_sources(out, &article.sources, painter);
                }
            }
            out.push_str(&painter.dim("\nType a link number to follow it, or :help."));
            out.push('\n');
        }
    }
}

fn write_history(out: &mut String, rows: &[HistoryRowView], limit: usize, painter: &Painter) {
    out.push_str(&painter.bold("Recent history"));
    out.push('\n');
    if rows.is_empty() {
        out.push_str("  (nothing yet)\n");
        return;
    }
    for (index, row) in rows.iter().take(limit).enumerate() {
        let marker = if row.is_current { "*" } else { " " };
        let _ = writeln!(
            out,
            " {marker}{:>3}. {}  {}",
            index + 1,
            sanitize(&row.topic),
            painter.dim(&format_timestamp(row.timestamp))
        );
    }
    out.push_str(&painter.dim("Open one with :h N"));
    out.push('\n');
}

fn write_sources_panel(out: &mut String, view: &AppViewModel, painter: &Painter) {
    match &view.article {
        Some(article) if !article.sources.is_empty() => {
            write_sources(out, &article.sources, painter);
        }
        _ => out.push_str("This article has no sources.\n"),
    }
}

fn write_sources(out: &mut String, sources: &[Source], painter: &Painter) {
    out.push_str(&painter.bold("References & Sources"));
    out.push('\n');
    for (index, source) in sources.iter().enumerate() {
        let _ = writeln!(
            out,
            "  [{}] {}  {}",
            index + 1,
            sanitize(&source.title),
            painter.dim(&sanitize(&source.uri))
        );
    }
}

fn format_timestamp(millis: i64) -> String {
    match Local.timestamp_millis_opt(millis).single() {
        Some(time) => time.format("%Y-%m-%d %H:%M").to_string(),
        None => String::new(),
    }
}

/// Renders an article body as terminal text with numbered links.
pub fn render_document(document: &Document, painter: &Painter) -> String {
    let mut writer = DocumentWriter {
        out: String::new(),
        painter,
        next_link: 1,
    };
    for block in &document.blocks {
        writer.block(block, "");
        writer.out.push('\n');
    }
    writer.out
}

struct DocumentWriter<'a> {
    out: String,
    painter: &'a Painter,
    next_link: usize,
}

impl DocumentWriter<'_> {
    fn block(&mut self, block: &Block, indent: &str) {
        match block {
            Block::Heading { level, content } => {
                let text = self.inlines(content, indent);
                let text = if *level == 1 {
                    self.painter.title(&text)
                } else {
                    self.painter.bold(&text)
                };
                self.out.push_str(indent);
                self.out.push_str(&text);
                self.out.push('\n');
            }
            Block::Paragraph(content) => {
                let text = self.inlines(content, indent);
                self.out.push_str(indent);
                self.out.push_str(&text);
                self.out.push('\n');
            }
            Block::List { start, items } => {
                for (offset, item) in items.iter().enumerate() {
                    let bullet = match start {
                        Some(first) => format!("{}. ", first + offset as u64),
                        None => "• ".to_string(),
                    };
                    let nested = format!("{indent}{}", " ".repeat(bullet.chars().count()));
                    self.out.push_str(indent);
                    self.out.push_str(&bullet);
                    for (position, block) in item.iter().enumerate() {
                        // The first block shares the bullet's line.
                        let block_indent = if position == 0 { "" } else { nested.as_str() };
                        self.list_item_block(block, block_indent, &nested);
                    }
                    if item.is_empty() {
                        self.out.push('\n');
                    }
                }
            }
            Block::Quote(blocks) => {
                let nested = format!("{indent}│ ");
                for block in blocks {
                    self.block(block, &nested);
                }
            }
            Block::Code { text, .. } => {
                let nested = format!("{indent}    ");
                for line in sanitize(text).lines() {
                    self.out.push_str(&nested);
                    self.out.push_str(line);
                    self.out.push('\n');
                }
            }
            Block::Rule => {
                self.out.push_str(indent);
                self.out.push_str(&self.painter.dim(RULE));
                self.out.push('\n');
            }
        }
    }

    fn list_item_block(&mut self, block: &Block, first_indent: &str, nested: &str) {
        match block {
            Block::Paragraph(content) => {
                let text = self.inlines(content, nested);
                self.out.push_str(first_indent);
                self.out.push_str(&text);
                self.out.push('\n');
            }
            other => {
                if first_indent.is_empty() {
                    self.out.push('\n');
                }
                self.block(other, nested);
            }
        }
    }

    fn inlines(&mut self, inlines: &[Inline], indent: &str) -> String {
        let mut text = String::new();
        for inline in inlines {
            self.inline(&mut text, inline, indent);
        }
        text
    }

    fn inline(&mut self, text: &mut String, inline: &Inline, indent: &str) {
        match inline {
            Inline::Text(value) => text.push_str(&sanitize(value)),
            Inline::Code(value) => text.push_str(&self.painter.code(&sanitize(value))),
            Inline::Emphasis(children) => {
                let inner = self.inlines(children, indent);
                text.push_str(&self.painter.italic(&inner));
            }
            Inline::Strong(children) => {
                let inner = self.inlines(children, indent);
                text.push_str(&self.painter.bold(&inner));
            }
            Inline::Strikethrough(children) => {
                let inner = self.inlines(children, indent);
                text.push_str(&self.painter.crossed(&inner));
            }
            Inline::Link { target, content } => {
                let number = self.next_link;
                self.next_link += 1;
                let label = Inline::plain_text(content);
                let label = sanitize(&label);
                match target {
                    LinkTarget::Wiki { .. } => {
                        let _ = write!(
                            text,
                            "{}{}",
                            self.painter.link(&label),
                            self.painter.dim(&format!("[{number}]"))
                        );
                    }
                    LinkTarget::External { .. } => {
                        let _ = write!(
                            text,
                            "{} {EXTERNAL_MARKER}{}",
                            self.painter.external(&label),
                            self.painter.dim(&format!("[{number}]"))
                        );
                    }
                }
            }
            Inline::SoftBreak => text.push(' '),
            Inline::LineBreak => {
                text.push('\n');
                text.push_str(indent);
            }
        }
    }
}

/// Applies terminal styles when styling is enabled.
pub struct Painter {
    pub styled: bool,
}

impl Painter {
    fn paint(&self, text: &str, style: impl FnOnce(&str) -> String) -> String {
        if self.styled {
            style(text)
        } else {
            text.to_string()
        }
    }

    fn bold(&self, text: &str) -> String {
        self.paint(text, |t| t.bold().to_string())
    }

    fn title(&self, text: &str) -> String {
        self.paint(text, |t| t.bold().underlined().to_string())
    }

    fn dim(&self, text: &str) -> String {
        self.paint(text, |t| t.dim().to_string())
    }

    fn italic(&self, text: &str) -> String {
        self.paint(text, |t| t.italic().to_string())
    }

    fn crossed(&self, text: &str) -> String {
        self.paint(text, |t| t.crossed_out().to_string())
    }

    fn code(&self, text: &str) -> String {
        if self.styled {
            text.yellow().to_string()
        } else {
            format!("`{text}`")
        }
    }

    fn link(&self, text: &str) -> String {
        self.paint(text, |t| t.cyan().underlined().to_string())
    }

    fn external(&self, text: &str) -> String {
        self.paint(text, |t| t.blue().underlined().to_string())
    }

    fn error(&self, text: &str) -> String {
        self.paint(text, |t| t.red().bold().to_string())
    }
}

/// Drops control characters, keeping newlines and tabs.
pub fn sanitize(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_control() || *c == '\n' || *c == '\t')
        .collect()
}

const HELP_TEXT: &str = "\
Commands
  <topic>      open the article for a topic
  <n>          follow link number n in the article
  :go <topic>  open a topic whose name is a number
  :random      open a random article
  :home        back to the home page
  :history     recent history; :h N opens entry N
  :retry       try a failed article again
  :resume      reopen the most recent article
  :sources     list the article's sources
  :help        this help
  :quit        leave
Press Enter on an empty line to return to the article.
";
