//! Markdown → ordered preview blocks with row geometry.
//!
//! This is a small stand-in for a real renderer: it produces exactly what the sync
//! engine consumes from a preview (block elements in document order with their text and
//! vertical position) plus display lines for a terminal front end.

use pulldown_cmark::{Event, Options, Parser, Tag, TagEnd};

use crate::surface::{BlockKind, ElementId, PreviewBlock};

const RULE_LINE: &str = "────────";

/// A rendered block and where it sits
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedBlock {
    pub block: PreviewBlock,
    /// Display lines, already wrapped
    pub lines: Vec<String>,
    /// Row of the first display line
    pub top: usize,
}

impl RenderedBlock {
    /// Rows occupied including the blank separator row below the block
    pub fn height(&self) -> usize {
        self.lines.len() + 1
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderedDocument {
    blocks: Vec<RenderedBlock>,
}

impl RenderedDocument {
    pub fn blocks(&self) -> &[RenderedBlock] {
        &self.blocks
    }

    pub fn preview_blocks(&self) -> Vec<PreviewBlock> {
        self.blocks.iter().map(|b| b.block.clone()).collect()
    }

    pub fn get(&self, id: ElementId) -> Option<&RenderedBlock> {
        self.blocks.get(id.0).filter(|b| b.block.id == id)
    }

    /// Total rows of content
    pub fn height(&self) -> usize {
        self.blocks.last().map_or(0, |b| b.top + b.height())
    }

    /// Display rows with the kind of block each belongs to
    pub fn rows(&self) -> Vec<(BlockKind, &str)> {
        let mut rows = Vec::with_capacity(self.height());
        for block in &self.blocks {
            rows.extend(block.lines.iter().map(|l| (block.block.kind, l.as_str())));
            rows.push((BlockKind::Other, ""));
        }
        rows
    }
}

struct Capture {
    kind: BlockKind,
    text: String,
    end: TagEnd,
    nested: usize,
    indent: usize,
}

impl Capture {
    fn new(kind: BlockKind, end: TagEnd) -> Self {
        Self {
            kind,
            text: String::new(),
            end,
            nested: 0,
            indent: 0,
        }
    }

    fn is_container(&self) -> bool {
        matches!(
            self.kind,
            BlockKind::BlockQuote | BlockKind::Callout | BlockKind::Table
        )
    }

    fn break_line(&mut self) {
        if !self.text.is_empty() && !self.text.ends_with('\n') {
            self.text.push('\n');
        }
    }
}

struct Builder {
    width: Option<usize>,
    blocks: Vec<RenderedBlock>,
    next_top: usize,
    capture: Option<Capture>,
    list_depth: usize,
    in_metadata: bool,
}

impl Builder {
    fn begin(&mut self, kind: BlockKind, end: TagEnd) {
        self.flush();
        let mut capture = Capture::new(kind, end);
        if kind == BlockKind::ListItem {
            capture.indent = self.list_depth.saturating_sub(1);
        }
        self.capture = Some(capture);
    }

    fn flush(&mut self) {
        let Some(capture) = self.capture.take() else {
            return;
        };
        let id = ElementId(self.blocks.len());
        let text = match capture.kind {
            BlockKind::CodeBlock => capture.text.trim_end_matches('\n').to_string(),
            _ => capture.text.trim().to_string(),
        };
        let lines = self.display_lines(capture.kind, capture.indent, &text);
        let block = RenderedBlock {
            block: PreviewBlock::new(id, capture.kind, text),
            lines,
            top: self.next_top,
        };
        self.next_top += block.height();
        self.blocks.push(block);
    }

    fn display_lines(&self, kind: BlockKind, indent: usize, text: &str) -> Vec<String> {
        let mut lines = Vec::new();
        match kind {
            BlockKind::Rule => lines.push(RULE_LINE.to_string()),
            BlockKind::CodeBlock => lines.extend(text.lines().map(|l| format!("    {l}"))),
            _ => {
                let prefix = match kind {
                    BlockKind::ListItem => format!("{}• ", "  ".repeat(indent)),
                    BlockKind::BlockQuote => "│ ".to_string(),
                    BlockKind::Callout => "┃ ".to_string(),
                    _ => String::new(),
                };
                for source_line in text.lines() {
                    for wrapped in wrap(source_line, self.width, prefix.chars().count()) {
                        lines.push(format!("{prefix}{wrapped}"));
                    }
                }
            }
        }
        if lines.is_empty() {
            lines.push(String::new());
        }
        lines
    }

    fn start(&mut self, tag: Tag<'_>) {
        let end = tag.to_end();
        if let Some(capture) = self.capture.as_mut() {
            if capture.is_container() {
                if end == capture.end {
                    capture.nested += 1;
                }
                match tag {
                    Tag::Paragraph | Tag::Item | Tag::CodeBlock(_) | Tag::TableRow => {
                        capture.break_line()
                    }
                    Tag::TableCell if !capture.text.is_empty() && !capture.text.ends_with('\n') => {
                        capture.text.push_str(" | ")
                    }
                    _ => {}
                }
                return;
            }
            // Loose list items wrap their text in paragraphs
            if capture.kind == BlockKind::ListItem && matches!(tag, Tag::Paragraph) {
                capture.break_line();
                return;
            }
        }

        match tag {
            Tag::MetadataBlock(_) => self.in_metadata = true,
            Tag::List(_) => self.list_depth += 1,
            Tag::Heading { level, .. } => self.begin(BlockKind::Heading(level as u8), end),
            Tag::Paragraph => self.begin(BlockKind::Paragraph, end),
            Tag::Item => self.begin(BlockKind::ListItem, end),
            Tag::CodeBlock(_) => self.begin(BlockKind::CodeBlock, end),
            Tag::BlockQuote(Some(_)) => self.begin(BlockKind::Callout, end),
            Tag::BlockQuote(None) => self.begin(BlockKind::BlockQuote, end),
            Tag::Table(_) => self.begin(BlockKind::Table, end),
            Tag::HtmlBlock => self.begin(BlockKind::Other, end),
            _ => {}
        }
    }

    fn end(&mut self, end: TagEnd) {
        match end {
            TagEnd::MetadataBlock(_) => {
                self.in_metadata = false;
                return;
            }
            TagEnd::List(_) => self.list_depth = self.list_depth.saturating_sub(1),
            _ => {}
        }
        if let Some(capture) = self.capture.as_mut()
            && capture.end == end
        {
            if capture.nested > 0 {
                capture.nested -= 1;
            } else {
                self.flush();
            }
        }
    }

    fn text(&mut self, text: &str) {
        if self.in_metadata {
            return;
        }
        if let Some(capture) = self.capture.as_mut() {
            capture.text.push_str(text);
        }
    }

    fn event(&mut self, event: Event<'_>) {
        match event {
            Event::Start(tag) => self.start(tag),
            Event::End(end) => self.end(end),
            Event::Text(text) | Event::Code(text) | Event::Html(text) => self.text(&text),
            Event::InlineHtml(html) => self.text(&html),
            Event::SoftBreak => self.text(" "),
            Event::HardBreak => self.text("\n"),
            Event::TaskListMarker(done) => self.text(if done { "[x] " } else { "[ ] " }),
            Event::Rule => {
                if self.capture.is_none() {
                    self.begin(BlockKind::Rule, TagEnd::Paragraph);
                    self.flush();
                }
            }
            _ => {}
        }
    }
}

/// Greedy word wrap; `reserved` columns are taken by a prefix
fn wrap(line: &str, width: Option<usize>, reserved: usize) -> Vec<String> {
    let Some(width) = width.map(|w| w.saturating_sub(reserved).max(8)) else {
        return vec![line.to_string()];
    };
    let mut out = Vec::new();
    let mut current = String::new();
    for word in line.split_whitespace() {
        let needed = if current.is_empty() {
            word.chars().count()
        } else {
            current.chars().count() + 1 + word.chars().count()
        };
        if needed > width && !current.is_empty() {
            out.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() || out.is_empty() {
        out.push(current);
    }
    out
}

/// Render markdown into preview blocks, wrapping display lines to `width` columns
pub fn render_markdown(markdown: &str, width: Option<usize>) -> RenderedDocument {
    let options = Options::ENABLE_TABLES
        | Options::ENABLE_STRIKETHROUGH
        | Options::ENABLE_TASKLISTS
        | Options::ENABLE_YAML_STYLE_METADATA_BLOCKS
        | Options::ENABLE_GFM;

    let mut builder = Builder {
        width,
        blocks: Vec::new(),
        next_top: 0,
        capture: None,
        list_depth: 0,
        in_metadata: false,
    };
    for event in Parser::new_ext(markdown, options) {
        builder.event(event);
    }
    builder.flush();

    RenderedDocument {
        blocks: builder.blocks,
    }
}
