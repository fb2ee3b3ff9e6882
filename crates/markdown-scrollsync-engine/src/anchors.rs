//! Source line → rendered element mapping.
//!
//! Renderers do not reliably keep line provenance, so the table is reconstructed from
//! the document text and the ordered preview blocks. Headings are located by text; every
//! other block is placed positionally, which keeps the ordering right but is only a
//! coarse estimate of the actual line.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::host::DocumentReadError;
use crate::surface::{ElementId, PreviewBlock};
use crate::tuning::SyncTuning;

/// Lines scanned past the cursor when looking for a heading's source line
pub const DEFAULT_HEADING_SEARCH_WINDOW: usize = 64;

/// Characters of heading text used when the full text does not appear verbatim
pub const DEFAULT_HEADING_PREFIX_CHARS: usize = 20;

const FRONT_MATTER_FENCE: &str = "---";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Anchor {
    pub line: usize,
    pub element: ElementId,
}

/// Bounds for the forward heading search
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeadingSearch {
    pub window: usize,
    pub prefix_chars: usize,
}

impl Default for HeadingSearch {
    fn default() -> Self {
        Self {
            window: DEFAULT_HEADING_SEARCH_WINDOW,
            prefix_chars: DEFAULT_HEADING_PREFIX_CHARS,
        }
    }
}

impl From<&SyncTuning> for HeadingSearch {
    fn from(tuning: &SyncTuning) -> Self {
        Self {
            window: tuning.heading_search_window,
            prefix_chars: tuning.heading_prefix_chars,
        }
    }
}

impl HeadingSearch {
    /// Find the first line in `[from, from + window)` that contains the heading text
    fn find(&self, lines: &[&str], from: usize, heading: &str) -> Option<usize> {
        let needle = heading.trim();
        if needle.is_empty() || from >= lines.len() {
            return None;
        }
        let prefix = truncate_chars(needle, self.prefix_chars);
        let end = from.saturating_add(self.window).min(lines.len());

        (from..end).find(|&i| {
            let line = lines[i];
            line.contains(needle) || (!prefix.is_empty() && line.contains(prefix))
        })
    }
}

fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte, _)) => &text[..byte],
        None => text,
    }
}

/// First line after a leading `---` ... `---` block, or 0 when there is none
fn front_matter_end(lines: &[&str]) -> usize {
    if lines.first().map(|l| l.trim()) != Some(FRONT_MATTER_FENCE) {
        return 0;
    }
    lines
        .iter()
        .enumerate()
        .skip(1)
        .find(|(_, line)| line.trim() == FRONT_MATTER_FENCE)
        .map_or(0, |(i, _)| i + 1)
}

/// Resumable forward-only position in the source lines
struct LineCursor<'a> {
    lines: &'a [&'a str],
    pos: usize,
}

impl<'a> LineCursor<'a> {
    fn new(lines: &'a [&'a str]) -> Self {
        Self {
            lines,
            pos: front_matter_end(lines),
        }
    }

    fn skip_blank(&mut self) {
        while self.pos < self.lines.len() && self.lines[self.pos].trim().is_empty() {
            self.pos += 1;
        }
    }

    /// Claim the current line for a block and step past it
    fn take_positional(&mut self) -> usize {
        self.skip_blank();
        let line = self.pos.min(self.lines.len().saturating_sub(1));
        self.pos += 1;
        line
    }

    fn seek_past(&mut self, line: usize) {
        self.pos = line + 1;
    }
}

/// The line → element table for one (document text, preview render) pair
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnchorTable {
    by_line: BTreeMap<usize, ElementId>,
    total_lines: usize,
}

impl AnchorTable {
    pub fn build(text: &str, blocks: &[PreviewBlock], search: &HeadingSearch) -> Self {
        let lines: Vec<&str> = text.lines().collect();
        let mut table = AnchorTable {
            by_line: BTreeMap::new(),
            total_lines: lines.len(),
        };
        if lines.is_empty() {
            return table;
        }

        let mut cursor = LineCursor::new(&lines);
        for block in blocks {
            let matched = if block.kind.is_heading() {
                search.find(&lines, cursor.pos, &block.text)
            } else {
                None
            };
            let line = match matched {
                Some(line) => {
                    cursor.seek_past(line);
                    line
                }
                None => cursor.take_positional(),
            };
            // Last write wins; construction is sequential so document order is kept
            table.by_line.insert(line, block.id);
        }

        table
    }

    pub fn total_lines(&self) -> usize {
        self.total_lines
    }

    pub fn len(&self) -> usize {
        self.by_line.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_line.is_empty()
    }

    pub fn clear(&mut self) {
        self.by_line.clear();
        self.total_lines = 0;
    }

    pub fn iter(&self) -> impl Iterator<Item = Anchor> + '_ {
        self.by_line
            .iter()
            .map(|(&line, &element)| Anchor { line, element })
    }

    pub fn exact(&self, line: usize) -> Option<Anchor> {
        self.by_line
            .get(&line)
            .map(|&element| Anchor { line, element })
    }

    /// Greatest anchor line not exceeding `line`
    pub fn floor(&self, line: usize) -> Option<Anchor> {
        self.by_line
            .range(..=line)
            .next_back()
            .map(|(&line, &element)| Anchor { line, element })
    }

    /// Anchor closest to `line` by absolute difference; ties go to the earlier line
    pub fn nearest(&self, line: usize) -> Option<Anchor> {
        let below = self.floor(line);
        let above = self
            .by_line
            .range(line..)
            .next()
            .map(|(&line, &element)| Anchor { line, element });

        match (below, above) {
            (Some(b), Some(a)) => {
                if a.line - line < line - b.line {
                    Some(a)
                } else {
                    Some(b)
                }
            }
            (b, a) => b.or(a),
        }
    }

    /// Reverse lookup: the line an element was anchored to
    pub fn line_of(&self, element: ElementId) -> Option<usize> {
        self.by_line
            .iter()
            .find(|(_, id)| **id == element)
            .map(|(&line, _)| line)
    }
}

/// Owns the current table and rebuilds it when the host reports a fresh render
#[derive(Debug, Default)]
pub struct AnchorMapper {
    table: AnchorTable,
    search: HeadingSearch,
}

impl AnchorMapper {
    pub fn new(search: HeadingSearch) -> Self {
        Self {
            table: AnchorTable::default(),
            search,
        }
    }

    pub fn table(&self) -> &AnchorTable {
        &self.table
    }

    /// Replace the table wholesale. A failed read leaves the previous table in place.
    ///
    /// Returns whether a new table was built.
    pub fn rebuild(
        &mut self,
        text: Result<String, DocumentReadError>,
        blocks: &[PreviewBlock],
    ) -> bool {
        match text {
            Ok(text) => {
                self.table = AnchorTable::build(&text, blocks, &self.search);
                log::debug!(
                    "Anchor table rebuilt: {} anchors over {} lines from {} blocks",
                    self.table.len(),
                    self.table.total_lines(),
                    blocks.len()
                );
                true
            }
            Err(e) => {
                log::error!("Failed to read document text, keeping stale anchors: {e}");
                false
            }
        }
    }

    pub fn clear(&mut self) {
        self.table.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::BlockKind;
    use pretty_assertions::assert_eq;

    fn block(id: usize, kind: BlockKind, text: &str) -> PreviewBlock {
        PreviewBlock::new(ElementId(id), kind, text)
    }

    fn lines_of(table: &AnchorTable) -> Vec<(usize, usize)> {
        table.iter().map(|a| (a.line, a.element.0)).collect()
    }

    #[test]
    fn test_heading_matched_exactly_in_fifty_line_document() {
        // Lines 0..10 form one paragraph, heading on line 10, filler after
        let mut lines: Vec<String> = (0..10).map(|i| format!("intro text {i}")).collect();
        lines.push("## Installation".to_string());
        lines.extend((11..50).map(|i| format!("body {i}")));
        let text = lines.join("\n");

        let blocks = vec![
            block(0, BlockKind::Paragraph, "intro text 0 ..."),
            block(1, BlockKind::Heading(2), "Installation"),
            block(2, BlockKind::Paragraph, "body 11 ..."),
        ];

        let table = AnchorTable::build(&text, &blocks, &HeadingSearch::default());

        assert_eq!(table.total_lines(), 50);
        assert_eq!(table.line_of(ElementId(1)), Some(10));
        assert_eq!(table.exact(10).map(|a| a.element), Some(ElementId(1)));
        // Positional placement resumes right after the heading
        assert_eq!(table.line_of(ElementId(2)), Some(11));
    }

    #[test]
    fn test_front_matter_and_blank_lines_are_skipped() {
        let text = "---\ntitle: x\n---\n\nFirst paragraph\n\n\nSecond paragraph\n";
        let blocks = vec![
            block(0, BlockKind::Paragraph, "First paragraph"),
            block(1, BlockKind::Paragraph, "Second paragraph"),
        ];

        let table = AnchorTable::build(text, &blocks, &HeadingSearch::default());

        assert_eq!(lines_of(&table), vec![(4, 0), (7, 1)]);
    }

    #[test]
    fn test_unterminated_front_matter_is_ordinary_text() {
        let text = "---\nnot front matter";
        let blocks = vec![block(0, BlockKind::Rule, ""), block(1, BlockKind::Paragraph, "")];

        let table = AnchorTable::build(text, &blocks, &HeadingSearch::default());

        assert_eq!(lines_of(&table), vec![(0, 0), (1, 1)]);
    }

    #[test]
    fn test_heading_prefix_tolerates_inline_formatting() {
        let text = "# A fairly long heading with **bold** inside it";
        let blocks = vec![block(
            0,
            BlockKind::Heading(1),
            "A fairly long heading with bold inside it",
        )];

        let table = AnchorTable::build(text, &blocks, &HeadingSearch::default());

        assert_eq!(table.line_of(ElementId(0)), Some(0));
    }

    #[test]
    fn test_heading_search_is_bounded() {
        let mut lines = vec!["start".to_string()];
        lines.extend((0..10).map(|i| format!("filler {i}")));
        lines.push("# Far away".to_string());
        let text = lines.join("\n");
        let blocks = vec![block(0, BlockKind::Heading(1), "Far away")];
        let search = HeadingSearch {
            window: 5,
            prefix_chars: DEFAULT_HEADING_PREFIX_CHARS,
        };

        let table = AnchorTable::build(&text, &blocks, &search);

        // Not found inside the window: placed positionally instead
        assert_eq!(table.line_of(ElementId(0)), Some(0));
    }

    #[test]
    fn test_cursor_past_end_clamps_to_last_line() {
        let text = "one\ntwo";
        let blocks: Vec<_> = (0..4)
            .map(|i| block(i, BlockKind::ListItem, "item"))
            .collect();

        let table = AnchorTable::build(text, &blocks, &HeadingSearch::default());

        // Later blocks collide on the last line; last write wins
        assert_eq!(lines_of(&table), vec![(0, 0), (1, 3)]);
        assert!(table.len() <= blocks.len());
    }

    #[test]
    fn test_empty_inputs_give_empty_table() {
        let search = HeadingSearch::default();
        assert!(AnchorTable::build("", &[block(0, BlockKind::Paragraph, "x")], &search).is_empty());
        assert!(AnchorTable::build("text", &[], &search).is_empty());
    }

    #[test]
    fn test_lookups() {
        let text = (0..30).map(|_| "x").collect::<Vec<_>>().join("\n");
        let mut table = AnchorTable::build(&text, &[], &HeadingSearch::default());
        table.by_line.insert(5, ElementId(0));
        table.by_line.insert(15, ElementId(1));
        table.by_line.insert(25, ElementId(2));

        assert_eq!(table.exact(15).map(|a| a.element), Some(ElementId(1)));
        assert_eq!(table.exact(16), None);
        assert_eq!(table.floor(14).map(|a| a.line), Some(5));
        assert_eq!(table.floor(3), None);
        assert_eq!(table.nearest(12).map(|a| a.line), Some(15));
        assert_eq!(table.nearest(10).map(|a| a.line), Some(5));
        assert_eq!(table.nearest(100).map(|a| a.line), Some(25));
        assert_eq!(table.line_of(ElementId(2)), Some(25));
        assert_eq!(table.line_of(ElementId(9)), None);
    }

    #[test]
    fn test_rebuild_is_deterministic() {
        let text = "# Title\n\nPara\n\n- a\n- b\n";
        let blocks = vec![
            block(0, BlockKind::Heading(1), "Title"),
            block(1, BlockKind::Paragraph, "Para"),
            block(2, BlockKind::ListItem, "a"),
            block(3, BlockKind::ListItem, "b"),
        ];
        let mut mapper = AnchorMapper::default();

        assert!(mapper.rebuild(Ok(text.to_string()), &blocks));
        let first = mapper.table().clone();
        assert!(mapper.rebuild(Ok(text.to_string()), &blocks));

        assert_eq!(&first, mapper.table());
        assert_eq!(lines_of(&first), vec![(0, 0), (2, 1), (4, 2), (5, 3)]);
    }

    #[test]
    fn test_read_failure_keeps_stale_table() {
        let blocks = vec![block(0, BlockKind::Paragraph, "hello")];
        let mut mapper = AnchorMapper::default();
        mapper.rebuild(Ok("hello".to_string()), &blocks);

        let rebuilt = mapper.rebuild(
            Err(DocumentReadError::Unavailable("gone".to_string())),
            &[],
        );

        assert!(!rebuilt);
        assert_eq!(mapper.table().len(), 1);
    }
}
