use insta::assert_yaml_snapshot;
use pretty_assertions::assert_eq;

use markdown_scrollsync_engine::{
    Anchor, AnchorTable, BlockKind, HeadingSearch, render_markdown,
};

const NOTES: &str = "---
title: Notes
---

# Notes

Intro paragraph that
spans two lines.

- first
- second

## Details

More text.
";

fn anchors_for(markdown: &str) -> Vec<Anchor> {
    let rendered = render_markdown(markdown, None);
    AnchorTable::build(markdown, &rendered.preview_blocks(), &HeadingSearch::default())
        .iter()
        .collect()
}

#[test]
fn test_rendered_blocks_in_document_order() {
    let rendered = render_markdown(NOTES, None);
    let kinds: Vec<BlockKind> = rendered.preview_blocks().iter().map(|b| b.kind).collect();
    assert_eq!(
        kinds,
        vec![
            BlockKind::Heading(1),
            BlockKind::Paragraph,
            BlockKind::ListItem,
            BlockKind::ListItem,
            BlockKind::Heading(2),
            BlockKind::Paragraph,
        ]
    );
}

// Headings land on their own lines. The list items are placed positionally: the first
// one claims the second line of the multi-line paragraph, one line early.
#[test]
fn test_positional_mapping_is_coarse_after_multiline_blocks() {
    assert_yaml_snapshot!(anchors_for(NOTES), @r###"
    - line: 4
      element: 0
    - line: 6
      element: 1
    - line: 7
      element: 2
    - line: 9
      element: 3
    - line: 12
      element: 4
    - line: 14
      element: 5
    "###);
}

#[test]
fn test_renamed_heading_found_by_prefix() {
    let markdown = "# A heading whose text runs long enough to be truncated\n\nBody.\n";
    let rendered = render_markdown(markdown, None);
    let mut blocks = rendered.preview_blocks();
    // Renderer decorated the heading text (e.g. an appended anchor glyph)
    blocks[0].text.push_str(" ¶");

    let table = AnchorTable::build(markdown, &blocks, &HeadingSearch::default());
    assert_eq!(table.exact(0).map(|a| a.element.0), Some(0));
    assert_eq!(table.exact(2).map(|a| a.element.0), Some(1));
}
