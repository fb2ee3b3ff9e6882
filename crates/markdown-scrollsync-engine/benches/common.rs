// Benchmark helper functions - Rust's dead code analysis doesn't understand
// that these are used by benchmark files in the same directory
// See: https://users.rust-lang.org/t/cargo-rustc-benches-awarnings/110111/2
#[allow(dead_code)]
pub fn generate_markdown_content(size: usize) -> String {
    let base = "# Title\n\n## Section\n\nParagraph with some content.\n\n- Bullet point\n  - Nested item\n- Another item\n\n```rust\nfn example() {\n    println!(\"Hello\");\n}\n```\n\n";
    base.repeat(size)
}

/// Front matter followed by `sections` numbered sections, each with prose and a list
#[allow(dead_code)]
pub fn generate_long_document(sections: usize) -> String {
    let mut content = String::from("---\ntitle: Benchmark\ntags: [bench]\n---\n\n");
    for section in 0..sections {
        content.push_str(&format!("## Section {section}\n\n"));
        content.push_str("Some paragraph content with multiple sentences.\nIt wraps onto a second source line.\n\n");
        for i in 0..3 {
            content.push_str(&format!("- Item {i} of section {section}\n"));
        }
        content.push_str("\n> A quote to close the section.\n\n");
    }
    content
}
