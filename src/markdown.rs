//! Line-based markdown-to-blocks conversion for the text preview.
//!
//! Only a fixed set of line rules and `**bold**` spans are recognized. This is
//! not a general Markdown parser.

use regex::Regex;
use serde::Serialize;
use std::sync::OnceLock;

/// Inline run inside a bullet, task or paragraph
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "text", rename_all = "lowercase")]
pub enum Inline {
    Text(String),
    Bold(String),
}

/// One rendered line of content
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Block {
    Header { level: u8, text: String },
    Divider,
    Bullet { inlines: Vec<Inline> },
    Task { checked: bool, inlines: Vec<Inline> },
    Spacer,
    Paragraph { inlines: Vec<Inline> },
}

fn bold_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    // Literal pattern, compiling it cannot fail
    PATTERN.get_or_init(|| Regex::new(r"\*\*.*?\*\*").expect("valid bold pattern"))
}

/// Split text into plain and bold runs, left to right, non-nested
pub fn parse_inline(text: &str) -> Vec<Inline> {
    let mut inlines = Vec::new();
    let mut last = 0;

    for m in bold_pattern().find_iter(text) {
        if m.start() > last {
            inlines.push(Inline::Text(text[last..m.start()].to_string()));
        }
        let span = m.as_str();
        inlines.push(Inline::Bold(span[2..span.len() - 2].to_string()));
        last = m.end();
    }
    if last < text.len() {
        inlines.push(Inline::Text(text[last..].to_string()));
    }

    inlines
}

/// Convert one line into a block. Fence delimiters produce `None`.
fn render_line(line: &str) -> Option<Block> {
    // Order matters: first match wins
    if let Some(rest) = line.strip_prefix("### ") {
        return Some(Block::Header { level: 3, text: rest.to_string() });
    }
    if let Some(rest) = line.strip_prefix("## ") {
        return Some(Block::Header { level: 2, text: rest.to_string() });
    }
    if let Some(rest) = line.strip_prefix("# ") {
        return Some(Block::Header { level: 1, text: rest.to_string() });
    }
    if line == "---" {
        return Some(Block::Divider);
    }
    if let Some(rest) = line.strip_prefix("- ") {
        return Some(Block::Bullet { inlines: parse_inline(rest) });
    }
    if let Some(rest) = line.strip_prefix("[x] ") {
        return Some(Block::Task { checked: true, inlines: parse_inline(rest) });
    }
    if let Some(rest) = line.strip_prefix("[ ] ") {
        return Some(Block::Task { checked: false, inlines: parse_inline(rest) });
    }
    if line.starts_with("```") {
        return None;
    }
    if line.trim().is_empty() {
        return Some(Block::Spacer);
    }
    Some(Block::Paragraph { inlines: parse_inline(line) })
}

/// Convert raw text into an ordered list of blocks
pub fn render_blocks(content: &str) -> Vec<Block> {
    content.split('\n').filter_map(render_line).collect()
}

/// Plain-text outline of the blocks, used by the console preview
pub fn outline(blocks: &[Block]) -> String {
    fn inline_text(inlines: &[Inline]) -> String {
        inlines
            .iter()
            .map(|i| match i {
                Inline::Text(t) => t.clone(),
                Inline::Bold(t) => t.to_uppercase(),
            })
            .collect()
    }

    blocks
        .iter()
        .map(|b| match b {
            Block::Header { level, text } => format!("{} {}", "#".repeat(*level as usize), text),
            Block::Divider => "────────".to_string(),
            Block::Bullet { inlines } => format!("• {}", inline_text(inlines)),
            Block::Task { checked: true, inlines } => format!("[✓] {}", inline_text(inlines)),
            Block::Task { checked: false, inlines } => format!("[ ] {}", inline_text(inlines)),
            Block::Spacer => String::new(),
            Block::Paragraph { inlines } => inline_text(inlines),
        })
        .collect::<Vec<_>>()
        .join("\n")
}
