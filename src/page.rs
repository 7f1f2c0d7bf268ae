//! A single course-book page laid out for the terminal.
//!
//! The page is split in two panes: a navigation sidebar (chrome) built from
//! the document headings, and the article body. Every display row remembers
//! the element path it was rendered from so selections can be matched against
//! content regions.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use log::debug;
use unicode_width::UnicodeWidthChar;

use crate::selection::region::{ElementNode, ElementPath};

const MIN_WRAP_WIDTH: usize = 10;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Pane {
    Sidebar,
    Article,
}

/// Logical position on the page: pane, display row, char index in the row
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TextPosition {
    pub pane: Pane,
    pub row: usize,
    pub column: usize,
}

impl TextPosition {
    pub fn new(pane: Pane, row: usize, column: usize) -> Self {
        Self { pane, row, column }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlockKind {
    Heading(u8),
    Paragraph,
    ListItem,
    Code,
    Blank,
}

impl BlockKind {
    fn element(self) -> ElementNode {
        match self {
            BlockKind::Heading(level) => ElementNode::new(format!("h{level}")),
            BlockKind::Paragraph => ElementNode::new("p"),
            BlockKind::ListItem => ElementNode::new("li"),
            BlockKind::Code => ElementNode::new("pre"),
            BlockKind::Blank => ElementNode::new("br"),
        }
    }
}

#[derive(Clone, Debug)]
struct Block {
    kind: BlockKind,
    text: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PageRow {
    pub text: String,
    pub kind: BlockKind,
    pub block: usize,
    pub path: ElementPath,
}

#[derive(Debug)]
pub struct Page {
    title: String,
    blocks: Vec<Block>,
    sidebar: Vec<PageRow>,
    rows: Vec<PageRow>,
    wrap_width: usize,
}

fn root_path() -> ElementPath {
    ElementPath::new(vec![ElementNode::new("div").with_class("layout")])
}

fn article_path() -> ElementPath {
    root_path()
        .child(ElementNode::new("main").with_class("main-wrapper"))
        .child(ElementNode::new("article").with_class("markdown"))
}

fn sidebar_path() -> ElementPath {
    root_path().child(ElementNode::new("nav").with_class("sidebar"))
}

impl Page {
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read page {}", path.display()))?;
        let title = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().replace(['_', '-'], " "))
            .unwrap_or_else(|| "Untitled".to_string());
        Ok(Self::from_markdown(title, &text))
    }

    pub fn from_markdown(title: impl Into<String>, text: &str) -> Self {
        let blocks = parse_blocks(text);
        let title = title.into();
        let title = blocks
            .iter()
            .find(|b| b.kind == BlockKind::Heading(1))
            .map(|b| b.text.clone())
            .unwrap_or(title);

        let sidebar = blocks
            .iter()
            .filter(|b| matches!(b.kind, BlockKind::Heading(level) if level <= 2))
            .enumerate()
            .map(|(i, b)| {
                let indent = if b.kind == BlockKind::Heading(2) { "  " } else { "" };
                PageRow {
                    text: format!("{indent}{}", b.text),
                    kind: b.kind,
                    block: i,
                    path: sidebar_path().child(ElementNode::new("a").with_class("menu__link")),
                }
            })
            .collect();

        debug!("Parsed page '{title}' into {} blocks", blocks.len());

        let mut page = Self {
            title,
            blocks,
            sidebar,
            rows: Vec::new(),
            wrap_width: 0,
        };
        page.reflow(80);
        page
    }

    /// Re-wrap the article body for a new content width
    pub fn reflow(&mut self, width: usize) {
        let width = width.max(MIN_WRAP_WIDTH);
        if width == self.wrap_width && !self.rows.is_empty() {
            return;
        }
        self.wrap_width = width;
        self.rows.clear();

        for (index, block) in self.blocks.iter().enumerate() {
            let path = article_path().child(block.kind.element());
            let wrapped: Vec<String> = match block.kind {
                BlockKind::Blank => vec![String::new()],
                BlockKind::Code => block.text.lines().map(str::to_string).collect(),
                BlockKind::ListItem => textwrap::wrap(
                    &block.text,
                    textwrap::Options::new(width)
                        .initial_indent("• ")
                        .subsequent_indent("  "),
                )
                .into_iter()
                .map(|line| line.into_owned())
                .collect(),
                _ => textwrap::wrap(&block.text, width)
                    .into_iter()
                    .map(|line| line.into_owned())
                    .collect(),
            };

            for text in wrapped {
                self.rows.push(PageRow {
                    text,
                    kind: block.kind,
                    block: index,
                    path: path.clone(),
                });
            }
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn rows(&self, pane: Pane) -> &[PageRow] {
        match pane {
            Pane::Sidebar => &self.sidebar,
            Pane::Article => &self.rows,
        }
    }

    pub fn row(&self, pane: Pane, row: usize) -> Option<&PageRow> {
        self.rows(pane).get(row)
    }

    /// Char range `[start, end)` of the word under `pos`
    pub fn word_at(&self, pos: TextPosition) -> Option<(usize, usize)> {
        let row = self.row(pos.pane, pos.row)?;
        let chars: Vec<char> = row.text.chars().collect();
        let is_word = |c: &char| c.is_alphanumeric() || *c == '_' || *c == '-' || *c == '\'';
        if !chars.get(pos.column).is_some_and(is_word) {
            return None;
        }

        let mut start = pos.column;
        while start > 0 && is_word(&chars[start - 1]) {
            start -= 1;
        }
        let mut end = pos.column;
        while end < chars.len() && is_word(&chars[end]) {
            end += 1;
        }
        Some((start, end))
    }

    /// Text between two positions, `end` exclusive. Rows of the same block are
    /// joined with a space, different blocks with a newline.
    pub fn extract(&self, start: TextPosition, end: TextPosition) -> String {
        if start.pane != end.pane {
            let mut text = self.extract(start, self.pane_end(start.pane));
            text.push('\n');
            text.push_str(&self.extract(TextPosition::new(end.pane, 0, 0), end));
            return text;
        }

        let rows = self.rows(start.pane);
        let mut out = String::new();
        let mut previous_block = None;
        for index in start.row..=end.row.min(rows.len().saturating_sub(1)) {
            let Some(row) = rows.get(index) else { break };
            let from = if index == start.row { start.column } else { 0 };
            let to = if index == end.row {
                end.column
            } else {
                row.text.chars().count()
            };
            let piece: String = row
                .text
                .chars()
                .skip(from)
                .take(to.saturating_sub(from))
                .collect();

            if let Some(block) = previous_block {
                out.push(if block == row.block { ' ' } else { '\n' });
            }
            out.push_str(&piece);
            previous_block = Some(row.block);
        }
        out
    }

    fn pane_end(&self, pane: Pane) -> TextPosition {
        let rows = self.rows(pane);
        let row = rows.len().saturating_sub(1);
        let column = rows.last().map_or(0, |r| r.text.chars().count());
        TextPosition::new(pane, row, column)
    }

    /// Deepest element path shared by both positions
    pub fn common_ancestor(&self, a: TextPosition, b: TextPosition) -> ElementPath {
        let (Some(first), Some(second)) = (self.row(a.pane, a.row), self.row(b.pane, b.row))
        else {
            return root_path();
        };
        let shared: Vec<ElementNode> = first
            .path
            .nodes()
            .iter()
            .zip(second.path.nodes())
            .take_while(|(x, y)| x == y)
            .map(|(x, _)| x.clone())
            .collect();
        ElementPath::new(shared)
    }
}

/// Map a display column to a char index, accounting for wide characters
pub fn column_to_char_index(text: &str, column: usize) -> usize {
    let mut width = 0;
    for (index, ch) in text.chars().enumerate() {
        let w = ch.width().unwrap_or(0);
        if column < width + w.max(1) {
            return index;
        }
        width += w;
    }
    text.chars().count()
}

fn parse_blocks(text: &str) -> Vec<Block> {
    let mut blocks = Vec::new();
    let mut paragraph: Vec<&str> = Vec::new();
    let mut code: Option<Vec<&str>> = None;

    for line in text.lines() {
        let trimmed = line.trim();

        if trimmed.starts_with("```") {
            match code.take() {
                Some(lines) => blocks.push(Block {
                    kind: BlockKind::Code,
                    text: lines.join("\n"),
                }),
                None => {
                    flush(&mut paragraph, &mut blocks);
                    code = Some(Vec::new());
                }
            }
            continue;
        }
        if let Some(lines) = code.as_mut() {
            lines.push(line);
            continue;
        }

        if trimmed.is_empty() {
            flush(&mut paragraph, &mut blocks);
            if blocks.last().is_some_and(|b| b.kind != BlockKind::Blank) {
                blocks.push(Block {
                    kind: BlockKind::Blank,
                    text: String::new(),
                });
            }
        } else if let Some((level, heading)) = heading(trimmed) {
            flush(&mut paragraph, &mut blocks);
            blocks.push(Block {
                kind: BlockKind::Heading(level),
                text: heading.to_string(),
            });
        } else if let Some(item) = trimmed
            .strip_prefix("- ")
            .or_else(|| trimmed.strip_prefix("* "))
        {
            flush(&mut paragraph, &mut blocks);
            blocks.push(Block {
                kind: BlockKind::ListItem,
                text: item.trim().to_string(),
            });
        } else {
            paragraph.push(trimmed);
        }
    }

    flush(&mut paragraph, &mut blocks);
    if let Some(lines) = code {
        blocks.push(Block {
            kind: BlockKind::Code,
            text: lines.join("\n"),
        });
    }
    while blocks.last().is_some_and(|b| b.kind == BlockKind::Blank) {
        blocks.pop();
    }
    blocks
}

fn flush(paragraph: &mut Vec<&str>, blocks: &mut Vec<Block>) {
    if !paragraph.is_empty() {
        blocks.push(Block {
            kind: BlockKind::Paragraph,
            text: paragraph.join(" "),
        });
        paragraph.clear();
    }
}

fn heading(line: &str) -> Option<(u8, &str)> {
    let level = line.chars().take_while(|c| *c == '#').count();
    if (1..=6).contains(&level) {
        let rest = &line[level..];
        if rest.starts_with(' ') {
            return Some((level as u8, rest.trim()));
        }
    }
    None
}
