//! Mouse-driven text selection on a [`Page`]

use crate::page::{Page, TextPosition};

use super::bridge::{SelectionSnapshot, SelectionSource};

#[derive(Clone, Debug, Default)]
pub struct SelectionTracker {
    pub start: Option<TextPosition>,
    /// Exclusive end of the selection
    pub end: Option<TextPosition>,
    pub is_selecting: bool,
}

impl SelectionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn press(&mut self, pos: TextPosition) {
        self.start = Some(pos);
        self.end = Some(pos);
        self.is_selecting = true;
    }

    pub fn drag(&mut self, pos: TextPosition) {
        if self.is_selecting {
            self.end = Some(pos);
        }
    }

    pub fn release(&mut self) {
        self.is_selecting = false;
    }

    pub fn clear(&mut self) {
        self.start = None;
        self.end = None;
        self.is_selecting = false;
    }

    /// Select the word under `pos`; clears the selection on whitespace
    pub fn select_word(&mut self, page: &Page, pos: TextPosition) {
        match page.word_at(pos) {
            Some((start, end)) => {
                self.start = Some(TextPosition::new(pos.pane, pos.row, start));
                self.end = Some(TextPosition::new(pos.pane, pos.row, end));
            }
            None => {
                self.start = None;
                self.end = None;
            }
        }
        self.is_selecting = false;
    }

    pub fn has_selection(&self) -> bool {
        matches!((self.start, self.end), (Some(s), Some(e)) if s != e)
    }

    /// Selection bounds with start before end. The article pane sorts after
    /// the sidebar, matching the on-screen left-to-right order.
    pub fn ordered_bounds(&self) -> Option<(TextPosition, TextPosition)> {
        let (start, end) = (self.start?, self.end?);
        let key = |p: TextPosition| (p.pane as u8, p.row, p.column);
        if key(start) <= key(end) {
            Some((start, end))
        } else {
            Some((end, start))
        }
    }

    pub fn contains(&self, pos: TextPosition) -> bool {
        let Some((start, end)) = self.ordered_bounds() else {
            return false;
        };
        let key = |p: TextPosition| (p.pane as u8, p.row, p.column);
        key(start) <= key(pos) && key(pos) < key(end)
    }

    pub fn snapshot(&self, page: &Page) -> Option<SelectionSnapshot> {
        if !self.has_selection() {
            return None;
        }
        let (start, end) = self.ordered_bounds()?;
        Some(SelectionSnapshot {
            text: page.extract(start, end),
            anchor: page.common_ancestor(start, end),
        })
    }
}

/// Current selection on a page, as seen by the selection bridge
pub struct PageSelection<'a> {
    pub page: &'a Page,
    pub tracker: &'a SelectionTracker,
}

impl SelectionSource for PageSelection<'_> {
    fn current_selection(&self) -> Option<SelectionSnapshot> {
        self.tracker.snapshot(self.page)
    }
}
