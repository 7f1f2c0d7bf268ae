use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
};

use crate::page::{BlockKind, Page, Pane, TextPosition, column_to_char_index};
use crate::selection::SelectionTracker;
use crate::theme::Base16Palette;

const SIDEBAR_WIDTH: u16 = 26;

/// Two-pane page renderer that also maps screen cells back to text positions
#[derive(Debug, Default)]
pub struct PageView {
    scroll_offset: usize,
    sidebar_inner: Option<Rect>,
    article_inner: Option<Rect>,
}

impl PageView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn render(
        &mut self,
        f: &mut Frame,
        area: Rect,
        page: &mut Page,
        selection: &SelectionTracker,
        palette: &Base16Palette,
    ) {
        let chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Length(SIDEBAR_WIDTH), Constraint::Min(10)])
            .split(area);

        let (text_color, border_color, bg) = palette.get_panel_colors(false);
        let sidebar_block = Block::default()
            .title(" Contents ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(border_color))
            .style(Style::default().bg(bg));
        let sidebar_inner = sidebar_block.inner(chunks[0]);
        self.sidebar_inner = Some(sidebar_inner);

        let sidebar_lines = self.styled_lines(
            page,
            Pane::Sidebar,
            0,
            sidebar_inner.height,
            selection,
            palette,
            text_color,
        );
        f.render_widget(Paragraph::new(sidebar_lines).block(sidebar_block), chunks[0]);

        let (text_color, border_color, bg) = palette.get_panel_colors(true);
        let article_block = Block::default()
            .title(format!(" {} ", page.title()))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(border_color))
            .style(Style::default().bg(bg));
        let article_inner = article_block.inner(chunks[1]);
        self.article_inner = Some(article_inner);

        page.reflow(article_inner.width.saturating_sub(1) as usize);
        self.clamp_scroll(page, article_inner.height as usize);

        let article_lines = self.styled_lines(
            page,
            Pane::Article,
            self.scroll_offset,
            article_inner.height,
            selection,
            palette,
            text_color,
        );
        f.render_widget(Paragraph::new(article_lines).block(article_block), chunks[1]);
    }

    #[allow(clippy::too_many_arguments)]
    fn styled_lines(
        &self,
        page: &Page,
        pane: Pane,
        skip: usize,
        height: u16,
        selection: &SelectionTracker,
        palette: &Base16Palette,
        text_color: ratatui::style::Color,
    ) -> Vec<Line<'static>> {
        let (selection_bg, selection_fg) = palette.get_selection_colors();

        page.rows(pane)
            .iter()
            .enumerate()
            .skip(skip)
            .take(height as usize)
            .map(|(row_index, row)| {
                let base = match row.kind {
                    BlockKind::Heading(_) => Style::default().fg(palette.base_0a),
                    BlockKind::Code => Style::default().fg(palette.base_0b),
                    _ => Style::default().fg(text_color),
                };
                let selected = Style::default().fg(selection_fg).bg(selection_bg);

                let mut spans: Vec<Span<'static>> = Vec::new();
                let mut current = String::new();
                let mut current_selected = false;
                for (column, ch) in row.text.chars().enumerate() {
                    let is_selected =
                        selection.contains(TextPosition::new(pane, row_index, column));
                    if is_selected != current_selected && !current.is_empty() {
                        let style = if current_selected { selected } else { base };
                        spans.push(Span::styled(std::mem::take(&mut current), style));
                    }
                    current_selected = is_selected;
                    current.push(ch);
                }
                if !current.is_empty() {
                    let style = if current_selected { selected } else { base };
                    spans.push(Span::styled(current, style));
                }
                Line::from(spans)
            })
            .collect()
    }

    fn clamp_scroll(&mut self, page: &Page, visible_height: usize) {
        let max = page.rows(Pane::Article).len().saturating_sub(visible_height);
        self.scroll_offset = self.scroll_offset.min(max);
    }

    pub fn scroll_down(&mut self, page: &Page) {
        if self.scroll_offset + 1 < page.rows(Pane::Article).len() {
            self.scroll_offset += 1;
        }
    }

    pub fn scroll_up(&mut self) {
        self.scroll_offset = self.scroll_offset.saturating_sub(1);
    }

    pub fn scroll_offset(&self) -> usize {
        self.scroll_offset
    }

    /// Map a terminal cell to a position on the page, if it lands on text
    pub fn screen_to_position(&self, page: &Page, x: u16, y: u16) -> Option<TextPosition> {
        let panes = [
            (Pane::Sidebar, self.sidebar_inner, 0),
            (Pane::Article, self.article_inner, self.scroll_offset),
        ];
        for (pane, inner, offset) in panes {
            let Some(inner) = inner else { continue };
            if !contains(inner, x, y) {
                continue;
            }
            let row = (y - inner.y) as usize + offset;
            let text = &page.row(pane, row)?.text;
            let column = column_to_char_index(text, (x - inner.x) as usize);
            return Some(TextPosition::new(pane, row, column));
        }
        None
    }
}

fn contains(area: Rect, x: u16, y: u16) -> bool {
    x >= area.x && x < area.x + area.width && y >= area.y && y < area.y + area.height
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::theme::OCEANIC_NEXT;
    use ratatui::{Terminal, backend::TestBackend};

    #[test]
    fn maps_screen_cells_to_article_text() {
        let mut page = Page::from_markdown("t", "# Gears\n\nA gear ratio multiplies torque.\n");
        let mut view = PageView::new();
        let selection = SelectionTracker::new();
        let mut terminal = Terminal::new(TestBackend::new(80, 12)).unwrap();
        terminal
            .draw(|f| view.render(f, f.area(), &mut page, &selection, &OCEANIC_NEXT))
            .unwrap();

        // article inner area starts after the sidebar and its border
        let x = SIDEBAR_WIDTH + 1;
        let y = 1;
        assert_eq!(
            view.screen_to_position(&page, x + 2, y + 2),
            Some(TextPosition::new(Pane::Article, 2, 2))
        );
        assert_eq!(
            view.screen_to_position(&page, 2, 1),
            Some(TextPosition::new(Pane::Sidebar, 0, 1))
        );
        // below the last row
        assert_eq!(view.screen_to_position(&page, x + 2, y + 8), None);
        // on a border
        assert_eq!(view.screen_to_position(&page, 0, 0), None);
    }

    #[test]
    fn renders_title_and_sidebar() {
        let mut page = Page::from_markdown("t", "# Kinematics\n\n## Joints\n\nRevolute joints rotate.\n");
        let mut view = PageView::new();
        let mut terminal = Terminal::new(TestBackend::new(80, 12)).unwrap();
        terminal
            .draw(|f| {
                view.render(f, f.area(), &mut page, &SelectionTracker::new(), &OCEANIC_NEXT)
            })
            .unwrap();

        let buffer = terminal.backend().buffer();
        let text: String = buffer.content().iter().map(|c| c.symbol()).collect();
        assert!(text.contains("Contents"));
        assert!(text.contains("Kinematics"));
        assert!(text.contains("Joints"));
        assert!(text.contains("Revolute joints rotate."));
    }

    #[test]
    fn scroll_is_clamped_to_content() {
        let page = Page::from_markdown("t", "one\n\ntwo\n");
        let mut view = PageView::new();
        view.scroll_up();
        assert_eq!(view.scroll_offset(), 0);
        for _ in 0..10 {
            view.scroll_down(&page);
        }
        assert_eq!(view.scroll_offset(), page.rows(Pane::Article).len() - 1);
    }
}
