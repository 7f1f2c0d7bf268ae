use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
};
use unicode_width::UnicodeWidthStr;

use crate::chat::{ChatState, Command, Sender};
use crate::theme::Base16Palette;

const WINDOW_WIDTH: u16 = 50;
const WINDOW_HEIGHT: u16 = 20;
const INPUT_HEIGHT: u16 = 5;
const BUTTON_LABEL: &str = "[ chat ]";
const UNREAD_DOT: &str = "●";
const CLOSE_LABEL: &str = "[x]";
const SEND_LABEL: &str = "[Send]";
const PLACEHOLDER: &str = "Type your message...";
const TYPING_INDICATOR: &str = "• • •";

/// Floating chat overlay anchored to the bottom-right corner
#[derive(Debug, Default)]
pub struct ChatPanel {
    last_window_area: Option<Rect>,
    last_button_area: Option<Rect>,
    last_close_area: Option<Rect>,
    last_send_area: Option<Rect>,
}

impl ChatPanel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn render(
        &mut self,
        f: &mut Frame,
        area: Rect,
        state: &ChatState,
        input_focused: bool,
        palette: &Base16Palette,
    ) {
        if state.is_open() {
            self.last_button_area = None;
            self.render_window(f, area, state, input_focused, palette);
        } else {
            self.last_window_area = None;
            self.last_close_area = None;
            self.last_send_area = None;
            self.render_button(f, area, state.has_unread(), palette);
        }
    }

    fn render_button(&mut self, f: &mut Frame, area: Rect, unread: bool, palette: &Base16Palette) {
        let width = BUTTON_LABEL.width() as u16 + 2;
        if area.width <= width || area.height < 2 {
            return;
        }
        let button = Rect::new(
            area.x + area.width - width - 1,
            area.y + area.height - 2,
            width,
            1,
        );
        self.last_button_area = Some(button);

        let mut spans = vec![Span::styled(
            BUTTON_LABEL,
            Style::default()
                .fg(palette.base_00)
                .bg(palette.base_0d)
                .add_modifier(Modifier::BOLD),
        )];
        if unread {
            spans.push(Span::styled(
                format!(" {UNREAD_DOT}"),
                Style::default().fg(palette.base_08),
            ));
        }

        f.render_widget(Clear, button);
        f.render_widget(Paragraph::new(Line::from(spans)), button);
    }

    fn render_window(
        &mut self,
        f: &mut Frame,
        area: Rect,
        state: &ChatState,
        input_focused: bool,
        palette: &Base16Palette,
    ) {
        let width = WINDOW_WIDTH.min(area.width);
        let height = WINDOW_HEIGHT.min(area.height);
        let window = Rect::new(
            area.x + area.width - width,
            area.y + area.height - height,
            width,
            height,
        );
        self.last_window_area = Some(window);

        f.render_widget(Clear, window);

        let (text_color, border_color, bg) = palette.get_panel_colors(true);
        let block = Block::default()
            .title(" AI Assistant ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(border_color))
            .style(Style::default().fg(text_color).bg(bg));
        let inner = block.inner(window);
        f.render_widget(block, window);

        let close_width = CLOSE_LABEL.width() as u16;
        if window.width > close_width + 2 {
            let close = Rect::new(window.x + window.width - close_width - 1, window.y, close_width, 1);
            self.last_close_area = Some(close);
            f.render_widget(
                Paragraph::new(Span::styled(CLOSE_LABEL, Style::default().fg(palette.base_08))),
                close,
            );
        }

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(1), Constraint::Length(INPUT_HEIGHT)])
            .split(inner);

        let transcript = transcript_lines(state, chunks[0].width as usize, palette);
        let overflow = transcript.len().saturating_sub(chunks[0].height as usize);
        let visible: Vec<Line> = transcript.into_iter().skip(overflow).collect();
        f.render_widget(Paragraph::new(visible), chunks[0]);

        self.render_input(f, chunks[1], state, input_focused, palette);
    }

    fn render_input(
        &mut self,
        f: &mut Frame,
        area: Rect,
        state: &ChatState,
        input_focused: bool,
        palette: &Base16Palette,
    ) {
        let border = if input_focused && !state.is_loading() {
            palette.base_0c
        } else {
            palette.base_03
        };
        let block = Block::default()
            .borders(Borders::TOP)
            .border_style(Style::default().fg(border));
        let inner = block.inner(area);
        f.render_widget(block, area);

        let send_width = SEND_LABEL.width() as u16;
        let [text_area, send_area] = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Min(1), Constraint::Length(send_width)])
            .areas(inner);
        self.last_send_area = Some(Rect::new(send_area.x, send_area.y, send_area.width, 1));

        let send_style = if state.can_submit() {
            Style::default().fg(palette.base_0b).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(palette.base_03)
        };
        f.render_widget(Paragraph::new(Span::styled(SEND_LABEL, send_style)), send_area);

        if state.input().is_empty() {
            f.render_widget(
                Paragraph::new(Span::styled(PLACEHOLDER, Style::default().fg(palette.base_03))),
                text_area,
            );
            if input_focused && !state.is_loading() {
                f.set_cursor_position((text_area.x, text_area.y));
            }
            return;
        }

        let input_color = if state.is_loading() {
            palette.base_03
        } else {
            palette.base_05
        };
        let lines: Vec<&str> = state.input().split('\n').collect();
        let skip = lines.len().saturating_sub(text_area.height as usize);
        let visible: Vec<Line> = lines
            .iter()
            .skip(skip)
            .map(|l| Line::from(Span::styled(l.to_string(), Style::default().fg(input_color))))
            .collect();
        f.render_widget(Paragraph::new(visible), text_area);

        if input_focused && !state.is_loading() {
            let last = lines.last().copied().unwrap_or_default();
            let row = (lines.len() - skip).saturating_sub(1) as u16;
            let col = (last.width() as u16).min(text_area.width.saturating_sub(1));
            f.set_cursor_position((text_area.x + col, text_area.y + row));
        }
    }

    /// Translate a key press into a chat command while the input has focus
    pub fn handle_key(&self, key: KeyEvent) -> Option<Command> {
        match key.code {
            KeyCode::Esc => Some(Command::Close),
            KeyCode::Enter
                if key.modifiers.intersects(KeyModifiers::SHIFT | KeyModifiers::ALT) =>
            {
                Some(Command::InputNewline)
            }
            KeyCode::Enter => Some(Command::SubmitTyped),
            KeyCode::Backspace => Some(Command::InputBackspace),
            KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
                Some(Command::InputChar(c))
            }
            _ => None,
        }
    }

    /// Translate a left click into a chat command
    pub fn handle_click(&self, x: u16, y: u16) -> Option<Command> {
        let hit = |area: Option<Rect>| area.is_some_and(|a| contains(a, x, y));
        if hit(self.last_button_area) {
            Some(Command::Open)
        } else if hit(self.last_close_area) {
            Some(Command::Close)
        } else if hit(self.last_send_area) {
            Some(Command::SubmitTyped)
        } else {
            None
        }
    }

    /// Whether a screen cell is covered by the chat overlay
    pub fn covers(&self, x: u16, y: u16) -> bool {
        [self.last_window_area, self.last_button_area]
            .into_iter()
            .flatten()
            .any(|a| contains(a, x, y))
    }
}

fn transcript_lines(state: &ChatState, width: usize, palette: &Base16Palette) -> Vec<Line<'static>> {
    let (user_color, bot_color) = palette.get_message_colors();
    let bubble_width = (width * 4 / 5).max(1);
    let mut lines = Vec::new();

    for message in state.conversation().messages() {
        let (style, alignment) = match message.sender() {
            Sender::User => (Style::default().fg(user_color), Alignment::Right),
            Sender::Bot => (Style::default().fg(bot_color), Alignment::Left),
        };
        for paragraph in message.text().split('\n') {
            for wrapped in textwrap::wrap(paragraph, bubble_width) {
                lines.push(Line::from(Span::styled(wrapped.into_owned(), style)).alignment(alignment));
            }
        }
        lines.push(Line::default());
    }

    if state.is_loading() {
        lines.push(Line::from(Span::styled(
            TYPING_INDICATOR,
            Style::default().fg(bot_color).add_modifier(Modifier::SLOW_BLINK),
        )));
    }

    lines
}

fn contains(area: Rect, x: u16, y: u16) -> bool {
    x >= area.x && x < area.x + area.width && y >= area.y && y < area.y + area.height
}
