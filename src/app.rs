use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};
use log::{debug, info};
use ratatui::{
    Frame, Terminal,
    layout::{Constraint, Direction, Layout, Rect},
    style::Style,
    widgets::Paragraph,
};

use crate::chat::{ChatService, Command, ReplyTransport};
use crate::event_source::EventSource;
use crate::inputs::{ClickType, MouseTracker};
use crate::page::Page;
use crate::selection::{BridgeConfig, PageSelection, SelectionBridge, SelectionBus, SelectionTracker};
use crate::settings::ChatConfig;
use crate::theme::current_theme;
use crate::widget::{ChatPanel, PageView};

#[derive(Debug, PartialEq, Eq)]
pub enum AppAction {
    Quit,
}

/// The reader: one page, the selection bridge and the mounted chat widget
pub struct App {
    page: Page,
    page_view: PageView,
    tracker: SelectionTracker,
    mouse: MouseTracker,
    /// The current left press landed on page text
    pressed_on_page: bool,
    bus: SelectionBus,
    bridge: SelectionBridge,
    chat: Option<ChatService>,
    chat_panel: ChatPanel,
    config: ChatConfig,
    transport: Option<Arc<dyn ReplyTransport>>,
}

impl App {
    pub fn new(page: Page, config: ChatConfig) -> Result<Self> {
        let mut app = Self::unmounted(page, config, None);
        app.mount_chat()?;
        Ok(app)
    }

    /// Build the app with a chat widget talking through `transport`
    pub fn with_transport(page: Page, config: ChatConfig, transport: Arc<dyn ReplyTransport>) -> Self {
        let mut app = Self::unmounted(page, config, Some(transport.clone()));
        app.chat = Some(ChatService::with_transport(&app.config, &app.bus, transport));
        app
    }

    fn unmounted(page: Page, config: ChatConfig, transport: Option<Arc<dyn ReplyTransport>>) -> Self {
        let bus = SelectionBus::new();
        let bridge = SelectionBridge::new(
            BridgeConfig {
                debounce: config.debounce,
                ..BridgeConfig::default()
            },
            bus.clone(),
        );
        Self {
            page,
            page_view: PageView::new(),
            tracker: SelectionTracker::new(),
            mouse: MouseTracker::new(),
            pressed_on_page: false,
            bus,
            bridge,
            chat: None,
            chat_panel: ChatPanel::new(),
            config,
            transport,
        }
    }

    pub fn mount_chat(&mut self) -> Result<()> {
        if self.chat.is_some() {
            return Ok(());
        }
        let service = match &self.transport {
            Some(transport) => ChatService::with_transport(&self.config, &self.bus, transport.clone()),
            None => ChatService::new(&self.config, &self.bus)?,
        };
        info!("Chat widget mounted, backend at {}", self.config.endpoint_url);
        self.chat = Some(service);
        Ok(())
    }

    pub fn unmount_chat(&mut self) {
        if self.chat.take().is_some() {
            info!("Chat widget unmounted");
        }
    }

    pub fn chat(&self) -> Option<&ChatService> {
        self.chat.as_ref()
    }

    pub fn chat_mut(&mut self) -> Option<&mut ChatService> {
        self.chat.as_mut()
    }

    pub fn bus(&self) -> &SelectionBus {
        &self.bus
    }

    pub fn tracker(&self) -> &SelectionTracker {
        &self.tracker
    }

    pub fn page(&self) -> &Page {
        &self.page
    }

    pub fn page_view(&self) -> &PageView {
        &self.page_view
    }

    fn chat_input_focused(&self) -> bool {
        self.chat.as_ref().is_some_and(|c| c.is_input_focused())
    }

    fn apply_chat(&mut self, cmd: Command) {
        if let Some(chat) = self.chat.as_mut() {
            chat.apply(cmd);
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> Option<AppAction> {
        if key.kind != KeyEventKind::Press {
            return None;
        }
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            return Some(AppAction::Quit);
        }

        if self.chat_input_focused() {
            if let Some(cmd) = self.chat_panel.handle_key(key) {
                self.apply_chat(cmd);
            }
            return None;
        }

        match key.code {
            KeyCode::Char('q') => return Some(AppAction::Quit),
            KeyCode::Char('c') => self.apply_chat(Command::Toggle),
            KeyCode::Char('j') | KeyCode::Down => self.page_view.scroll_down(&self.page),
            KeyCode::Char('k') | KeyCode::Up => self.page_view.scroll_up(),
            KeyCode::Esc => self.tracker.clear(),
            _ => {}
        }
        None
    }

    pub fn handle_mouse(&mut self, event: MouseEvent, now: Instant) {
        let (x, y) = (event.column, event.row);
        match event.kind {
            MouseEventKind::Down(MouseButton::Left) => {
                self.pressed_on_page = false;
                if self.chat_panel.covers(x, y) {
                    if let Some(cmd) = self.chat_panel.handle_click(x, y) {
                        self.apply_chat(cmd);
                    }
                    return;
                }
                let click = self.mouse.detect_click_type(x, y, now);
                let Some(pos) = self.page_view.screen_to_position(&self.page, x, y) else {
                    self.tracker.clear();
                    return;
                };
                self.pressed_on_page = true;
                match click {
                    ClickType::Double => {
                        self.tracker.select_word(&self.page, pos);
                        self.bridge.on_double_click(now);
                    }
                    ClickType::Single | ClickType::Triple => self.tracker.press(pos),
                }
            }
            MouseEventKind::Drag(MouseButton::Left) => {
                if self.tracker.is_selecting
                    && let Some(pos) = self.page_view.screen_to_position(&self.page, x, y)
                {
                    self.tracker.drag(pos);
                }
            }
            MouseEventKind::Up(MouseButton::Left) => {
                // only a press that landed on page text settles a selection
                if !std::mem::take(&mut self.pressed_on_page) {
                    return;
                }
                self.tracker.release();
                self.bridge.on_pointer_release(now);
            }
            MouseEventKind::ScrollDown => self.page_view.scroll_down(&self.page),
            MouseEventKind::ScrollUp => self.page_view.scroll_up(),
            _ => {}
        }
    }

    /// Settle pending selections and collect chat replies.
    /// Returns true when a redraw is needed.
    pub fn tick(&mut self, now: Instant) -> bool {
        let source = PageSelection {
            page: &self.page,
            tracker: &self.tracker,
        };
        let published = self.bridge.tick(now, &source).is_some();
        let chat_changed = self.chat.as_mut().is_some_and(|c| c.poll());
        published || chat_changed
    }

    pub fn draw(&mut self, f: &mut Frame) {
        let palette = current_theme();
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(3), Constraint::Length(1)])
            .split(f.area());

        self.page_view
            .render(f, chunks[0], &mut self.page, &self.tracker, palette);

        if let Some(chat) = &self.chat {
            self.chat_panel
                .render(f, chunks[0], chat.state(), chat.is_input_focused(), palette);
        }

        self.render_help_bar(f, chunks[1]);
    }

    fn render_help_bar(&self, f: &mut Frame, area: Rect) {
        let palette = current_theme();
        let help = if self.chat_input_focused() {
            "Enter: Send | Shift+Enter: New line | Esc: Close chat | Ctrl+C: Quit"
        } else if self.tracker.has_selection() {
            "Selection sent to the assistant | Esc: Clear selection | c: Chat | q: Quit"
        } else {
            "Drag or double-click to ask about text | c: Chat | j/k: Scroll | q: Quit"
        };
        f.render_widget(
            Paragraph::new(help).style(Style::default().fg(palette.base_03).bg(palette.base_00)),
            area,
        );
    }
}

pub fn run_app_with_event_source<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    event_source: &mut dyn EventSource,
) -> Result<()>
where
    B::Error: Send + Sync + 'static,
{
    let tick_rate = Duration::from_millis(50);
    let mut last_tick = Instant::now();
    let mut first_render = true;

    loop {
        let mut events_processed = 0;
        let mut should_quit = false;

        while event_source.poll(Duration::from_millis(0))? && events_processed < 50 {
            let event = event_source.read()?;
            events_processed += 1;

            match event {
                Event::Key(key) => {
                    if app.handle_key(key) == Some(AppAction::Quit) {
                        should_quit = true;
                    }
                }
                Event::Mouse(mouse_event) => app.handle_mouse(mouse_event, Instant::now()),
                Event::Resize(cols, rows) => debug!("Terminal resized to {cols}x{rows}"),
                _ => {}
            }

            if should_quit {
                break;
            }
        }

        let mut needs_redraw = events_processed > 0;
        if first_render {
            needs_redraw = true;
            first_render = false;
        }

        if last_tick.elapsed() >= tick_rate {
            if app.tick(Instant::now()) {
                needs_redraw = true;
            }
            last_tick = Instant::now();
        }

        if needs_redraw {
            terminal.draw(|f| app.draw(f))?;
        }

        if should_quit {
            return Ok(());
        }

        if events_processed == 0 {
            let timeout = tick_rate
                .checked_sub(last_tick.elapsed())
                .unwrap_or_else(|| Duration::from_secs(0));
            let _ = event_source.poll(timeout);
        }
    }
}
