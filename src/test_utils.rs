pub mod test_helpers {
    use crate::event_source::{Event, KeyCode, KeyModifiers, SimulatedEventSource};
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;

    /// Builder for creating test scenarios with simulated user input
    pub struct TestScenarioBuilder {
        events: Vec<Event>,
    }

    impl Default for TestScenarioBuilder {
        fn default() -> Self {
            Self::new()
        }
    }

    impl TestScenarioBuilder {
        pub fn new() -> Self {
            Self { events: Vec::new() }
        }

        /// Add a character key press
        pub fn press_char(mut self, c: char) -> Self {
            self.events.push(SimulatedEventSource::char_key(c));
            self
        }

        /// Type every character of `text`
        pub fn type_text(mut self, text: &str) -> Self {
            self.events
                .extend(text.chars().map(SimulatedEventSource::char_key));
            self
        }

        pub fn press_enter(mut self) -> Self {
            self.events.push(SimulatedEventSource::key_event(
                KeyCode::Enter,
                KeyModifiers::empty(),
            ));
            self
        }

        /// Shift+Enter inserts a newline in the chat input
        pub fn press_shift_enter(mut self) -> Self {
            self.events.push(SimulatedEventSource::key_event(
                KeyCode::Enter,
                KeyModifiers::SHIFT,
            ));
            self
        }

        pub fn press_esc(mut self) -> Self {
            self.events.push(SimulatedEventSource::key_event(
                KeyCode::Esc,
                KeyModifiers::empty(),
            ));
            self
        }

        /// Open or close the chat window (press 'c')
        pub fn toggle_chat(self) -> Self {
            self.press_char('c')
        }

        /// Scroll the article down n times (press 'j' n times)
        pub fn navigate_down(mut self, times: usize) -> Self {
            for _ in 0..times {
                self.events.push(SimulatedEventSource::char_key('j'));
            }
            self
        }

        /// Left click at a terminal cell
        pub fn click(mut self, column: u16, row: u16) -> Self {
            self.events.push(SimulatedEventSource::left_down(column, row));
            self.events.push(SimulatedEventSource::left_up(column, row));
            self
        }

        pub fn double_click(self, column: u16, row: u16) -> Self {
            self.click(column, row).click(column, row)
        }

        /// Press at `from`, drag to `to` and release there
        pub fn drag_select(mut self, from: (u16, u16), to: (u16, u16)) -> Self {
            self.events.push(SimulatedEventSource::left_down(from.0, from.1));
            self.events.push(SimulatedEventSource::left_drag(to.0, to.1));
            self.events.push(SimulatedEventSource::left_up(to.0, to.1));
            self
        }

        /// Quit the application (Ctrl+C works regardless of focus)
        pub fn quit(mut self) -> Self {
            self.events.push(SimulatedEventSource::ctrl_char_key('c'));
            self
        }

        pub fn events(&self) -> &[Event] {
            &self.events
        }

        /// Build the simulated event source
        pub fn build(self) -> SimulatedEventSource {
            SimulatedEventSource::new(self.events)
        }
    }

    /// Create a test terminal for snapshot testing
    pub fn create_test_terminal(width: u16, height: u16) -> Terminal<TestBackend> {
        let backend = TestBackend::new(width, height);
        Terminal::new(backend).unwrap()
    }

    /// Capture the current terminal buffer as a string
    pub fn capture_terminal_state(terminal: &Terminal<TestBackend>) -> String {
        let buffer = terminal.backend().buffer();
        let mut lines = Vec::new();

        for y in 0..buffer.area.height {
            let mut line = String::new();
            for x in 0..buffer.area.width {
                line.push_str(buffer[(x, y)].symbol());
            }
            // Trim trailing whitespace from each line
            lines.push(line.trim_end().to_string());
        }

        // Remove trailing empty lines
        while lines.last().is_some_and(|l| l.is_empty()) {
            lines.pop();
        }

        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::test_helpers::*;

    #[test]
    fn test_scenario_builder() {
        let scenario = TestScenarioBuilder::new()
            .toggle_chat()
            .type_text("hi")
            .press_enter()
            .double_click(30, 3)
            .drag_select((28, 3), (35, 3))
            .quit();

        // 1 + 2 + 1 + 4 + 3 + 1
        assert_eq!(scenario.events().len(), 12);
        assert_eq!(scenario.build().events.len(), 12);
    }
}
