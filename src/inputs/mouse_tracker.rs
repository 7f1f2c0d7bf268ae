use std::time::{Duration, Instant};

const MULTI_CLICK_WINDOW: Duration = Duration::from_millis(500);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClickType {
    Single,
    Double,
    Triple,
}

/// Classifies left-button presses into single, double and triple clicks
#[derive(Debug, Default)]
pub struct MouseTracker {
    last_click: Option<(Instant, u16, u16)>,
    count: u8,
}

impl MouseTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn detect_click_type(&mut self, column: u16, row: u16, now: Instant) -> ClickType {
        let repeated = self.last_click.is_some_and(|(at, c, r)| {
            c == column && r == row && now.saturating_duration_since(at) <= MULTI_CLICK_WINDOW
        });

        self.count = if repeated { (self.count % 3) + 1 } else { 1 };
        self.last_click = Some((now, column, row));

        match self.count {
            1 => ClickType::Single,
            2 => ClickType::Double,
            _ => ClickType::Triple,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_clicks_at_same_spot() {
        let mut tracker = MouseTracker::new();
        let t = Instant::now();
        assert_eq!(tracker.detect_click_type(5, 5, t), ClickType::Single);
        assert_eq!(
            tracker.detect_click_type(5, 5, t + Duration::from_millis(100)),
            ClickType::Double
        );
        assert_eq!(
            tracker.detect_click_type(5, 5, t + Duration::from_millis(200)),
            ClickType::Triple
        );
        assert_eq!(
            tracker.detect_click_type(5, 5, t + Duration::from_millis(300)),
            ClickType::Single
        );
    }

    #[test]
    fn slow_or_moved_click_starts_over() {
        let mut tracker = MouseTracker::new();
        let t = Instant::now();
        tracker.detect_click_type(1, 1, t);
        assert_eq!(
            tracker.detect_click_type(1, 1, t + Duration::from_secs(1)),
            ClickType::Single
        );
        assert_eq!(
            tracker.detect_click_type(2, 1, t + Duration::from_millis(1100)),
            ClickType::Single
        );
    }
}
