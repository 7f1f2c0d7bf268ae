//! Selection bridge: turns settled text selections inside content regions
//! into [`SelectionEvent`]s on the [`SelectionBus`].

use std::time::{Duration, Instant};

use log::{debug, info};

use super::bus::{SelectionBus, SelectionEvent};
use super::region::{ElementPath, RegionMarker};

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);
const LOG_PREVIEW_CHARS: usize = 100;

/// Selection as seen by the host when the debounce window settles
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SelectionSnapshot {
    pub text: String,
    /// Element path of the selection's common ancestor
    pub anchor: ElementPath,
}

/// Anything that can report the current text selection
pub trait SelectionSource {
    fn current_selection(&self) -> Option<SelectionSnapshot>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Trigger {
    PointerRelease,
    DoubleClick,
}

#[derive(Clone, Debug)]
pub struct BridgeConfig {
    pub debounce: Duration,
    pub content_markers: Vec<RegionMarker>,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            debounce: DEFAULT_DEBOUNCE,
            content_markers: RegionMarker::content_defaults(),
        }
    }
}

pub struct SelectionBridge {
    config: BridgeConfig,
    bus: SelectionBus,
    pending: Option<(Trigger, Instant)>,
}

impl SelectionBridge {
    pub fn new(config: BridgeConfig, bus: SelectionBus) -> Self {
        Self {
            config,
            bus,
            pending: None,
        }
    }

    pub fn on_pointer_release(&mut self, now: Instant) {
        self.arm(Trigger::PointerRelease, now);
    }

    pub fn on_double_click(&mut self, now: Instant) {
        self.arm(Trigger::DoubleClick, now);
    }

    /// Each trigger restarts the window so a burst collapses to one publish
    fn arm(&mut self, trigger: Trigger, now: Instant) {
        self.pending = Some((trigger, now + self.config.debounce));
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Publish the settled selection once the debounce window has elapsed.
    ///
    /// Returns the published event; `None` when nothing is due, or when the
    /// selection is empty or outside the content regions.
    pub fn tick(&mut self, now: Instant, source: &dyn SelectionSource) -> Option<SelectionEvent> {
        let (trigger, deadline) = self.pending?;
        if now < deadline {
            return None;
        }
        self.pending = None;

        let text = self.settled_text(source)?;
        info!("Selected text detected ({trigger:?}): {}", preview(&text));

        let event = SelectionEvent::now(text);
        self.bus.publish(event.clone());
        Some(event)
    }

    fn settled_text(&self, source: &dyn SelectionSource) -> Option<String> {
        let Some(snapshot) = source.current_selection() else {
            debug!("Selection settled with nothing selected");
            return None;
        };

        let text = snapshot.text.trim();
        if text.is_empty() {
            debug!("Ignoring whitespace-only selection");
            return None;
        }

        if !snapshot.anchor.is_within_any(&self.config.content_markers) {
            debug!("Ignoring selection outside content regions: {}", snapshot.anchor);
            return None;
        }

        Some(text.to_string())
    }
}

fn preview(text: &str) -> String {
    if text.chars().count() > LOG_PREVIEW_CHARS {
        let head: String = text.chars().take(LOG_PREVIEW_CHARS).collect();
        format!("{head}...")
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selection::region::ElementNode;
    use std::cell::RefCell;

    struct FixedSelection(RefCell<Option<SelectionSnapshot>>);

    impl FixedSelection {
        fn content(text: &str) -> Self {
            let anchor = ElementPath::new(vec![
                ElementNode::new("main"),
                ElementNode::new("article").with_class("markdown"),
            ]);
            Self(RefCell::new(Some(SelectionSnapshot {
                text: text.to_string(),
                anchor,
            })))
        }

        fn chrome(text: &str) -> Self {
            let anchor = ElementPath::new(vec![ElementNode::new("nav").with_class("sidebar")]);
            Self(RefCell::new(Some(SelectionSnapshot {
                text: text.to_string(),
                anchor,
            })))
        }

        fn nothing() -> Self {
            Self(RefCell::new(None))
        }
    }

    impl SelectionSource for FixedSelection {
        fn current_selection(&self) -> Option<SelectionSnapshot> {
            self.0.borrow().clone()
        }
    }

    fn bridge() -> (SelectionBridge, crate::selection::bus::SelectionSubscription) {
        let bus = SelectionBus::new();
        let subscription = bus.subscribe();
        (SelectionBridge::new(BridgeConfig::default(), bus), subscription)
    }

    #[test]
    fn publishes_only_after_window_elapses() {
        let (mut bridge, sub) = bridge();
        let source = FixedSelection::content("  explain torque \n");
        let start = Instant::now();

        bridge.on_pointer_release(start);
        assert!(bridge.tick(start + Duration::from_millis(299), &source).is_none());

        let event = bridge
            .tick(start + Duration::from_millis(300), &source)
            .unwrap();
        assert_eq!(event.text, "explain torque");
        assert_eq!(sub.drain().len(), 1);
        assert!(!bridge.is_pending());
    }

    #[test]
    fn rapid_triggers_collapse_into_one_publish() {
        let (mut bridge, sub) = bridge();
        let source = FixedSelection::content("servo");
        let start = Instant::now();

        bridge.on_pointer_release(start);
        bridge.on_pointer_release(start + Duration::from_millis(100));
        bridge.on_double_click(start + Duration::from_millis(150));

        // first deadline has passed but the window was restarted
        assert!(bridge.tick(start + Duration::from_millis(320), &source).is_none());
        assert!(bridge.tick(start + Duration::from_millis(450), &source).is_some());
        assert!(bridge.tick(start + Duration::from_millis(900), &source).is_none());
        assert_eq!(sub.drain().len(), 1);
    }

    #[test]
    fn selection_outside_content_is_dropped() {
        let (mut bridge, sub) = bridge();
        let start = Instant::now();

        bridge.on_double_click(start);
        let late = start + Duration::from_secs(1);
        assert!(bridge.tick(late, &FixedSelection::chrome("Chapter 2")).is_none());
        assert!(sub.drain().is_empty());
        assert!(!bridge.is_pending());
    }

    #[test]
    fn empty_or_missing_selection_is_a_noop() {
        let (mut bridge, sub) = bridge();
        let start = Instant::now();
        let late = start + Duration::from_secs(1);

        bridge.on_pointer_release(start);
        assert!(bridge.tick(late, &FixedSelection::content(" \t\n")).is_none());

        bridge.on_pointer_release(start);
        assert!(bridge.tick(late, &FixedSelection::nothing()).is_none());

        assert!(sub.drain().is_empty());
    }

    #[test]
    fn tick_without_trigger_never_publishes() {
        let (mut bridge, sub) = bridge();
        let source = FixedSelection::content("kinematics");
        assert!(bridge.tick(Instant::now(), &source).is_none());
        assert!(sub.drain().is_empty());
    }

    #[test]
    fn preview_truncates_long_text() {
        let long = "a".repeat(150);
        let shown = preview(&long);
        assert_eq!(shown.len(), 103);
        assert!(shown.ends_with("..."));
        assert_eq!(preview("short"), "short");
    }
}
