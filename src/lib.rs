pub mod app;
pub mod chat;
pub mod event_source;
pub mod inputs;
pub mod page;
pub mod panic_handler;
pub mod selection;
pub mod settings;
pub mod theme;
pub mod widget;

pub mod test_utils;

pub use app::{App, AppAction, run_app_with_event_source};
