pub mod chat_panel;
pub mod page_view;

pub use chat_panel::ChatPanel;
pub use page_view::PageView;
