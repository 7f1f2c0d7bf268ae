pub mod bridge;
pub mod bus;
pub mod region;
pub mod tracker;

pub use bridge::{BridgeConfig, SelectionBridge, SelectionSnapshot, SelectionSource, Trigger};
pub use bus::{SelectionBus, SelectionEvent, SelectionSubscription};
pub use region::{ElementNode, ElementPath, RegionMarker};
pub use tracker::{PageSelection, SelectionTracker};
