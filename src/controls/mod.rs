//! On-screen touch controls for the engine
//!
//! Layers, bottom to top:
//!
//! 1. [`keys`] - Key codes and the catalog of bindable keys
//! 2. [`widget`] - Buttons, the thumbstick and their persisted records
//! 3. [`store`] - Line-oriented `UI.cfg` persistence
//! 4. [`layout`] - Live registry and editing operations
//! 5. [`thumbstick`] / [`buttons`] - Touch-to-key translation
//! 6. [`overlay`] - Pointer routing between play and edit mode
//!
//! # Architecture
//!
//! ```text
//! Pointer ──► Overlay ──┬─► StickMachine ──┐
//!                       ├─► ButtonInput  ──┼──► KeySink ──► engine
//!                       └─► LayoutEngine ──► LayoutStore ──► UI.cfg
//! ```
//!
//! [`transfer`] copies the layout file to and from timestamped backups.

pub mod buttons;
pub mod input;
pub mod keys;
pub mod layout;
pub mod overlay;
pub mod store;
pub mod thumbstick;
pub mod transfer;
pub mod widget;

pub use input::{KeyEvent, KeyQueue, KeySink};
pub use keys::{available_keys, KeyCatalog, KeyCode};
pub use layout::{LayoutEngine, LayoutError};
pub use overlay::Overlay;
pub use store::{LayoutStore, StoreError};
pub use thumbstick::{PointerAction, PointerEvent, StickMachine};
pub use widget::{ButtonId, ControlTarget, ResizeStep, WidgetRecord};
