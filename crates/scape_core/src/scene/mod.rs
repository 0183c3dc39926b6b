//! Scene management
//!
//! A scene is a container for live behaviour/entity instances plus the
//! machinery to construct new ones asynchronously:
//!
//! ```text
//! callers (any thread) → request channel → worker thread → type pools
//!        │                                      │
//!        └──── completion handle (one-shot) ◄───┘
//! ```
//!
//! Every request travels with its own completion handle as one unit, and the
//! worker settles each handle exactly once: success, explicit instantiation
//! failure, or cancellation during disposal.

mod scene;
mod scene_manager;

pub use scene::{PendingBehaviour, PendingInstance, Scene, SceneError};
pub use scene_manager::SceneManager;
