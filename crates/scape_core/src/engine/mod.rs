//! Engine object model
//!
//! The composition layer scenes operate on: behaviours attach logic to game
//! objects, game objects carry transforms, and the host loop drives both
//! through batch events. Scenes track behaviours and derive their game
//! object list from them.

pub mod behaviour;
pub mod components;
pub mod context;
pub mod events;
pub mod game_object;

pub use behaviour::UpdateBehaviour;
