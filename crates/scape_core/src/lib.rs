//! # ScapeCore
//!
//! A small 2D game engine core built around two subsystems:
//!
//! - **Scene management**: every [`scene::Scene`] owns a dedicated worker
//!   thread that serializes object-instantiation requests arriving from any
//!   thread into a single queue, fulfills them from per-type object pools,
//!   and settles a one-shot completion handle per request.
//! - **Runtime serialization**: a schema model built from explicit type
//!   descriptors, assigning sequential wire field numbers and subtype tags,
//!   consumed by streaming serializers with optional gzip compression.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use scape_core::prelude::*;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     scape_core::foundation::logging::init();
//!
//!     let mut context = EngineContext::new(EngineSettings::default());
//!     let scene = Scene::new("main", 0)?;
//!     let id = context.scenes.add_scene(scene);
//!     context.scenes.set_current_scene(id);
//!
//!     // Spawn behaviours through the scene's worker, then tear down.
//!     context.shutdown();
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions, clippy::similar_names)]

pub mod dynamic;
pub mod engine;
pub mod foundation;
pub mod scene;
pub mod serialization;
pub mod settings;

pub use engine::context::EngineContext;
pub use settings::EngineSettings;

/// Common imports for engine users
pub mod prelude {
    pub use crate::{
        dynamic::{DeeplyMutable, ObjectPool, SpawnError},
        engine::{
            behaviour::{
                Behaviour, BehaviourState, BehaviourType, DynBehaviour, SharedBehaviour,
                Spawnable,
            },
            components::Transform,
            events::{LoadBatchEvent, RenderBatchEvent, StartBatchEvent, UpdateBatchEvent},
            game_object::{GameObject, SharedGameObject},
            UpdateBehaviour,
        },
        scene::{PendingBehaviour, Scene, SceneError, SceneManager},
        serialization::{
            schema::{FieldDescriptor, Reflect, TypeDescriptor, WireKind, WireValue},
            SerializationContext,
        },
        settings::{Config, EngineSettings},
        EngineContext,
    };
}
