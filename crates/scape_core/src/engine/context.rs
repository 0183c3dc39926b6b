//! Engine context — explicit ownership of the process-level subsystems.
//!
//! One context per host process: it owns the scene registry and the
//! serialization stack, with a clear init/teardown lifecycle instead of
//! global mutable state.

use crate::scene::{Scene, SceneError, SceneManager};
use crate::serialization::SerializationContext;
use crate::settings::EngineSettings;

/// Owns the scene registry and serialization stack for one host process.
pub struct EngineContext {
    /// Registry of active scenes
    pub scenes: SceneManager,
    /// Serialization model and streamers
    pub serialization: SerializationContext,
    settings: EngineSettings,
}

impl EngineContext {
    /// Build a context from `settings`, preloading the engine's serializable
    /// types.
    pub fn new(settings: EngineSettings) -> Self {
        log::info!("initializing engine context");
        let serialization = SerializationContext::with_engine_types(&settings.serialization);
        Self {
            scenes: SceneManager::new(),
            serialization,
            settings,
        }
    }

    /// The settings the context was built with.
    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// The current scene, creating and registering a default one (named per
    /// the settings) when the current index is unoccupied.
    pub fn current_or_default_scene(&mut self) -> Result<&Scene, SceneError> {
        if self.scenes.current_scene().is_none() {
            let scene = Scene::new(
                &self.settings.scene.default_scene_name,
                self.settings.scene.default_scene_index,
            )?;
            let id = self.scenes.add_scene(scene);
            self.scenes.set_current_scene(id);
        }
        // The branch above guarantees occupancy; current_scene logs nothing.
        self.scenes
            .current_scene()
            .ok_or(SceneError::Disposed {
                scene: self.settings.scene.default_scene_name.clone(),
            })
    }

    /// Dispose every scene and release the registry. Used at process
    /// shutdown.
    pub fn shutdown(&mut self) {
        log::info!("shutting down engine context");
        self.scenes.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_builds_with_engine_types_registered() {
        let context = EngineContext::new(EngineSettings::default());
        assert!(context.serialization.can_serialize("Transform"));
        assert!(context.serialization.can_serialize("GameObject"));
        assert!(context.serialization.can_serialize("DeeplyMutable"));
    }

    #[test]
    fn current_or_default_scene_creates_one_on_demand() {
        let mut context = EngineContext::new(EngineSettings::default());
        assert!(context.scenes.current_scene().is_none());

        let name = context.current_or_default_scene().unwrap().name.clone();
        assert_eq!(name, "Scene");
        assert_eq!(context.scenes.count(), 1);

        // A second call reuses the registered scene.
        context.current_or_default_scene().unwrap();
        assert_eq!(context.scenes.count(), 1);
        context.shutdown();
        assert!(context.scenes.is_empty());
    }
}
