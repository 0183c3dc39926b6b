//! Registry of active scenes.
//!
//! An explicit context object rather than process-wide state: the engine
//! context owns one and disposes every scene through it at shutdown.

use std::collections::HashMap;

use crate::scene::Scene;

/// Sentinel returned by registry operations that could not produce an id.
const INVALID_SCENE_ID: i32 = -1;

/// Manages a collection of active [`Scene`] instances keyed by integer id,
/// with a "current scene" pointer.
pub struct SceneManager {
    scenes: HashMap<i32, Scene>,
    count: usize,
    current_index: i32,
}

impl SceneManager {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            scenes: HashMap::new(),
            count: 0,
            current_index: 0,
        }
    }

    /// Register `scene`, assigning id `0` when the registry is empty and
    /// `max(existing ids) + 1` otherwise. Ids are never reused while other
    /// scenes remain. Returns `-1` on an id collision, which the allocation
    /// rule should make impossible.
    pub fn add_scene(&mut self, scene: Scene) -> i32 {
        let id = if self.count == 0 {
            0
        } else {
            self.scenes.keys().copied().max().map_or(0, |max| max + 1)
        };
        if self.scenes.contains_key(&id) {
            log::error!(
                "there was a problem while trying to add scene `{}` to the scene manager",
                scene.name
            );
            return INVALID_SCENE_ID;
        }
        self.scenes.insert(id, scene);
        self.count += 1;
        id
    }

    /// Look up a scene by id. Logs and returns `None` when absent.
    pub fn get(&self, scene_id: i32) -> Option<&Scene> {
        let scene = self.scenes.get(&scene_id);
        if scene.is_none() {
            log::error!("scene with id {scene_id} not found in the scene manager");
        }
        scene
    }

    /// Remove the scene registered under `scene_id`, returning the id or
    /// `-1` when the registry is empty or the id is unknown. Surviving
    /// scenes keep their ids. The removed scene is disposed on drop.
    pub fn remove_scene(&mut self, scene_id: i32) -> i32 {
        if self.count == 0 {
            return INVALID_SCENE_ID;
        }
        match self.scenes.remove(&scene_id) {
            Some(_scene) => {
                self.count -= 1;
                scene_id
            }
            None => {
                log::error!(
                    "there was a problem while trying to remove scene {scene_id} from the scene \
                     manager"
                );
                INVALID_SCENE_ID
            }
        }
    }

    /// Dispose every scene and empty the registry. Used at shutdown.
    pub fn clear(&mut self) {
        for (_, scene) in self.scenes.drain() {
            scene.dispose();
        }
        self.count = 0;
    }

    /// Point the "current scene" reference at `scene_index`.
    pub fn set_current_scene(&mut self, scene_index: i32) {
        self.current_index = scene_index;
    }

    /// Non-owning reference to the scene at the current index. Resolves to
    /// `None` when no scene occupies that index; callers must handle the
    /// absence, typically by creating a default scene.
    pub fn current_scene(&self) -> Option<&Scene> {
        self.scenes.get(&self.current_index)
    }

    /// Number of registered scenes.
    pub fn count(&self) -> usize {
        self.count
    }

    /// Whether the registry holds no scenes.
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Iterate over the registered scenes in arbitrary order.
    pub fn scenes(&self) -> impl Iterator<Item = &Scene> {
        self.scenes.values()
    }
}

impl Default for SceneManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scene(name: &str) -> Scene {
        Scene::new(name, 0).unwrap()
    }

    #[test]
    fn ids_grow_from_the_maximum() {
        let mut manager = SceneManager::new();
        assert_eq!(manager.add_scene(scene("a")), 0);
        assert_eq!(manager.add_scene(scene("b")), 1);
        assert_eq!(manager.add_scene(scene("c")), 2);
        assert_eq!(manager.count(), 3);
    }

    #[test]
    fn removal_does_not_renumber_survivors() {
        let mut manager = SceneManager::new();
        manager.add_scene(scene("a"));
        manager.add_scene(scene("b"));
        manager.add_scene(scene("c"));

        assert_eq!(manager.remove_scene(1), 1);
        assert_eq!(manager.count(), 2);
        assert_eq!(manager.get(0).map(|s| s.name.as_str()), Some("a"));
        assert_eq!(manager.get(2).map(|s| s.name.as_str()), Some("c"));

        // Ids keep growing past the highest ever assigned.
        assert_eq!(manager.add_scene(scene("d")), 3);
    }

    #[test]
    fn removing_from_an_empty_registry_fails() {
        let mut manager = SceneManager::new();
        assert_eq!(manager.remove_scene(0), -1);
        manager.add_scene(scene("a"));
        assert_eq!(manager.remove_scene(7), -1);
    }

    #[test]
    fn current_scene_resolves_to_nothing_when_unoccupied() {
        let mut manager = SceneManager::new();
        assert!(manager.current_scene().is_none());

        let id = manager.add_scene(scene("a"));
        manager.set_current_scene(id);
        assert_eq!(manager.current_scene().map(|s| s.name.as_str()), Some("a"));

        manager.remove_scene(id);
        assert!(manager.current_scene().is_none());
    }

    #[test]
    fn clear_disposes_every_scene() {
        let mut manager = SceneManager::new();
        manager.add_scene(scene("a"));
        manager.add_scene(scene("b"));
        manager.clear();
        assert!(manager.is_empty());
        assert!(manager.current_scene().is_none());
    }
}
