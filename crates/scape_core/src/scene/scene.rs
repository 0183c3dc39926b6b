//! Scene — pooled, queue-serialized object instantiation.
//!
//! All construction and pool population happen on one dedicated worker
//! thread, so pools and the type-to-pool map need no locking discipline
//! beyond their own internal synchronization: the design trades one
//! instantiation at a time for the absence of cross-thread races when a
//! type's pool is created lazily on first sight.

use std::any::TypeId;
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use crossbeam::channel::{bounded, unbounded, Receiver, Sender};
use thiserror::Error;

use crate::dynamic::{DeeplyMutable, ObjectPool, SpawnError};
use crate::engine::behaviour::{
    Behaviour, BehaviourType, DynBehaviour, SharedBehaviour, Spawnable, TrackedInstance,
};
use crate::engine::game_object::SharedGameObject;
use crate::foundation::sync::lock;

/// Errors surfaced by the scene instantiation pipeline.
#[derive(Debug, Error)]
pub enum SceneError {
    /// The scene no longer accepts instantiation requests.
    #[error("scene `{scene}` is disposed and no longer accepts instantiation requests")]
    Disposed {
        /// Name of the disposed scene
        scene: String,
    },
    /// The request was still pending when the scene shut down.
    #[error("instantiation request was cancelled while the scene was disposing")]
    Cancelled,
    /// The generator reported a construction failure.
    #[error(transparent)]
    Instantiation(#[from] SpawnError),
    /// The instantiated value did not hold the expected runtime type.
    #[error("instantiated value for `{expected}` had an unexpected runtime type")]
    TypeMismatch {
        /// The requested behaviour type
        expected: &'static str,
    },
    /// The dedicated worker thread could not be spawned.
    #[error("failed to spawn the scene worker thread: {0}")]
    WorkerSpawn(std::io::Error),
}

type SettledResult = Result<DeeplyMutable, SceneError>;
type Generator = Box<dyn FnOnce(&mut DeeplyMutable) -> Result<(), SpawnError> + Send>;

/// One queued instantiation: the work closure and its own completion handle,
/// paired as a single unit.
struct InstantiationRequest {
    generator: Generator,
    completion: Sender<SettledResult>,
    type_name: &'static str,
}

/// State shared between the scene handle, its worker thread, and pending
/// completion handles.
struct SceneShared {
    name: String,
    type_pools: Mutex<HashMap<TypeId, Arc<ObjectPool>>>,
    behaviours: Mutex<Vec<TrackedInstance>>,
    game_objects: Mutex<Vec<SharedGameObject>>,
    cancelled: AtomicBool,
}

impl SceneShared {
    fn track(&self, tracked: TrackedInstance) {
        if self.cancelled.load(Ordering::SeqCst) {
            log::debug!("scene `{}` is disposing; instance not tracked", self.name);
            return;
        }
        if let Some(game_object) = &tracked.game_object {
            lock(&self.game_objects).push(Arc::clone(game_object));
        }
        lock(&self.behaviours).push(tracked);
    }
}

/// Worker loop: drain requests until the channel closes, settling every
/// request exactly once. After cancellation is observed the remaining
/// entries are drained as cancelled rather than instantiated.
fn instantiate_invocations(receiver: Receiver<InstantiationRequest>, shared: Arc<SceneShared>) {
    while let Ok(request) = receiver.recv() {
        if shared.cancelled.load(Ordering::SeqCst) {
            let _ = request.completion.send(Err(SceneError::Cancelled));
            continue;
        }
        let mut slot = DeeplyMutable::empty();
        let settled = match (request.generator)(&mut slot) {
            Ok(()) => Ok(slot),
            Err(error) => {
                log::error!(
                    "scene `{}` encountered a problem while instantiating `{}`: {error}",
                    shared.name,
                    request.type_name
                );
                Err(SceneError::Instantiation(error))
            }
        };
        let _ = request.completion.send(settled);
    }
    log::debug!("scene `{}` instantiation worker stopped", shared.name);
}

/// Materialize one `T` through its pool into `slot`. Runs on the worker
/// thread only; this is the single place a type's pool gets created.
fn instantiate_type_to_slot<T: Spawnable>(
    shared: &SceneShared,
    slot: &mut DeeplyMutable,
) -> Result<(), SpawnError> {
    let pool = {
        let mut pools = lock(&shared.type_pools);
        Arc::clone(pools.entry(TypeId::of::<T>()).or_insert_with(|| {
            Arc::new(ObjectPool::with_generator(|| {
                Ok(DeeplyMutable::new(Arc::new(Mutex::new(T::spawn()?))))
            }))
        }))
    };
    let mut item = pool.get()?;
    slot.adopt(&mut item);
    Ok(())
}

/// Runtime-token variant of [`instantiate_type_to_slot`].
fn instantiate_token_to_slot(
    shared: &SceneShared,
    token: BehaviourType,
    slot: &mut DeeplyMutable,
) -> Result<(), SpawnError> {
    let pool = {
        let mut pools = lock(&shared.type_pools);
        Arc::clone(pools.entry(token.type_id()).or_insert_with(|| {
            let construct = token.construct;
            Arc::new(ObjectPool::with_generator(move || construct()))
        }))
    };
    let mut item = pool.get()?;
    slot.adopt(&mut item);
    Ok(())
}

/// One-shot completion handle for a typed instantiation request.
///
/// Dropping the handle abandons the result; the request itself is still
/// fulfilled by the worker.
pub struct PendingBehaviour<T: Spawnable> {
    settled: Receiver<SettledResult>,
    shared: Arc<SceneShared>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Spawnable> PendingBehaviour<T> {
    /// Whether the worker has settled this request.
    pub fn is_settled(&self) -> bool {
        !self.settled.is_empty()
    }

    /// Block until the worker settles the request, then register the
    /// instance with the scene's trackers.
    pub fn wait(self) -> Result<SharedBehaviour<T>, SceneError> {
        let mut slot = self.settled.recv().map_err(|_| SceneError::Cancelled)??;
        let instance = slot
            .take_downcast::<SharedBehaviour<T>>()
            .ok_or(SceneError::TypeMismatch {
                expected: T::type_name(),
            })?;
        self.shared.track(TrackedInstance::of(&instance));
        Ok(instance)
    }
}

/// One-shot completion handle for a runtime-token instantiation request.
pub struct PendingInstance {
    settled: Receiver<SettledResult>,
    shared: Arc<SceneShared>,
    token: BehaviourType,
}

impl PendingInstance {
    /// Whether the worker has settled this request.
    pub fn is_settled(&self) -> bool {
        !self.settled.is_empty()
    }

    /// Block until the worker settles the request. The materialized instance
    /// comes back boxed; it is also registered with the scene's trackers.
    pub fn wait(self) -> Result<DeeplyMutable, SceneError> {
        let mut slot = self.settled.recv().map_err(|_| SceneError::Cancelled)??;
        match (self.token.as_tracked)(&mut slot) {
            Some(tracked) => self.shared.track(tracked),
            None => log::warn!(
                "instantiated `{}` could not be registered with the scene trackers",
                self.token.type_name()
            ),
        }
        Ok(slot)
    }
}

/// An environment containing a collection of active behaviours, plus the
/// machinery to construct new ones asynchronously.
pub struct Scene {
    /// Scene name, used in logs and errors
    pub name: String,
    /// Index the scene registers under
    pub scene_index: i32,
    shared: Arc<SceneShared>,
    requests: Mutex<Option<Sender<InstantiationRequest>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
    disposed: AtomicBool,
}

impl Scene {
    /// Create a scene and start its instantiation worker.
    pub fn new(name: &str, scene_index: i32) -> Result<Self, SceneError> {
        let (sender, receiver) = unbounded();
        let shared = Arc::new(SceneShared {
            name: name.to_string(),
            type_pools: Mutex::new(HashMap::new()),
            behaviours: Mutex::new(Vec::new()),
            game_objects: Mutex::new(Vec::new()),
            cancelled: AtomicBool::new(false),
        });
        let worker_shared = Arc::clone(&shared);
        let worker = thread::Builder::new()
            .name(format!("scene-worker-{name}"))
            .spawn(move || instantiate_invocations(receiver, worker_shared))
            .map_err(SceneError::WorkerSpawn)?;

        Ok(Self {
            name: name.to_string(),
            scene_index,
            shared,
            requests: Mutex::new(Some(sender)),
            worker: Mutex::new(Some(worker)),
            disposed: AtomicBool::new(false),
        })
    }

    fn push_instantiation(
        &self,
        type_name: &'static str,
        generator: Generator,
    ) -> Result<Receiver<SettledResult>, SceneError> {
        let requests = lock(&self.requests);
        let Some(sender) = requests.as_ref() else {
            return Err(SceneError::Disposed {
                scene: self.name.clone(),
            });
        };
        let (completion, settled) = bounded(1);
        sender
            .send(InstantiationRequest {
                generator,
                completion,
                type_name,
            })
            .map_err(|_| SceneError::Disposed {
                scene: self.name.clone(),
            })?;
        Ok(settled)
    }

    /// Request an instance of `T`, returning a completion handle to await.
    pub fn add_to_scene_async<T: Spawnable>(&self) -> Result<PendingBehaviour<T>, SceneError> {
        let shared = Arc::clone(&self.shared);
        let generator: Generator =
            Box::new(move |slot| instantiate_type_to_slot::<T>(&shared, slot));
        let settled = self.push_instantiation(T::type_name(), generator)?;
        Ok(PendingBehaviour {
            settled,
            shared: Arc::clone(&self.shared),
            _marker: PhantomData,
        })
    }

    /// Request an instance of `T` and block until it is materialized.
    pub fn add_to_scene<T: Spawnable>(&self) -> Result<SharedBehaviour<T>, SceneError> {
        self.add_to_scene_async::<T>()?.wait()
    }

    /// Request `count` instances of `T` at once.
    pub fn add_to_scene_many_async<T: Spawnable>(
        &self,
        count: usize,
    ) -> Result<Vec<PendingBehaviour<T>>, SceneError> {
        (0..count).map(|_| self.add_to_scene_async::<T>()).collect()
    }

    /// Request an instance of the type behind `token`, returning a
    /// completion handle to await.
    pub fn add_to_scene_dynamic_async(
        &self,
        token: &BehaviourType,
    ) -> Result<PendingInstance, SceneError> {
        let shared = Arc::clone(&self.shared);
        let token = *token;
        let generator: Generator =
            Box::new(move |slot| instantiate_token_to_slot(&shared, token, slot));
        let settled = self.push_instantiation(token.type_name(), generator)?;
        Ok(PendingInstance {
            settled,
            shared: Arc::clone(&self.shared),
            token,
        })
    }

    /// Request an instance of the type behind `token` and block until it is
    /// materialized.
    pub fn add_to_scene_dynamic(&self, token: &BehaviourType) -> Result<DeeplyMutable, SceneError> {
        self.add_to_scene_dynamic_async(token)?.wait()
    }

    /// Untrack `behaviour`, run its teardown, and return it to its type's
    /// pool. Logs and returns `false` when the instance is not tracked.
    pub fn remove_from_scene(&self, behaviour: &DynBehaviour) -> bool {
        let target_id = lock(behaviour).state().id();
        let tracked = {
            let mut behaviours = lock(&self.shared.behaviours);
            match behaviours
                .iter()
                .position(|t| lock(&t.behaviour).state().id() == target_id)
            {
                Some(index) => behaviours.remove(index),
                None => {
                    log::warn!(
                        "cannot remove a behaviour that is not contained in scene `{}`",
                        self.name
                    );
                    return false;
                }
            }
        };

        if let Some(game_object) = &tracked.game_object {
            lock(&self.shared.game_objects).retain(|g| !Arc::ptr_eq(g, game_object));
        }
        lock(&tracked.behaviour).destroy();

        let pool = lock(&self.shared.type_pools).get(&tracked.type_id).cloned();
        match pool {
            Some(pool) => pool.return_to_pool(DeeplyMutable::from_boxed(tracked.typed)),
            None => log::warn!(
                "no pool registered for a behaviour removed from scene `{}`; instance dropped",
                self.name
            ),
        }
        true
    }

    /// Untrack and destroy `game_object`. Game objects are derived entities
    /// and are not pooled. Logs and returns `false` when untracked.
    pub fn remove_game_object(&self, game_object: &SharedGameObject) -> bool {
        let mut game_objects = lock(&self.shared.game_objects);
        let Some(index) = game_objects.iter().position(|g| Arc::ptr_eq(g, game_object)) else {
            log::warn!(
                "cannot remove a game object that is not contained in scene `{}`",
                self.name
            );
            return false;
        };
        game_objects.remove(index);
        drop(game_objects);
        lock(game_object).destroy();
        true
    }

    /// Whether `behaviour` is tracked by this scene.
    pub fn contains_behaviour(&self, behaviour: &DynBehaviour) -> bool {
        let target_id = lock(behaviour).state().id();
        lock(&self.shared.behaviours)
            .iter()
            .any(|t| lock(&t.behaviour).state().id() == target_id)
    }

    /// Snapshot of the tracked behaviour handles.
    pub fn behaviours(&self) -> Vec<DynBehaviour> {
        lock(&self.shared.behaviours)
            .iter()
            .map(|t| Arc::clone(&t.behaviour))
            .collect()
    }

    /// Snapshot of the tracked game object handles.
    pub fn game_objects(&self) -> Vec<SharedGameObject> {
        lock(&self.shared.game_objects).iter().map(Arc::clone).collect()
    }

    /// Number of tracked behaviours.
    pub fn behaviour_count(&self) -> usize {
        lock(&self.shared.behaviours).len()
    }

    /// Number of tracked game objects.
    pub fn game_object_count(&self) -> usize {
        lock(&self.shared.game_objects).len()
    }

    /// Whether [`dispose`](Self::dispose) has run.
    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }

    /// Shut the scene down: stop accepting requests, cancel everything still
    /// pending, join the worker, and dispose every type pool. Idempotent.
    pub fn dispose(&self) {
        if self.disposed.swap(true, Ordering::SeqCst) {
            return;
        }
        log::debug!("disposing scene `{}`", self.name);

        // Flag first, then close the channel: the worker drains whatever is
        // still queued as cancelled and exits.
        self.shared.cancelled.store(true, Ordering::SeqCst);
        lock(&self.requests).take();

        let worker = lock(&self.worker).take();
        if let Some(worker) = worker {
            if worker.join().is_err() {
                log::error!("scene `{}` worker panicked during shutdown", self.name);
            }
        }

        for (_, pool) in lock(&self.shared.type_pools).drain() {
            pool.dispose();
        }
        lock(&self.shared.behaviours).clear();
        lock(&self.shared.game_objects).clear();
    }
}

impl Drop for Scene {
    fn drop(&mut self) {
        self.dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::behaviour::BehaviourState;
    use crate::engine::game_object::GameObject;

    struct Ball {
        state: BehaviourState,
        game_object: SharedGameObject,
    }

    impl Behaviour for Ball {
        fn state(&self) -> &BehaviourState {
            &self.state
        }

        fn state_mut(&mut self) -> &mut BehaviourState {
            &mut self.state
        }

        fn game_object(&self) -> Option<&SharedGameObject> {
            Some(&self.game_object)
        }
    }

    impl Spawnable for Ball {
        fn spawn() -> Result<Self, SpawnError> {
            Ok(Self {
                state: BehaviourState::new("Ball"),
                game_object: GameObject::shared("Ball"),
            })
        }

        fn type_name() -> &'static str {
            "Ball"
        }
    }

    #[test]
    fn sync_add_tracks_behaviour_and_game_object() {
        let scene = Scene::new("test", 0).unwrap();
        let ball = scene.add_to_scene::<Ball>().unwrap();

        let dyn_ball: DynBehaviour = ball.clone();
        assert!(scene.contains_behaviour(&dyn_ball));
        assert_eq!(scene.behaviour_count(), 1);
        assert_eq!(scene.game_object_count(), 1);
        scene.dispose();
    }

    #[test]
    fn removed_instance_returns_to_pool_and_is_reused() {
        let scene = Scene::new("test", 0).unwrap();
        let ball = scene.add_to_scene::<Ball>().unwrap();
        let first_ptr = Arc::as_ptr(&ball);

        let dyn_ball: DynBehaviour = ball.clone();
        assert!(scene.remove_from_scene(&dyn_ball));
        assert_eq!(scene.behaviour_count(), 0);
        assert!(lock(&ball).state().is_destroyed());
        drop(dyn_ball);
        drop(ball);

        // The next request pops the pooled instance instead of spawning.
        let recycled = scene.add_to_scene::<Ball>().unwrap();
        assert_eq!(Arc::as_ptr(&recycled), first_ptr);
        scene.dispose();
    }

    #[test]
    fn removing_untracked_behaviour_is_a_noop() {
        let scene = Scene::new("test", 0).unwrap();
        let stray: DynBehaviour = Arc::new(Mutex::new(Ball::spawn().unwrap()));
        assert!(!scene.remove_from_scene(&stray));
        scene.dispose();
    }

    #[test]
    fn dynamic_token_add_materializes_and_tracks() {
        let scene = Scene::new("test", 0).unwrap();
        let token = BehaviourType::of::<Ball>();

        let mut boxed = scene.add_to_scene_dynamic(&token).unwrap();
        assert!(boxed.downcast_ref::<SharedBehaviour<Ball>>().is_some());
        assert_eq!(scene.behaviour_count(), 1);

        let instance = boxed.take_downcast::<SharedBehaviour<Ball>>().unwrap();
        let dyn_instance: DynBehaviour = instance;
        assert!(scene.contains_behaviour(&dyn_instance));
        scene.dispose();
    }

    #[test]
    fn disposed_scene_rejects_requests() {
        let scene = Scene::new("test", 0).unwrap();
        scene.dispose();
        assert!(matches!(
            scene.add_to_scene::<Ball>(),
            Err(SceneError::Disposed { .. })
        ));
    }

    #[test]
    fn dispose_is_idempotent() {
        let scene = Scene::new("test", 0).unwrap();
        let _ = scene.add_to_scene::<Ball>().unwrap();
        scene.dispose();
        scene.dispose();
        assert!(scene.is_disposed());
        assert_eq!(scene.behaviour_count(), 0);
    }

    #[test]
    fn remove_game_object_untracks_and_destroys() {
        let scene = Scene::new("test", 0).unwrap();
        let ball = scene.add_to_scene::<Ball>().unwrap();
        let game_object = lock(&ball).game_object().cloned().unwrap();

        assert!(scene.remove_game_object(&game_object));
        assert_eq!(scene.game_object_count(), 0);
        assert!(lock(&game_object).is_destroyed());
        assert!(!scene.remove_game_object(&game_object));
        scene.dispose();
    }
}
