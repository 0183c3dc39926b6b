//! Attachable behaviour units and the type tokens scenes spawn them from.
//!
//! A behaviour is a unit of logic/state tracked by a scene. Concrete
//! behaviours embed a [`BehaviourState`] and implement [`Behaviour`];
//! pool-spawnable ones additionally implement [`Spawnable`] so scenes can
//! construct them on the worker thread. [`BehaviourType`] erases a
//! `Spawnable` implementation into a runtime token, standing in for a
//! runtime type handle on the dynamic instantiation path.

use std::any::{Any, TypeId};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use crate::dynamic::{DeeplyMutable, SpawnError};
use crate::engine::events::{StartBatchEvent, UpdateBatchEvent};
use crate::engine::game_object::SharedGameObject;
use crate::foundation::sync::lock;

static NEXT_BEHAVIOUR_ID: AtomicU64 = AtomicU64::new(1);

/// Shared handle to a concrete behaviour.
pub type SharedBehaviour<T> = Arc<Mutex<T>>;

/// Shared handle to a type-erased behaviour, as tracked by scenes.
pub type DynBehaviour = Arc<Mutex<dyn Behaviour>>;

/// Identity and lifecycle flags embedded by every behaviour.
#[derive(Debug)]
pub struct BehaviourState {
    id: u64,
    name: String,
    active: bool,
    destroyed: bool,
    started: bool,
}

impl BehaviourState {
    /// Create a fresh state with a unique id.
    pub fn new(name: &str) -> Self {
        Self {
            id: NEXT_BEHAVIOUR_ID.fetch_add(1, Ordering::Relaxed),
            name: name.to_string(),
            active: true,
            destroyed: false,
            started: false,
        }
    }

    /// Unique behaviour id.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Behaviour name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the behaviour participates in updates.
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Enable or disable the behaviour.
    pub fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    /// Whether teardown has run.
    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// Whether the start hook already ran.
    pub fn has_started(&self) -> bool {
        self.started
    }

    pub(crate) fn mark_started(&mut self) {
        self.started = true;
    }

    pub(crate) fn mark_destroyed(&mut self) {
        self.destroyed = true;
        self.active = false;
    }
}

/// A unit of attachable logic/state whose lifecycle scenes manage.
pub trait Behaviour: Send + 'static {
    /// Borrow the embedded lifecycle state.
    fn state(&self) -> &BehaviourState;

    /// Mutably borrow the embedded lifecycle state.
    fn state_mut(&mut self) -> &mut BehaviourState;

    /// The game object this behaviour is attached to, if any.
    fn game_object(&self) -> Option<&SharedGameObject> {
        None
    }

    /// Teardown hook invoked once when the behaviour is destroyed.
    fn on_destroy(&mut self) {}

    /// Destroy the behaviour and its game object. Idempotent.
    fn destroy(&mut self) {
        if self.state().is_destroyed() {
            return;
        }
        self.on_destroy();
        self.state_mut().mark_destroyed();
        if let Some(game_object) = self.game_object().cloned() {
            lock(&game_object).destroy();
        }
    }
}

/// Behaviours driven by the host loop's start/update batches.
pub trait UpdateBehaviour: Behaviour {
    /// Invoked once, on the first start batch after the behaviour is live.
    fn start(&mut self, event: &StartBatchEvent);

    /// Invoked every update batch while the behaviour is active.
    fn update(&mut self, event: &UpdateBatchEvent);
}

/// Behaviours a scene can construct through its per-type pool.
pub trait Spawnable: Behaviour + Sized {
    /// Construct a fresh instance. Failures are reported, never panicked.
    fn spawn() -> Result<Self, SpawnError>;

    /// Display name used in logs and errors.
    fn type_name() -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// A behaviour instance as tracked by a scene: the erased handle for
/// identity and teardown, the typed handle for repooling, and the derived
/// game object.
pub struct TrackedInstance {
    pub(crate) behaviour: DynBehaviour,
    pub(crate) typed: Box<dyn Any + Send>,
    pub(crate) type_id: TypeId,
    pub(crate) game_object: Option<SharedGameObject>,
}

impl TrackedInstance {
    /// Track `instance`, capturing its concrete type for later repooling.
    pub fn of<T: Behaviour>(instance: &SharedBehaviour<T>) -> Self {
        let behaviour: DynBehaviour = instance.clone();
        let game_object = lock(instance).game_object().cloned();
        Self {
            behaviour,
            typed: Box::new(Arc::clone(instance)),
            type_id: TypeId::of::<T>(),
            game_object,
        }
    }

    /// The erased behaviour handle.
    pub fn behaviour(&self) -> &DynBehaviour {
        &self.behaviour
    }

    /// The concrete type this instance was spawned as.
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }
}

fn construct_erased<T: Spawnable>() -> Result<DeeplyMutable, SpawnError> {
    Ok(DeeplyMutable::new(Arc::new(Mutex::new(T::spawn()?))))
}

fn tracked_erased<T: Spawnable>(slot: &mut DeeplyMutable) -> Option<TrackedInstance> {
    slot.downcast_ref::<SharedBehaviour<T>>().map(TrackedInstance::of)
}

/// Runtime token for a spawnable behaviour type.
///
/// Carries the constructor and tracker for one concrete type, letting
/// callers request instantiation with a value instead of a type parameter.
#[derive(Clone, Copy)]
pub struct BehaviourType {
    type_id: TypeId,
    type_name: &'static str,
    pub(crate) construct: fn() -> Result<DeeplyMutable, SpawnError>,
    pub(crate) as_tracked: fn(&mut DeeplyMutable) -> Option<TrackedInstance>,
}

impl BehaviourType {
    /// The token for behaviour type `T`.
    pub fn of<T: Spawnable>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: T::type_name(),
            construct: construct_erased::<T>,
            as_tracked: tracked_erased::<T>,
        }
    }

    /// Runtime type id of the underlying behaviour type.
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Display name of the underlying behaviour type.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

impl std::fmt::Debug for BehaviourType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BehaviourType")
            .field("type_name", &self.type_name)
            .finish()
    }
}
