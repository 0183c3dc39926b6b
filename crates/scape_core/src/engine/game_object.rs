//! Game objects — the entities behaviours attach to.

use std::any::Any;
use std::sync::{Arc, Mutex};

use crate::engine::components::Transform;
use crate::serialization::schema::{
    FieldDescriptor, Reflect, ReflectError, TypeDescriptor, WireKind, WireValue,
};

/// Shared handle to a game object, cloned between a behaviour and the scene
/// that tracks it.
pub type SharedGameObject = Arc<Mutex<GameObject>>;

/// A fundamental entity within a scene. Carries a transform and a free-form
/// tag; behaviours hold a shared handle to theirs.
#[derive(Debug)]
pub struct GameObject {
    /// Display name
    pub name: String,
    /// Free-form grouping tag
    pub tag: String,
    /// Spatial state
    pub transform: Transform,
    active: bool,
    destroyed: bool,
}

impl GameObject {
    /// Create a named game object with an identity transform.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            tag: String::new(),
            transform: Transform::default(),
            active: true,
            destroyed: false,
        }
    }

    /// Create a game object already wrapped in its shared handle.
    pub fn shared(name: &str) -> SharedGameObject {
        Arc::new(Mutex::new(Self::new(name)))
    }

    /// Whether the object currently participates in updates.
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Enable or disable the object.
    pub fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    /// Whether the object has been torn down.
    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// Tear the object down. Idempotent.
    pub fn destroy(&mut self) {
        self.destroyed = true;
        self.active = false;
    }
}

impl Default for GameObject {
    fn default() -> Self {
        Self::new("GameObject")
    }
}

/// Schema entry for [`GameObject`]. The transform is serialized separately.
pub static GAME_OBJECT_DESCRIPTOR: TypeDescriptor = TypeDescriptor {
    type_name: "GameObject",
    base: None,
    is_enum: false,
    fields: &[
        FieldDescriptor {
            name: "name",
            kind: WireKind::Str,
        },
        FieldDescriptor {
            name: "tag",
            kind: WireKind::Str,
        },
    ],
    properties: &[FieldDescriptor {
        name: "active",
        kind: WireKind::Bool,
    }],
};

impl Reflect for GameObject {
    fn descriptor(&self) -> &'static TypeDescriptor {
        &GAME_OBJECT_DESCRIPTOR
    }

    fn get_field(&self, name: &str) -> Option<WireValue> {
        match name {
            "name" => Some(WireValue::Str(self.name.clone())),
            "tag" => Some(WireValue::Str(self.tag.clone())),
            "active" => Some(WireValue::Bool(self.active)),
            _ => None,
        }
    }

    fn set_field(&mut self, name: &str, value: WireValue) -> Result<(), ReflectError> {
        match (name, value) {
            ("name", WireValue::Str(v)) => {
                self.name = v;
                Ok(())
            }
            ("tag", WireValue::Str(v)) => {
                self.tag = v;
                Ok(())
            }
            ("active", WireValue::Bool(v)) => {
                self.active = v;
                Ok(())
            }
            (member @ ("name" | "tag"), other) => Err(ReflectError::KindMismatch {
                type_name: "GameObject",
                member: if member == "name" { "name" } else { "tag" },
                expected: WireKind::Str,
                actual: other.kind(),
            }),
            ("active", other) => Err(ReflectError::KindMismatch {
                type_name: "GameObject",
                member: "active",
                expected: WireKind::Bool,
                actual: other.kind(),
            }),
            (other, _) => Err(ReflectError::NoSuchMember {
                type_name: "GameObject",
                member: other.to_string(),
            }),
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any + Send> {
        self
    }
}
