//! A uniform wrapper around arbitrary runtime values.
//!
//! `DeeplyMutable` substitutes for bare `Box<dyn Any>` in pooling and queue
//! code: a single mutable slot that can be empty, hold an opaque payload, or
//! hold a payload that additionally exposes reflective member access. The
//! wrapper's identity is a unique stamp, deliberately distinct from the
//! payload's identity — two wrappers are never equal by value.

use std::any::Any;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::serialization::schema::{
    FieldDescriptor, Reflect, ReflectError, TypeDescriptor, WireKind, WireValue,
    DEEPLY_MUTABLE_TYPE_NAME,
};

/// Schema entry for the wrapper itself. Its payload is fully erased, so the
/// model factory finalizes the schema on sight of this descriptor instead of
/// numbering members.
pub static DEEPLY_MUTABLE_DESCRIPTOR: TypeDescriptor = TypeDescriptor {
    type_name: DEEPLY_MUTABLE_TYPE_NAME,
    base: None,
    is_enum: false,
    fields: &[FieldDescriptor {
        name: "value",
        kind: WireKind::Opaque,
    }],
    properties: &[],
};

static NEXT_WRAPPER_ID: AtomicU64 = AtomicU64::new(1);

enum Slot {
    Empty,
    Opaque(Box<dyn Any + Send>),
    Reflective(Box<dyn Reflect>),
}

/// A single mutable slot holding an arbitrary value.
pub struct DeeplyMutable {
    id: u64,
    slot: Slot,
}

impl DeeplyMutable {
    fn with_slot(slot: Slot) -> Self {
        Self {
            id: NEXT_WRAPPER_ID.fetch_add(1, Ordering::Relaxed),
            slot,
        }
    }

    /// Create a wrapper with no payload.
    pub fn empty() -> Self {
        Self::with_slot(Slot::Empty)
    }

    /// Wrap `value` without a reflective surface.
    pub fn new<T: Any + Send>(value: T) -> Self {
        Self::with_slot(Slot::Opaque(Box::new(value)))
    }

    /// Wrap an already-boxed opaque payload.
    pub fn from_boxed(value: Box<dyn Any + Send>) -> Self {
        Self::with_slot(Slot::Opaque(value))
    }

    /// Wrap `value`, exposing its [`Reflect`] members through the wrapper.
    pub fn reflective<T: Reflect>(value: T) -> Self {
        Self::with_slot(Slot::Reflective(Box::new(value)))
    }

    /// The wrapper's identity stamp. Unique per wrapper, unrelated to the
    /// payload.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Whether the slot currently holds no payload.
    pub fn is_empty(&self) -> bool {
        matches!(self.slot, Slot::Empty)
    }

    /// Replace the payload with an opaque value.
    pub fn set<T: Any + Send>(&mut self, value: T) {
        self.slot = Slot::Opaque(Box::new(value));
    }

    /// Replace the payload with a reflective value.
    pub fn set_reflective<T: Reflect>(&mut self, value: T) {
        self.slot = Slot::Reflective(Box::new(value));
    }

    /// Drop the payload, leaving the slot empty.
    pub fn clear(&mut self) {
        self.slot = Slot::Empty;
    }

    /// Move the payload out of `other` into this wrapper. Both wrappers keep
    /// their identity stamps; `other` is left empty.
    pub fn adopt(&mut self, other: &mut DeeplyMutable) {
        self.slot = std::mem::replace(&mut other.slot, Slot::Empty);
    }

    /// Borrow the payload as `T`, when the runtime type matches.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        match &self.slot {
            Slot::Empty => None,
            Slot::Opaque(boxed) => boxed.downcast_ref::<T>(),
            Slot::Reflective(boxed) => boxed.as_any().downcast_ref::<T>(),
        }
    }

    /// Mutably borrow the payload as `T`, when the runtime type matches.
    pub fn downcast_mut<T: Any>(&mut self) -> Option<&mut T> {
        match &mut self.slot {
            Slot::Empty => None,
            Slot::Opaque(boxed) => boxed.downcast_mut::<T>(),
            Slot::Reflective(boxed) => boxed.as_any_mut().downcast_mut::<T>(),
        }
    }

    /// Move the payload out as `T`. On a type mismatch the payload stays in
    /// place and `None` is returned.
    pub fn take_downcast<T: Any>(&mut self) -> Option<T> {
        match std::mem::replace(&mut self.slot, Slot::Empty) {
            Slot::Empty => None,
            Slot::Opaque(boxed) => match boxed.downcast::<T>() {
                Ok(value) => Some(*value),
                Err(boxed) => {
                    self.slot = Slot::Opaque(boxed);
                    None
                }
            },
            Slot::Reflective(boxed) => {
                if boxed.as_any().is::<T>() {
                    boxed.into_any().downcast::<T>().ok().map(|value| *value)
                } else {
                    self.slot = Slot::Reflective(boxed);
                    None
                }
            }
        }
    }

    /// Borrow the payload's reflective surface, when it has one.
    pub fn reflect(&self) -> Option<&dyn Reflect> {
        match &self.slot {
            Slot::Reflective(boxed) => Some(boxed.as_ref()),
            _ => None,
        }
    }

    /// Mutably borrow the payload's reflective surface.
    pub fn reflect_mut(&mut self) -> Option<&mut dyn Reflect> {
        match &mut self.slot {
            Slot::Reflective(boxed) => Some(boxed.as_mut()),
            _ => None,
        }
    }

    /// The payload's schema type name, for reflective payloads.
    pub fn type_name(&self) -> Option<&'static str> {
        self.reflect().map(|r| r.descriptor().type_name)
    }

    /// Read a member of the payload by name. Logs and returns `None` when
    /// the payload has no reflective surface.
    pub fn get_field(&self, name: &str) -> Option<WireValue> {
        match self.reflect() {
            Some(reflect) => reflect.get_field(name),
            None => {
                log::warn!(
                    "there was an error while getting member `{name}` from a deeply mutable \
                     value: payload is not reflective"
                );
                None
            }
        }
    }

    /// Write a member of the payload by name.
    pub fn set_field(&mut self, name: &str, value: WireValue) -> Result<(), ReflectError> {
        match self.reflect_mut() {
            Some(reflect) => reflect.set_field(name, value),
            None => {
                log::warn!(
                    "there was an error while setting member `{name}` on a deeply mutable \
                     value: payload is not reflective"
                );
                Err(ReflectError::NotReflective)
            }
        }
    }
}

impl Default for DeeplyMutable {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Debug for DeeplyMutable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let shape = match &self.slot {
            Slot::Empty => "empty",
            Slot::Opaque(_) => "opaque",
            Slot::Reflective(_) => "reflective",
        };
        f.debug_struct("DeeplyMutable")
            .field("id", &self.id)
            .field("slot", &shape)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::any::Any;

    struct Probe {
        hits: i32,
    }

    static PROBE_DESCRIPTOR: TypeDescriptor = TypeDescriptor {
        type_name: "Probe",
        base: None,
        is_enum: false,
        fields: &[FieldDescriptor {
            name: "hits",
            kind: WireKind::I32,
        }],
        properties: &[],
    };

    impl Reflect for Probe {
        fn descriptor(&self) -> &'static TypeDescriptor {
            &PROBE_DESCRIPTOR
        }

        fn get_field(&self, name: &str) -> Option<WireValue> {
            match name {
                "hits" => Some(WireValue::I32(self.hits)),
                _ => None,
            }
        }

        fn set_field(&mut self, name: &str, value: WireValue) -> Result<(), ReflectError> {
            match (name, value) {
                ("hits", WireValue::I32(v)) => {
                    self.hits = v;
                    Ok(())
                }
                ("hits", other) => Err(ReflectError::KindMismatch {
                    type_name: "Probe",
                    member: "hits",
                    expected: WireKind::I32,
                    actual: other.kind(),
                }),
                (other, _) => Err(ReflectError::NoSuchMember {
                    type_name: "Probe",
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

    #[test]
    fn wrapper_identity_is_unique() {
        let a = DeeplyMutable::new(1_i32);
        let b = DeeplyMutable::new(1_i32);
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn set_get_and_downcast() {
        let mut wrapper = DeeplyMutable::empty();
        assert!(wrapper.is_empty());

        wrapper.set(41_i32);
        assert_eq!(wrapper.downcast_ref::<i32>(), Some(&41));
        *wrapper.downcast_mut::<i32>().unwrap() += 1;
        assert_eq!(wrapper.take_downcast::<i32>(), Some(42));
        assert!(wrapper.is_empty());
    }

    #[test]
    fn failed_take_keeps_payload() {
        let mut wrapper = DeeplyMutable::new(7_u8);
        assert_eq!(wrapper.take_downcast::<String>(), None);
        assert_eq!(wrapper.downcast_ref::<u8>(), Some(&7));
    }

    #[test]
    fn adopt_moves_payload_between_wrappers() {
        let mut source = DeeplyMutable::new("payload".to_string());
        let mut target = DeeplyMutable::empty();
        let target_id = target.id();

        target.adopt(&mut source);
        assert!(source.is_empty());
        assert_eq!(target.id(), target_id);
        assert_eq!(target.downcast_ref::<String>().map(String::as_str), Some("payload"));
    }

    #[test]
    fn reflective_member_access() {
        let mut wrapper = DeeplyMutable::reflective(Probe { hits: 3 });
        assert_eq!(wrapper.type_name(), Some("Probe"));
        assert_eq!(wrapper.get_field("hits"), Some(WireValue::I32(3)));

        wrapper.set_field("hits", WireValue::I32(9)).unwrap();
        assert_eq!(wrapper.downcast_ref::<Probe>().unwrap().hits, 9);

        let err = wrapper.set_field("hits", WireValue::Bool(true)).unwrap_err();
        assert!(matches!(err, ReflectError::KindMismatch { .. }));
    }

    #[test]
    fn opaque_payload_has_no_reflective_surface() {
        let mut wrapper = DeeplyMutable::new(5_i32);
        assert!(wrapper.get_field("anything").is_none());
        assert!(matches!(
            wrapper.set_field("anything", WireValue::I32(0)),
            Err(ReflectError::NotReflective)
        ));
    }

    #[test]
    fn reflective_payload_can_be_taken_typed() {
        let mut wrapper = DeeplyMutable::reflective(Probe { hits: 1 });
        let probe = wrapper.take_downcast::<Probe>().unwrap();
        assert_eq!(probe.hits, 1);
        assert!(wrapper.is_empty());
    }
}
