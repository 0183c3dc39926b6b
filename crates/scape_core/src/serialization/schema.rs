//! Schema descriptions for the runtime serialization model.
//!
//! The serializer needs stable integer field tags rather than names. Instead
//! of runtime reflection, every serializable type carries a static
//! [`TypeDescriptor`] listing its declared fields and then its public
//! properties, in declaration order, and implements [`Reflect`] for
//! name-based access to those members. [`RuntimeModelFactory`] walks the
//! descriptors once at startup and turns them into wire numbering.
//!
//! [`RuntimeModelFactory`]: crate::serialization::RuntimeModelFactory

use std::any::Any;

use thiserror::Error;

/// Type name reserved for the type-erased wrapper. Types with this name (or
/// directly based on it) carry a dynamic payload that cannot be statically
/// schematized, and the model factory special-cases them.
pub const DEEPLY_MUTABLE_TYPE_NAME: &str = "DeeplyMutable";

/// Static member kinds used by [`TypeDescriptor`] entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireKind {
    /// Boolean flag
    Bool,
    /// Signed 32-bit integer
    I32,
    /// Signed 64-bit integer
    I64,
    /// Unsigned 32-bit integer
    U32,
    /// Unsigned 64-bit integer
    U64,
    /// 32-bit float
    F32,
    /// 64-bit float
    F64,
    /// UTF-8 string
    Str,
    /// Raw byte buffer
    Bytes,
    /// Homogeneous or mixed list of wire values
    List,
    /// Fully type-erased payload (`Box<dyn Any>` and friends). Cannot be
    /// schematized; the model factory skips such members with a warning.
    Opaque,
}

/// Runtime value for one schematized member.
#[derive(Debug, Clone, PartialEq)]
pub enum WireValue {
    /// Boolean flag
    Bool(bool),
    /// Signed 32-bit integer
    I32(i32),
    /// Signed 64-bit integer
    I64(i64),
    /// Unsigned 32-bit integer
    U32(u32),
    /// Unsigned 64-bit integer
    U64(u64),
    /// 32-bit float
    F32(f32),
    /// 64-bit float
    F64(f64),
    /// UTF-8 string
    Str(String),
    /// Raw byte buffer
    Bytes(Vec<u8>),
    /// List of wire values
    List(Vec<WireValue>),
}

impl WireValue {
    /// The static kind this value encodes as.
    pub fn kind(&self) -> WireKind {
        match self {
            Self::Bool(_) => WireKind::Bool,
            Self::I32(_) => WireKind::I32,
            Self::I64(_) => WireKind::I64,
            Self::U32(_) => WireKind::U32,
            Self::U64(_) => WireKind::U64,
            Self::F32(_) => WireKind::F32,
            Self::F64(_) => WireKind::F64,
            Self::Str(_) => WireKind::Str,
            Self::Bytes(_) => WireKind::Bytes,
            Self::List(_) => WireKind::List,
        }
    }
}

/// One declared field or public property of a serializable type.
#[derive(Debug, Clone, Copy)]
pub struct FieldDescriptor {
    /// Member name, unique within the owning type
    pub name: &'static str,
    /// Member kind on the wire
    pub kind: WireKind,
}

/// Static description of a serializable type.
///
/// Declaration order matters: the model factory numbers `fields` first and
/// `properties` second, with one shared counter per type.
#[derive(Debug, Clone, Copy)]
pub struct TypeDescriptor {
    /// Unique type name used as the schema key
    pub type_name: &'static str,
    /// Name of the base type, when this type is a subtype of another
    /// registered type
    pub base: Option<&'static str>,
    /// Enumerations receive no member numbering
    pub is_enum: bool,
    /// Declared fields, in declaration order
    pub fields: &'static [FieldDescriptor],
    /// Public properties, in declaration order
    pub properties: &'static [FieldDescriptor],
}

/// Errors surfaced by name-based member access on [`Reflect`] values.
#[derive(Debug, Clone, Error)]
pub enum ReflectError {
    /// The named member is not part of the type's descriptor.
    #[error("type `{type_name}` has no member named `{member}`")]
    NoSuchMember {
        /// Owning type
        type_name: &'static str,
        /// Requested member name
        member: String,
    },
    /// A value of the wrong kind was assigned to a member.
    #[error("member `{member}` of `{type_name}` expects {expected:?}, got {actual:?}")]
    KindMismatch {
        /// Owning type
        type_name: &'static str,
        /// Assigned member name
        member: &'static str,
        /// Kind declared by the descriptor
        expected: WireKind,
        /// Kind of the rejected value
        actual: WireKind,
    },
    /// The target value carries no reflective surface at all.
    #[error("value does not expose reflective member access")]
    NotReflective,
}

/// Name-based member access for schematized types.
///
/// Implementations are the explicit stand-in for reflection: `get_field`
/// and `set_field` must cover exactly the members listed by the type's
/// [`TypeDescriptor`].
pub trait Reflect: Any + Send {
    /// The static descriptor for this type.
    fn descriptor(&self) -> &'static TypeDescriptor;

    /// Read one member by name. `None` when the member is unknown or
    /// currently unreadable.
    fn get_field(&self, name: &str) -> Option<WireValue>;

    /// Write one member by name.
    fn set_field(&mut self, name: &str, value: WireValue) -> Result<(), ReflectError>;

    /// Upcast to [`Any`] for runtime type checks.
    fn as_any(&self) -> &dyn Any;

    /// Mutable upcast to [`Any`].
    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// Consume the box, yielding the payload for typed extraction.
    fn into_any(self: Box<Self>) -> Box<dyn Any + Send>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_value_reports_its_kind() {
        assert_eq!(WireValue::I32(7).kind(), WireKind::I32);
        assert_eq!(WireValue::Str("x".into()).kind(), WireKind::Str);
        assert_eq!(WireValue::List(vec![]).kind(), WireKind::List);
    }
}
