//! Runtime serialization
//!
//! Explicit type descriptors feed a [`RuntimeModelFactory`] that assigns
//! wire field numbers and subtype tags; [`ScapeCoreSerializer`] and
//! [`ScapeCoreDeserializer`] stream schematized values against the compiled
//! model, optionally gzip-compressed. [`SerializationContext`] bundles the
//! three behind one object with an explicit lifecycle.

pub mod schema;

mod deserializer;
mod manager;
mod model;
mod serializer;
mod streamer;

pub use deserializer::{DeserializationOutput, ScapeCoreDeserializer};
pub use manager::{SerializationContext, ENGINE_TYPE_MANIFEST};
pub use model::{
    ChangeModelError, ChangeModelOutput, MetaType, RuntimeModelFactory, RuntimeTypeModel, SubType,
    WireMember, FIELD_WIRE_INDEX, SUBTYPE_WIRE_INDEX,
};
pub use serializer::{ScapeCoreSerializer, SerializationOutput};
pub use streamer::SerializationError;
