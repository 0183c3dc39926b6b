//! Serialization context — the explicit object that owns the model factory
//! and both streamers.
//!
//! Engine types are registered from one fixed manifest, base types before
//! derived ones, so the order-dependent subtype tags come out identical on
//! every run. User types are appended afterwards via
//! [`SerializationContext::add_type`].

use std::path::Path;

use crate::dynamic::DEEPLY_MUTABLE_DESCRIPTOR;
use crate::engine::components::TRANSFORM_DESCRIPTOR;
use crate::engine::game_object::GAME_OBJECT_DESCRIPTOR;
use crate::serialization::deserializer::{DeserializationOutput, ScapeCoreDeserializer};
use crate::serialization::model::{ChangeModelOutput, RuntimeModelFactory, RuntimeTypeModel};
use crate::serialization::schema::{Reflect, TypeDescriptor};
use crate::serialization::serializer::{ScapeCoreSerializer, SerializationOutput};
use crate::settings::SerializationSettings;

/// The engine's built-in serializable types, in their fixed registration
/// order. Keep base types ahead of any type that names them as `base`.
pub static ENGINE_TYPE_MANIFEST: &[&TypeDescriptor] = &[
    &DEEPLY_MUTABLE_DESCRIPTOR,
    &TRANSFORM_DESCRIPTOR,
    &GAME_OBJECT_DESCRIPTOR,
];

/// Owns the runtime model and the streaming serializers built over it.
pub struct SerializationContext {
    factory: RuntimeModelFactory,
    serializer: ScapeCoreSerializer,
    deserializer: ScapeCoreDeserializer,
}

impl SerializationContext {
    /// Build a context registering `types` in the given order.
    pub fn new(types: &[&'static TypeDescriptor], settings: &SerializationSettings) -> Self {
        Self {
            factory: RuntimeModelFactory::new(types),
            serializer: ScapeCoreSerializer::new(
                settings.gzip_buffer_size,
                &settings.binary_extension,
                &settings.compressed_extension,
            ),
            deserializer: ScapeCoreDeserializer::new(
                settings.gzip_buffer_size,
                &settings.binary_extension,
                &settings.compressed_extension,
            ),
        }
    }

    /// Build a context preloaded with [`ENGINE_TYPE_MANIFEST`].
    pub fn with_engine_types(settings: &SerializationSettings) -> Self {
        Self::new(ENGINE_TYPE_MANIFEST, settings)
    }

    /// The active model, when one has been built.
    pub fn model(&self) -> Option<&RuntimeTypeModel> {
        self.factory.model()
    }

    /// Whether `type_name` is registered in the active model.
    pub fn can_serialize(&self, type_name: &str) -> bool {
        self.factory
            .model()
            .is_some_and(|model| model.can_serialize(type_name))
    }

    /// Register a user-defined type after construction.
    pub fn add_type(&mut self, descriptor: &'static TypeDescriptor) {
        self.factory.add_type(descriptor);
    }

    /// Swap the active model. See
    /// [`RuntimeModelFactory::change_model`].
    pub fn change_model(&mut self, model: Option<RuntimeTypeModel>) -> ChangeModelOutput {
        self.factory.change_model(model)
    }

    /// Serialize `value` into memory.
    pub fn serialize<T: Reflect>(&self, value: &T, compress: bool) -> SerializationOutput {
        self.serializer.serialize(self.factory.model(), value, compress)
    }

    /// Serialize `value` into its type's file inside `path`.
    pub fn serialize_to_path<T: Reflect>(
        &self,
        value: &T,
        path: &Path,
        compress: bool,
    ) -> SerializationOutput {
        self.serializer
            .serialize_to_path(self.factory.model(), value, path, compress)
    }

    /// Deserialize a `T` from an in-memory payload.
    pub fn deserialize<T: Reflect + Default>(
        &self,
        data: &[u8],
        decompress: bool,
    ) -> DeserializationOutput {
        self.deserializer
            .deserialize::<T>(self.factory.model(), data, decompress)
    }

    /// Deserialize a `T` from its type's file inside `path`.
    pub fn deserialize_from_path<T: Reflect + Default>(
        &self,
        path: &Path,
        decompress: bool,
    ) -> DeserializationOutput {
        self.deserializer
            .deserialize_from_path::<T>(self.factory.model(), path, decompress)
    }

    /// Deserialize a `T` and unwrap the boxed result, when the payload
    /// decoded cleanly.
    pub fn deserialize_value<T: Reflect + Default>(
        &self,
        data: &[u8],
        decompress: bool,
    ) -> Option<T> {
        let mut output = self.deserialize::<T>(data, decompress);
        if !output.is_ok() {
            return None;
        }
        output.output.take_downcast::<T>()
    }
}
