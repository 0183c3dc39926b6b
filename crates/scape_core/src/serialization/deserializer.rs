//! The default deserializer: decodes payloads produced by
//! [`ScapeCoreSerializer`] and hands the reconstructed value back inside a
//! [`DeeplyMutable`] wrapper.
//!
//! [`ScapeCoreSerializer`]: crate::serialization::ScapeCoreSerializer

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;

use crate::dynamic::DeeplyMutable;
use crate::serialization::model::RuntimeTypeModel;
use crate::serialization::schema::Reflect;
use crate::serialization::streamer::{
    classify_io_error, decode_record, file_name, SerializationError,
};

/// Result record of one deserialization. `error` is
/// [`SerializationError::None`] on success and `output` then carries the
/// reconstructed value.
#[derive(Debug)]
pub struct DeserializationOutput {
    /// Name of the requested type
    pub type_name: &'static str,
    /// Error code for the operation
    pub error: SerializationError,
    /// The reconstructed value; empty on failure
    pub output: DeeplyMutable,
    /// Source path for path-based deserialization, empty otherwise
    pub path: PathBuf,
    /// Whether the input was gzip-decompressed
    pub decompressed: bool,
}

impl DeserializationOutput {
    fn failure(
        type_name: &'static str,
        error: SerializationError,
        path: PathBuf,
        decompressed: bool,
    ) -> Self {
        Self {
            type_name,
            error,
            output: DeeplyMutable::empty(),
            path,
            decompressed,
        }
    }

    /// Whether the operation succeeded.
    pub fn is_ok(&self) -> bool {
        self.error == SerializationError::None
    }
}

/// Streaming deserializer over a compiled [`RuntimeTypeModel`].
pub struct ScapeCoreDeserializer {
    size: usize,
    bin_name: String,
    compressed_bin_name: String,
}

impl ScapeCoreDeserializer {
    /// Create a deserializer with the given gzip buffer size and file
    /// extensions.
    pub fn new(gzip_buffer_size: usize, bin_name: &str, compressed_bin_name: &str) -> Self {
        Self {
            size: gzip_buffer_size,
            bin_name: bin_name.to_string(),
            compressed_bin_name: compressed_bin_name.to_string(),
        }
    }

    fn decompress_payload(&self, data: &[u8]) -> Result<Vec<u8>, SerializationError> {
        let mut reader = BufReader::with_capacity(self.size, GzDecoder::new(data));
        let mut payload = Vec::new();
        reader
            .read_to_end(&mut payload)
            .map_err(|_| SerializationError::Malformed)?;
        Ok(payload)
    }

    fn decode<T: Reflect + Default>(
        &self,
        model: Option<&RuntimeTypeModel>,
        data: &[u8],
        decompress: bool,
    ) -> Result<T, SerializationError> {
        let Some(model) = model else {
            log::warn!("deserialization failed: the serialization model is null");
            return Err(SerializationError::ModelNull);
        };
        let mut value = T::default();
        let type_name = value.descriptor().type_name;
        let Some(meta) = model.get(type_name) else {
            log::error!("type `{type_name}` can't be deserialized");
            return Err(SerializationError::NotSerializable);
        };
        let decompressed;
        let payload = if decompress {
            decompressed = self.decompress_payload(data)?;
            decompressed.as_slice()
        } else {
            data
        };
        decode_record(model, meta, payload, &mut value)?;
        Ok(value)
    }

    /// Deserialize a `T` from an in-memory payload.
    pub fn deserialize<T: Reflect + Default>(
        &self,
        model: Option<&RuntimeTypeModel>,
        data: &[u8],
        decompress: bool,
    ) -> DeserializationOutput {
        let type_name = T::default().descriptor().type_name;
        match self.decode::<T>(model, data, decompress) {
            Ok(value) => {
                log::trace!("deserialized type `{type_name}`");
                DeserializationOutput {
                    type_name,
                    error: SerializationError::None,
                    output: DeeplyMutable::reflective(value),
                    path: PathBuf::new(),
                    decompressed: decompress,
                }
            }
            Err(error) => {
                DeserializationOutput::failure(type_name, error, PathBuf::new(), decompress)
            }
        }
    }

    /// Deserialize a `T` from `<TypeName><extension>` inside `path`.
    pub fn deserialize_from_path<T: Reflect + Default>(
        &self,
        model: Option<&RuntimeTypeModel>,
        path: &Path,
        decompress: bool,
    ) -> DeserializationOutput {
        let type_name = T::default().descriptor().type_name;
        if path.as_os_str().is_empty() {
            return DeserializationOutput::failure(
                type_name,
                SerializationError::NullPath,
                PathBuf::new(),
                decompress,
            );
        }
        let full_path = path.join(file_name(
            type_name,
            decompress,
            &self.bin_name,
            &self.compressed_bin_name,
        ));
        let mut data = Vec::new();
        let read = File::open(&full_path).and_then(|file| {
            let mut reader = BufReader::with_capacity(self.size, file);
            reader.read_to_end(&mut data)
        });
        if let Err(error) = read {
            return DeserializationOutput::failure(
                type_name,
                classify_io_error(&full_path, &error),
                full_path,
                decompress,
            );
        }
        match self.decode::<T>(model, &data, decompress) {
            Ok(value) => {
                log::trace!(
                    "deserialized type `{type_name}` from `{}`",
                    full_path.display()
                );
                DeserializationOutput {
                    type_name,
                    error: SerializationError::None,
                    output: DeeplyMutable::reflective(value),
                    path: full_path,
                    decompressed: decompress,
                }
            }
            Err(error) => {
                DeserializationOutput::failure(type_name, error, full_path, decompress)
            }
        }
    }
}
