//! The default serializer: encodes schematized values against the runtime
//! model, optionally gzip-compressed, to memory or to a file per type.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use flate2::write::GzEncoder;
use flate2::Compression;

use crate::serialization::model::RuntimeTypeModel;
use crate::serialization::schema::Reflect;
use crate::serialization::streamer::{
    classify_io_error, encode_record, file_name, SerializationError,
};

/// Result record of one serialization. `error` is
/// [`SerializationError::None`] on success.
#[derive(Debug)]
pub struct SerializationOutput {
    /// Error code for the operation
    pub error: SerializationError,
    /// The bytes produced (compressed bytes when compression was requested)
    pub data: Option<Vec<u8>>,
    /// Size of the encoded payload before compression, in bytes
    pub size: u64,
    /// Target path for path-based serialization, empty otherwise
    pub path: PathBuf,
    /// Whether the output was gzip-compressed
    pub compressed: bool,
}

impl SerializationOutput {
    fn failure(error: SerializationError, path: PathBuf, compressed: bool) -> Self {
        Self {
            error,
            data: None,
            size: 0,
            path,
            compressed,
        }
    }

    /// Whether the operation succeeded.
    pub fn is_ok(&self) -> bool {
        self.error == SerializationError::None
    }
}

/// Streaming serializer over a compiled [`RuntimeTypeModel`].
pub struct ScapeCoreSerializer {
    size: usize,
    bin_name: String,
    compressed_bin_name: String,
}

impl ScapeCoreSerializer {
    /// Create a serializer with the given gzip buffer size and file
    /// extensions.
    pub fn new(gzip_buffer_size: usize, bin_name: &str, compressed_bin_name: &str) -> Self {
        Self {
            size: gzip_buffer_size,
            bin_name: bin_name.to_string(),
            compressed_bin_name: compressed_bin_name.to_string(),
        }
    }

    fn encode<T: Reflect>(
        model: Option<&RuntimeTypeModel>,
        value: &T,
    ) -> Result<Vec<u8>, SerializationError> {
        let Some(model) = model else {
            log::warn!("serialization failed: the serialization model is null");
            return Err(SerializationError::ModelNull);
        };
        let type_name = value.descriptor().type_name;
        let Some(meta) = model.get(type_name) else {
            log::error!("type `{type_name}` can't be serialized");
            return Err(SerializationError::NotSerializable);
        };
        encode_record(model, meta, value)
    }

    fn compress_payload(&self, payload: &[u8]) -> Result<Vec<u8>, SerializationError> {
        let encoder = GzEncoder::new(Vec::new(), Compression::default());
        let mut writer = BufWriter::with_capacity(self.size, encoder);
        if writer.write_all(payload).is_err() {
            return Err(SerializationError::Io);
        }
        match writer.into_inner() {
            Ok(encoder) => encoder.finish().map_err(|_| SerializationError::Io),
            Err(_) => Err(SerializationError::Io),
        }
    }

    /// Serialize `value` into memory.
    pub fn serialize<T: Reflect>(
        &self,
        model: Option<&RuntimeTypeModel>,
        value: &T,
        compress: bool,
    ) -> SerializationOutput {
        let payload = match Self::encode(model, value) {
            Ok(payload) => payload,
            Err(error) => return SerializationOutput::failure(error, PathBuf::new(), compress),
        };
        let size = payload.len() as u64;
        let data = if compress {
            match self.compress_payload(&payload) {
                Ok(compressed) => compressed,
                Err(error) => {
                    return SerializationOutput::failure(error, PathBuf::new(), compress)
                }
            }
        } else {
            payload
        };
        log::debug!(
            "serialized {size} bytes from `{}`",
            value.descriptor().type_name
        );
        SerializationOutput {
            error: SerializationError::None,
            data: Some(data),
            size,
            path: PathBuf::new(),
            compressed: compress,
        }
    }

    /// Serialize `value` into `<TypeName><extension>` inside `path`.
    pub fn serialize_to_path<T: Reflect>(
        &self,
        model: Option<&RuntimeTypeModel>,
        value: &T,
        path: &Path,
        compress: bool,
    ) -> SerializationOutput {
        if path.as_os_str().is_empty() {
            return SerializationOutput::failure(
                SerializationError::NullPath,
                PathBuf::new(),
                compress,
            );
        }
        let output = self.serialize(model, value, compress);
        if !output.is_ok() {
            return SerializationOutput::failure(output.error, path.to_path_buf(), compress);
        }

        let full_path = path.join(file_name(
            value.descriptor().type_name,
            compress,
            &self.bin_name,
            &self.compressed_bin_name,
        ));
        let data = output.data.unwrap_or_default();
        let result = File::create(&full_path).and_then(|file| {
            let mut writer = BufWriter::with_capacity(self.size, file);
            writer.write_all(&data)?;
            writer.flush()
        });
        if let Err(error) = result {
            return SerializationOutput::failure(
                classify_io_error(&full_path, &error),
                full_path,
                compress,
            );
        }
        log::debug!(
            "serialized {} bytes from `{}` into `{}`",
            output.size,
            value.descriptor().type_name,
            full_path.display()
        );
        SerializationOutput {
            error: SerializationError::None,
            data: Some(data),
            size: output.size,
            path: full_path,
            compressed: compress,
        }
    }
}
