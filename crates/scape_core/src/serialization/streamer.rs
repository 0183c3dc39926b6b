//! Shared plumbing for the streaming serializers: error codes, file naming
//! and the tag-prefixed wire codec.
//!
//! The wire format is deliberately simple: per member, a little-endian
//! `u32` tag (assigned by the runtime model) followed by a self-describing
//! value (one kind byte, then the payload). Unknown tags decode and are
//! discarded, so adding members stays backward compatible.

use std::io;
use std::path::Path;

use thiserror::Error;

use crate::serialization::model::{MetaType, RuntimeTypeModel};
use crate::serialization::schema::{Reflect, WireValue};

/// Closed error codes surfaced by serialize/deserialize entry points.
/// Streamers never panic and never leak underlying i/o errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Error)]
pub enum SerializationError {
    /// The operation succeeded.
    #[default]
    #[error("no error")]
    None,
    /// The type is not registered in the serialization model.
    #[error("type is not registered in the serialization model")]
    NotSerializable,
    /// Access to the target path was denied.
    #[error("access to the target path was denied")]
    UnauthorizedAccess,
    /// The target path is not valid.
    #[error("the target path is not valid")]
    PathNotValid,
    /// No path was provided.
    #[error("no path was provided")]
    NullPath,
    /// A directory in the target path does not exist.
    #[error("a directory in the target path was not found")]
    DirectoryNotFound,
    /// The operation is not supported on the target.
    #[error("the operation is not supported on the target")]
    NotSupported,
    /// The serialization model was never built.
    #[error("the serialization model is null")]
    ModelNull,
    /// The encoded stream does not decode cleanly.
    #[error("the data stream is malformed")]
    Malformed,
    /// The value graph nests deeper than the model allows.
    #[error("the value graph exceeds the model's maximum depth")]
    MaxDepthExceeded,
    /// Any other i/o failure.
    #[error("an i/o error occurred")]
    Io,
}

/// Map an i/o failure onto the closed error set, logging the original.
pub(crate) fn classify_io_error(path: &Path, error: &io::Error) -> SerializationError {
    log::error!("serialization i/o on `{}` failed: {error}", path.display());
    match error.kind() {
        io::ErrorKind::PermissionDenied => SerializationError::UnauthorizedAccess,
        io::ErrorKind::NotFound => SerializationError::DirectoryNotFound,
        io::ErrorKind::InvalidInput => SerializationError::PathNotValid,
        io::ErrorKind::Unsupported => SerializationError::NotSupported,
        _ => SerializationError::Io,
    }
}

/// `<TypeName><extension>` inside the target directory.
pub(crate) fn file_name(
    type_name: &str,
    compress: bool,
    bin_name: &str,
    compressed_bin_name: &str,
) -> String {
    if compress {
        format!("{type_name}{compressed_bin_name}")
    } else {
        format!("{type_name}{bin_name}")
    }
}

const KIND_BOOL: u8 = 0;
const KIND_I32: u8 = 1;
const KIND_I64: u8 = 2;
const KIND_U32: u8 = 3;
const KIND_U64: u8 = 4;
const KIND_F32: u8 = 5;
const KIND_F64: u8 = 6;
const KIND_STR: u8 = 7;
const KIND_BYTES: u8 = 8;
const KIND_LIST: u8 = 9;

fn encode_value(
    buffer: &mut Vec<u8>,
    value: &WireValue,
    depth: u32,
    max_depth: u32,
) -> Result<(), SerializationError> {
    if depth > max_depth {
        return Err(SerializationError::MaxDepthExceeded);
    }
    match value {
        WireValue::Bool(v) => {
            buffer.push(KIND_BOOL);
            buffer.push(u8::from(*v));
        }
        WireValue::I32(v) => {
            buffer.push(KIND_I32);
            buffer.extend_from_slice(&v.to_le_bytes());
        }
        WireValue::I64(v) => {
            buffer.push(KIND_I64);
            buffer.extend_from_slice(&v.to_le_bytes());
        }
        WireValue::U32(v) => {
            buffer.push(KIND_U32);
            buffer.extend_from_slice(&v.to_le_bytes());
        }
        WireValue::U64(v) => {
            buffer.push(KIND_U64);
            buffer.extend_from_slice(&v.to_le_bytes());
        }
        WireValue::F32(v) => {
            buffer.push(KIND_F32);
            buffer.extend_from_slice(&v.to_le_bytes());
        }
        WireValue::F64(v) => {
            buffer.push(KIND_F64);
            buffer.extend_from_slice(&v.to_le_bytes());
        }
        WireValue::Str(v) => {
            buffer.push(KIND_STR);
            let bytes = v.as_bytes();
            buffer.extend_from_slice(&(bytes.len() as u32).to_le_bytes());
            buffer.extend_from_slice(bytes);
        }
        WireValue::Bytes(v) => {
            buffer.push(KIND_BYTES);
            buffer.extend_from_slice(&(v.len() as u32).to_le_bytes());
            buffer.extend_from_slice(v);
        }
        WireValue::List(items) => {
            buffer.push(KIND_LIST);
            buffer.extend_from_slice(&(items.len() as u32).to_le_bytes());
            for item in items {
                encode_value(buffer, item, depth + 1, max_depth)?;
            }
        }
    }
    Ok(())
}

fn take<'a>(cursor: &mut &'a [u8], len: usize) -> Result<&'a [u8], SerializationError> {
    if cursor.len() < len {
        return Err(SerializationError::Malformed);
    }
    let (head, tail) = cursor.split_at(len);
    *cursor = tail;
    Ok(head)
}

fn read_u8(cursor: &mut &[u8]) -> Result<u8, SerializationError> {
    Ok(take(cursor, 1)?[0])
}

fn read_u32(cursor: &mut &[u8]) -> Result<u32, SerializationError> {
    let bytes = take(cursor, 4)?;
    Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

fn decode_value(
    cursor: &mut &[u8],
    depth: u32,
    max_depth: u32,
) -> Result<WireValue, SerializationError> {
    if depth > max_depth {
        return Err(SerializationError::MaxDepthExceeded);
    }
    let value = match read_u8(cursor)? {
        KIND_BOOL => WireValue::Bool(read_u8(cursor)? != 0),
        KIND_I32 => {
            let bytes = take(cursor, 4)?;
            WireValue::I32(i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
        }
        KIND_I64 => {
            let bytes = take(cursor, 8)?;
            let mut raw = [0_u8; 8];
            raw.copy_from_slice(bytes);
            WireValue::I64(i64::from_le_bytes(raw))
        }
        KIND_U32 => WireValue::U32(read_u32(cursor)?),
        KIND_U64 => {
            let bytes = take(cursor, 8)?;
            let mut raw = [0_u8; 8];
            raw.copy_from_slice(bytes);
            WireValue::U64(u64::from_le_bytes(raw))
        }
        KIND_F32 => {
            let bytes = take(cursor, 4)?;
            WireValue::F32(f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
        }
        KIND_F64 => {
            let bytes = take(cursor, 8)?;
            let mut raw = [0_u8; 8];
            raw.copy_from_slice(bytes);
            WireValue::F64(f64::from_le_bytes(raw))
        }
        KIND_STR => {
            let len = read_u32(cursor)? as usize;
            let bytes = take(cursor, len)?;
            WireValue::Str(
                String::from_utf8(bytes.to_vec()).map_err(|_| SerializationError::Malformed)?,
            )
        }
        KIND_BYTES => {
            let len = read_u32(cursor)? as usize;
            WireValue::Bytes(take(cursor, len)?.to_vec())
        }
        KIND_LIST => {
            let len = read_u32(cursor)? as usize;
            let mut items = Vec::with_capacity(len.min(1024));
            for _ in 0..len {
                items.push(decode_value(cursor, depth + 1, max_depth)?);
            }
            WireValue::List(items)
        }
        _ => return Err(SerializationError::Malformed),
    };
    Ok(value)
}

/// Encode every schematized member of `value` into a payload buffer, in tag
/// order. Members the value cannot currently produce are skipped.
pub(crate) fn encode_record<T: Reflect>(
    model: &RuntimeTypeModel,
    meta: &MetaType,
    value: &T,
) -> Result<Vec<u8>, SerializationError> {
    let mut buffer = Vec::new();
    for member in meta.members() {
        let Some(field) = value.get_field(member.name) else {
            continue;
        };
        buffer.extend_from_slice(&member.tag.to_le_bytes());
        encode_value(&mut buffer, &field, 0, model.max_depth())?;
    }
    Ok(buffer)
}

/// Decode a payload buffer into `target`, member by member. Unknown tags and
/// member mismatches are logged and skipped rather than failing the whole
/// stream.
pub(crate) fn decode_record<T: Reflect>(
    model: &RuntimeTypeModel,
    meta: &MetaType,
    payload: &[u8],
    target: &mut T,
) -> Result<(), SerializationError> {
    let mut cursor = payload;
    while !cursor.is_empty() {
        let tag = read_u32(&mut cursor)?;
        let value = decode_value(&mut cursor, 0, model.max_depth())?;
        match meta.member_by_tag(tag) {
            Some(member) => {
                if let Err(error) = target.set_field(member.name, value) {
                    log::warn!(
                        "could not assign member `{}` of `{}` while deserializing: {error}",
                        member.name,
                        meta.descriptor().type_name
                    );
                }
            }
            None => log::warn!(
                "unknown wire tag {tag} while deserializing `{}`; value discarded",
                meta.descriptor().type_name
            ),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn values_round_trip_through_the_codec() {
        let samples = vec![
            WireValue::Bool(true),
            WireValue::I32(-42),
            WireValue::I64(1 << 40),
            WireValue::U32(7),
            WireValue::U64(u64::MAX),
            WireValue::F32(1.5),
            WireValue::F64(-2.25),
            WireValue::Str("hello".into()),
            WireValue::Bytes(vec![0, 1, 2, 255]),
            WireValue::List(vec![WireValue::F32(3.0), WireValue::Str("x".into())]),
        ];
        for sample in samples {
            let mut buffer = Vec::new();
            encode_value(&mut buffer, &sample, 0, 100).unwrap();
            let mut cursor = buffer.as_slice();
            assert_eq!(decode_value(&mut cursor, 0, 100).unwrap(), sample);
            assert!(cursor.is_empty());
        }
    }

    #[test]
    fn truncated_streams_are_malformed() {
        let mut buffer = Vec::new();
        encode_value(&mut buffer, &WireValue::Str("truncate me".into()), 0, 100).unwrap();
        buffer.truncate(buffer.len() - 3);
        let mut cursor = buffer.as_slice();
        assert_eq!(
            decode_value(&mut cursor, 0, 100),
            Err(SerializationError::Malformed)
        );
    }

    #[test]
    fn nesting_past_max_depth_is_rejected() {
        let mut value = WireValue::I32(0);
        for _ in 0..5 {
            value = WireValue::List(vec![value]);
        }
        let mut buffer = Vec::new();
        assert_eq!(
            encode_value(&mut buffer, &value, 0, 3),
            Err(SerializationError::MaxDepthExceeded)
        );
    }
}
