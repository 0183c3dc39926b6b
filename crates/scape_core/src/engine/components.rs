//! Spatial components attached to game objects.

use std::any::Any;

use nalgebra::Vector2;

use crate::serialization::schema::{
    FieldDescriptor, Reflect, ReflectError, TypeDescriptor, WireKind, WireValue,
};

/// 2D position, rotation and scale of a game object.
#[derive(Debug, Clone, PartialEq)]
pub struct Transform {
    /// World position
    pub position: Vector2<f32>,
    /// Rotation in radians
    pub rotation: f32,
    /// Axis scale factors
    pub scale: Vector2<f32>,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vector2::zeros(),
            rotation: 0.0,
            scale: Vector2::new(1.0, 1.0),
        }
    }
}

impl Transform {
    /// Translate the position by `delta`.
    pub fn translate(&mut self, delta: Vector2<f32>) {
        self.position += delta;
    }
}

/// Schema entry for [`Transform`].
pub static TRANSFORM_DESCRIPTOR: TypeDescriptor = TypeDescriptor {
    type_name: "Transform",
    base: None,
    is_enum: false,
    fields: &[
        FieldDescriptor {
            name: "position",
            kind: WireKind::List,
        },
        FieldDescriptor {
            name: "rotation",
            kind: WireKind::F32,
        },
        FieldDescriptor {
            name: "scale",
            kind: WireKind::List,
        },
    ],
    properties: &[],
};

fn vector_to_wire(vector: &Vector2<f32>) -> WireValue {
    WireValue::List(vec![WireValue::F32(vector.x), WireValue::F32(vector.y)])
}

fn vector_from_wire(member: &'static str, value: WireValue) -> Result<Vector2<f32>, ReflectError> {
    let mismatch = |actual: WireKind| ReflectError::KindMismatch {
        type_name: "Transform",
        member,
        expected: WireKind::List,
        actual,
    };
    match value {
        WireValue::List(items) => match items.as_slice() {
            [WireValue::F32(x), WireValue::F32(y)] => Ok(Vector2::new(*x, *y)),
            _ => Err(mismatch(WireKind::List)),
        },
        other => Err(mismatch(other.kind())),
    }
}

impl Reflect for Transform {
    fn descriptor(&self) -> &'static TypeDescriptor {
        &TRANSFORM_DESCRIPTOR
    }

    fn get_field(&self, name: &str) -> Option<WireValue> {
        match name {
            "position" => Some(vector_to_wire(&self.position)),
            "rotation" => Some(WireValue::F32(self.rotation)),
            "scale" => Some(vector_to_wire(&self.scale)),
            _ => None,
        }
    }

    fn set_field(&mut self, name: &str, value: WireValue) -> Result<(), ReflectError> {
        match name {
            "position" => {
                self.position = vector_from_wire("position", value)?;
                Ok(())
            }
            "rotation" => match value {
                WireValue::F32(v) => {
                    self.rotation = v;
                    Ok(())
                }
                other => Err(ReflectError::KindMismatch {
                    type_name: "Transform",
                    member: "rotation",
                    expected: WireKind::F32,
                    actual: other.kind(),
                }),
            },
            "scale" => {
                self.scale = vector_from_wire("scale", value)?;
                Ok(())
            }
            other => Err(ReflectError::NoSuchMember {
                type_name: "Transform",
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

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn default_transform_is_identity() {
        let transform = Transform::default();
        assert_eq!(transform.position, Vector2::zeros());
        assert_eq!(transform.scale, Vector2::new(1.0, 1.0));
        assert_relative_eq!(transform.rotation, 0.0);
    }

    #[test]
    fn translate_moves_position() {
        let mut transform = Transform::default();
        transform.translate(Vector2::new(3.0, -1.5));
        assert_relative_eq!(transform.position.x, 3.0);
        assert_relative_eq!(transform.position.y, -1.5);
    }

    #[test]
    fn reflect_round_trips_members() {
        let mut transform = Transform::default();
        transform
            .set_field("position", WireValue::List(vec![WireValue::F32(2.0), WireValue::F32(4.0)]))
            .unwrap();
        assert_eq!(
            transform.get_field("position"),
            Some(WireValue::List(vec![WireValue::F32(2.0), WireValue::F32(4.0)]))
        );

        let err = transform.set_field("rotation", WireValue::Str("no".into()));
        assert!(matches!(err, Err(ReflectError::KindMismatch { .. })));
    }
}
