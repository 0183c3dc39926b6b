//! Runtime type model construction.
//!
//! Builds the wire numbering the serializers operate against: every
//! registered type gets sequential member tags (declared fields first, then
//! public properties, one shared counter per type), and subtypes are
//! attached to their base's entry with order-dependent tags. Because the
//! subtype tag depends on how many subtypes the base already has, the whole
//! type set must be registered in one fixed, documented sequence to get
//! reproducible schemas — the engine's own manifest does exactly that.

use std::collections::HashMap;

use crate::serialization::schema::{TypeDescriptor, WireKind, DEEPLY_MUTABLE_TYPE_NAME};

/// First member tag assigned within every type.
pub const FIELD_WIRE_INDEX: u32 = 1;
/// Base tag for subtype discriminators.
pub const SUBTYPE_WIRE_INDEX: u32 = 556;

const MODEL_NAME: &str = "ScapeCore";
const MAX_DEPTH: u32 = 100;

/// One schematized member of a type: its wire tag, name and kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WireMember {
    /// Wire tag carried in the encoded stream
    pub tag: u32,
    /// Member name, as declared by the descriptor
    pub name: &'static str,
    /// Member kind on the wire
    pub kind: WireKind,
}

/// A derived type attached to a base entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubType {
    /// Wire discriminator for the derived type
    pub tag: u32,
    /// Name of the derived type
    pub type_name: &'static str,
}

/// The model's entry for one registered type.
#[derive(Debug)]
pub struct MetaType {
    descriptor: &'static TypeDescriptor,
    members: Vec<WireMember>,
    subtypes: Vec<SubType>,
}

impl MetaType {
    /// The descriptor this entry was built from.
    pub fn descriptor(&self) -> &'static TypeDescriptor {
        self.descriptor
    }

    /// Schematized members in tag order.
    pub fn members(&self) -> &[WireMember] {
        &self.members
    }

    /// Subtypes attached to this entry, in attachment order.
    pub fn subtypes(&self) -> &[SubType] {
        &self.subtypes
    }

    /// Look up a member by wire tag.
    pub fn member_by_tag(&self, tag: u32) -> Option<&WireMember> {
        self.members.iter().find(|member| member.tag == tag)
    }

    /// Look up a member by name.
    pub fn member_by_name(&self, name: &str) -> Option<&WireMember> {
        self.members.iter().find(|member| member.name == name)
    }
}

/// The compiled schema: registered types, their member numbering and their
/// subtype wiring.
#[derive(Debug)]
pub struct RuntimeTypeModel {
    name: String,
    order: Vec<&'static str>,
    types: HashMap<&'static str, MetaType>,
    compiled: bool,
    max_depth: u32,
}

impl RuntimeTypeModel {
    /// Create an empty model.
    pub fn create(name: &str) -> Self {
        Self {
            name: name.to_string(),
            order: Vec::new(),
            types: HashMap::new(),
            compiled: false,
            max_depth: MAX_DEPTH,
        }
    }

    /// Model name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Maximum value-graph depth the streamers accept.
    pub fn max_depth(&self) -> u32 {
        self.max_depth
    }

    /// Whether `type_name` is registered.
    pub fn can_serialize(&self, type_name: &str) -> bool {
        self.types.contains_key(type_name)
    }

    /// Entry for `type_name`, when registered.
    pub fn get(&self, type_name: &str) -> Option<&MetaType> {
        self.types.get(type_name)
    }

    /// Registered entries, in registration order.
    pub fn types(&self) -> impl Iterator<Item = &MetaType> {
        self.order.iter().filter_map(|name| self.types.get(name))
    }

    /// Whether the model has been compiled/locked.
    pub fn is_compiled(&self) -> bool {
        self.compiled
    }

    /// Compile the model in place. Numbering performed so far is locked in;
    /// incremental additions remain possible.
    pub fn compile_in_place(&mut self) {
        self.compiled = true;
    }

    fn add(&mut self, descriptor: &'static TypeDescriptor) {
        if self.types.contains_key(descriptor.type_name) {
            log::warn!(
                "type `{}` is already registered in model `{}`; re-registering it resets its \
                 numbering",
                descriptor.type_name,
                self.name
            );
        } else {
            self.order.push(descriptor.type_name);
        }
        self.types.insert(
            descriptor.type_name,
            MetaType {
                descriptor,
                members: Vec::new(),
                subtypes: Vec::new(),
            },
        );
    }

    fn add_member(&mut self, type_name: &str, member: WireMember) {
        if let Some(meta) = self.types.get_mut(type_name) {
            meta.members.push(member);
        }
    }

    fn attach_subtype(&mut self, base: &str, subtype: SubType) {
        if let Some(meta) = self.types.get_mut(base) {
            meta.subtypes.push(subtype);
        }
    }
}

/// Error codes returned by [`RuntimeModelFactory::change_model`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChangeModelError {
    /// The swap succeeded.
    #[default]
    None,
    /// No replacement model was provided; the active model is unchanged.
    NullModel,
}

/// Result record of a model swap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChangeModelOutput {
    /// Error code; [`ChangeModelError::None`] on success
    pub error: ChangeModelError,
}

/// Builds and owns the active [`RuntimeTypeModel`].
pub struct RuntimeModelFactory {
    model: Option<RuntimeTypeModel>,
}

impl RuntimeModelFactory {
    /// Build a model from `types`, configuring them in the given order, and
    /// compile it.
    pub fn new(types: &[&'static TypeDescriptor]) -> Self {
        let mut model = RuntimeTypeModel::create(MODEL_NAME);
        for &descriptor in types {
            configure_type(&mut model, descriptor);
        }
        model.compile_in_place();
        Self { model: Some(model) }
    }

    /// The active model, when one has been built.
    pub fn model(&self) -> Option<&RuntimeTypeModel> {
        self.model.as_ref()
    }

    /// Register `descriptor` incrementally: bare entry, field numbering,
    /// subtype wiring and property numbering, exactly as at construction.
    pub fn add_type(&mut self, descriptor: &'static TypeDescriptor) {
        let Some(model) = self.model.as_mut() else {
            log::warn!(
                "cannot add type `{}` because the serialization model is null",
                descriptor.type_name
            );
            return;
        };
        let mut field_index = FIELD_WIRE_INDEX;
        model.add(descriptor);
        log::debug!(
            "type `{}` was configured for [de]serialization",
            descriptor.type_name
        );
        set_type_fields(model, descriptor, &mut field_index);
        set_sub_type(model, descriptor);
        if is_deeply_mutable(descriptor) {
            return;
        }
        set_type_properties(model, descriptor, &mut field_index);
    }

    /// Swap the active model for `model`, recompiling it in place. Passing
    /// `None` fails with [`ChangeModelError::NullModel`] and leaves the
    /// active model untouched.
    pub fn change_model(&mut self, model: Option<RuntimeTypeModel>) -> ChangeModelOutput {
        match model {
            None => {
                log::warn!(
                    "cannot change to a null serialization model; the model remains the same"
                );
                ChangeModelOutput {
                    error: ChangeModelError::NullModel,
                }
            }
            Some(mut new_model) => {
                new_model.compile_in_place();
                self.model = Some(new_model);
                log::debug!("serialization model was successfully updated");
                ChangeModelOutput {
                    error: ChangeModelError::None,
                }
            }
        }
    }
}

fn is_deeply_mutable(descriptor: &TypeDescriptor) -> bool {
    descriptor.type_name == DEEPLY_MUTABLE_TYPE_NAME
        || descriptor.base == Some(DEEPLY_MUTABLE_TYPE_NAME)
}

fn configure_type(model: &mut RuntimeTypeModel, descriptor: &'static TypeDescriptor) {
    let mut field_index = FIELD_WIRE_INDEX;
    model.add(descriptor);
    log::debug!(
        "type `{}` was configured for [de]serialization",
        descriptor.type_name
    );
    if descriptor.is_enum {
        return;
    }
    set_type_fields(model, descriptor, &mut field_index);
    set_sub_type(model, descriptor);
    if is_deeply_mutable(descriptor) {
        // The wrapper's dynamic payload cannot be statically schematized;
        // lock the model and skip property numbering.
        model.compile_in_place();
        return;
    }
    set_type_properties(model, descriptor, &mut field_index);
}

fn set_type_fields(
    model: &mut RuntimeTypeModel,
    descriptor: &'static TypeDescriptor,
    field_index: &mut u32,
) {
    for field in descriptor.fields {
        if field.kind == WireKind::Opaque {
            log::warn!(
                "tried to configure a fully erased field `{}` of type `{}`; the serializer does \
                 not support deeply mutable members, consider changing the field type to `{}`",
                field.name,
                descriptor.type_name,
                DEEPLY_MUTABLE_TYPE_NAME
            );
            continue;
        }
        model.add_member(
            descriptor.type_name,
            WireMember {
                tag: *field_index,
                name: field.name,
                kind: field.kind,
            },
        );
        log::trace!(
            "\tfield [{}]{} of type `{}`",
            *field_index,
            field.name,
            descriptor.type_name
        );
        *field_index += 1;
    }
}

fn set_type_properties(
    model: &mut RuntimeTypeModel,
    descriptor: &'static TypeDescriptor,
    field_index: &mut u32,
) {
    for property in descriptor.properties {
        if property.kind == WireKind::Opaque {
            log::warn!(
                "tried to configure a fully erased property `{}` of type `{}`; the serializer \
                 does not support deeply mutable members, consider changing the property type to \
                 `{}`",
                property.name,
                descriptor.type_name,
                DEEPLY_MUTABLE_TYPE_NAME
            );
            continue;
        }
        model.add_member(
            descriptor.type_name,
            WireMember {
                tag: *field_index,
                name: property.name,
                kind: property.kind,
            },
        );
        log::trace!(
            "\tproperty [{}]{} of type `{}`",
            *field_index,
            property.name,
            descriptor.type_name
        );
        *field_index += 1;
    }
}

/// Attach `descriptor` under the first registered entry whose type equals
/// its base. The tag is the subtype base constant plus the count of subtypes
/// already attached to that base, so registration order across the whole
/// type set determines the tag.
fn set_sub_type(model: &mut RuntimeTypeModel, descriptor: &'static TypeDescriptor) {
    let Some(base) = descriptor.base else {
        return;
    };
    let Some(base_meta) = model.get(base) else {
        return;
    };
    let tag = SUBTYPE_WIRE_INDEX + base_meta.subtypes().len() as u32;
    model.attach_subtype(
        base,
        SubType {
            tag,
            type_name: descriptor.type_name,
        },
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serialization::schema::FieldDescriptor;

    static ANIMAL: TypeDescriptor = TypeDescriptor {
        type_name: "Animal",
        base: None,
        is_enum: false,
        fields: &[FieldDescriptor {
            name: "legs",
            kind: WireKind::I32,
        }],
        properties: &[FieldDescriptor {
            name: "nickname",
            kind: WireKind::Str,
        }],
    };

    static DOG: TypeDescriptor = TypeDescriptor {
        type_name: "Dog",
        base: Some("Animal"),
        is_enum: false,
        fields: &[FieldDescriptor {
            name: "bark_volume",
            kind: WireKind::F32,
        }],
        properties: &[],
    };

    static CAT: TypeDescriptor = TypeDescriptor {
        type_name: "Cat",
        base: Some("Animal"),
        is_enum: false,
        fields: &[FieldDescriptor {
            name: "lives",
            kind: WireKind::I32,
        }],
        properties: &[],
    };

    static COLOR: TypeDescriptor = TypeDescriptor {
        type_name: "Color",
        base: None,
        is_enum: true,
        fields: &[FieldDescriptor {
            name: "ignored",
            kind: WireKind::I32,
        }],
        properties: &[],
    };

    static ERASED: TypeDescriptor = TypeDescriptor {
        type_name: "Erased",
        base: None,
        is_enum: false,
        fields: &[
            FieldDescriptor {
                name: "first",
                kind: WireKind::I32,
            },
            FieldDescriptor {
                name: "payload",
                kind: WireKind::Opaque,
            },
            FieldDescriptor {
                name: "second",
                kind: WireKind::Str,
            },
        ],
        properties: &[FieldDescriptor {
            name: "label",
            kind: WireKind::Str,
        }],
    };

    static WRAPPERISH: TypeDescriptor = TypeDescriptor {
        type_name: "Wrapperish",
        base: Some(DEEPLY_MUTABLE_TYPE_NAME),
        is_enum: false,
        fields: &[FieldDescriptor {
            name: "slot_count",
            kind: WireKind::I32,
        }],
        properties: &[FieldDescriptor {
            name: "skipped",
            kind: WireKind::Str,
        }],
    };

    fn member_tags(model: &RuntimeTypeModel, type_name: &str) -> Vec<(u32, &'static str)> {
        model
            .get(type_name)
            .map(|meta| {
                meta.members()
                    .iter()
                    .map(|member| (member.tag, member.name))
                    .collect()
            })
            .unwrap_or_default()
    }

    #[test]
    fn fields_then_properties_share_one_counter() {
        let factory = RuntimeModelFactory::new(&[&ANIMAL]);
        let model = factory.model().unwrap();
        assert_eq!(
            member_tags(model, "Animal"),
            vec![(1, "legs"), (2, "nickname")]
        );
        assert!(model.is_compiled());
    }

    #[test]
    fn numbering_is_deterministic_across_runs() {
        let types: &[&'static TypeDescriptor] = &[&ANIMAL, &DOG, &CAT, &ERASED];
        let first = RuntimeModelFactory::new(types);
        let second = RuntimeModelFactory::new(types);

        for descriptor in types {
            assert_eq!(
                member_tags(first.model().unwrap(), descriptor.type_name),
                member_tags(second.model().unwrap(), descriptor.type_name)
            );
        }
        let first_subs: Vec<_> = first.model().unwrap().get("Animal").unwrap().subtypes().to_vec();
        let second_subs: Vec<_> =
            second.model().unwrap().get("Animal").unwrap().subtypes().to_vec();
        assert_eq!(first_subs, second_subs);
    }

    #[test]
    fn subtype_tags_are_base_plus_existing_count() {
        let factory = RuntimeModelFactory::new(&[&ANIMAL, &DOG, &CAT]);
        let model = factory.model().unwrap();
        let subtypes = model.get("Animal").unwrap().subtypes();

        assert_eq!(subtypes.len(), 2);
        assert_eq!(subtypes[0], SubType { tag: 556, type_name: "Dog" });
        assert_eq!(subtypes[1], SubType { tag: 557, type_name: "Cat" });
    }

    #[test]
    fn registration_order_changes_subtype_tags() {
        let factory = RuntimeModelFactory::new(&[&ANIMAL, &CAT, &DOG]);
        let model = factory.model().unwrap();
        let subtypes = model.get("Animal").unwrap().subtypes();
        assert_eq!(subtypes[0], SubType { tag: 556, type_name: "Cat" });
        assert_eq!(subtypes[1], SubType { tag: 557, type_name: "Dog" });
    }

    #[test]
    fn enums_receive_no_member_numbering() {
        let factory = RuntimeModelFactory::new(&[&COLOR]);
        let model = factory.model().unwrap();
        assert!(model.can_serialize("Color"));
        assert!(model.get("Color").unwrap().members().is_empty());
    }

    #[test]
    fn erased_members_are_skipped_without_consuming_a_tag() {
        let factory = RuntimeModelFactory::new(&[&ERASED]);
        let model = factory.model().unwrap();
        assert_eq!(
            member_tags(model, "Erased"),
            vec![(1, "first"), (2, "second"), (3, "label")]
        );
    }

    #[test]
    fn deeply_mutable_derivatives_skip_property_numbering() {
        let factory = RuntimeModelFactory::new(&[&WRAPPERISH]);
        let model = factory.model().unwrap();
        assert_eq!(member_tags(model, "Wrapperish"), vec![(1, "slot_count")]);
        assert!(model.is_compiled());
    }

    #[test]
    fn add_type_extends_an_existing_model() {
        let mut factory = RuntimeModelFactory::new(&[&ANIMAL, &DOG]);
        factory.add_type(&CAT);

        let model = factory.model().unwrap();
        assert_eq!(member_tags(model, "Cat"), vec![(1, "lives")]);
        let subtypes = model.get("Animal").unwrap().subtypes();
        assert_eq!(subtypes[1], SubType { tag: 557, type_name: "Cat" });
    }

    #[test]
    fn change_model_rejects_null() {
        let mut factory = RuntimeModelFactory::new(&[&ANIMAL]);
        let output = factory.change_model(None);
        assert_eq!(output.error, ChangeModelError::NullModel);
        assert!(factory.model().unwrap().can_serialize("Animal"));
    }

    #[test]
    fn change_model_swaps_and_recompiles() {
        let mut factory = RuntimeModelFactory::new(&[&ANIMAL]);
        let replacement = RuntimeTypeModel::create("replacement");
        let output = factory.change_model(Some(replacement));
        assert_eq!(output.error, ChangeModelError::None);

        let model = factory.model().unwrap();
        assert_eq!(model.name(), "replacement");
        assert!(model.is_compiled());
        assert!(!model.can_serialize("Animal"));
    }
}
