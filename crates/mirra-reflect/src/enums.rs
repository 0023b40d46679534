//! Enum value models
//!
//! Detects the `value`-field pattern on a registered enum: when the enum
//! declares a field literally named `value`, constant identity routes
//! through that field; otherwise the constant's declared name stands in.
//! Reverse lookup compares string forms in declaration order.
//!
//! Models are memoized process-wide per enum type, insert-if-absent.

use std::any::{Any, TypeId};
use std::sync::Arc;

use dashmap::DashMap;
use once_cell::sync::Lazy;

use mirra_core::{ClassKind, TypeRef, Value};

use crate::error::{ReflectError, ReflectResult};
use crate::model::TypeModel;

static ENUM_MODELS: Lazy<DashMap<TypeId, Arc<EnumModel>>> = Lazy::new(DashMap::new);

/// One modeled enum constant
#[derive(Debug, Clone)]
pub struct EnumConstantModel {
    name: String,
    instance: Value,
    value: Value,
}

impl EnumConstantModel {
    /// Declared constant name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The boxed constant instance
    pub fn instance(&self) -> &Value {
        &self.instance
    }

    /// The constant's value: the `value` field's content when the enum is
    /// value-backed, the constant's name otherwise
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Downcast the constant instance
    pub fn as_object<E: Any + Send + Sync>(&self) -> Option<Arc<E>> {
        self.instance.as_object::<E>()
    }
}

/// Cached per-enum value model
pub struct EnumModel {
    ty: TypeRef,
    name: String,
    value_backed: bool,
    constants: Vec<EnumConstantModel>,
}

impl EnumModel {
    /// Cached model for a Rust enum type
    pub fn of<E: Any + Send + Sync>() -> ReflectResult<Arc<EnumModel>> {
        Self::get(TypeRef::of::<E>())
    }

    /// Cached model for an enum type handle. Builds on first request,
    /// insert-if-absent.
    pub fn get(ty: TypeRef) -> ReflectResult<Arc<EnumModel>> {
        if let Some(model) = ENUM_MODELS.get(&ty.id()) {
            return Ok(model.clone());
        }
        let candidate = Arc::new(Self::build(ty)?);
        let published = ENUM_MODELS.entry(ty.id()).or_insert(candidate).clone();
        Ok(published)
    }

    fn build(ty: TypeRef) -> ReflectResult<EnumModel> {
        let model = TypeModel::get(ty)?;
        let raw = model.raw().clone();

        // A field literally named `value` switches identity to value-backed
        let value_field = (raw.kind == ClassKind::Enum)
            .then(|| model.field("value"))
            .flatten();
        let value_backed = value_field.is_some();

        let mut constants = Vec::with_capacity(raw.constants.len());
        for constant in &raw.constants {
            let value = match value_field {
                Some(field) => {
                    let instance = constant.instance.as_any().ok_or_else(|| {
                        ReflectError::InvalidValue {
                            value: constant.name.clone(),
                            type_name: raw.name.clone(),
                        }
                    })?;
                    field.get_value(instance, false)?
                }
                None => Value::str(constant.name.clone()),
            };
            constants.push(EnumConstantModel {
                name: constant.name.clone(),
                instance: constant.instance.clone(),
                value,
            });
        }

        tracing::debug!(
            class = %raw.name,
            constants = constants.len(),
            value_backed,
            "enum value model built"
        );

        Ok(EnumModel {
            ty,
            name: raw.name.clone(),
            value_backed,
            constants,
        })
    }

    /// Handle of the modeled enum type
    pub fn type_ref(&self) -> TypeRef {
        self.ty
    }

    /// Registered name of the modeled enum type
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether constant identity routes through a `value` field
    pub fn is_value_backed(&self) -> bool {
        self.value_backed
    }

    /// Constants in declaration order
    pub fn constants(&self) -> &[EnumConstantModel] {
        &self.constants
    }

    /// Constant by declared name
    pub fn constant(&self, name: &str) -> Option<&EnumConstantModel> {
        self.constants.iter().find(|c| c.name == name)
    }

    /// Forward lookup: the value carried by the named constant
    pub fn value_for(&self, name: &str) -> Option<&Value> {
        self.constant(name).map(|c| c.value())
    }

    /// Reverse lookup: the first constant, in declaration order, whose
    /// value's string form matches the target's string form
    pub fn value_of(&self, target: &Value) -> ReflectResult<&EnumConstantModel> {
        let wanted = target.display_string();
        self.constants
            .iter()
            .find(|c| c.value.display_string() == wanted)
            .ok_or_else(|| ReflectError::InvalidValue {
                value: wanted,
                type_name: self.name.clone(),
            })
    }
}

impl std::fmt::Debug for EnumModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnumModel")
            .field("name", &self.name)
            .field("value_backed", &self.value_backed)
            .field("constants", &self.constants.len())
            .finish()
    }
}
