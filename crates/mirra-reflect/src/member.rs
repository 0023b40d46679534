//! Member models: fields, methods, and constructors in queryable form
//!
//! Built once per type model from the raw class walk. Each model carries its
//! declaring type, declared-vs-inherited flag, and accessor index into the
//! owning engine's dispatch tables. Field models additionally carry the
//! getter/setter pairing resolved by the staged heuristic below.

use std::any::Any;
use std::sync::Arc;

use mirra_core::class::{RawField, RawMethod};
use mirra_core::registry;
use mirra_core::{ConcreteType, CoreError, Modifiers, TypeExpr, TypeRef, Value};

use crate::engine::AccessorEngine;
use crate::error::{ReflectError, ReflectResult};

/// A paired accessor method: its position in the method list and its slot in
/// the engine's invoke table
#[derive(Debug, Clone, Copy)]
pub(crate) struct PairedAccessor {
    pub method: usize,
    pub slot: usize,
}

/// Queryable field metadata plus routed access
pub struct FieldModel {
    pub(crate) name: String,
    pub(crate) ty: TypeRef,
    pub(crate) generic: Option<TypeExpr>,
    pub(crate) resolved: Option<ConcreteType>,
    pub(crate) declaring: TypeRef,
    pub(crate) declaring_name: String,
    pub(crate) modifiers: Modifiers,
    pub(crate) declared_here: bool,
    pub(crate) accessor_index: Option<usize>,
    pub(crate) getter: Option<PairedAccessor>,
    pub(crate) setter: Option<PairedAccessor>,
    pub(crate) engine: Arc<AccessorEngine>,
}

impl FieldModel {
    /// Field name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared concrete type
    pub fn declared_type(&self) -> TypeRef {
        self.ty
    }

    /// Generic-type expression, when the registration attached one
    pub fn generic_type(&self) -> Option<&TypeExpr> {
        self.generic.as_ref()
    }

    /// Generic type resolved against the owning type's ancestry
    pub fn resolved_type(&self) -> Option<&ConcreteType> {
        self.resolved.as_ref()
    }

    /// Type that declares this field
    pub fn declaring_type(&self) -> TypeRef {
        self.declaring
    }

    /// Modifier flags
    pub fn modifiers(&self) -> Modifiers {
        self.modifiers
    }

    /// Whether the field is declared on the modeled type itself
    pub fn is_declared(&self) -> bool {
        self.declared_here
    }

    /// Whether the field is inherited from an ancestor
    pub fn is_inherited(&self) -> bool {
        !self.declared_here
    }

    /// Slot in the engine's get/set tables
    pub fn accessor_index(&self) -> Option<usize> {
        self.accessor_index
    }

    /// Position of the paired getter in the owning model's method list
    pub fn getter_index(&self) -> Option<usize> {
        self.getter.map(|p| p.method)
    }

    /// Position of the paired setter in the owning model's method list
    pub fn setter_index(&self) -> Option<usize> {
        self.setter.map(|p| p.method)
    }

    /// Read the field. With `prefer_getter`, a paired getter is invoked
    /// instead of the field slot when one exists.
    pub fn get_value(&self, instance: &dyn Any, prefer_getter: bool) -> ReflectResult<Value> {
        if prefer_getter {
            if let Some(getter) = self.getter {
                return self.engine.invoke_ref(instance, getter.slot, &[]);
            }
        }
        match self.accessor_index {
            Some(index) => self.engine.get(instance, index),
            None => Err(ReflectError::from_core(
                &self.name,
                self.engine.type_name(),
                CoreError::MissingBody {
                    member: self.name.clone(),
                },
            )),
        }
    }

    /// Write the field. With `prefer_setter`, a paired setter is invoked
    /// instead of the field slot when one exists.
    pub fn set_value(
        &self,
        instance: &mut dyn Any,
        value: &Value,
        prefer_setter: bool,
    ) -> ReflectResult<()> {
        if prefer_setter {
            if let Some(setter) = self.setter {
                let args = [value.clone()];
                self.engine.invoke(instance, setter.slot, &args)?;
                return Ok(());
            }
        }
        match self.accessor_index {
            Some(index) => self.engine.set(instance, index, value),
            None => Err(ReflectError::from_core(
                &self.name,
                self.engine.type_name(),
                CoreError::MissingBody {
                    member: self.name.clone(),
                },
            )),
        }
    }
}

impl std::fmt::Debug for FieldModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldModel")
            .field("name", &self.name)
            .field("ty", &self.ty)
            .field("declaring", &self.declaring_name)
            .field("declared_here", &self.declared_here)
            .field("accessor_index", &self.accessor_index)
            .finish()
    }
}

/// Queryable method metadata plus routed invocation
pub struct MethodModel {
    pub(crate) name: String,
    pub(crate) params: Vec<TypeRef>,
    pub(crate) return_type: TypeRef,
    pub(crate) generic_return: Option<TypeExpr>,
    pub(crate) resolved_return: Option<ConcreteType>,
    pub(crate) declaring: TypeRef,
    pub(crate) declaring_name: String,
    pub(crate) modifiers: Modifiers,
    pub(crate) declared_here: bool,
    pub(crate) accessor_index: Option<usize>,
    pub(crate) engine: Arc<AccessorEngine>,
}

impl MethodModel {
    /// Method name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Parameter types in order
    pub fn parameter_types(&self) -> &[TypeRef] {
        &self.params
    }

    /// Number of declared parameters
    pub fn arity(&self) -> usize {
        self.params.len()
    }

    /// Declared return type
    pub fn return_type(&self) -> TypeRef {
        self.return_type
    }

    /// Generic return expression, when the registration attached one
    pub fn generic_return(&self) -> Option<&TypeExpr> {
        self.generic_return.as_ref()
    }

    /// Generic return resolved against the owning type's ancestry
    pub fn resolved_return(&self) -> Option<&ConcreteType> {
        self.resolved_return.as_ref()
    }

    /// Type that declares this method
    pub fn declaring_type(&self) -> TypeRef {
        self.declaring
    }

    /// Modifier flags
    pub fn modifiers(&self) -> Modifiers {
        self.modifiers
    }

    /// Whether the method is declared on the modeled type itself
    pub fn is_declared(&self) -> bool {
        self.declared_here
    }

    /// Whether the method is an abstract declaration
    pub fn is_abstract(&self) -> bool {
        self.modifiers.is_abstract
    }

    /// Slot in the engine's invoke table; `None` for abstract declarations,
    /// which are recorded but excluded from dispatch
    pub fn accessor_index(&self) -> Option<usize> {
        self.accessor_index
    }

    /// Invoke with a mutable receiver
    pub fn invoke(&self, instance: &mut dyn Any, args: &[Value]) -> ReflectResult<Value> {
        match self.accessor_index {
            Some(index) => self.engine.invoke(instance, index, args),
            None => Err(ReflectError::from_core(
                &self.name,
                self.engine.type_name(),
                CoreError::MissingBody {
                    member: self.name.clone(),
                },
            )),
        }
    }

    /// Invoke with a shared receiver; mutable-receiver bodies fail
    pub fn invoke_ref(&self, instance: &dyn Any, args: &[Value]) -> ReflectResult<Value> {
        match self.accessor_index {
            Some(index) => self.engine.invoke_ref(instance, index, args),
            None => Err(ReflectError::from_core(
                &self.name,
                self.engine.type_name(),
                CoreError::MissingBody {
                    member: self.name.clone(),
                },
            )),
        }
    }
}

impl std::fmt::Debug for MethodModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MethodModel")
            .field("name", &self.name)
            .field("params", &self.params)
            .field("return_type", &self.return_type)
            .field("declaring", &self.declaring_name)
            .field("accessor_index", &self.accessor_index)
            .finish()
    }
}

/// Queryable constructor metadata plus routed construction
pub struct ConstructorModel {
    pub(crate) params: Vec<TypeRef>,
    pub(crate) declaring: TypeRef,
    pub(crate) declaring_name: String,
    pub(crate) modifiers: Modifiers,
    pub(crate) declared_here: bool,
    pub(crate) accessor_index: Option<usize>,
    pub(crate) engine: Arc<AccessorEngine>,
}

impl ConstructorModel {
    /// Parameter types in order
    pub fn parameter_types(&self) -> &[TypeRef] {
        &self.params
    }

    /// Whether this is the zero-argument form
    pub fn is_default(&self) -> bool {
        self.params.is_empty()
    }

    /// Type that declares this constructor
    pub fn declaring_type(&self) -> TypeRef {
        self.declaring
    }

    /// Modifier flags
    pub fn modifiers(&self) -> Modifiers {
        self.modifiers
    }

    /// Whether the constructor is declared on the modeled type itself.
    /// Inherited constructors are recorded but cannot construct the modeled
    /// type.
    pub fn is_declared(&self) -> bool {
        self.declared_here
    }

    /// Slot in the engine's construct table; `None` for inherited records
    pub fn accessor_index(&self) -> Option<usize> {
        self.accessor_index
    }

    /// Construct an instance
    pub fn new_instance(&self, args: &[Value]) -> ReflectResult<Box<dyn Any + Send + Sync>> {
        match self.accessor_index {
            Some(index) => self.engine.construct_at(index, args),
            None => Err(ReflectError::from_core(
                "<init>",
                self.engine.type_name(),
                CoreError::MissingBody {
                    member: "<init>".to_string(),
                },
            )),
        }
    }
}

impl std::fmt::Debug for ConstructorModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConstructorModel")
            .field("params", &self.params)
            .field("declaring", &self.declaring_name)
            .field("accessor_index", &self.accessor_index)
            .finish()
    }
}

// ============================================================================
// Getter/setter pairing heuristic
// ============================================================================

fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Resolve the paired getter and setter for `field` among `methods`.
///
/// Candidate names are tried strictly in stage order; the first structural
/// match wins and later stages are never examined:
///
/// 1. `get<F>` / `set<F>` with the first letter of the field upper-cased;
/// 2. boolean fields whose name already starts with `is`: a getter named
///    exactly like the field, and a setter named `set<Suffix>` with the `is`
///    prefix stripped;
/// 3. other boolean fields: a getter named `is<F>`;
/// 4. a method named exactly like the field (0 arguments reads, 1 writes).
///
/// The asymmetry between stages 2 and 3 (stage 3 adds no setter candidate)
/// is intentional and load-bearing for existing callers.
///
/// Structural match: getters take no parameters and their return type must
/// be assignable from the field's boxed type; setters take exactly one
/// parameter assignable from it. Abstract and static candidates never pair.
pub(crate) fn pair_accessors(
    field: &RawField,
    methods: &[&RawMethod],
) -> (Option<usize>, Option<usize>) {
    let cap = capitalize(&field.name);
    let is_bool = field.ty.is::<bool>();

    let mut getter_names = vec![format!("get{cap}")];
    let mut setter_names = vec![format!("set{cap}")];
    if is_bool {
        if let Some(suffix) = field.name.strip_prefix("is") {
            getter_names.push(field.name.clone());
            setter_names.push(format!("set{suffix}"));
        } else {
            getter_names.push(format!("is{cap}"));
        }
    }
    getter_names.push(field.name.clone());
    setter_names.push(field.name.clone());

    let find_getter = |name: &str| {
        methods.iter().position(|m| {
            m.name == name
                && m.params.is_empty()
                && m.is_invokable()
                && !m.modifiers.is_static
                && registry::is_assignable(&m.return_type, &field.ty)
        })
    };
    let find_setter = |name: &str| {
        methods.iter().position(|m| {
            m.name == name
                && m.params.len() == 1
                && m.is_invokable()
                && !m.modifiers.is_static
                && registry::is_assignable(&m.params[0], &field.ty)
        })
    };

    let getter = getter_names.iter().find_map(|n| find_getter(n));
    let setter = setter_names.iter().find_map(|n| find_setter(n));
    if getter.is_some() || setter.is_some() {
        tracing::trace!(field = %field.name, ?getter, ?setter, "paired accessors");
    }
    (getter, setter)
}
