//! Raw class metadata: the host introspection facility
//!
//! A `RawClass` is what a type looks like to the reflection core before any
//! model is built: ordered member lists with names, types, modifiers, and two
//! call paths per member. The erased thunks form the generic slow path —
//! they re-validate the receiver and convert values on every call and are
//! always present. The typed fast accessors are the synthesis input: plain
//! monomorphized functions captured at registration, present only for members
//! registered through the typed builder API.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::error::CoreResult;
use crate::types::{TypeExpr, TypeRef};
use crate::value::Value;

/// Modifier flags for class members
#[derive(Debug, Clone, Copy)]
pub struct Modifiers {
    /// Public visibility
    pub is_public: bool,
    /// Static member (no receiver)
    pub is_static: bool,
    /// Read-only field
    pub is_readonly: bool,
    /// Excluded from data binding / persistence
    pub is_transient: bool,
    /// Abstract declaration without a body
    pub is_abstract: bool,
    /// Compiler- or tool-synthesized member
    pub is_synthetic: bool,
}

impl Default for Modifiers {
    fn default() -> Self {
        Self {
            is_public: true,
            is_static: false,
            is_readonly: false,
            is_transient: false,
            is_abstract: false,
            is_synthetic: false,
        }
    }
}

/// What kind of type a `RawClass` describes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassKind {
    /// A concrete (instantiable) type
    Class,
    /// An interface: abstract declarations only
    Interface,
    /// An enumeration with a fixed constant set
    Enum,
}

// ============================================================================
// Erased call path (the fallback substrate)
// ============================================================================

/// Erased field getter: validates the receiver and boxes on every call
pub type GetThunk = Box<dyn Fn(&dyn Any) -> CoreResult<Value> + Send + Sync>;

/// Erased field setter: validates receiver and value on every call
pub type SetThunk = Box<dyn Fn(&mut dyn Any, &Value) -> CoreResult<()> + Send + Sync>;

/// Erased constructor: validates and converts every argument
pub type ConstructThunk =
    Box<dyn Fn(&[Value]) -> CoreResult<Box<dyn Any + Send + Sync>> + Send + Sync>;

/// Projection from a child instance to its embedded parent fragment
pub type ProjectThunk = Arc<dyn for<'a> Fn(&'a dyn Any) -> Option<&'a dyn Any> + Send + Sync>;

/// Mutable projection from a child instance to its embedded parent fragment
pub type ProjectMutThunk =
    Arc<dyn for<'a> Fn(&'a mut dyn Any) -> Option<&'a mut dyn Any> + Send + Sync>;

/// Method body, by receiver form
pub enum MethodBody {
    /// Shared-receiver method
    Ref(Box<dyn Fn(&dyn Any, &[Value]) -> CoreResult<Value> + Send + Sync>),
    /// Mutable-receiver method
    Mut(Box<dyn Fn(&mut dyn Any, &[Value]) -> CoreResult<Value> + Send + Sync>),
    /// Static method (receiver ignored)
    Static(Box<dyn Fn(&[Value]) -> CoreResult<Value> + Send + Sync>),
}

// ============================================================================
// Typed fast accessors (synthesis input)
// ============================================================================

/// Typed fast getter, specialized per primitive kind so the dispatch table
/// can unbox inline. `None` signals a receiver mismatch or a value outside
/// the slot's kind; the caller retries through the erased path.
#[derive(Clone)]
pub enum FastGet {
    /// Boolean field
    Bool(Arc<dyn Fn(&dyn Any) -> Option<bool> + Send + Sync>),
    /// Integer field (i32 widened at the boundary)
    I64(Arc<dyn Fn(&dyn Any) -> Option<i64> + Send + Sync>),
    /// Float field
    F64(Arc<dyn Fn(&dyn Any) -> Option<f64> + Send + Sync>),
    /// String field
    Str(Arc<dyn Fn(&dyn Any) -> Option<Arc<str>> + Send + Sync>),
    /// Anything else, boxed
    Boxed(Arc<dyn Fn(&dyn Any) -> Option<Value> + Send + Sync>),
}

/// Typed fast setter. `None` signals a receiver or value mismatch; the
/// caller is expected to retry through the erased path for the precise error.
pub type FastSet = Arc<dyn Fn(&mut dyn Any, &Value) -> Option<()> + Send + Sync>;

/// Typed fast method thunk, by receiver form. `None` signals a receiver or
/// argument mismatch.
#[derive(Clone)]
pub enum FastMethod {
    /// Shared-receiver method
    Ref(Arc<dyn Fn(&dyn Any, &[Value]) -> Option<Value> + Send + Sync>),
    /// Mutable-receiver method
    Mut(Arc<dyn Fn(&mut dyn Any, &[Value]) -> Option<Value> + Send + Sync>),
    /// Static method
    Static(Arc<dyn Fn(&[Value]) -> Option<Value> + Send + Sync>),
}

/// Typed fast zero-argument constructor
pub type FastConstruct = Arc<dyn Fn() -> Box<dyn Any + Send + Sync> + Send + Sync>;

// ============================================================================
// Raw members
// ============================================================================

/// A field as registered
pub struct RawField {
    /// Field name
    pub name: String,
    /// Declared concrete type
    pub ty: TypeRef,
    /// Generic-type expression, when the declared type mentions parameters
    pub generic: Option<TypeExpr>,
    /// Modifier flags
    pub modifiers: Modifiers,
    /// Erased getter (always present)
    pub get: GetThunk,
    /// Erased setter; absent for read-only fields
    pub set: Option<SetThunk>,
    /// Typed fast getter, when registered through the typed API
    pub fast_get: Option<FastGet>,
    /// Typed fast setter, when registered through the typed API
    pub fast_set: Option<FastSet>,
}

impl RawField {
    /// Whether a typed fast accessor pair was captured at registration
    pub fn has_fast_path(&self) -> bool {
        self.fast_get.is_some()
    }
}

impl fmt::Debug for RawField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawField")
            .field("name", &self.name)
            .field("ty", &self.ty)
            .field("modifiers", &self.modifiers)
            .field("fast", &self.has_fast_path())
            .finish()
    }
}

/// A method as registered
pub struct RawMethod {
    /// Method name
    pub name: String,
    /// Parameter types in order
    pub params: Vec<TypeRef>,
    /// Return type
    pub return_type: TypeRef,
    /// Generic return expression, when parameterized
    pub generic_return: Option<TypeExpr>,
    /// Modifier flags
    pub modifiers: Modifiers,
    /// Body; `None` for abstract declarations
    pub body: Option<MethodBody>,
    /// Typed fast thunk, when registered through the typed API
    pub fast: Option<FastMethod>,
}

impl RawMethod {
    /// Number of declared parameters
    pub fn arity(&self) -> usize {
        self.params.len()
    }

    /// Whether the method can be dispatched at all
    pub fn is_invokable(&self) -> bool {
        self.body.is_some()
    }

    /// Invoke through the erased path with a shared receiver.
    ///
    /// Mutable-receiver bodies cannot be reached this way; the reflect layer
    /// only routes shared-receiver accessors (paired getters) through here.
    pub fn call_ref(&self, target: &dyn Any, args: &[Value]) -> CoreResult<Value> {
        self.check_arity(args)?;
        match &self.body {
            None => Err(crate::error::CoreError::MissingBody {
                member: self.name.clone(),
            }),
            Some(MethodBody::Ref(body)) => body(target, args),
            Some(MethodBody::Static(body)) => body(args),
            Some(MethodBody::Mut(_)) => Err(crate::error::CoreError::TargetMismatch {
                expected: "mutable receiver".to_string(),
                got: "shared receiver".to_string(),
            }),
        }
    }

    /// Invoke through the erased path with a mutable receiver
    pub fn call_mut(&self, target: &mut dyn Any, args: &[Value]) -> CoreResult<Value> {
        self.check_arity(args)?;
        match &self.body {
            None => Err(crate::error::CoreError::MissingBody {
                member: self.name.clone(),
            }),
            Some(MethodBody::Ref(body)) => body(target, args),
            Some(MethodBody::Mut(body)) => body(target, args),
            Some(MethodBody::Static(body)) => body(args),
        }
    }

    fn check_arity(&self, args: &[Value]) -> CoreResult<()> {
        crate::ensure!(
            args.len() == self.params.len(),
            crate::error::CoreError::ArityMismatch {
                expected: self.params.len(),
                got: args.len(),
            }
        );
        Ok(())
    }
}

impl fmt::Debug for RawMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawMethod")
            .field("name", &self.name)
            .field("params", &self.params)
            .field("return_type", &self.return_type)
            .field("modifiers", &self.modifiers)
            .field("invokable", &self.is_invokable())
            .finish()
    }
}

/// A constructor as registered
pub struct RawConstructor {
    /// Parameter types in order
    pub params: Vec<TypeRef>,
    /// Modifier flags
    pub modifiers: Modifiers,
    /// Erased construct thunk (always present)
    pub construct: ConstructThunk,
    /// Typed fast thunk; zero-argument constructors only
    pub fast: Option<FastConstruct>,
}

impl RawConstructor {
    /// Whether this is the zero-argument (default) form
    pub fn is_default(&self) -> bool {
        self.params.is_empty()
    }

    /// Construct through the erased path
    pub fn call(&self, args: &[Value]) -> CoreResult<Box<dyn Any + Send + Sync>> {
        crate::ensure!(
            args.len() == self.params.len(),
            crate::error::CoreError::ArityMismatch {
                expected: self.params.len(),
                got: args.len(),
            }
        );
        (self.construct)(args)
    }
}

impl fmt::Debug for RawConstructor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawConstructor")
            .field("params", &self.params)
            .field("fast", &self.fast.is_some())
            .finish()
    }
}

/// Inheritance edge: the parent type plus the projections that reach the
/// parent fragment inside a child instance
#[derive(Clone)]
pub struct ParentEdge {
    /// Parent concrete type
    pub ty: TypeRef,
    /// Supertype occurrence, carrying type arguments when parameterized
    pub expr: TypeExpr,
    /// Shared projection into the parent fragment
    pub project: ProjectThunk,
    /// Mutable projection into the parent fragment
    pub project_mut: ProjectMutThunk,
}

impl fmt::Debug for ParentEdge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParentEdge").field("ty", &self.ty).finish()
    }
}

/// An enum constant: declared name plus the boxed constant instance
#[derive(Debug, Clone)]
pub struct EnumConstant {
    /// Declared constant name
    pub name: String,
    /// The constant instance, boxed
    pub instance: Value,
}

/// Complete registered metadata for one type
pub struct RawClass {
    /// Registered (short) name
    pub name: String,
    /// The type this metadata describes
    pub ty: TypeRef,
    /// Kind of type
    pub kind: ClassKind,
    /// Declared type parameter names, in order
    pub type_params: Vec<String>,
    /// Parent edge, when the type extends another registered type
    pub parent: Option<ParentEdge>,
    /// Implemented interface occurrences
    pub interfaces: Vec<TypeExpr>,
    /// Enclosing type occurrence, for nested types
    pub enclosing: Option<TypeExpr>,
    /// Fields in declaration order
    pub fields: Vec<RawField>,
    /// Methods in declaration order
    pub methods: Vec<RawMethod>,
    /// Constructors in declaration order
    pub constructors: Vec<RawConstructor>,
    /// Enum constants in declaration order; empty unless `kind` is `Enum`
    pub constants: Vec<EnumConstant>,
}

impl fmt::Debug for RawClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawClass")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("fields", &self.fields.len())
            .field("methods", &self.methods.len())
            .field("constructors", &self.constructors.len())
            .finish()
    }
}
