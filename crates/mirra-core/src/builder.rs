//! Registration builders
//!
//! Types become visible to the reflection core by registering a spec built
//! here. The typed constructors (`FieldSpec::new`, `MethodSpec::ref1`, ...)
//! take non-capturing functions and monomorphize both call paths for the
//! member: the erased thunk used by the fallback substrate and the typed
//! fast accessor consumed by dispatch-table synthesis. The `dynamic`
//! constructors accept capturing closures and register the erased path only,
//! leaving the member without a fast path.

use std::any::{type_name, Any};
use std::marker::PhantomData;
use std::sync::Arc;

use crate::class::{
    ClassKind, ConstructThunk, EnumConstant, FastConstruct, FastGet, FastMethod, FastSet,
    GetThunk, MethodBody, Modifiers, ParentEdge, ProjectMutThunk, ProjectThunk, RawClass,
    RawConstructor, RawField, RawMethod, SetThunk,
};
use crate::error::CoreError;
use crate::registry;
use crate::types::{TypeExpr, TypeRef};
use crate::value::{Value, ValueKind, ValueType};

// ============================================================================
// Thunk assembly helpers
// ============================================================================

fn receiver_mismatch<T>(got: std::any::TypeId) -> CoreError {
    CoreError::TargetMismatch {
        expected: type_name::<T>().to_string(),
        got: registry::display_name(got),
    }
}

fn value_mismatch<F: ValueType>(got: &Value) -> CoreError {
    CoreError::TypeMismatch {
        expected: F::type_ref().name().to_string(),
        got: got.kind().name().to_string(),
    }
}

fn unbox_arg<A: ValueType>(args: &[Value], index: usize) -> Result<A, CoreError> {
    A::from_value(&args[index]).ok_or_else(|| value_mismatch::<A>(&args[index]))
}

fn project_thunk(
    f: impl for<'a> Fn(&'a dyn Any) -> Option<&'a dyn Any> + Send + Sync + 'static,
) -> ProjectThunk {
    Arc::new(f)
}

fn project_mut_thunk(
    f: impl for<'a> Fn(&'a mut dyn Any) -> Option<&'a mut dyn Any> + Send + Sync + 'static,
) -> ProjectMutThunk {
    Arc::new(f)
}

/// Select the fast-getter specialization for a field of boxed kind `KIND`.
///
/// The specialized variants go through a stack-local `Value`, so primitive
/// reads never allocate; values outside the slot's kind (e.g. a `None` in an
/// optional field) surface as `None` and are retried through the erased path.
fn fast_get_for<T: Any, F: ValueType>(get: fn(&T) -> F) -> FastGet {
    match F::KIND {
        ValueKind::Bool => FastGet::Bool(Arc::new(move |any| {
            any.downcast_ref::<T>().and_then(|t| get(t).into_value().as_bool())
        })),
        ValueKind::I32 | ValueKind::I64 => FastGet::I64(Arc::new(move |any| {
            any.downcast_ref::<T>().and_then(|t| get(t).into_value().as_i64())
        })),
        ValueKind::F64 => FastGet::F64(Arc::new(move |any| {
            any.downcast_ref::<T>().and_then(|t| get(t).into_value().as_f64())
        })),
        ValueKind::Str => FastGet::Str(Arc::new(move |any| {
            any.downcast_ref::<T>().and_then(|t| match get(t).into_value() {
                Value::Str(s) => Some(s),
                _ => None,
            })
        })),
        ValueKind::Null | ValueKind::Object => FastGet::Boxed(Arc::new(move |any| {
            any.downcast_ref::<T>().map(|t| get(t).into_value())
        })),
    }
}

// ============================================================================
// Field specs
// ============================================================================

/// Definition of one field, ready to be added to a [`ClassSpec`]
pub struct FieldSpec {
    raw: RawField,
}

impl FieldSpec {
    /// Read-write field backed by typed accessor functions
    pub fn new<T: Any, F: ValueType>(
        name: &str,
        get: fn(&T) -> F,
        set: fn(&mut T, F),
    ) -> Self {
        let mut spec = Self::readonly(name, get);
        spec.raw.modifiers.is_readonly = false;
        spec.raw.set = Some(Box::new(move |target: &mut dyn Any, value: &Value| {
            let got = (*target).type_id();
            let t = target
                .downcast_mut::<T>()
                .ok_or_else(|| receiver_mismatch::<T>(got))?;
            let v = F::from_value(value).ok_or_else(|| value_mismatch::<F>(value))?;
            set(t, v);
            Ok(())
        }));
        spec.raw.fast_set = Some(Arc::new(move |target: &mut dyn Any, value: &Value| {
            let t = target.downcast_mut::<T>()?;
            set(t, F::from_value(value)?);
            Some(())
        }) as FastSet);
        spec
    }

    /// Read-only field backed by a typed accessor function
    pub fn readonly<T: Any, F: ValueType>(name: &str, get: fn(&T) -> F) -> Self {
        let erased: GetThunk = Box::new(move |target: &dyn Any| {
            let t = target
                .downcast_ref::<T>()
                .ok_or_else(|| receiver_mismatch::<T>(target.type_id()))?;
            Ok(get(t).into_value())
        });
        FieldSpec {
            raw: RawField {
                name: name.to_string(),
                ty: F::type_ref(),
                generic: None,
                modifiers: Modifiers {
                    is_readonly: true,
                    ..Modifiers::default()
                },
                get: erased,
                set: None,
                fast_get: Some(fast_get_for::<T, F>(get)),
                fast_set: None,
            },
        }
    }

    /// Static read-only field (receiver ignored)
    pub fn static_readonly<F: ValueType>(name: &str, get: fn() -> F) -> Self {
        let erased: GetThunk = Box::new(move |_target: &dyn Any| Ok(get().into_value()));
        FieldSpec {
            raw: RawField {
                name: name.to_string(),
                ty: F::type_ref(),
                generic: None,
                modifiers: Modifiers {
                    is_static: true,
                    is_readonly: true,
                    ..Modifiers::default()
                },
                get: erased,
                set: None,
                fast_get: Some(FastGet::Boxed(Arc::new(move |_any| {
                    Some(get().into_value())
                }))),
                fast_set: None,
            },
        }
    }

    /// Field registered through capturing closures: erased path only, no
    /// fast accessor (dispatch-table synthesis is unavailable for it)
    pub fn dynamic(name: &str, ty: TypeRef, get: GetThunk, set: Option<SetThunk>) -> Self {
        let readonly = set.is_none();
        FieldSpec {
            raw: RawField {
                name: name.to_string(),
                ty,
                generic: None,
                modifiers: Modifiers {
                    is_readonly: readonly,
                    ..Modifiers::default()
                },
                get,
                set,
                fast_get: None,
                fast_set: None,
            },
        }
    }

    /// Attach the generic-type expression for this field
    pub fn generic_type(mut self, expr: TypeExpr) -> Self {
        self.raw.generic = Some(expr);
        self
    }

    /// Mark excluded from data binding
    pub fn transient(mut self) -> Self {
        self.raw.modifiers.is_transient = true;
        self
    }

    /// Mark non-public
    pub fn private(mut self) -> Self {
        self.raw.modifiers.is_public = false;
        self
    }

    /// Mark tool-synthesized; synthetic members are invisible to type models
    pub fn synthetic(mut self) -> Self {
        self.raw.modifiers.is_synthetic = true;
        self
    }
}

// ============================================================================
// Method specs
// ============================================================================

/// Definition of one method, ready to be added to a [`ClassSpec`]
pub struct MethodSpec {
    raw: RawMethod,
}

macro_rules! method_chainers {
    () => {
        /// Mark non-public
        pub fn private(mut self) -> Self {
            self.raw.modifiers.is_public = false;
            self
        }

        /// Mark tool-synthesized; synthetic members are invisible to type models
        pub fn synthetic(mut self) -> Self {
            self.raw.modifiers.is_synthetic = true;
            self
        }

        /// Attach a generic return-type expression
        pub fn generic_return(mut self, expr: TypeExpr) -> Self {
            self.raw.generic_return = Some(expr);
            self
        }
    };
}

impl MethodSpec {
    fn assemble(
        name: &str,
        params: Vec<TypeRef>,
        return_type: TypeRef,
        modifiers: Modifiers,
        body: Option<MethodBody>,
        fast: Option<FastMethod>,
    ) -> Self {
        MethodSpec {
            raw: RawMethod {
                name: name.to_string(),
                params,
                return_type,
                generic_return: None,
                modifiers,
                body,
                fast,
            },
        }
    }

    /// Zero-argument shared-receiver method
    pub fn ref0<T: Any, R: ValueType>(name: &str, f: fn(&T) -> R) -> Self {
        let body = MethodBody::Ref(Box::new(move |target: &dyn Any, _args: &[Value]| {
            let t = target
                .downcast_ref::<T>()
                .ok_or_else(|| receiver_mismatch::<T>(target.type_id()))?;
            Ok(f(t).into_value())
        }));
        let fast = FastMethod::Ref(Arc::new(move |target: &dyn Any, _args: &[Value]| {
            target.downcast_ref::<T>().map(|t| f(t).into_value())
        }));
        Self::assemble(
            name,
            Vec::new(),
            R::type_ref(),
            Modifiers::default(),
            Some(body),
            Some(fast),
        )
    }

    /// One-argument shared-receiver method
    pub fn ref1<T: Any, A: ValueType, R: ValueType>(name: &str, f: fn(&T, A) -> R) -> Self {
        let body = MethodBody::Ref(Box::new(move |target: &dyn Any, args: &[Value]| {
            let t = target
                .downcast_ref::<T>()
                .ok_or_else(|| receiver_mismatch::<T>(target.type_id()))?;
            let a = unbox_arg::<A>(args, 0)?;
            Ok(f(t, a).into_value())
        }));
        let fast = FastMethod::Ref(Arc::new(move |target: &dyn Any, args: &[Value]| {
            let t = target.downcast_ref::<T>()?;
            let a = A::from_value(args.first()?)?;
            Some(f(t, a).into_value())
        }));
        Self::assemble(
            name,
            vec![A::type_ref()],
            R::type_ref(),
            Modifiers::default(),
            Some(body),
            Some(fast),
        )
    }

    /// Two-argument shared-receiver method
    pub fn ref2<T: Any, A: ValueType, B: ValueType, R: ValueType>(
        name: &str,
        f: fn(&T, A, B) -> R,
    ) -> Self {
        let body = MethodBody::Ref(Box::new(move |target: &dyn Any, args: &[Value]| {
            let t = target
                .downcast_ref::<T>()
                .ok_or_else(|| receiver_mismatch::<T>(target.type_id()))?;
            let a = unbox_arg::<A>(args, 0)?;
            let b = unbox_arg::<B>(args, 1)?;
            Ok(f(t, a, b).into_value())
        }));
        let fast = FastMethod::Ref(Arc::new(move |target: &dyn Any, args: &[Value]| {
            let t = target.downcast_ref::<T>()?;
            let a = A::from_value(args.first()?)?;
            let b = B::from_value(args.get(1)?)?;
            Some(f(t, a, b).into_value())
        }));
        Self::assemble(
            name,
            vec![A::type_ref(), B::type_ref()],
            R::type_ref(),
            Modifiers::default(),
            Some(body),
            Some(fast),
        )
    }

    /// Zero-argument mutable-receiver method
    pub fn mut0<T: Any, R: ValueType>(name: &str, f: fn(&mut T) -> R) -> Self {
        let body = MethodBody::Mut(Box::new(move |target: &mut dyn Any, _args: &[Value]| {
            let got = (*target).type_id();
            let t = target
                .downcast_mut::<T>()
                .ok_or_else(|| receiver_mismatch::<T>(got))?;
            Ok(f(t).into_value())
        }));
        let fast = FastMethod::Mut(Arc::new(move |target: &mut dyn Any, _args: &[Value]| {
            target.downcast_mut::<T>().map(|t| f(t).into_value())
        }));
        Self::assemble(
            name,
            Vec::new(),
            R::type_ref(),
            Modifiers::default(),
            Some(body),
            Some(fast),
        )
    }

    /// One-argument mutable-receiver method
    pub fn mut1<T: Any, A: ValueType, R: ValueType>(name: &str, f: fn(&mut T, A) -> R) -> Self {
        let body = MethodBody::Mut(Box::new(move |target: &mut dyn Any, args: &[Value]| {
            let got = (*target).type_id();
            let t = target
                .downcast_mut::<T>()
                .ok_or_else(|| receiver_mismatch::<T>(got))?;
            let a = unbox_arg::<A>(args, 0)?;
            Ok(f(t, a).into_value())
        }));
        let fast = FastMethod::Mut(Arc::new(move |target: &mut dyn Any, args: &[Value]| {
            let a = A::from_value(args.first()?)?;
            let t = target.downcast_mut::<T>()?;
            Some(f(t, a).into_value())
        }));
        Self::assemble(
            name,
            vec![A::type_ref()],
            R::type_ref(),
            Modifiers::default(),
            Some(body),
            Some(fast),
        )
    }

    /// Two-argument mutable-receiver method
    pub fn mut2<T: Any, A: ValueType, B: ValueType, R: ValueType>(
        name: &str,
        f: fn(&mut T, A, B) -> R,
    ) -> Self {
        let body = MethodBody::Mut(Box::new(move |target: &mut dyn Any, args: &[Value]| {
            let got = (*target).type_id();
            let t = target
                .downcast_mut::<T>()
                .ok_or_else(|| receiver_mismatch::<T>(got))?;
            let a = unbox_arg::<A>(args, 0)?;
            let b = unbox_arg::<B>(args, 1)?;
            Ok(f(t, a, b).into_value())
        }));
        let fast = FastMethod::Mut(Arc::new(move |target: &mut dyn Any, args: &[Value]| {
            let a = A::from_value(args.first()?)?;
            let b = B::from_value(args.get(1)?)?;
            let t = target.downcast_mut::<T>()?;
            Some(f(t, a, b).into_value())
        }));
        Self::assemble(
            name,
            vec![A::type_ref(), B::type_ref()],
            R::type_ref(),
            Modifiers::default(),
            Some(body),
            Some(fast),
        )
    }

    /// Zero-argument static method
    pub fn static0<R: ValueType>(name: &str, f: fn() -> R) -> Self {
        let body = MethodBody::Static(Box::new(move |_args: &[Value]| Ok(f().into_value())));
        let fast = FastMethod::Static(Arc::new(move |_args: &[Value]| Some(f().into_value())));
        Self::assemble(
            name,
            Vec::new(),
            R::type_ref(),
            Modifiers {
                is_static: true,
                ..Modifiers::default()
            },
            Some(body),
            Some(fast),
        )
    }

    /// One-argument static method
    pub fn static1<A: ValueType, R: ValueType>(name: &str, f: fn(A) -> R) -> Self {
        let body = MethodBody::Static(Box::new(move |args: &[Value]| {
            let a = unbox_arg::<A>(args, 0)?;
            Ok(f(a).into_value())
        }));
        let fast = FastMethod::Static(Arc::new(move |args: &[Value]| {
            let a = A::from_value(args.first()?)?;
            Some(f(a).into_value())
        }));
        Self::assemble(
            name,
            vec![A::type_ref()],
            R::type_ref(),
            Modifiers {
                is_static: true,
                ..Modifiers::default()
            },
            Some(body),
            Some(fast),
        )
    }

    /// Abstract declaration: recorded as a member, never dispatchable
    pub fn abstract_decl(name: &str, params: Vec<TypeRef>, return_type: TypeRef) -> Self {
        Self::assemble(
            name,
            params,
            return_type,
            Modifiers {
                is_abstract: true,
                ..Modifiers::default()
            },
            None,
            None,
        )
    }

    /// Method registered through a capturing closure: erased path only
    pub fn dynamic(
        name: &str,
        params: Vec<TypeRef>,
        return_type: TypeRef,
        body: MethodBody,
    ) -> Self {
        Self::assemble(
            name,
            params,
            return_type,
            Modifiers::default(),
            Some(body),
            None,
        )
    }

    method_chainers!();
}

// ============================================================================
// Constructor specs
// ============================================================================

/// Definition of one constructor, ready to be added to a [`ClassSpec`]
pub struct ConstructorSpec {
    raw: RawConstructor,
}

impl ConstructorSpec {
    /// Zero-argument constructor (becomes the default constructor)
    pub fn new0<T: Any + Send + Sync>(f: fn() -> T) -> Self {
        let erased: ConstructThunk =
            Box::new(move |_args: &[Value]| Ok(Box::new(f()) as Box<dyn Any + Send + Sync>));
        let fast: FastConstruct = Arc::new(move || Box::new(f()) as Box<dyn Any + Send + Sync>);
        ConstructorSpec {
            raw: RawConstructor {
                params: Vec::new(),
                modifiers: Modifiers::default(),
                construct: erased,
                fast: Some(fast),
            },
        }
    }

    /// One-argument constructor
    pub fn new1<T: Any + Send + Sync, A: ValueType>(f: fn(A) -> T) -> Self {
        let erased: ConstructThunk = Box::new(move |args: &[Value]| {
            let a = unbox_arg::<A>(args, 0)?;
            Ok(Box::new(f(a)) as Box<dyn Any + Send + Sync>)
        });
        ConstructorSpec {
            raw: RawConstructor {
                params: vec![A::type_ref()],
                modifiers: Modifiers::default(),
                construct: erased,
                fast: None,
            },
        }
    }

    /// Two-argument constructor
    pub fn new2<T: Any + Send + Sync, A: ValueType, B: ValueType>(f: fn(A, B) -> T) -> Self {
        let erased: ConstructThunk = Box::new(move |args: &[Value]| {
            let a = unbox_arg::<A>(args, 0)?;
            let b = unbox_arg::<B>(args, 1)?;
            Ok(Box::new(f(a, b)) as Box<dyn Any + Send + Sync>)
        });
        ConstructorSpec {
            raw: RawConstructor {
                params: vec![A::type_ref(), B::type_ref()],
                modifiers: Modifiers::default(),
                construct: erased,
                fast: None,
            },
        }
    }

    /// Constructor registered through a capturing closure: erased path only
    pub fn dynamic(params: Vec<TypeRef>, construct: ConstructThunk) -> Self {
        ConstructorSpec {
            raw: RawConstructor {
                params,
                modifiers: Modifiers::default(),
                construct,
                fast: None,
            },
        }
    }

    /// Mark non-public
    pub fn private(mut self) -> Self {
        self.raw.modifiers.is_public = false;
        self
    }
}

// ============================================================================
// Class spec
// ============================================================================

/// Complete registration spec for one type
pub struct ClassSpec {
    raw: RawClass,
}

impl ClassSpec {
    /// Spec for a concrete type
    pub fn new<T: Any + Send + Sync>(name: &str) -> Self {
        ClassSpec {
            raw: RawClass {
                name: name.to_string(),
                ty: TypeRef::of::<T>(),
                kind: ClassKind::Class,
                type_params: Vec::new(),
                parent: None,
                interfaces: Vec::new(),
                enclosing: None,
                fields: Vec::new(),
                methods: Vec::new(),
                constructors: Vec::new(),
                constants: Vec::new(),
            },
        }
    }

    /// Spec for an interface (abstract declarations only)
    pub fn interface<T: Any + ?Sized>(name: &str) -> Self {
        ClassSpec {
            raw: RawClass {
                name: name.to_string(),
                ty: TypeRef::of::<T>(),
                kind: ClassKind::Interface,
                type_params: Vec::new(),
                parent: None,
                interfaces: Vec::new(),
                enclosing: None,
                fields: Vec::new(),
                methods: Vec::new(),
                constructors: Vec::new(),
                constants: Vec::new(),
            },
        }
    }

    /// Declare a type parameter (order matters)
    pub fn type_param(mut self, name: &str) -> Self {
        self.raw.type_params.push(name.to_string());
        self
    }

    /// Declare a non-parameterized parent, with the embedding projections
    /// that reach the parent fragment inside a child instance
    pub fn extends<T: Any, P: Any>(
        self,
        project: fn(&T) -> &P,
        project_mut: fn(&mut T) -> &mut P,
    ) -> Self {
        self.extends_parameterized::<T, P>(Vec::new(), project, project_mut)
    }

    /// Declare a parameterized parent occurrence (e.g. `Box<String>`)
    pub fn extends_parameterized<T: Any, P: Any>(
        mut self,
        args: Vec<TypeExpr>,
        project: fn(&T) -> &P,
        project_mut: fn(&mut T) -> &mut P,
    ) -> Self {
        let ty = TypeRef::of::<P>();
        let expr = if args.is_empty() {
            TypeExpr::Concrete(ty)
        } else {
            TypeExpr::parameterized(ty, args)
        };
        self.raw.parent = Some(ParentEdge {
            ty,
            expr,
            project: project_thunk(move |any| {
                any.downcast_ref::<T>().map(|t| project(t) as &dyn Any)
            }),
            project_mut: project_mut_thunk(move |any| {
                any.downcast_mut::<T>().map(|t| project_mut(t) as &mut dyn Any)
            }),
        });
        self
    }

    /// Declare an implemented interface occurrence
    pub fn implements(mut self, expr: TypeExpr) -> Self {
        self.raw.interfaces.push(expr);
        self
    }

    /// Declare the enclosing type occurrence, for nested types
    pub fn enclosed_by(mut self, expr: TypeExpr) -> Self {
        self.raw.enclosing = Some(expr);
        self
    }

    /// Add a field
    pub fn add_field(mut self, field: FieldSpec) -> Self {
        self.raw.fields.push(field.raw);
        self
    }

    /// Add a method
    pub fn add_method(mut self, method: MethodSpec) -> Self {
        self.raw.methods.push(method.raw);
        self
    }

    /// Add a constructor
    pub fn add_constructor(mut self, ctor: ConstructorSpec) -> Self {
        self.raw.constructors.push(ctor.raw);
        self
    }

    /// Finish without registering (used by [`EnumSpec`] and tests)
    pub fn build(self) -> RawClass {
        self.raw
    }

    /// Register globally; insert-if-absent, the retained entry is returned
    pub fn register(self) -> Arc<RawClass> {
        registry::register(self.raw)
    }
}

// ============================================================================
// Enum spec
// ============================================================================

/// Registration spec for an enumeration
pub struct EnumSpec<E> {
    class: ClassSpec,
    _marker: PhantomData<E>,
}

impl<E: Any + Send + Sync> EnumSpec<E> {
    /// Spec for an enum type
    pub fn new(name: &str) -> Self {
        let mut class = ClassSpec::new::<E>(name);
        class.raw.kind = ClassKind::Enum;
        EnumSpec {
            class,
            _marker: PhantomData,
        }
    }

    /// Declare a constant; declaration order is significant for reverse
    /// lookup
    pub fn constant(mut self, name: &str, instance: E) -> Self {
        self.class.raw.constants.push(EnumConstant {
            name: name.to_string(),
            instance: Value::object(instance),
        });
        self
    }

    /// Add a field (a field named `value` drives the enum value model)
    pub fn add_field(mut self, field: FieldSpec) -> Self {
        self.class = self.class.add_field(field);
        self
    }

    /// Add a method
    pub fn add_method(mut self, method: MethodSpec) -> Self {
        self.class = self.class.add_method(method);
        self
    }

    /// Register globally; insert-if-absent, the retained entry is returned
    pub fn register(self) -> Arc<RawClass> {
        self.class.register()
    }
}
