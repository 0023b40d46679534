//! Mirra metadata substrate
//!
//! This crate provides the environment the reflection core consumes: the
//! host type-introspection facility (class metadata registration plus the
//! erased, always-correct call path), the primitive box/unbox utility
//! (`Value` / `ValueType`), and a precondition-assertion macro (`ensure!`).
//!
//! The reflection core itself — cached type models, accessor dispatch
//! tables, generic type resolution, enum value models — lives in
//! `mirra-reflect` and treats everything here as its fallback substrate.
//!
//! # Example
//!
//! ```rust,ignore
//! use mirra_core::builder::{ClassSpec, ConstructorSpec, FieldSpec, MethodSpec};
//!
//! #[derive(Default)]
//! struct User {
//!     name: String,
//!     age: i64,
//! }
//!
//! ClassSpec::new::<User>("User")
//!     .add_constructor(ConstructorSpec::new0(User::default))
//!     .add_field(FieldSpec::new::<User, String>(
//!         "name",
//!         |u| u.name.clone(),
//!         |u, v| u.name = v,
//!     ))
//!     .add_method(MethodSpec::ref0::<User, i64>("getAge", |u| u.age))
//!     .register();
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod builder;
pub mod class;
pub mod error;
pub mod registry;
pub mod types;
pub mod value;

pub use builder::{ClassSpec, ConstructorSpec, EnumSpec, FieldSpec, MethodSpec};
pub use class::{
    ClassKind, EnumConstant, FastConstruct, FastGet, FastMethod, FastSet, MethodBody, Modifiers,
    ParentEdge, RawClass, RawConstructor, RawField, RawMethod,
};
pub use error::{CoreError, CoreResult};
pub use types::{ConcreteType, TypeExpr, TypeRef};
pub use value::{Value, ValueKind, ValueType};
