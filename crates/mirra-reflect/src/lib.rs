//! Mirra reflection core
//!
//! Cached per-type metadata with a synthesized fast-accessor path:
//!
//! - **Type models** (`model`): per-type member discovery over the
//!   registered class graph, memoized process-wide, built at most once per
//!   type per process lifetime.
//! - **Member models** (`member`): fields, methods, and constructors in
//!   uniform queryable form, with getter/setter pairing resolved by a staged
//!   name heuristic.
//! - **Accessor engine** (`engine`): dense index-keyed dispatch tables for
//!   construct/invoke/get/set, synthesized from typed accessors at model
//!   build time and degradable per member to the erased substrate path.
//! - **Generic resolver** (`generics`): reduces type-variable, parameterized,
//!   array, and wildcard expressions against a concrete owner's ancestry.
//! - **Enum models** (`enums`): `value`-field detection and bidirectional
//!   constant/value lookup.
//!
//! All operations execute synchronously on the caller's thread; the only
//! shared state is the process-wide caches, which insert at most once per
//! key.
//!
//! # Example
//!
//! ```rust,ignore
//! use mirra_reflect::TypeModel;
//! use mirra_core::Value;
//!
//! let model = TypeModel::of::<User>()?;
//! let mut user = model.new_instance()?;
//! let name = model.field("name").unwrap();
//! name.set_value(user.as_mut(), &Value::str("ada"), true)?;
//! assert_eq!(name.get_value(user.as_ref(), true)?.as_str(), Some("ada"));
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod engine;
pub mod enums;
pub mod error;
pub mod generics;
pub mod member;
pub mod model;

pub use engine::{set_synthesis_default, synthesis_default, AccessorEngine, SynthesisPolicy};
pub use enums::{EnumConstantModel, EnumModel};
pub use error::{ReflectError, ReflectResult};
pub use generics::GenericTypeResolver;
pub use member::{ConstructorModel, FieldModel, MethodModel};
pub use model::TypeModel;
