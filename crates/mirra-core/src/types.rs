//! Concrete type handles and generic-type expressions
//!
//! `TypeRef` identifies a concrete Rust type by `TypeId`. `TypeExpr` is the
//! symbolic form a registration may attach to a member whose declared type
//! mentions type parameters; the resolver reduces expressions to
//! `ConcreteType` against a concrete owner.

use std::any::{type_name, Any, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};

/// Marker behind [`TypeRef::any`], the universal top type
struct AnyType;

/// Lightweight handle for a concrete type
#[derive(Clone, Copy)]
pub struct TypeRef {
    id: TypeId,
    name: &'static str,
}

impl TypeRef {
    /// Handle for a concrete Rust type
    pub fn of<T: Any + ?Sized>() -> Self {
        TypeRef {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
        }
    }

    /// The universal top type: every type is assignable to it
    pub fn any() -> Self {
        TypeRef {
            id: TypeId::of::<AnyType>(),
            name: "any",
        }
    }

    /// Underlying `TypeId`
    #[inline]
    pub fn id(&self) -> TypeId {
        self.id
    }

    /// Fully-qualified Rust type name
    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Whether this is the universal top type
    pub fn is_any(&self) -> bool {
        self.id == TypeId::of::<AnyType>()
    }

    /// Whether this handle names `T`
    pub fn is<T: Any + ?Sized>(&self) -> bool {
        self.id == TypeId::of::<T>()
    }

    /// Structural assignability at the value level: identity, the top type,
    /// or the boxed-primitive widenings (`i32` fits an `i64` or `f64` slot,
    /// `i64` fits an `f64` slot). Registered-subtype assignability is layered
    /// on top by the class registry.
    pub fn is_assignable_from(&self, other: &TypeRef) -> bool {
        if self.id == other.id || self.is_any() {
            return true;
        }
        if self.is::<i64>() && other.is::<i32>() {
            return true;
        }
        if self.is::<f64>() && (other.is::<i32>() || other.is::<i64>()) {
            return true;
        }
        false
    }
}

impl PartialEq for TypeRef {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeRef {}

impl Hash for TypeRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeRef({})", self.name)
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Generic-type expression attached to a member at registration time
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeExpr {
    /// A concrete type, needing no resolution
    Concrete(TypeRef),
    /// A type variable, e.g. `T` declared by `Box<T>`
    Variable {
        /// Parameter name as declared (e.g. "T")
        name: String,
        /// Type that declares the parameter
        declared_by: TypeRef,
        /// Declared upper bounds, outermost first
        bounds: Vec<TypeExpr>,
    },
    /// A parameterized occurrence, e.g. `List<T>` or `Box<String>`
    Parameterized {
        /// The raw (unapplied) type
        raw: TypeRef,
        /// Type arguments in declaration order
        args: Vec<TypeExpr>,
    },
    /// An array of some element expression
    Array(Box<TypeExpr>),
    /// A wildcard, optionally bounded above
    Wildcard {
        /// Upper bounds, outermost first; empty means unbounded
        upper: Vec<TypeExpr>,
    },
}

impl TypeExpr {
    /// Concrete expression for a Rust type
    pub fn concrete<T: Any + ?Sized>() -> Self {
        TypeExpr::Concrete(TypeRef::of::<T>())
    }

    /// Unbounded type variable declared by `declared_by`
    pub fn variable(name: impl Into<String>, declared_by: TypeRef) -> Self {
        TypeExpr::Variable {
            name: name.into(),
            declared_by,
            bounds: Vec::new(),
        }
    }

    /// Bounded type variable
    pub fn variable_bounded(
        name: impl Into<String>,
        declared_by: TypeRef,
        bounds: Vec<TypeExpr>,
    ) -> Self {
        TypeExpr::Variable {
            name: name.into(),
            declared_by,
            bounds,
        }
    }

    /// Parameterized occurrence of `raw`
    pub fn parameterized(raw: TypeRef, args: Vec<TypeExpr>) -> Self {
        TypeExpr::Parameterized { raw, args }
    }

    /// Array of `elem`
    pub fn array(elem: TypeExpr) -> Self {
        TypeExpr::Array(Box::new(elem))
    }

    /// Unbounded wildcard (`?`)
    pub fn wildcard() -> Self {
        TypeExpr::Wildcard { upper: Vec::new() }
    }

    /// Wildcard bounded above (`? extends X`)
    pub fn wildcard_extends(upper: TypeExpr) -> Self {
        TypeExpr::Wildcard { upper: vec![upper] }
    }
}

/// Fully-resolved type produced by the generic resolver
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ConcreteType {
    /// A single concrete type
    Class(TypeRef),
    /// Array of a resolved component
    Array(Box<ConcreteType>),
    /// The universal top type
    Any,
}

impl ConcreteType {
    /// The underlying class handle, if this is not an array or the top type
    pub fn class(&self) -> Option<TypeRef> {
        match self {
            ConcreteType::Class(t) => Some(*t),
            _ => None,
        }
    }

    /// Whether this is the universal top type
    pub fn is_any(&self) -> bool {
        matches!(self, ConcreteType::Any)
    }

    /// Display name, `"elem[]"` for arrays
    pub fn name(&self) -> String {
        match self {
            ConcreteType::Class(t) => t.name().to_string(),
            ConcreteType::Array(elem) => format!("{}[]", elem.name()),
            ConcreteType::Any => "any".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_ref_identity() {
        assert_eq!(TypeRef::of::<String>(), TypeRef::of::<String>());
        assert_ne!(TypeRef::of::<String>(), TypeRef::of::<i32>());
        assert!(TypeRef::of::<i32>().is::<i32>());
    }

    #[test]
    fn test_any_assignable_from_everything() {
        let any = TypeRef::any();
        assert!(any.is_any());
        assert!(any.is_assignable_from(&TypeRef::of::<String>()));
        assert!(any.is_assignable_from(&TypeRef::of::<bool>()));
    }

    #[test]
    fn test_widening_assignability() {
        let i64_ref = TypeRef::of::<i64>();
        let f64_ref = TypeRef::of::<f64>();
        assert!(i64_ref.is_assignable_from(&TypeRef::of::<i32>()));
        assert!(f64_ref.is_assignable_from(&TypeRef::of::<i64>()));
        assert!(!TypeRef::of::<i32>().is_assignable_from(&i64_ref));
    }

    #[test]
    fn test_expr_equality_for_cache_keys() {
        let owner = TypeRef::of::<String>();
        let a = TypeExpr::variable("T", owner);
        let b = TypeExpr::variable("T", owner);
        assert_eq!(a, b);
        assert_ne!(a, TypeExpr::variable("U", owner));
    }

    #[test]
    fn test_concrete_type_names() {
        let elem = ConcreteType::Class(TypeRef::of::<i32>());
        let arr = ConcreteType::Array(Box::new(elem));
        assert_eq!(arr.name(), "i32[]");
        assert_eq!(ConcreteType::Any.name(), "any");
    }
}
