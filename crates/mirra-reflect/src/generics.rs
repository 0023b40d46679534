//! Generic type resolution
//!
//! Reduces a generic-type expression to a concrete type against the ancestry
//! of a concrete owner: `Box<T>` declares `items: List<T>`, `StringBox`
//! extends `Box<String>`, so resolving `T` against `StringBox` yields
//! `String`. The substitution table records every concrete type argument
//! supplied along the owner's supertype, interface, and enclosing-type
//! edges; variables absent from the table fall back to their first declared
//! upper bound, and then to the universal top type.
//!
//! Results are memoized process-wide by `(expression, owner)`,
//! insert-if-absent.

use std::any::TypeId;
use std::collections::HashSet;

use dashmap::DashMap;
use once_cell::sync::Lazy;
use rustc_hash::FxHashMap;

use mirra_core::registry;
use mirra_core::{ConcreteType, TypeExpr, TypeRef};

use crate::error::{ReflectError, ReflectResult};

static RESOLVED: Lazy<DashMap<(TypeExpr, TypeId), ConcreteType>> = Lazy::new(DashMap::new);

/// Resolver for generic-type expressions against a concrete owner
pub struct GenericTypeResolver;

impl GenericTypeResolver {
    /// Resolve `expr` against `owner`'s ancestry. Memoized by
    /// `(expr, owner)`; concurrent first-time resolutions may race and one
    /// result is retained.
    pub fn resolve(expr: &TypeExpr, owner: TypeRef) -> ReflectResult<ConcreteType> {
        let key = (expr.clone(), owner.id());
        if let Some(hit) = RESOLVED.get(&key) {
            return Ok(hit.clone());
        }
        let table = SubstitutionTable::build(owner);
        let resolved = resolve_in(expr, &table, &mut Vec::new())?;
        let published = RESOLVED.entry(key).or_insert(resolved).clone();
        tracing::trace!(owner = %owner, resolved = %published.name(), "resolved type expression");
        Ok(published)
    }

    /// Resolve a Rust-typed owner's expression
    pub fn resolve_for<T: std::any::Any + ?Sized>(expr: &TypeExpr) -> ReflectResult<ConcreteType> {
        Self::resolve(expr, TypeRef::of::<T>())
    }
}

/// Bindings from (declaring type, parameter name) to the argument expression
/// supplied somewhere along one owner's ancestry
struct SubstitutionTable {
    bindings: FxHashMap<(TypeId, String), TypeExpr>,
}

impl SubstitutionTable {
    /// Walk the owner's supertypes, implemented interfaces, and enclosing
    /// types, recording each concrete type argument at every parameterized
    /// occurrence. The most-derived occurrence of a binding wins.
    fn build(owner: TypeRef) -> Self {
        let mut bindings = FxHashMap::default();
        let mut visited: HashSet<TypeId> = HashSet::new();
        let mut queue = vec![owner.id()];
        while let Some(id) = queue.pop() {
            if !visited.insert(id) {
                continue;
            }
            let Some(raw) = registry::lookup(id) else {
                continue;
            };
            if let Some(edge) = &raw.parent {
                record(&mut bindings, &mut queue, &edge.expr);
            }
            for interface in &raw.interfaces {
                record(&mut bindings, &mut queue, interface);
            }
            if let Some(enclosing) = &raw.enclosing {
                record(&mut bindings, &mut queue, enclosing);
            }
        }
        SubstitutionTable { bindings }
    }

    fn lookup(&self, declared_by: TypeId, name: &str) -> Option<&TypeExpr> {
        self.bindings.get(&(declared_by, name.to_string()))
    }
}

fn record(
    bindings: &mut FxHashMap<(TypeId, String), TypeExpr>,
    queue: &mut Vec<TypeId>,
    occurrence: &TypeExpr,
) {
    match occurrence {
        TypeExpr::Parameterized { raw, args } => {
            if let Some(decl) = registry::lookup(raw.id()) {
                for (param, arg) in decl.type_params.iter().zip(args) {
                    bindings
                        .entry((raw.id(), param.clone()))
                        .or_insert_with(|| arg.clone());
                }
            }
            queue.push(raw.id());
        }
        TypeExpr::Concrete(ty) => queue.push(ty.id()),
        _ => {}
    }
}

/// Reduce an expression against a built table. `seen` guards against
/// pathological variable cycles, which degrade to the top type.
fn resolve_in(
    expr: &TypeExpr,
    table: &SubstitutionTable,
    seen: &mut Vec<(TypeId, String)>,
) -> ReflectResult<ConcreteType> {
    match expr {
        TypeExpr::Concrete(ty) => Ok(ConcreteType::Class(*ty)),
        TypeExpr::Variable {
            name,
            declared_by,
            bounds,
        } => {
            let decl = registry::lookup(declared_by.id()).ok_or_else(|| {
                ReflectError::UnsupportedTypeExpression {
                    detail: format!(
                        "type variable `{name}` declared by unregistered type `{declared_by}`"
                    ),
                }
            })?;
            if !decl.type_params.iter().any(|p| p == name) {
                return Err(ReflectError::UnsupportedTypeExpression {
                    detail: format!("`{}` declares no type parameter `{name}`", decl.name),
                });
            }
            let key = (declared_by.id(), name.clone());
            if seen.contains(&key) {
                return Ok(ConcreteType::Any);
            }
            seen.push(key);
            if let Some(bound_expr) = table.lookup(declared_by.id(), name) {
                return resolve_in(bound_expr, table, seen);
            }
            match bounds.first() {
                Some(upper) => resolve_in(upper, table, seen),
                None => Ok(ConcreteType::Any),
            }
        }
        TypeExpr::Parameterized { raw, .. } => Ok(ConcreteType::Class(*raw)),
        TypeExpr::Array(elem) => Ok(ConcreteType::Array(Box::new(resolve_in(
            elem, table, seen,
        )?))),
        TypeExpr::Wildcard { upper } => match upper.first() {
            Some(bound) => resolve_in(bound, table, seen),
            None => Ok(ConcreteType::Any),
        },
    }
}
