//! Global raw-class registry
//!
//! Process-wide, lazily created, never torn down. Insert-if-absent: when two
//! threads race to register the same type, the first insert wins and both
//! observe the retained entry.

use std::any::{Any, TypeId};
use std::sync::Arc;

use dashmap::DashMap;
use once_cell::sync::Lazy;

use crate::class::RawClass;
use crate::types::TypeRef;

static CLASSES: Lazy<DashMap<TypeId, Arc<RawClass>>> = Lazy::new(DashMap::new);
static BY_NAME: Lazy<DashMap<String, TypeId>> = Lazy::new(DashMap::new);

/// Register metadata for a type. Insert-if-absent: a second registration for
/// the same type is discarded and the retained entry returned.
pub fn register(raw: RawClass) -> Arc<RawClass> {
    let id = raw.ty.id();
    let name = raw.name.clone();
    let entry = CLASSES.entry(id).or_insert_with(|| {
        tracing::debug!(class = %name, "registered raw class");
        Arc::new(raw)
    });
    let retained = entry.clone();
    drop(entry);
    BY_NAME.entry(retained.name.clone()).or_insert(id);
    retained
}

/// Look up metadata by type id
pub fn lookup(id: TypeId) -> Option<Arc<RawClass>> {
    CLASSES.get(&id).map(|e| e.clone())
}

/// Look up metadata for a Rust type
pub fn lookup_of<T: Any + ?Sized>() -> Option<Arc<RawClass>> {
    lookup(TypeId::of::<T>())
}

/// Look up metadata by registered name
pub fn lookup_by_name(name: &str) -> Option<Arc<RawClass>> {
    BY_NAME.get(name).and_then(|id| lookup(*id))
}

/// Registered display name for a type id, or a placeholder for unregistered
/// types (used in receiver-mismatch errors)
pub fn display_name(id: TypeId) -> String {
    match lookup(id) {
        Some(raw) => raw.name.clone(),
        None => "{unregistered}".to_string(),
    }
}

/// Whether `sub` is `sup` or a registered descendant of it
pub fn is_subclass_of(sub: TypeId, sup: TypeId) -> bool {
    if sub == sup {
        return true;
    }
    let mut current = lookup(sub);
    while let Some(raw) = current {
        match &raw.parent {
            Some(edge) if edge.ty.id() == sup => return true,
            Some(edge) => current = lookup(edge.ty.id()),
            None => break,
        }
    }
    false
}

/// Inheritance chain for a type: the type itself first, root ancestor last.
/// Unregistered links truncate the walk.
pub fn hierarchy(id: TypeId) -> Vec<Arc<RawClass>> {
    let mut chain = Vec::new();
    let mut current = lookup(id);
    while let Some(raw) = current {
        let next = raw.parent.as_ref().map(|edge| edge.ty.id());
        chain.push(raw);
        current = next.and_then(lookup);
    }
    chain
}

/// Assignability including registered subtyping: structural assignability
/// (identity, top type, boxed widenings) or `from` being a registered
/// descendant of `to`
pub fn is_assignable(to: &TypeRef, from: &TypeRef) -> bool {
    to.is_assignable_from(from) || is_subclass_of(from.id(), to.id())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::ClassSpec;

    struct Animal {
        legs: i64,
    }

    struct Dog {
        base: Animal,
    }

    fn register_fixtures() {
        ClassSpec::new::<Animal>("registry::Animal")
            .add_field(crate::builder::FieldSpec::new::<Animal, i64>(
                "legs",
                |a| a.legs,
                |a, v| a.legs = v,
            ))
            .register();
        ClassSpec::new::<Dog>("registry::Dog")
            .extends::<Dog, Animal>(|d| &d.base, |d| &mut d.base)
            .register();
    }

    #[test]
    fn test_register_is_insert_if_absent() {
        register_fixtures();
        let first = lookup_of::<Animal>().unwrap();
        // A second registration for the same type is discarded
        let second = ClassSpec::new::<Animal>("registry::AnimalAgain").register();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(second.name, "registry::Animal");
    }

    #[test]
    fn test_lookup_by_name() {
        register_fixtures();
        let raw = lookup_by_name("registry::Dog").unwrap();
        assert!(raw.ty.is::<Dog>());
        assert!(lookup_by_name("registry::Nothing").is_none());
    }

    #[test]
    fn test_subclass_walk() {
        register_fixtures();
        let animal = TypeId::of::<Animal>();
        let dog = TypeId::of::<Dog>();
        assert!(is_subclass_of(dog, animal));
        assert!(is_subclass_of(dog, dog));
        assert!(!is_subclass_of(animal, dog));

        let chain = hierarchy(dog);
        assert_eq!(chain.len(), 2);
        assert_eq!(chain[0].name, "registry::Dog");
        assert_eq!(chain[1].name, "registry::Animal");
    }

    #[test]
    fn test_assignability_includes_subtyping() {
        register_fixtures();
        let animal = TypeRef::of::<Animal>();
        let dog = TypeRef::of::<Dog>();
        assert!(is_assignable(&animal, &dog));
        assert!(!is_assignable(&dog, &animal));
    }
}
