//! Generic resolution against a registered class graph: the substitution
//! walk over supertype/interface/enclosing edges, bound and wildcard
//! fallbacks, and resolved field types on models.

use std::sync::{Arc, Once};

use mirra_core::builder::{ClassSpec, FieldSpec, MethodSpec};
use mirra_core::{ConcreteType, TypeExpr, TypeRef};
use mirra_reflect::{GenericTypeResolver, ReflectError, TypeModel};

// ============================================================================
// Fixtures: Container<T> { items: List<T> }, StringBox extends
// Container<String>, plus a parameterized interface and a nested type
// ============================================================================

/// Stand-in for the element-list type constructor
struct List;

struct Container {
    items: Vec<String>,
}

struct StringBox {
    base: Container,
}

/// Unbound container: its field keeps a wildcard argument
struct LooseBox {
    #[allow(dead_code)]
    items: Vec<String>,
}

trait Keyed {}

struct Session {
    key: String,
}

struct Outer;

struct Inner {
    #[allow(dead_code)]
    slot: i64,
}

static REGISTER: Once = Once::new();

fn register_fixtures() {
    REGISTER.call_once(|| {
        ClassSpec::interface::<List>("List").type_param("E").register();

        let container = TypeRef::of::<Container>();
        ClassSpec::new::<Container>("Container")
            .type_param("T")
            .add_field(
                FieldSpec::readonly::<Container, Arc<Vec<String>>>("items", |c| {
                    Arc::new(c.items.clone())
                })
                .generic_type(TypeExpr::parameterized(
                    TypeRef::of::<List>(),
                    vec![TypeExpr::variable("T", container)],
                )),
            )
            .register();

        ClassSpec::new::<StringBox>("StringBox")
            .extends_parameterized::<StringBox, Container>(
                vec![TypeExpr::concrete::<String>()],
                |b| &b.base,
                |b| &mut b.base,
            )
            .register();

        ClassSpec::new::<LooseBox>("LooseBox")
            .add_field(
                FieldSpec::readonly::<LooseBox, i64>("items", |_| 0).generic_type(
                    TypeExpr::parameterized(
                        TypeRef::of::<List>(),
                        vec![TypeExpr::wildcard()],
                    ),
                ),
            )
            .register();

        ClassSpec::interface::<dyn Keyed>("Keyed").type_param("K").register();

        ClassSpec::new::<Session>("Session")
            .implements(TypeExpr::parameterized(
                TypeRef::of::<dyn Keyed>(),
                vec![TypeExpr::concrete::<String>()],
            ))
            .add_field(FieldSpec::new::<Session, String>(
                "key",
                |s| s.key.clone(),
                |s, v| s.key = v,
            ))
            .add_method(MethodSpec::ref0::<Session, String>("getKey", |s| {
                s.key.clone()
            }))
            .register();

        ClassSpec::interface::<Outer>("Outer").type_param("O").register();

        ClassSpec::new::<Inner>("Inner")
            .enclosed_by(TypeExpr::parameterized(
                TypeRef::of::<Outer>(),
                vec![TypeExpr::concrete::<i64>()],
            ))
            .register();
    });
}

// ============================================================================
// Resolution
// ============================================================================

mod resolution {
    use super::*;

    #[test]
    fn test_type_argument_resolves_through_subclass() {
        register_fixtures();
        let t = TypeExpr::variable("T", TypeRef::of::<Container>());
        let resolved =
            GenericTypeResolver::resolve(&t, TypeRef::of::<StringBox>()).unwrap();
        assert_eq!(resolved, ConcreteType::Class(TypeRef::of::<String>()));
    }

    #[test]
    fn test_field_resolved_type_is_raw_container() {
        register_fixtures();
        let model = TypeModel::of::<StringBox>().unwrap();
        let items = model.field("items").unwrap();
        // the parameterized field expression reduces to its raw type
        assert_eq!(
            items.resolved_type().unwrap(),
            &ConcreteType::Class(TypeRef::of::<List>())
        );
        assert!(items.generic_type().is_some());
    }

    #[test]
    fn test_wildcard_argument_resolves_to_top_type() {
        register_fixtures();
        let resolved = GenericTypeResolver::resolve(
            &TypeExpr::wildcard(),
            TypeRef::of::<LooseBox>(),
        )
        .unwrap();
        assert_eq!(resolved, ConcreteType::Any);
    }

    #[test]
    fn test_interface_edge_supplies_bindings() {
        register_fixtures();
        let k = TypeExpr::variable("K", TypeRef::of::<dyn Keyed>());
        let resolved = GenericTypeResolver::resolve(&k, TypeRef::of::<Session>()).unwrap();
        assert_eq!(resolved, ConcreteType::Class(TypeRef::of::<String>()));
    }

    #[test]
    fn test_enclosing_edge_supplies_bindings() {
        register_fixtures();
        let o = TypeExpr::variable("O", TypeRef::of::<Outer>());
        let resolved = GenericTypeResolver::resolve(&o, TypeRef::of::<Inner>()).unwrap();
        assert_eq!(resolved, ConcreteType::Class(TypeRef::of::<i64>()));
    }

    #[test]
    fn test_generic_array_forms_array_of_component() {
        register_fixtures();
        let arr = TypeExpr::array(TypeExpr::variable("T", TypeRef::of::<Container>()));
        let resolved =
            GenericTypeResolver::resolve(&arr, TypeRef::of::<StringBox>()).unwrap();
        assert_eq!(
            resolved,
            ConcreteType::Array(Box::new(ConcreteType::Class(TypeRef::of::<String>())))
        );
        assert_eq!(resolved.name(), format!("{}[]", TypeRef::of::<String>().name()));
    }

    #[test]
    fn test_repeated_resolution_is_stable() {
        register_fixtures();
        let t = TypeExpr::variable("T", TypeRef::of::<Container>());
        let owner = TypeRef::of::<StringBox>();
        let first = GenericTypeResolver::resolve(&t, owner).unwrap();
        let second = GenericTypeResolver::resolve(&t, owner).unwrap();
        assert_eq!(first, second);
    }
}

// ============================================================================
// Malformed expressions
// ============================================================================

mod malformed {
    use super::*;

    #[test]
    fn test_variable_of_unregistered_declarer_is_unsupported() {
        register_fixtures();
        struct Nowhere;
        let expr = TypeExpr::variable("T", TypeRef::of::<Nowhere>());
        let err =
            GenericTypeResolver::resolve(&expr, TypeRef::of::<StringBox>()).unwrap_err();
        assert!(matches!(
            err,
            ReflectError::UnsupportedTypeExpression { .. }
        ));
    }

    #[test]
    fn test_variable_with_unknown_name_is_unsupported() {
        register_fixtures();
        let expr = TypeExpr::variable("Q", TypeRef::of::<Container>());
        let err =
            GenericTypeResolver::resolve(&expr, TypeRef::of::<StringBox>()).unwrap_err();
        assert!(matches!(
            err,
            ReflectError::UnsupportedTypeExpression { .. }
        ));
    }
}
