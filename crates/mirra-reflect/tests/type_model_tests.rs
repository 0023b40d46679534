//! Integration tests for type models: caching, member discovery,
//! getter/setter pairing, and routed access.

use std::sync::{Arc, Barrier, Once};

use mirra_core::builder::{ClassSpec, ConstructorSpec, FieldSpec, MethodSpec};
use mirra_core::{CoreError, MethodBody, TypeRef, Value};
use mirra_reflect::{ReflectError, TypeModel};

// ============================================================================
// Fixtures
// ============================================================================

#[derive(Default)]
struct User {
    name: String,
    age: i64,
    active: bool,
    admin: bool,
    score: f64,
}

#[derive(Default)]
struct Animal {
    legs: i64,
}

#[derive(Default)]
struct Dog {
    base: Animal,
    breed: String,
}

struct NoDefault {
    #[allow(dead_code)]
    tag: i64,
}

#[derive(Default)]
struct Faulty;

static REGISTER: Once = Once::new();

fn register_fixtures() {
    REGISTER.call_once(|| {
        ClassSpec::new::<User>("User")
            .add_constructor(ConstructorSpec::new0(User::default))
            .add_field(FieldSpec::new::<User, String>(
                "name",
                |u| u.name.clone(),
                |u, v| u.name = v,
            ))
            .add_field(FieldSpec::new::<User, i64>(
                "age",
                |u| u.age,
                |u, v| u.age = v,
            ))
            .add_field(FieldSpec::new::<User, bool>(
                "active",
                |u| u.active,
                |u, v| u.active = v,
            ))
            .add_field(FieldSpec::new::<User, bool>(
                "isAdmin",
                |u| u.admin,
                |u, v| u.admin = v,
            ))
            .add_field(FieldSpec::new::<User, f64>(
                "score",
                |u| u.score,
                |u, v| u.score = v,
            ))
            // Plain accessor pairs for `name` and `age`
            .add_method(MethodSpec::ref0::<User, String>("getName", |u| {
                u.name.clone()
            }))
            .add_method(MethodSpec::mut1::<User, String, ()>("setName", |u, v| {
                u.name = v;
            }))
            .add_method(MethodSpec::ref0::<User, i64>("getAge", |u| u.age))
            .add_method(MethodSpec::mut1::<User, i64, ()>("setAge", |u, v| {
                u.age = v;
            }))
            // Boolean field with only the `is` form of the getter
            .add_method(MethodSpec::ref0::<User, bool>("isActive", |u| u.active))
            .add_method(MethodSpec::mut1::<User, bool, ()>("setActive", |u, v| {
                u.active = v;
            }))
            // Boolean field whose name itself starts with `is`
            .add_method(MethodSpec::ref0::<User, bool>("isAdmin", |u| u.admin))
            .add_method(MethodSpec::mut1::<User, bool, ()>("setAdmin", |u, v| {
                u.admin = v;
            }))
            // Recorded but invisible to models
            .add_field(
                FieldSpec::readonly::<User, i64>("shadow", |_| 0).synthetic(),
            )
            // Recorded but excluded from dispatch
            .add_method(MethodSpec::abstract_decl(
                "describe",
                Vec::new(),
                TypeRef::of::<String>(),
            ))
            .register();

        ClassSpec::new::<Animal>("Animal")
            .add_constructor(ConstructorSpec::new0(Animal::default))
            .add_field(FieldSpec::new::<Animal, i64>(
                "legs",
                |a| a.legs,
                |a, v| a.legs = v,
            ))
            .add_method(MethodSpec::ref0::<Animal, i64>("getLegs", |a| a.legs))
            .register();

        ClassSpec::new::<Dog>("Dog")
            .extends::<Dog, Animal>(|d| &d.base, |d| &mut d.base)
            .add_constructor(ConstructorSpec::new0(Dog::default))
            .add_field(FieldSpec::new::<Dog, String>(
                "breed",
                |d| d.breed.clone(),
                |d, v| d.breed = v,
            ))
            .register();

        ClassSpec::new::<NoDefault>("NoDefault")
            .add_constructor(ConstructorSpec::new1::<NoDefault, i64>(|tag| NoDefault {
                tag,
            }))
            .register();

        ClassSpec::new::<Faulty>("Faulty")
            .add_constructor(ConstructorSpec::new0(Faulty::default))
            .add_method(MethodSpec::dynamic(
                "explode",
                Vec::new(),
                TypeRef::of::<()>(),
                MethodBody::Ref(Box::new(|_target, _args| {
                    Err(CoreError::Callee("exploded".to_string()))
                })),
            ))
            .register();
    });
}

// ============================================================================
// Cache behavior
// ============================================================================

mod caching {
    use super::*;

    #[test]
    fn test_get_twice_returns_same_model() {
        register_fixtures();
        let a = TypeModel::of::<User>().unwrap();
        let b = TypeModel::of::<User>().unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_unregistered_type_is_unavailable() {
        struct Unregistered;
        let err = TypeModel::of::<Unregistered>().unwrap_err();
        assert!(matches!(err, ReflectError::TypeUnavailable { .. }));
    }

    #[test]
    fn test_concurrent_first_requests_publish_one_model() {
        #[derive(Default)]
        struct Fresh {
            n: i64,
        }
        ClassSpec::new::<Fresh>("Fresh")
            .add_constructor(ConstructorSpec::new0(Fresh::default))
            .add_field(FieldSpec::new::<Fresh, i64>("n", |f| f.n, |f, v| f.n = v))
            .register();

        let threads = 50;
        let barrier = Arc::new(Barrier::new(threads));
        let handles: Vec<_> = (0..threads)
            .map(|_| {
                let barrier = barrier.clone();
                std::thread::spawn(move || {
                    barrier.wait();
                    TypeModel::of::<Fresh>().unwrap()
                })
            })
            .collect();
        let models: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        for model in &models[1..] {
            assert!(Arc::ptr_eq(&models[0], model));
        }
    }

    #[test]
    fn test_accessor_indices_stable_within_process() {
        register_fixtures();
        let a = TypeModel::of::<User>().unwrap();
        let b = TypeModel::of::<User>().unwrap();
        let idx = |m: &TypeModel| -> Vec<Option<usize>> {
            m.fields().iter().map(|f| f.accessor_index()).collect()
        };
        assert_eq!(idx(&a), idx(&b));
        // dense and unique
        for (i, f) in a.fields().iter().enumerate() {
            assert_eq!(f.accessor_index(), Some(i));
        }
    }
}

// ============================================================================
// Construction
// ============================================================================

mod construction {
    use super::*;

    #[test]
    fn test_new_instance_is_fresh_every_call() {
        register_fixtures();
        let model = TypeModel::of::<User>().unwrap();
        let mut first = model.new_instance().unwrap();
        let second = model.new_instance().unwrap();

        let age = model.field("age").unwrap();
        age.set_value(first.as_mut(), &Value::i64(40), false).unwrap();
        assert_eq!(
            age.get_value(first.as_ref(), false).unwrap(),
            Value::i64(40)
        );
        // the second instance is untouched
        assert_eq!(
            age.get_value(second.as_ref(), false).unwrap(),
            Value::i64(0)
        );
    }

    #[test]
    fn test_missing_default_constructor_fails_with_type_name() {
        register_fixtures();
        let model = TypeModel::of::<NoDefault>().unwrap();
        match model.new_instance() {
            Err(ReflectError::NoDefaultConstructor { type_name }) => {
                assert_eq!(type_name, "NoDefault");
            }
            other => panic!("expected NoDefaultConstructor, got {other:?}"),
        }
    }

    #[test]
    fn test_constructor_with_arguments() {
        register_fixtures();
        let model = TypeModel::of::<NoDefault>().unwrap();
        let ctor = &model.constructors()[0];
        let instance = ctor.new_instance(&[Value::i64(9)]).unwrap();
        assert!(instance.downcast_ref::<NoDefault>().is_some());

        let err = ctor.new_instance(&[]).unwrap_err();
        assert!(matches!(err, ReflectError::Invocation { .. }));
    }
}

// ============================================================================
// Getter/setter pairing
// ============================================================================

mod pairing {
    use super::*;

    #[test]
    fn test_int_field_pairs_get_set_methods() {
        register_fixtures();
        let model = TypeModel::of::<User>().unwrap();
        let age = model.field("age").unwrap();

        let getter = age.getter_index().expect("getter paired");
        let setter = age.setter_index().expect("setter paired");
        assert_eq!(model.methods()[getter].name(), "getAge");
        assert_eq!(model.methods()[setter].name(), "setAge");

        let mut user = model.new_instance().unwrap();
        age.set_value(user.as_mut(), &Value::i64(5), true).unwrap();
        assert_eq!(age.get_value(user.as_ref(), true).unwrap(), Value::i64(5));
    }

    #[test]
    fn test_boolean_field_pairs_is_getter() {
        register_fixtures();
        let model = TypeModel::of::<User>().unwrap();
        let active = model.field("active").unwrap();

        let getter = active.getter_index().expect("getter paired");
        assert_eq!(model.methods()[getter].name(), "isActive");
        let setter = active.setter_index().expect("setter paired");
        assert_eq!(model.methods()[setter].name(), "setActive");

        let mut user = model.new_instance().unwrap();
        active
            .set_value(user.as_mut(), &Value::bool(true), true)
            .unwrap();
        assert_eq!(
            active.get_value(user.as_ref(), true).unwrap(),
            Value::bool(true)
        );
    }

    #[test]
    fn test_is_prefixed_boolean_field_pairs_literal_getter() {
        register_fixtures();
        let model = TypeModel::of::<User>().unwrap();
        let admin = model.field("isAdmin").unwrap();

        // getter named exactly like the field, setter with the prefix stripped
        let getter = admin.getter_index().expect("getter paired");
        assert_eq!(model.methods()[getter].name(), "isAdmin");
        let setter = admin.setter_index().expect("setter paired");
        assert_eq!(model.methods()[setter].name(), "setAdmin");
    }

    #[test]
    fn test_unpaired_field_has_no_accessor_methods() {
        register_fixtures();
        let model = TypeModel::of::<User>().unwrap();
        let score = model.field("score").unwrap();
        assert!(score.getter_index().is_none());
        assert!(score.setter_index().is_none());
    }
}

// ============================================================================
// Member discovery
// ============================================================================

mod discovery {
    use super::*;

    #[test]
    fn test_synthetic_members_are_invisible() {
        register_fixtures();
        let model = TypeModel::of::<User>().unwrap();
        assert!(model.field("shadow").is_none());
    }

    #[test]
    fn test_abstract_methods_recorded_but_not_dispatchable() {
        register_fixtures();
        let model = TypeModel::of::<User>().unwrap();
        let describe = model.method("describe").expect("recorded");
        assert!(describe.is_abstract());
        assert!(describe.accessor_index().is_none());

        let mut user = model.new_instance().unwrap();
        let err = describe.invoke(user.as_mut(), &[]).unwrap_err();
        assert!(matches!(err, ReflectError::Invocation { .. }));
    }

    #[test]
    fn test_inherited_members_carry_declaring_type() {
        register_fixtures();
        let model = TypeModel::of::<Dog>().unwrap();

        let breed = model.field("breed").unwrap();
        assert!(breed.is_declared());
        assert_eq!(breed.declaring_type(), TypeRef::of::<Dog>());

        let legs = model.field("legs").unwrap();
        assert!(legs.is_inherited());
        assert_eq!(legs.declaring_type(), TypeRef::of::<Animal>());

        // own declarations come first in the ordered sequence
        assert_eq!(model.fields()[0].name(), "breed");
        assert_eq!(model.fields()[1].name(), "legs");
    }

    #[test]
    fn test_inherited_field_access_through_projection() {
        register_fixtures();
        let model = TypeModel::of::<Dog>().unwrap();
        let legs = model.field("legs").unwrap();

        let mut dog = model.new_instance().unwrap();
        legs.set_value(dog.as_mut(), &Value::i64(4), false).unwrap();
        assert_eq!(legs.get_value(dog.as_ref(), false).unwrap(), Value::i64(4));
        assert_eq!(
            dog.downcast_ref::<Dog>().unwrap().base.legs,
            4,
            "write landed in the embedded parent fragment"
        );
    }

    #[test]
    fn test_inherited_paired_getter_still_invokes() {
        register_fixtures();
        let model = TypeModel::of::<Dog>().unwrap();
        let legs = model.field("legs").unwrap();
        let getter = legs.getter_index().expect("inherited getter paired");
        assert_eq!(model.methods()[getter].name(), "getLegs");

        let mut dog = model.new_instance().unwrap();
        legs.set_value(dog.as_mut(), &Value::i64(3), false).unwrap();
        assert_eq!(legs.get_value(dog.as_ref(), true).unwrap(), Value::i64(3));
    }

    #[test]
    fn test_inherited_constructor_recorded_but_not_constructible() {
        register_fixtures();
        let model = TypeModel::of::<Dog>().unwrap();
        assert_eq!(model.constructors().len(), 2);
        let inherited = model
            .constructors()
            .iter()
            .find(|c| !c.is_declared())
            .unwrap();
        assert!(inherited.accessor_index().is_none());
        assert!(inherited.new_instance(&[]).is_err());
    }

    #[test]
    fn test_instance_of_walks_registered_ancestry() {
        register_fixtures();
        let animal_model = TypeModel::of::<Animal>().unwrap();
        let dog = Dog::default();
        let user = User::default();
        assert!(animal_model.is_instance_of(&dog));
        assert!(!animal_model.is_instance_of(&user));
    }
}

// ============================================================================
// Failure modes
// ============================================================================

mod failures {
    use super::*;

    #[test]
    fn test_out_of_range_index_fails_fast() {
        register_fixtures();
        let model = TypeModel::of::<User>().unwrap();
        let user = User::default();
        match model.engine().get(&user, 999) {
            Err(ReflectError::IndexOutOfRange { index, type_name }) => {
                assert_eq!(index, 999);
                assert_eq!(type_name, "User");
            }
            other => panic!("expected IndexOutOfRange, got {other:?}"),
        }
    }

    #[test]
    fn test_receiver_mismatch_is_an_invocation_fault() {
        register_fixtures();
        let model = TypeModel::of::<User>().unwrap();
        let wrong = Animal::default();
        let err = model
            .field("age")
            .unwrap()
            .get_value(&wrong, false)
            .unwrap_err();
        assert!(matches!(err, ReflectError::Invocation { .. }));
    }

    #[test]
    fn test_callee_fault_surfaces_unwrapped() {
        register_fixtures();
        let model = TypeModel::of::<Faulty>().unwrap();
        let mut faulty = model.new_instance().unwrap();
        let err = model
            .method("explode")
            .unwrap()
            .invoke(faulty.as_mut(), &[])
            .unwrap_err();
        match err {
            ReflectError::Callee { message } => assert_eq!(message, "exploded"),
            other => panic!("expected the callee's own fault, got {other:?}"),
        }
    }

    #[test]
    fn test_argument_kind_mismatch_is_wrapped() {
        register_fixtures();
        let model = TypeModel::of::<User>().unwrap();
        let mut user = model.new_instance().unwrap();
        let err = model
            .method("setAge")
            .unwrap()
            .invoke(user.as_mut(), &[Value::str("nope")])
            .unwrap_err();
        assert!(matches!(err, ReflectError::Invocation { .. }));
    }

    #[test]
    fn test_arity_mismatch_is_wrapped() {
        register_fixtures();
        let model = TypeModel::of::<User>().unwrap();
        let mut user = model.new_instance().unwrap();
        let err = model
            .method("setAge")
            .unwrap()
            .invoke(user.as_mut(), &[])
            .unwrap_err();
        assert!(matches!(err, ReflectError::Invocation { .. }));
    }
}
