//! Enum value models: `value`-field detection, bidirectional lookup, and
//! declaration-order reverse matching.

use std::sync::Once;

use mirra_core::builder::{EnumSpec, FieldSpec};
use mirra_core::Value;
use mirra_reflect::{EnumModel, ReflectError};

// ============================================================================
// Fixtures
// ============================================================================

#[derive(Clone, Copy, PartialEq, Debug)]
enum Status {
    Draft,
    Live,
}

impl Status {
    fn code(&self) -> i64 {
        match self {
            Status::Draft => 1,
            Status::Live => 2,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Debug)]
enum Color {
    Red,
    Green,
}

static REGISTER: Once = Once::new();

fn register_fixtures() {
    REGISTER.call_once(|| {
        EnumSpec::<Status>::new("Status")
            .constant("Draft", Status::Draft)
            .constant("Live", Status::Live)
            .add_field(FieldSpec::readonly::<Status, i64>("value", Status::code))
            .register();

        EnumSpec::<Color>::new("Color")
            .constant("Red", Color::Red)
            .constant("Green", Color::Green)
            .register();
    });
}

// ============================================================================
// Value-backed enums
// ============================================================================

mod value_backed {
    use super::*;

    #[test]
    fn test_detects_value_field() {
        register_fixtures();
        let model = EnumModel::of::<Status>().unwrap();
        assert!(model.is_value_backed());
        assert_eq!(model.constants().len(), 2);
        assert_eq!(model.constants()[0].name(), "Draft");
        assert_eq!(model.constants()[0].value(), &Value::i64(1));
    }

    #[test]
    fn test_reverse_lookup_by_string_form() {
        register_fixtures();
        let model = EnumModel::of::<Status>().unwrap();
        let hit = model.value_of(&Value::str("1")).unwrap();
        assert_eq!(hit.name(), "Draft");
        assert_eq!(*hit.as_object::<Status>().unwrap(), Status::Draft);
    }

    #[test]
    fn test_reverse_lookup_by_numeric_value() {
        register_fixtures();
        let model = EnumModel::of::<Status>().unwrap();
        // string forms match across numeric kinds
        assert_eq!(model.value_of(&Value::i64(2)).unwrap().name(), "Live");
        assert_eq!(model.value_of(&Value::i32(2)).unwrap().name(), "Live");
    }

    #[test]
    fn test_reverse_lookup_miss_is_invalid_value() {
        register_fixtures();
        let model = EnumModel::of::<Status>().unwrap();
        match model.value_of(&Value::i64(3)) {
            Err(ReflectError::InvalidValue { value, type_name }) => {
                assert_eq!(value, "3");
                assert_eq!(type_name, "Status");
            }
            other => panic!("expected InvalidValue, got {other:?}"),
        }
    }

    #[test]
    fn test_forward_lookup() {
        register_fixtures();
        let model = EnumModel::of::<Status>().unwrap();
        assert_eq!(model.value_for("Live"), Some(&Value::i64(2)));
        assert_eq!(model.value_for("Missing"), None);
    }
}

// ============================================================================
// Name-backed enums
// ============================================================================

mod name_backed {
    use super::*;

    #[test]
    fn test_identity_falls_back_to_constant_name() {
        register_fixtures();
        let model = EnumModel::of::<Color>().unwrap();
        assert!(!model.is_value_backed());
        assert_eq!(model.value_of(&Value::str("Red")).unwrap().name(), "Red");
        assert_eq!(
            *model
                .value_of(&Value::str("Green"))
                .unwrap()
                .as_object::<Color>()
                .unwrap(),
            Color::Green
        );
    }

    #[test]
    fn test_unknown_name_is_invalid_value() {
        register_fixtures();
        let model = EnumModel::of::<Color>().unwrap();
        assert!(matches!(
            model.value_of(&Value::str("Blue")),
            Err(ReflectError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_cached_model_is_reused() {
        register_fixtures();
        let a = EnumModel::of::<Color>().unwrap();
        let b = EnumModel::of::<Color>().unwrap();
        assert!(std::sync::Arc::ptr_eq(&a, &b));
    }
}
