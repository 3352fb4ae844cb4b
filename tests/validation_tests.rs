#![allow(missing_docs)]

use bitscope::{
    BitObject, ErrorCode, JsonArchive, KeyedScope, MaxSize, MinSize, Object, Range, Required,
    SerializationContext, SerializationOptions, Serialize, Slot, ValidationPolicy,
};
use rstest::rstest;

#[derive(Debug, Default, BitObject)]
struct Settings {
    #[bitscope(rename = "TestBool", required)]
    test_bool: bool,
    #[bitscope(rename = "TestInt", range(0, 100))]
    test_int: i32,
    #[bitscope(rename = "TestString", max_size = 8)]
    test_string: String,
}

fn collecting() -> SerializationContext {
    SerializationContext::new(
        SerializationOptions::default().with_validation_policy(ValidationPolicy::Collect),
    )
}

/// Every failing field is reported under its own path, with the validator's message.
#[test]
fn test_three_failing_paths() -> bitscope::Result<()> {
    let mut context = collecting();
    let mut settings = Settings::default();
    JsonArchive::load_str_with(
        &mut settings,
        r#"{"TestInt": 2000, "TestString": "Very looooooooong string!"}"#,
        &mut context,
    )?;

    let errors = context.errors();
    assert_eq!(errors.len(), 3);
    assert_eq!(
        errors.get("/TestBool"),
        Some(&["This field is required".to_string()][..])
    );
    assert_eq!(
        errors.get("/TestInt"),
        Some(&["Value must be between 0 and 100".to_string()][..])
    );
    assert_eq!(
        errors.get("/TestString"),
        Some(&["The maximum size of this field should be not greater than 8.".to_string()][..])
    );

    // Validation failures do not prevent the value from loading.
    assert_eq!(settings.test_int, 2000);
    Ok(())
}

/// `range(min, max)` accepts `min` and rejects `max`.
#[rstest]
#[case(0, true)]
#[case(99, true)]
#[case(100, false)]
#[case(-1, false)]
fn test_range_bounds(#[case] value: i32, #[case] accepted: bool) {
    let mut context = collecting();
    let mut settings = Settings::default();
    let source = format!(r#"{{"TestBool": true, "TestInt": {value}}}"#);
    assert!(JsonArchive::load_str_with(&mut settings, &source, &mut context).is_ok());
    assert_eq!(context.is_valid(), accepted);
}

/// `max_size = n` accepts fewer than `n` characters.
#[rstest]
#[case("abcdefg", true)]
#[case("abcdefgh", false)]
#[case("", true)]
fn test_max_size_bounds(#[case] text: &str, #[case] accepted: bool) {
    let mut context = collecting();
    let mut settings = Settings::default();
    let source = format!(r#"{{"TestBool": false, "TestString": "{text}"}}"#);
    assert!(JsonArchive::load_str_with(&mut settings, &source, &mut context).is_ok());
    assert_eq!(context.is_valid(), accepted);
}

/// Under the default policy the load completes, then fails with every error attached.
#[test]
fn test_fail_after_completion() {
    let mut settings = Settings::default();
    let err = JsonArchive::load_str(
        &mut settings,
        r#"{"TestInt": -5, "TestString": "ok"}"#,
    )
    .unwrap_err();

    assert_eq!(err.code(), ErrorCode::FailedValidation);
    let errors = err.validation_errors().cloned().unwrap_or_default();
    let paths: Vec<&str> = errors.paths().collect();
    assert_eq!(paths, ["/TestBool", "/TestInt"]);
    assert_eq!(settings.test_string, "ok");
}

/// `FailFast` stops at the first failing field.
#[test]
fn test_fail_fast() {
    let mut context = SerializationContext::new(
        SerializationOptions::default().with_validation_policy(ValidationPolicy::FailFast),
    );
    let mut settings = Settings::default();
    let err = JsonArchive::load_str_with(
        &mut settings,
        r#"{"TestInt": -5, "TestString": "ok"}"#,
        &mut context,
    )
    .unwrap_err();

    assert_eq!(err.code(), ErrorCode::FailedValidation);
    assert_eq!(context.errors().len(), 1);
    assert!(context.errors().contains("/TestBool"));
    assert_eq!(settings.test_int, 0);
}

/// Validators also run when saving.
#[test]
fn test_validation_on_save() {
    let mut settings = Settings {
        test_bool: true,
        test_int: 500,
        test_string: String::new(),
    };
    let mut context = collecting();
    let text = JsonArchive::save_string_with(&mut settings, &mut context);
    assert!(text.is_ok());
    assert!(context.errors().contains("/TestInt"));
    assert!(!context.errors().contains("/TestBool"));
}

/// Validators run in declaration order and report under nested paths.
#[test]
fn test_nested_validators_in_order() -> bitscope::Result<()> {
    fn no_spaces(value: &String, _loaded: bool) -> Option<String> {
        value.contains(' ').then(|| "Spaces are not allowed".to_owned())
    }

    #[derive(Debug, Default, BitObject)]
    struct Tag {
        #[bitscope(min_size = 3, validate = no_spaces)]
        name: String,
    }

    #[derive(Debug, Default, BitObject)]
    struct Catalog {
        #[bitscope(max_size = 2)]
        tags: Vec<Tag>,
        #[bitscope(range(1, 10))]
        limit: Option<u8>,
    }

    let mut context = collecting();
    let mut catalog = Catalog::default();
    JsonArchive::load_str_with(
        &mut catalog,
        r#"{"tags": [{"name": "ok tag"}, {"name": "a b"}, {"name": "x"}], "limit": 0}"#,
        &mut context,
    )?;

    let errors = context.errors();
    assert_eq!(
        errors.get("/tags/1/name"),
        Some(&["Spaces are not allowed".to_string()][..])
    );
    assert_eq!(
        errors.get("/tags/2/name"),
        Some(&["The minimum size of this field should be 3.".to_string()][..])
    );
    assert!(errors.contains("/tags"));
    assert!(errors.contains("/limit"));
    assert_eq!(errors.paths().next(), Some("/tags/0/name"));
    Ok(())
}

/// An absent optional field passes every validator except `required`.
#[test]
fn test_absent_values_skip_validators() -> bitscope::Result<()> {
    #[derive(Debug, Default)]
    struct Profile {
        age: Option<u8>,
        nick: String,
    }

    impl Object for Profile {
        fn serialize_fields<S: KeyedScope>(&mut self, scope: &mut S) -> bitscope::Result<()> {
            scope.serialize_field("age", &mut self.age, &[&Range::<u8>::new(18, 130)])?;
            scope.serialize_field("nick", &mut self.nick, &[&MinSize(2), &MaxSize(16)])?;
            Ok(())
        }
    }

    impl Serialize for Profile {
        fn serialize<S: Slot>(&mut self, slot: S) -> bitscope::Result<bool> {
            bitscope::serialize_object(self, slot)
        }
    }

    let mut context = collecting();
    let mut profile = Profile::default();
    JsonArchive::load_str_with(&mut profile, "{}", &mut context)?;
    assert!(context.is_valid());

    JsonArchive::load_str_with(&mut profile, r#"{"age": 12}"#, &mut context)?;
    assert!(context.errors().contains("/age"));
    assert_eq!(profile.nick, "");
    Ok(())
}

/// Unknown keys are reported when the container denies them.
#[test]
fn test_deny_unknown_fields() -> bitscope::Result<()> {
    #[derive(Debug, Default, BitObject)]
    #[bitscope(deny_unknown_fields)]
    struct Strict {
        id: u32,
    }

    let mut context = collecting();
    let mut strict = Strict::default();
    JsonArchive::load_str_with(&mut strict, r#"{"id": 1, "extra": true, "more": 2}"#, &mut context)?;
    assert_eq!(strict.id, 1);
    let paths: Vec<&str> = context.errors().paths().collect();
    assert_eq!(paths, ["/extra", "/more"]);
    assert_eq!(context.errors().get("/extra"), Some(&["Unknown field".to_string()][..]));
    Ok(())
}

/// Errors added by hand count like any other.
#[test]
fn test_custom_errors_from_traversal() {
    #[derive(Debug, Default)]
    struct Window {
        min: u32,
        max: u32,
    }

    impl Object for Window {
        fn serialize_fields<S: KeyedScope>(&mut self, scope: &mut S) -> bitscope::Result<()> {
            scope.serialize_field("min", &mut self.min, &[&Required])?;
            scope.serialize_field("max", &mut self.max, &[&Required])?;
            if scope.is_loading() && self.min > self.max {
                let path = scope.path();
                scope.context_mut().add_error(path, "min must not exceed max");
            }
            Ok(())
        }
    }

    impl Serialize for Window {
        fn serialize<S: Slot>(&mut self, slot: S) -> bitscope::Result<bool> {
            bitscope::serialize_object(self, slot)
        }
    }

    let mut window = Window::default();
    let err = JsonArchive::load_str(&mut window, r#"{"min": 5, "max": 1}"#).unwrap_err();
    let errors = err.validation_errors().cloned().unwrap_or_default();
    assert_eq!(errors.get(""), Some(&["min must not exceed max".to_string()][..]));
}
