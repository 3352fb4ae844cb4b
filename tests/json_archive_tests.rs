#![allow(missing_docs)]

use bitscope::{
    BitEnum, BitObject, Error, ErrorCode, JsonArchive, KeyValue, KeyedScope, MismatchedTypesPolicy,
    Object, Scope, SerializationContext, SerializationOptions, Serialize, Slot, UnkeyedScope,
    ValidationPolicy,
};
use std::collections::{BTreeMap, BTreeSet, HashMap};

#[derive(Debug, Default, Clone, PartialEq, BitObject)]
struct Point {
    x: i32,
    y: i32,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, BitEnum)]
enum Shape {
    #[default]
    Circle,
    #[bitscope(rename = "square")]
    Square,
}

#[derive(Debug, Default, Clone, PartialEq, BitObject)]
struct Drawing {
    title: String,
    origin: Point,
    path: Vec<Point>,
    shapes: BTreeMap<Shape, u32>,
    layers: BTreeSet<String>,
    note: Option<String>,
}

fn create_drawing() -> Drawing {
    Drawing {
        title: "Sketch".to_string(),
        origin: Point { x: 1, y: -1 },
        path: vec![Point { x: 0, y: 0 }, Point { x: 10, y: 20 }],
        shapes: BTreeMap::from([(Shape::Circle, 2), (Shape::Square, 5)]),
        layers: BTreeSet::from(["background".to_string(), "ink".to_string()]),
        note: None,
    }
}

// --- TESTS ---

/// Objects keep their declaration order and load back unchanged.
#[test]
fn test_point_round_trip() -> bitscope::Result<()> {
    let mut point = Point { x: 100, y: 200 };
    let text = JsonArchive::save_string(&mut point)?;
    assert_eq!(text, r#"{"x":100,"y":200}"#);

    let mut loaded = Point::default();
    JsonArchive::load_str(&mut loaded, &text)?;
    assert_eq!(loaded, point);
    Ok(())
}

/// Nested objects, sequences, enum-keyed maps, sets and options.
#[test]
fn test_nested_round_trip() -> bitscope::Result<()> {
    let mut drawing = create_drawing();
    let text = JsonArchive::save_string(&mut drawing)?;
    assert!(text.contains(r#""shapes":{"Circle":2,"square":5}"#));
    assert!(text.contains(r#""layers":["background","ink"]"#));
    assert!(text.ends_with(r#""note":null}"#));

    let mut loaded = Drawing::default();
    JsonArchive::load_str(&mut loaded, &text)?;
    assert_eq!(loaded, drawing);
    Ok(())
}

/// Missing keys leave fields untouched; they are not errors.
#[test]
fn test_missing_keys_leave_defaults() -> bitscope::Result<()> {
    let mut drawing = create_drawing();
    JsonArchive::load_str(&mut drawing, r#"{"title": "Renamed"}"#)?;
    assert_eq!(drawing.title, "Renamed");
    assert_eq!(drawing.origin, Point { x: 1, y: -1 });
    assert_eq!(drawing.path.len(), 2);
    Ok(())
}

/// A null source resets an `Option` and leaves any other field untouched.
#[test]
fn test_null_values() -> bitscope::Result<()> {
    let mut drawing = create_drawing();
    drawing.note = Some("draft".to_string());

    let mut context = SerializationContext::default();
    JsonArchive::load_str_with(
        &mut drawing,
        r#"{"title": null, "note": null}"#,
        &mut context,
    )?;
    assert_eq!(drawing.title, "Sketch");
    assert_eq!(drawing.note, None);
    assert!(context.is_valid());
    Ok(())
}

/// Fixed-size targets take what fits and ignore the rest.
#[test]
fn test_fixed_size_truncation() -> bitscope::Result<()> {
    let source = "[1, 2, 3, 4, 5, 6, 7]";

    let mut short = [0_i32; 3];
    JsonArchive::load_str(&mut short, source)?;
    assert_eq!(short, [1, 2, 3]);

    let mut long = [-1_i32; 10];
    JsonArchive::load_str(&mut long, source)?;
    assert_eq!(long, [1, 2, 3, 4, 5, 6, 7, -1, -1, -1]);

    let mut pair = (0_u8, String::new());
    JsonArchive::load_str(&mut pair, r#"[9, "nine", true]"#)?;
    assert_eq!(pair, (9, "nine".to_string()));

    let mut triple = (0_u8, 0_u8, 42_u8);
    JsonArchive::load_str(&mut triple, "[1, 2]")?;
    assert_eq!(triple, (1, 2, 42));
    Ok(())
}

/// Resizable containers follow the source length.
#[test]
fn test_vec_resizes_to_source() -> bitscope::Result<()> {
    let mut values = vec![9_u64; 20];
    JsonArchive::load_str(&mut values, "[1, 2, 3]")?;
    assert_eq!(values, [1, 2, 3]);

    JsonArchive::load_str(&mut values, "[]")?;
    assert!(values.is_empty());
    Ok(())
}

/// Failure paths are JSON Pointers to the offending node.
#[test]
fn test_error_path_is_json_pointer() {
    #[derive(Debug, Default, BitObject)]
    struct Leaf {
        b: u8,
    }

    #[derive(Debug, Default, BitObject)]
    struct Tree {
        a: Vec<Leaf>,
    }

    let mut tree = Tree::default();
    let err = JsonArchive::load_str(&mut tree, r#"{"a": [{"b": 1}, {"b": 300}]}"#).unwrap_err();
    assert_eq!(err.code(), ErrorCode::Overflow);
    assert_eq!(err.path(), Some("/a/1/b"));
}

/// Keys containing `/` or `~` are escaped in paths.
#[test]
fn test_path_escaping() {
    let mut map: HashMap<String, i8> = HashMap::new();
    let err = JsonArchive::load_str(&mut map, r#"{"a/b~c": 1000}"#).unwrap_err();
    assert_eq!(err.path(), Some("/a~1b~0c"));
}

/// Integer keys are stored as object keys; other keys as key/value pairs.
#[test]
fn test_map_layouts() -> bitscope::Result<()> {
    let mut by_id: HashMap<u32, String> = HashMap::from([(7, "seven".to_string())]);
    assert_eq!(JsonArchive::save_string(&mut by_id)?, r#"{"7":"seven"}"#);

    let mut by_bytes: BTreeMap<Vec<u8>, String> = BTreeMap::from([(vec![1, 2], "a".to_string())]);
    let text = JsonArchive::save_string(&mut by_bytes)?;
    assert_eq!(text, r#"[{"key":[1,2],"value":"a"}]"#);

    let mut loaded: BTreeMap<Vec<u8>, String> = BTreeMap::new();
    JsonArchive::load_str(&mut loaded, &text)?;
    assert_eq!(loaded, by_bytes);
    Ok(())
}

/// A key that does not parse into the key type is a type mismatch.
#[test]
fn test_unconvertible_map_key() {
    let mut by_id: HashMap<u32, String> = HashMap::new();
    let err = JsonArchive::load_str(&mut by_id, r#"{"seven": "7"}"#).unwrap_err();
    assert_eq!(err.code(), ErrorCode::MismatchedTypes);
    assert_eq!(err.path(), Some("/seven"));
}

/// Map loads replace the previous content.
#[test]
fn test_map_load_clears_target() -> bitscope::Result<()> {
    let mut map: BTreeMap<String, i32> = BTreeMap::from([("old".to_string(), 1)]);
    JsonArchive::load_str(&mut map, r#"{"new": 2}"#)?;
    assert_eq!(map, BTreeMap::from([("new".to_string(), 2)]));
    Ok(())
}

/// Null entries survive a round trip through maps and sets.
#[test]
fn test_null_entries_round_trip() -> bitscope::Result<()> {
    let mut by_name: BTreeMap<String, Option<u8>> =
        BTreeMap::from([("a".to_string(), None), ("b".to_string(), Some(1))]);
    let text = JsonArchive::save_string(&mut by_name)?;
    assert_eq!(text, r#"{"a":null,"b":1}"#);
    let mut loaded: BTreeMap<String, Option<u8>> = BTreeMap::new();
    JsonArchive::load_str(&mut loaded, &text)?;
    assert_eq!(loaded, by_name);

    let mut set: BTreeSet<Option<u8>> = BTreeSet::from([None, Some(2)]);
    let text = JsonArchive::save_string(&mut set)?;
    assert_eq!(text, "[null,2]");
    let mut loaded: BTreeSet<Option<u8>> = BTreeSet::new();
    JsonArchive::load_str(&mut loaded, &text)?;
    assert_eq!(loaded, set);

    let mut by_slot: BTreeMap<Option<u8>, u8> = BTreeMap::from([(None, 1), (Some(2), 3)]);
    let text = JsonArchive::save_string(&mut by_slot)?;
    assert_eq!(text, r#"[{"key":null,"value":1},{"key":2,"value":3}]"#);
    let mut loaded: BTreeMap<Option<u8>, u8> = BTreeMap::new();
    JsonArchive::load_str(&mut loaded, &text)?;
    assert_eq!(loaded, by_slot);
    Ok(())
}

/// Entries whose value was skipped by a policy are left out of the map.
#[test]
fn test_skipped_map_values_are_dropped() -> bitscope::Result<()> {
    let mut context = SerializationContext::new(
        SerializationOptions::default()
            .with_mismatched_types_policy(MismatchedTypesPolicy::Skip)
            .with_validation_policy(ValidationPolicy::Collect),
    );
    let mut map: BTreeMap<String, Option<u8>> = BTreeMap::new();
    JsonArchive::load_str_with(&mut map, r#"{"a": "x", "b": null, "c": 4}"#, &mut context)?;
    assert_eq!(
        map,
        BTreeMap::from([("b".to_string(), None), ("c".to_string(), Some(4))])
    );
    let paths: Vec<&str> = context.errors().paths().collect();
    assert_eq!(paths, ["/a"]);
    Ok(())
}

/// A root that is not a single object can be named with `KeyValue`.
#[test]
fn test_key_value_root() -> bitscope::Result<()> {
    let mut numbers = vec![1_i16, 2];
    let text = JsonArchive::save_string(&mut KeyValue::new("numbers", &mut numbers))?;
    assert_eq!(text, r#"{"numbers":[1,2]}"#);

    let mut loaded: Vec<i16> = Vec::new();
    JsonArchive::load_str(&mut KeyValue::new("numbers", &mut loaded), &text)?;
    assert_eq!(loaded, numbers);
    Ok(())
}

/// Hand-written traversals can enumerate source keys.
#[test]
fn test_visit_keys() -> bitscope::Result<()> {
    #[derive(Default)]
    struct KeyRecorder {
        keys: Vec<String>,
    }

    impl Object for KeyRecorder {
        fn serialize_fields<S: KeyedScope>(&mut self, scope: &mut S) -> bitscope::Result<()> {
            if scope.is_loading() {
                scope.visit_keys(|key| self.keys.push(key.to_owned()));
            }
            Ok(())
        }
    }

    impl Serialize for KeyRecorder {
        fn serialize<S: Slot>(&mut self, slot: S) -> bitscope::Result<bool> {
            bitscope::serialize_object(self, slot)
        }
    }

    let mut recorder = KeyRecorder::default();
    JsonArchive::load_str(&mut recorder, r#"{"z": 1, "a": 2, "m": null}"#)?;
    assert_eq!(recorder.keys, ["z", "a", "m"]);
    Ok(())
}

/// Generic traversals can open nested scopes by hand.
#[test]
fn test_nested_scopes_by_hand() -> bitscope::Result<()> {
    #[derive(Debug, Default, PartialEq)]
    struct Polyline {
        name: String,
        xs: Vec<i32>,
        ys: Vec<i32>,
    }

    impl Object for Polyline {
        fn serialize_fields<S: KeyedScope>(&mut self, scope: &mut S) -> bitscope::Result<()> {
            if let Some(mut meta) = scope.open_object_scope("meta", 1)? {
                meta.serialize_value("name", &mut self.name)?;
            }
            let count = self.xs.len();
            let Some(mut points) = scope.open_array_scope("points", count)? else {
                return Ok(());
            };
            if points.is_loading() {
                let count = points.estimated_size();
                self.xs.resize(count, 0);
                self.ys.resize(count, 0);
            }
            for (x, y) in self.xs.iter_mut().zip(self.ys.iter_mut()) {
                if let Some(mut pair) = points.open_array_scope(2)? {
                    pair.serialize_value(x)?;
                    pair.serialize_value(y)?;
                }
            }
            Ok(())
        }
    }

    impl Serialize for Polyline {
        fn serialize<S: Slot>(&mut self, slot: S) -> bitscope::Result<bool> {
            bitscope::serialize_object(self, slot)
        }
    }

    let mut line = Polyline {
        name: "edge".to_string(),
        xs: vec![0, 5],
        ys: vec![1, 6],
    };
    let text = JsonArchive::save_string(&mut line)?;
    assert_eq!(text, r#"{"meta":{"name":"edge"},"points":[[0,1],[5,6]]}"#);

    let mut loaded = Polyline::default();
    JsonArchive::load_str(&mut loaded, &text)?;
    assert_eq!(loaded, line);
    Ok(())
}

/// Flattened bases share the derived type's object.
#[test]
fn test_base_fields_are_flattened() -> bitscope::Result<()> {
    #[derive(Debug, Default, PartialEq, BitObject)]
    struct Labeled {
        #[bitscope(flatten)]
        point: Point,
        label: String,
    }

    let mut labeled = Labeled {
        point: Point { x: 3, y: 4 },
        label: "p".to_string(),
    };
    let text = JsonArchive::save_string(&mut labeled)?;
    assert_eq!(text, r#"{"x":3,"y":4,"label":"p"}"#);

    let mut loaded = Labeled::default();
    JsonArchive::load_str(&mut loaded, &text)?;
    assert_eq!(loaded, labeled);
    Ok(())
}

/// Writing a key twice into one object is fatal.
#[test]
fn test_duplicate_key_on_save() {
    #[derive(Default)]
    struct Twice {
        value: i32,
    }

    impl Object for Twice {
        fn serialize_fields<S: KeyedScope>(&mut self, scope: &mut S) -> bitscope::Result<()> {
            scope.serialize_value("value", &mut self.value)?;
            scope.serialize_value("value", &mut self.value)?;
            Ok(())
        }
    }

    impl Serialize for Twice {
        fn serialize<S: Slot>(&mut self, slot: S) -> bitscope::Result<bool> {
            bitscope::serialize_object(self, slot)
        }
    }

    let err = JsonArchive::save_string(&mut Twice::default()).unwrap_err();
    assert!(matches!(err, Error::DuplicateKey { ref key, .. } if key == "value"));
    assert!(err.is_fatal());
}

/// Reading past the last array element is fatal.
#[test]
fn test_reading_past_array_end() {
    #[derive(Default)]
    struct Triple([u8; 3]);

    impl Serialize for Triple {
        fn serialize<S: Slot>(&mut self, slot: S) -> bitscope::Result<bool> {
            let Some(mut array) = slot.open_array(3)? else {
                return Ok(false);
            };
            for item in &mut self.0 {
                array.serialize_value(item)?;
            }
            Ok(true)
        }
    }

    let mut triple = Triple::default();
    let err = JsonArchive::load_str(&mut triple, "[1, 2]").unwrap_err();
    assert_eq!(err.code(), ErrorCode::OutOfRange);
    assert_eq!(err.path(), Some("/2"));
}

/// Malformed documents are parsing errors.
#[test]
fn test_parse_error() {
    let mut point = Point::default();
    let err = JsonArchive::load_str(&mut point, r#"{"x": 1,"#).unwrap_err();
    assert_eq!(err.code(), ErrorCode::ParsingError);
    assert!(err.is_fatal());
}

/// UTF-8 byte-order marks are accepted; UTF-16 input is not.
#[test]
fn test_byte_order_marks() -> bitscope::Result<()> {
    let mut point = Point::default();
    JsonArchive::load(&mut point, b"\xEF\xBB\xBF{\"x\": 5}")?;
    assert_eq!(point.x, 5);

    let err = JsonArchive::load(&mut point, b"\xFF\xFE{\x00}\x00").unwrap_err();
    assert_eq!(err.code(), ErrorCode::UnsupportedEncoding);
    Ok(())
}

/// Pretty printing uses the configured padding.
#[test]
fn test_pretty_print() -> bitscope::Result<()> {
    let mut context =
        SerializationContext::new(SerializationOptions::default().with_pretty_print(' ', 4));
    let text = JsonArchive::save_string_with(&mut Point { x: 1, y: 2 }, &mut context)?;
    assert_eq!(text, "{\n    \"x\": 1,\n    \"y\": 2\n}");

    let mut tabs = SerializationContext::new(SerializationOptions::default().with_pretty_print('\t', 1));
    let text = JsonArchive::save_string_with(&mut vec![true], &mut tabs)?;
    assert_eq!(text, "[\n\ttrue\n]");
    Ok(())
}

/// Standard File IO
/// Validate `Archive::save_to_file`, `Archive::load_from_file`
#[test]
#[cfg(not(target_arch = "wasm32"))]
fn test_file_io() -> bitscope::Result<()> {
    let dir = tempfile::tempdir()?;
    let file_path = dir.path().join("drawing.json");
    let mut drawing = create_drawing();

    let mut context = SerializationContext::default();
    JsonArchive::save_to_file(&mut drawing, &file_path, &mut context)?;
    let raw = std::fs::read(&file_path)?;
    assert!(raw.starts_with(&bitscope::format::UTF8_BOM));

    let mut loaded = Drawing::default();
    JsonArchive::load_from_file(&mut loaded, &file_path, &mut context)?;
    assert_eq!(loaded, drawing);

    let no_bom = dir.path().join("plain.json");
    let mut plain = SerializationContext::new(SerializationOptions::default().with_bom(false));
    JsonArchive::save_to_file(&mut drawing, &no_bom, &mut plain)?;
    assert_eq!(std::fs::read(&no_bom)?.first(), Some(&b'{'));
    Ok(())
}

/// Missing files surface as I/O errors.
#[test]
fn test_missing_file() -> bitscope::Result<()> {
    let dir = tempfile::tempdir()?;
    let mut point = Point::default();
    let err = JsonArchive::load_from_file(
        &mut point,
        dir.path().join("absent.json"),
        &mut SerializationContext::default(),
    )
    .unwrap_err();
    assert_eq!(err.code(), ErrorCode::InputOutputError);
    Ok(())
}

/// Reader input goes through the same pipeline as slices.
#[test]
fn test_load_from_reader() -> bitscope::Result<()> {
    let mut point = Point::default();
    let input: &[u8] = br#"{"x": -7, "y": 7}"#;
    JsonArchive::load_from_reader(&mut point, input, &mut SerializationContext::default())?;
    assert_eq!(point, Point { x: -7, y: 7 });
    Ok(())
}
