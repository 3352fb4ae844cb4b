#![allow(missing_docs)]
#![cfg(feature = "parallel")]

use bitscope::{
    BinaryArchive, BitObject, ErrorCode, JsonArchive, OverflowNumberPolicy, SerializationOptions,
    ValidationPolicy,
};

#[derive(Debug, Default, Clone, PartialEq, BitObject)]
struct Record {
    id: u32,
    #[bitscope(max_size = 16)]
    name: String,
    level: u8,
}

fn create_records(count: u32) -> Vec<Record> {
    (0..count)
        .map(|id| Record {
            id,
            name: format!("record-{id}"),
            level: (id % 200) as u8,
        })
        .collect()
}

/// Every document of a batch round-trips, in input order.
#[test]
fn test_batch_round_trip() {
    let options = SerializationOptions::default();
    let mut records = create_records(256);

    let saved = BinaryArchive::save_batch(&mut records, &options);
    let documents: Vec<Vec<u8>> = saved
        .into_iter()
        .filter_map(|item| item.result.ok())
        .collect();
    assert_eq!(documents.len(), records.len());

    let loaded = BinaryArchive::load_batch::<Record, _>(&documents, &options);
    let values: Vec<Record> = loaded.into_iter().filter_map(|item| item.result.ok()).collect();
    assert_eq!(values, records);
}

/// A failing document does not affect the others, and each keeps its own context.
#[test]
fn test_batch_isolates_failures() {
    let options = SerializationOptions::default()
        .with_overflow_number_policy(OverflowNumberPolicy::Skip)
        .with_validation_policy(ValidationPolicy::Collect);
    let inputs = [
        r#"{"id": 1, "name": "ok", "level": 3}"#,
        r#"{"id": 2, "name": "ok", "level": 999}"#,
        r#"{"id": 3,"#,
        r#"{"id": 4, "name": "a name that is far too long"}"#,
    ];

    let loaded = JsonArchive::load_batch::<Record, _>(&inputs, &options);
    assert_eq!(loaded.len(), 4);

    assert!(loaded[0].context.is_valid());
    assert_eq!(loaded[0].result.as_ref().map(|r| r.level).ok(), Some(3));

    assert!(loaded[1].result.is_ok());
    assert!(loaded[1].context.errors().contains("/level"));

    assert_eq!(
        loaded[2].result.as_ref().map_err(|e| e.code()).err(),
        Some(ErrorCode::ParsingError)
    );

    assert!(loaded[3].context.errors().contains("/name"));
    assert!(!loaded[3].context.errors().contains("/level"));
}
