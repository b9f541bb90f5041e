//! Data type canonicalization shared across threads.

use std::sync::{Arc, Barrier};
use std::thread;

use mediate::types::{ARRAY_LIST, INTEGER, LIST, NUMBER, STRING};
use mediate::DataType;

#[test]
fn test_concurrent_builds_share_one_instance() {
    let threads = 8;
    let barrier = Arc::new(Barrier::new(threads));

    let handles: Vec<_> = (0..threads)
        .map(|_| {
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                DataType::builder()
                    .of_type(&STRING)
                    .mime_type("application/x-mediate-test; charset=utf-8")
                    .unwrap()
                    .build()
            })
        })
        .collect();

    let built: Vec<DataType> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let first = &built[0];
    for other in &built[1..] {
        assert_eq!(first, other);
        assert!(first.ptr_eq(other));
    }
    assert_eq!(first.mime_type(), "application/x-mediate-test");
    assert_eq!(first.encoding(), Some("UTF-8"));
}

#[test]
fn test_collection_data_types() {
    let ints = DataType::builder()
        .collection_type(&ARRAY_LIST, &INTEGER)
        .unwrap()
        .build();
    assert!(ints.is_collection());
    assert_eq!(ints.item_type(), Some(&*INTEGER));

    let numbers = DataType::builder()
        .collection_type(&LIST, &NUMBER)
        .unwrap()
        .build();
    assert!(ints.is_compatible_with(&numbers));
    assert!(numbers.is_compatible_with(&ints));

    let strings = DataType::builder()
        .collection_type(&LIST, &STRING)
        .unwrap()
        .build();
    assert!(!strings.is_compatible_with(&ints));

    assert!(DataType::builder().collection_type(&STRING, &INTEGER).is_err());
}

#[test]
fn test_compatibility_with_mime_wildcard() {
    let json = DataType::json_string();
    let any = DataType::string();
    let xml = DataType::builder()
        .of_type(&STRING)
        .mime_type("application/xml")
        .unwrap()
        .build();

    assert!(json.is_compatible_with(&json));
    assert!(json.is_compatible_with(&any));
    assert!(any.is_compatible_with(&xml));
    assert!(!json.is_compatible_with(&xml));
    assert!(!json.is_compatible_with(&DataType::boolean()));
}
