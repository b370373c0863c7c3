#![no_main]

use arbitrary::Arbitrary;
use fieldkit_core::FieldPath;
use libfuzzer_sys::fuzz_target;
use serde_json::{Value, json};

#[derive(Arbitrary, Debug)]
enum FuzzSegment {
    Key(String),
    Index(u8),
}

#[derive(Arbitrary, Debug)]
struct FuzzInput {
    raw: String,
    segments: Vec<FuzzSegment>,
    value: i32,
}

fuzz_target!(|input: FuzzInput| {
    // Arbitrary text must parse or fail cleanly.
    if let Ok(path) = FieldPath::parse(&input.raw) {
        assert_eq!(path.as_str(), input.raw);
        let _ = path.parent();
        let _ = path.segments().count();
    }

    if input.segments.is_empty() || input.segments.len() > 16 {
        return;
    }
    let joined: Vec<String> = input
        .segments
        .iter()
        .map(|seg| match seg {
            FuzzSegment::Key(key) => key.replace('.', "_"),
            FuzzSegment::Index(i) => i.to_string(),
        })
        .collect();
    // Keep numeric text small so assignment cannot allocate huge arrays.
    if joined.iter().any(|s| s.len() > 3 && s.bytes().all(|b| b.is_ascii_digit())) {
        return;
    }
    let Ok(path) = FieldPath::parse(&joined.join(".")) else {
        return;
    };

    let mut root = Value::Null;
    assert!(path.assign(&mut root, json!(input.value)));
    assert_eq!(path.lookup(&root), Some(&json!(input.value)));

    if let Some(parent) = path.parent() {
        assert!(parent.covers(&path));
        assert!(parent.lookup(&root).is_some());
    }
});
