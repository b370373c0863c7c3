#![no_main]

use std::rc::Rc;

use arbitrary::Arbitrary;
use fieldkit_array::FieldArray;
use fieldkit_core::{FieldPath, FormContext, FormStore};
use libfuzzer_sys::fuzz_target;
use serde_json::{Value, json};

#[derive(Arbitrary, Debug)]
enum FuzzOp {
    Append(i16),
    Prepend(i16),
    Insert { index: u8, value: i16 },
    Update { index: u8, value: i16 },
    Remove(u8),
    Clear,
    Swap(u8, u8),
    Move { from: u8, to: u8 },
    Replace(Vec<i16>),
    Reset,
    EditEntry { index: u8, value: i16 },
}

#[derive(Arbitrary, Debug)]
struct FuzzInput {
    initial: Vec<i16>,
    ops: Vec<FuzzOp>,
}

fuzz_target!(|input: FuzzInput| {
    if input.initial.len() > 64 || input.ops.len() > 256 {
        return;
    }

    let store = Rc::new(FormStore::with_initial_values(
        json!({ "items": input.initial }),
    ));
    let Ok(array) = FieldArray::new(store.clone(), "items") else {
        return;
    };
    let path = FieldPath::parse("items").expect("static path");

    for op in input.ops {
        match op {
            FuzzOp::Append(v) => {
                array.append(v);
            }
            FuzzOp::Prepend(v) => {
                array.prepend(v);
            }
            FuzzOp::Insert { index, value } => {
                array.insert(index as usize, value);
            }
            FuzzOp::Update { index, value } => {
                array.update(index as usize, value);
            }
            FuzzOp::Remove(i) => {
                array.remove(i as usize);
            }
            FuzzOp::Clear => {
                array.clear();
            }
            FuzzOp::Swap(a, b) => {
                array.swap(a as usize, b as usize);
            }
            FuzzOp::Move { from, to } => {
                array.move_entry(from as usize, to as usize);
            }
            FuzzOp::Replace(values) => {
                if values.len() > 64 {
                    continue;
                }
                array.replace(values.into_iter().map(|v| json!(v)));
            }
            FuzzOp::Reset => array.reset(),
            FuzzOp::EditEntry { index, value } => {
                if let Some(entry) = array.entry(index as usize) {
                    entry.set_value(value);
                }
            }
        }

        let stored = match store.field_value(&path) {
            Some(Value::Array(items)) => items,
            _ => Vec::new(),
        };
        let fields = array.fields();
        assert_eq!(stored.len(), fields.len());

        let mut keys: Vec<u64> = fields.iter().map(|e| e.key().raw()).collect();
        for (i, entry) in fields.iter().enumerate() {
            assert_eq!(entry.index(), Some(i));
            assert_eq!(entry.value(), stored[i]);
        }
        keys.sort_unstable();
        keys.dedup();
        assert_eq!(keys.len(), fields.len());
    }
});
