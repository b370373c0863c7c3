//! Structured log events emitted by FieldArray (requires `--features tracing`).

#![cfg(feature = "tracing")]

use std::rc::Rc;
use std::sync::{Arc, Mutex};

use fieldkit_array::FieldArray;
use fieldkit_core::FormStore;
use serde_json::json;
use tracing::Subscriber;
use tracing_subscriber::Layer;
use tracing_subscriber::layer::{Context, SubscriberExt};

#[derive(Default)]
struct Captured {
    messages: Vec<String>,
    ops: Vec<String>,
}

struct CaptureLayer {
    state: Arc<Mutex<Captured>>,
}

impl<S> Layer<S> for CaptureLayer
where
    S: Subscriber + for<'lookup> tracing_subscriber::registry::LookupSpan<'lookup>,
{
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        #[derive(Default)]
        struct Fields {
            message: Option<String>,
            op: Option<String>,
        }
        impl tracing::field::Visit for Fields {
            fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
                match field.name() {
                    "message" => self.message = Some(value.to_string()),
                    "op" => self.op = Some(value.to_string()),
                    _ => {}
                }
            }

            fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
                let text = format!("{value:?}").trim_matches('"').to_string();
                match field.name() {
                    "message" => self.message = Some(text),
                    "op" => self.op = Some(text),
                    _ => {}
                }
            }
        }

        let mut fields = Fields::default();
        event.record(&mut fields);
        let mut state = self.state.lock().expect("capture lock");
        if let Some(message) = fields.message {
            state.messages.push(message);
        }
        if let Some(op) = fields.op {
            state.ops.push(op);
        }
    }
}

#[test]
fn commits_noops_and_resets_are_logged() {
    let state = Arc::new(Mutex::new(Captured::default()));
    let subscriber = tracing_subscriber::registry().with(CaptureLayer {
        state: Arc::clone(&state),
    });
    let _guard = tracing::subscriber::set_default(subscriber);

    let store = Rc::new(FormStore::with_initial_values(json!({ "items": ["a", "b"] })));
    let array = FieldArray::new(store.clone(), "items").unwrap();
    array.swap(0, 1);
    array.swap(0, 9);
    let stale = array.fields();
    array.replace(vec![json!("z")]);
    stale[0].set_value("dropped");

    let snapshot = state.lock().expect("capture lock");
    for expected in [
        "field_array.reset",
        "field_array.commit",
        "field_array.noop",
        "field_array.stale_write",
        "form_store.replay",
    ] {
        assert!(
            snapshot.messages.iter().any(|m| m == expected),
            "expected {expected} event, saw {:?}",
            snapshot.messages
        );
    }
    assert!(snapshot.ops.iter().any(|op| op == "swap"));
    assert!(snapshot.ops.iter().any(|op| op == "replace"));
}

#[test]
fn non_array_value_warns() {
    let state = Arc::new(Mutex::new(Captured::default()));
    let subscriber = tracing_subscriber::registry().with(CaptureLayer {
        state: Arc::clone(&state),
    });
    let _guard = tracing::subscriber::set_default(subscriber);

    let store = Rc::new(FormStore::with_initial_values(json!({ "items": 3 })));
    let array = FieldArray::new(store.clone(), "items").unwrap();
    assert!(array.is_empty());

    let snapshot = state.lock().expect("capture lock");
    assert!(snapshot.messages.iter().any(|m| m == "field_array.non_array"));
}
