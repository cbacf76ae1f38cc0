//! Property tests for concatenated-call recovery.

use notegate_core::{decompose_tool_name, split_concatenated_json};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use serde_json::{Value, json};

const KNOWN: &[&str] = &[
    "read_note",
    "read_notes",
    "list_folder",
    "search_notes",
    "write_note",
    "minion_task",
    "note",
    "s",
];

fn known() -> Vec<String> {
    KNOWN.iter().map(|name| name.to_string()).collect()
}

proptest! {
    #[test]
    fn concatenated_known_names_always_decompose(
        picks in proptest::collection::vec(0..KNOWN.len(), 1..6)
    ) {
        let name: String = picks.iter().map(|idx| KNOWN[*idx]).collect();
        let parts = decompose_tool_name(&name, &known()).expect("decomposes");

        prop_assert_eq!(parts.concat(), name);
        prop_assert!(parts.iter().all(|part| KNOWN.contains(&part.as_str())));
    }

    #[test]
    fn decomposition_never_invents_names(name in "[a-z_]{0,24}") {
        if let Some(parts) = decompose_tool_name(&name, &known()) {
            prop_assert_eq!(parts.concat(), name);
            prop_assert!(parts.iter().all(|part| KNOWN.contains(&part.as_str())));
        }
    }

    #[test]
    fn split_recovers_every_concatenated_object(
        values in proptest::collection::vec(
            proptest::collection::btree_map("[a-z]{1,6}", "[ -~]{0,12}", 0..4),
            1..5,
        )
    ) {
        let objects: Vec<Value> = values
            .iter()
            .map(|map| serde_json::to_value(map).expect("object"))
            .collect();
        let raw: String = objects.iter().map(Value::to_string).collect();

        let fragments = split_concatenated_json(&raw);
        let parsed: Vec<Value> = fragments
            .iter()
            .map(|fragment| serde_json::from_str(fragment).expect("fragment parses"))
            .collect();
        prop_assert_eq!(parsed, objects);
    }
}

#[test]
fn repeated_name_decomposes_into_copies() {
    let known = vec!["minion_task".to_string()];
    assert_eq!(
        decompose_tool_name("minion_taskminion_taskminion_task", &known),
        Some(vec!["minion_task".to_string(); 3])
    );
}

#[test]
fn split_matches_documented_example() {
    assert_eq!(
        split_concatenated_json(r#"{"a":1}{"b":2}"#),
        vec![r#"{"a":1}"#.to_string(), r#"{"b":2}"#.to_string()]
    );
    let nested = json!({ "a": { "b": "}{" } }).to_string();
    assert_eq!(split_concatenated_json(&format!("{nested}{nested}")).len(), 2);
}
