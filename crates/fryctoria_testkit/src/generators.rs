//! Property-based test generators using proptest.
//!
//! Provides strategies for generating record payloads and scripts of
//! offline writes that stay internally consistent: updates and deletes
//! only target records an earlier step created.

use proptest::prelude::*;
use serde_json::{Map, Value};

/// Strategy for generating record type names.
pub fn type_name_strategy() -> impl Strategy<Value = String> {
    prop::sample::select(vec!["user", "post", "comment"]).prop_map(str::to_string)
}

/// Strategy for generating scalar field values.
pub fn scalar_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i32>().prop_map(Value::from),
        "[a-zA-Z0-9 ]{0,16}".prop_map(Value::String),
    ]
}

/// Strategy for generating attribute maps without an `id` field.
pub fn fields_strategy() -> impl Strategy<Value = Map<String, Value>> {
    prop::collection::btree_map("[a-z]{1,8}", scalar_strategy(), 0..5).prop_map(|fields| {
        fields
            .into_iter()
            .filter(|(name, _)| name != "id")
            .collect()
    })
}

/// One step of an offline editing session.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteStep {
    /// Create a new record with these attributes.
    Create(Map<String, Value>),
    /// Update the n-th created record (modulo the number created).
    Update(usize, Map<String, Value>),
    /// Delete the n-th created record (modulo the number created).
    Delete(usize),
}

/// Strategy for generating one step.
pub fn write_step_strategy() -> impl Strategy<Value = WriteStep> {
    prop_oneof![
        3 => fields_strategy().prop_map(WriteStep::Create),
        2 => (any::<usize>(), fields_strategy()).prop_map(|(n, f)| WriteStep::Update(n, f)),
        1 => any::<usize>().prop_map(WriteStep::Delete),
    ]
}

/// Strategy for generating an editing session that starts with a create.
pub fn write_script_strategy(max_steps: usize) -> impl Strategy<Value = Vec<WriteStep>> {
    (
        fields_strategy(),
        prop::collection::vec(write_step_strategy(), 0..max_steps),
    )
        .prop_map(|(first, rest)| {
            let mut steps = Vec::with_capacity(rest.len() + 1);
            steps.push(WriteStep::Create(first));
            steps.extend(rest);
            steps
        })
}
