//! Semantic invariants not expressible via JSON Schema.

use std::collections::HashSet;

use crate::core::types::{BROADCAST_TARGET, OutputRecord, SharedState, StateDocument};

/// Check document invariants:
/// - No duplicate output names
/// - Aliases unique and never equal to any output name
/// - Identifiers usable on the command line (non-empty, no whitespace,
///   no leading `-`, not the broadcast word)
pub fn validate_invariants(document: &StateDocument) -> Vec<String> {
    match document {
        StateDocument::Outputs(records) => validate_records(records),
        StateDocument::Shared(shared) => validate_shared(shared),
    }
}

fn validate_records(records: &[OutputRecord]) -> Vec<String> {
    let mut errors = Vec::new();
    let outputs: HashSet<&str> = records.iter().map(|r| r.output.as_str()).collect();
    let mut seen_outputs = HashSet::new();
    let mut seen_aliases = HashSet::new();

    for (index, record) in records.iter().enumerate() {
        let at = format!("[{}]", index);
        check_identifier(&record.output, &at, "output", &mut errors);
        if !seen_outputs.insert(record.output.as_str()) {
            errors.push(format!("{}: duplicate output '{}'", at, record.output));
        }

        let Some(alias) = record.alias.as_deref() else {
            continue;
        };
        check_identifier(alias, &at, "alias", &mut errors);
        if outputs.contains(alias) {
            errors.push(format!("{}: alias '{}' collides with an output name", at, alias));
        }
        if !seen_aliases.insert(alias) {
            errors.push(format!("{}: duplicate alias '{}'", at, alias));
        }
    }
    errors
}

fn validate_shared(shared: &SharedState) -> Vec<String> {
    let mut errors = Vec::new();
    if shared.outputs.is_empty() {
        errors.push("outputs must not be empty".to_string());
    }
    let mut seen = HashSet::new();
    for (index, output) in shared.outputs.iter().enumerate() {
        let at = format!("outputs[{}]", index);
        check_identifier(output, &at, "output", &mut errors);
        if !seen.insert(output.as_str()) {
            errors.push(format!("{}: duplicate output '{}'", at, output));
        }
    }
    errors
}

fn check_identifier(value: &str, at: &str, field: &str, errors: &mut Vec<String>) {
    if value.is_empty() {
        errors.push(format!("{}: {} must not be empty", at, field));
    } else if value.chars().any(char::is_whitespace) {
        errors.push(format!("{}: {} '{}' contains whitespace", at, field, value));
    } else if value.starts_with('-') {
        errors.push(format!("{}: {} '{}' starts with '-'", at, field, value));
    } else if value == BROADCAST_TARGET {
        errors.push(format!("{}: {} '{}' is reserved", at, field, value));
    }
}
