// Copyright 2025 Promptshift Contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Invariant checks for structured prompts.
//!
//! `validate` checks a prompt against its own declared contract.
//! `validate_adaptation` additionally checks an adapted prompt against
//! its source: the contract must be carried over unchanged and no list
//! value may change length, so downstream consumers can parse the
//! adapted output exactly as they parsed the original.

use crate::prompt::{FieldValue, OutputType, StructuredPrompt};
use thiserror::Error;

/// A violated prompt invariant.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum InvariantViolation {
    #[error("prompt name is empty")]
    EmptyName,

    #[error("duplicate input key: {key}")]
    DuplicateInputKey { key: String },

    #[error("output key {key:?} is also declared as an input key")]
    OutputKeyIsInputKey { key: String },

    #[error("example {example} is missing field {field:?}")]
    MissingField { example: usize, field: String },

    #[error("example {example} has undeclared field {field:?}")]
    UnexpectedField { example: usize, field: String },

    #[error("example {example} output is {found}, expected {expected}")]
    OutputTypeMismatch {
        example: usize,
        expected: OutputType,
        found: &'static str,
    },

    #[error("prompt name changed during adaptation: {from:?} -> {to:?}")]
    NameChanged { from: String, to: String },

    #[error("input keys changed during adaptation")]
    InputKeysChanged,

    #[error("output key changed during adaptation: {from:?} -> {to:?}")]
    OutputKeyChanged { from: String, to: String },

    #[error("output type changed during adaptation: {from} -> {to}")]
    OutputTypeChanged { from: OutputType, to: OutputType },

    #[error("example count changed during adaptation: {from} -> {to}")]
    ExampleCountChanged { from: usize, to: usize },

    #[error("example {example} field {field:?} changed shape: {from} -> {to}")]
    FieldShapeChanged {
        example: usize,
        field: String,
        from: &'static str,
        to: &'static str,
    },

    #[error("example {example} field {field:?} list length changed: {from} -> {to}")]
    ListLengthChanged {
        example: usize,
        field: String,
        from: usize,
        to: usize,
    },
}

/// Check a prompt against its own declared contract: no duplicate or
/// overlapping keys, and every example carrying exactly
/// `input_keys ∪ {output_key}` with a conforming output value.
pub fn validate(prompt: &StructuredPrompt) -> Result<(), InvariantViolation> {
    if prompt.name.trim().is_empty() {
        return Err(InvariantViolation::EmptyName);
    }

    for (i, key) in prompt.input_keys.iter().enumerate() {
        if prompt.input_keys[..i].contains(key) {
            return Err(InvariantViolation::DuplicateInputKey { key: key.clone() });
        }
    }
    if prompt.input_keys.contains(&prompt.output_key) {
        return Err(InvariantViolation::OutputKeyIsInputKey {
            key: prompt.output_key.clone(),
        });
    }

    let expected = prompt.expected_fields();
    for (i, example) in prompt.examples.iter().enumerate() {
        for field in &expected {
            if example.get(field).is_none() {
                return Err(InvariantViolation::MissingField {
                    example: i,
                    field: (*field).to_string(),
                });
            }
        }
        for name in example.field_names() {
            if !expected.contains(&name) {
                return Err(InvariantViolation::UnexpectedField {
                    example: i,
                    field: name.to_string(),
                });
            }
        }

        // expected fields are all present at this point
        if let Some(output) = example.get(&prompt.output_key) {
            if !prompt.output_type.accepts(output) {
                return Err(InvariantViolation::OutputTypeMismatch {
                    example: i,
                    expected: prompt.output_type,
                    found: output.kind(),
                });
            }
        }
    }

    Ok(())
}

/// Check an adapted prompt against its source. The adapted prompt must
/// itself be valid, carry the identical contract, and keep every list
/// value at its source length.
pub fn validate_adaptation(
    source: &StructuredPrompt,
    adapted: &StructuredPrompt,
) -> Result<(), InvariantViolation> {
    validate(adapted)?;

    if adapted.name != source.name {
        return Err(InvariantViolation::NameChanged {
            from: source.name.clone(),
            to: adapted.name.clone(),
        });
    }
    if adapted.input_keys != source.input_keys {
        return Err(InvariantViolation::InputKeysChanged);
    }
    if adapted.output_key != source.output_key {
        return Err(InvariantViolation::OutputKeyChanged {
            from: source.output_key.clone(),
            to: adapted.output_key.clone(),
        });
    }
    if adapted.output_type != source.output_type {
        return Err(InvariantViolation::OutputTypeChanged {
            from: source.output_type,
            to: adapted.output_type,
        });
    }
    if adapted.examples.len() != source.examples.len() {
        return Err(InvariantViolation::ExampleCountChanged {
            from: source.examples.len(),
            to: adapted.examples.len(),
        });
    }

    for (i, (src, new)) in source.examples.iter().zip(&adapted.examples).enumerate() {
        for (field, src_value) in &src.fields {
            // field-set equality was already established by validate()
            let Some(new_value) = new.get(field) else {
                continue;
            };
            match (src_value, new_value) {
                (FieldValue::List(a), FieldValue::List(b)) => {
                    if a.len() != b.len() {
                        return Err(InvariantViolation::ListLengthChanged {
                            example: i,
                            field: field.clone(),
                            from: a.len(),
                            to: b.len(),
                        });
                    }
                }
                (a, b) if a.kind() == b.kind() => {}
                (a, b) => {
                    return Err(InvariantViolation::FieldShapeChanged {
                        example: i,
                        field: field.clone(),
                        from: a.kind(),
                        to: b.kind(),
                    });
                }
            }
        }
    }

    Ok(())
}
