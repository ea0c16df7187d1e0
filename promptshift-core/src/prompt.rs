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

//! Structured prompt templates: an instruction, few-shot examples, and a
//! declared input/output field contract.
//!
//! A prompt is a value. Adaptation to another language produces a new
//! value with the same `name`, `input_keys`, `output_key`, and
//! `output_type`; only the natural-language content changes.

use crate::language::LanguageTag;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

/// A single value inside a few-shot example record.
///
/// Untagged on the wire: strings, numbers, and arrays of strings map
/// directly to JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Text(String),
    Number(f64),
    List(Vec<String>),
}

impl FieldValue {
    pub fn text(s: impl Into<String>) -> Self {
        Self::Text(s.into())
    }

    pub fn list<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::List(items.into_iter().map(Into::into).collect())
    }

    /// Short name of the value's shape, for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Text(_) => "text",
            Self::Number(_) => "number",
            Self::List(_) => "list",
        }
    }

    /// Render for inclusion in a prompt body: text verbatim, numbers in
    /// display form, lists as a JSON array.
    pub fn render(&self) -> String {
        match self {
            Self::Text(s) => s.clone(),
            Self::Number(n) => n.to_string(),
            // Vec<String> serialization cannot fail
            Self::List(items) => serde_json::to_string(items).unwrap_or_default(),
        }
    }
}

/// One few-shot example: an ordered record of field name -> value.
///
/// Field order is authored order and survives serde round-trips.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct Example {
    pub fields: IndexMap<String, FieldValue>,
}

impl Example {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: FieldValue) -> Self {
        self.fields.insert(name.into(), value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }
}

/// How the output field of an example (and of future completions)
/// should be parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputType {
    /// Plain prose; consumed as-is.
    Text,
    /// An ordered sequence of strings, serialized as a JSON array.
    List,
}

impl OutputType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::List => "list",
        }
    }

    /// Whether a value conforms to this output shape.
    pub fn accepts(&self, value: &FieldValue) -> bool {
        matches!(
            (self, value),
            (Self::Text, FieldValue::Text(_)) | (Self::List, FieldValue::List(_))
        )
    }
}

impl std::fmt::Display for OutputType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A task template: instruction, few-shot examples, and the field
/// contract every invocation must honor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuredPrompt {
    /// Stable identifier; unchanged by adaptation.
    pub name: String,

    /// Natural-language task description.
    pub instruction: String,

    /// Worked input/output records, in authored order.
    pub examples: Vec<Example>,

    /// Field names that must appear in every example and invocation.
    pub input_keys: Vec<String>,

    /// The single field holding the expected output.
    pub output_key: String,

    /// Shape the output field must parse into.
    pub output_type: OutputType,

    /// Language the prompt's natural-language content is currently
    /// expressed in.
    #[serde(default)]
    pub language: LanguageTag,
}

impl StructuredPrompt {
    /// Render the prompt to the text form a downstream model consumes:
    /// instruction, worked examples, then an input stanza with `{key}`
    /// placeholders and a dangling output label.
    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str(&self.instruction);

        for example in &self.examples {
            out.push_str("\n\n");
            let mut first = true;
            for (name, value) in &example.fields {
                if !first {
                    out.push('\n');
                }
                first = false;
                let _ = write!(out, "{}: {}", name, value.render());
            }
        }

        out.push_str("\n\n");
        for key in &self.input_keys {
            let _ = writeln!(out, "{key}: {{{key}}}");
        }
        let _ = write!(out, "{}: ", self.output_key);
        out
    }

    /// Field names every example must carry: `input_keys` plus the
    /// output key.
    pub fn expected_fields(&self) -> Vec<&str> {
        self.input_keys
            .iter()
            .map(String::as_str)
            .chain(std::iter::once(self.output_key.as_str()))
            .collect()
    }
}
