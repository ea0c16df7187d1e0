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

//! # Promptshift Core
//!
//! Data model for structured prompt templates: an instruction, few-shot
//! examples, and a declared input/output field contract, plus the
//! invariant checks that keep an adapted prompt interchangeable with its
//! source.

pub mod language;
pub mod prompt;
pub mod validate;

pub use language::{LanguageTag, LanguageTagError};
pub use prompt::{Example, FieldValue, OutputType, StructuredPrompt};
pub use validate::{validate, validate_adaptation, InvariantViolation};
