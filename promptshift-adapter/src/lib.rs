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

//! # Promptshift Adapter
//!
//! Re-expresses a structured prompt's natural-language content in a
//! target language while preserving its field contract, so the adapted
//! prompt stays interchangeable with the original.
//!
//! Adaptations are cached by `(prompt name, language)`; a warm cache
//! entry is served without any generator call. Instructions and the few-
//! shot example values are translated, not just the instruction: worked
//! examples anchor the target model's output format far more reliably
//! when the target language's script differs from the source.
//!
//! ## Example
//!
//! ```rust,ignore
//! use promptshift_adapter::{FileCache, OpenAiGenerator, PromptAdapter};
//! use promptshift_core::LanguageTag;
//!
//! #[tokio::main]
//! async fn main() {
//!     let generator = OpenAiGenerator::new(
//!         std::env::var("OPENAI_API_KEY").unwrap(),
//!         "gpt-4o-mini".to_string(),
//!     );
//!     let cache = FileCache::new(FileCache::default_dir().unwrap());
//!     let adapter = PromptAdapter::new();
//!
//!     let prompt = load_prompt(); // hand-authored StructuredPrompt
//!     let hindi = LanguageTag::new("hindi").unwrap();
//!     let adapted = adapter.adapt(&prompt, &hindi, &generator, &cache).await.unwrap();
//!     println!("{}", adapted.render());
//! }
//! ```

use std::fmt;
use thiserror::Error;

pub mod adapter;
pub mod cache;
pub mod generator;
pub mod scripted;
pub mod translator;

pub use adapter::PromptAdapter;
pub use cache::{CacheError, CacheStats, CacheStore, FileCache, MemoryCache};
pub use generator::{AnthropicGenerator, GenerationError, OpenAiGenerator, TextGenerator};
pub use promptshift_core::InvariantViolation;
pub use scripted::ScriptedGenerator;

/// Where inside an adaptation a translation call failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdaptPhase {
    /// Translating the top-level instruction.
    Instruction,
    /// Translating one field of one example.
    ExampleField { example: usize, field: String },
}

impl fmt::Display for AdaptPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Instruction => f.write_str("instruction"),
            Self::ExampleField { example, field } => {
                write!(f, "example {example} field {field:?}")
            }
        }
    }
}

/// Errors from [`PromptAdapter::adapt`].
///
/// There is no silent fallback: a requested adaptation either returns a
/// validated prompt in the target language or one of these. Returning
/// the untranslated original would poison downstream consumers that
/// trust the returned prompt's language.
#[derive(Debug, Error)]
pub enum AdaptError {
    /// The text generation capability did not return usable output.
    #[error("translation failed at {phase}: {source}")]
    Generation {
        phase: AdaptPhase,
        #[source]
        source: GenerationError,
    },

    /// Translation succeeded but the result violates a prompt
    /// invariant. Never cached.
    #[error("adapted prompt is invalid: {0}")]
    Invalid(#[from] InvariantViolation),

    /// The cache store could not be read or written.
    #[error("cache unavailable: {0}")]
    Cache(#[from] CacheError),
}

/// What to do when the cache store errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CacheFailurePolicy {
    /// Surface the cache error and abort the adaptation.
    #[default]
    Fail,
    /// Keep going in translate-only mode: serve nothing from the cache
    /// and persist nothing to it. Must be opted into explicitly.
    Degrade,
}

/// Configuration for one adapter instance. Travels by value; there is
/// no process-wide default backend to patch.
#[derive(Debug, Clone)]
pub struct AdapterConfig {
    /// Bound on concurrent in-flight translation calls.
    pub max_concurrent: usize,

    /// Behavior when the cache store fails.
    pub on_cache_failure: CacheFailurePolicy,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 8,
            on_cache_failure: CacheFailurePolicy::Fail,
        }
    }
}
