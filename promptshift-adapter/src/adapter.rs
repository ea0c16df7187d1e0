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

//! The adaptation operation: cache lookup, concurrent translation of
//! every natural-language piece, validation gate, cache write.

use crate::cache::CacheStore;
use crate::generator::TextGenerator;
use crate::translator;
use crate::{AdaptError, AdaptPhase, AdapterConfig, CacheFailurePolicy};
use futures::future::BoxFuture;
use futures::stream::{self, StreamExt, TryStreamExt};
use promptshift_core::{validate, validate_adaptation, FieldValue, LanguageTag, StructuredPrompt};
use tracing::{debug, info, warn};

/// One translated fragment of a prompt, tagged with where it belongs.
enum Piece {
    Instruction(String),
    Field {
        example: usize,
        field: String,
        value: FieldValue,
    },
}

/// Adapts structured prompts into a target language.
#[derive(Debug, Clone, Default)]
pub struct PromptAdapter {
    config: AdapterConfig,
}

impl PromptAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: AdapterConfig) -> Self {
        Self { config }
    }

    /// Produce a version of `prompt` whose instruction and example
    /// values are expressed in `target`, with `name`, `input_keys`,
    /// `output_key`, and `output_type` carried over unchanged.
    ///
    /// A cached adaptation is returned without calling `generator` at
    /// all. On a miss the translated result is validated against the
    /// source before it is cached or returned; nothing partial is ever
    /// cached.
    pub async fn adapt(
        &self,
        prompt: &StructuredPrompt,
        target: &LanguageTag,
        generator: &dyn TextGenerator,
        cache: &dyn CacheStore,
    ) -> Result<StructuredPrompt, AdaptError> {
        validate(prompt)?;

        let mut persist = true;
        match cache.get(&prompt.name, target).await {
            Ok(Some(cached)) => {
                debug!(
                    name = %prompt.name,
                    language = %target,
                    "serving adaptation from cache"
                );
                return Ok(cached);
            }
            Ok(None) => {}
            Err(e) => match self.config.on_cache_failure {
                CacheFailurePolicy::Fail => return Err(e.into()),
                CacheFailurePolicy::Degrade => {
                    warn!(
                        name = %prompt.name,
                        language = %target,
                        error = %e,
                        "cache read failed, adapting without persistence"
                    );
                    persist = false;
                }
            },
        }

        let pieces = self.translate_pieces(prompt, target, generator).await?;
        let adapted = assemble(prompt, target, pieces);
        validate_adaptation(prompt, &adapted)?;

        if persist {
            if let Err(e) = cache.put(&adapted).await {
                match self.config.on_cache_failure {
                    CacheFailurePolicy::Fail => return Err(e.into()),
                    CacheFailurePolicy::Degrade => {
                        warn!(
                            name = %prompt.name,
                            language = %target,
                            error = %e,
                            "cache write failed, returning unpersisted adaptation"
                        );
                    }
                }
            }
        }

        info!(
            name = %prompt.name,
            language = %target,
            model = generator.model_name(),
            examples = prompt.examples.len(),
            "adapted prompt"
        );
        Ok(adapted)
    }

    /// Translate the instruction and every declared example value.
    ///
    /// The calls have no data dependencies on each other, so they run
    /// concurrently up to `max_concurrent`. The first failure drops the
    /// stream, cancelling in-flight siblings; no partial set of pieces
    /// escapes this function.
    async fn translate_pieces(
        &self,
        prompt: &StructuredPrompt,
        target: &LanguageTag,
        generator: &dyn TextGenerator,
    ) -> Result<Vec<Piece>, AdaptError> {
        let mut jobs: Vec<BoxFuture<'_, Result<Piece, AdaptError>>> = Vec::new();

        jobs.push(Box::pin(async move {
            let text =
                translate_text(generator, AdaptPhase::Instruction, &prompt.instruction, target)
                    .await?;
            Ok(Piece::Instruction(text))
        }));

        for (i, example) in prompt.examples.iter().enumerate() {
            for (field, value) in &example.fields {
                let phase = AdaptPhase::ExampleField {
                    example: i,
                    field: field.clone(),
                };
                match value {
                    FieldValue::Text(text) => {
                        jobs.push(Box::pin(async move {
                            let translated =
                                translate_text(generator, phase, text, target).await?;
                            Ok(Piece::Field {
                                example: i,
                                field: field.clone(),
                                value: FieldValue::Text(translated),
                            })
                        }));
                    }
                    FieldValue::List(items) => {
                        jobs.push(Box::pin(async move {
                            let translated =
                                translate_list(generator, phase, items, target).await?;
                            Ok(Piece::Field {
                                example: i,
                                field: field.clone(),
                                value: FieldValue::List(translated),
                            })
                        }));
                    }
                    // Numbers carry no natural language; passed through
                    // by the source clone in assemble().
                    FieldValue::Number(_) => {}
                }
            }
        }

        stream::iter(jobs)
            .buffered(self.config.max_concurrent.max(1))
            .try_collect()
            .await
    }
}

async fn translate_text(
    generator: &dyn TextGenerator,
    phase: AdaptPhase,
    text: &str,
    target: &LanguageTag,
) -> Result<String, AdaptError> {
    let request = translator::text_request(text, target);
    let reply = generator
        .generate(&request)
        .await
        .map_err(|source| AdaptError::Generation {
            phase: phase.clone(),
            source,
        })?;
    translator::parse_text_reply(&reply).map_err(|source| AdaptError::Generation { phase, source })
}

async fn translate_list(
    generator: &dyn TextGenerator,
    phase: AdaptPhase,
    items: &[String],
    target: &LanguageTag,
) -> Result<Vec<String>, AdaptError> {
    let request = translator::list_request(items, target);
    let reply = generator
        .generate(&request)
        .await
        .map_err(|source| AdaptError::Generation {
            phase: phase.clone(),
            source,
        })?;
    // Element-count drift is caught by the validation gate, which can
    // name the violated invariant; only shape errors are raised here.
    translator::parse_list_reply(&reply).map_err(|source| AdaptError::Generation { phase, source })
}

/// Build the adapted prompt from the source and the translated pieces.
/// Field names and ordering come from the source; only values change.
fn assemble(source: &StructuredPrompt, target: &LanguageTag, pieces: Vec<Piece>) -> StructuredPrompt {
    let mut adapted = source.clone();
    adapted.language = target.clone();

    for piece in pieces {
        match piece {
            Piece::Instruction(text) => adapted.instruction = text,
            Piece::Field {
                example,
                field,
                value,
            } => {
                // insert() on an existing key keeps its position
                adapted.examples[example].fields.insert(field, value);
            }
        }
    }

    adapted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheError, MemoryCache};
    use crate::scripted::ScriptedGenerator;
    use async_trait::async_trait;
    use promptshift_core::{Example, InvariantViolation, OutputType};

    fn noun_extractor() -> StructuredPrompt {
        StructuredPrompt {
            name: "noun_extractor".to_string(),
            instruction: "Extract the noun from given sentence".to_string(),
            examples: vec![Example::new()
                .with(
                    "sentence",
                    FieldValue::text("The sun sets over the mountains."),
                )
                .with("nouns", FieldValue::list(["sun", "mountains"]))],
            input_keys: vec!["sentence".to_string()],
            output_key: "nouns".to_string(),
            output_type: OutputType::List,
            language: LanguageTag::english(),
        }
    }

    fn hindi() -> LanguageTag {
        LanguageTag::new("hindi").unwrap()
    }

    fn hindi_translator() -> ScriptedGenerator {
        ScriptedGenerator::new()
            .respond(
                "Extract the noun from given sentence",
                "दिए गए वाक्य से संज्ञा निकालें",
            )
            .respond(
                "The sun sets over the mountains.",
                "सूरज पहाड़ों के पीछे डूबता है।",
            )
            .respond(r#"["sun","mountains"]"#, r#"["सूरज","पहाड़"]"#)
    }

    #[tokio::test]
    async fn test_end_to_end_hindi_adaptation() {
        let prompt = noun_extractor();
        let generator = hindi_translator();
        let cache = MemoryCache::new();
        let adapter = PromptAdapter::new();

        let adapted = adapter
            .adapt(&prompt, &hindi(), &generator, &cache)
            .await
            .unwrap();

        assert_eq!(adapted.instruction, "दिए गए वाक्य से संज्ञा निकालें");
        assert_eq!(
            adapted.examples[0].get("sentence"),
            Some(&FieldValue::text("सूरज पहाड़ों के पीछे डूबता है।"))
        );
        assert_eq!(
            adapted.examples[0].get("nouns"),
            Some(&FieldValue::list(["सूरज", "पहाड़"]))
        );

        // contract carried over unchanged
        assert_eq!(adapted.name, prompt.name);
        assert_eq!(adapted.input_keys, prompt.input_keys);
        assert_eq!(adapted.output_key, prompt.output_key);
        assert_eq!(adapted.output_type, prompt.output_type);
        assert_eq!(adapted.language, hindi());

        // source prompt untouched
        assert_eq!(prompt.instruction, "Extract the noun from given sentence");
        assert_eq!(prompt.language, LanguageTag::english());

        // instruction + sentence + nouns list = three calls
        assert_eq!(generator.calls(), 3);
    }

    #[tokio::test]
    async fn test_warm_cache_makes_zero_generator_calls() {
        let prompt = noun_extractor();
        let generator = hindi_translator();
        let cache = MemoryCache::new();
        let adapter = PromptAdapter::new();

        let first = adapter
            .adapt(&prompt, &hindi(), &generator, &cache)
            .await
            .unwrap();
        let calls_after_first = generator.calls();

        let second = adapter
            .adapt(&prompt, &hindi(), &generator, &cache)
            .await
            .unwrap();

        assert_eq!(generator.calls(), calls_after_first);
        assert_eq!(second, first);
        assert_eq!(
            serde_json::to_vec(&second).unwrap(),
            serde_json::to_vec(&first).unwrap()
        );
    }

    #[tokio::test]
    async fn test_cache_hit_bypasses_failing_generator() {
        let prompt = noun_extractor();
        let cache = MemoryCache::new();
        let adapter = PromptAdapter::new();

        let adapted = adapter
            .adapt(&prompt, &hindi(), &hindi_translator(), &cache)
            .await
            .unwrap();

        let poisoned = ScriptedGenerator::failing();
        let from_cache = adapter
            .adapt(&prompt, &hindi(), &poisoned, &cache)
            .await
            .unwrap();

        assert_eq!(from_cache, adapted);
        assert_eq!(poisoned.calls(), 0);
    }

    #[tokio::test]
    async fn test_shrunken_list_fails_validation_and_is_not_cached() {
        let mut prompt = noun_extractor();
        prompt.examples[0].fields.insert(
            "nouns".to_string(),
            FieldValue::list(["sun", "mountains", "sky"]),
        );

        let generator = ScriptedGenerator::new()
            .respond("Extract the noun", "दिए गए वाक्य से संज्ञा निकालें")
            .respond("The sun sets", "सूरज पहाड़ों के पीछे डूबता है।")
            .respond(r#"["sun","mountains","sky"]"#, r#"["सूरज"]"#);

        let cache = MemoryCache::new();
        let adapter = PromptAdapter::new();

        let err = adapter
            .adapt(&prompt, &hindi(), &generator, &cache)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            AdaptError::Invalid(InvariantViolation::ListLengthChanged {
                example: 0,
                from: 3,
                to: 1,
                ..
            })
        ));
        assert!(cache
            .get("noun_extractor", &hindi())
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_generation_failure_names_the_phase() {
        // instruction and sentence translate, the list rule is missing
        let generator = ScriptedGenerator::new()
            .respond("Extract the noun", "दिए गए वाक्य से संज्ञा निकालें")
            .respond("The sun sets", "सूरज पहाड़ों के पीछे डूबता है।");
        let cache = MemoryCache::new();
        let adapter = PromptAdapter::new();

        let err = adapter
            .adapt(&noun_extractor(), &hindi(), &generator, &cache)
            .await
            .unwrap_err();

        match err {
            AdaptError::Generation { phase, .. } => {
                assert_eq!(
                    phase,
                    AdaptPhase::ExampleField {
                        example: 0,
                        field: "nouns".to_string(),
                    }
                );
            }
            other => panic!("expected Generation error, got {other:?}"),
        }
        assert!(cache
            .get("noun_extractor", &hindi())
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_prose_reply_for_list_field_is_generation_failure() {
        let generator = ScriptedGenerator::new()
            .respond("Extract the noun", "दिए गए वाक्य से संज्ञा निकालें")
            .respond("The sun sets", "सूरज पहाड़ों के पीछे डूबता है।")
            .respond(r#"["sun","mountains"]"#, "sooraj aur pahaad");
        let cache = MemoryCache::new();
        let adapter = PromptAdapter::new();

        let err = adapter
            .adapt(&noun_extractor(), &hindi(), &generator, &cache)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            AdaptError::Generation {
                source: crate::GenerationError::MalformedResponse(_),
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_number_fields_pass_through_untranslated() {
        let prompt = StructuredPrompt {
            name: "sentence_scorer".to_string(),
            instruction: "Score the sentence for fluency".to_string(),
            examples: vec![Example::new()
                .with("sentence", FieldValue::text("The sun sets."))
                .with("score", FieldValue::Number(4.0))],
            input_keys: vec!["sentence".to_string()],
            output_key: "score".to_string(),
            output_type: OutputType::Text,
            language: LanguageTag::english(),
        };

        // output_type Text vs Number output value: not conforming
        assert!(promptshift_core::validate(&prompt).is_err());
    }

    #[tokio::test]
    async fn test_number_input_fields_are_not_sent_to_generator() {
        let prompt = StructuredPrompt {
            name: "difficulty_rater".to_string(),
            instruction: "Describe the difficulty level in words".to_string(),
            examples: vec![Example::new()
                .with("level", FieldValue::Number(3.0))
                .with("description", FieldValue::text("moderately hard"))],
            input_keys: vec!["level".to_string()],
            output_key: "description".to_string(),
            output_type: OutputType::Text,
            language: LanguageTag::english(),
        };

        let generator = ScriptedGenerator::new()
            .respond("Describe the difficulty", "कठिनाई स्तर का वर्णन करें")
            .respond("moderately hard", "मध्यम कठिन");
        let cache = MemoryCache::new();
        let adapter = PromptAdapter::new();

        let adapted = adapter
            .adapt(&prompt, &hindi(), &generator, &cache)
            .await
            .unwrap();

        assert_eq!(
            adapted.examples[0].get("level"),
            Some(&FieldValue::Number(3.0))
        );
        // instruction + description only
        assert_eq!(generator.calls(), 2);
    }

    #[tokio::test]
    async fn test_invalid_source_prompt_is_rejected_before_translation() {
        let mut prompt = noun_extractor();
        prompt.examples[0].fields.shift_remove("nouns");

        let generator = ScriptedGenerator::failing();
        let cache = MemoryCache::new();
        let adapter = PromptAdapter::new();

        let err = adapter
            .adapt(&prompt, &hindi(), &generator, &cache)
            .await
            .unwrap_err();

        assert!(matches!(err, AdaptError::Invalid(_)));
        assert_eq!(generator.calls(), 0);
    }

    /// Cache store whose every operation fails.
    struct BrokenCache;

    #[async_trait]
    impl CacheStore for BrokenCache {
        async fn get(
            &self,
            _name: &str,
            _language: &LanguageTag,
        ) -> Result<Option<StructuredPrompt>, CacheError> {
            Err(CacheError::Io(std::io::Error::other("disk on fire")))
        }

        async fn put(&self, _prompt: &StructuredPrompt) -> Result<(), CacheError> {
            Err(CacheError::Io(std::io::Error::other("disk on fire")))
        }

        async fn invalidate(
            &self,
            _name: &str,
            _language: &LanguageTag,
        ) -> Result<(), CacheError> {
            Err(CacheError::Io(std::io::Error::other("disk on fire")))
        }
    }

    #[tokio::test]
    async fn test_broken_cache_is_fatal_by_default() {
        let generator = hindi_translator();
        let adapter = PromptAdapter::new();

        let err = adapter
            .adapt(&noun_extractor(), &hindi(), &generator, &BrokenCache)
            .await
            .unwrap_err();

        assert!(matches!(err, AdaptError::Cache(_)));
        assert_eq!(generator.calls(), 0);
    }

    #[tokio::test]
    async fn test_degraded_mode_translates_without_persisting() {
        let generator = hindi_translator();
        let adapter = PromptAdapter::with_config(AdapterConfig {
            on_cache_failure: CacheFailurePolicy::Degrade,
            ..AdapterConfig::default()
        });

        let adapted = adapter
            .adapt(&noun_extractor(), &hindi(), &generator, &BrokenCache)
            .await
            .unwrap();

        assert_eq!(adapted.language, hindi());
        assert_eq!(generator.calls(), 3);
    }

    #[tokio::test]
    async fn test_same_language_adaptation_exercises_cache_path() {
        let prompt = noun_extractor();
        let english = LanguageTag::english();
        let generator = ScriptedGenerator::new()
            .respond("Extract the noun", "Extract the noun from given sentence")
            .respond("The sun sets", "The sun sets over the mountains.")
            .respond(r#"["sun","mountains"]"#, r#"["sun","mountains"]"#);
        let cache = MemoryCache::new();
        let adapter = PromptAdapter::new();

        let adapted = adapter
            .adapt(&prompt, &english, &generator, &cache)
            .await
            .unwrap();
        assert_eq!(adapted, prompt);

        // second request is a pure cache hit
        let calls = generator.calls();
        adapter
            .adapt(&prompt, &english, &generator, &cache)
            .await
            .unwrap();
        assert_eq!(generator.calls(), calls);
    }
}
