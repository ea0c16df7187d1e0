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

//! Promptshift CLI
//!
//! Adapt structured prompt files to other languages and inspect the
//! adaptation cache.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use promptshift_adapter::{
    AdapterConfig, AnthropicGenerator, CacheFailurePolicy, CacheStore, FileCache, OpenAiGenerator,
    PromptAdapter, TextGenerator,
};
use promptshift_core::{validate, LanguageTag, StructuredPrompt};
use std::path::{Path, PathBuf};
use tracing::Level;

#[derive(Parser)]
#[command(name = "promptshift")]
#[command(about = "Adapt structured prompts to other languages", long_about = None)]
struct Cli {
    /// Cache directory (defaults to $PROMPTSHIFT_CACHE_HOME or
    /// ~/.cache/promptshift)
    #[arg(long)]
    cache_dir: Option<PathBuf>,

    /// Verbose mode
    #[arg(short, long)]
    verbose: bool,

    /// Output as JSON (machine-readable)
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Provider {
    Openai,
    Anthropic,
}

#[derive(Subcommand)]
enum Commands {
    /// Adapt a prompt file to a target language
    Adapt {
        /// Path to the prompt JSON file
        prompt: PathBuf,

        /// Target language tag (e.g. "hindi", "spanish")
        #[arg(long)]
        language: String,

        /// Text generation provider
        #[arg(long, value_enum, default_value = "openai")]
        provider: Provider,

        /// Model name
        #[arg(long, default_value = "gpt-4o-mini")]
        model: String,

        /// Keep going when the cache is unavailable (translate-only
        /// mode, nothing persisted)
        #[arg(long)]
        degrade_on_cache_failure: bool,

        /// Bound on concurrent translation calls
        #[arg(long, default_value = "8")]
        max_concurrent: usize,
    },

    /// Print a cached adaptation
    Show {
        /// Prompt name
        name: String,

        /// Language tag
        #[arg(long)]
        language: String,
    },

    /// Drop a cached adaptation
    Invalidate {
        /// Prompt name
        name: String,

        /// Language tag
        #[arg(long)]
        language: String,
    },

    /// Render a prompt file to the text a model would receive
    Render {
        /// Path to the prompt JSON file
        prompt: PathBuf,
    },

    /// Check a prompt file against its declared contract
    Validate {
        /// Path to the prompt JSON file
        prompt: PathBuf,
    },
}

fn load_prompt(path: &Path) -> Result<StructuredPrompt> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("failed to read prompt file {}", path.display()))?;
    serde_json::from_slice(&bytes)
        .with_context(|| format!("{} is not a valid structured prompt", path.display()))
}

fn open_cache(dir: Option<PathBuf>) -> Result<FileCache> {
    let dir = match dir {
        Some(dir) => dir,
        None => FileCache::default_dir()
            .context("cannot resolve a cache directory; pass --cache-dir")?,
    };
    Ok(FileCache::new(dir))
}

fn build_generator(provider: Provider, model: String) -> Result<Box<dyn TextGenerator>> {
    match provider {
        Provider::Openai => {
            let api_key =
                std::env::var("OPENAI_API_KEY").context("OPENAI_API_KEY is not set")?;
            Ok(Box::new(OpenAiGenerator::new(api_key, model)))
        }
        Provider::Anthropic => {
            let api_key =
                std::env::var("ANTHROPIC_API_KEY").context("ANTHROPIC_API_KEY is not set")?;
            Ok(Box::new(AnthropicGenerator::new(api_key, model)))
        }
    }
}

fn print_prompt(prompt: &StructuredPrompt, as_json: bool) -> Result<()> {
    if as_json {
        println!("{}", serde_json::to_string_pretty(prompt)?);
    } else {
        println!("name:        {}", prompt.name);
        println!("language:    {}", prompt.language);
        println!("input keys:  {}", prompt.input_keys.join(", "));
        println!("output key:  {}", prompt.output_key);
        println!("output type: {}", prompt.output_type.as_str());
        println!("examples:    {}", prompt.examples.len());
        println!();
        println!("{}", prompt.render());
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    tracing_subscriber::fmt().with_max_level(level).init();

    match cli.command {
        Commands::Adapt {
            prompt,
            language,
            provider,
            model,
            degrade_on_cache_failure,
            max_concurrent,
        } => {
            let prompt = load_prompt(&prompt)?;
            let target: LanguageTag = language.parse()?;
            let generator = build_generator(provider, model)?;
            let cache = open_cache(cli.cache_dir)?;

            let adapter = PromptAdapter::with_config(AdapterConfig {
                max_concurrent,
                on_cache_failure: if degrade_on_cache_failure {
                    CacheFailurePolicy::Degrade
                } else {
                    CacheFailurePolicy::Fail
                },
            });

            let adapted = adapter
                .adapt(&prompt, &target, generator.as_ref(), &cache)
                .await?;
            print_prompt(&adapted, cli.json)?;
        }

        Commands::Show { name, language } => {
            let target: LanguageTag = language.parse()?;
            let cache = open_cache(cli.cache_dir)?;
            match cache.get(&name, &target).await? {
                Some(prompt) => print_prompt(&prompt, cli.json)?,
                None => bail!("no cached adaptation of {name:?} into {target}"),
            }
        }

        Commands::Invalidate { name, language } => {
            let target: LanguageTag = language.parse()?;
            let cache = open_cache(cli.cache_dir)?;
            cache.invalidate(&name, &target).await?;
            if !cli.json {
                println!("dropped cached adaptation of {name:?} into {target}");
            }
        }

        Commands::Render { prompt } => {
            let prompt = load_prompt(&prompt)?;
            println!("{}", prompt.render());
        }

        Commands::Validate { prompt } => {
            let path = prompt;
            let prompt = load_prompt(&path)?;
            validate(&prompt)
                .with_context(|| format!("{} violates its contract", path.display()))?;
            if cli.json {
                println!("{}", serde_json::json!({"valid": true}));
            } else {
                println!("{} is valid", path.display());
            }
        }
    }

    Ok(())
}
