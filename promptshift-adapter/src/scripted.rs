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

//! Scripted generator for tests and offline runs.
//!
//! Replies are looked up by substring match against the incoming
//! request, so a rule keyed on the source text fires regardless of how
//! the translation request around it is phrased. Every call is counted,
//! which is what the cache tests assert on.

use crate::generator::{GenerationError, TextGenerator};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};

/// A [`TextGenerator`] that replays canned responses.
pub struct ScriptedGenerator {
    rules: RwLock<Vec<(String, String)>>,
    calls: AtomicU64,
    fail_all: bool,
}

impl ScriptedGenerator {
    pub fn new() -> Self {
        Self {
            rules: RwLock::new(Vec::new()),
            calls: AtomicU64::new(0),
            fail_all: false,
        }
    }

    /// A generator whose every call fails. Used to prove that cache
    /// hits never reach the generator.
    pub fn failing() -> Self {
        Self {
            rules: RwLock::new(Vec::new()),
            calls: AtomicU64::new(0),
            fail_all: true,
        }
    }

    /// Reply with `response` whenever the request contains `pattern`.
    /// Rules are tried in insertion order.
    pub fn respond(self, pattern: impl Into<String>, response: impl Into<String>) -> Self {
        self.rules.write().push((pattern.into(), response.into()));
        self
    }

    /// Number of generate calls made so far.
    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::Relaxed)
    }
}

impl Default for ScriptedGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn generate(&self, request: &str) -> Result<String, GenerationError> {
        self.calls.fetch_add(1, Ordering::Relaxed);

        if self.fail_all {
            return Err(GenerationError::ApiError(
                "scripted generator configured to fail".to_string(),
            ));
        }

        let rules = self.rules.read();
        for (pattern, response) in rules.iter() {
            if request.contains(pattern) {
                return Ok(response.clone());
            }
        }

        Err(GenerationError::ApiError(format!(
            "no scripted response matches request: {request}"
        )))
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}
