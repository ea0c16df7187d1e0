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

//! Target language tags for prompt adaptation.
//!
//! Tags are an open set: any non-empty name a translator understands
//! ("hindi", "es", "brazilian portuguese") is accepted. Tags are
//! normalized to trimmed lowercase so that cache keys and equality
//! checks are insensitive to how the caller spelled them.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Identifier for the human language a prompt is (or should be)
/// expressed in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LanguageTag(String);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LanguageTagError {
    #[error("language tag is empty")]
    Empty,
}

impl LanguageTag {
    /// Create a tag, normalizing to trimmed lowercase.
    pub fn new(tag: impl AsRef<str>) -> Result<Self, LanguageTagError> {
        let normalized = tag.as_ref().trim().to_lowercase();
        if normalized.is_empty() {
            return Err(LanguageTagError::Empty);
        }
        Ok(Self(normalized))
    }

    /// Default language of hand-authored prompts.
    pub fn english() -> Self {
        Self("english".to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for LanguageTag {
    fn default() -> Self {
        Self::english()
    }
}

impl fmt::Display for LanguageTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for LanguageTag {
    type Err = LanguageTagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalization() {
        let tag = LanguageTag::new("  Hindi ").unwrap();
        assert_eq!(tag.as_str(), "hindi");
        assert_eq!(tag, LanguageTag::new("HINDI").unwrap());
    }

    #[test]
    fn test_empty_rejected() {
        assert_eq!(LanguageTag::new(""), Err(LanguageTagError::Empty));
        assert_eq!(LanguageTag::new("   "), Err(LanguageTagError::Empty));
    }

    #[test]
    fn test_default_is_english() {
        assert_eq!(LanguageTag::default(), LanguageTag::english());
    }

    #[test]
    fn test_serde_transparent() {
        let tag = LanguageTag::new("hindi").unwrap();
        let json = serde_json::to_string(&tag).unwrap();
        assert_eq!(json, "\"hindi\"");
        let back: LanguageTag = serde_json::from_str(&json).unwrap();
        assert_eq!(back, tag);
    }
}
