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

//! Phrasing of translation requests and parsing of replies.
//!
//! How the request is worded is an internal detail of the adapter, not
//! a wire contract. Scalar text goes out as a single translate-this
//! request; list values go out as one request carrying the whole JSON
//! array, with the reply required to be a JSON array again.

use crate::generator::GenerationError;
use promptshift_core::LanguageTag;

/// Request to translate one piece of prose.
pub fn text_request(text: &str, language: &LanguageTag) -> String {
    format!(
        "Translate the following text to {language}. \
         Reply with the translation only, no explanation or commentary.\n\n{text}"
    )
}

/// Request to translate every element of a list, keeping order and
/// count.
pub fn list_request(items: &[String], language: &LanguageTag) -> String {
    // Vec<String> serialization cannot fail
    let json = serde_json::to_string(items).unwrap_or_default();
    format!(
        "Translate each string in the following JSON array to {language}. \
         Reply with a JSON array of the translated strings only, \
         in the same order, one output element per input element.\n\n{json}"
    )
}

/// Extract a JSON array of strings from a model reply, tolerating
/// markdown code fences and surrounding prose.
pub fn parse_list_reply(reply: &str) -> Result<Vec<String>, GenerationError> {
    let trimmed = reply.trim();
    if trimmed.is_empty() {
        return Err(GenerationError::EmptyResponse);
    }

    let start = trimmed.find('[');
    let end = trimmed.rfind(']');
    let (Some(start), Some(end)) = (start, end) else {
        return Err(GenerationError::MalformedResponse(format!(
            "expected a JSON array, got: {trimmed}"
        )));
    };
    if end < start {
        return Err(GenerationError::MalformedResponse(format!(
            "expected a JSON array, got: {trimmed}"
        )));
    }

    serde_json::from_str(&trimmed[start..=end]).map_err(|e| {
        GenerationError::MalformedResponse(format!("array did not parse as strings: {e}"))
    })
}

/// Extract a scalar translation from a model reply.
pub fn parse_text_reply(reply: &str) -> Result<String, GenerationError> {
    let trimmed = reply.trim();
    if trimmed.is_empty() {
        return Err(GenerationError::EmptyResponse);
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hindi() -> LanguageTag {
        LanguageTag::new("hindi").unwrap()
    }

    #[test]
    fn test_text_request_names_language_and_carries_text() {
        let request = text_request("The sun sets.", &hindi());
        assert!(request.contains("hindi"));
        assert!(request.ends_with("The sun sets."));
    }

    #[test]
    fn test_list_request_embeds_json_array() {
        let request = list_request(&["sun".to_string(), "mountains".to_string()], &hindi());
        assert!(request.contains(r#"["sun","mountains"]"#));
    }

    #[test]
    fn test_parse_list_reply_plain() {
        let items = parse_list_reply(r#"["सूरज","पहाड़"]"#).unwrap();
        assert_eq!(items, vec!["सूरज", "पहाड़"]);
    }

    #[test]
    fn test_parse_list_reply_fenced() {
        let reply = "Here you go:\n```json\n[\"सूरज\", \"पहाड़\"]\n```";
        let items = parse_list_reply(reply).unwrap();
        assert_eq!(items.len(), 2);
    }

    #[test]
    fn test_parse_list_reply_rejects_prose() {
        assert!(matches!(
            parse_list_reply("sun and mountains"),
            Err(GenerationError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_parse_list_reply_rejects_non_string_elements() {
        assert!(matches!(
            parse_list_reply("[1, 2]"),
            Err(GenerationError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_parse_text_reply_trims() {
        assert_eq!(parse_text_reply("  सूरज \n").unwrap(), "सूरज");
        assert!(matches!(
            parse_text_reply("   "),
            Err(GenerationError::EmptyResponse)
        ));
    }
}
