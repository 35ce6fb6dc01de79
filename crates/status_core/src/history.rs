use crate::error::{Result, StatusError};
use crate::extract::{BlockExtractor, DecodedBlock};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::debug;

/// One chat turn as the host stores it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub is_user: bool,
    #[serde(default)]
    pub is_system: bool,
    #[serde(default)]
    pub mes: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub swipes: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub swipe_id: Option<usize>,
}

impl ChatMessage {
    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            mes: text.into(),
            ..Self::default()
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self {
            is_user: true,
            mes: text.into(),
            ..Self::default()
        }
    }

    pub fn system(text: impl Into<String>) -> Self {
        Self {
            is_system: true,
            mes: text.into(),
            ..Self::default()
        }
    }

    pub fn is_assistant(&self) -> bool {
        !self.is_user && !self.is_system
    }

    /// Text of the active swipe. Falls back to the message body when the
    /// swipe is missing or empty.
    pub fn active_text(&self) -> &str {
        match (&self.swipes, self.swipe_id) {
            (Some(swipes), Some(index)) => swipes
                .get(index)
                .map(String::as_str)
                .filter(|swipe| !swipe.is_empty())
                .unwrap_or(&self.mes),
            _ => &self.mes,
        }
    }
}

/// Walks the history from the newest message back and returns the first
/// assistant message's decodable block. Assistant messages without one are
/// skipped in favour of older ones.
pub fn find_latest_block(extractor: &BlockExtractor, messages: &[ChatMessage]) -> Option<DecodedBlock> {
    for (index, message) in messages.iter().enumerate().rev() {
        if !message.is_assistant() {
            continue;
        }
        if let Some(block) = extractor.extract_block(message.active_text()) {
            debug!(index, keys = block.len(), "found status block");
            return Some(block);
        }
    }
    debug!(messages = messages.len(), "no status block in history");
    None
}

/// Reads a chat from disk. Accepts a JSON array of messages or a JSONL
/// export whose first line may be a metadata header without `mes`.
pub fn load_chat(path: &Path) -> Result<Vec<ChatMessage>> {
    let raw = fs::read_to_string(path)?;
    parse_chat(&raw)
}

pub fn parse_chat(raw: &str) -> Result<Vec<ChatMessage>> {
    if raw.trim_start().starts_with('[') {
        return Ok(serde_json::from_str(raw)?);
    }

    let mut messages = Vec::new();
    for (index, line) in raw.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let value: serde_json::Value =
            serde_json::from_str(line).map_err(|source| StatusError::ChatLine { line: index + 1, source })?;
        if value.get("mes").is_none() {
            continue;
        }
        let message =
            serde_json::from_value(value).map_err(|source| StatusError::ChatLine { line: index + 1, source })?;
        messages.push(message);
    }
    Ok(messages)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::DEFAULT_MARKER;
    use serde_yaml::Value;

    fn extractor() -> BlockExtractor {
        BlockExtractor::new(DEFAULT_MARKER).unwrap()
    }

    fn status(place: &str) -> String {
        format!("Story text.\n```myst\nplace: {place}\n```")
    }

    fn place_of(block: &DecodedBlock) -> Option<&str> {
        block.get("place").and_then(Value::as_str)
    }

    #[test]
    fn empty_history_has_no_block() {
        assert!(find_latest_block(&extractor(), &[]).is_none());
    }

    #[test]
    fn history_without_assistant_messages_has_no_block() {
        let messages = vec![ChatMessage::user(status("Park")), ChatMessage::system(status("Void"))];
        assert!(find_latest_block(&extractor(), &messages).is_none());
    }

    #[test]
    fn newest_block_wins() {
        let messages = vec![ChatMessage::assistant(status("Old")), ChatMessage::assistant(status("New"))];
        let block = find_latest_block(&extractor(), &messages).unwrap();
        assert_eq!(place_of(&block), Some("New"));
    }

    #[test]
    fn skips_newer_messages_without_a_block() {
        let messages = vec![
            ChatMessage::assistant(status("Harbor")),
            ChatMessage::user(status("User claims")),
            ChatMessage::assistant("Just prose."),
            ChatMessage::system("narration"),
            ChatMessage::assistant("```myst\nplace: [broken\n```"),
            ChatMessage::user("hi"),
        ];
        let block = find_latest_block(&extractor(), &messages).unwrap();
        assert_eq!(place_of(&block), Some("Harbor"));
    }

    #[test]
    fn uses_the_active_swipe() {
        let mut message = ChatMessage::assistant(status("Body"));
        message.swipes = Some(vec![status("First"), status("Second")]);
        message.swipe_id = Some(1);
        let block = find_latest_block(&extractor(), &[message]).unwrap();
        assert_eq!(place_of(&block), Some("Second"));
    }

    #[test]
    fn out_of_range_swipe_falls_back_to_body() {
        let mut message = ChatMessage::assistant("body");
        message.swipes = Some(vec!["only".into()]);
        message.swipe_id = Some(3);
        assert_eq!(message.active_text(), "body");
    }

    #[test]
    fn empty_active_swipe_falls_back_to_body() {
        let mut message = ChatMessage::assistant(status("Body"));
        message.swipes = Some(vec![String::new()]);
        message.swipe_id = Some(0);
        assert_eq!(message.active_text(), message.mes);

        let block = find_latest_block(&extractor(), &[message]).unwrap();
        assert_eq!(place_of(&block), Some("Body"));
    }

    #[test]
    fn parses_jsonl_export_with_header() {
        let raw = concat!(
            r#"{"user_name":"You","character_name":"Mia","chat_metadata":{}}"#,
            "\n",
            r#"{"name":"You","is_user":true,"is_system":false,"mes":"hello"}"#,
            "\n\n",
            r#"{"name":"Mia","is_user":false,"mes":"hi","swipes":["hi","hey"],"swipe_id":1,"extra":{}}"#,
            "\n"
        );
        let messages = parse_chat(raw).unwrap();
        assert_eq!(messages.len(), 2);
        assert!(messages[0].is_user);
        assert_eq!(messages[1].active_text(), "hey");
    }

    #[test]
    fn parses_json_array() {
        let messages = parse_chat(r#"[{"mes":"a"},{"mes":"b","is_system":true}]"#).unwrap();
        assert_eq!(messages.len(), 2);
        assert!(messages[0].is_assistant());
        assert!(!messages[1].is_assistant());
    }

    #[test]
    fn reports_the_broken_jsonl_line() {
        let err = parse_chat("{\"mes\":\"a\"}\n{oops").unwrap_err();
        assert!(matches!(err, StatusError::ChatLine { line: 2, .. }));
    }
}
