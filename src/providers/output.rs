//! Responses API output items and text extraction

use serde::Deserialize;

/// One entry of a Responses API `output` array.
///
/// Only the fields needed to find answer text are modelled; tool calls
/// (`file_search_call`, `function_call`, ...) and reasoning items
/// deserialize fine and simply contribute nothing.
#[derive(Debug, Clone, Deserialize)]
pub struct OutputItem {
    #[serde(rename = "type", default)]
    pub kind: String,

    #[serde(default)]
    pub content: Option<ItemContent>,

    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ItemContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Debug, Clone, Deserialize)]
pub struct ContentPart {
    #[serde(rename = "type", default)]
    pub kind: String,

    #[serde(default)]
    pub text: Option<String>,
}

impl OutputItem {
    fn carries_answer(&self) -> bool {
        !(self.kind.ends_with("_call") || self.kind == "reasoning")
    }

    /// First non-blank text fragment of this item, trimmed
    pub fn text(&self) -> Option<&str> {
        if !self.carries_answer() {
            return None;
        }

        let direct = self.text.as_deref().map(str::trim).filter(|t| !t.is_empty());
        if direct.is_some() {
            return direct;
        }

        match self.content.as_ref()? {
            ItemContent::Text(text) => Some(text.trim()).filter(|t| !t.is_empty()),
            ItemContent::Parts(parts) => parts
                .iter()
                .filter(|p| matches!(p.kind.as_str(), "output_text" | "text" | ""))
                .filter_map(|p| p.text.as_deref())
                .map(str::trim)
                .find(|t| !t.is_empty()),
        }
    }
}

/// Scan outputs in array order; the first item with usable text wins.
pub fn first_text(outputs: &[OutputItem]) -> Option<String> {
    outputs.iter().find_map(|item| item.text()).map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn items(value: serde_json::Value) -> Vec<OutputItem> {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_tool_call_then_message() {
        let outputs = items(json!([
            {
                "type": "file_search_call",
                "id": "fs_1",
                "status": "completed",
                "queries": ["guest list"],
                "results": null
            },
            {
                "type": "message",
                "role": "assistant",
                "content": [
                    { "type": "output_text", "text": "Your next guest is Dana.", "annotations": [] }
                ]
            }
        ]));

        assert_eq!(first_text(&outputs).as_deref(), Some("Your next guest is Dana."));
    }

    #[test]
    fn test_first_message_wins() {
        let outputs = items(json!([
            { "type": "message", "content": [{ "type": "output_text", "text": "first" }] },
            { "type": "message", "content": [{ "type": "output_text", "text": "second" }] }
        ]));

        assert_eq!(first_text(&outputs).as_deref(), Some("first"));
    }

    #[test]
    fn test_blank_text_is_skipped() {
        let outputs = items(json!([
            { "type": "message", "content": [{ "type": "output_text", "text": "   \n" }] },
            { "type": "message", "content": [
                { "type": "refusal", "refusal": "no" },
                { "type": "output_text", "text": "  padded answer  " }
            ] }
        ]));

        assert_eq!(first_text(&outputs).as_deref(), Some("padded answer"));
    }

    #[test]
    fn test_reasoning_summary_is_not_an_answer() {
        let outputs = items(json!([
            { "type": "reasoning", "text": "thinking about transcripts" },
            { "type": "message", "content": "plain string content" }
        ]));

        assert_eq!(first_text(&outputs).as_deref(), Some("plain string content"));
    }

    #[test]
    fn test_no_text() {
        let outputs = items(json!([
            { "type": "function_call", "name": "lookup", "arguments": "{}" },
            { "type": "message", "content": null }
        ]));

        assert!(first_text(&outputs).is_none());
        assert!(first_text(&[]).is_none());
    }
}
