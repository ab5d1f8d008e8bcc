//! Prompt helpers
//!
//! Tool schema builder plus the lenient parsing used wherever a model is
//! asked for structured output.

use serde::de::DeserializeOwned;
use support_agent_core::ToolDefinition;

/// Builder for function-calling tool definitions
///
/// # Example
///
/// ```ignore
/// let tool = ToolBuilder::new("lookup_order", "Look up an order status")
///     .param("email", "string", "Customer email", true)
///     .param("order_number", "string", "Order number", true)
///     .build();
/// ```
pub struct ToolBuilder {
    name: String,
    description: String,
    properties: serde_json::Map<String, serde_json::Value>,
    required: Vec<String>,
}

impl ToolBuilder {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            properties: serde_json::Map::new(),
            required: Vec::new(),
        }
    }

    /// Add a parameter with type and description
    pub fn param(
        mut self,
        name: impl Into<String>,
        param_type: &str,
        description: impl Into<String>,
        required: bool,
    ) -> Self {
        let name = name.into();
        self.properties.insert(
            name.clone(),
            serde_json::json!({
                "type": param_type,
                "description": description.into(),
            }),
        );
        if required {
            self.required.push(name);
        }
        self
    }

    /// Add enum constraint to an existing string parameter
    pub fn string_enum(mut self, name: &str, values: &[&str]) -> Self {
        if let Some(obj) = self.properties.get_mut(name).and_then(|p| p.as_object_mut()) {
            obj.insert("enum".to_string(), serde_json::json!(values));
        }
        self
    }

    pub fn build(self) -> ToolDefinition {
        let parameters = serde_json::json!({
            "type": "object",
            "properties": self.properties,
            "required": self.required,
        });
        ToolDefinition::new(self.name, self.description, parameters)
    }
}

/// Slice out the first `{ ... }` span of a model response
///
/// Models often wrap JSON in prose or code fences; this takes everything from
/// the first `{` to the last `}`.
pub fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

/// Parse the JSON object embedded in a model response
pub fn parse_json_response<T: DeserializeOwned>(text: &str) -> Result<T, String> {
    let json = extract_json_object(text).ok_or_else(|| "no JSON object in response".to_string())?;
    serde_json::from_str(json).map_err(|e| e.to_string())
}

/// Truncate at a word boundary, appending `...` when shortened
pub fn truncate_text(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }

    let truncated: String = text.chars().take(max_chars).collect();
    match truncated.rfind(' ') {
        Some(pos) if pos > 0 => format!("{}...", truncated[..pos].trim_end()),
        _ => format!("{}...", truncated),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[test]
    fn test_tool_builder() {
        let tool = ToolBuilder::new("search_products", "Search the catalog")
            .param("query", "string", "Search query", true)
            .param("exclude_terms", "string", "Terms to exclude", false)
            .build();

        assert_eq!(tool.name, "search_products");
        assert_eq!(tool.parameters["required"], serde_json::json!(["query"]));
        assert_eq!(tool.parameters["properties"]["query"]["type"], "string");
    }

    #[test]
    fn test_string_enum() {
        let tool = ToolBuilder::new("t", "d")
            .param("level", "string", "Level", true)
            .string_enum("level", &["low", "high"])
            .build();
        assert_eq!(
            tool.parameters["properties"]["level"]["enum"],
            serde_json::json!(["low", "high"])
        );
    }

    #[test]
    fn test_extract_json_from_prose() {
        let text = "Sure! Here you go:\n```json\n{\"ids\": [\"a\", \"b\"]}\n```\nHope it helps.";
        assert_eq!(extract_json_object(text), Some("{\"ids\": [\"a\", \"b\"]}"));
        assert_eq!(extract_json_object("no json here"), None);
        assert_eq!(extract_json_object("} backwards {"), None);
    }

    #[test]
    fn test_parse_json_response() {
        #[derive(Deserialize)]
        struct Selection {
            ids: Vec<String>,
        }

        let parsed: Selection = parse_json_response("ok {\"ids\": [\"p1\"]} done").unwrap();
        assert_eq!(parsed.ids, vec!["p1"]);
        assert!(parse_json_response::<Selection>("{\"ids\": [}").is_err());
    }

    #[test]
    fn test_truncate_text() {
        assert_eq!(truncate_text("kısa", 10), "kısa");
        assert_eq!(truncate_text("siyah taşlı çelik kolye", 12), "siyah taşlı...");
        assert_eq!(truncate_text("abcdefghij", 4), "abcd...");
    }
}
