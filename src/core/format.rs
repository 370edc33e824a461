/// Format converter — adapts already-rendered text to the requested
/// output representation. No directive awareness; strings in, strings out.

use serde::Serialize;
use std::str::FromStr;

/// Requested output representation for a rendered response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputFormat {
    Text,
    /// Passthrough; the renderer already emits markdown-safe text.
    Markdown,
    /// Wrap the rendered string as `{"content": ...}`.
    Json,
}

impl Default for OutputFormat {
    fn default() -> Self {
        Self::Text
    }
}

impl FromStr for OutputFormat {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(Self::Text),
            "markdown" => Ok(Self::Markdown),
            "json" => Ok(Self::Json),
            _ => Err(()),
        }
    }
}

#[derive(Serialize)]
struct JsonEnvelope<'a> {
    content: &'a str,
}

/// Convert rendered text to the requested representation.
pub fn convert(text: &str, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text | OutputFormat::Markdown => text.to_string(),
        OutputFormat::Json => {
            // Serializing a string envelope cannot fail.
            serde_json::to_string(&JsonEnvelope { content: text })
                .unwrap_or_else(|_| String::from("{\"content\":\"\"}"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_and_markdown_are_passthrough() {
        let text = "# Header\n- item {{MISSING: x}}\n";
        assert_eq!(convert(text, OutputFormat::Text), text);
        assert_eq!(convert(text, OutputFormat::Markdown), text);
    }

    #[test]
    fn json_wraps_content() {
        assert_eq!(
            convert("all clear", OutputFormat::Json),
            r#"{"content":"all clear"}"#
        );
    }

    #[test]
    fn json_escapes_quotes_and_newlines() {
        assert_eq!(
            convert("line \"one\"\nline two", OutputFormat::Json),
            r#"{"content":"line \"one\"\nline two"}"#
        );
    }

    #[test]
    fn format_from_str() {
        assert_eq!("text".parse::<OutputFormat>().unwrap(), OutputFormat::Text);
        assert_eq!(
            "markdown".parse::<OutputFormat>().unwrap(),
            OutputFormat::Markdown
        );
        assert_eq!("json".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert!("yaml".parse::<OutputFormat>().is_err());
    }
}
