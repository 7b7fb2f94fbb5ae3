//! User-facing descriptions of post load failures.

use std::fmt;

/// Turn a compile or fetch failure into the message shown to readers.
pub fn describe_failure(error: &impl fmt::Display) -> String {
    let message = error.to_string();

    if message.contains("Could not parse") {
        format!(
            "MDX Syntax Error:\n\n{message}\n\nTip: Check for emojis, special characters, or invalid syntax in template expressions."
        )
    } else if message.contains("Unexpected character") {
        format!(
            "MDX Parsing Error:\n\n{message}\n\nTip: Emojis and special characters must be wrapped in markdown text syntax [\"`...`\"] or removed from code blocks."
        )
    } else if message.contains("Failed to fetch") {
        "Network Error: Could not fetch blog post content.".to_string()
    } else if message.contains("Expected component") {
        format!(
            "Component Error:\n\n{message}\n\nTip: Ensure all custom components are defined in the post component set."
        )
    } else {
        message
    }
}
