//! Parsing of stdin lines into events.
//!
//! A line is `<event-name> [json-args]`. Blank lines and lines starting with
//! `#` are skipped.

use crate::error::ReflexError;

use serde_json::Value;

const COMMENT_PREFIX: char = '#';

/// One event requested on stdin.
#[derive(Debug, Clone, PartialEq)]
pub struct EventCommand {
    pub name: String,
    pub args: Option<Value>,
}

/// Parse one input line.
///
/// # Errors
///
/// Returns [`ReflexError::Input`] if the arguments are not valid JSON.
pub fn parse_line(line: &str) -> Result<Option<EventCommand>, ReflexError> {
    let line = line.trim();
    if line.is_empty() || line.starts_with(COMMENT_PREFIX) {
        return Ok(None);
    }

    let (name, rest) = match line.split_once(char::is_whitespace) {
        Some((name, rest)) => (name, rest.trim()),
        None => (line, ""),
    };

    let args = if rest.is_empty() {
        None
    } else {
        let value = serde_json::from_str(rest).map_err(|e| {
            ReflexError::input(format!("Arguments for '{name}' are not valid JSON: {e}"))
        })?;
        Some(value)
    };

    Ok(Some(EventCommand {
        name: name.to_string(),
        args,
    }))
}
