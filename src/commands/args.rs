//! Text command line parsing: `/name[@bot] [words...] -option value -flag`.

use std::sync::OnceLock;

use regex::Regex;

/// A command line split into its raw parts, before typing against a schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedLine {
    pub command: String,
    /// Words before the first option.
    pub positional: Vec<String>,
    /// Options in order of appearance. A bare flag has no value.
    pub options: Vec<(String, Option<String>)>,
}

fn option_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?:^|\s)-{1,2}([A-Za-z][A-Za-z0-9_]*)(?:\s|$)").expect("valid option regex")
    })
}

/// Split a line into command, positional words and options.
///
/// Only `-name` tokens for which `accept` returns true start an option;
/// any other dashed word stays part of the surrounding text. Option values
/// run until the next accepted option and may contain spaces.
/// Returns `None` for empty input.
pub fn parse_line(line: &str, accept: impl Fn(&str) -> bool) -> Option<ParsedLine> {
    let line = line.trim();
    let (head, rest) = match line.find(char::is_whitespace) {
        Some(idx) => (&line[..idx], line[idx..].trim_start()),
        None => (line, ""),
    };

    let command = head
        .trim_start_matches('/')
        .split('@')
        .next()
        .unwrap_or("")
        .to_lowercase();
    if command.is_empty() {
        return None;
    }

    let pattern = option_pattern();
    let mut starts = Vec::new();
    // Matches may share the whitespace between an empty flag and the next
    // option, so scan from the end of each name rather than of each match.
    let mut from = 0;
    while let Some(caps) = pattern.captures_at(rest, from) {
        let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else { break };
        let lowered = name.as_str().to_lowercase();
        if accept(&lowered) {
            starts.push((whole.start(), name.end(), lowered));
        }
        from = name.end();
    }

    let positional_end = starts.first().map_or(rest.len(), |(start, _, _)| *start);
    let positional = rest[..positional_end]
        .split_whitespace()
        .map(str::to_string)
        .collect();

    let options = starts
        .iter()
        .enumerate()
        .map(|(i, (_, value_start, name))| {
            let value_end = starts.get(i + 1).map_or(rest.len(), |(next, _, _)| *next);
            let value = rest[*value_start..value_end].trim();
            let value = (!value.is_empty()).then(|| value.to_string());
            (name.clone(), value)
        })
        .collect();

    Some(ParsedLine {
        command,
        positional,
        options,
    })
}

/// Interpret a boolean option value. A bare flag counts as `true`.
pub fn parse_bool(value: Option<&str>) -> Option<bool> {
    match value.map(|v| v.to_lowercase()).as_deref() {
        None => Some(true),
        Some("true" | "yes" | "y" | "1" | "on") => Some(true),
        Some("false" | "no" | "n" | "0" | "off") => Some(false),
        Some(_) => None,
    }
}
