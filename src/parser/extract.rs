//! Permissive extraction of per-paper blocks from free-form model text.

use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::prompt::{SCORE_KEY, TITLE_KEY, normalize_key};

/// Balanced top-level `{...}` spans of `text`, in order of appearance.
///
/// Braces inside JSON strings are ignored. An unterminated final span (the model stopped
/// mid-object) is dropped.
pub fn json_blocks(text: &str) -> Vec<&str> {
    let mut blocks = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in text.char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }

        match c {
            '"' if depth > 0 => in_string = true,
            '{' => {
                if depth == 0 {
                    start = i;
                }
                depth += 1;
            }
            '}' if depth > 0 => {
                depth -= 1;
                if depth == 0 {
                    blocks.push(&text[start..=i]);
                }
            }
            _ => {}
        }
    }

    if depth > 0 {
        debug!(chars = text.len() - start, "Dropping truncated trailing block");
    }

    blocks
}

/// Parses one block as a JSON object, repairing common model mistakes on failure.
///
/// A block that parses but decodes to control characters (unescaped LaTeX such as `$\tau$`
/// read as a tab) is re-read from the repaired text when that succeeds.
pub fn parse_object(block: &str) -> Option<Map<String, Value>> {
    if let Ok(Value::Object(map)) = serde_json::from_str(block) {
        if !map.values().any(has_control_chars) {
            return Some(map);
        }
        debug!("Block decoded to control characters, re-reading escapes literally");
        return match serde_json::from_str(&repair_json(block)) {
            Ok(Value::Object(repaired)) => Some(repaired),
            _ => Some(map),
        };
    }
    match serde_json::from_str(&repair_json(block)) {
        Ok(Value::Object(map)) => Some(map),
        Ok(_) => None,
        Err(e) => {
            warn!(error = %e, "Skipping unparseable response block");
            None
        }
    }
}

fn has_control_chars(value: &Value) -> bool {
    match value {
        Value::String(s) => s.chars().any(char::is_control),
        Value::Array(items) => items.iter().any(has_control_chars),
        Value::Object(map) => map.values().any(has_control_chars),
        _ => false,
    }
}

/// Escapes stray backslashes and raw control characters inside strings and drops trailing
/// commas.
///
/// `\b`, `\f`, `\n`, `\r` and `\t` followed by a letter are LaTeX commands (`\beta`,
/// `\nabla`), and `\u` without four hex digits is `\upsilon`; both keep a literal backslash.
fn repair_json(block: &str) -> String {
    let mut out = String::with_capacity(block.len() + 16);
    let mut chars = block.chars().peekable();
    let mut in_string = false;

    while let Some(c) = chars.next() {
        if in_string {
            match c {
                '\\' => match chars.peek().copied() {
                    Some(next) if is_valid_escape(next, chars.clone().skip(1)) => {
                        out.push('\\');
                        out.push(next);
                        chars.next();
                    }
                    _ => out.push_str("\\\\"),
                },
                '"' => {
                    in_string = false;
                    out.push(c);
                }
                '\n' => out.push_str("\\n"),
                '\r' => out.push_str("\\r"),
                '\t' => out.push_str("\\t"),
                _ => out.push(c),
            }
            continue;
        }

        match c {
            '"' => {
                in_string = true;
                out.push(c);
            }
            ',' => {
                let rest = chars.clone().find(|ch| !ch.is_whitespace());
                if !matches!(rest, Some('}') | Some(']')) {
                    out.push(c);
                }
            }
            _ => out.push(c),
        }
    }

    out
}

/// Fallback for responses without JSON: blocks of `Key: value` lines, each block starting at
/// a `Title:` line (optionally numbered, e.g. `2. Title: ...`).
///
/// Only keys in `known` (normalized) are kept; continuation lines extend the previous value.
pub fn labeled_blocks(text: &str, known: &[String]) -> Vec<Map<String, Value>> {
    let title_key = normalize_key(TITLE_KEY);
    let score_key = normalize_key(SCORE_KEY);

    let mut blocks: Vec<Map<String, Value>> = Vec::new();
    let mut last_key: Option<String> = None;

    for line in text.lines() {
        let line = strip_list_marker(line.trim());
        if line.is_empty() || line.starts_with("###") {
            last_key = None;
            continue;
        }

        let labeled = line.split_once(':').and_then(|(label, value)| {
            let label = clean_label(label);
            let key = normalize_key(label);
            let recognized = key == title_key || key == score_key || known.contains(&key);
            recognized.then(|| (label.to_string(), key, clean_value(value).to_string()))
        });

        match labeled {
            Some((label, key, value)) => {
                if key == title_key {
                    blocks.push(Map::new());
                }
                if let Some(current) = blocks.last_mut() {
                    current.insert(label.clone(), Value::String(value));
                    last_key = Some(label);
                }
            }
            None => {
                if let (Some(label), Some(current)) = (last_key.as_ref(), blocks.last_mut())
                    && let Some(Value::String(existing)) = current.get_mut(label)
                {
                    existing.push(' ');
                    existing.push_str(line);
                }
            }
        }
    }

    blocks
}

fn is_valid_escape(next: char, mut rest: impl Iterator<Item = char>) -> bool {
    match next {
        '"' | '\\' | '/' => true,
        'b' | 'f' | 'n' | 'r' | 't' => !rest.next().is_some_and(|c| c.is_ascii_alphabetic()),
        'u' => (0..4).all(|_| rest.next().is_some_and(|c| c.is_ascii_hexdigit())),
        _ => false,
    }
}

/// Drops Markdown emphasis around a label, e.g. `**Title` from `**Title:** ...`.
fn clean_label(label: &str) -> &str {
    label.trim().trim_matches(['*', '_']).trim()
}

/// Drops emphasis, quotes and backticks wrapping a value, e.g. `** "Paper A"`.
fn clean_value(value: &str) -> &str {
    value.trim().trim_matches(['*', '_', '"', '`']).trim()
}

fn strip_list_marker(line: &str) -> &str {
    let digits = line.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits > 0
        && let Some(rest) = line[digits..].strip_prefix('.')
    {
        return rest.trim_start();
    }
    line.trim_start_matches(['-', '*']).trim_start()
}
