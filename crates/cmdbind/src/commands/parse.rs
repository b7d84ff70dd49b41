//! Command-line tokenizing and completion.
//!
//! Splits raw input into argument tokens, honoring double-quoted spans,
//! and provides tab-completion for command names and `--` switches.

use tracing::trace;

use super::registry::CommandRegistry;

/// Split raw input into argument tokens.
///
/// Whitespace separates tokens except inside `"..."`. Quote delimiters are
/// stripped and `\"` becomes a literal quote, inside or outside a quoted
/// span. An unterminated quote runs to the end of the input.
pub fn tokenize(input: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    // A quoted span makes a token even if it ends up empty (`""`).
    let mut has_token = false;
    let mut quoted = false;
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '\\' if chars.peek() == Some(&'"') => {
                chars.next();
                current.push('"');
                has_token = true;
            }
            '"' => {
                quoted = !quoted;
                has_token = true;
            }
            ch if ch.is_whitespace() && !quoted => {
                if has_token {
                    tokens.push(std::mem::take(&mut current));
                    has_token = false;
                }
            }
            ch => {
                current.push(ch);
                has_token = true;
            }
        }
    }
    if has_token {
        tokens.push(current);
    }

    trace!(?tokens, "tokenized input");
    tokens
}

/// Split tokens into the command name and its arguments.
pub fn split_command<S: AsRef<str>>(tokens: &[S]) -> Option<(&str, &[S])> {
    let (name, rest) = tokens.split_first()?;
    Some((name.as_ref(), rest))
}

/// Quote a token so that `tokenize` reads it back unchanged.
pub fn quote(token: &str) -> String {
    let needs_quotes =
        token.is_empty() || token.chars().any(|ch| ch.is_whitespace() || ch == '"');
    if !needs_quotes {
        return token.to_string();
    }
    // Trailing backslashes stay outside the closing quote so they can't
    // escape it.
    let body = token.trim_end_matches('\\');
    let tail = &token[body.len()..];
    format!("\"{}\"{tail}", body.replace('"', "\\\""))
}

/// Rebuild a command line from tokens, quoting where needed.
pub fn join(tokens: &[String]) -> String {
    tokens
        .iter()
        .map(|token| quote(token))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Attempt to complete the current command input.
///
/// The first word completes against command names and aliases; later words
/// starting with `--` complete against the resolved command's switches.
/// Returns the completed line if a unique completion exists, or the
/// longest common prefix if several candidates match.
pub fn complete_input(registry: &CommandRegistry, input: &str) -> Option<String> {
    let ends_with_space = input.ends_with(char::is_whitespace);
    let mut parts: Vec<&str> = input.split_whitespace().collect();
    let current = if ends_with_space {
        ""
    } else {
        parts.pop().unwrap_or("")
    };
    let head = &input[..input.len() - current.len()];

    let mut candidates: Vec<String> = if parts.is_empty() {
        registry
            .names()
            .filter(|name| name.starts_with(current))
            .map(str::to_string)
            .collect()
    } else if let Some(switch) = current.strip_prefix("--") {
        let command = registry.resolve(parts[0])?;
        command
            .parameters()
            .iter()
            .filter(|parameter| parameter.name().starts_with(switch))
            .map(|parameter| format!("--{}", parameter.name()))
            .collect()
    } else {
        return None;
    };

    candidates.sort();
    candidates.dedup();
    if candidates.is_empty() {
        return None;
    }

    let common_prefix = longest_common_prefix(&candidates);
    if common_prefix.is_empty() || common_prefix == current {
        return None;
    }

    let mut completed = format!("{head}{common_prefix}");
    if candidates.len() == 1 && common_prefix == candidates[0] {
        completed.push(' ');
    }
    Some(completed)
}

fn longest_common_prefix(items: &[String]) -> String {
    if items.is_empty() {
        return String::new();
    }
    let mut prefix = items[0].clone();
    for item in &items[1..] {
        let mut next = String::new();
        for (a, b) in prefix.chars().zip(item.chars()) {
            if a == b {
                next.push(a);
            } else {
                break;
            }
        }
        prefix = next;
        if prefix.is_empty() {
            break;
        }
    }
    prefix
}
