//! Route patterns.
//!
//! Every route condition is compiled once, at registration, into a
//! [`Pattern`]. Matching a pattern yields the [`RouteArgs`] the handler is
//! resolved against.
//!
//! Two template dialects exist:
//!
//! | Placeholder | Command template         | Callback template            |
//! |-------------|--------------------------|------------------------------|
//! | `{name}`    | `(?P<name>\S+)`          | `(?P<name>[a-zA-Z0-9_-]+)`   |
//! | `%s`        | `(.+)`                   | `(.+)`                       |
//! | `%w`        | `(\S+)`                  | `([a-zA-Z0-9_]+)`            |
//! | `%n`        | `(\d+)`                  | `(\d+)`                      |
//!
//! Command templates are whitespace-tokenised and their tokens joined by
//! `\s+`; callback templates are matched character for character.

use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::error::SetupError;
use crate::handler::RouteArgs;

static NAMED_PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{([a-zA-Z0-9_]+)\}").expect("invalid placeholder regex")
});

static ESCAPED_PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\\\{([a-zA-Z0-9_]+)\\\}").expect("invalid placeholder regex")
});

/// Returns `true` if `pattern` uses `%` or `{name}` placeholders.
pub fn is_template(pattern: &str) -> bool {
    pattern.contains('%') || pattern.contains('{')
}

/// A compiled route condition.
#[derive(Debug, Clone)]
pub enum Pattern {
    /// Whole input equality.
    Exact(String),
    /// A plain command followed by end of input or whitespace; the rest is
    /// split into positional arguments. `/` commands ignore case.
    Prefix { command: String, ignore_case: bool },
    /// A regular expression whose captures become route arguments.
    Regex(Regex),
}

impl Pattern {
    pub fn exact(value: impl Into<String>) -> Self {
        Self::Exact(value.into())
    }

    /// Compiles a command condition (`/ban {user_id}`, `!roll %n`, `!help`).
    pub fn command(pattern: &str) -> Result<Self, SetupError> {
        if !is_template(pattern) {
            return Ok(Self::Prefix {
                command: pattern.to_string(),
                ignore_case: is_slash_command(pattern),
            });
        }
        compile(pattern, &command_regex(pattern))
    }

    /// Compiles a callback condition (`page_%n`, `item_{id}`, `menu`).
    pub fn callback(pattern: &str) -> Result<Self, SetupError> {
        if !is_template(pattern) {
            return Ok(Self::exact(pattern));
        }
        compile(pattern, &callback_regex(pattern))
    }

    /// Compiles a user-supplied regular expression.
    pub fn regex(pattern: &str) -> Result<Self, SetupError> {
        compile(pattern, pattern)
    }

    /// Matches `input`, returning the captured arguments.
    pub fn matches(&self, input: &str) -> Option<RouteArgs> {
        match self {
            Self::Exact(value) => (value == input).then(RouteArgs::new),
            Self::Prefix {
                command,
                ignore_case,
            } => {
                let rest = if *ignore_case {
                    strip_prefix_ignore_case(input, command)?
                } else {
                    input.strip_prefix(command.as_str())?
                };
                if !rest.chars().next().is_none_or(char::is_whitespace) {
                    return None;
                }
                Some(RouteArgs::positional_from(rest.split_whitespace()))
            }
            Self::Regex(regex) => regex.captures(input).map(|caps| clean_captures(regex, &caps)),
        }
    }
}

fn compile(pattern: &str, source: &str) -> Result<Pattern, SetupError> {
    Regex::new(source)
        .map(Pattern::Regex)
        .map_err(|e| SetupError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })
}

fn command_regex(pattern: &str) -> String {
    let parts: Vec<String> = pattern
        .split_whitespace()
        .map(|token| match token {
            "%s" => "(.+)".to_string(),
            "%w" => r"(\S+)".to_string(),
            "%n" => r"(\d+)".to_string(),
            _ => placeholders(token, r"\S+"),
        })
        .collect();
    let flags = if is_slash_command(pattern) { "(?i)" } else { "" };
    format!(r"{flags}^{}$", parts.join(r"\s+"))
}

fn is_slash_command(pattern: &str) -> bool {
    pattern.starts_with('/')
}

/// Escapes `token`, turning each `{name}` into a named group of `class`.
fn placeholders(token: &str, class: &str) -> String {
    let mut out = String::new();
    let mut last = 0;
    for caps in NAMED_PLACEHOLDER.captures_iter(token) {
        let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        out.push_str(&regex::escape(&token[last..whole.start()]));
        out.push_str(&format!("(?P<{}>{class})", name.as_str()));
        last = whole.end();
    }
    out.push_str(&regex::escape(&token[last..]));
    out
}

fn callback_regex(pattern: &str) -> String {
    let escaped = regex::escape(pattern);
    let named = ESCAPED_PLACEHOLDER.replace_all(&escaped, "(?P<${1}>[a-zA-Z0-9_-]+)");
    let body = named
        .replace("%n", r"(\d+)")
        .replace("%w", "([a-zA-Z0-9_]+)")
        .replace("%s", "(.+)");
    format!("^{body}$")
}

/// Named groups by name; every participating group, in order, positionally.
fn clean_captures(regex: &Regex, caps: &Captures<'_>) -> RouteArgs {
    let mut args = RouteArgs::new();
    for (index, name) in regex.capture_names().enumerate().skip(1) {
        let Some(value) = caps.get(index) else {
            continue;
        };
        if let Some(name) = name {
            args.insert(name, value.as_str());
        }
        args.push(value.as_str());
    }
    args
}

fn strip_prefix_ignore_case<'a>(input: &'a str, prefix: &str) -> Option<&'a str> {
    let head = input.get(..prefix.len())?;
    (head.to_lowercase() == prefix.to_lowercase()).then(|| &input[prefix.len()..])
}
