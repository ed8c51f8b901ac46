//! Identifier quoting and value escaping primitives.
//!
//! Everything that lands in a SQL fragment passes through here first:
//! identifiers get backtick-quoted with [`tick`], values get escaped into
//! single-quoted literals with [`Sanitizer::quote`].

use std::fmt;
use std::sync::Arc;

/// Turns a raw value into a single-quoted SQL string literal.
///
/// Executors with a live connection provide their own escaping; detached
/// queries fall back to [`ManualEscape`].
pub trait Escape: Send + Sync {
    fn escape(&self, raw: &str) -> String;
}

/// Conservative escaping used when no connection is available.
///
/// Doubles single quotes and backslashes so the value can never terminate
/// the surrounding literal, whatever `NO_BACKSLASH_ESCAPES` is set to.
#[derive(Debug, Clone, Copy, Default)]
pub struct ManualEscape;

impl Escape for ManualEscape {
    fn escape(&self, raw: &str) -> String {
        let mut out = String::with_capacity(raw.len() + 2);
        out.push('\'');
        for c in raw.chars() {
            match c {
                '\'' => out.push_str("''"),
                '\\' => out.push_str("\\\\"),
                '\0' => out.push_str("\\0"),
                c => out.push(c),
            }
        }
        out.push('\'');
        out
    }
}

/// MySQL's native escaping rules (`mysql_real_escape_string`).
#[derive(Debug, Clone, Copy, Default)]
pub struct MySqlEscape;

impl Escape for MySqlEscape {
    fn escape(&self, raw: &str) -> String {
        let mut out = String::with_capacity(raw.len() + 2);
        out.push('\'');
        for c in raw.chars() {
            match c {
                '\0' => out.push_str("\\0"),
                '\n' => out.push_str("\\n"),
                '\r' => out.push_str("\\r"),
                '\\' => out.push_str("\\\\"),
                '\'' => out.push_str("\\'"),
                '"' => out.push_str("\\\""),
                '\x1a' => out.push_str("\\Z"),
                c => out.push(c),
            }
        }
        out.push('\'');
        out
    }
}

/// Value escaper bound to a query.
#[derive(Clone)]
pub struct Sanitizer {
    escaper: Arc<dyn Escape>,
}

impl fmt::Debug for Sanitizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sanitizer").finish_non_exhaustive()
    }
}

impl Default for Sanitizer {
    fn default() -> Self {
        Self::manual()
    }
}

impl Sanitizer {
    pub fn new(escaper: Arc<dyn Escape>) -> Self {
        Self { escaper }
    }

    /// A sanitizer with no connection behind it.
    pub fn manual() -> Self {
        Self::new(Arc::new(ManualEscape))
    }

    /// Escape a value into a string literal, ready for concatenation.
    pub fn quote(&self, value: &str) -> String {
        self.escaper.escape(value)
    }

    /// Render a loosely typed operand: `?` and numbers pass through,
    /// everything else is quoted.
    pub fn literal(&self, value: &str) -> String {
        let value = value.trim();
        if value == "?" || is_numeric(value) {
            value.to_string()
        } else {
            self.quote(value)
        }
    }
}

/// Wrap an identifier in backticks.
///
/// `*` and identifiers that are already ticked are returned unchanged;
/// embedded backticks are doubled.
pub fn tick(identifier: &str) -> String {
    let ident = identifier.trim();
    if ident == "*" || is_ticked(ident) {
        return ident.to_string();
    }
    format!("`{}`", ident.replace('`', "``"))
}

/// Split `table.field` into the bare field and a ready-to-concatenate table
/// prefix (`` `table`. ``). The prefix is empty when there is no qualifier.
pub fn fix_dot(field: &str) -> (String, String) {
    let field = field.trim();
    let Some(pos) = last_unticked_dot(field) else {
        return (field.to_string(), String::new());
    };

    let prefix: Vec<String> = split_unticked(&field[..pos], '.')
        .into_iter()
        .map(tick)
        .collect();
    (field[pos + 1..].to_string(), format!("{}.", prefix.join(".")))
}

/// Detect an alias (`x AS y`, `x as y` or bare `x y`) and return the base
/// fragment plus a ready `` AS `y` `` suffix, or an empty suffix.
pub fn fix_as(fragment: &str) -> (String, String) {
    let fragment = fragment.trim();
    let upper = fragment.to_ascii_uppercase();

    if let Some(pos) = upper.rfind(" AS ") {
        let base = fragment[..pos].trim();
        let alias = fragment[pos + 4..].trim();
        if !base.is_empty() && is_alias(alias) {
            return (base.to_string(), format!(" AS {}", tick(alias)));
        }
    }

    // Bare alias: only whitespace after the last closing paren counts.
    let tail_start = fragment.rfind(')').map_or(0, |p| p + 1);
    if let Some(pos) = fragment[tail_start..].rfind(char::is_whitespace) {
        let pos = tail_start + pos;
        let base = fragment[..pos].trim();
        let alias = fragment[pos + 1..].trim();
        if !base.is_empty() && !base.ends_with(is_operator_char) && is_alias(alias) {
            return (base.to_string(), format!(" AS {}", tick(alias)));
        }
    }

    (fragment.to_string(), String::new())
}

/// Strip surrounding quote characters from a raw operand.
pub fn trim_quotes(value: &str) -> &str {
    value.trim().trim_matches(|c| c == '\'' || c == '"')
}

/// Integer or decimal literal, optionally signed.
pub fn is_numeric(value: &str) -> bool {
    let digits = value.strip_prefix('-').unwrap_or(value);
    let mut seen_dot = false;
    let mut seen_digit = false;
    for c in digits.chars() {
        match c {
            '0'..='9' => seen_digit = true,
            '.' if !seen_dot => seen_dot = true,
            _ => return false,
        }
    }
    seen_digit && !digits.starts_with('.') && !digits.ends_with('.')
}

fn is_ticked(ident: &str) -> bool {
    ident.len() >= 2 && ident.starts_with('`') && ident.ends_with('`') && !ident.contains("`.`")
}

fn is_alias(alias: &str) -> bool {
    !alias.is_empty()
        && alias
            .chars()
            .all(|c| c.is_alphanumeric() || c == '_' || c == '`')
}

fn is_operator_char(c: char) -> bool {
    matches!(c, '=' | '<' | '>' | '!' | ',' | '(')
}

fn last_unticked_dot(s: &str) -> Option<usize> {
    let mut in_tick = false;
    let mut last = None;
    for (i, c) in s.char_indices() {
        match c {
            '`' => in_tick = !in_tick,
            '.' if !in_tick => last = Some(i),
            _ => {}
        }
    }
    last
}

/// Split on `sep` outside backticks.
fn split_unticked(s: &str, sep: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut in_tick = false;
    let mut start = 0;
    for (i, c) in s.char_indices() {
        if c == '`' {
            in_tick = !in_tick;
        } else if c == sep && !in_tick {
            parts.push(&s[start..i]);
            start = i + c.len_utf8();
        }
    }
    parts.push(&s[start..]);
    parts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tick() {
        assert_eq!(tick("users"), "`users`");
        assert_eq!(tick("`users`"), "`users`");
        assert_eq!(tick("*"), "*");
        assert_eq!(tick("we`ird"), "`we``ird`");
    }

    #[test]
    fn test_fix_dot() {
        assert_eq!(fix_dot("users.id"), ("id".to_string(), "`users`.".to_string()));
        assert_eq!(fix_dot("id"), ("id".to_string(), String::new()));
        assert_eq!(
            fix_dot("shop.users.id"),
            ("id".to_string(), "`shop`.`users`.".to_string())
        );
        assert_eq!(fix_dot("`a.b`"), ("`a.b`".to_string(), String::new()));
    }

    #[test]
    fn test_fix_as() {
        assert_eq!(fix_as("name AS n"), ("name".to_string(), " AS `n`".to_string()));
        assert_eq!(fix_as("name as n"), ("name".to_string(), " AS `n`".to_string()));
        assert_eq!(fix_as("users u"), ("users".to_string(), " AS `u`".to_string()));
        assert_eq!(fix_as("users"), ("users".to_string(), String::new()));
        assert_eq!(
            fix_as("COUNT(DISTINCT id) total"),
            ("COUNT(DISTINCT id)".to_string(), " AS `total`".to_string())
        );
        assert_eq!(fix_as("COUNT(DISTINCT id)"), ("COUNT(DISTINCT id)".to_string(), String::new()));
    }

    #[test]
    fn test_manual_escape() {
        let s = Sanitizer::manual();
        assert_eq!(s.quote("O'Brien"), "'O''Brien'");
        assert_eq!(s.quote("a\\'b"), "'a\\\\''b'");
    }

    #[test]
    fn test_mysql_escape() {
        let s = Sanitizer::new(Arc::new(MySqlEscape));
        assert_eq!(s.quote("O'Brien"), "'O\\'Brien'");
        assert_eq!(s.quote("line\nbreak"), "'line\\nbreak'");
    }

    #[test]
    fn test_literal() {
        let s = Sanitizer::manual();
        assert_eq!(s.literal("42"), "42");
        assert_eq!(s.literal("-3.5"), "-3.5");
        assert_eq!(s.literal("?"), "?");
        assert_eq!(s.literal("john"), "'john'");
        assert_eq!(s.literal("1.2.3"), "'1.2.3'");
    }

    #[test]
    fn test_is_numeric() {
        assert!(is_numeric("0"));
        assert!(is_numeric("-12"));
        assert!(!is_numeric("."));
        assert!(!is_numeric("1."));
        assert!(!is_numeric("inf"));
        assert!(!is_numeric(""));
    }
}
