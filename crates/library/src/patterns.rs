// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! URL pattern matching for container roots.
//!
//! A `root_pattern` is either an anchored regex (written with a leading
//! `^`) or a glob where `*` matches any run of characters and `?` matches
//! exactly one. Globs are translated to anchored regexes.

use regex::Regex;

/// A compiled root URL pattern.
#[derive(Debug, Clone)]
pub struct UrlPattern {
    raw: String,
    regex: Regex,
}

impl UrlPattern {
    /// Compile a pattern string. Globs are translated; `^`-prefixed
    /// strings are taken as regexes verbatim.
    pub fn parse(pattern: &str) -> Result<Self, regex::Error> {
        let source = if pattern.starts_with('^') {
            pattern.to_string()
        } else {
            glob_to_regex(pattern)
        };
        Ok(Self { raw: pattern.to_string(), regex: Regex::new(&source)? })
    }

    pub fn matches(&self, url: &str) -> bool {
        self.regex.is_match(url)
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

fn glob_to_regex(glob: &str) -> String {
    let mut out = String::with_capacity(glob.len() + 8);
    out.push('^');
    for ch in glob.chars() {
        match ch {
            '*' => out.push_str(".*"),
            '?' => out.push('.'),
            // Escape regex metacharacters
            '.' | '+' | '(' | ')' | '[' | ']' | '{' | '}' | '^' | '$' | '|' | '\\' => {
                out.push('\\');
                out.push(ch);
            }
            _ => out.push(ch),
        }
    }
    out.push('$');
    out
}

#[cfg(test)]
#[path = "patterns_tests.rs"]
mod tests;
