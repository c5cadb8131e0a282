//! Pattern compilation and field rewriting.
//!
//! Patterns run on the `regex` crate, whose matching time is linear in the
//! input, and compilation is capped by a program size limit. User-supplied
//! patterns therefore cannot trigger catastrophic backtracking; constructs
//! that need backtracking (look-around, back-references) are rejected at
//! compile time instead.

use super::request::RegexPreviewEntry;
use crate::config::DEFAULT_REGEX_SIZE_LIMIT;
use crate::{Error, Result};
use regex::{Regex, RegexBuilder};
use std::borrow::Cow;

/// Parsed flag string (`"gi"`, `"gm"`, ...).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegexFlags {
    pub global: bool,
    pub case_insensitive: bool,
    pub multi_line: bool,
    pub dot_all: bool,
    pub verbose: bool,
}

impl RegexFlags {
    pub fn parse(flags: &str) -> std::result::Result<Self, String> {
        let mut out = RegexFlags::default();
        let mut seen = String::new();
        for c in flags.chars().filter(|c| !c.is_whitespace()) {
            if seen.contains(c) {
                return Err(format!("flag `{c}` given more than once"));
            }
            seen.push(c);
            match c {
                'g' => out.global = true,
                'i' => out.case_insensitive = true,
                'm' => out.multi_line = true,
                's' => out.dot_all = true,
                'x' => out.verbose = true,
                // Matching is always Unicode-aware.
                'u' => {}
                'y' => return Err("sticky flag `y` is not supported".to_string()),
                other => return Err(format!("unknown flag `{other}`")),
            }
        }
        Ok(out)
    }
}

/// A compiled find/replace ready to run against field values.
#[derive(Debug, Clone)]
pub struct CompiledRewrite {
    regex: Regex,
    replacement: String,
    flags: RegexFlags,
}

impl CompiledRewrite {
    pub fn compile(pattern: &str, replacement: &str, flags: &str) -> Result<Self> {
        Self::compile_with_limit(pattern, replacement, flags, DEFAULT_REGEX_SIZE_LIMIT)
    }

    pub fn compile_with_limit(
        pattern: &str,
        replacement: &str,
        flags: &str,
        size_limit: usize,
    ) -> Result<Self> {
        let compile_err = |message: String| Error::PatternCompile {
            pattern: pattern.to_string(),
            message,
        };

        if pattern.is_empty() {
            return Err(compile_err("pattern is empty".to_string()));
        }
        let flags = RegexFlags::parse(flags).map_err(compile_err)?;

        let regex = RegexBuilder::new(pattern)
            .case_insensitive(flags.case_insensitive)
            .multi_line(flags.multi_line)
            .dot_matches_new_line(flags.dot_all)
            .ignore_whitespace(flags.verbose)
            .size_limit(size_limit)
            .dfa_size_limit(size_limit)
            .build()
            .map_err(|e| compile_err(e.to_string()))?;

        let names: Vec<String> = regex.capture_names().flatten().map(String::from).collect();
        let replacement = translate_replacement(replacement, regex.captures_len(), &names);

        Ok(Self {
            regex,
            replacement,
            flags,
        })
    }

    pub fn flags(&self) -> RegexFlags {
        self.flags
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }

    /// Replace every match, or only the first when the global flag is absent.
    pub fn rewrite<'t>(&self, text: &'t str) -> Cow<'t, str> {
        if self.flags.global {
            self.regex.replace_all(text, self.replacement.as_str())
        } else {
            self.regex.replace(text, self.replacement.as_str())
        }
    }

    /// Preview row for one record, or `None` if the pattern does not match.
    pub fn preview(&self, id: &str, title: &str, value: &str) -> Option<RegexPreviewEntry> {
        if !self.is_match(value) {
            return None;
        }
        Some(RegexPreviewEntry {
            id: id.to_string(),
            title: title.to_string(),
            before: value.to_string(),
            after: self.rewrite(value).into_owned(),
        })
    }
}

/// Convert `$1`, `$&`, `$<name>` and `$$` into the regex crate's `${..}` syntax.
///
/// References to groups that do not exist stay literal, so `$9` with two
/// groups inserts the text `$9`.
fn translate_replacement(rep: &str, captures_len: usize, names: &[String]) -> String {
    let chars: Vec<char> = rep.chars().collect();
    let group_ok = |n: usize| n >= 1 && n < captures_len;
    let mut out = String::with_capacity(rep.len() + 8);
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if c != '$' {
            out.push(c);
            i += 1;
            continue;
        }
        match chars.get(i + 1).copied() {
            Some('$') => {
                out.push_str("$$");
                i += 2;
            }
            Some('&') => {
                out.push_str("${0}");
                i += 2;
            }
            Some('<') => {
                let close = chars[i + 2..].iter().position(|&c| c == '>');
                match close {
                    Some(off) => {
                        let name: String = chars[i + 2..i + 2 + off].iter().collect();
                        if names.iter().any(|n| *n == name) {
                            out.push_str(&format!("${{{name}}}"));
                        } else {
                            out.push_str("$$<");
                            out.push_str(&name);
                            out.push('>');
                        }
                        i += 3 + off;
                    }
                    None => {
                        out.push_str("$$");
                        i += 1;
                    }
                }
            }
            Some(d1) if d1.is_ascii_digit() => {
                let n1 = d1.to_digit(10).unwrap_or(0) as usize;
                let two = chars
                    .get(i + 2)
                    .and_then(|d2| d2.to_digit(10))
                    .map(|n2| n1 * 10 + n2 as usize)
                    .filter(|n| group_ok(*n));
                if let Some(n) = two {
                    out.push_str(&format!("${{{n}}}"));
                    i += 3;
                } else if group_ok(n1) {
                    out.push_str(&format!("${{{n1}}}"));
                    i += 2;
                } else {
                    out.push_str("$$");
                    out.push(d1);
                    i += 2;
                }
            }
            _ => {
                out.push_str("$$");
                i += 1;
            }
        }
    }
    out
}
