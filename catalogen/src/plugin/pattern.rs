// SPDX-FileCopyrightText: Copyright © 2020-2024 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

//! Glob-pattern compilation for plugin file-routing (spec §4.1, §9 design
//! notes: "Globs-per-plugin + best-match dispatch is a structured routing
//! table"). Grounded on the teacher's `fnmatch` crate (regex-compiled
//! patterns), simplified to classic shell-glob syntax (`*`, `?`, `**`)
//! since plugin globs don't need named capture groups.

use derive_more::Display;
use regex::Regex;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("invalid glob pattern {raw:?}: {source}")]
pub struct PatternError {
    raw: String,
    #[source]
    source: regex::Error,
}

/// A compiled glob pattern plus the length of its literal (non-wildcard)
/// prefix, used to break ties when two plugins' globs both match a path
/// (spec §4.1: "longest literal prefix wins").
#[derive(Debug, Clone, Display)]
#[display("{raw}")]
pub struct Pattern {
    raw: String,
    regex: Regex,
    literal_prefix_len: usize,
}

impl Pattern {
    pub fn compile(raw: &str) -> Result<Self, PatternError> {
        let literal_prefix_len = raw
            .chars()
            .take_while(|c| !matches!(c, '*' | '?' | '[' | '{'))
            .count();

        let regex_str = glob_to_regex(raw);
        let regex = Regex::new(&regex_str).map_err(|source| PatternError {
            raw: raw.to_string(),
            source,
        })?;

        Ok(Self {
            raw: raw.to_string(),
            regex,
            literal_prefix_len,
        })
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn literal_prefix_len(&self) -> usize {
        self.literal_prefix_len
    }

    pub fn is_match(&self, path: &str) -> bool {
        self.regex.is_match(path)
    }
}

/// Translate shell-glob syntax into an anchored regex. `**` matches across
/// path separators, a lone `*` does not, `?` matches exactly one character,
/// and everything else is treated literally.
fn glob_to_regex(pattern: &str) -> String {
    let mut out = String::from("^");
    let chars: Vec<char> = pattern.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        match chars[i] {
            '*' if chars.get(i + 1) == Some(&'*') => {
                out.push_str(".*");
                i += 2;
            }
            '*' => {
                out.push_str("[^/]*");
                i += 1;
            }
            '?' => {
                out.push_str("[^/]");
                i += 1;
            }
            c => {
                out.push_str(&regex::escape(&c.to_string()));
                i += 1;
            }
        }
    }
    out.push('$');
    out
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn star_does_not_cross_path_separator() {
        let pattern = Pattern::compile("usr/share/applications/*.desktop").unwrap();
        assert!(pattern.is_match("usr/share/applications/app.desktop"));
        assert!(!pattern.is_match("usr/share/applications/sub/app.desktop"));
    }

    #[test]
    fn double_star_crosses_path_separators() {
        let pattern = Pattern::compile("usr/share/icons/**").unwrap();
        assert!(pattern.is_match("usr/share/icons/hicolor/48x48/apps/app.png"));
    }

    #[test]
    fn literal_prefix_stops_at_first_wildcard() {
        let pattern = Pattern::compile("usr/share/appdata/*.xml").unwrap();
        assert_eq!(pattern.literal_prefix_len(), "usr/share/appdata/".len());
    }
}
