// SPDX-FileCopyrightText: Copyright © 2020-2024 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

//! Desktop entry parsing (spec glossary: "a key-value file describing a
//! launcher"). The format is simple enough (one `[Group]` header, `Key=Value`
//! or localized `Key[locale]=Value` lines) that a hand-rolled scanner reads
//! more plainly than forcing it through a generic INI crate — localized
//! key suffixes aren't expressible in plain INI grammar.

use std::collections::BTreeMap;

use thiserror::Error;

use crate::app::{LocaleMap, OrderedSet};

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("not valid utf-8")]
    Encoding,
    #[error("missing [Desktop Entry] group")]
    MissingGroup,
}

#[derive(Debug, Clone, Default)]
pub struct ParsedDesktopEntry {
    pub names: LocaleMap<String>,
    pub comments: LocaleMap<String>,
    pub keywords: LocaleMap<OrderedSet>,
    pub icon: Option<String>,
    pub categories: OrderedSet,
    pub mimetypes: OrderedSet,
    pub only_show_in: OrderedSet,
    pub entry_type: Option<String>,
    pub no_display: bool,
    pub hidden: bool,
}

pub trait DesktopEntryParser: Send + Sync {
    fn parse(&self, contents: &[u8]) -> Result<ParsedDesktopEntry, ParseError>;
}

#[derive(Debug, Default)]
pub struct DefaultDesktopEntryParser;

impl DesktopEntryParser for DefaultDesktopEntryParser {
    fn parse(&self, contents: &[u8]) -> Result<ParsedDesktopEntry, ParseError> {
        let text = std::str::from_utf8(contents).map_err(|_| ParseError::Encoding)?;

        let mut in_main_group = false;
        let mut seen_main_group = false;
        let mut entry = ParsedDesktopEntry::default();
        // Raw locale -> list entries, merged into OrderedSet after the scan.
        let mut keyword_lists: BTreeMap<String, Vec<String>> = BTreeMap::new();

        for raw_line in text.lines() {
            let line = raw_line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if let Some(group) = line.strip_prefix('[').and_then(|s| s.strip_suffix(']')) {
                in_main_group = group == "Desktop Entry";
                if in_main_group {
                    seen_main_group = true;
                }
                continue;
            }
            if !in_main_group {
                continue;
            }

            let Some((key_part, value)) = line.split_once('=') else {
                continue;
            };
            let key_part = key_part.trim();
            let value = value.trim();

            let (key, locale) = match key_part.strip_suffix(']').and_then(|s| s.split_once('[')) {
                Some((key, locale)) => (key, Some(locale.to_string())),
                None => (key_part, None),
            };

            match key {
                "Name" => entry.names.insert(locale.unwrap_or_else(|| "C".to_string()), value.to_string()),
                "Comment" => entry.comments.insert(locale.unwrap_or_else(|| "C".to_string()), value.to_string()),
                "Icon" => entry.icon = Some(value.to_string()),
                "Type" => entry.entry_type = Some(value.to_string()),
                "NoDisplay" => entry.no_display = value.eq_ignore_ascii_case("true"),
                "Hidden" => entry.hidden = value.eq_ignore_ascii_case("true"),
                "Categories" => {
                    for category in value.split(';').map(str::trim).filter(|s| !s.is_empty()) {
                        entry.categories.push(category);
                    }
                }
                "MimeType" => {
                    for mimetype in value.split(';').map(str::trim).filter(|s| !s.is_empty()) {
                        entry.mimetypes.push(mimetype);
                    }
                }
                "OnlyShowIn" => {
                    for desktop in value.split(';').map(str::trim).filter(|s| !s.is_empty()) {
                        entry.only_show_in.push(desktop);
                    }
                }
                "Keywords" => {
                    let locale = locale.unwrap_or_else(|| "C".to_string());
                    let list = keyword_lists.entry(locale).or_default();
                    for keyword in value.split(';').map(str::trim).filter(|s| !s.is_empty()) {
                        list.push(keyword.to_string());
                    }
                }
                _ => {}
            }
        }

        if !seen_main_group {
            return Err(ParseError::MissingGroup);
        }

        for (locale, keywords) in keyword_lists {
            entry.keywords.insert(locale, keywords.into_iter().collect());
        }

        Ok(entry)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const SAMPLE: &str = "[Desktop Entry]\n\
Type=Application\n\
Name=Example\n\
Name[de]=Beispiel\n\
Comment=An example app\n\
Icon=example\n\
Categories=Utility;System;\n\
Keywords=foo;bar;\n\
Keywords[de]=baz;\n\
NoDisplay=false\n";

    #[test]
    fn parses_localized_names_and_lists() {
        let parsed = DefaultDesktopEntryParser.parse(SAMPLE.as_bytes()).unwrap();
        assert_eq!(parsed.names.get("C"), Some(&"Example".to_string()));
        assert_eq!(parsed.names.get("de"), Some(&"Beispiel".to_string()));
        assert_eq!(parsed.categories.iter().collect::<Vec<_>>(), vec!["Utility", "System"]);
        assert_eq!(parsed.keywords.get("C").unwrap().iter().collect::<Vec<_>>(), vec!["foo", "bar"]);
        assert!(!parsed.no_display);
    }

    #[test]
    fn rejects_file_without_main_group() {
        let err = DefaultDesktopEntryParser.parse(b"Name=Example\n").unwrap_err();
        assert!(matches!(err, ParseError::MissingGroup));
    }
}
