// SPDX-FileCopyrightText: Copyright © 2020-2024 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

//! The restricted inline-markup subset AppData descriptions are allowed to
//! use, carried over from `as-app.c`'s description handling (spec §3,
//! SPEC_FULL §B.5): `<p>` paragraphs and `<ul>`/`<ol>` lists of `<li>` items.
//! Anything else collapses to plain text and records
//! [`Problems::UNSUPPORTED_DESCRIPTION_MARKUP`].

use quick_xml::escape::unescape;
use quick_xml::events::Event;
use quick_xml::Reader;

use super::problems::Problems;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Description(Vec<Block>);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Paragraph(String),
    List { ordered: bool, items: Vec<String> },
}

impl Description {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn blocks(&self) -> &[Block] {
        &self.0
    }

    pub fn push_paragraph(&mut self, text: impl Into<String>) {
        self.0.push(Block::Paragraph(text.into()));
    }

    pub fn push_list(&mut self, ordered: bool, items: Vec<String>) {
        self.0.push(Block::List { ordered, items });
    }

    /// Parse the inner XML of a `<description>` element. Unrecognized tags
    /// are dropped to their text content and flagged as a problem rather
    /// than rejected outright.
    pub fn parse_fragment(fragment: &str) -> (Self, Problems) {
        let wrapped = format!("<description>{fragment}</description>");
        let mut reader = Reader::from_str(&wrapped);
        reader.config_mut().trim_text(true);

        let mut description = Description::default();
        let mut problems = Problems::NONE;

        let mut depth = 0usize;
        let mut current_list: Option<(bool, Vec<String>)> = None;
        let mut current_item: Option<String> = None;
        let mut current_paragraph: Option<String> = None;

        let mut buf = Vec::new();
        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(tag)) => {
                    depth += 1;
                    match tag.name().as_ref() {
                        b"p" => current_paragraph = Some(String::new()),
                        b"ul" => current_list = Some((false, Vec::new())),
                        b"ol" => current_list = Some((true, Vec::new())),
                        b"li" => current_item = Some(String::new()),
                        b"description" => {}
                        _ => problems |= Problems::UNSUPPORTED_DESCRIPTION_MARKUP,
                    }
                }
                Ok(Event::End(tag)) => {
                    depth = depth.saturating_sub(1);
                    match tag.name().as_ref() {
                        b"p" => {
                            if let Some(text) = current_paragraph.take() {
                                description.push_paragraph(text.trim().to_string());
                            }
                        }
                        b"li" => {
                            if let (Some(item), Some((_, items))) = (current_item.take(), current_list.as_mut()) {
                                items.push(item.trim().to_string());
                            }
                        }
                        b"ul" | b"ol" => {
                            if let Some((ordered, items)) = current_list.take() {
                                description.push_list(ordered, items);
                            }
                        }
                        _ => {}
                    }
                }
                Ok(Event::Text(text)) => {
                    let decoded = text.unescape().unwrap_or_default().into_owned();
                    if let Some(item) = current_item.as_mut() {
                        item.push_str(&decoded);
                    } else if let Some(p) = current_paragraph.as_mut() {
                        p.push_str(&decoded);
                    }
                }
                Ok(Event::Eof) => break,
                Ok(_) => {}
                Err(_) => {
                    problems |= Problems::UNSUPPORTED_DESCRIPTION_MARKUP;
                    break;
                }
            }
            buf.clear();
        }
        let _ = depth;

        (description, problems)
    }

    /// Flatten to plain text, the shape required for API < 0.6 (spec §6).
    pub fn to_flat_text(&self) -> String {
        let mut out = String::new();
        for block in &self.0 {
            match block {
                Block::Paragraph(text) => {
                    if !out.is_empty() {
                        out.push('\n');
                    }
                    out.push_str(text);
                }
                Block::List { items, .. } => {
                    for item in items {
                        if !out.is_empty() {
                            out.push('\n');
                        }
                        out.push_str(item);
                    }
                }
            }
        }
        out
    }

    /// Render back to the pre-escaped inline markup used at API >= 0.6.
    pub fn to_markup(&self) -> String {
        let mut out = String::new();
        for block in &self.0 {
            match block {
                Block::Paragraph(text) => {
                    out.push_str("<p>");
                    out.push_str(&quick_xml::escape::escape(text));
                    out.push_str("</p>");
                }
                Block::List { ordered, items } => {
                    let tag = if *ordered { "ol" } else { "ul" };
                    out.push_str(&format!("<{tag}>"));
                    for item in items {
                        out.push_str("<li>");
                        out.push_str(&quick_xml::escape::escape(item));
                        out.push_str("</li>");
                    }
                    out.push_str(&format!("</{tag}>"));
                }
            }
        }
        out
    }
}

/// Unescape a raw XML text fragment, used by callers outside this module
/// that need a one-off decode (e.g. summary/name text nodes).
pub fn unescape_text(raw: &str) -> String {
    unescape(raw).map(|s| s.into_owned()).unwrap_or_else(|_| raw.to_string())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parses_paragraphs_and_lists() {
        let (desc, problems) =
            Description::parse_fragment("<p>Hello <b>world</b></p><ul><li>one</li><li>two</li></ul>");
        assert_eq!(problems, Problems::UNSUPPORTED_DESCRIPTION_MARKUP);
        assert_eq!(desc.blocks().len(), 2);
        assert!(matches!(&desc.blocks()[0], Block::Paragraph(p) if p.contains("Hello")));
        assert!(matches!(&desc.blocks()[1], Block::List{ordered: false, items} if items.len() == 2));
    }

    #[test]
    fn round_trips_markup_at_api_0_6() {
        let (desc, problems) = Description::parse_fragment("<p>Simple text</p>");
        assert_eq!(problems, Problems::NONE);
        assert_eq!(desc.to_markup(), "<p>Simple text</p>");
    }

    #[test]
    fn flattens_to_plain_text() {
        let (desc, _) = Description::parse_fragment("<p>First</p><p>Second</p>");
        assert_eq!(desc.to_flat_text(), "First\nSecond");
    }
}
