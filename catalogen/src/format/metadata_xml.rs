// SPDX-FileCopyrightText: Copyright © 2020-2024 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

//! AppData/metainfo XML parsing (spec glossary: "a structured metadata
//! document describing an application in detail"). Grounded on the
//! teacher's `quick-xml`-based config/XML readers; the shape mirrors
//! [`super::desktop_entry`]'s trait-plus-default-impl split.

use std::collections::BTreeMap;

use quick_xml::events::{BytesEnd, BytesStart, Event};
use quick_xml::Reader;
use thiserror::Error;

use crate::app::{Description, LocaleMap, OrderedSet, Release, Screenshot, UrlKind};

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("xml error at position {position}: {source}")]
    Xml {
        position: usize,
        #[source]
        source: quick_xml::Error,
    },
    #[error("missing required <id> element")]
    MissingId,
}

#[derive(Debug, Clone, Default)]
pub struct ParsedMetadataXml {
    pub id: String,
    pub component_type: Option<String>,
    pub names: LocaleMap<String>,
    pub summaries: LocaleMap<String>,
    pub descriptions: LocaleMap<Description>,
    pub categories: OrderedSet,
    pub keywords: LocaleMap<OrderedSet>,
    pub mimetypes: OrderedSet,
    pub urls: BTreeMap<UrlKind, String>,
    pub releases: Vec<Release>,
    pub screenshots: Vec<Screenshot>,
    pub project_license: Option<String>,
    pub metadata_license: Option<String>,
    pub project_group: Option<String>,
    pub update_contact: Option<String>,
    pub extends: Option<String>,
    pub compulsory_for_desktops: OrderedSet,
}

pub trait MetadataXmlParser: Send + Sync {
    fn parse(&self, contents: &[u8]) -> Result<ParsedMetadataXml, ParseError>;
}

#[derive(Debug, Default)]
pub struct DefaultMetadataXmlParser;

impl MetadataXmlParser for DefaultMetadataXmlParser {
    fn parse(&self, contents: &[u8]) -> Result<ParsedMetadataXml, ParseError> {
        let mut reader = Reader::from_reader(contents);
        reader.config_mut().trim_text(true);

        let mut parsed = ParsedMetadataXml::default();
        let mut buf = Vec::new();
        let mut path: Vec<String> = Vec::new();
        let mut current_locale = "C".to_string();
        let mut current_text = String::new();
        let mut pending_image: Option<String> = None;
        let mut pending_screenshot = Screenshot::default();
        let mut pending_url_kind: Option<UrlKind> = None;
        let mut description_capture: Option<Vec<u8>> = None;
        let mut description_depth: u32 = 0;
        let mut description_locale = "C".to_string();

        loop {
            let pos = reader.buffer_position() as usize;
            match reader.read_event_into(&mut buf).map_err(|source| ParseError::Xml { position: pos, source })? {
                Event::Start(tag) => {
                    let name = String::from_utf8_lossy(tag.name().as_ref()).into_owned();

                    if description_capture.is_some() {
                        description_depth += 1;
                        push_start_tag(description_capture.as_mut().unwrap(), &tag);
                        buf.clear();
                        continue;
                    }

                    current_locale = "C".to_string();
                    for attr in tag.attributes().flatten() {
                        if attr.key.as_ref() == b"xml:lang" {
                            current_locale = String::from_utf8_lossy(&attr.value).into_owned();
                        }
                        if name == "component" && attr.key.as_ref() == b"type" {
                            parsed.component_type = Some(String::from_utf8_lossy(&attr.value).into_owned());
                        }
                        if name == "url" && attr.key.as_ref() == b"type" {
                            pending_url_kind = match attr.value.as_ref() {
                                b"homepage" => Some(UrlKind::Homepage),
                                b"bugtracker" => Some(UrlKind::Bugtracker),
                                b"donation" => Some(UrlKind::Donation),
                                b"help" => Some(UrlKind::Help),
                                _ => None,
                            };
                        }
                    }
                    if name == "screenshot" {
                        pending_screenshot = Screenshot::default();
                        for attr in tag.attributes().flatten() {
                            if attr.key.as_ref() == b"type" {
                                pending_screenshot.default = attr.value.as_ref() == b"default";
                            }
                        }
                    }

                    if name == "description" {
                        description_locale = current_locale.clone();
                        description_capture = Some(Vec::new());
                        description_depth = 1;
                    } else {
                        current_text.clear();
                        path.push(name);
                    }
                }
                Event::Text(text) => {
                    if let Some(capture) = description_capture.as_mut() {
                        capture.extend_from_slice(text.as_ref());
                    } else {
                        current_text.push_str(&text.unescape().unwrap_or_default());
                    }
                }
                Event::End(tag) => {
                    if description_capture.is_some() {
                        description_depth -= 1;
                        if description_depth == 0 {
                            let raw = description_capture.take().unwrap();
                            let fragment = String::from_utf8_lossy(&raw).into_owned();
                            let (description, _problems) = Description::parse_fragment(&fragment);
                            parsed.descriptions.insert(description_locale.clone(), description);
                        } else {
                            push_end_tag(description_capture.as_mut().unwrap(), &tag);
                        }
                        buf.clear();
                        continue;
                    }

                    let name = path.pop().unwrap_or_default();
                    let text = current_text.trim().to_string();
                    current_text.clear();

                    match name.as_str() {
                        "id" if !text.is_empty() => parsed.id = text,
                        "name" => {
                            parsed.names.insert(current_locale.clone(), text);
                        }
                        "summary" => {
                            parsed.summaries.insert(current_locale.clone(), text);
                        }
                        "project_license" => parsed.project_license = Some(text),
                        "metadata_license" => parsed.metadata_license = Some(text),
                        "project_group" => parsed.project_group = Some(text),
                        "update_contact" => parsed.update_contact = Some(text),
                        "extends" => parsed.extends = Some(text),
                        "category" => {
                            parsed.categories.push(text);
                        }
                        "mimetype" => {
                            parsed.mimetypes.push(text);
                        }
                        "keyword" => {
                            let mut set = parsed.keywords.get(&current_locale).cloned().unwrap_or_default();
                            set.push(text);
                            parsed.keywords.insert(current_locale.clone(), set);
                        }
                        "url" => {
                            if let Some(kind) = pending_url_kind.take() {
                                parsed.urls.insert(kind, text);
                            }
                        }
                        "caption" => pending_screenshot.caption = Some(text),
                        "image" => pending_image = Some(text),
                        "screenshot" => {
                            if let Some(image) = pending_image.take() {
                                pending_screenshot.images.push(image);
                            }
                            parsed.screenshots.push(std::mem::take(&mut pending_screenshot));
                        }
                        "release" => {}
                        "compulsory_for_desktop" => {
                            parsed.compulsory_for_desktops.push(text);
                        }
                        _ => {}
                    }
                }
                Event::Empty(tag) => {
                    if let Some(capture) = description_capture.as_mut() {
                        push_empty_tag(capture, &tag);
                        buf.clear();
                        continue;
                    }
                    let name = String::from_utf8_lossy(tag.name().as_ref()).into_owned();
                    if name == "release" {
                        let mut version = String::new();
                        let mut timestamp = 0i64;
                        for attr in tag.attributes().flatten() {
                            match attr.key.as_ref() {
                                b"version" => version = String::from_utf8_lossy(&attr.value).into_owned(),
                                b"timestamp" => {
                                    timestamp = String::from_utf8_lossy(&attr.value).parse().unwrap_or(0)
                                }
                                _ => {}
                            }
                        }
                        parsed.releases.push(Release { version, timestamp, description: None });
                    }
                }
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        if parsed.id.is_empty() {
            return Err(ParseError::MissingId);
        }

        Ok(parsed)
    }
}

/// Reassemble a `<description>` element's inner markup byte-for-byte so it
/// can be handed to [`Description::parse_fragment`], which expects raw
/// (still-escaped) XML rather than decoded text.
fn push_start_tag(buf: &mut Vec<u8>, tag: &BytesStart) {
    buf.push(b'<');
    buf.extend_from_slice(tag.as_ref());
    buf.push(b'>');
}

fn push_end_tag(buf: &mut Vec<u8>, tag: &BytesEnd) {
    buf.extend_from_slice(b"</");
    buf.extend_from_slice(tag.name().as_ref());
    buf.push(b'>');
}

fn push_empty_tag(buf: &mut Vec<u8>, tag: &BytesStart) {
    buf.push(b'<');
    buf.extend_from_slice(tag.as_ref());
    buf.extend_from_slice(b"/>");
}
