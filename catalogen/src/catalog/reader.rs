// SPDX-FileCopyrightText: Copyright © 2020-2024 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

use std::path::Path;

use flate2::read::GzDecoder;
use quick_xml::events::{BytesEnd, BytesStart, Event};
use quick_xml::Reader;

use super::CatalogError;
use crate::app::{ApplicationRecord, Description, IdKind, Icon, IconKind, Screenshot, SourceKind, UrlKind};

/// What [`DefaultCatalogReader::read`] recovers from a previously emitted
/// catalog: its `builder_id` attribute (used for whole-catalog cache
/// invalidation, SPEC_FULL §B.1) and the records it held.
pub struct ParsedCatalog {
    pub builder_id: Option<u32>,
    pub records: Vec<ApplicationRecord>,
}

/// The Catalog Reader external collaborator: the inverse of
/// [`super::CatalogWriter`], used to load an old catalog into the
/// fingerprint→applications cache lookup (spec §4.3 "Setup").
pub trait CatalogReader: Send + Sync {
    fn read(&self, path: &Path) -> Result<ParsedCatalog, CatalogError>;
}

#[derive(Debug, Default)]
pub struct DefaultCatalogReader;

impl CatalogReader for DefaultCatalogReader {
    fn read(&self, path: &Path) -> Result<ParsedCatalog, CatalogError> {
        let file = fs_err::File::open(path).map_err(|source| CatalogError::Io {
            path: path.display().to_string(),
            source: source.into(),
        })?;
        let mut decoder = GzDecoder::new(file);
        let mut xml = String::new();
        std::io::Read::read_to_string(&mut decoder, &mut xml).map_err(|source| CatalogError::Io {
            path: path.display().to_string(),
            source,
        })?;

        parse(&xml)
    }
}

fn parse(xml: &str) -> Result<ParsedCatalog, CatalogError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut builder_id = None;
    let mut records = Vec::new();
    let mut current: Option<ApplicationRecord> = None;
    let mut path: Vec<String> = Vec::new();
    let mut current_locale = "C".to_string();
    let mut text = String::new();
    let mut pending_url_kind: Option<UrlKind> = None;
    let mut pending_metadata_key: Option<String> = None;
    let mut pending_screenshot = Screenshot::default();
    let mut description_capture: Option<Vec<u8>> = None;
    let mut description_depth: u32 = 0;
    let mut description_locale = "C".to_string();

    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(tag) if description_capture.is_some() => {
                description_depth += 1;
                push_start_tag(description_capture.as_mut().unwrap(), &tag);
            }
            Event::Empty(tag) if description_capture.is_some() => {
                push_empty_tag(description_capture.as_mut().unwrap(), &tag);
            }
            Event::Start(tag) | Event::Empty(tag) => {
                let name = String::from_utf8_lossy(tag.name().as_ref()).into_owned();
                current_locale = "C".to_string();

                if name == "components" {
                    for attr in tag.attributes().flatten() {
                        if attr.key.as_ref() == b"builder_id" {
                            builder_id = String::from_utf8_lossy(&attr.value).parse().ok();
                        }
                    }
                }

                if name == "component" {
                    let mut id_kind = IdKind::Unknown;
                    let mut priority = 0i32;
                    for attr in tag.attributes().flatten() {
                        match attr.key.as_ref() {
                            b"type" => {
                                id_kind = match attr.value.as_ref() {
                                    b"desktop" => IdKind::Desktop,
                                    b"font" => IdKind::Font,
                                    b"codec" => IdKind::Codec,
                                    b"inputmethod" => IdKind::InputMethod,
                                    b"addon" => IdKind::Addon,
                                    b"webapp" => IdKind::WebApp,
                                    b"source" => IdKind::Source,
                                    _ => IdKind::Unknown,
                                };
                            }
                            b"priority" => priority = String::from_utf8_lossy(&attr.value).parse().unwrap_or(0),
                            _ => {}
                        }
                    }
                    let mut record = ApplicationRecord::new("", id_kind, SourceKind::Synthesised);
                    record.priority = priority;
                    current = Some(record);
                }

                for attr in tag.attributes().flatten() {
                    if attr.key.as_ref() == b"xml:lang" {
                        current_locale = String::from_utf8_lossy(&attr.value).into_owned();
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
                    if name == "value" && attr.key.as_ref() == b"key" {
                        pending_metadata_key = Some(String::from_utf8_lossy(&attr.value).into_owned());
                    }
                }

                if name == "icon" {
                    if let Some(record) = current.as_mut() {
                        let kind = match tag.try_get_attribute("type").ok().flatten() {
                            Some(attr) if attr.value.as_ref() == b"stock" => IconKind::Stock,
                            Some(attr) if attr.value.as_ref() == b"remote" => IconKind::Remote,
                            _ => IconKind::Cached,
                        };
                        let width = tag
                            .try_get_attribute("width")
                            .ok()
                            .flatten()
                            .and_then(|a| String::from_utf8_lossy(&a.value).parse().ok());
                        let height = tag
                            .try_get_attribute("height")
                            .ok()
                            .flatten()
                            .and_then(|a| String::from_utf8_lossy(&a.value).parse().ok());
                        record.icon = Some(Icon { name: String::new(), kind, path: None, width, height });
                    }
                }
                if name == "release" {
                    if let Some(record) = current.as_mut() {
                        let mut version = String::new();
                        let mut timestamp = 0i64;
                        for attr in tag.attributes().flatten() {
                            match attr.key.as_ref() {
                                b"version" => version = String::from_utf8_lossy(&attr.value).into_owned(),
                                b"timestamp" => timestamp = String::from_utf8_lossy(&attr.value).parse().unwrap_or(0),
                                _ => {}
                            }
                        }
                        record.releases.push(crate::app::Release { version, timestamp, description: None });
                    }
                }
                if name == "lang" {
                    if let Some(attr) = tag.try_get_attribute("percentage").ok().flatten() {
                        if let Some(record) = current.as_mut() {
                            let percentage: u8 = String::from_utf8_lossy(&attr.value).parse().unwrap_or(0);
                            // locale text arrives as this element's text node; recorded on End.
                            record.metadata.insert("__pending_lang_percentage".into(), percentage.to_string());
                        }
                    }
                }
                if name == "screenshot" {
                    pending_screenshot = Screenshot::default();
                    if let Some(attr) = tag.try_get_attribute("type").ok().flatten() {
                        pending_screenshot.default = attr.value.as_ref() == b"default";
                    }
                }

                if name == "description" {
                    description_locale = current_locale.clone();
                    description_capture = Some(Vec::new());
                    description_depth = 1;
                } else {
                    text.clear();
                    path.push(name);
                }
            }
            Event::Text(t) if description_capture.is_some() => {
                description_capture.as_mut().unwrap().extend_from_slice(t.as_ref());
            }
            Event::Text(t) => {
                text.push_str(&t.unescape().unwrap_or_default());
            }
            Event::End(tag) if description_capture.is_some() => {
                description_depth -= 1;
                if description_depth == 0 {
                    let raw = description_capture.take().unwrap();
                    let fragment = String::from_utf8_lossy(&raw).into_owned();
                    let (description, _) = Description::parse_fragment(&fragment);
                    if let Some(record) = current.as_mut() {
                        record.descriptions.insert(description_locale.clone(), description);
                    }
                } else {
                    push_end_tag(description_capture.as_mut().unwrap(), &tag);
                }
            }
            Event::End(_) => {
                let name = path.pop().unwrap_or_default();
                let value = text.trim().to_string();
                text.clear();

                if name == "component" {
                    if let Some(finished) = current.take() {
                        records.push(finished);
                    }
                    continue;
                }

                let Some(record) = current.as_mut() else {
                    continue;
                };

                match name.as_str() {
                    "id" => record.set_id_full(value),
                    "pkgname" => record.pkgnames.push(value),
                    "name" => record.names.insert(current_locale.clone(), value),
                    "summary" => record.comments.insert(current_locale.clone(), value),
                    "caption" => pending_screenshot.caption = Some(value),
                    "image" => pending_screenshot.images.push(value),
                    "screenshot" => record.push_screenshot(std::mem::take(&mut pending_screenshot)),
                    "icon" => {
                        if let Some(icon) = record.icon.as_mut() {
                            icon.name = value;
                        }
                    }
                    "category" | "appcategory" => record.categories.push(value),
                    "veto" => record.add_veto(value),
                    "licence" | "project_license" => record.project_license = Some(value),
                    "url" => {
                        if let Some(kind) = pending_url_kind.take() {
                            record.urls.insert(kind, value);
                        }
                    }
                    "extends" => record.extends = Some(value),
                    "lang" => {
                        let percentage = record
                            .metadata
                            .remove("__pending_lang_percentage")
                            .and_then(|s| s.parse().ok())
                            .unwrap_or(0);
                        record.set_language(value, percentage);
                    }
                    "value" => {
                        if let Some(key) = pending_metadata_key.take() {
                            record.metadata.insert(key, value);
                        }
                    }
                    "priority" => record.priority = value.parse().unwrap_or(0),
                    _ => {}
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(ParsedCatalog { builder_id, records })
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

#[cfg(test)]
mod test {
    use super::super::writer::{CatalogOptions, CatalogWriter, DefaultCatalogWriter};
    use super::super::ApiVersion;
    use super::*;
    use crate::app::SourceKind as SK;

    #[test]
    fn round_trips_basic_fields_through_write_and_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.xml.gz");

        let mut record = ApplicationRecord::new("app.desktop", IdKind::Desktop, SK::DesktopEntry);
        record.names.insert("C", "Example".to_string());
        record.pkgnames.push("app");
        record.project_license = Some("MIT".to_string());

        let options =
            CatalogOptions { api_version: ApiVersion::CURRENT, builder_id: 7, origin: "test".into(), add_cache_id: false };
        DefaultCatalogWriter.write(&path, &[record], &options).unwrap();

        let parsed = DefaultCatalogReader.read(&path).unwrap();
        assert_eq!(parsed.builder_id, Some(7));
        assert_eq!(parsed.records.len(), 1);
        assert_eq!(parsed.records[0].id_full, "app.desktop");
        assert_eq!(parsed.records[0].names.get("C"), Some(&"Example".to_string()));
        assert_eq!(parsed.records[0].project_license.as_deref(), Some("MIT"));
    }

    #[test]
    fn round_trips_screenshots_and_markup_description() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.xml.gz");

        let mut record = ApplicationRecord::new("app.desktop", IdKind::Desktop, SK::DesktopEntry);
        record.pkgnames.push("app");
        let (description, _) =
            Description::parse_fragment("<p>Does things.</p><ul><li>First</li><li>Second</li></ul>");
        record.descriptions.insert("C", description);
        record.push_screenshot(Screenshot {
            default: true,
            caption: Some("Main window".to_string()),
            images: vec!["https://example.org/shot.png".to_string()],
        });

        let options =
            CatalogOptions { api_version: ApiVersion::CURRENT, builder_id: 1, origin: "test".into(), add_cache_id: false };
        DefaultCatalogWriter.write(&path, &[record], &options).unwrap();

        let parsed = DefaultCatalogReader.read(&path).unwrap();
        assert_eq!(parsed.records.len(), 1);

        let description = parsed.records[0].descriptions.get("C").expect("description");
        assert_eq!(description.to_flat_text(), "Does things.\nFirst\nSecond");

        assert_eq!(parsed.records[0].screenshots.len(), 1);
        let screenshot = &parsed.records[0].screenshots[0];
        assert!(screenshot.default);
        assert_eq!(screenshot.caption.as_deref(), Some("Main window"));
        assert_eq!(screenshot.images, vec!["https://example.org/shot.png".to_string()]);
    }
}
