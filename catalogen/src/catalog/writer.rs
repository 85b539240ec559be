// SPDX-FileCopyrightText: Copyright © 2020-2024 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

use std::io::Write;
use std::path::Path;

use flate2::write::GzEncoder;
use flate2::Compression;
use quick_xml::escape::escape;

use super::{ApiVersion, CatalogError};
use crate::app::ApplicationRecord;

/// Everything the writer needs besides the records themselves (spec §6).
pub struct CatalogOptions {
    pub api_version: ApiVersion,
    pub builder_id: u32,
    pub origin: String,
    pub add_cache_id: bool,
}

/// The Catalog Writer external collaborator (spec §2): serialises a set of
/// application records into a compressed XML document.
pub trait CatalogWriter: Send + Sync {
    fn write(&self, path: &Path, records: &[ApplicationRecord], options: &CatalogOptions) -> Result<(), CatalogError>;
}

#[derive(Debug, Default)]
pub struct DefaultCatalogWriter;

impl CatalogWriter for DefaultCatalogWriter {
    fn write(&self, path: &Path, records: &[ApplicationRecord], options: &CatalogOptions) -> Result<(), CatalogError> {
        let xml = render(records, options);

        let file = fs_err::File::create(path).map_err(|source| CatalogError::Io {
            path: path.display().to_string(),
            source: source.into(),
        })?;
        let mut encoder = GzEncoder::new(file, Compression::default());
        encoder.write_all(xml.as_bytes()).map_err(|source| CatalogError::Io {
            path: path.display().to_string(),
            source,
        })?;
        encoder.finish().map_err(|source| CatalogError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Ok(())
    }
}

/// Build the uncompressed XML document (spec §6 catalog XML shape), honouring
/// API-version-dependent tag renaming:
/// - `priority` is a child element below API 0.61, an attribute at/above it;
/// - `project_license` is named `licence` below API 0.4;
/// - `categories`/`category` are named `appcategories`/`appcategory` below API 0.5;
/// - `description` is flat text below API 0.6, pre-escaped inline markup at/above it.
fn render(records: &[ApplicationRecord], options: &CatalogOptions) -> String {
    let mut out = String::new();
    out.push_str(r#"<?xml version="1.0" encoding="UTF-8"?>"#);
    out.push('\n');
    out.push_str(&format!(
        r#"<components version="{}" builder_id="{}" origin="{}">"#,
        options.api_version, options.builder_id, escape(&options.origin)
    ));
    out.push('\n');

    for record in records {
        render_component(&mut out, record, options);
    }

    out.push_str("</components>\n");
    out
}

fn render_component(out: &mut String, record: &ApplicationRecord, options: &CatalogOptions) {
    let api = options.api_version;

    out.push_str("  <component");
    if let Some(kind) = record.id_kind.as_xml_str() {
        out.push_str(&format!(r#" type="{kind}""#));
    }
    if api >= ApiVersion::new(0, 61) {
        out.push_str(&format!(r#" priority="{}""#, record.priority));
    }
    out.push_str(">\n");

    out.push_str(&format!("    <id>{}</id>\n", escape(&record.id_full)));

    for pkgname in record.pkgnames.iter() {
        out.push_str(&format!("    <pkgname>{}</pkgname>\n", escape(pkgname)));
    }

    for (locale, name) in record.names.iter() {
        push_localized(out, "name", locale, name);
    }
    for (locale, summary) in record.comments.iter() {
        push_localized(out, "summary", locale, summary);
    }

    if let Some(description) = record.descriptions.fallback() {
        if !description.is_empty() {
            if api < ApiVersion::new(0, 6) {
                out.push_str(&format!("    <description>{}</description>\n", escape(&description.to_flat_text())));
            } else {
                out.push_str(&format!("    <description>{}</description>\n", description.to_markup()));
            }
        }
    }

    if let Some(icon) = &record.icon {
        out.push_str("    <icon");
        out.push_str(&format!(r#" type="{}""#, icon.kind.as_xml_str()));
        if let Some(w) = icon.width {
            out.push_str(&format!(r#" width="{w}""#));
        }
        if let Some(h) = icon.height {
            out.push_str(&format!(r#" height="{h}""#));
        }
        out.push_str(&format!(">{}</icon>\n", escape(&icon.name)));
    }

    let categories_tag = if api < ApiVersion::new(0, 5) { "appcategories" } else { "categories" };
    let category_tag = if api < ApiVersion::new(0, 5) { "appcategory" } else { "category" };
    if !record.categories.is_empty() {
        out.push_str(&format!("    <{categories_tag}>\n"));
        for category in record.categories.iter() {
            out.push_str(&format!("      <{category_tag}>{}</{category_tag}>\n", escape(category)));
        }
        out.push_str(&format!("    </{categories_tag}>\n"));
    }

    if let Some(vetoes) = record.has_vetoes().then_some(&record.vetoes) {
        out.push_str("    <vetos>\n");
        for veto in vetoes {
            out.push_str(&format!("      <veto>{}</veto>\n", escape(veto)));
        }
        out.push_str("    </vetos>\n");
    }

    let license_tag = if api < ApiVersion::new(0, 4) { "licence" } else { "project_license" };
    if let Some(license) = &record.project_license {
        out.push_str(&format!("    <{license_tag}>{}</{license_tag}>\n", escape(license)));
    }

    for (kind, url) in &record.urls {
        out.push_str(&format!(r#"    <url type="{kind}">{}</url>"#, escape(url)));
        out.push('\n');
    }

    if let Some(extends) = &record.extends {
        out.push_str(&format!("    <extends>{}</extends>\n", escape(extends)));
    }

    if !record.releases.is_empty() {
        out.push_str("    <releases>\n");
        for release in record.releases_for_serialisation() {
            out.push_str(&format!(
                r#"      <release version="{}" timestamp="{}"/>"#,
                escape(&release.version),
                release.timestamp
            ));
            out.push('\n');
        }
        out.push_str("    </releases>\n");
    }

    if !record.screenshots.is_empty() {
        out.push_str("    <screenshots>\n");
        for screenshot in &record.screenshots {
            if screenshot.default {
                out.push_str(r#"      <screenshot type="default">"#);
            } else {
                out.push_str("      <screenshot>");
            }
            out.push('\n');
            if let Some(caption) = &screenshot.caption {
                out.push_str(&format!("        <caption>{}</caption>\n", escape(caption)));
            }
            for image in &screenshot.images {
                out.push_str(&format!("        <image>{}</image>\n", escape(image)));
            }
            out.push_str("      </screenshot>\n");
        }
        out.push_str("    </screenshots>\n");
    }

    if !record.languages.is_empty() {
        out.push_str("    <languages>\n");
        for (locale, percentage) in &record.languages {
            out.push_str(&format!(r#"      <lang percentage="{percentage}">{locale}</lang>"#));
            out.push('\n');
        }
        out.push_str("    </languages>\n");
    }

    if options.add_cache_id || !record.metadata.is_empty() {
        out.push_str("    <metadata>\n");
        if options.add_cache_id {
            if let Some(fingerprint) = record.metadata.get("X-CacheID") {
                out.push_str(&format!(r#"      <value key="X-CacheID">{}</value>"#, escape(fingerprint)));
                out.push('\n');
            }
        }
        for (key, value) in &record.metadata {
            if key == "X-CacheID" {
                continue;
            }
            out.push_str(&format!(r#"      <value key="{key}">{}</value>"#, escape(value)));
            out.push('\n');
        }
        out.push_str("    </metadata>\n");
    }

    if api < ApiVersion::new(0, 61) {
        out.push_str(&format!("    <priority>{}</priority>\n", record.priority));
    }

    out.push_str("  </component>\n");
}

fn push_localized(out: &mut String, tag: &str, locale: &str, text: &str) {
    if locale == crate::app::FALLBACK_LOCALE {
        out.push_str(&format!("    <{tag}>{}</{tag}>\n", escape(text)));
    } else {
        out.push_str(&format!(r#"    <{tag} xml:lang="{locale}">{}</{tag}>"#, escape(text)));
        out.push('\n');
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::app::{IdKind, SourceKind};
    use flate2::read::GzDecoder;
    use std::io::Read;

    #[test]
    fn writes_gzip_compressed_xml_with_basic_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.xml.gz");

        let mut record = ApplicationRecord::new("app.desktop", IdKind::Desktop, SourceKind::DesktopEntry);
        record.names.insert("C", "Example".to_string());
        record.pkgnames.push("app");

        let options = CatalogOptions {
            api_version: ApiVersion::CURRENT,
            builder_id: 1,
            origin: "test".to_string(),
            add_cache_id: false,
        };
        DefaultCatalogWriter.write(&path, &[record], &options).unwrap();

        let mut decoder = GzDecoder::new(fs_err::File::open(&path).unwrap());
        let mut xml = String::new();
        decoder.read_to_string(&mut xml).unwrap();

        assert!(xml.contains(r#"builder_id="1""#));
        assert!(xml.contains("<id>app.desktop</id>"));
        assert!(xml.contains("<name>Example</name>"));
    }

    #[test]
    fn renames_project_license_to_licence_below_api_0_4() {
        let mut record = ApplicationRecord::new("app.desktop", IdKind::Desktop, SourceKind::DesktopEntry);
        record.project_license = Some("MIT".to_string());
        let options =
            CatalogOptions { api_version: ApiVersion::new(0, 3), builder_id: 1, origin: "t".into(), add_cache_id: false };
        let xml = render(&[record], &options);
        assert!(xml.contains("<licence>MIT</licence>"));
    }

    #[test]
    fn renders_screenshots() {
        let mut record = ApplicationRecord::new("app.desktop", IdKind::Desktop, SourceKind::DesktopEntry);
        record.push_screenshot(crate::app::Screenshot {
            default: true,
            caption: Some("Main window".to_string()),
            images: vec!["https://example.org/shot.png".to_string()],
        });
        let options =
            CatalogOptions { api_version: ApiVersion::CURRENT, builder_id: 1, origin: "t".into(), add_cache_id: false };
        let xml = render(&[record], &options);
        assert!(xml.contains(r#"<screenshot type="default">"#));
        assert!(xml.contains("<caption>Main window</caption>"));
        assert!(xml.contains("<image>https://example.org/shot.png</image>"));
    }

    #[test]
    fn priority_is_attribute_at_or_above_api_0_61() {
        let record = ApplicationRecord::new("app.desktop", IdKind::Desktop, SourceKind::DesktopEntry);
        let options =
            CatalogOptions { api_version: ApiVersion::new(0, 61), builder_id: 1, origin: "t".into(), add_cache_id: false };
        let xml = render(&[record], &options);
        assert!(xml.contains(r#"priority="0""#));
        assert!(!xml.contains("<priority>"));
    }
}
