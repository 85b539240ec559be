// SPDX-FileCopyrightText: Copyright © 2020-2024 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

//! The built-in AppData/metainfo plugin (spec §4.2 step 4, §9 "Plugin:
//! appdata"). Creates a new [`ApplicationRecord`] or, when a desktop-entry
//! plugin already produced one with a matching `id`, merges into it with
//! [`SubsumeMode::Overwrite`] — metadata-xml is the richer, authoritative
//! source (spec §4.4).

use std::path::Path;

use crate::app::{ApplicationRecord, IdKind, SourceKind, SubsumeMode};
use crate::format::metadata_xml::{DefaultMetadataXmlParser, MetadataXmlParser};
use crate::package::Package;
use crate::plugin::{Plugin, PluginError};

pub struct MetadataXmlPlugin {
    parser: Box<dyn MetadataXmlParser>,
}

impl Default for MetadataXmlPlugin {
    fn default() -> Self {
        Self { parser: Box::new(DefaultMetadataXmlParser) }
    }
}

impl Plugin for MetadataXmlPlugin {
    fn name(&self) -> &'static str {
        "metadata-xml"
    }

    fn globs(&self) -> &[&'static str] {
        &["usr/share/appdata/*.xml", "usr/share/metainfo/*.xml"]
    }

    fn process_file(
        &self,
        pkg: &mut Package,
        root: &Path,
        path: &Path,
        apps: &mut Vec<ApplicationRecord>,
    ) -> Result<(), PluginError> {
        let contents = fs_err::read(root.join(path))
            .map_err(|err| PluginError::fatal(format!("reading {}: {err}", path.display())))?;

        let parsed = match self.parser.parse(&contents) {
            Ok(parsed) => parsed,
            Err(err) => {
                pkg.log(format!("metadata xml {} is not valid: {err}", path.display()));
                return Err(PluginError::veto(format!("invalid metadata xml: {err}")));
            }
        };

        let id_kind = match parsed.component_type.as_deref() {
            Some("font") => IdKind::Font,
            Some("codec") => IdKind::Codec,
            Some("inputmethod") => IdKind::InputMethod,
            Some("addon") => IdKind::Addon,
            Some("webapp") => IdKind::WebApp,
            _ => IdKind::Desktop,
        };

        let mut donor = ApplicationRecord::new(parsed.id.clone(), id_kind, SourceKind::MetadataXml);
        donor.names = parsed.names;
        donor.comments = parsed.summaries;
        donor.descriptions = parsed.descriptions;
        donor.categories = parsed.categories;
        donor.keywords = parsed.keywords;
        donor.mimetypes = parsed.mimetypes;
        donor.urls = parsed.urls;
        donor.releases = parsed.releases;
        donor.screenshots = parsed.screenshots;
        donor.project_license = parsed.project_license;
        donor.metadata_license = parsed.metadata_license;
        donor.project_group = parsed.project_group;
        donor.update_contact = parsed.update_contact;
        donor.extends = parsed.extends;
        donor.compulsory_for_desktops = parsed.compulsory_for_desktops;
        donor.pkgnames.push(pkg.basename.clone());

        if let Some(existing) = apps.iter_mut().find(|app| app.id_full == donor.id_full) {
            existing.subsume(&donor, SubsumeMode::Overwrite);
            existing.id_kind = id_kind;
            existing.source_kind = SourceKind::MetadataXml;
            if existing.extends.is_none() {
                existing.extends = donor.extends;
            }
        } else {
            apps.push(donor);
        }

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const SAMPLE: &str = r#"<?xml version="1.0"?>
<component>
  <id>org.example.App.desktop</id>
  <name>Example</name>
  <summary>An example application</summary>
</component>
"#;

    #[test]
    fn merges_into_existing_record_with_matching_id() {
        let dir = tempfile::tempdir().unwrap();
        let relative = Path::new("usr/share/metainfo/org.example.App.appdata.xml");
        let full = dir.path().join(relative);
        fs_err::create_dir_all(full.parent().unwrap()).unwrap();
        fs_err::write(&full, SAMPLE).unwrap();

        let mut pkg = Package::new("example.rpm".into(), "fp".into());
        let mut apps =
            vec![ApplicationRecord::new("org.example.App.desktop", IdKind::Desktop, SourceKind::DesktopEntry)];

        MetadataXmlPlugin::default()
            .process_file(&mut pkg, dir.path(), relative, &mut apps)
            .unwrap();

        assert_eq!(apps.len(), 1);
        assert_eq!(apps[0].comments.get("C"), Some(&"An example application".to_string()));
        assert_eq!(apps[0].source_kind, SourceKind::MetadataXml);
    }
}
