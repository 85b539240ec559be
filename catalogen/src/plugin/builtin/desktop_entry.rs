// SPDX-FileCopyrightText: Copyright © 2020-2024 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

//! The built-in desktop-entry plugin: turns a `.desktop` launcher file into
//! an [`ApplicationRecord`] (spec §4.2 step 4, §9 "Plugin: desktop").

use std::path::Path;

use crate::app::{ApplicationRecord, Icon, IdKind, SourceKind};
use crate::format::desktop_entry::{DefaultDesktopEntryParser, DesktopEntryParser};
use crate::package::Package;
use crate::plugin::{Plugin, PluginError};

pub struct DesktopEntryPlugin {
    parser: Box<dyn DesktopEntryParser>,
}

impl Default for DesktopEntryPlugin {
    fn default() -> Self {
        Self { parser: Box::new(DefaultDesktopEntryParser) }
    }
}

impl Plugin for DesktopEntryPlugin {
    fn name(&self) -> &'static str {
        "desktop-entry"
    }

    fn globs(&self) -> &[&'static str] {
        &["usr/share/applications/*.desktop", "usr/share/applications/**/*.desktop"]
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
                pkg.log(format!("desktop entry {} is not valid: {err}", path.display()));
                return Err(PluginError::veto(format!("invalid desktop entry: {err}")));
            }
        };

        if parsed.hidden || parsed.no_display {
            pkg.log(format!("skipping hidden/no-display desktop entry {}", path.display()));
            return Ok(());
        }
        if parsed.entry_type.as_deref().is_some_and(|t| t != "Application") {
            return Ok(());
        }

        let id_full = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.to_string_lossy().into_owned());

        let mut app = ApplicationRecord::new(id_full, IdKind::Desktop, SourceKind::DesktopEntry);
        app.names = parsed.names;
        app.comments = parsed.comments;
        app.keywords = parsed.keywords;
        app.categories = parsed.categories;
        app.mimetypes = parsed.mimetypes;
        app.compulsory_for_desktops.union_from(&parsed.only_show_in);
        if let Some(icon) = parsed.icon {
            app.icon = Some(Icon::stock(icon));
        }
        app.pkgnames.push(pkg.basename.clone());

        apps.push(app);
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn builds_application_record_from_desktop_entry() {
        let dir = tempfile::tempdir().unwrap();
        let relative = Path::new("usr/share/applications/example.desktop");
        let full = dir.path().join(relative);
        fs_err::create_dir_all(full.parent().unwrap()).unwrap();
        fs_err::write(&full, "[Desktop Entry]\nType=Application\nName=Example\nIcon=example\n").unwrap();

        let mut pkg = Package::new("example.rpm".into(), "fp".into());
        let mut apps = Vec::new();
        DesktopEntryPlugin::default()
            .process_file(&mut pkg, dir.path(), relative, &mut apps)
            .unwrap();

        assert_eq!(apps.len(), 1);
        assert_eq!(apps[0].names.get("C"), Some(&"Example".to_string()));
        assert_eq!(apps[0].icon.as_ref().unwrap().name, "example");
    }

    #[test]
    fn skips_no_display_entries() {
        let dir = tempfile::tempdir().unwrap();
        let relative = Path::new("usr/share/applications/example.desktop");
        let full = dir.path().join(relative);
        fs_err::create_dir_all(full.parent().unwrap()).unwrap();
        fs_err::write(&full, "[Desktop Entry]\nType=Application\nName=Example\nNoDisplay=true\n").unwrap();

        let mut pkg = Package::new("example.rpm".into(), "fp".into());
        let mut apps = Vec::new();
        DesktopEntryPlugin::default()
            .process_file(&mut pkg, dir.path(), relative, &mut apps)
            .unwrap();

        assert!(apps.is_empty());
    }
}
