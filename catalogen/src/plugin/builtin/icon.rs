// SPDX-FileCopyrightText: Copyright © 2020-2024 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

//! The built-in icon-resolution plugin (spec §4.2 step 4, §9 "Plugin:
//! icon"). Relies on files being enriched in lexicographic order (spec
//! §4.2 step 4): `usr/share/applications/*.desktop` sorts before
//! `usr/share/icons/**` and `usr/share/pixmaps/**`, so by the time a
//! candidate icon file is seen, the application record with a matching
//! stock-icon placeholder already exists.

use std::path::Path;

use crate::app::{ApplicationRecord, Icon};
use crate::package::Package;
use crate::plugin::{Plugin, PluginError};

pub struct IconPlugin;

impl Plugin for IconPlugin {
    fn name(&self) -> &'static str {
        "icon"
    }

    fn globs(&self) -> &[&'static str] {
        &["usr/share/icons/hicolor/*/apps/*.png", "usr/share/pixmaps/*.png", "usr/share/pixmaps/*.xpm"]
    }

    fn process_file(
        &self,
        _pkg: &mut Package,
        root: &Path,
        path: &Path,
        apps: &mut Vec<ApplicationRecord>,
    ) -> Result<(), PluginError> {
        let stem = match path.file_stem() {
            Some(stem) => stem.to_string_lossy().into_owned(),
            None => return Ok(()),
        };

        let (width, height) = size_hint_from_path(path);

        for app in apps.iter_mut() {
            let matches = app.icon.as_ref().is_some_and(|icon| icon.name == stem);
            if !matches {
                continue;
            }
            let (width, height) = (width, height);
            app.icon = Some(Icon {
                name: stem.clone(),
                kind: crate::app::IconKind::Cached,
                path: Some(root.join(path)),
                width,
                height,
            });
        }

        Ok(())
    }
}

/// Parse the `WxH` component out of a hicolor path segment
/// (`usr/share/icons/hicolor/48x48/apps/app.png`); pixmaps have no size
/// directory and get `None`.
fn size_hint_from_path(path: &Path) -> (Option<u32>, Option<u32>) {
    for component in path.components() {
        let text = component.as_os_str().to_string_lossy();
        if let Some((w, h)) = text.split_once('x') {
            if let (Ok(w), Ok(h)) = (w.parse(), h.parse()) {
                return (Some(w), Some(h));
            }
        }
    }
    (None, None)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::app::{IdKind, SourceKind};

    #[test]
    fn resolves_stock_icon_to_cached_path_with_size() {
        let dir = tempfile::tempdir().unwrap();
        let relative = Path::new("usr/share/icons/hicolor/48x48/apps/example.png");

        let mut app = ApplicationRecord::new("app.desktop", IdKind::Desktop, SourceKind::DesktopEntry);
        app.icon = Some(Icon::stock("example"));
        let mut apps = vec![app];

        let mut pkg = Package::new("pkg.rpm".into(), "fp".into());
        IconPlugin.process_file(&mut pkg, dir.path(), relative, &mut apps).unwrap();

        let icon = apps[0].icon.as_ref().unwrap();
        assert_eq!(icon.kind, crate::app::IconKind::Cached);
        assert_eq!(icon.width, Some(48));
        assert_eq!(icon.height, Some(48));
    }

    #[test]
    fn ignores_icon_with_no_matching_stock_placeholder() {
        let dir = tempfile::tempdir().unwrap();
        let relative = Path::new("usr/share/pixmaps/unrelated.png");
        let mut apps = vec![ApplicationRecord::new("app.desktop", IdKind::Desktop, SourceKind::DesktopEntry)];
        let mut pkg = Package::new("pkg.rpm".into(), "fp".into());

        IconPlugin.process_file(&mut pkg, dir.path(), relative, &mut apps).unwrap();

        assert!(apps[0].icon.is_none());
    }
}
