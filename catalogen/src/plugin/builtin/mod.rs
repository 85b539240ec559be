// SPDX-FileCopyrightText: Copyright © 2020-2024 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

//! Built-in plugins shipped with this crate (spec §4.1, §4.4, §9 design
//! notes). Each wraps a [`crate::format`] parser or a [`crate::merge`]
//! algorithm behind the [`super::Plugin`] trait so the pipeline doesn't need
//! to special-case them.

mod composite;
mod desktop_entry;
mod icon;
mod metadata_xml;
mod required_fields;

use super::Plugin;

/// The default plugin set, in the registration order that decides
/// first-registered tie-breaks (spec §4.1) and `process_app`/`merge`
/// ordering (spec §4.1 `run_hook`).
pub fn default_plugins() -> Vec<Box<dyn Plugin>> {
    vec![
        Box::new(desktop_entry::DesktopEntryPlugin::default()),
        Box::new(metadata_xml::MetadataXmlPlugin::default()),
        Box::new(icon::IconPlugin),
        Box::new(required_fields::RequiredFieldsPlugin),
        Box::new(composite::CompositePlugin),
    ]
}
