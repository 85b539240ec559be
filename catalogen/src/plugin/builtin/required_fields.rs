// SPDX-FileCopyrightText: Copyright © 2020-2024 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

//! The built-in required-fields check (spec §4.2 step 5, §7 error kind (e):
//! "Missing required field"). A desktop entry with no matching AppData file
//! never gained a summary/description, and visual kinds with no icon are
//! both vetoed rather than silently emitted incomplete.

use std::path::Path;

use crate::app::{ApplicationRecord, IdKind, SourceKind};
use crate::plugin::{Plugin, PluginError};

pub struct RequiredFieldsPlugin;

impl Plugin for RequiredFieldsPlugin {
    fn name(&self) -> &'static str {
        "required-fields"
    }

    fn process_app(&self, app: &mut ApplicationRecord, _tmpdir: &Path) -> Result<(), PluginError> {
        if app.source_kind == SourceKind::DesktopEntry && app.descriptions.is_empty() {
            let category = app.categories.iter().next().unwrap_or("none").to_string();
            return Err(PluginError::veto(format!("Required AppData: {category}")));
        }

        let is_visual = matches!(app.id_kind, IdKind::Desktop | IdKind::Font | IdKind::WebApp);
        if is_visual && app.icon.is_none() {
            return Err(PluginError::veto(format!("Application {} has no icon", app.id_full)));
        }

        Ok(())
    }
}
