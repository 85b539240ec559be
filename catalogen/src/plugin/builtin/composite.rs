// SPDX-FileCopyrightText: Copyright © 2020-2024 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

//! Wires the cross-package composite pass into the plugin pipeline (spec
//! §9 design notes: composite is registered as a plugin implementing only
//! `merge`, delegating to [`crate::merge::composite`]).

use crate::app::ApplicationRecord;
use crate::merge;
use crate::plugin::{Plugin, PluginError};

pub struct CompositePlugin;

impl Plugin for CompositePlugin {
    fn name(&self) -> &'static str {
        "composite"
    }

    fn merge(&self, apps: &mut Vec<ApplicationRecord>) -> Result<(), PluginError> {
        merge::composite(apps);
        Ok(())
    }
}
