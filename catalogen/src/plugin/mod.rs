// SPDX-FileCopyrightText: Copyright © 2020-2024 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

//! The Plugin contract and Plugin Loader (spec §4.1): a unit of processing
//! with a declared set of path globs it matches, and zero or more pipeline
//! hooks it implements. Grounded on `moss::registry`'s plugin-set-with-
//! dispatch and `boulder::package::analysis`'s handler chain (spec §9
//! design notes: "Object-with-virtual-hooks plugin system becomes a
//! capability-set interface implemented by plain data-holding values
//! registered in a vector").

pub mod builtin;
mod loader;
mod pattern;

pub use loader::Loader;
pub use pattern::{Pattern, PatternError};

use std::path::Path;

use thiserror::Error;

use crate::app::ApplicationRecord;
use crate::package::Package;

/// The outcome of a plugin hook (spec §4.1 "Failure policy"). A veto
/// attaches a human-readable reason to the offending application and lets
/// the task continue; a fatal error aborts the whole package task.
#[derive(Debug, Error)]
pub enum PluginError {
    #[error("{0}")]
    Veto(String),
    #[error("{0}")]
    Fatal(String),
}

impl PluginError {
    pub fn veto(reason: impl Into<String>) -> Self {
        Self::Veto(reason.into())
    }

    pub fn fatal(reason: impl Into<String>) -> Self {
        Self::Fatal(reason.into())
    }
}

/// A unit of processing: matches a set of file globs, implements some
/// subset of the enrich-app/process-file/merge hook set (spec §4.1 "Hook
/// set"). Every hook defaults to a no-op success so a plugin only needs to
/// override the ones it actually implements.
pub trait Plugin: Send + Sync {
    fn name(&self) -> &'static str;

    /// Path globs this plugin wants routed to it (spec §4.1 `globs()`).
    /// Plugins with no file-pattern interest (e.g. a merge-only plugin)
    /// return an empty slice.
    fn globs(&self) -> &[&'static str] {
        &[]
    }

    /// Enrich `apps` (the task-local application list built so far) from
    /// one extracted file (spec §4.2 step 4, "Enriched"). `path` is the
    /// file's path relative to the package root (what globs are matched
    /// against); `root` is the scratch directory it was exploded into, so
    /// a plugin that needs the bytes can read `root.join(path)`.
    fn process_file(
        &self,
        _pkg: &mut Package,
        _root: &Path,
        _path: &Path,
        _apps: &mut Vec<ApplicationRecord>,
    ) -> Result<(), PluginError> {
        Ok(())
    }

    /// Post-enrichment per-application tweak, e.g. icon rendering or
    /// required-field validation (spec §4.2 step 5, "AppsBuilt").
    fn process_app(&self, _app: &mut ApplicationRecord, _tmpdir: &Path) -> Result<(), PluginError> {
        Ok(())
    }

    /// Cross-package pass over an entire result store (spec §4.4).
    fn merge(&self, _apps: &mut Vec<ApplicationRecord>) -> Result<(), PluginError> {
        Ok(())
    }
}
