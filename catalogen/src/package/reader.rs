// SPDX-FileCopyrightText: Copyright © 2020-2024 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::app::Release;

#[derive(Debug, Error)]
pub enum ReaderError {
    #[error("could not open package {0:?}: {1}")]
    Open(PathBuf, String),
    #[error("could not explode package {0:?}: {1}")]
    Explode(PathBuf, String),
}

/// External collaborator: opens a package archive and enumerates its
/// contents (spec §2, component 1). Implementations live outside this
/// crate — the wire format of any specific archive type is a Non-goal
/// (spec §1).
pub trait PackageReader: Send + Sync {
    fn open(&self, path: &Path) -> Result<Box<dyn OpenedPackage>, ReaderError>;

    /// A cheap peek at a package's basename without fully opening it, used
    /// by [`crate::context::Context::add_filename`] to compute a cache
    /// fingerprint before deciding whether the package even needs opening.
    /// The default implementation just uses the file name.
    fn peek_basename(&self, path: &Path) -> String {
        path.file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.to_string_lossy().into_owned())
    }
}

/// A package opened by a [`PackageReader`] (spec §2, component 1).
pub trait OpenedPackage: Send {
    fn name(&self) -> &str;
    fn evr(&self) -> &str;
    fn arch(&self) -> &str;
    fn source_package_name(&self) -> Option<&str>;
    fn dependencies(&self) -> &[String];
    fn license(&self) -> Option<&str>;
    fn url(&self) -> Option<&str>;
    fn releases(&self) -> &[Release];
    fn file_list(&self) -> &[PathBuf];

    /// Extract every file whose path matches one of `patterns` (glob
    /// syntax) into `dest`, returning the destination paths in
    /// deterministic lexicographic order (spec §4.2 step 3, "Exploded").
    fn explode(&self, patterns: &[String], dest: &Path) -> Result<Vec<PathBuf>, ReaderError>;
}
