// SPDX-FileCopyrightText: Copyright © 2020-2024 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

//! The Package Reader external collaborator and the `Package` value type
//! (spec §3, §4.2). The actual archive format (RPM, deb, …) is outside this
//! crate's scope (spec §1 Non-goals); callers provide a [`PackageReader`]
//! implementation.

mod reader;

pub use reader::{OpenedPackage, PackageReader, ReaderError};

use std::path::PathBuf;

use crate::app::Release;

/// `{filename, basename, name, evr, nevr, arch, source_package_name, deps[],
/// files[], url, license, releases[], enabled, config_map, log_buffer,
/// cache_fingerprint}` (spec §3).
#[derive(Debug, Clone)]
pub struct Package {
    pub filename: PathBuf,
    pub basename: String,

    pub name: Option<String>,
    pub evr: Option<String>,
    pub nevr: Option<String>,
    pub arch: Option<String>,
    pub source_package_name: Option<String>,
    pub deps: Vec<String>,
    pub files: Vec<PathBuf>,
    pub url: Option<String>,
    pub license: Option<String>,
    pub releases: Vec<Release>,

    pub enabled: bool,
    pub config_map: std::collections::BTreeMap<String, String>,

    /// Append-only, intra-task ordered log; moved with the package into the
    /// failed store if the task fails (spec §9 design notes).
    pub log_buffer: Vec<String>,

    pub cache_fingerprint: String,
}

impl Package {
    pub fn new(filename: PathBuf, cache_fingerprint: String) -> Self {
        let basename = filename
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| filename.to_string_lossy().into_owned());
        Self {
            filename,
            basename,
            name: None,
            evr: None,
            nevr: None,
            arch: None,
            source_package_name: None,
            deps: Vec::new(),
            files: Vec::new(),
            url: None,
            license: None,
            releases: Vec::new(),
            enabled: true,
            config_map: std::collections::BTreeMap::new(),
            log_buffer: Vec::new(),
            cache_fingerprint,
        }
    }

    pub fn log(&mut self, message: impl Into<String>) {
        self.log_buffer.push(message.into());
    }

    /// Lazily materialise license, URL, file list, dependencies, source
    /// package, and releases from the underlying archive (the "Ensured"
    /// task state, spec §4.2 step 2).
    pub fn ensure(&mut self, opened: &dyn OpenedPackage) -> Result<(), ReaderError> {
        self.name = Some(opened.name().to_string());
        self.evr = Some(opened.evr().to_string());
        self.nevr = Some(format!("{}-{}", opened.name(), opened.evr()));
        self.arch = Some(opened.arch().to_string());
        self.source_package_name = opened.source_package_name().map(str::to_string);
        self.deps = opened.dependencies().to_vec();
        self.files = opened.file_list().to_vec();
        self.url = opened.url().map(str::to_string);
        self.license = opened.license().map(str::to_string);
        self.releases = opened.releases().to_vec();
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn basename_is_derived_from_filename() {
        let pkg = Package::new(PathBuf::from("/packages/test-0.1-1.fc21.noarch.rpm"), "fp".into());
        assert_eq!(pkg.basename, "test-0.1-1.fc21.noarch.rpm");
    }
}
