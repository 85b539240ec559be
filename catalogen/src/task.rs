// SPDX-FileCopyrightText: Copyright © 2020-2024 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

//! The Package Task state machine (spec §4.2): **Queued → Opened → Ensured
//! → Exploded → Enriched → AppsBuilt → Finished / Failed / Ignored**.
//! Grounded on `boulder::package::analysis`'s per-package pipeline driver,
//! generalised from a fixed analyser chain to the plugin loader.

use std::path::Path;

use crate::app::{ApplicationRecord, IdKind, SourceKind};
use crate::package::{OpenedPackage, Package, PackageReader};
use crate::plugin::Loader;

/// The terminal state a Package Task lands in (spec §4.2 step 6). A
/// completed package may straddle both the primary and failed stores in
/// the same batch: some of its applications passed validation, others
/// picked up a veto along the way.
pub enum TaskOutcome {
    Completed { primary: Vec<ApplicationRecord>, failed: Vec<ApplicationRecord> },
    Ignored(ApplicationRecord),
}

/// Run one package through the full pipeline to a terminal state.
/// `scratch_root` is this task's exclusive working directory; it is not
/// removed here — the caller owns cleanup on every exit path (spec §5
/// "Resource policy").
pub fn run(
    pkg: &mut Package,
    reader: &dyn PackageReader,
    loader: &Loader,
    scratch_root: &Path,
    ignore_missing_info: bool,
) -> TaskOutcome {
    let opened = match reader.open(&pkg.filename) {
        Ok(opened) => opened,
        Err(err) => return failed_with_synthetic_record(pkg, format!("could not open package: {err}")),
    };

    if let Err(err) = pkg.ensure(opened.as_ref()) {
        return failed_with_synthetic_record(pkg, format!("could not read package metadata: {err}"));
    }

    if !pkg.files.iter().any(|path| loader.any_match(&path.to_string_lossy())) {
        return TaskOutcome::Ignored(ignored_record(pkg));
    }

    let patterns: Vec<String> = loader.globs().map(|(pattern, _)| pattern.raw().to_string()).collect();
    if let Err(err) = fs_err::create_dir_all(scratch_root) {
        return failed_with_synthetic_record(pkg, format!("could not create scratch directory: {err}"));
    }
    let exploded = match opened.explode(&patterns, scratch_root) {
        Ok(paths) => paths,
        Err(err) => return failed_with_synthetic_record(pkg, format!("could not explode package: {err}")),
    };

    let mut relative: Vec<_> = exploded
        .iter()
        .map(|path| path.strip_prefix(scratch_root).unwrap_or(path).to_path_buf())
        .collect();
    relative.sort();

    let mut apps: Vec<ApplicationRecord> = Vec::new();
    for path in &relative {
        if let Err(err) = loader.run_process_file(pkg, scratch_root, path, &mut apps) {
            return failed_with_synthetic_record(pkg, format!("plugin failure processing {}: {err}", path.display()));
        }
    }

    if apps.is_empty() {
        if ignore_missing_info {
            return TaskOutcome::Ignored(ignored_record(pkg));
        }
        return failed_with_synthetic_record(pkg, "no application metadata found in package".to_string());
    }

    for app in &mut apps {
        if let Err(err) = loader.run_process_app(app, scratch_root) {
            return failed_with_synthetic_record(pkg, format!("plugin failure building application: {err}"));
        }
    }

    for app in &mut apps {
        app.pkgnames.push(pkg.basename.clone());
        app.metadata.insert("X-CacheID".to_string(), pkg.cache_fingerprint.clone());
    }

    let (primary, failed) = apps.into_iter().partition(|app: &ApplicationRecord| !app.has_vetoes());

    TaskOutcome::Completed { primary, failed }
}

fn ignored_record(pkg: &Package) -> ApplicationRecord {
    let id_full = format!(
        "{}.{}",
        pkg.name.clone().unwrap_or_else(|| pkg.basename.clone()),
        pkg.arch.clone().unwrap_or_default()
    );
    let mut record = ApplicationRecord::new(id_full, IdKind::Unknown, SourceKind::Synthesised);
    record.metadata.insert("X-CacheID".to_string(), pkg.cache_fingerprint.clone());
    record
}

fn failed_with_synthetic_record(pkg: &mut Package, reason: String) -> TaskOutcome {
    pkg.log(reason.clone());
    let mut record = ApplicationRecord::new(pkg.basename.clone(), IdKind::Unknown, SourceKind::Synthesised);
    record.metadata.insert("X-CacheID".to_string(), pkg.cache_fingerprint.clone());
    record.add_veto(reason);
    TaskOutcome::Completed { primary: Vec::new(), failed: vec![record] }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::package::ReaderError;
    use std::path::PathBuf;

    struct FailingReader;
    impl PackageReader for FailingReader {
        fn open(&self, path: &Path) -> Result<Box<dyn OpenedPackage>, ReaderError> {
            Err(ReaderError::Open(path.to_path_buf(), "corrupt archive".to_string()))
        }
    }

    #[test]
    fn open_failure_produces_synthetic_failed_record() {
        let dir = tempfile::tempdir().unwrap();
        let mut pkg = Package::new(PathBuf::from("broken.rpm"), "broken.rpm".to_string());
        let loader = Loader::new(Vec::new()).unwrap();

        let outcome = run(&mut pkg, &FailingReader, &loader, dir.path(), false);

        match outcome {
            TaskOutcome::Completed { primary, failed } => {
                assert!(primary.is_empty());
                assert_eq!(failed.len(), 1);
                assert!(failed[0].has_vetoes());
            }
            TaskOutcome::Ignored(_) => panic!("expected a failed outcome"),
        }
    }

    struct EmptyFileListReader;
    impl PackageReader for EmptyFileListReader {
        fn open(&self, _path: &Path) -> Result<Box<dyn OpenedPackage>, ReaderError> {
            Ok(Box::new(EmptyOpened))
        }
    }
    struct EmptyOpened;
    impl OpenedPackage for EmptyOpened {
        fn name(&self) -> &str {
            "test"
        }
        fn evr(&self) -> &str {
            "0.1-1"
        }
        fn arch(&self) -> &str {
            "noarch"
        }
        fn source_package_name(&self) -> Option<&str> {
            None
        }
        fn dependencies(&self) -> &[String] {
            &[]
        }
        fn license(&self) -> Option<&str> {
            None
        }
        fn url(&self) -> Option<&str> {
            None
        }
        fn releases(&self) -> &[crate::app::Release] {
            &[]
        }
        fn file_list(&self) -> &[PathBuf] {
            &[]
        }
        fn explode(&self, _patterns: &[String], _dest: &Path) -> Result<Vec<PathBuf>, ReaderError> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn package_with_no_matching_files_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let mut pkg = Package::new(PathBuf::from("test-0.1-1.fc21.noarch.rpm"), "test-0.1-1.fc21.noarch.rpm".to_string());
        let loader = Loader::new(crate::plugin::builtin::default_plugins()).unwrap();

        let outcome = run(&mut pkg, &EmptyFileListReader, &loader, dir.path(), false);

        match outcome {
            TaskOutcome::Ignored(record) => {
                assert_eq!(record.id_full, "test.noarch");
                assert_eq!(record.metadata.get("X-CacheID"), Some(&"test-0.1-1.fc21.noarch.rpm".to_string()));
            }
            TaskOutcome::Completed { .. } => panic!("expected ignored outcome"),
        }
    }
}
