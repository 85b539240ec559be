// SPDX-FileCopyrightText: Copyright © 2020-2024 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

//! The Context/Scheduler (spec §4.3): setup, enqueue, and the bounded
//! worker pool that drives every queued Package Task to completion.
//! Grounded on `moss::installation`'s setup-then-run shape and
//! `boulder::build::Builder`'s rayon-backed parallel step execution.

use std::path::PathBuf;
use std::sync::Mutex;

use rayon::prelude::*;
use thiserror::Error;

use crate::cache::{self, CachedStoreKind, OldCatalogLookup, BUILDER_ID};
use crate::catalog::{CatalogError, CatalogOptions, CatalogWriter, DefaultCatalogWriter};
use crate::config::Configuration;
use crate::package::{Package, PackageReader};
use crate::plugin::{builtin, Loader};
use crate::store::{Store, StoreKind};
use crate::task::{self, TaskOutcome};

#[derive(Debug, Error)]
pub enum Error {
    #[error("creating directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("loading plugins: {0}")]
    Plugin(#[from] crate::plugin::loader::Error),
    #[error("{0}")]
    Catalog(#[from] CatalogError),
    #[error("a merge-phase plugin failed: {0}")]
    Merge(String),
    #[error("writing icon bundle {path}: {source}")]
    IconBundle {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Owns the shared state a run needs: configuration, the package reader,
/// the loaded plugin set, the old-catalog cache lookup, the three result
/// stores, and the queue of packages still waiting to be processed (spec
/// §4.3).
pub struct Context {
    config: Configuration,
    reader: Box<dyn PackageReader>,
    loader: Loader,
    store: Store,
    old_catalog: OldCatalogLookup,
    queue: Mutex<Vec<Package>>,
}

impl Context {
    /// Validate/create the cache, temp, and output directories, load the
    /// built-in plugin set, and load a previous run's catalogs for cache
    /// reuse (spec §4.3 "Setup").
    pub fn setup(config: Configuration, reader: Box<dyn PackageReader>) -> Result<Self, Error> {
        for dir in [&config.cache_dir, &config.temp_dir, &config.output_dir] {
            fs_err::create_dir_all(dir).map_err(|source| Error::CreateDir { path: dir.clone(), source: source.into() })?;
        }

        let loader = Loader::new(builtin::default_plugins())?;
        let old_catalog = OldCatalogLookup::load(&config.output_dir, &config.basename)?;
        if old_catalog.is_empty() {
            log::info!("no reusable old catalog found under {}", config.output_dir.display());
        }

        Ok(Self { config, reader, loader, store: Store::new(), old_catalog, queue: Mutex::new(Vec::new()) })
    }

    /// Enqueue one package path (spec §4.3 "Enqueue"): a package whose
    /// fingerprint is already present in the old catalog is resolved
    /// straight from the cache without ever being opened; otherwise it is
    /// queued for a Package Task.
    pub fn add_filename(&self, path: PathBuf) {
        let basename = self.reader.peek_basename(&path);
        let fingerprint = cache::fingerprint(&basename);

        if let Some(cached) = self.old_catalog.get(&fingerprint) {
            log::debug!("reusing {fingerprint} from old catalog");
            for (kind, record) in cached {
                let store_kind = match kind {
                    CachedStoreKind::Primary => StoreKind::Primary,
                    CachedStoreKind::Failed => StoreKind::Failed,
                    CachedStoreKind::Ignore => StoreKind::Ignore,
                };
                self.store.append(store_kind, vec![record.clone()]);
            }
            return;
        }

        self.queue.lock().expect("queue lock poisoned").push(Package::new(path, fingerprint));
    }

    /// Drive every queued package through its Package Task on a bounded
    /// worker pool (spec §4.3 "process"), run the cross-package merge
    /// phase, then serialise the three catalogs and the icon bundle.
    pub fn process(&self) -> Result<(), Error> {
        let started = chrono::Utc::now();
        let packages = std::mem::take(&mut *self.queue.lock().expect("queue lock poisoned"));
        let package_count = packages.len();

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.max_threads.max(1))
            .build()
            .expect("building the package worker pool");

        pool.install(|| {
            packages.into_par_iter().for_each(|mut pkg| {
                let scratch = self.config.temp_dir.join(&pkg.basename);
                let outcome =
                    task::run(&mut pkg, self.reader.as_ref(), &self.loader, &scratch, self.config.ignore_missing_info);
                let _ = fs_err::remove_dir_all(&scratch);

                for line in &pkg.log_buffer {
                    log::info!("{}: {line}", pkg.basename);
                }

                match outcome {
                    TaskOutcome::Ignored(record) => self.store.append(StoreKind::Ignore, vec![record]),
                    TaskOutcome::Completed { primary, failed } => {
                        self.store.append(StoreKind::Primary, primary);
                        self.store.append(StoreKind::Failed, failed);
                    }
                }
            });
        });

        self.store.run_merge_phase(&self.loader, self.config.ignore_missing_parents).map_err(Error::Merge)?;

        self.write_catalogs()?;
        self.write_icon_bundle()?;

        let elapsed = chrono::Utc::now().signed_duration_since(started);
        log::info!("processed {package_count} packages in {}ms", elapsed.num_milliseconds());
        Ok(())
    }

    fn write_catalogs(&self) -> Result<(), Error> {
        let options = CatalogOptions {
            api_version: self.config.api_version,
            builder_id: BUILDER_ID,
            origin: self.config.basename.clone(),
            add_cache_id: self.config.add_cache_id,
        };

        let writer = DefaultCatalogWriter;
        for (kind, suffix) in
            [(StoreKind::Primary, ""), (StoreKind::Failed, "-failed"), (StoreKind::Ignore, "-ignore")]
        {
            let records = self.store.snapshot_sorted(kind);
            let path = self.config.output_dir.join(format!("{}{suffix}.xml.gz", self.config.basename));
            writer.write(&path, &records, &options)?;
        }
        Ok(())
    }

    /// Bundle every resolved cached icon into `<basename>-icons.tar.gz`,
    /// organised by size (spec §6 "icon bundle").
    fn write_icon_bundle(&self) -> Result<(), Error> {
        let records = self.store.snapshot_sorted(StoreKind::Primary);
        let path = self.config.output_dir.join(format!("{}-icons.tar.gz", self.config.basename));

        let file = fs_err::File::create(&path).map_err(|source| Error::IconBundle { path: path.clone(), source: source.into() })?;
        let encoder = flate2::write::GzEncoder::new(file, flate2::Compression::default());
        let mut archive = tar::Builder::new(encoder);

        for record in &records {
            let Some(icon) = &record.icon else { continue };
            let (crate::app::IconKind::Cached, Some(source_path)) = (icon.kind, &icon.path) else { continue };
            let width = icon.width.unwrap_or(0);
            let height = icon.height.unwrap_or(0);
            let entry_name = format!("{width}x{height}/{}", icon.name);

            let bytes = match fs_err::read(source_path) {
                Ok(bytes) => bytes,
                Err(err) => {
                    log::warn!("skipping icon {}: {err}", source_path.display());
                    continue;
                }
            };
            let mut header = tar::Header::new_gnu();
            header.set_size(bytes.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            archive
                .append_data(&mut header, &entry_name, bytes.as_slice())
                .map_err(|source| Error::IconBundle { path: path.clone(), source })?;
        }

        let encoder = archive.into_inner().map_err(|source| Error::IconBundle { path: path.clone(), source })?;
        encoder.finish().map_err(|source| Error::IconBundle { path: path.clone(), source })?;
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::app::{ApplicationRecord, IdKind, SourceKind};
    use crate::package::{OpenedPackage, ReaderError};
    use std::path::{Path, PathBuf as StdPathBuf};

    struct FixedReader;
    impl PackageReader for FixedReader {
        fn open(&self, _path: &Path) -> Result<Box<dyn OpenedPackage>, ReaderError> {
            Ok(Box::new(FixedOpened))
        }
    }
    struct FixedOpened;
    impl OpenedPackage for FixedOpened {
        fn name(&self) -> &str {
            "consoleapp"
        }
        fn evr(&self) -> &str {
            "1.0-1"
        }
        fn arch(&self) -> &str {
            "x86_64"
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
        fn file_list(&self) -> &[StdPathBuf] {
            &[]
        }
        fn explode(&self, _patterns: &[String], _dest: &Path) -> Result<Vec<StdPathBuf>, ReaderError> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn setup_creates_missing_directories() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Configuration::default();
        config.cache_dir = dir.path().join("cache");
        config.temp_dir = dir.path().join("tmp");
        config.output_dir = dir.path().join("output");

        let ctx = Context::setup(config, Box::new(FixedReader)).unwrap();
        drop(ctx);

        assert!(dir.path().join("cache").is_dir());
        assert!(dir.path().join("tmp").is_dir());
        assert!(dir.path().join("output").is_dir());
    }

    #[test]
    fn package_with_no_matching_files_lands_in_ignore_store() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Configuration::default();
        config.cache_dir = dir.path().join("cache");
        config.temp_dir = dir.path().join("tmp");
        config.output_dir = dir.path().join("output");
        config.max_threads = 1;

        let ctx = Context::setup(config, Box::new(FixedReader)).unwrap();
        ctx.add_filename(PathBuf::from("consoleapp-1.0-1.x86_64.rpm"));
        ctx.process().unwrap();

        assert!(!ctx.store.is_empty(StoreKind::Ignore));
        assert!(ctx.store.is_empty(StoreKind::Primary));
    }

    #[test]
    fn cached_package_is_resolved_without_queueing() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Configuration::default();
        config.cache_dir = dir.path().join("cache");
        config.temp_dir = dir.path().join("tmp");
        config.output_dir = dir.path().join("output");
        fs_err::create_dir_all(&config.output_dir).unwrap();

        let mut record = ApplicationRecord::new("cached.desktop", IdKind::Desktop, SourceKind::DesktopEntry);
        record.metadata.insert("X-CacheID".to_string(), cache::fingerprint("cached-1.0-1.noarch.rpm"));
        let options = CatalogOptions { api_version: crate::catalog::ApiVersion::CURRENT, builder_id: BUILDER_ID, origin: "t".into(), add_cache_id: true };
        DefaultCatalogWriter.write(&config.output_dir.join("appstream.xml.gz"), &[record], &options).unwrap();

        let ctx = Context::setup(config, Box::new(FixedReader)).unwrap();
        ctx.add_filename(PathBuf::from("cached-1.0-1.noarch.rpm"));

        assert!(ctx.queue.lock().unwrap().is_empty());
        assert!(!ctx.store.is_empty(StoreKind::Primary));
    }
}
