// SPDX-FileCopyrightText: Copyright © 2020-2024 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

//! Cache-fingerprint machinery and the old-catalog lookup (spec §3 "Cache
//! fingerprint", §4.3 "Setup"/"Enqueue"). SPEC_FULL §B.1 resolves the open
//! question of builder-identity invalidation: the fingerprint itself is
//! suffixed with [`BUILDER_ID`], so bumping it naturally invalidates every
//! old-catalog entry (no fingerprint computed under the new id can match one
//! recorded under the old one). The whole-catalog `builder_id` check in
//! [`OldCatalogLookup::load_with_reader`] is kept as a second, coarser guard
//! against loading a catalog written under a stale fingerprint scheme
//! entirely.

use std::collections::HashMap;
use std::path::Path;

use crate::app::ApplicationRecord;
use crate::catalog::{CatalogError, CatalogReader, DefaultCatalogReader};

/// Bumped whenever plugin behaviour changes in a way that could produce
/// different output for a package whose fingerprint is otherwise
/// unchanged. An old catalog written by a different builder is discarded
/// wholesale rather than trusted per-entry.
pub const BUILDER_ID: u32 = 1;

/// A package's cache fingerprint (spec §3: "a deterministic string derived
/// from the package basename"), suffixed with [`BUILDER_ID`] so that bumping
/// the builder id invalidates every fingerprint computed under the old one
/// (SPEC_FULL §B.1).
pub fn fingerprint(basename: &str) -> String {
    format!("{basename}-{BUILDER_ID}")
}

/// Which of the three stores an old-catalog record belongs in, recovered
/// from whether it carries vetoes (failed) or is a bare fingerprint-only
/// placeholder (ignore) or neither (primary).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CachedStoreKind {
    Primary,
    Failed,
    Ignore,
}

/// One or more application records, keyed by the package fingerprint that
/// produced them, recovered from a previously emitted catalog.
#[derive(Debug, Default)]
pub struct OldCatalogLookup {
    by_fingerprint: HashMap<String, Vec<(CachedStoreKind, ApplicationRecord)>>,
}

impl OldCatalogLookup {
    /// Load a previous run's primary/failed/ignore catalogs from
    /// `output_dir` (spec §4.3 "Setup"). Entries are discarded entirely if
    /// any catalog's `builder_id` doesn't match [`BUILDER_ID`].
    pub fn load(output_dir: &Path, basename: &str) -> Result<Self, CatalogError> {
        Self::load_with_reader(&DefaultCatalogReader, output_dir, basename)
    }

    pub fn load_with_reader(
        reader: &dyn CatalogReader,
        output_dir: &Path,
        basename: &str,
    ) -> Result<Self, CatalogError> {
        let mut lookup = Self::default();

        let sources = [
            (output_dir.join(format!("{basename}.xml.gz")), CachedStoreKind::Primary),
            (output_dir.join(format!("{basename}-failed.xml.gz")), CachedStoreKind::Failed),
            (output_dir.join(format!("{basename}-ignore.xml.gz")), CachedStoreKind::Ignore),
        ];

        for (path, kind) in sources {
            if !path.exists() {
                continue;
            }
            let parsed = reader.read(&path)?;
            if parsed.builder_id != Some(BUILDER_ID) {
                log::info!("discarding old catalog {}: builder_id mismatch", path.display());
                return Ok(Self::default());
            }
            for record in parsed.records {
                if let Some(id) = record.metadata.get("X-CacheID").cloned() {
                    lookup.by_fingerprint.entry(id).or_default().push((kind, record));
                }
            }
        }

        Ok(lookup)
    }

    /// The cached records for `fingerprint`, if this package was already
    /// processed by a compatible previous run.
    pub fn get(&self, fingerprint: &str) -> Option<&[(CachedStoreKind, ApplicationRecord)]> {
        self.by_fingerprint.get(fingerprint).map(Vec::as_slice)
    }

    pub fn is_empty(&self) -> bool {
        self.by_fingerprint.is_empty()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn fingerprint_suffixes_the_builder_id() {
        assert_eq!(fingerprint("test-0.1-1.fc21.noarch.rpm"), format!("test-0.1-1.fc21.noarch.rpm-{BUILDER_ID}"));
    }

    #[test]
    fn empty_lookup_when_no_catalogs_exist() {
        let dir = tempfile::tempdir().unwrap();
        let lookup = OldCatalogLookup::load(dir.path(), "metadata").unwrap();
        assert!(lookup.is_empty());
    }
}
