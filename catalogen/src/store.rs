// SPDX-FileCopyrightText: Copyright © 2020-2024 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

//! The three shared result stores (spec §5): primary, failed, and ignore.
//! Each is guarded by a single exclusive lock; a worker finishing a Package
//! Task appends its whole batch of records in one critical section, so
//! contention is O(packages), not O(applications) (spec §9 design notes).

use std::sync::Mutex;

use crate::app::ApplicationRecord;

/// Which store a batch of finished records belongs in, decided by the
/// Package Task once it reaches a terminal state (spec §4.2 step 6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    Primary,
    Failed,
    Ignore,
}

#[derive(Default)]
pub struct Store {
    primary: Mutex<Vec<ApplicationRecord>>,
    failed: Mutex<Vec<ApplicationRecord>>,
    ignore: Mutex<Vec<ApplicationRecord>>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one task's finished records to `kind` in a single locked
    /// section (spec §5 "one critical section per task, not per record").
    pub fn append(&self, kind: StoreKind, records: Vec<ApplicationRecord>) {
        if records.is_empty() {
            return;
        }
        let mut guard = self.lock(kind);
        guard.extend(records);
    }

    fn lock(&self, kind: StoreKind) -> std::sync::MutexGuard<'_, Vec<ApplicationRecord>> {
        match kind {
            StoreKind::Primary => self.primary.lock().expect("primary store lock poisoned"),
            StoreKind::Failed => self.failed.lock().expect("failed store lock poisoned"),
            StoreKind::Ignore => self.ignore.lock().expect("ignore store lock poisoned"),
        }
    }

    /// Run the end-of-run merge pass (spec §4.4) over the primary and
    /// failed stores, moving any record that ends up with a veto from
    /// primary into failed. Ignore never participates in merge. Composite
    /// clustering runs through `loader`'s `merge` hook (so a third-party
    /// plugin can extend or replace it); addon/font `extends` attachment is
    /// not hookable and always runs.
    pub fn run_merge_phase(&self, loader: &crate::plugin::Loader, ignore_missing_parents: bool) -> Result<(), String> {
        let mut primary = self.primary.lock().expect("primary store lock poisoned");

        loader.run_merge(&mut primary)?;
        crate::merge::attach_extends(&mut primary, ignore_missing_parents);

        let (kept, vetoed) = crate::merge::partition_vetoed(std::mem::take(&mut *primary));
        *primary = kept;
        drop(primary);

        if !vetoed.is_empty() {
            self.failed.lock().expect("failed store lock poisoned").extend(vetoed);
        }
        Ok(())
    }

    /// Final sorted snapshot of a store (spec §5: "sorted deterministically
    /// by `id_full`, then `pkgname`, before serialisation").
    pub fn snapshot_sorted(&self, kind: StoreKind) -> Vec<ApplicationRecord> {
        let mut records = self.lock(kind).clone();
        records.sort_by(|a, b| {
            a.id_full.cmp(&b.id_full).then_with(|| a.pkgnames.iter().next().cmp(&b.pkgnames.iter().next()))
        });
        records
    }

    pub fn is_empty(&self, kind: StoreKind) -> bool {
        self.lock(kind).is_empty()
    }
}
