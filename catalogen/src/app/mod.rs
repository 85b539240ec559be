// SPDX-FileCopyrightText: Copyright © 2020-2024 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

//! The Application Record (spec §3): the in-memory representation of one
//! discovered application, plus the subsume/composite machinery that merges
//! two records together (spec §4.4, §9).

mod description;
mod icon;
mod kind;
mod locale;
mod problems;
mod release;

pub use description::{unescape_text, Block, Description};
pub use icon::{Icon, IconKind};
pub use kind::{IdKind, SourceKind, UrlKind};
pub use locale::{LocaleMap, OrderedSet, FALLBACK_LOCALE};
pub use problems::Problems;
pub use release::{Release, Screenshot, MAX_SERIALISED_RELEASES};

use std::collections::BTreeMap;

/// How [`ApplicationRecord::subsume`] resolves conflicting fields between
/// a `target` and a `donor` (spec §4.4, §9 design notes: "Subsume as
/// multi-flag method becomes an explicit enum").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubsumeMode {
    /// Default for a partial (composite) merge: scalars and map entries are
    /// copied only where the target has none.
    NoOverwrite,
    /// Full merge: target values are replaced by the donor's.
    Overwrite,
    /// Symmetric merge: always no-overwrite, applied in both directions by
    /// the caller.
    BothWays,
}

#[derive(Debug, Clone)]
pub struct ApplicationRecord {
    pub id: String,
    pub id_full: String,
    pub id_kind: IdKind,
    pub source_kind: SourceKind,

    pub names: LocaleMap<String>,
    pub comments: LocaleMap<String>,
    pub descriptions: LocaleMap<Description>,

    pub keywords: LocaleMap<OrderedSet>,
    pub categories: OrderedSet,
    pub mimetypes: OrderedSet,
    pub architectures: OrderedSet,
    pub pkgnames: OrderedSet,
    pub compulsory_for_desktops: OrderedSet,

    pub urls: BTreeMap<UrlKind, String>,
    pub releases: Vec<Release>,
    pub screenshots: Vec<Screenshot>,
    pub languages: BTreeMap<String, u8>,
    pub metadata: BTreeMap<String, String>,
    pub icon: Option<Icon>,

    pub project_license: Option<String>,
    pub metadata_license: Option<String>,
    pub project_group: Option<String>,
    pub update_contact: Option<String>,
    pub priority: i32,

    /// Set when `id_kind == IdKind::Addon`: the `id_full` of the
    /// application this one extends (spec §4.4 Addon attachment).
    pub extends: Option<String>,

    pub vetoes: Vec<String>,
    pub problems: Problems,
}

impl ApplicationRecord {
    /// Construct a new record from its qualified id, deriving the short
    /// `id` per invariant I1: "the longest prefix of `id_full` up to the
    /// last `.`".
    pub fn new(id_full: impl Into<String>, id_kind: IdKind, source_kind: SourceKind) -> Self {
        let id_full = id_full.into();
        let id = short_id(&id_full);
        Self {
            id,
            id_full,
            id_kind,
            source_kind,
            names: LocaleMap::new(),
            comments: LocaleMap::new(),
            descriptions: LocaleMap::new(),
            keywords: LocaleMap::new(),
            categories: OrderedSet::new(),
            mimetypes: OrderedSet::new(),
            architectures: OrderedSet::new(),
            pkgnames: OrderedSet::new(),
            compulsory_for_desktops: OrderedSet::new(),
            urls: BTreeMap::new(),
            releases: Vec::new(),
            screenshots: Vec::new(),
            languages: BTreeMap::new(),
            metadata: BTreeMap::new(),
            icon: None,
            project_license: None,
            metadata_license: None,
            project_group: None,
            update_contact: None,
            priority: 0,
            extends: None,
            vetoes: Vec::new(),
            problems: Problems::NONE,
        }
    }

    /// Re-derive `id` from a newly set `id_full` (used when renaming a
    /// record to a shared composite prefix).
    pub fn set_id_full(&mut self, id_full: impl Into<String>) {
        self.id_full = id_full.into();
        self.id = short_id(&self.id_full);
    }

    pub fn add_veto(&mut self, reason: impl Into<String>) {
        self.vetoes.push(reason.into());
    }

    pub fn has_vetoes(&self) -> bool {
        !self.vetoes.is_empty()
    }

    /// Push a screenshot, enforcing "at most one marked default" (spec §3).
    pub fn push_screenshot(&mut self, mut screenshot: Screenshot) {
        if screenshot.default && self.screenshots.iter().any(|s| s.default) {
            screenshot.default = false;
        }
        self.screenshots.push(screenshot);
    }

    /// Record a language coverage percentage, clamped into `[0, 100]`
    /// (invariant I5).
    pub fn set_language(&mut self, locale: impl Into<String>, percentage: u8) {
        self.languages.insert(locale.into(), percentage.min(100));
    }

    /// Releases sorted descending by timestamp, truncated to
    /// [`MAX_SERIALISED_RELEASES`] (invariant I4, used by the catalog
    /// writer).
    pub fn releases_for_serialisation(&self) -> Vec<&Release> {
        let mut releases: Vec<&Release> = self.releases.iter().collect();
        releases.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        releases.truncate(MAX_SERIALISED_RELEASES);
        releases
    }

    /// Copy fields from `donor` into `self` according to `mode` (spec §4.4
    /// "Subsume"). Package names, screenshots, languages (max percentage),
    /// categories, and keywords are always union-merged regardless of mode.
    /// The icon is replaced only if `self` lacks one.
    pub fn subsume(&mut self, donor: &ApplicationRecord, mode: SubsumeMode) {
        let overwrite = matches!(mode, SubsumeMode::Overwrite);

        macro_rules! scalar {
            ($field:ident) => {
                if overwrite {
                    if donor.$field.is_some() {
                        self.$field = donor.$field.clone();
                    }
                } else if self.$field.is_none() {
                    self.$field = donor.$field.clone();
                }
            };
        }
        scalar!(project_license);
        scalar!(metadata_license);
        scalar!(project_group);
        scalar!(update_contact);

        if overwrite && donor.icon.is_some() {
            self.icon = donor.icon.clone();
        } else if self.icon.is_none() {
            self.icon = donor.icon.clone();
        }

        for (locale, text) in donor.names.iter() {
            if overwrite {
                self.names.insert(locale, text.to_string());
            } else {
                self.names.insert_if_absent(locale, text.to_string());
            }
        }
        for (locale, text) in donor.comments.iter() {
            if overwrite {
                self.comments.insert(locale, text.to_string());
            } else {
                self.comments.insert_if_absent(locale, text.to_string());
            }
        }
        for (locale, text) in donor.descriptions.iter() {
            if overwrite {
                self.descriptions.insert(locale, text.clone());
            } else {
                self.descriptions.insert_if_absent(locale, text.clone());
            }
        }

        // Always union-merged regardless of subsume mode (spec §4.4).
        self.pkgnames.union_from(&donor.pkgnames);
        self.categories.union_from(&donor.categories);
        self.mimetypes.union_from(&donor.mimetypes);
        self.architectures.union_from(&donor.architectures);
        self.compulsory_for_desktops.union_from(&donor.compulsory_for_desktops);

        for (locale, keywords) in donor.keywords.iter() {
            if let Some(existing) = self.keywords.get(locale) {
                let mut merged = existing.clone();
                merged.union_from(keywords);
                self.keywords.insert(locale, merged);
            } else {
                self.keywords.insert(locale, keywords.clone());
            }
        }

        for screenshot in &donor.screenshots {
            self.push_screenshot(screenshot.clone());
        }

        for (locale, percentage) in &donor.languages {
            let merged = self.languages.get(locale).copied().unwrap_or(0).max(*percentage);
            self.languages.insert(locale.clone(), merged);
        }

        for (key, value) in &donor.urls {
            if overwrite || !self.urls.contains_key(key) {
                self.urls.insert(*key, value.clone());
            }
        }

        for (key, value) in &donor.metadata {
            if overwrite || !self.metadata.contains_key(key) {
                self.metadata.insert(key.clone(), value.clone());
            }
        }

        if overwrite {
            self.releases.extend(donor.releases.iter().cloned());
        } else {
            for release in &donor.releases {
                if !self.releases.iter().any(|r| r.version == release.version) {
                    self.releases.push(release.clone());
                }
            }
        }
    }
}

/// Invariant I1: `id` is the longest prefix of `id_full` up to the last `.`.
/// When no `.` is present, `id` equals `id_full` in full.
pub fn short_id(id_full: &str) -> String {
    match id_full.rfind('.') {
        Some(idx) => id_full[..idx].to_string(),
        None => id_full.to_string(),
    }
}

/// The length-≥4 shared prefix of two ids' short forms (`id_full` with its
/// last `.`-segment stripped), used by the composite pass (spec §4.4, §9
/// design notes referencing `as_utils_get_string_overlap`/
/// `_as_app_is_id_valid`). Returns `None` when the overlap is shorter than 4
/// characters.
pub fn shared_id_prefix(a: &str, b: &str) -> Option<String> {
    let (short_a, short_b) = (short_id(a), short_id(b));
    let common: String = short_a
        .chars()
        .zip(short_b.chars())
        .take_while(|(x, y)| x == y)
        .map(|(x, _)| x)
        .collect();

    if common.len() < 4 {
        None
    } else {
        Some(common)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn short_id_is_prefix_up_to_last_dot() {
        assert_eq!(short_id("app.desktop"), "app");
        assert_eq!(short_id("org.example.App.desktop"), "org.example.App");
        assert_eq!(short_id("noextension"), "noextension");
    }

    #[test]
    fn shared_prefix_requires_length_four() {
        assert_eq!(shared_id_prefix("valid.desktop", "valid2.desktop"), Some("valid".to_string()));
        assert_eq!(shared_id_prefix("ab.desktop", "ab2.desktop"), None);
    }

    #[test]
    fn subsume_no_overwrite_keeps_target_scalars() {
        let mut target = ApplicationRecord::new("app.desktop", IdKind::Desktop, SourceKind::DesktopEntry);
        target.project_license = Some("MIT".to_string());
        let mut donor = ApplicationRecord::new("app2.desktop", IdKind::Desktop, SourceKind::DesktopEntry);
        donor.project_license = Some("GPL-2.0".to_string());
        donor.pkgnames.push("app-extra");

        target.subsume(&donor, SubsumeMode::NoOverwrite);

        assert_eq!(target.project_license.as_deref(), Some("MIT"));
        assert!(target.pkgnames.contains("app-extra"));
    }

    #[test]
    fn subsume_overwrite_replaces_target_scalars() {
        let mut target = ApplicationRecord::new("app.desktop", IdKind::Desktop, SourceKind::DesktopEntry);
        target.project_license = Some("MIT".to_string());
        let mut donor = ApplicationRecord::new("app2.desktop", IdKind::Desktop, SourceKind::DesktopEntry);
        donor.project_license = Some("GPL-2.0".to_string());

        target.subsume(&donor, SubsumeMode::Overwrite);

        assert_eq!(target.project_license.as_deref(), Some("GPL-2.0"));
    }

    #[test]
    fn subsume_is_idempotent_against_self() {
        let mut target = ApplicationRecord::new("app.desktop", IdKind::Desktop, SourceKind::DesktopEntry);
        target.names.insert("C", "App".to_string());
        target.pkgnames.push("app");
        let clone = target.clone();

        target.subsume(&clone, SubsumeMode::NoOverwrite);

        assert_eq!(target.names.get("C"), Some(&"App".to_string()));
        assert_eq!(target.pkgnames.iter().collect::<Vec<_>>(), vec!["app"]);
    }

    #[test]
    fn languages_take_max_percentage() {
        let mut target = ApplicationRecord::new("app.desktop", IdKind::Desktop, SourceKind::DesktopEntry);
        target.set_language("de", 40);
        let mut donor = ApplicationRecord::new("app2.desktop", IdKind::Desktop, SourceKind::DesktopEntry);
        donor.set_language("de", 80);

        target.subsume(&donor, SubsumeMode::NoOverwrite);

        assert_eq!(target.languages.get("de"), Some(&80));
    }

    #[test]
    fn only_one_screenshot_stays_default() {
        let mut app = ApplicationRecord::new("app.desktop", IdKind::Desktop, SourceKind::DesktopEntry);
        app.push_screenshot(Screenshot { default: true, caption: None, images: vec!["a.png".into()] });
        app.push_screenshot(Screenshot { default: true, caption: None, images: vec!["b.png".into()] });

        assert_eq!(app.screenshots.iter().filter(|s| s.default).count(), 1);
    }
}
