// SPDX-FileCopyrightText: Copyright © 2020-2024 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

//! Cross-package merge pass (spec §4.4): composite clustering, subsume, and
//! addon/font `extends` attachment. Grounded on
//! `examples/original_source/libappstream-builder/plugins/asb-plugin-composite.c`
//! and the teacher's `crates/dag` cycle-safe graph (spec §9 design notes:
//! "Shared mutable stores under workers become owned-by-coordinator
//! containers"; the extends graph reuses that same cycle-safety need).

use std::collections::HashMap;

use catalogen_dag::Dag;
use itertools::Itertools;

use crate::app::{shared_id_prefix, ApplicationRecord, IdKind, SubsumeMode};

/// Group applications sharing a default package name (the first entry of
/// `pkgnames`) and fold-merge by ascending `id` (short id) length whenever
/// two ids in the same group share a length-≥4 prefix (SPEC_FULL §B.2, the
/// resolved Open Question on deterministic composite clustering). The
/// keeper's identity converges onto that shared prefix, and the donor of a
/// successful merge is marked with a veto naming the keeper so a later pass
/// can move it to the failed store.
pub fn composite(apps: &mut [ApplicationRecord]) {
    let groups: HashMap<String, Vec<usize>> = (0..apps.len())
        .filter(|&index| apps[index].pkgnames.iter().next().is_some())
        .into_group_map_by(|&index| apps[index].pkgnames.iter().next().unwrap().to_string());

    for mut indices in groups.into_values() {
        if indices.len() < 2 {
            continue;
        }
        indices.sort_by_key(|&i| apps[i].id.len());

        let keeper_index = indices[0];
        for &donor_index in &indices[1..] {
            if apps[donor_index].has_vetoes() {
                continue;
            }
            let Some(prefix) = shared_id_prefix(&apps[keeper_index].id_full, &apps[donor_index].id_full) else {
                continue;
            };
            let donor = apps[donor_index].clone();
            apps[keeper_index].subsume(&donor, SubsumeMode::NoOverwrite);
            apps[keeper_index].set_id_full(prefix);
            let keeper_id_full = apps[keeper_index].id_full.clone();
            apps[donor_index].add_veto(format!("absorbed into {keeper_id_full}"));
        }
    }
}

/// Resolve `extends` edges (spec §4.4 "Addon attachment"). A `Font` donor is
/// fully merged into its parent and vetoed (`"<donor> was merged into
/// <parent>"`); any other kind keeps the `extends` edge and stays alongside
/// its parent in the store. An addon whose parent never showed up is vetoed
/// with `"Required parent <parent-id> not present"` unless
/// `ignore_missing_parents` is set. Edges that would introduce a cycle are
/// skipped and the donor is left untouched, same as a missing parent.
pub fn attach_extends(apps: &mut [ApplicationRecord], ignore_missing_parents: bool) {
    let index_of: HashMap<String, usize> = apps
        .iter()
        .enumerate()
        .filter(|(_, app)| !app.has_vetoes())
        .map(|(index, app)| (app.id_full.clone(), index))
        .collect();

    let mut dag: Dag<String> = Dag::new();
    for app in apps.iter() {
        dag.add_node_or_get_index(app.id_full.clone());
    }

    let donor_indices: Vec<usize> = (0..apps.len())
        .filter(|&i| apps[i].extends.is_some() && !apps[i].has_vetoes())
        .collect();

    for donor_index in donor_indices {
        let parent_id = apps[donor_index].extends.clone().unwrap();
        let Some(&parent_index) = index_of.get(&parent_id) else {
            if !ignore_missing_parents {
                apps[donor_index].add_veto(format!("Required parent {parent_id} not present"));
            }
            continue;
        };
        if parent_index == donor_index {
            continue;
        }

        let donor_node = dag.add_node_or_get_index(apps[donor_index].id_full.clone());
        let parent_node = dag.add_node_or_get_index(parent_id.clone());
        if !dag.add_edge(donor_node, parent_node) {
            continue;
        }

        if apps[donor_index].id_kind == IdKind::Font {
            let donor = apps[donor_index].clone();
            let donor_short = donor.id.clone();
            let parent_short = apps[parent_index].id.clone();
            apps[parent_index].subsume(&donor, SubsumeMode::NoOverwrite);
            apps[donor_index].add_veto(format!("{donor_short} was merged into {parent_short}"));
        }
        // Non-font kinds keep their own record and the `extends` edge as-is.
    }
}

/// Partition `apps` into records with no vetoes and records carrying at
/// least one (spec §4.4, §7: veto propagation moves vetoed records out of
/// the primary store into the failed store).
pub fn partition_vetoed(apps: Vec<ApplicationRecord>) -> (Vec<ApplicationRecord>, Vec<ApplicationRecord>) {
    apps.into_iter().partition(|app| !app.has_vetoes())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::app::SourceKind;

    fn app(id_full: &str, id_kind: IdKind, pkgname: &str) -> ApplicationRecord {
        let mut app = ApplicationRecord::new(id_full, id_kind, SourceKind::DesktopEntry);
        app.pkgnames.push(pkgname);
        app
    }

    #[test]
    fn composite_keeps_shorter_id_and_vetoes_donor() {
        let mut apps = vec![
            app("valid.desktop", IdKind::Desktop, "composite"),
            app("valid2.desktop", IdKind::Desktop, "composite"),
        ];
        composite(&mut apps);

        let (kept, vetoed) = partition_vetoed(apps);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].id_full, "valid");
        assert_eq!(kept[0].id, "valid");
        assert_eq!(kept[0].pkgnames.iter().collect::<Vec<_>>(), vec!["composite"]);
        assert_eq!(vetoed[0].vetoes, vec!["absorbed into valid".to_string()]);
    }

    #[test]
    fn composite_requires_shared_prefix_length_four() {
        let mut apps = vec![app("ab.desktop", IdKind::Desktop, "pkg"), app("ab2.desktop", IdKind::Desktop, "pkg")];
        composite(&mut apps);
        let (kept, vetoed) = partition_vetoed(apps);
        assert_eq!(kept.len(), 2);
        assert!(vetoed.is_empty());
    }

    #[test]
    fn font_extends_merges_donor_into_parent() {
        let mut parent = app("Liberation.desktop", IdKind::Font, "font");
        parent.pkgnames.push("font");
        let mut donor = app("LiberationSerif.desktop", IdKind::Font, "font-serif");
        donor.extends = Some("Liberation.desktop".to_string());
        let mut apps = vec![parent, donor];

        attach_extends(&mut apps, false);

        let (kept, vetoed) = partition_vetoed(apps);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].pkgnames.iter().collect::<Vec<_>>(), vec!["font", "font-serif"]);
        assert_eq!(vetoed[0].vetoes, vec!["LiberationSerif was merged into Liberation".to_string()]);
    }

    #[test]
    fn addon_extends_keeps_both_records() {
        let parent = app("app.desktop", IdKind::Desktop, "app");
        let mut addon = app("app-extra", IdKind::Addon, "app-extra");
        addon.extends = Some("app.desktop".to_string());
        let mut apps = vec![parent, addon];

        attach_extends(&mut apps, false);

        let (kept, vetoed) = partition_vetoed(apps);
        assert_eq!(kept.len(), 2);
        assert!(vetoed.is_empty());
    }

    #[test]
    fn addon_with_missing_parent_is_vetoed_unless_ignored() {
        let mut addon = app("app-extra", IdKind::Addon, "app-extra");
        addon.extends = Some("app.desktop".to_string());
        let mut apps = vec![addon.clone()];
        attach_extends(&mut apps, false);
        assert_eq!(apps[0].vetoes, vec!["Required parent app.desktop not present".to_string()]);

        let mut apps = vec![addon];
        attach_extends(&mut apps, true);
        assert!(apps[0].vetoes.is_empty());
    }
}
