// SPDX-FileCopyrightText: Copyright © 2020-2024 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

use std::path::Path;

use log::warn;
use thiserror::Error;

use super::{Pattern, PatternError, Plugin, PluginError};
use crate::app::ApplicationRecord;
use crate::package::Package;

#[derive(Debug, Error)]
pub enum Error {
    #[error("plugin {plugin:?} registered invalid glob: {source}")]
    InvalidGlob {
        plugin: &'static str,
        #[source]
        source: PatternError,
    },
}

/// Loads the set of plugins, exposes the union of their globs, and
/// dispatches file paths to the single best-matching plugin (spec §4.1).
pub struct Loader {
    plugins: Vec<Box<dyn Plugin>>,
    /// `(pattern, plugin_index)`, built once at construction time. First
    /// registration order is preserved so tie-breaks favour whichever
    /// plugin registered its glob first (spec §4.1: "on tie, first-
    /// registered wins").
    routes: Vec<(Pattern, usize)>,
}

impl Loader {
    pub fn new(plugins: Vec<Box<dyn Plugin>>) -> Result<Self, Error> {
        let mut routes = Vec::new();
        for (index, plugin) in plugins.iter().enumerate() {
            for glob in plugin.globs() {
                let pattern = Pattern::compile(glob).map_err(|source| Error::InvalidGlob {
                    plugin: plugin.name(),
                    source,
                })?;
                routes.push((pattern, index));
            }
        }
        Ok(Self { plugins, routes })
    }

    /// The union of every plugin's globs, paired with the plugin's name.
    pub fn globs(&self) -> impl Iterator<Item = (&Pattern, &'static str)> {
        self.routes.iter().map(|(pattern, index)| (pattern, self.plugins[*index].name()))
    }

    /// `true` if `path` matches at least one registered glob; used to
    /// decide whether a package has any interesting payload at all (spec
    /// §4.2 step 2, "Ensured").
    pub fn any_match(&self, path: &str) -> bool {
        self.routes.iter().any(|(pattern, _)| pattern.is_match(path))
    }

    /// The single plugin whose glob best matches `path`: longest literal
    /// prefix wins, first-registered breaks ties (spec §4.1 `match_file`).
    pub fn match_file(&self, path: &str) -> Option<&dyn Plugin> {
        let mut best: Option<(usize, usize)> = None; // (literal_prefix_len, route_index)
        for (route_index, (pattern, _)) in self.routes.iter().enumerate() {
            if !pattern.is_match(path) {
                continue;
            }
            let score = pattern.literal_prefix_len();
            let replace = match best {
                Some((best_score, _)) => score > best_score,
                None => true,
            };
            if replace {
                best = Some((score, route_index));
            }
        }
        best.map(|(_, route_index)| {
            let plugin_index = self.routes[route_index].1;
            self.plugins[plugin_index].as_ref()
        })
    }

    /// Run `process_file` on the plugin that owns `path` (relative to the
    /// package root). Returns `Err` only for a fatal plugin error (spec
    /// §4.1 "Failure policy"); a veto is attached directly to the relevant
    /// application(s) in `apps` and the task continues.
    pub fn run_process_file(
        &self,
        pkg: &mut Package,
        root: &Path,
        path: &Path,
        apps: &mut Vec<ApplicationRecord>,
    ) -> Result<(), String> {
        let path_str = path.to_string_lossy();
        let Some(plugin) = self.match_file(&path_str) else {
            return Ok(());
        };

        match plugin.process_file(pkg, root, path, apps) {
            Ok(()) => Ok(()),
            Err(PluginError::Veto(reason)) => {
                if let Some(app) = apps.last_mut() {
                    app.add_veto(reason);
                } else {
                    warn!("plugin {} vetoed {path_str} with no application to attach to: {reason}", plugin.name());
                }
                Ok(())
            }
            Err(PluginError::Fatal(reason)) => Err(reason),
        }
    }

    /// Run `process_app` on every plugin, in registration order (spec §4.1
    /// `run_hook`).
    pub fn run_process_app(&self, app: &mut ApplicationRecord, tmpdir: &Path) -> Result<(), String> {
        for plugin in &self.plugins {
            match plugin.process_app(app, tmpdir) {
                Ok(()) => {}
                Err(PluginError::Veto(reason)) => app.add_veto(reason),
                Err(PluginError::Fatal(reason)) => return Err(reason),
            }
        }
        Ok(())
    }

    /// Run the cross-package `merge` hook on every plugin, in registration
    /// order (spec §4.4).
    pub fn run_merge(&self, apps: &mut Vec<ApplicationRecord>) -> Result<(), String> {
        for plugin in &self.plugins {
            match plugin.merge(apps) {
                Ok(()) => {}
                Err(PluginError::Veto(reason)) => {
                    warn!("plugin {} reported a merge-phase veto with no single target app: {reason}", plugin.name());
                }
                Err(PluginError::Fatal(reason)) => return Err(reason),
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::app::{IdKind, SourceKind};

    struct Desktop;
    impl Plugin for Desktop {
        fn name(&self) -> &'static str {
            "desktop"
        }
        fn globs(&self) -> &[&'static str] {
            &["usr/share/applications/*.desktop"]
        }
    }

    struct Appdata;
    impl Plugin for Appdata {
        fn name(&self) -> &'static str {
            "appdata"
        }
        fn globs(&self) -> &[&'static str] {
            &["usr/share/appdata/*.xml", "usr/share/metainfo/*.xml"]
        }
    }

    struct CatchAll;
    impl Plugin for CatchAll {
        fn name(&self) -> &'static str {
            "catch-all"
        }
        fn globs(&self) -> &[&'static str] {
            &["**"]
        }
    }

    #[test]
    fn longest_literal_prefix_wins_on_overlap() {
        let loader = Loader::new(vec![Box::new(CatchAll), Box::new(Desktop)]).unwrap();
        let matched = loader.match_file("usr/share/applications/app.desktop").unwrap();
        assert_eq!(matched.name(), "desktop");
    }

    #[test]
    fn first_registered_wins_on_equal_literal_prefix() {
        struct A;
        impl Plugin for A {
            fn name(&self) -> &'static str {
                "a"
            }
            fn globs(&self) -> &[&'static str] {
                &["usr/share/*.xml"]
            }
        }
        struct B;
        impl Plugin for B {
            fn name(&self) -> &'static str {
                "b"
            }
            fn globs(&self) -> &[&'static str] {
                &["usr/share/*.xml"]
            }
        }
        let loader = Loader::new(vec![Box::new(A), Box::new(B)]).unwrap();
        let matched = loader.match_file("usr/share/app.xml").unwrap();
        assert_eq!(matched.name(), "a");
    }

    #[test]
    fn process_file_veto_attaches_to_last_app() {
        struct Vetoer;
        impl Plugin for Vetoer {
            fn name(&self) -> &'static str {
                "vetoer"
            }
            fn globs(&self) -> &[&'static str] {
                &["*.xml"]
            }
            fn process_file(
                &self,
                _pkg: &mut Package,
                _root: &Path,
                _path: &Path,
                apps: &mut Vec<ApplicationRecord>,
            ) -> Result<(), PluginError> {
                apps.push(ApplicationRecord::new("app.desktop", IdKind::Desktop, SourceKind::MetadataXml));
                Err(PluginError::veto("malformed xml"))
            }
        }
        let loader = Loader::new(vec![Box::new(Vetoer)]).unwrap();
        let mut pkg = Package::new("pkg.rpm".into(), "fp".into());
        let mut apps = Vec::new();
        loader
            .run_process_file(&mut pkg, Path::new("/tmp/scratch"), Path::new("app.xml"), &mut apps)
            .unwrap();
        assert_eq!(apps[0].vetoes, vec!["malformed xml".to_string()]);
    }
}
