// SPDX-FileCopyrightText: Copyright © 2020-2024 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

//! Thin CLI entry point (SPEC_FULL §A "CLI"): a single `clap::Parser`
//! struct, no subcommands. Grounded on `boulder::cli::Global` for the
//! flag-struct shape, collapsed to one command since this crate has a
//! single operating mode, not a build/chroot/profile split.

use std::path::PathBuf;
use std::str::FromStr;

use clap::Parser;
use thiserror::Error;

use catalogen::catalog::ApiVersion;
use catalogen::config::Configuration;

#[derive(Debug, Parser)]
#[command(name = "catalogen", about = "Generate an application catalog from a directory of packages")]
pub struct Command {
    /// Directory to scan for packages.
    pub package_dir: PathBuf,

    /// Directory the catalog, failed/ignore reports, and icon bundle are
    /// written to.
    #[arg(long)]
    pub output_dir: PathBuf,

    /// Basename used for every emitted file (`<basename>.xml.gz`, …).
    #[arg(long)]
    pub basename: Option<String>,

    #[arg(long)]
    pub cache_dir: Option<PathBuf>,
    #[arg(long)]
    pub temp_dir: Option<PathBuf>,

    #[arg(long)]
    pub max_threads: Option<usize>,

    #[arg(long, value_parser = ApiVersion::from_str)]
    pub api_version: Option<ApiVersion>,

    #[arg(long)]
    pub ignore_missing_info: bool,
    #[arg(long)]
    pub ignore_missing_parents: bool,
    /// Configuration defaults to embedding a `X-CacheID` in every catalog
    /// entry; this disables it.
    #[arg(long)]
    pub no_cache_id: bool,
    #[arg(long)]
    pub no_net: bool,
}

impl Command {
    /// Merge CLI flags over [`Configuration::default`], the way
    /// `boulder::cli::Global` merges its flags over environment defaults.
    pub fn into_configuration(self) -> Configuration {
        let mut config = Configuration::default();
        config.output_dir = self.output_dir;
        if let Some(basename) = self.basename {
            config.basename = basename;
        }
        if let Some(cache_dir) = self.cache_dir {
            config.cache_dir = cache_dir;
        }
        if let Some(temp_dir) = self.temp_dir {
            config.temp_dir = temp_dir;
        }
        if let Some(max_threads) = self.max_threads {
            config.max_threads = max_threads;
        }
        if let Some(api_version) = self.api_version {
            config.api_version = api_version;
        }
        config.ignore_missing_info = self.ignore_missing_info;
        config.ignore_missing_parents = self.ignore_missing_parents;
        config.add_cache_id = !self.no_cache_id;
        config.no_net = self.no_net;
        config
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("setting up context: {0}")]
    Setup(#[from] catalogen::context::Error),
    #[error("scanning {path}: {source}")]
    Scan {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },
}

/// Run a full catalog generation pass: build a [`Configuration`] from the
/// parsed flags, enqueue every package found under `package_dir`, and
/// drive the worker pool to completion.
pub fn process(reader: Box<dyn catalogen::package::PackageReader>) -> Result<(), Error> {
    let command = Command::parse();
    let package_dir = command.package_dir.clone();
    let config = command.into_configuration();

    let context = catalogen::context::Context::setup(config, reader)?;

    for entry in walkdir::WalkDir::new(&package_dir) {
        let entry = entry.map_err(|source| Error::Scan { path: package_dir.clone(), source })?;
        if entry.file_type().is_file() {
            context.add_filename(entry.into_path());
        }
    }

    context.process()?;
    Ok(())
}
