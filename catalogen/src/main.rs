// SPDX-FileCopyrightText: Copyright © 2020-2024 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

use std::error::Error;
use std::path::Path;

use catalogen::package::{OpenedPackage, PackageReader, ReaderError};

mod cli;

fn main() {
    env_logger::init();

    if let Err(error) = cli::process(Box::new(UnconfiguredReader)) {
        report_error(&error);
        std::process::exit(1);
    }
}

fn report_error(error: &cli::Error) {
    let mut sources = vec![error.to_string()];
    let mut source = error.source();
    while let Some(error) = source.take() {
        sources.push(error.to_string());
        source = error.source();
    }
    eprintln!("error: {}", sources.join(": "));
}

/// Archive parsing is outside this crate's scope (spec §1 Non-goals) — the
/// library only defines the `PackageReader` boundary. TODO: wire in a real
/// reader (rpm/deb/…) once a package format is chosen for this binary.
struct UnconfiguredReader;

impl PackageReader for UnconfiguredReader {
    fn open(&self, path: &Path) -> Result<Box<dyn OpenedPackage>, ReaderError> {
        Err(ReaderError::Open(path.to_path_buf(), "no PackageReader configured for this binary".to_string()))
    }
}
