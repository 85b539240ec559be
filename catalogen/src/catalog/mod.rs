// SPDX-FileCopyrightText: Copyright © 2020-2024 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

//! The Catalog Writer/Reader external collaborators (spec §2, §6): turn a
//! store's application records into (or back out of) the gzip-compressed
//! XML catalog format, honouring API-version-dependent tag renaming.
//! Grounded on the teacher's `quick-xml`+`flate2` config/db serialisation
//! (`moss::db::meta`, `moss::config`) for the read/write shape, simplified
//! to this crate's narrower document.

mod reader;
mod writer;

pub use reader::{CatalogReader, DefaultCatalogReader, ParsedCatalog};
pub use writer::{CatalogOptions, CatalogWriter, DefaultCatalogWriter};

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("xml error: {0}")]
    Xml(#[from] quick_xml::Error),
    #[error("invalid api version {0:?}")]
    InvalidApiVersion(String),
}

/// `<major>.<minor>` schema version controlling the catalog's exact XML
/// shape (spec §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ApiVersion {
    pub major: u32,
    pub minor: u32,
}

impl ApiVersion {
    pub const CURRENT: ApiVersion = ApiVersion { major: 0, minor: 9 };

    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }
}

impl fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

impl FromStr for ApiVersion {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (major, minor) = s.split_once('.').ok_or_else(|| CatalogError::InvalidApiVersion(s.to_string()))?;
        let major: u32 = major.parse().map_err(|_| CatalogError::InvalidApiVersion(s.to_string()))?;
        let minor: u32 = minor.parse().map_err(|_| CatalogError::InvalidApiVersion(s.to_string()))?;
        Ok(Self { major, minor })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn api_version_orders_numerically_not_lexically() {
        assert!(ApiVersion::new(0, 9) < ApiVersion::new(0, 61));
        assert!(ApiVersion::new(0, 5) < ApiVersion::new(0, 6));
    }

    #[test]
    fn api_version_parses_from_str() {
        assert_eq!("0.61".parse::<ApiVersion>().unwrap(), ApiVersion::new(0, 61));
    }
}
