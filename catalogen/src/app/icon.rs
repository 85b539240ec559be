// SPDX-FileCopyrightText: Copyright © 2020-2024 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

use std::path::PathBuf;

/// How an [`Icon`] was sourced (spec §3). Only `Cached`, `Stock`, and
/// `Remote` are ever serialised (spec §6); `Embedded` icons are resolved to
/// `Cached` by the icon-resolution plugin (`plugin::builtin::icon`) before
/// emission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IconKind {
    Cached,
    Stock,
    Remote,
    Embedded,
}

impl IconKind {
    pub fn as_xml_str(self) -> &'static str {
        match self {
            IconKind::Cached => "cached",
            IconKind::Stock => "stock",
            IconKind::Remote => "remote",
            IconKind::Embedded => "cached",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Icon {
    pub name: String,
    pub kind: IconKind,
    pub path: Option<PathBuf>,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

impl Icon {
    pub fn stock(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: IconKind::Stock,
            path: None,
            width: None,
            height: None,
        }
    }

    pub fn cached(name: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            name: name.into(),
            kind: IconKind::Cached,
            path: None,
            width: Some(width),
            height: Some(height),
        }
    }
}
