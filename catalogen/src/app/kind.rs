// SPDX-FileCopyrightText: Copyright © 2020-2024 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

use std::fmt;

/// What kind of installable thing an [`ApplicationRecord`](super::ApplicationRecord)
/// represents (spec §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IdKind {
    Desktop,
    Font,
    Codec,
    InputMethod,
    Addon,
    WebApp,
    Source,
    #[default]
    Unknown,
}

impl IdKind {
    /// The string used for the `type` attribute on `<component>` (spec §6).
    pub fn as_xml_str(self) -> Option<&'static str> {
        match self {
            IdKind::Desktop => Some("desktop"),
            IdKind::Font => Some("font"),
            IdKind::Codec => Some("codec"),
            IdKind::InputMethod => Some("inputmethod"),
            IdKind::Addon => Some("addon"),
            IdKind::WebApp => Some("webapp"),
            IdKind::Source => Some("source"),
            IdKind::Unknown => None,
        }
    }
}

impl fmt::Display for IdKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_xml_str().unwrap_or(""))
    }
}

/// Which file taught us about this application (spec §3, SPEC_FULL §B.3).
/// Independent from [`IdKind`]: a font and a desktop app can both have been
/// discovered from a metadata-xml file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SourceKind {
    DesktopEntry,
    MetadataXml,
    #[default]
    Synthesised,
}

/// A URL kind key for the `urls` map (spec §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum UrlKind {
    Homepage,
    Bugtracker,
    Donation,
    Help,
}

impl UrlKind {
    pub fn as_xml_str(self) -> &'static str {
        match self {
            UrlKind::Homepage => "homepage",
            UrlKind::Bugtracker => "bugtracker",
            UrlKind::Donation => "donation",
            UrlKind::Help => "help",
        }
    }
}

impl fmt::Display for UrlKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_xml_str())
    }
}
