// SPDX-FileCopyrightText: Copyright © 2020-2024 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

//! Desktop-entry and AppData/metainfo XML parsing. Per spec §2, these are
//! "specified only at their interface boundaries as collaborators" — each
//! format gets a narrow trait plus a default concrete implementation, the
//! same shape as [`crate::package::PackageReader`].

pub mod desktop_entry;
pub mod metadata_xml;
