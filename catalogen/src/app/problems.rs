// SPDX-FileCopyrightText: Copyright © 2020-2024 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

use bitflags::bitflags;

bitflags! {
    /// Non-fatal parse-time anomalies accumulated on an [`ApplicationRecord`]
    /// (spec §7, "Parse problems"). These never block emission but can be
    /// surfaced to the log.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Problems: u32 {
        const NONE = 0;
        /// AppData/metainfo XML is missing the `<?xml version="1.0"?>` header.
        const MISSING_XML_HEADER = 1 << 0;
        /// AppData/metainfo XML is missing its copyright comment.
        const MISSING_COPYRIGHT_COMMENT = 1 << 1;
        /// Desktop entry or AppData used the deprecated `licence` spelling.
        const DEPRECATED_LICENCE_SPELLING = 1 << 2;
        /// More than one top-level `<component>`/`<application>` node found
        /// in a single AppData file.
        const MULTIPLE_TOP_LEVEL_NODES = 1 << 3;
        /// `<description>` contained markup outside the supported subset
        /// (`<p>`, `<ul>`, `<ol>`, `<li>`); it was stripped to plain text.
        const UNSUPPORTED_DESCRIPTION_MARKUP = 1 << 4;
    }
}
