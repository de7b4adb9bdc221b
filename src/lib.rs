// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//
//! Trackyard library - marshalling yard for your tracker report definitions
//!
//! This crate keeps the semi-structured text encodings of a tracker row
//! (field list, JSON filter array, boolean logic string, SOQL-like query,
//! formatting rules, ordering and sizing maps) mutually consistent while
//! fields are removed, swapped, or added.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod audit;
pub mod commands;
pub mod config;
pub mod engine;
pub mod filters;
pub mod history;
pub mod jsonscan;
pub mod kvlist;
pub mod locate;
pub mod logic;
pub mod planner;
pub mod query;
pub mod table;

/// Core data types matching the tracker export's column contract
pub mod types {
    use serde::{Deserialize, Serialize};
    use std::collections::BTreeMap;

    // =========================================================================
    // Column headers
    // =========================================================================

    /// Stable tracker identifier column
    pub const COL_ID: &str = "Tracker Name Id";
    /// Tracker display name column
    pub const COL_NAME: &str = "Tracker Name";
    /// Owner identifier column
    pub const COL_OWNER: &str = "Owner ID";
    /// Base business-object type column
    pub const COL_OBJECT: &str = "ObjectName";
    /// Comma-encoded field reference list column
    pub const COL_FIELDS: &str = "Fields";
    /// JSON filter-condition array column
    pub const COL_FILTERS: &str = "Filters";
    /// Boolean logic expression column (1-based positions into Filters)
    pub const COL_LOGIC: &str = "Logic";
    /// SOQL-like query string column
    pub const COL_QUERY: &str = "Query";
    /// JSON formatting-rule array column
    pub const COL_FORMATTING: &str = "Formatting";
    /// Comma-encoded ordering list column
    pub const COL_ORDER_BY: &str = "OrderBy(Long)";
    /// Column-width map column (`key=value` entries)
    pub const COL_RESIZE_MAP: &str = "ResizeMap";
    /// Column-label map column (`key:value` or `key=value` entries)
    pub const COL_LABEL_MAP: &str = "Label Map";

    /// Columns every tracker export must carry; loading fails without them
    pub const REQUIRED_COLUMNS: [&str; 12] = [
        COL_ID,
        COL_NAME,
        COL_OWNER,
        COL_OBJECT,
        COL_FIELDS,
        COL_FILTERS,
        COL_LOGIC,
        COL_QUERY,
        COL_FORMATTING,
        COL_ORDER_BY,
        COL_RESIZE_MAP,
        COL_LABEL_MAP,
    ];

    /// The text-bearing columns scanned for contextual field references
    pub const TEXT_COLUMNS: [&str; 8] = [
        COL_FIELDS,
        COL_FILTERS,
        COL_LOGIC,
        COL_QUERY,
        COL_FORMATTING,
        COL_ORDER_BY,
        COL_RESIZE_MAP,
        COL_LABEL_MAP,
    ];

    // =========================================================================
    // Tracker Row
    // =========================================================================

    /// One tracker record: the required columns as typed fields plus a
    /// passthrough side-table for any extra columns the engine never touches
    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    pub struct TrackerRow {
        /// Stable tracker identifier
        #[serde(rename = "Tracker Name Id", default)]
        pub id: String,
        /// Display name
        #[serde(rename = "Tracker Name", default)]
        pub name: String,
        /// Owner identifier
        #[serde(rename = "Owner ID", default)]
        pub owner_id: String,
        /// Base business-object type this tracker queries
        #[serde(rename = "ObjectName", default)]
        pub object_name: String,
        /// Ordered, deduplicated comma list of field references
        #[serde(rename = "Fields", default)]
        pub fields: String,
        /// JSON array of filter-condition objects (raw text)
        #[serde(rename = "Filters", default)]
        pub filters: String,
        /// Boolean expression over 1-based positions into `filters`
        #[serde(rename = "Logic", default)]
        pub logic: String,
        /// `SELECT ... FROM ... WHERE ... [ORDER BY ...]` string
        #[serde(rename = "Query", default)]
        pub query: String,
        /// JSON array of formatting-rule objects (raw text)
        #[serde(rename = "Formatting", default)]
        pub formatting: String,
        /// Comma list of field references used for ordering
        #[serde(rename = "OrderBy(Long)", default)]
        pub order_by: String,
        /// Column widths keyed by canonical field name
        #[serde(rename = "ResizeMap", default)]
        pub resize_map: String,
        /// Column labels keyed by canonical field name
        #[serde(rename = "Label Map", default)]
        pub label_map: String,
        /// Extra export columns, passed through untouched
        #[serde(flatten, default)]
        pub extra: BTreeMap<String, String>,
    }

    impl TrackerRow {
        /// Look up a column value by its export header name
        #[must_use]
        pub fn column(&self, header: &str) -> Option<&str> {
            match header {
                COL_ID => Some(&self.id),
                COL_NAME => Some(&self.name),
                COL_OWNER => Some(&self.owner_id),
                COL_OBJECT => Some(&self.object_name),
                COL_FIELDS => Some(&self.fields),
                COL_FILTERS => Some(&self.filters),
                COL_LOGIC => Some(&self.logic),
                COL_QUERY => Some(&self.query),
                COL_FORMATTING => Some(&self.formatting),
                COL_ORDER_BY => Some(&self.order_by),
                COL_RESIZE_MAP => Some(&self.resize_map),
                COL_LABEL_MAP => Some(&self.label_map),
                other => self.extra.get(other).map(String::as_str),
            }
        }

        /// Set a column value by its export header name; returns false when
        /// the header names neither a required column nor an existing extra
        pub fn set_column(&mut self, header: &str, value: String) -> bool {
            match header {
                COL_ID => self.id = value,
                COL_NAME => self.name = value,
                COL_OWNER => self.owner_id = value,
                COL_OBJECT => self.object_name = value,
                COL_FIELDS => self.fields = value,
                COL_FILTERS => self.filters = value,
                COL_LOGIC => self.logic = value,
                COL_QUERY => self.query = value,
                COL_FORMATTING => self.formatting = value,
                COL_ORDER_BY => self.order_by = value,
                COL_RESIZE_MAP => self.resize_map = value,
                COL_LABEL_MAP => self.label_map = value,
                other => {
                    if let Some(slot) = self.extra.get_mut(other) {
                        *slot = value;
                    } else {
                        return false;
                    }
                }
            }
            true
        }

        /// All column headers present on this row, required columns first
        #[must_use]
        pub fn headers(&self) -> Vec<String> {
            let mut headers: Vec<String> =
                REQUIRED_COLUMNS.iter().map(|h| (*h).to_string()).collect();
            headers.extend(self.extra.keys().cloned());
            headers
        }
    }

    // =========================================================================
    // Filter Conditions and Formatting Rules
    // =========================================================================

    /// One structural rule in the `Filters` array, identified at runtime by
    /// its 1-based position
    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    pub struct FilterCondition {
        /// Field reference string this condition applies to
        #[serde(default)]
        pub field: String,
        /// Display label, recomputed on swap when present
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub label: Option<String>,
        /// Owning object, recomputed on swap when present
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub sobject: Option<String>,
        /// Opaque keys (operator, value, ...) preserved as-is
        #[serde(flatten)]
        pub rest: serde_json::Map<String, serde_json::Value>,
    }

    /// One formatting rule; its embedded filter sub-list gates when it applies
    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    pub struct FormattingRule {
        /// Conditions gating this rule
        #[serde(default)]
        pub filters: Vec<FilterCondition>,
        /// Opaque rule body preserved as-is
        #[serde(flatten)]
        pub rest: serde_json::Map<String, serde_json::Value>,
    }

    /// A canonical field name is the final segment of a contextual path
    #[must_use]
    pub fn canonical_name(reference: &str) -> &str {
        reference.rsplit('.').next().unwrap_or(reference)
    }
}

/// Prelude for common imports
pub mod prelude {
    pub use crate::types::*;
    pub use anyhow::{Context, Result};
}
