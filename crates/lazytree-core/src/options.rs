//! Configuration for diffing and parsing.

use serde::{Deserialize, Serialize};

/// How array/object comparisons treat ordering and extra members.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct OrderingMode {
    /// If `false`, a difference in member/element order is reported as `SORT`.
    pub any_order: bool,
    /// If `false`, members/elements present in `actual` but not `expected`
    /// are reported as `MORE`.
    pub any_additional: bool,
}

/// How leaf numbers are compared.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NumberComparison {
    /// Compare the literal textual declaration (`1.0` != `1`).
    #[default]
    Textual,
    /// Compare native floating-point value (`1.0` == `1`).
    Numeric,
}

/// Controls strictness of [`crate::diff::diff`].
///
/// ## Serialization Format
///
/// Fields are serialized in `kebab-case`. This is part of the public API
/// contract for config files and CLI flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct DiffMode {
    pub arrays: OrderingMode,
    pub objects: OrderingMode,
    pub numbers: NumberComparison,
}

impl DiffMode {
    /// Strict on order and additional members, textual number comparison —
    /// the narrowest mode, catching any deviation.
    pub fn strict() -> Self {
        Self::default()
    }

    /// Any order, any additional members, numeric number comparison — the
    /// widest mode, only catching leaf value mismatches.
    pub fn lenient() -> Self {
        Self {
            arrays: OrderingMode {
                any_order: true,
                any_additional: true,
            },
            objects: OrderingMode {
                any_order: true,
                any_additional: true,
            },
            numbers: NumberComparison::Numeric,
        }
    }
}

/// Options governing how a [`crate::document::Document`] is parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct ParseOptions {
    /// If `true`, recursive descent (`value()`, `visit()`, `find()`) bails
    /// out with a format error once `max_depth` container nesting levels
    /// have been entered, rather than risking a stack overflow on
    /// pathological input.
    pub guard_depth: bool,
    pub max_depth: usize,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            guard_depth: true,
            max_depth: 512,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diff_mode_serde_round_trip() {
        let mode = DiffMode::lenient();
        let json = serde_json::to_string(&mode).unwrap();
        assert!(json.contains("\"any-order\":true"));
        assert!(json.contains("\"numbers\":\"numeric\""));
        let back: DiffMode = serde_json::from_str(&json).unwrap();
        assert_eq!(back, mode);
    }

    #[test]
    fn strict_defaults_to_textual_and_ordered() {
        let mode = DiffMode::strict();
        assert!(!mode.arrays.any_order);
        assert!(!mode.objects.any_additional);
        assert_eq!(mode.numbers, NumberComparison::Textual);
    }

    #[test]
    fn parse_options_default_has_depth_guard() {
        let opts = ParseOptions::default();
        assert!(opts.guard_depth);
        assert_eq!(opts.max_depth, 512);
    }
}
