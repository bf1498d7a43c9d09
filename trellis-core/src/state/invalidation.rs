//! Invalidation Policies
//!
//! When a path is written, the store refreshes every binding whose path is
//! *related* to the written one. Two notions of "related" are supported.
//!
//! ## Legacy
//!
//! Reproduces the historical rule exactly. A binding keyed `K` refreshes on a
//! write to `P` when either
//!
//! - `K` starts with `P` as a string (so `user2.name` refreshes on a write to
//!   `user`), or
//! - `P` starts with the first segment of `K` as a string (so every binding
//!   under `user` refreshes on a write to `user.role`, and so does
//!   `u.anything`).
//!
//! ## Lineage
//!
//! Exact match plus whole-segment ancestors and descendants. A node bound to
//! `user` refreshes on a write to `user.profile.theme`, but a node bound to
//! `user2` does not.

use serde::{Deserialize, Serialize};

use super::path::{PathId, PathTable, StatePath};

/// Which bindings a write refreshes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvalidationPolicy {
    /// String-prefix and first-segment matching.
    #[default]
    Legacy,

    /// Exact, ancestor and descendant paths by whole segments.
    Lineage,
}

impl InvalidationPolicy {
    /// Decide whether a binding keyed `bound` refreshes on a write to `written`.
    pub fn is_related(&self, written: &StatePath, bound: &StatePath) -> bool {
        match self {
            Self::Legacy => {
                bound.as_str().starts_with(written.as_str())
                    || written.as_str().starts_with(bound.first_segment())
            }
            Self::Lineage => {
                written == bound || written.is_ancestor_of(bound) || bound.is_ancestor_of(written)
            }
        }
    }

    /// Every interned path related to `written`.
    ///
    /// The lineage rule is answered from the interning table's ancestor and
    /// descendant indexes. The legacy rule is string-based and scans the
    /// interned paths.
    pub fn related_paths(&self, table: &PathTable, written: &StatePath) -> Vec<PathId> {
        match self {
            Self::Legacy => table
                .iter()
                .filter(|(_, bound)| self.is_related(written, bound))
                .map(|(id, _)| id)
                .collect(),
            Self::Lineage if written.is_root() => table.iter().map(|(id, _)| id).collect(),
            Self::Lineage => {
                let mut out = table.ancestors_of(written);
                if let Some(id) = table.lookup(written.as_str()) {
                    out.push(id);
                    out.extend_from_slice(table.descendants_of(id));
                }
                out
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn related(policy: InvalidationPolicy, written: &str, bound: &str) -> bool {
        policy.is_related(&StatePath::parse(written), &StatePath::parse(bound))
    }

    #[test]
    fn legacy_matches_exact_descendants_and_first_segment() {
        let p = InvalidationPolicy::Legacy;
        assert!(related(p, "counter.value", "counter.value"));
        assert!(related(p, "user", "user.profile.theme"));
        assert!(related(p, "user.profile.theme", "user.name"));
        assert!(!related(p, "counter.value", "app.title"));
    }

    #[test]
    fn legacy_keeps_string_prefix_false_positives() {
        let p = InvalidationPolicy::Legacy;
        assert!(related(p, "user", "user2.name"));
        assert!(related(p, "user2.name", "user.name"));
    }

    #[test]
    fn lineage_is_segment_exact() {
        let p = InvalidationPolicy::Lineage;
        assert!(related(p, "user.profile.theme", "user"));
        assert!(related(p, "user", "user.profile.theme"));
        assert!(related(p, "user.name", "user.name"));
        assert!(!related(p, "user", "user2"));
        assert!(!related(p, "user.profile.theme", "user.name"));
    }

    #[test]
    fn related_paths_agree_with_is_related() {
        let mut table = PathTable::new();
        for raw in ["user", "user.name", "user.profile.theme", "user2.name", "app.title"] {
            table.intern(raw);
        }

        for policy in [InvalidationPolicy::Legacy, InvalidationPolicy::Lineage] {
            for written in ["", "user", "user.profile", "user.profile.theme", "app.title", "zzz"] {
                let written = StatePath::parse(written);
                let mut fast: Vec<PathId> = policy.related_paths(&table, &written);
                fast.sort();
                let mut slow: Vec<PathId> = table
                    .iter()
                    .filter(|(_, bound)| policy.is_related(&written, bound))
                    .map(|(id, _)| id)
                    .collect();
                slow.sort();
                assert_eq!(fast, slow, "{policy:?} writing {written}");
            }
        }
    }

    #[test]
    fn policy_deserializes_from_lowercase() {
        let policy: InvalidationPolicy = serde_json::from_str("\"lineage\"").unwrap();
        assert_eq!(policy, InvalidationPolicy::Lineage);
    }
}
