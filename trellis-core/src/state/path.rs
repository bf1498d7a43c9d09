//! State Paths
//!
//! Dotted paths (`user.profile.theme`) address nested fields of the state
//! tree. Templates spell them as strings, but internally every distinct path
//! is interned once into a [`PathId`] so binding lookups never compare
//! strings.
//!
//! Interning a path also interns all of its proper prefixes and records the
//! path as a descendant of each one. That lets the lineage invalidation rule
//! find ancestors and descendants of a written path with map lookups only.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use smallvec::SmallVec;

/// Segments of a path. Most template paths are three segments or fewer.
type Segments = SmallVec<[Arc<str>; 4]>;

/// A parsed dotted path.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct StatePath {
    raw: Arc<str>,
    segments: Segments,
}

impl StatePath {
    /// The empty path, addressing the state root.
    pub fn root() -> Self {
        Self {
            raw: Arc::from(""),
            segments: SmallVec::new(),
        }
    }

    /// Parse a dotted path. The empty string is the root path.
    pub fn parse(raw: &str) -> Self {
        if raw.is_empty() {
            return Self::root();
        }
        Self {
            raw: Arc::from(raw),
            segments: raw.split('.').map(Arc::from).collect(),
        }
    }

    /// Extend the path by one key: `P.key`, or just `key` at the root.
    pub fn join(&self, key: &str) -> Self {
        let raw = if self.raw.is_empty() {
            key.to_string()
        } else {
            format!("{}.{}", self.raw, key)
        };
        let mut segments = self.segments.clone();
        segments.push(Arc::from(key));
        Self {
            raw: Arc::from(raw),
            segments,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().map(|s| s.as_ref())
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// The first segment, or `""` for the root path.
    pub fn first_segment(&self) -> &str {
        self.segments.first().map(|s| s.as_ref()).unwrap_or("")
    }

    /// The last segment, or `None` for the root path.
    pub fn last_segment(&self) -> Option<&str> {
        self.segments.last().map(|s| s.as_ref())
    }

    /// The path without its last segment.
    pub fn parent(&self) -> Option<StatePath> {
        if self.segments.is_empty() {
            return None;
        }
        let segments: Segments = self.segments[..self.segments.len() - 1].iter().cloned().collect();
        let raw = segments.iter().map(|s| s.as_ref()).collect::<Vec<_>>().join(".");
        Some(Self {
            raw: Arc::from(raw),
            segments,
        })
    }

    /// Every proper, non-root prefix, shortest first.
    pub fn prefixes(&self) -> Vec<StatePath> {
        let mut out = Vec::new();
        let mut current = StatePath::root();
        for segment in self.segments.iter().take(self.segments.len().saturating_sub(1)) {
            current = current.join(segment);
            out.push(current.clone());
        }
        out
    }

    /// Segment-wise prefix test: `user` is an ancestor of `user.name` but not of `user2`.
    pub fn is_ancestor_of(&self, other: &StatePath) -> bool {
        self.segments.len() < other.segments.len()
            && self.segments.iter().zip(other.segments.iter()).all(|(a, b)| a == b)
    }
}

impl fmt::Debug for StatePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StatePath({:?})", self.raw)
    }
}

impl fmt::Display for StatePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl From<&str> for StatePath {
    fn from(raw: &str) -> Self {
        Self::parse(raw)
    }
}

/// Opaque token for an interned path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PathId(u32);

impl PathId {
    pub fn raw(&self) -> u32 {
        self.0
    }
}

/// Interning table mapping dotted-path strings to [`PathId`] tokens.
#[derive(Debug, Default)]
pub struct PathTable {
    ids: HashMap<Arc<str>, PathId>,
    paths: Vec<StatePath>,
    /// Every interned path strictly below a given path.
    descendants: HashMap<PathId, Vec<PathId>>,
}

impl PathTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern a path (and its prefixes), returning its token.
    pub fn intern(&mut self, raw: &str) -> PathId {
        if let Some(id) = self.ids.get(raw) {
            return *id;
        }

        let path = StatePath::parse(raw);
        let ancestors: Vec<PathId> = path
            .prefixes()
            .iter()
            .map(|prefix| self.intern(prefix.as_str()))
            .collect();

        let id = PathId(self.paths.len() as u32);
        self.ids.insert(Arc::clone(&path.raw), id);
        self.paths.push(path);
        for ancestor in ancestors {
            self.descendants.entry(ancestor).or_default().push(id);
        }
        id
    }

    /// Look up a path's token without interning it.
    pub fn lookup(&self, raw: &str) -> Option<PathId> {
        self.ids.get(raw).copied()
    }

    pub fn get(&self, id: PathId) -> Option<&StatePath> {
        self.paths.get(id.0 as usize)
    }

    /// Interned paths strictly below `id`.
    pub fn descendants_of(&self, id: PathId) -> &[PathId] {
        self.descendants.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Interned paths strictly above `path`, shortest first.
    pub fn ancestors_of(&self, path: &StatePath) -> Vec<PathId> {
        path.prefixes()
            .iter()
            .filter_map(|prefix| self.lookup(prefix.as_str()))
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (PathId, &StatePath)> {
        self.paths
            .iter()
            .enumerate()
            .map(|(index, path)| (PathId(index as u32), path))
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_and_join() {
        let path = StatePath::parse("user.profile");
        assert_eq!(path.len(), 2);
        assert_eq!(path.join("theme").as_str(), "user.profile.theme");
        assert_eq!(StatePath::root().join("user").as_str(), "user");
        assert_eq!(path.first_segment(), "user");
        assert_eq!(path.last_segment(), Some("profile"));
    }

    #[test]
    fn parent_and_prefixes() {
        let path = StatePath::parse("a.b.c");
        assert_eq!(path.parent().map(|p| p.to_string()).as_deref(), Some("a.b"));
        let prefixes: Vec<String> = path.prefixes().iter().map(|p| p.to_string()).collect();
        assert_eq!(prefixes, vec!["a", "a.b"]);
        assert!(StatePath::root().parent().is_none());
    }

    #[test]
    fn ancestry_is_segment_wise() {
        let user = StatePath::parse("user");
        assert!(user.is_ancestor_of(&StatePath::parse("user.name")));
        assert!(!user.is_ancestor_of(&StatePath::parse("user2.name")));
        assert!(!user.is_ancestor_of(&user));
    }

    #[test]
    fn interning_is_stable_and_records_lineage() {
        let mut table = PathTable::new();
        let theme = table.intern("user.profile.theme");
        assert_eq!(table.intern("user.profile.theme"), theme);

        let user = table.lookup("user").unwrap();
        let profile = table.lookup("user.profile").unwrap();
        assert_eq!(table.len(), 3);
        assert!(table.descendants_of(user).contains(&profile));
        assert!(table.descendants_of(user).contains(&theme));
        assert_eq!(table.descendants_of(theme), &[] as &[PathId]);

        let ancestors = table.ancestors_of(&StatePath::parse("user.profile.theme"));
        assert_eq!(ancestors, vec![user, profile]);
    }
}
