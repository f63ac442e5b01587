// Copyright (c) 2025 schemadiff contributors
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Object references
//!
//! An [`ObjectReference`] is one "statement X uses object Y" edge: which object
//! was named and where in the source it was named. References are immutable
//! values; two references are equal only when every field, location included,
//! matches.
//!
//! [`DependencySet`] is the insertion-ordered set that backs every public
//! collection of references. Order matters: downstream script generation walks
//! dependencies in the order they were discovered, so iteration order must be
//! stable from run to run.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::span::SourceSpan;

/// Kinds of schema objects a reference can point at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ObjectKind {
    Schema,
    Table,
    View,
    Column,
    Function,
    Procedure,
    Aggregate,
    Operator,
    Sequence,
    Type,
    Domain,
    Collation,
    Trigger,
    Rule,
    Index,
    Constraint,
    Role,
    Extension,
}

impl ObjectKind {
    /// Kinds that can appear in a FROM clause
    pub fn is_relation(&self) -> bool {
        matches!(self, ObjectKind::Table | ObjectKind::View | ObjectKind::Sequence)
    }

    /// Kinds that are invoked like functions
    pub fn is_routine(&self) -> bool {
        matches!(
            self,
            ObjectKind::Function | ObjectKind::Procedure | ObjectKind::Aggregate
        )
    }

    /// Kinds that live inside a table rather than a schema
    pub fn is_table_child(&self) -> bool {
        matches!(
            self,
            ObjectKind::Column
                | ObjectKind::Trigger
                | ObjectKind::Rule
                | ObjectKind::Index
                | ObjectKind::Constraint
        )
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// A reference from an analysed fragment to a schema object
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectReference {
    pub kind: ObjectKind,
    pub schema: Option<String>,
    /// Object name, or the container name for columns
    pub name: String,
    pub column: Option<String>,
    pub location: SourceSpan,
}

impl ObjectReference {
    pub fn new(
        kind: ObjectKind,
        schema: Option<String>,
        name: impl Into<String>,
        location: SourceSpan,
    ) -> Self {
        Self {
            kind,
            schema,
            name: name.into(),
            column: None,
            location,
        }
    }

    /// Reference to `schema.table.column`
    pub fn column(
        schema: Option<String>,
        table: impl Into<String>,
        column: impl Into<String>,
        location: SourceSpan,
    ) -> Self {
        Self {
            kind: ObjectKind::Column,
            schema,
            name: table.into(),
            column: Some(column.into()),
            location,
        }
    }

    /// Whether this reference names the given object, ignoring location and case
    pub fn points_to(&self, kind: ObjectKind, schema: Option<&str>, name: &str) -> bool {
        self.kind == kind
            && self.name.eq_ignore_ascii_case(name)
            && match (self.schema.as_deref(), schema) {
                (Some(a), Some(b)) => a.eq_ignore_ascii_case(b),
                (_, None) => true,
                (None, Some(_)) => false,
            }
    }

    /// Identity of the referenced object without its location
    pub fn target(&self) -> (ObjectKind, Option<&str>, &str, Option<&str>) {
        (
            self.kind,
            self.schema.as_deref(),
            self.name.as_str(),
            self.column.as_deref(),
        )
    }
}

impl fmt::Display for ObjectReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.kind)?;
        if let Some(schema) = &self.schema {
            write!(f, "{}.", schema)?;
        }
        f.write_str(&self.name)?;
        if let Some(column) = &self.column {
            write!(f, ".{}", column)?;
        }
        write!(f, ")")
    }
}

/// Insertion-ordered set of object references
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "Vec<ObjectReference>", into = "Vec<ObjectReference>")]
pub struct DependencySet {
    items: Vec<ObjectReference>,
    seen: HashSet<ObjectReference>,
}

impl DependencySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a reference, returning `false` if an identical one is present
    pub fn insert(&mut self, reference: ObjectReference) -> bool {
        if self.seen.contains(&reference) {
            return false;
        }
        self.seen.insert(reference.clone());
        self.items.push(reference);
        true
    }

    pub fn contains(&self, reference: &ObjectReference) -> bool {
        self.seen.contains(reference)
    }

    /// Whether any reference names the given object, wherever it was mentioned
    pub fn depends_on(&self, kind: ObjectKind, schema: Option<&str>, name: &str) -> bool {
        self.items.iter().any(|r| r.points_to(kind, schema, name))
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ObjectReference> {
        self.items.iter()
    }

    /// Keep only the references matching the predicate, preserving order
    pub fn retain(&mut self, mut keep: impl FnMut(&ObjectReference) -> bool) {
        let seen = &mut self.seen;
        self.items.retain(|r| {
            let kept = keep(r);
            if !kept {
                seen.remove(r);
            }
            kept
        });
    }

    /// Move every reference of `other` to the end of this set
    pub fn extend(&mut self, other: DependencySet) {
        for reference in other.items {
            self.insert(reference);
        }
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.seen.clear();
    }
}

impl PartialEq for DependencySet {
    fn eq(&self, other: &Self) -> bool {
        self.items == other.items
    }
}

impl Eq for DependencySet {}

impl From<Vec<ObjectReference>> for DependencySet {
    fn from(items: Vec<ObjectReference>) -> Self {
        items.into_iter().collect()
    }
}

impl From<DependencySet> for Vec<ObjectReference> {
    fn from(set: DependencySet) -> Self {
        set.items
    }
}

impl Extend<ObjectReference> for DependencySet {
    fn extend<I: IntoIterator<Item = ObjectReference>>(&mut self, iter: I) {
        for reference in iter {
            self.insert(reference);
        }
    }
}

impl FromIterator<ObjectReference> for DependencySet {
    fn from_iter<I: IntoIterator<Item = ObjectReference>>(iter: I) -> Self {
        let mut set = DependencySet::new();
        Extend::extend(&mut set, iter);
        set
    }
}

impl IntoIterator for DependencySet {
    type Item = ObjectReference;
    type IntoIter = std::vec::IntoIter<ObjectReference>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a> IntoIterator for &'a DependencySet {
    type Item = &'a ObjectReference;
    type IntoIter = std::slice::Iter<'a, ObjectReference>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(name: &str, line: u32) -> ObjectReference {
        ObjectReference::new(
            ObjectKind::Table,
            Some("public".to_string()),
            name,
            SourceSpan::new(0, 1, line, 1),
        )
    }

    #[test]
    fn test_dependency_set_preserves_insertion_order() {
        let mut set = DependencySet::new();
        assert!(set.insert(table("b", 1)));
        assert!(set.insert(table("a", 1)));
        assert!(!set.insert(table("b", 1)));

        let names: Vec<_> = set.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["b", "a"]);
    }

    #[test]
    fn test_location_is_part_of_identity() {
        let mut set = DependencySet::new();
        set.insert(table("t", 1));
        set.insert(table("t", 2));
        assert_eq!(set.len(), 2);
        assert!(set.depends_on(ObjectKind::Table, Some("PUBLIC"), "T"));
    }

    #[test]
    fn test_retain_updates_membership() {
        let mut set: DependencySet = vec![table("a", 1), table("b", 1)].into_iter().collect();
        set.retain(|r| r.name != "a");
        assert!(!set.contains(&table("a", 1)));
        assert!(set.insert(table("a", 1)));
        assert_eq!(set.iter().last().map(|r| r.name.as_str()), Some("a"));
    }

    #[test]
    fn test_serde_restores_membership() {
        let set: DependencySet = vec![table("a", 1), table("b", 2)].into();
        let json = serde_json::to_string(&set).unwrap();
        let restored: DependencySet = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, set);
        assert!(restored.contains(&table("b", 2)));
    }

    #[test]
    fn test_display() {
        let reference = ObjectReference::column(
            Some("s".to_string()),
            "t",
            "c",
            SourceSpan::synthetic(),
        );
        assert_eq!(reference.to_string(), "Column(s.t.c)");
    }
}
