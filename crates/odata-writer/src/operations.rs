// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Grouping of operations by relation.
//!
//! The relation of an operation is its metadata from the first `#` onward
//! (`http://odata.org/$metadata#Container.Rate` → `#Container.Rate`). Metadata
//! without a fragment is its own relation. Groups keep first-seen order and
//! operations keep input order within a group. No validation happens here.

use indexmap::IndexMap;
use serde::ser::{Serialize, SerializeSeq, Serializer};

use crate::item::{Operation, OperationKind};

/// The relation key of `metadata`.
pub fn relation_of(metadata: &str) -> &str {
    metadata.find('#').map_or(metadata, |at| &metadata[at..])
}

/// Operations sharing one relation.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct OperationGroup<'a> {
    /// The shared relation key.
    pub relation: &'a str,
    /// Members in input order; never empty.
    pub operations: Vec<&'a Operation>,
}

impl<'a> OperationGroup<'a> {
    /// Number of operations in the group.
    pub fn len(&self) -> usize {
        self.operations.len()
    }

    /// Always false for groups built by [`group_operations`].
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Kind of the first member.
    pub fn kind(&self) -> Option<OperationKind> {
        self.operations.first().map(|op| op.kind)
    }
}

/// Partitions `operations` by relation.
pub fn group_operations<'a, I>(operations: I) -> Vec<OperationGroup<'a>>
where
    I: IntoIterator<Item = &'a Operation>,
{
    let mut groups: IndexMap<&'a str, Vec<&'a Operation>> = IndexMap::new();
    for op in operations {
        groups
            .entry(relation_of(&op.metadata))
            .or_default()
            .push(op);
    }
    groups
        .into_iter()
        .map(|(relation, operations)| OperationGroup {
            relation,
            operations,
        })
        .collect()
}

#[derive(serde::Serialize)]
struct OperationBody<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    title: Option<&'a str>,
    target: &'a str,
}

impl<'a> From<&'a Operation> for OperationBody<'a> {
    fn from(op: &'a Operation) -> Self {
        Self {
            title: op.title.as_deref(),
            target: &op.target,
        }
    }
}

/// One member serializes as a `{title, target}` object, several as an array.
impl Serialize for OperationGroup<'_> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if let [single] = self.operations.as_slice() {
            return OperationBody::from(*single).serialize(serializer);
        }
        let mut seq = serializer.serialize_seq(Some(self.operations.len()))?;
        for op in &self.operations {
            seq.serialize_element(&OperationBody::from(*op))?;
        }
        seq.end()
    }
}
