// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Grouping of operations by relation, standalone and through the JSON writer.
#![allow(clippy::unwrap_used, clippy::expect_used)]
#![allow(missing_docs)]

use std::collections::HashSet;

use odata_dry_tests::{
    default_action, default_function, entry_with_default_action, MemorySink,
    DEFAULT_ACTION_TARGET, DEFAULT_FUNCTION_TARGET,
};
use odata_writer::{
    group_operations, relation_of, ODataWriter, Operation, OperationKind, ResourceItem,
    WriterSettings,
};
use proptest::prelude::*;
use serde_json::Value;

const RELATIONS: [&str; 4] = ["#a", "#b", "#Container.Rate", "#c"];

fn operation() -> impl Strategy<Value = Operation> {
    (0..RELATIONS.len(), any::<bool>(), 0u32..100, any::<bool>()).prop_map(
        |(relation, absolute, target, is_action)| {
            let relation = RELATIONS[relation];
            let metadata = if absolute {
                format!("http://odata.org/$metadata{relation}")
            } else {
                relation.to_owned()
            };
            let target = format!("http://odata.org/target/{target}");
            if is_action {
                Operation::action(metadata, target)
            } else {
                Operation::function(metadata, target)
            }
        },
    )
}

fn write_resource(item: &ResourceItem) -> Value {
    let sink = MemorySink::new();
    let mut writer = ODataWriter::resource_writer(sink.clone(), &WriterSettings::default());
    writer.begin_resource(item).unwrap();
    writer.end().unwrap();
    writer.flush().unwrap();
    writer.dispose().unwrap();
    serde_json::from_str(&sink.text()).unwrap()
}

proptest! {
    #[test]
    fn groups_partition_by_relation_in_first_seen_order(
        ops in prop::collection::vec(operation(), 0..16),
    ) {
        let groups = group_operations(&ops);

        let total: usize = groups.iter().map(|g| g.len()).sum();
        prop_assert_eq!(total, ops.len());

        let mut seen = Vec::new();
        for op in &ops {
            let relation = relation_of(&op.metadata);
            if !seen.contains(&relation) {
                seen.push(relation);
            }
        }
        let relations: Vec<_> = groups.iter().map(|g| g.relation).collect();
        prop_assert_eq!(relations, seen);

        for group in &groups {
            prop_assert!(!group.is_empty());
            let mut last = None;
            for member in &group.operations {
                prop_assert_eq!(relation_of(&member.metadata), group.relation);
                let index = ops.iter().position(|op| std::ptr::eq(op, *member)).unwrap();
                prop_assert!(last.is_none_or(|prev| prev < index));
                last = Some(index);
            }
        }
    }

    #[test]
    fn one_member_is_an_object_several_are_an_array(
        ops in prop::collection::vec(operation(), 1..12),
    ) {
        for group in group_operations(&ops) {
            let json = serde_json::to_value(&group).unwrap();
            if group.len() == 1 {
                prop_assert!(json.is_object());
                prop_assert_eq!(&json["target"], &Value::from(group.operations[0].target.clone()));
            } else {
                prop_assert_eq!(json.as_array().map(Vec::len), Some(group.len()));
            }
        }
    }

    #[test]
    fn writer_emits_one_member_per_relation(
        ops in prop::collection::vec(operation(), 0..12),
    ) {
        let mut item = ResourceItem::new("http://odata.org/e(1)");
        for op in &ops {
            match op.kind {
                OperationKind::Action => item.actions.push(Some(op.clone())),
                OperationKind::Function => item.functions.push(Some(op.clone())),
            }
        }
        let json = write_resource(&item);
        let keys: HashSet<&str> = json
            .as_object()
            .unwrap()
            .keys()
            .map(String::as_str)
            .filter(|key| key.starts_with('#'))
            .collect();
        let expected: HashSet<&str> = ops.iter().map(|op| relation_of(&op.metadata)).collect();
        prop_assert_eq!(keys, expected);
    }
}

#[test]
fn default_action_wire_shape() {
    let json = write_resource(&entry_with_default_action());
    assert_eq!(
        json["#action"],
        serde_json::json!({
            "title": "Default Action",
            "target": "http://odata.org/defaultActionTarget"
        })
    );
}

#[test]
fn actions_precede_functions_within_a_shared_relation() {
    let item = ResourceItem::new("http://odata.org/e(1)")
        .with_function(Operation::function("#shared", "http://odata.org/f"))
        .with_action(default_action())
        .with_action(Operation::action("http://odata.org/$metadata#shared", "http://odata.org/a"));
    let json = write_resource(&item);
    let shared = json["#shared"].as_array().unwrap();
    assert_eq!(shared[0]["target"], "http://odata.org/a");
    assert_eq!(shared[1]["target"], "http://odata.org/f");
}

#[test]
fn action_and_function_with_distinct_relations_stay_separate() {
    let item = ResourceItem::new("http://odata.org/e(1)")
        .with_action(default_action())
        .with_function(default_function());
    let json = write_resource(&item);
    assert_eq!(json["#action"]["target"], DEFAULT_ACTION_TARGET);
    assert_eq!(
        json["#function"],
        serde_json::json!({
            "title": "Default Function",
            "target": DEFAULT_FUNCTION_TARGET
        })
    );
}
