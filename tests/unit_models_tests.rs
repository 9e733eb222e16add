//! # Models Module Unit Tests / Models 模块单元测试
//!
//! This module contains unit tests for the `models.rs` module: result record
//! roll-ups, child creation rules, serialization and addressing helpers.
//!
//! 此模块包含 `models.rs` 模块的单元测试：结果记录汇总、子节点创建规则、
//! 序列化和地址辅助函数。

use fluxcheck::core::error::RecordError;
use fluxcheck::core::models::{join_address, tags, ParamTuple, ResultRecord};

/// root -> group -> (case_a, case_b)
fn build_tree() -> ResultRecord {
    let mut root = ResultRecord::new("");
    let group = root.create_child("group", false).unwrap();
    group.create_child("group::a", true).unwrap();
    group.create_child("group::b", true).unwrap();
    root
}

fn leaf<'a>(root: &'a mut ResultRecord, id: &str) -> &'a mut ResultRecord {
    root.child_mut("group").unwrap().child_mut(id).unwrap()
}

#[cfg(test)]
mod roll_up_tests {
    use super::*;

    #[test]
    fn test_empty_tree_is_success() {
        let root = build_tree();
        assert!(root.is_success());
        assert_eq!(root.log_count(), (0, 0));
    }

    #[test]
    fn test_leaf_error_flips_every_ancestor() {
        let mut root = build_tree();
        leaf(&mut root, "group::a").add_error("broken", tags::EXECUTION_ERROR);

        assert!(!root.is_success());
        assert!(!root.child("group").unwrap().is_success());
        assert!(!root.find("group::a").unwrap().is_success());
        assert!(root.find("group::b").unwrap().is_success());
    }

    #[test]
    fn test_is_success_reflects_latest_mutation() {
        let mut root = build_tree();
        assert!(root.is_success());
        leaf(&mut root, "group::b").assertion(false, "ok", "not ok", ".test");
        assert!(!root.is_success());
    }

    #[test]
    fn test_own_error_fails_record_with_passing_children() {
        let mut root = build_tree();
        root.child_mut("group")
            .unwrap()
            .add_error("source broken", tags::SOURCE_ERROR);
        assert!(!root.is_success());
        assert!(root.find("group::a").unwrap().is_success());
    }

    #[test]
    fn test_log_count_sums_subtree() {
        let mut root = build_tree();
        {
            let a = leaf(&mut root, "group::a");
            a.assertion(true, "ok 1", "bad 1", ".t");
            a.assertion(true, "ok 2", "bad 2", ".t");
            a.assertion(false, "ok 3", "bad 3", ".t");
        }
        leaf(&mut root, "group::b").add_error("boom", ".t");
        root.child_mut("group").unwrap().add_success("group level", ".t");

        assert_eq!(root.find("group::a").unwrap().log_count(), (3, 1));
        assert_eq!(root.find("group::b").unwrap().log_count(), (1, 1));
        assert_eq!(root.child("group").unwrap().log_count(), (5, 2));
        assert_eq!(root.log_count(), (5, 2));
    }

    #[test]
    fn test_warnings_never_fail_or_count() {
        let mut root = build_tree();
        let a = leaf(&mut root, "group::a");
        a.warning(true, "slow model", ".warn");
        a.warning(false, "never stored", ".warn");

        assert_eq!(root.find("group::a").unwrap().warnings().len(), 1);
        assert!(root.is_success());
        assert_eq!(root.log_count(), (0, 0));
    }

    #[test]
    fn test_assertion_stores_matching_message_and_tag() {
        let mut record = ResultRecord::new("r");
        record.assertion(true, "passed", "failed", ".flux");
        record.assertion(false, "passed", "failed", ".flux");

        assert_eq!(record.success()[0].message, "passed");
        assert_eq!(record.error()[0].message, "failed");
        assert_eq!(record.error()[0].tag, ".flux");
    }
}

#[cfg(test)]
mod structure_tests {
    use super::*;

    #[test]
    fn test_create_child_on_param_leaf_fails() {
        let mut root = build_tree();
        let result = leaf(&mut root, "group::a").create_child("deeper", false);
        assert_eq!(result.unwrap_err(), RecordError::ParamLeaf("group::a".to_string()));
    }

    #[test]
    fn test_child_records_parent_and_flag() {
        let root = build_tree();
        let a = root.find("group::a").unwrap();
        assert_eq!(a.parent_id(), Some("group"));
        assert!(a.is_param_leaf());
        assert!(!root.child("group").unwrap().is_param_leaf());
    }

    #[test]
    fn test_find_never_creates_nodes() {
        let root = build_tree();
        assert!(root.find("group::missing").is_none());
        assert!(root.child("group").unwrap().child("group::missing").is_none());
        assert_eq!(root.child("group").unwrap().children().count(), 2);
    }

    #[test]
    fn test_create_child_replaces_existing() {
        let mut root = ResultRecord::new("");
        root.create_child("g", false).unwrap().add_error("old", ".t");
        root.create_child("g", false).unwrap();
        assert!(root.is_success());
        assert_eq!(root.children().count(), 1);
    }
}

#[cfg(test)]
mod serialization_tests {
    use super::*;

    #[test]
    fn test_to_dict_mirrors_tree() {
        let mut root = build_tree();
        leaf(&mut root, "group::a").add_error("broken", ".t");

        let report = root.to_dict();
        let group = &report.children["group"];
        assert!(!report.is_success);
        assert!(!group.is_success);
        assert_eq!(group.children.len(), 2);
        assert_eq!(group.children["group::a"].error[0].message, "broken");
        assert!(group.children["group::b"].is_success);
    }

    #[test]
    fn test_to_dict_json_fields() {
        let mut root = build_tree();
        leaf(&mut root, "group::a").add_success("fine", ".t");

        let value = serde_json::to_value(root.to_dict()).unwrap();
        let case = &value["children"]["group"]["children"]["group::a"];
        for field in ["id", "children", "error", "success", "is_success", "run_time"] {
            assert!(case.get(field).is_some(), "missing {field}");
        }
        assert!(case.get("std_out").is_none());
        assert_eq!(case["success"][0]["message"], "fine");
    }
}

#[cfg(test)]
mod address_tests {
    use super::*;

    #[test]
    fn test_join_address_skips_empty_segments() {
        assert_eq!(join_address(["a", "", "b"]), "a::b");
        assert_eq!(join_address(["", "x"]), "x");
    }

    #[test]
    fn test_default_tuple_addresses_group() {
        let tuple = ParamTuple::default();
        assert!(tuple.is_default());
        assert_eq!(tuple.label(), None);
        assert_eq!(tuple.address("test_x.json::t1"), "test_x.json::t1");
    }

    #[test]
    fn test_tuple_omits_none_segments_in_fixed_order() {
        let tuple = ParamTuple::new(Some("m1".into()), None, Some("d1".into()));
        assert_eq!(tuple.label().as_deref(), Some("m1::d1"));

        let tuple = ParamTuple::new(Some("m1".into()), Some("c1".into()), Some("d1".into()));
        assert_eq!(tuple.address("g"), "g::m1::c1::d1");

        let tuple = ParamTuple::new(None, Some("c1".into()), None);
        assert_eq!(tuple.address("g"), "g::c1");
    }
}
