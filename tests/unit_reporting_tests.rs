//! # Reporting Module Unit Tests / Reporting 模块单元测试
//!
//! Tests for the HTML report, the summary counts and locale selection.
//!
//! HTML 报告、汇总统计和语言区域选择的测试。

use std::fs;

use fluxcheck::core::models::ResultRecord;
use fluxcheck::reporting::console::{failing_records, status_str};
use fluxcheck::reporting::html::{generate_html_report, render_html_report, ReportSummary};
use fluxcheck::resolve_locale;
use tempfile::tempdir;

/// root -> test_x.json -> test_x.json::t -> (ok, bad)
fn sample_tree() -> ResultRecord {
    let mut root = ResultRecord::new("");
    let source = root.create_child("test_x.json", false).unwrap();
    let group = source.create_child("test_x.json::t", false).unwrap();
    group
        .create_child("test_x.json::t::ok", true)
        .unwrap()
        .add_success("reaction R1 inside of flux bounds 0, 2", ".reaction_flux");
    let bad = group.create_child("test_x.json::t::bad", true).unwrap();
    bad.add_error("required reaction <R9> not found in model", ".reaction_not_found");
    bad.warning(true, "slow solve", ".warn");
    root
}

#[cfg(test)]
mod summary_tests {
    use super::*;

    #[test]
    fn test_summary_counts_leaves() {
        let summary = ReportSummary::from_root(&sample_tree());
        assert_eq!(
            summary,
            ReportSummary {
                cases: 2,
                passed: 1,
                failed: 1,
                assertions: 2,
                errors: 1,
            }
        );
    }

    #[test]
    fn test_failing_records_only_lists_own_errors() {
        let root = sample_tree();
        let ids: Vec<&str> = failing_records(&root).iter().map(|r| r.id()).collect();
        assert_eq!(ids, vec!["test_x.json::t::bad"]);
    }

    #[test]
    fn test_status_words() {
        let root = sample_tree();
        assert_eq!(status_str(root.find("test_x.json::t::ok").unwrap(), "en"), "Passed");
        assert_eq!(status_str(&root, "en"), "Failed");
        assert_eq!(status_str(&root, "zh-CN"), "失败");
    }
}

#[cfg(test)]
mod html_tests {
    use super::*;

    #[test]
    fn test_render_contains_every_record_escaped() {
        let page = render_html_report(&sample_tree(), "en").into_string();
        assert!(page.starts_with("<!DOCTYPE html>"));
        for id in ["test_x.json", "test_x.json::t", "test_x.json::t::ok", "test_x.json::t::bad"] {
            assert!(page.contains(id), "missing {id}");
        }
        assert!(page.contains("required reaction &lt;R9&gt; not found in model"));
        assert!(page.contains("slow solve"));
        assert!(page.contains("FluxCheck Test Report"));
    }

    #[test]
    fn test_generate_writes_file() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("report.html");
        generate_html_report(&sample_tree(), &path, "zh-CN").unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("FluxCheck 测试报告"));
    }

    #[test]
    fn test_generate_fails_for_missing_directory() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("missing").join("report.html");
        assert!(generate_html_report(&sample_tree(), &path, "en").is_err());
    }
}

#[cfg(test)]
mod locale_tests {
    use super::*;

    #[test]
    fn test_resolve_locale() {
        assert_eq!(resolve_locale("zh-CN"), "zh-CN");
        assert_eq!(resolve_locale("en-US"), "en");
        assert_eq!(resolve_locale("fr-FR"), "en");
    }
}
