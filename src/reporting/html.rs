//! # HTML Reporting Module / HTML 报告模块
//!
//! This module renders a result tree as a standalone HTML page: summary
//! counts on top, then one collapsible block per record with its entries
//! and captured output.
//!
//! 此模块将结果树渲染为独立的 HTML 页面：顶部为汇总统计，
//! 其下为每个记录一个可折叠区块，包含其条目和捕获的输出。

use anyhow::{Context, Result};
use maud::{html, Markup, PreEscaped, DOCTYPE};
use std::fs;
use std::path::Path;

use crate::core::models::{Entry, ResultRecord};
use crate::infra::t;
use crate::reporting::console::status_str;

/// Embedded CSS styles for HTML reports / HTML 报告的嵌入式 CSS 样式
const HTML_STYLE: &str = include_str!("assets/report.css");

/// Embedded JavaScript for HTML report interactivity / HTML 报告交互性的嵌入式 JavaScript
const HTML_SCRIPT: &str = include_str!("assets/report.js");

/// Counts shown in the report header.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReportSummary {
    pub cases: usize,
    pub passed: usize,
    pub failed: usize,
    pub assertions: usize,
    pub errors: usize,
}

impl ReportSummary {
    /// Counts cases as the leaves of the tree.
    pub fn from_root(root: &ResultRecord) -> Self {
        let (assertions, errors) = root.log_count();
        let mut summary = ReportSummary {
            assertions,
            errors,
            ..Default::default()
        };
        count_leaves(root, &mut summary);
        summary
    }
}

fn count_leaves(record: &ResultRecord, summary: &mut ReportSummary) {
    if record.children().next().is_none() && !record.id().is_empty() {
        summary.cases += 1;
        if record.is_success() {
            summary.passed += 1;
        } else {
            summary.failed += 1;
        }
        return;
    }
    for child in record.children() {
        count_leaves(child, summary);
    }
}

/// Renders the full report page.
pub fn render_html_report(root: &ResultRecord, locale: &str) -> Markup {
    let summary = ReportSummary::from_root(root);
    let summary_items = [
        (summary.cases, "", t!("html_report.summary.total", locale = locale).to_string()),
        (summary.passed, "passed-text", t!("html_report.summary.passed", locale = locale).to_string()),
        (summary.failed, "failed-text", t!("html_report.summary.failed", locale = locale).to_string()),
        (summary.assertions, "", t!("html_report.summary.assertions", locale = locale).to_string()),
        (summary.errors, "failed-text", t!("html_report.summary.errors", locale = locale).to_string()),
    ];

    html! {
        (DOCTYPE)
        html {
            head {
                meta charset="utf-8";
                title { (t!("html_report.title", locale = locale).to_string()) }
                style { (PreEscaped(HTML_STYLE)) }
            }
            body {
                h1 { (t!("html_report.main_header", locale = locale).to_string()) }
                div class="summary-container" {
                    @for (count, class, label) in &summary_items {
                        div class="summary-item" {
                            span class={ "count " (class) } { (count) }
                            span class="label" { (label) }
                        }
                    }
                }
                @for child in root.children() {
                    (render_record(child, locale))
                }
                script { (PreEscaped(HTML_SCRIPT)) }
            }
        }
    }
}

fn render_record(record: &ResultRecord, locale: &str) -> Markup {
    let status_class = if record.is_success() { "passed" } else { "failed" };
    let (assertions, errors) = record.log_count();

    html! {
        details class={ "record " (status_class) } open[!record.is_success()] {
            summary {
                span class={ "status-cell " (status_class) } { (status_str(record, locale)) }
                span class="record-id" { (record.id()) }
                span class="counts" {
                    (t!("node_counts", locale = locale, assertions = assertions, errors = errors).to_string())
                }
                span class="run-time" { (record.run_time().format("%Y-%m-%d %H:%M:%S%.3f").to_string()) }
            }
            @if !record.error().is_empty() || !record.success().is_empty() || !record.warnings().is_empty() {
                table class="entries" {
                    tbody {
                        (render_entries(record.error(), "error"))
                        (render_entries(record.warnings(), "warning"))
                        (render_entries(record.success(), "success"))
                    }
                }
            }
            @if let Some(output) = record.std_out() {
                div class="output-toggle" { (t!("html_report.toggle_output", locale = locale).to_string()) }
                pre class="output-content" style="display:none;" { (output) }
            }
            @for child in record.children() {
                (render_record(child, locale))
            }
        }
    }
}

fn render_entries(entries: &[Entry], class: &str) -> Markup {
    html! {
        @for entry in entries {
            tr class=(class) {
                td class="message" { (entry.message) }
                td class="tag" { (entry.tag) }
            }
        }
    }
}

/// Writes the report for `root` to `output_path`.
///
/// 将 `root` 的报告写入 `output_path`。
pub fn generate_html_report(root: &ResultRecord, output_path: &Path, locale: &str) -> Result<()> {
    let page = render_html_report(root, locale);
    fs::write(output_path, page.into_string())
        .with_context(|| format!("Failed to write HTML report: {}", output_path.display()))?;
    Ok(())
}
